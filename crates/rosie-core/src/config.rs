use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, prompt::PromptTemplates, router::RouterConfig, Result};

/// Deployment flavour. Selects the credential set and the Slack connection mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvMode {
    Development,
    Production,
}

/// How Slack delivers events to us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Persistent WebSocket opened with the app-level token.
    Socket,
    /// Events API: Slack POSTs signed requests to our HTTP listener.
    Webhook,
}

/// Typed configuration, loaded once at startup and read-only afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub env_mode: EnvMode,
    pub connection_mode: ConnectionMode,

    // Slack
    pub slack_bot_token: String,
    pub slack_signing_secret: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_api_base: String,
    pub port: u16,
    pub socket_reconnect_delay: Duration,

    // Completion provider
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_timeout: Duration,

    // Behavior
    pub bot_name: String,
    pub respond_to_bots: bool,
    pub thread_history_limit: usize,
    pub prompt: PromptTemplates,
}

impl Config {
    /// Load `.env` (if present) into the environment, then read it.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let env_mode = match get("APP_ENV").map(|s| s.trim().to_lowercase()) {
            Some(m) if m == "development" || m == "dev" => EnvMode::Development,
            Some(_) => EnvMode::Production,
            None => {
                tracing::warn!("APP_ENV is not set; assuming production");
                EnvMode::Production
            }
        };
        let is_dev = env_mode == EnvMode::Development;
        let connection_mode = if is_dev {
            ConnectionMode::Socket
        } else {
            ConnectionMode::Webhook
        };

        // Development reads the DEV_-prefixed credential set.
        let cred = |key: &str| {
            if is_dev {
                get(format!("DEV_{key}").as_str())
            } else {
                get(key)
            }
        };
        let cred_name = |key: &str| {
            if is_dev {
                format!("DEV_{key}")
            } else {
                key.to_string()
            }
        };

        let slack_bot_token = cred("SLACK_BOT_TOKEN").ok_or_else(|| {
            Error::Config(format!(
                "{} environment variable is required",
                cred_name("SLACK_BOT_TOKEN")
            ))
        })?;
        let slack_signing_secret = cred("SLACK_SIGNING_SECRET");
        let slack_app_token = cred("SLACK_APP_TOKEN");

        match connection_mode {
            ConnectionMode::Socket if slack_app_token.is_none() => {
                return Err(Error::Config(format!(
                    "{} environment variable is required for socket mode",
                    cred_name("SLACK_APP_TOKEN")
                )));
            }
            ConnectionMode::Webhook if slack_signing_secret.is_none() => {
                return Err(Error::Config(format!(
                    "{} environment variable is required for the events webhook",
                    cred_name("SLACK_SIGNING_SECRET")
                )));
            }
            _ => {}
        }

        let openai_api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            Error::Config("OPENAI_API_KEY environment variable is required".to_string())
        })?;
        let openai_model =
            get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo-instruct".to_string());
        let openai_base_url = get("OPENAI_BASE_URL")
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();
        let openai_timeout = Duration::from_secs(
            parse_num(get("OPENAI_TIMEOUT_SECS"), "OPENAI_TIMEOUT_SECS")?.unwrap_or(60),
        );

        let slack_api_base = get("SLACK_API_BASE")
            .unwrap_or_else(|| "https://slack.com/api".to_string())
            .trim_end_matches('/')
            .to_string();
        let port = parse_num(get("PORT"), "PORT")?.unwrap_or(8000);
        let socket_reconnect_delay = Duration::from_millis(
            parse_num(get("SOCKET_RECONNECT_DELAY_MS"), "SOCKET_RECONNECT_DELAY_MS")?
                .unwrap_or(2000),
        );

        let bot_name = get("BOT_NAME").unwrap_or_else(|| "Rosie".to_string());
        let respond_to_bots = get("RESPOND_TO_BOTS").map(|s| parse_bool(&s)).unwrap_or(false);
        let thread_history_limit =
            parse_num(get("THREAD_HISTORY_LIMIT"), "THREAD_HISTORY_LIMIT")?.unwrap_or(50);

        Ok(Self {
            env_mode,
            connection_mode,
            slack_bot_token,
            slack_signing_secret,
            slack_app_token,
            slack_api_base,
            port,
            socket_reconnect_delay,
            openai_api_key,
            openai_model,
            openai_base_url,
            openai_timeout,
            bot_name,
            respond_to_bots,
            thread_history_limit,
            prompt: PromptTemplates::default(),
        })
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            respond_to_bots: self.respond_to_bots,
            thread_history_limit: self.thread_history_limit,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_num<T: std::str::FromStr>(v: Option<String>, key: &str) -> Result<Option<T>> {
    match v {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a number, got {s:?}"))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn production_uses_webhook_and_plain_credentials() {
        let cfg = load(&[
            ("APP_ENV", "production"),
            ("SLACK_BOT_TOKEN", "xoxb-prod"),
            ("SLACK_SIGNING_SECRET", "sig"),
            ("DEV_SLACK_BOT_TOKEN", "xoxb-dev"),
            ("OPENAI_API_KEY", "sk-1"),
        ])
        .unwrap();

        assert_eq!(cfg.env_mode, EnvMode::Production);
        assert_eq!(cfg.connection_mode, ConnectionMode::Webhook);
        assert_eq!(cfg.slack_bot_token, "xoxb-prod");
        assert_eq!(cfg.slack_signing_secret.as_deref(), Some("sig"));
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.openai_model, "gpt-3.5-turbo-instruct");
        assert_eq!(cfg.bot_name, "Rosie");
        assert!(!cfg.respond_to_bots);
        assert_eq!(cfg.thread_history_limit, 50);
    }

    #[test]
    fn development_uses_socket_and_dev_credentials() {
        let cfg = load(&[
            ("APP_ENV", "development"),
            ("SLACK_BOT_TOKEN", "xoxb-prod"),
            ("DEV_SLACK_BOT_TOKEN", "xoxb-dev"),
            ("DEV_SLACK_APP_TOKEN", "xapp-dev"),
            ("OPENAI_API_KEY", "sk-1"),
            ("PORT", "3000"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1/"),
        ])
        .unwrap();

        assert_eq!(cfg.env_mode, EnvMode::Development);
        assert_eq!(cfg.connection_mode, ConnectionMode::Socket);
        assert_eq!(cfg.slack_bot_token, "xoxb-dev");
        assert_eq!(cfg.slack_app_token.as_deref(), Some("xapp-dev"));
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.openai_base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn missing_env_defaults_to_production() {
        let cfg = load(&[
            ("SLACK_BOT_TOKEN", "xoxb"),
            ("SLACK_SIGNING_SECRET", "sig"),
            ("OPENAI_API_KEY", "sk"),
        ])
        .unwrap();
        assert_eq!(cfg.env_mode, EnvMode::Production);
    }

    #[test]
    fn missing_credentials_fail_fast() {
        let err = load(&[("APP_ENV", "production"), ("OPENAI_API_KEY", "sk")]).unwrap_err();
        assert!(matches!(err, Error::Config(s) if s.contains("SLACK_BOT_TOKEN")));

        let err = load(&[
            ("APP_ENV", "production"),
            ("SLACK_BOT_TOKEN", "xoxb"),
            ("OPENAI_API_KEY", "sk"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(s) if s.contains("SLACK_SIGNING_SECRET")));

        let err = load(&[
            ("APP_ENV", "development"),
            ("DEV_SLACK_BOT_TOKEN", "xoxb"),
            ("OPENAI_API_KEY", "sk"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(s) if s.contains("DEV_SLACK_APP_TOKEN")));

        let err = load(&[
            ("APP_ENV", "production"),
            ("SLACK_BOT_TOKEN", "xoxb"),
            ("SLACK_SIGNING_SECRET", "sig"),
            ("OPENAI_API_KEY", "  "),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(s) if s.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn behavior_flags_and_bad_numbers() {
        let base = [
            ("SLACK_BOT_TOKEN", "xoxb"),
            ("SLACK_SIGNING_SECRET", "sig"),
            ("OPENAI_API_KEY", "sk"),
        ];

        let mut vars = base.to_vec();
        vars.extend([
            ("RESPOND_TO_BOTS", "yes"),
            ("THREAD_HISTORY_LIMIT", "0"),
            ("BOT_NAME", "Rosie-Dev"),
        ]);
        let cfg = load(&vars).unwrap();
        assert!(cfg.respond_to_bots);
        assert_eq!(cfg.router_config().thread_history_limit, 0);
        assert_eq!(cfg.bot_name, "Rosie-Dev");

        let mut vars = base.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(matches!(load(&vars).unwrap_err(), Error::Config(s) if s.contains("PORT")));
    }

    #[test]
    fn unquote_strips_matching_quotes_only() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"abc"), "\"abc");
        assert_eq!(unquote("abc"), "abc");
    }
}
