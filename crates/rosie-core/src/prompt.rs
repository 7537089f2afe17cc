//! Prompt assembly for the completion model.
//!
//! Prompts are plain text: fixed template fragments glued to either the raw
//! question (new topic) or a turn-by-turn transcript (thread continuation).

use crate::history::ThreadTranscript;

const EXAMPLE: &str = concat!(
    r#"###


User:
How do I navigate programmatically in React?

I know I can create <Link /> objects to click and navigate, but how do I navigate based on a programmatic event happening?

###
AI:
You can use the `useHistory` hook to programmatically navigate pages in React. This only works in the new functional React style."#,
    // Trailing space before the newline is part of the prompt.
    " \n",
    r#"
Here's an example:
``` JS
import { useHistory } from "react-router-dom";

function HomeButton() {
  const history = useHistory();

  function handleClick() {
    history.push("/home");
  }

  return (
    <button type="button" onClick={handleClick}>
      Go home
    </button>
  );
}
```

Here's a link to the official [documentation](https://v5.reactrouter.com/web/api/Hooks/usehistory]"#
);

const ANSWER_SUFFIX: &str = "\n\nAnswer text:";

const FRAMING: &str =
    "The following is a conversation between a React engineer and a helpful AI pair programmer:";

pub const DELIMITER: &str = "###";
const USER_TURN: &str = "\n###\nUser:\n";
const AI_TURN: &str = "\n###\nAI:\n";

/// Immutable prompt fragments, built once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Few-shot question/answer block shown to the model.
    pub example: String,
    /// `example` closed by the `###` delimiter; prefix of every new-topic prompt.
    pub header: String,
    /// Trailing cue after a new-topic question.
    pub answer_suffix: String,
    /// Opening sentence of every continuation prompt.
    pub framing: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            example: EXAMPLE.to_string(),
            header: format!("{EXAMPLE}\n\n{DELIMITER}"),
            answer_suffix: ANSWER_SUFFIX.to_string(),
            framing: FRAMING.to_string(),
        }
    }
}

impl PromptTemplates {
    /// `header + "\n" + question + answer_suffix`.
    pub fn new_topic(&self, question: &str) -> String {
        let mut out = String::with_capacity(
            self.header.len() + question.len() + self.answer_suffix.len() + 1,
        );
        out.push_str(&self.header);
        out.push('\n');
        out.push_str(question);
        out.push_str(&self.answer_suffix);
        out
    }

    /// Framing and few-shot block, then one delimited turn per transcript
    /// message in order, then an empty `AI:` turn for the model to fill.
    pub fn continuation(&self, transcript: &ThreadTranscript) -> String {
        let mut out = String::new();
        out.push_str(&self.framing);
        out.push('\n');
        out.push_str(&self.example);

        for msg in transcript.messages() {
            if msg.is_from_bot() {
                out.push_str(AI_TURN);
            } else {
                out.push_str(USER_TURN);
            }
            out.push_str(&msg.text);
        }

        out.push_str(AI_TURN);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChannelId, MessageTs},
        messaging::types::{InboundMessage, Origin},
    };

    fn turn(ts: &str, origin: Origin, text: &str) -> InboundMessage {
        InboundMessage {
            channel_id: ChannelId::new("C1"),
            ts: MessageTs::new(ts),
            thread_ts: Some(MessageTs::new("1")),
            author_id: None,
            text: text.to_string(),
            origin,
        }
    }

    #[test]
    fn header_ends_with_delimiter() {
        let t = PromptTemplates::default();
        assert!(t.header.starts_with(DELIMITER));
        assert!(t.header.ends_with(DELIMITER));
        assert!(t.header.contains("How do I navigate programmatically in React?"));
    }

    #[test]
    fn example_block_keeps_source_text() {
        let t = PromptTemplates::default();
        assert!(t.example.contains("functional React style. \n\nHere's an example:"));
        assert!(t
            .example
            .ends_with("(https://v5.reactrouter.com/web/api/Hooks/usehistory]"));
        assert!(t.example.contains("``` JS\nimport { useHistory }"));
    }

    #[test]
    fn new_topic_prompt_is_exact() {
        let t = PromptTemplates::default();
        let p = t.new_topic("Why is the sky blue?");
        let expected = format!("{EXAMPLE}\n\n###\nWhy is the sky blue?\n\nAnswer text:");
        assert_eq!(p, expected);
        assert_eq!(p, format!("{}\n{}{}", t.header, "Why is the sky blue?", t.answer_suffix));
    }

    #[test]
    fn continuation_orders_turns_and_ends_with_ai_cue() {
        let t = PromptTemplates::default();
        let transcript = ThreadTranscript::new(vec![
            turn("1", Origin::Human, "Q1"),
            turn("2", Origin::SelfBot, "A1"),
        ]);
        let p = t.continuation(&transcript);

        assert!(p.starts_with(FRAMING));
        let after_example = FRAMING.len() + 1 + EXAMPLE.len();
        assert_eq!(&p[..after_example], format!("{FRAMING}\n{EXAMPLE}"));

        let rest = &p[after_example..];
        assert_eq!(rest, "\n###\nUser:\nQ1\n###\nAI:\nA1\n###\nAI:\n");

        let user = p.find("User:\nQ1").unwrap();
        let ai = p.find("AI:\nA1").unwrap();
        assert!(user < ai);
        assert!(p.ends_with("AI:\n"));
    }

    #[test]
    fn other_bots_are_rendered_as_ai_turns() {
        let t = PromptTemplates::default();
        let transcript = ThreadTranscript::new(vec![turn("1", Origin::OtherBot, "beep")]);
        assert!(t.continuation(&transcript).ends_with("\n###\nAI:\nbeep\n###\nAI:\n"));
    }

    #[test]
    fn prompts_are_never_empty() {
        let t = PromptTemplates::default();
        assert!(!t.new_topic("").is_empty());
        assert!(!t.continuation(&ThreadTranscript::default()).is_empty());
    }
}
