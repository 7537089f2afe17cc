//! Pseudonymous user tags for completion API usage attribution.

/// Rolling 31-multiplier hash over the Unicode scalar values of `identifier`,
/// wrapped to a signed 32-bit integer and rendered in decimal.
///
/// Deterministic and non-cryptographic. The result is an opaque tag sent as the
/// completion API `user` field; it is never used for access control.
pub fn user_tag(identifier: &str) -> String {
    identifier
        .chars()
        .fold(0i32, |acc, c| acc.wrapping_mul(31).wrapping_add(c as i32))
        .to_string()
}
