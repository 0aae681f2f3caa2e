//! Rendering of init key material for the operator.
//!
//! The text form is fixed:
//!
//! ```text
//! Unseal Key 1: <share>
//! ...
//! Unseal Key N: <share>
//!
//! Initial Root Token: <token>
//!
//! ```

use thiserror::Error;

use crate::net::InitResult;
use crate::secret::SecretString;

const KEY_PREFIX: &str = "Unseal Key ";
const TOKEN_PREFIX: &str = "Initial Root Token: ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("line {line}: expected 'Unseal Key {expected}: <share>'")]
    UnexpectedKey { line: usize, expected: usize },
    #[error("no 'Initial Root Token' line found")]
    MissingRootToken,
}

/// Renders the base64 shares (1-indexed, in init order) and the root token.
pub fn render(init: &InitResult) -> String {
    let mut out = String::new();
    for (i, share) in init.keys_base64.iter().enumerate() {
        out.push_str(&format!("{}{}: {}\n", KEY_PREFIX, i + 1, share.expose()));
    }
    out.push('\n');
    out.push_str(&format!("{}{}\n\n", TOKEN_PREFIX, init.root_token.expose()));
    out
}

/// Inverse of [`render`]: recovers the ordered shares and the root token.
pub fn parse_rendered(text: &str) -> Result<(Vec<SecretString>, SecretString), RenderError> {
    let mut shares = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(token) = line.strip_prefix(TOKEN_PREFIX) {
            return Ok((shares, SecretString::from(token)));
        }
        if line.is_empty() {
            continue;
        }
        let expected = shares.len() + 1;
        let share = line
            .strip_prefix(KEY_PREFIX)
            .and_then(|rest| rest.split_once(": "))
            .filter(|(n, _)| n.parse::<usize>().ok() == Some(expected))
            .map(|(_, share)| share)
            .ok_or(RenderError::UnexpectedKey {
                line: idx + 1,
                expected,
            })?;
        shares.push(SecretString::from(share));
    }
    Err(RenderError::MissingRootToken)
}
