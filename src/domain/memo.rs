//! Memo identity and insert payload validation.
//!
//! Incoming payloads are checked here before anything reaches a repository,
//! so the store only ever receives trimmed, bounded text.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

pub const MAX_MEMO_TEXT_CHARS: usize = 1000;

/// Store-assigned memo identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoId(i64);

impl MemoId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemoId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed: i64 = trimmed
            .parse()
            .map_err(|_| DomainError::validation(format!("memo id `{trimmed}` is not an integer")))?;
        if parsed <= 0 {
            return Err(DomainError::validation(format!(
                "memo id must be positive, got {parsed}"
            )));
        }
        Ok(Self(parsed))
    }
}

/// Raw request body for memo creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoInput {
    #[serde(default)]
    pub text: Option<String>,
}

/// Validated memo ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMemo {
    text: String,
}

impl NewMemo {
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("memo text must not be empty"));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_MEMO_TEXT_CHARS {
            return Err(DomainError::validation(format!(
                "memo text exceeds {MAX_MEMO_TEXT_CHARS} characters ({chars})"
            )));
        }
        Ok(Self {
            text: trimmed.to_string(),
        })
    }

    /// Decode and validate a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self, DomainError> {
        let input: MemoInput = serde_json::from_slice(body)
            .map_err(|err| DomainError::validation(format!("malformed memo payload: {err}")))?;
        Self::try_from(input)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl TryFrom<MemoInput> for NewMemo {
    type Error = DomainError;

    fn try_from(input: MemoInput) -> Result<Self, Self::Error> {
        match input.text {
            Some(text) => Self::new(text),
            None => Err(DomainError::validation("memo text is required")),
        }
    }
}
