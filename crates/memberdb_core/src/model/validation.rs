//! Write-path validation errors shared by member and team records.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection reason for a record that must not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Member username is empty or whitespace only.
    BlankUsername,
    /// Member age is below zero.
    NegativeAge(i32),
    /// Team name is empty or whitespace only.
    BlankTeamName,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUsername => write!(f, "member username must not be blank"),
            Self::NegativeAge(age) => write!(f, "member age must not be negative, got {age}"),
            Self::BlankTeamName => write!(f, "team name must not be blank"),
        }
    }
}

impl Error for ValidationError {}
