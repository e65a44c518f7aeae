use thiserror::Error;

use crate::verb::Verb;

/// Problems in a contract document that stop extraction.
///
/// Every variant carries the 1-based line of the offending heading so the
/// document author can find it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("line {line}: endpoint '{endpoint}' has no `Method:` line")]
    MissingVerb { endpoint: String, line: usize },

    #[error("line {line}: endpoint '{endpoint}' uses unsupported method '{verb}'")]
    UnsupportedVerb {
        endpoint: String,
        verb: String,
        line: usize,
    },

    #[error("line {line}: '{name}' is not a valid {kind} name")]
    InvalidName {
        kind: &'static str,
        name: String,
        line: usize,
    },

    #[error("line {line}: malformed table in '{section}': {reason}")]
    MalformedTable {
        section: String,
        reason: String,
        line: usize,
    },

    #[error("line {line}: type '{name}' has no definition")]
    EmptyType { name: String, line: usize },

    #[error("line {line}: endpoint '{name}' ({verb}) is already defined at line {first_line}")]
    DuplicateEndpoint {
        name: String,
        verb: Verb,
        line: usize,
        first_line: usize,
    },

    #[error("line {line}: type '{name}' is already defined at line {first_line}")]
    DuplicateType {
        name: String,
        line: usize,
        first_line: usize,
    },
}

impl ExtractError {
    pub fn line(&self) -> usize {
        match self {
            Self::MissingVerb { line, .. }
            | Self::UnsupportedVerb { line, .. }
            | Self::InvalidName { line, .. }
            | Self::MalformedTable { line, .. }
            | Self::EmptyType { line, .. }
            | Self::DuplicateEndpoint { line, .. }
            | Self::DuplicateType { line, .. } => *line,
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
