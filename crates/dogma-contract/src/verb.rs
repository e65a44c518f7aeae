use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP-style method of an endpoint.
///
/// Parsing is total: anything outside the five supported verbs is kept as
/// [`Verb::Other`] so that callers can decide how to treat it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Other(String),
}

impl Verb {
    pub const SUPPORTED: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete, Verb::Patch];

    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "GET" => Verb::Get,
            "POST" => Verb::Post,
            "PUT" => Verb::Put,
            "DELETE" => Verb::Delete,
            "PATCH" => Verb::Patch,
            _ => Verb::Other(trimmed.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
            Verb::Other(value) => value,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Verb::Other(_))
    }

    /// Whether requests with this verb carry a payload that is decoded into
    /// the handler's body parameter.
    pub fn carries_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Verb::parse(value))
    }
}

impl From<String> for Verb {
    fn from(value: String) -> Self {
        Verb::parse(&value)
    }
}

impl From<Verb> for String {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Other(value) => value,
            supported => supported.as_str().to_owned(),
        }
    }
}
