//! API contract extraction from Markdown documents.
//!
//! A document describes endpoints under a section whose title matches the
//! configured API heading (`API` by default), and named types under a section
//! matching the types heading (`Types`):
//!
//! ```markdown
//! # API
//!
//! ## users/{id}
//!
//! Method: GET
//!
//! ### Params
//!
//! | Name | Type   | Description |
//! | ---- | ------ | ----------- |
//! | id   | string | user id     |
//!
//! ### Result
//!
//! | Name | Type |
//! | ---- | ---- |
//! | user | User |
//!
//! # Types
//!
//! ## User
//!
//! | Name | Type   |
//! | ---- | ------ |
//! | name | string |
//! ```
//!
//! Each child of an API section is one endpoint. Its title is the route name
//! and its own body must contain a `Method: VERB` line. `Params`, `Body` and
//! `Result` subsections hold a field table (a `Name` and a `Type` column,
//! optional `Description` and `Required`) or a fenced block. Each child of a
//! types section is one type, defined by a table, a fenced block or prose.
//! Anything else in the document is ignored.
//!
//! An endpoint is identified by its name and method together, so `GET ping`
//! and `POST ping` are two endpoints. Types are identified by name alone.

mod content;
mod error;
mod extract;
mod model;
mod verb;

pub use error::{ExtractError, ExtractResult};
pub use extract::Extractor;
pub use model::{
    Contract, Diagnostic, EndpointDescriptor, Field, Schema, TypeDefinition, TypeSchema,
};
pub use verb::Verb;

pub use dogma_config::DuplicatePolicy;

/// Parse `source` with the default extraction settings.
pub fn parse_document(source: &str) -> ExtractResult<Contract> {
    Extractor::default().parse_document(source)
}
