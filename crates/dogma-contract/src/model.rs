use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::verb::Verb;

/// One row of a field table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
}

/// Shape of an endpoint's URL parameters, body or result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Schema {
    #[default]
    Empty,
    Fields {
        fields: Vec<Field>,
    },
    Raw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        matches!(self, Schema::Empty)
    }

    pub fn fields(&self) -> &[Field] {
        match self {
            Schema::Fields { fields } => fields,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub name: String,
    #[serde(rename = "method")]
    pub verb: Verb,
    #[serde(default, skip_serializing_if = "Schema::is_empty")]
    pub url_params: Schema,
    #[serde(default, skip_serializing_if = "Schema::is_empty")]
    pub body: Schema,
    #[serde(default, skip_serializing_if = "Schema::is_empty")]
    pub result: Schema,
}

impl EndpointDescriptor {
    /// Route path the endpoint is served under.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDefinition {
    Fields {
        fields: Vec<Field>,
    },
    Raw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub name: String,
    pub definition: TypeDefinition,
}

/// Non-fatal finding reported to the document author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub front_matter: BTreeMap<String, String>,
    pub endpoints: Vec<EndpointDescriptor>,
    pub types: BTreeMap<String, TypeSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Contract {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|endpoint| endpoint.name == name)
    }
}
