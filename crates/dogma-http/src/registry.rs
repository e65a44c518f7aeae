use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use dogma_contract::{EndpointDescriptor, Verb};
use serde::{Deserialize, Serialize};

/// How a handler is exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    #[serde(rename = "method")]
    pub verb: Verb,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, verb: Verb) -> Self {
        Self {
            name: name.into(),
            verb,
        }
    }

    /// Route path, always `/{name}`.
    pub fn path(&self) -> String {
        format!("/{}", self.name.trim_start_matches('/'))
    }
}

impl From<&EndpointDescriptor> for Descriptor {
    fn from(endpoint: &EndpointDescriptor) -> Self {
        Self::new(endpoint.name.clone(), endpoint.verb.clone())
    }
}

/// Key derived from a handler's static type.
///
/// Every closure and every `fn` item has its own type, so two distinct
/// handlers never share a key.
#[derive(Clone, Copy)]
pub struct SignatureKey {
    id: TypeId,
    name: &'static str,
}

impl SignatureKey {
    pub fn of<F: 'static>() -> Self {
        Self {
            id: TypeId::of::<F>(),
            name: type_name::<F>(),
        }
    }

    pub fn of_val<F: 'static>(_handler: &F) -> Self {
        Self::of::<F>()
    }

    /// Type name of the handler, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for SignatureKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SignatureKey {}

impl std::hash::Hash for SignatureKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignatureKey").field(&self.name).finish()
    }
}

/// Maps handler signatures to their descriptors.
///
/// Populated once during setup, then shared read-only with the binder.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entries: HashMap<SignatureKey, Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor previously stored under `key`, if any.
    pub fn insert(&mut self, key: SignatureKey, descriptor: Descriptor) -> Option<Descriptor> {
        self.entries.insert(key, descriptor)
    }

    /// Pair `handler` with `descriptor`.
    pub fn describe<F: 'static>(mut self, handler: &F, descriptor: Descriptor) -> Self {
        self.insert(SignatureKey::of_val(handler), descriptor);
        self
    }

    pub fn get(&self, key: &SignatureKey) -> Option<&Descriptor> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.entries.values()
    }
}
