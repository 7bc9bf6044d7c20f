//! Per-field value transformations.
//!
//! A decode hook runs on a field's value right after it was mapped, an encode hook
//! right before it gets encoded. Hooks are keyed by field (or CHOICE alternative) name,
//! which lets e.g. the raw octets of an `iPAddress` be presented as text.

use crate::Result;
use std::collections::HashMap;
use tessera_asn1::Value;

pub type Hook = fn(Value) -> Result<Value>;

#[derive(Clone, Debug, Default)]
pub struct Hooks {
    decode: HashMap<String, Hook>,
    encode: HashMap<String, Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_decode(mut self, field: impl Into<String>, hook: Hook) -> Self {
        self.decode.insert(field.into(), hook);
        self
    }

    pub fn on_encode(mut self, field: impl Into<String>, hook: Hook) -> Self {
        self.encode.insert(field.into(), hook);
        self
    }

    pub fn decode(&self, field: &str, value: Value) -> Result<Value> {
        match self.decode.get(field) {
            Some(hook) => hook(value),
            None => Ok(value),
        }
    }

    pub fn encode(&self, field: &str, value: Value) -> Result<Value> {
        match self.encode.get(field) {
            Some(hook) => hook(value),
            None => Ok(value),
        }
    }

    pub fn has_encode(&self, field: &str) -> bool {
        self.encode.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.decode.is_empty() && self.encode.is_empty()
    }
}
