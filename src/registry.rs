//! Endpoint registry: write-once, insertion-ordered route table.

use std::sync::Arc;

use indexmap::IndexMap;
use schemars::{Map, schema::Schema};

use crate::error::{RegistrationError, RouteNotFound};
use crate::signature::FunctionDescriptor;
use crate::synth::{SchemaDefinition, SynthesizedSchemas};

/// A registered route: the function and the schemas synthesized for it.
#[derive(Debug)]
pub struct RouteEntry {
    pub name: String,
    pub descriptor: FunctionDescriptor,
    pub input: SchemaDefinition,
    pub output: SchemaDefinition,
    /// Named types referenced from `input` or `output`.
    pub definitions: Map<String, Schema>,
}

/// Ordered mapping from route name to [`RouteEntry`].
///
/// Populated before the server starts and read-only afterwards; entries are
/// shared as `Arc`s so dispatch never holds a borrow of the registry across
/// an await point.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    entries: IndexMap<String, Arc<RouteEntry>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new route. Names are write-once.
    pub fn register(
        &mut self,
        name: &str,
        descriptor: FunctionDescriptor,
        schemas: SynthesizedSchemas,
    ) -> Result<Arc<RouteEntry>, RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::EmptyRouteName);
        }
        if self.entries.contains_key(name) {
            return Err(RegistrationError::DuplicateRoute(name.to_string()));
        }

        let SynthesizedSchemas {
            input,
            output,
            definitions,
        } = schemas;
        let entry = Arc::new(RouteEntry {
            name: name.to_string(),
            descriptor,
            input,
            output,
            definitions,
        });
        self.entries.insert(name.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<RouteEntry>, RouteNotFound> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| RouteNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Every entry, in registration order.
    pub fn all_entries(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
