//! State file structures for persisting infrastructure state

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use yunform_core::resource::{ResourceId, State, json_to_value, value_to_json};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// Format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identity of this deployment's state; never changes once created
    pub lineage: String,
    /// Version of yunform that last wrote this state
    pub yunform_version: String,
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            yunform_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.yunform_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    pub fn find_resource_mut(&mut self, resource_type: &str, name: &str) -> Option<&mut ResourceState> {
        self.resources
            .iter_mut()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    /// Insert, or replace the entry with the same type and name
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        match self.find_resource_mut(&resource.resource_type, &resource.name) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, resource_type: &str, name: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// Recorded states keyed by resource id
    pub fn states(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| (r.resource_id(), r.to_state()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceState {
    /// Type without the provider prefix, e.g. `vpc`
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Binding name in the DSL
    pub name: String,
    pub provider: String,
    /// Cloud-side id, e.g. `vpc-bp1...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub attributes: HashMap<String, serde_json::Value>,
    /// Bindings this resource referenced when it was applied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            identifier: None,
            attributes: HashMap::new(),
            dependencies: Vec::new(),
        }
    }

    /// Record a provider state. Unresolved references are dropped.
    pub fn from_state(state: &State, provider: impl Into<String>) -> Self {
        let attributes = state
            .attributes
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .filter_map(|(k, v)| value_to_json(v).map(|json| (k.clone(), json)))
            .collect();
        Self {
            identifier: state.identifier.clone(),
            attributes,
            ..Self::new(&state.id.resource_type, &state.id.name, provider)
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_dependencies(mut self, mut dependencies: Vec<String>) -> Self {
        dependencies.sort();
        dependencies.dedup();
        self.dependencies = dependencies;
        self
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn to_state(&self) -> State {
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| json_to_value(v).map(|value| (k.clone(), value)))
            .collect();
        let state = State::existing(self.resource_id(), attributes);
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        }
    }
}
