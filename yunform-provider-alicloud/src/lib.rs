//! Yunform Alibaba Cloud Provider
//!
//! Manages Alibaba Cloud resources through the RPC-style product APIs.
//!
//! ## Module Structure
//!
//! - `client` - Signed RPC client with retry
//! - `service` - Per-product describe helpers and status refresh functions
//! - `resources` - Managed resource types
//! - `data_sources` - Read-only list queries
//! - `convert`, `jsonpath`, `paging`, `filter` - Shared plumbing
//! - `provider` - AlicloudProvider implementation

pub mod client;
pub mod config;
pub mod convert;
pub mod data_sources;
pub mod error;
pub mod filter;
pub mod jsonpath;
pub mod paging;
pub mod provider;
pub mod resource_data;
pub mod resources;
pub mod service;

pub use config::AlicloudConfig;
pub use error::{AlicloudError, AlicloudResult};
pub use provider::AlicloudProvider;

use yunform_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use yunform_core::resource::{Resource, ResourceId, State};

impl Provider for AlicloudProvider {
    fn name(&self) -> &'static str {
        "alicloud"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.registered_resources()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.registered_data_sources()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.read_data(&resource).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        state: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let state = state.clone();
        Box::pin(async move { self.delete_resource(&id, &identifier, &state).await })
    }
}
