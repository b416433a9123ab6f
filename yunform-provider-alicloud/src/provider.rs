//! AlicloudProvider - dispatch of generic provider calls to resources and
//! data sources

use std::collections::HashMap;

use yunform_core::provider::{ProviderError, ProviderResult, ResourceType};
use yunform_core::resource::{Resource, ResourceId, State, Value};
use yunform_core::schema::{ResourceSchema, Timeouts};

use crate::client::RpcClient;
use crate::config::AlicloudConfig;
use crate::data_sources::{self, AlicloudDataSource};
use crate::error::AlicloudResult;
use crate::resource_data::ResourceData;
use crate::resources::{self, AlicloudResource};

/// Schema-only view of a registered type
struct RegisteredType {
    name: &'static str,
    schema: ResourceSchema,
}

impl ResourceType for RegisteredType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }
}

pub struct AlicloudProvider {
    client: RpcClient,
    resources: HashMap<&'static str, Box<dyn AlicloudResource>>,
    data_sources: HashMap<&'static str, Box<dyn AlicloudDataSource>>,
}

impl AlicloudProvider {
    pub fn new(config: AlicloudConfig) -> AlicloudResult<Self> {
        Ok(Self::with_client(RpcClient::new(config)?))
    }

    /// Build from a DSL `provider alicloud { ... }` block
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> AlicloudResult<Self> {
        Self::new(AlicloudConfig::from_attributes(attributes)?)
    }

    pub fn with_client(client: RpcClient) -> Self {
        let resources = resources::all().into_iter().map(|r| (r.name(), r)).collect();
        let data_sources = data_sources::all().into_iter().map(|d| (d.name(), d)).collect();
        Self {
            client,
            resources,
            data_sources,
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    fn resource(&self, id: &ResourceId) -> ProviderResult<&dyn AlicloudResource> {
        self.resources
            .get(id.resource_type.as_str())
            .map(|r| r.as_ref())
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown resource type: alicloud.{}", id.resource_type))
                    .for_resource(id.clone())
            })
    }

    fn timeouts(
        resource: &dyn AlicloudResource,
        id: &ResourceId,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<Timeouts> {
        resource.schema().timeouts_for(attributes).map_err(|e| {
            ProviderError::new("Invalid timeouts block")
                .for_resource(id.clone())
                .with_cause(e)
        })
    }

    /// Read back after a write. Attributes the API never returns (passwords,
    /// `dry_run`) keep their desired values.
    async fn settled_state(
        &self,
        resource: &dyn AlicloudResource,
        id: &ResourceId,
        identifier: &str,
        desired: &HashMap<String, Value>,
        operation: &str,
    ) -> ProviderResult<State> {
        let mut attributes = resource
            .read(&self.client, identifier)
            .await
            .map_err(|e| e.into_provider_error(id, operation))?
            .unwrap_or_default();
        for (key, value) in desired {
            if key != "timeouts" && !attributes.contains_key(key) {
                attributes.insert(key.clone(), value.clone());
            }
        }
        attributes.insert("id".to_string(), Value::String(identifier.to_string()));
        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    pub async fn read_resource(&self, id: &ResourceId, identifier: Option<&str>) -> ProviderResult<State> {
        let resource = self.resource(id)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        match resource
            .read(&self.client, identifier)
            .await
            .map_err(|e| e.into_provider_error(id, "Read"))?
        {
            Some(mut attributes) => {
                attributes.insert("id".to_string(), Value::String(identifier.to_string()));
                Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
            }
            None => {
                log::info!("{} ({}) no longer exists", id, identifier);
                Ok(State::not_found(id.clone()))
            }
        }
    }

    pub async fn create_resource(&self, desired: Resource) -> ProviderResult<State> {
        let id = desired.id.clone();
        let resource = self.resource(&id)?;
        let schema = resource.schema();
        let mut attributes = desired.user_attributes();
        schema.apply_defaults(&mut attributes);
        let timeouts = Self::timeouts(resource, &id, &attributes)?;

        let data = ResourceData::new(&attributes);
        let identifier = resource
            .create(&self.client, &data, &timeouts)
            .await
            .map_err(|e| e.into_provider_error(&id, "Create"))?;
        log::info!("created {} as {}", id, identifier);

        self.settled_state(resource, &id, &identifier, &attributes, "Create")
            .await
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let resource = self.resource(id)?;
        let mut attributes = to.user_attributes();
        resource.schema().apply_defaults(&mut attributes);
        let timeouts = Self::timeouts(resource, id, &attributes)?;

        let data = ResourceData::new(&attributes).with_previous(&from.attributes);
        resource
            .update(&self.client, identifier, &data, &timeouts)
            .await
            .map_err(|e| e.into_provider_error(id, "Update"))?;
        log::info!("updated {} ({})", id, identifier);

        self.settled_state(resource, id, identifier, &attributes, "Update")
            .await
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str, state: &State) -> ProviderResult<()> {
        let resource = self.resource(id)?;
        let timeouts = Self::timeouts(resource, id, &state.attributes)?;
        let data = ResourceData::new(&state.attributes);
        resource
            .delete(&self.client, identifier, &data, &timeouts)
            .await
            .map_err(|e| e.into_provider_error(id, "Delete"))?;
        log::info!("deleted {} ({})", id, identifier);
        Ok(())
    }

    pub async fn read_data(&self, query: &Resource) -> ProviderResult<State> {
        let id = query.id.clone();
        let source = self.data_sources.get(id.resource_type.as_str()).ok_or_else(|| {
            ProviderError::new(format!("Unknown data source: alicloud.{}", id.resource_type))
                .for_resource(id.clone())
        })?;

        let args = query.user_attributes();
        let result = source
            .read(&self.client, &args)
            .await
            .map_err(|e| e.into_provider_error(&id, "Read data source"))?;
        let identifier = result
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(State::existing(id, result).with_identifier(identifier))
    }

    pub(crate) fn registered_resources(&self) -> Vec<Box<dyn ResourceType>> {
        registered(self.resources.values().map(|r| (r.name(), r.schema())))
    }

    pub(crate) fn registered_data_sources(&self) -> Vec<Box<dyn ResourceType>> {
        registered(self.data_sources.values().map(|d| (d.name(), d.schema())))
    }
}

fn registered(types: impl Iterator<Item = (&'static str, ResourceSchema)>) -> Vec<Box<dyn ResourceType>> {
    let mut types: Vec<Box<dyn ResourceType>> = types
        .map(|(name, schema)| Box::new(RegisteredType { name, schema }) as Box<dyn ResourceType>)
        .collect();
    types.sort_by_key(|t| t.name());
    types
}
