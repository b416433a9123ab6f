//! Data sources: list, filter and flatten existing cloud objects
//!
//! Every data source takes the common `ids`, `name_regex`, `status` and
//! `output_file` arguments where they apply, and reports `ids`, `names`
//! and a list of flattened objects.

mod alb_listeners;
mod alb_rules;
mod cen_instances;
mod cloud_storage_gateway_storage_bundles;
mod dbfs_snapshots;
mod dts_synchronization_jobs;
mod vpcs;
mod vswitches;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as Json;
use yunform_core::resource::{Value, value_to_json};
use yunform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::client::{Product, Request, RpcClient};
use crate::convert::fields_from_response;
use crate::error::AlicloudResult;
use crate::filter::{Filters, data_resource_id, write_output_file};
use crate::jsonpath;
use crate::paging::{paginate_pages, paginate_tokens};
use crate::service::DESCRIBE_TIMEOUT;

/// Page size requested from `PageNumber` style list APIs
pub(crate) const PAGE_SIZE: usize = 50;

#[async_trait]
pub trait AlicloudDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Query the API and return the arguments plus the computed results
    async fn read(
        &self,
        client: &RpcClient,
        args: &HashMap<String, Value>,
    ) -> AlicloudResult<HashMap<String, Value>>;
}

pub fn all() -> Vec<Box<dyn AlicloudDataSource>> {
    vec![
        Box::new(alb_rules::AlbRules),
        Box::new(alb_listeners::AlbListeners),
        Box::new(vpcs::Vpcs),
        Box::new(vswitches::VSwitches),
        Box::new(cen_instances::CenInstances),
        Box::new(dbfs_snapshots::DbfsSnapshots),
        Box::new(cloud_storage_gateway_storage_bundles::StorageBundles),
        Box::new(dts_synchronization_jobs::DtsSynchronizationJobs),
    ]
}

/// Which of the common filter arguments a data source accepts
#[derive(Debug, Clone, Copy)]
pub(crate) struct Listing {
    pub list_key: &'static str,
    pub id_field: &'static str,
    pub name_field: Option<&'static str>,
    pub status_field: Option<&'static str>,
}

impl Listing {
    /// Schema with the common arguments, the results, and `extra` arguments
    pub fn schema(
        &self,
        name: &str,
        description: &str,
        fields: Vec<AttributeSchema>,
        extra: Vec<AttributeSchema>,
    ) -> ResourceSchema {
        let mut object_fields = vec![AttributeSchema::new("id", AttributeType::String).computed()];
        object_fields.extend(fields);

        let mut schema = ResourceSchema::new(name)
            .with_description(description)
            .as_data_source()
            .attribute(AttributeSchema::new("ids", types::string_list()).optional_computed())
            .attribute(AttributeSchema::new("output_file", AttributeType::String))
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
            .attribute(AttributeSchema::new(self.list_key, types::blocks(object_fields)).computed());
        if self.name_field.is_some() {
            schema = schema
                .attribute(AttributeSchema::new("name_regex", AttributeType::String))
                .attribute(AttributeSchema::new("names", types::string_list()).computed());
        }
        if self.status_field.is_some() {
            schema = schema.attribute(AttributeSchema::new("status", AttributeType::String));
        }
        for attribute in extra {
            schema = schema.attribute(attribute);
        }
        schema
    }

    /// Filter `objects`, flatten the survivors and fill in the results
    pub fn finish(
        &self,
        schema: &ResourceSchema,
        args: &HashMap<String, Value>,
        objects: Vec<Json>,
    ) -> AlicloudResult<HashMap<String, Value>> {
        let filters = Filters::from_attributes(args)?;
        let fields = schema
            .attributes
            .get(self.list_key)
            .and_then(|a| a.attr_type.struct_fields())
            .unwrap_or_default();

        let mut ids = Vec::new();
        let mut names = Vec::new();
        let mut items = Vec::new();
        for object in objects {
            let Some(id) = jsonpath::string(&object, self.id_field) else {
                log::warn!("{}: skipping an object without {}", schema.resource_type, self.id_field);
                continue;
            };
            let name = self.name_field.and_then(|f| jsonpath::string(&object, f));
            let status = self.status_field.and_then(|f| jsonpath::string(&object, f));
            if !filters.matches(&id, name.as_deref(), status.as_deref()) {
                continue;
            }

            let mut flat = fields_from_response(fields.iter().filter(|f| f.name != "id"), &object);
            flat.insert("id".to_string(), Value::String(id.clone()));
            ids.push(id);
            if let Some(name) = name {
                names.push(name);
            }
            items.push(Value::Map(flat));
        }
        log::debug!("{}: {} objects after filtering", schema.resource_type, items.len());

        let mut result = args.clone();
        result.insert("id".to_string(), Value::String(data_resource_id(&ids)));
        if self.name_field.is_some() {
            result.insert("names".to_string(), strings(&names));
        }
        result.insert("ids".to_string(), strings(&ids));
        let list = Value::List(items);

        if let Some(path) = args.get("output_file").and_then(Value::as_str)
            && !path.is_empty()
        {
            let body = value_to_json(&list).unwrap_or(Json::Array(Vec::new()));
            write_output_file(path, &body)?;
        }
        result.insert(self.list_key.to_string(), list);
        Ok(result)
    }
}

fn strings(values: &[String]) -> Value {
    Value::List(values.iter().cloned().map(Value::String).collect())
}

/// Field mapped from the API key `api`
pub(crate) fn field(name: &str, attr_type: AttributeType, api: &str) -> AttributeSchema {
    AttributeSchema::new(name, attr_type).computed().with_provider_name(api)
}

/// String list argument as a request array, flattened to `Key.N`
pub(crate) fn list_arg(args: &HashMap<String, Value>, name: &str) -> Option<Json> {
    let items: Vec<Json> = args
        .get(name)?
        .as_list()?
        .iter()
        .filter_map(Value::as_str)
        .map(|s| Json::String(s.to_string()))
        .collect();
    (!items.is_empty()).then_some(Json::Array(items))
}

/// Scalar argument as a request value
pub(crate) fn scalar_arg(args: &HashMap<String, Value>, name: &str) -> Option<Json> {
    match args.get(name)? {
        Value::String(s) => Some(Json::String(s.clone())),
        Value::Int(i) => Some(Json::from(*i)),
        Value::Bool(b) => Some(Json::Bool(*b)),
        _ => None,
    }
}

/// Every object of a `NextToken` paged list action
pub(crate) async fn list_by_token(
    client: &RpcClient,
    product: Product,
    action: &str,
    request: &Request,
    items_path: &str,
) -> AlicloudResult<Vec<Json>> {
    paginate_tokens(|token| {
        let mut request = request.clone();
        async move {
            request.insert("MaxResults".to_string(), Json::from(PAGE_SIZE));
            if let Some(token) = token {
                request.insert("NextToken".to_string(), Json::String(token));
            }
            let response = client
                .request_with_retry(product, action, &request, DESCRIBE_TIMEOUT, &[])
                .await?;
            let items = jsonpath::list(&response, items_path)?;
            Ok((items, jsonpath::string(&response, "NextToken")))
        }
    })
    .await
}

/// Every object of a `PageNumber` paged list action
pub(crate) async fn list_by_page(
    client: &RpcClient,
    product: Product,
    action: &str,
    request: &Request,
    items_path: &str,
) -> AlicloudResult<Vec<Json>> {
    paginate_pages(PAGE_SIZE, |page| {
        let mut request = request.clone();
        async move {
            request.insert("PageNumber".to_string(), Json::from(page));
            request.insert("PageSize".to_string(), Json::from(PAGE_SIZE));
            let response = client
                .request_with_retry(product, action, &request, DESCRIBE_TIMEOUT, &[])
                .await?;
            jsonpath::list(&response, items_path)
        }
    })
    .await
}
