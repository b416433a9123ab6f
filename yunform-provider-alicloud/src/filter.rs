//! Client-side filters and result helpers for data sources

use std::collections::{HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use yunform_core::resource::Value;

use crate::error::{AlicloudError, AlicloudResult};

/// Compiled `name_regex` argument
#[derive(Debug, Clone)]
pub struct NameRegex(Regex);

impl NameRegex {
    pub fn new(pattern: &str) -> AlicloudResult<Self> {
        Regex::new(pattern)
            .map(NameRegex)
            .map_err(|e| AlicloudError::InvalidArgument(format!("name_regex: {}", e)))
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

/// Common data source filters: `ids`, `name_regex` and `status`
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub ids: Option<HashSet<String>>,
    pub name_regex: Option<NameRegex>,
    pub status: Option<String>,
}

impl Filters {
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> AlicloudResult<Self> {
        let ids = match attributes.get("ids") {
            Some(Value::List(items)) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            Some(_) => {
                return Err(AlicloudError::InvalidArgument(
                    "ids must be a list of strings".to_string(),
                ));
            }
            None => None,
        };
        let name_regex = attributes
            .get("name_regex")
            .and_then(Value::as_str)
            .map(NameRegex::new)
            .transpose()?;
        let status = attributes
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            ids,
            name_regex,
            status,
        })
    }

    /// An empty `ids` list matches nothing
    pub fn matches(&self, id: &str, name: Option<&str>, status: Option<&str>) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(id)
        {
            return false;
        }
        if let Some(regex) = &self.name_regex
            && !name.is_some_and(|n| regex.is_match(n))
        {
            return false;
        }
        if let Some(wanted) = &self.status
            && status != Some(wanted.as_str())
        {
            return false;
        }
        true
    }
}

/// Stable id for a data source result: crc32 of the ids, each followed by `-`
pub fn data_resource_id(ids: &[String]) -> String {
    let mut joined = String::new();
    for id in ids {
        joined.push_str(id);
        joined.push('-');
    }
    crc32fast::hash(joined.as_bytes()).to_string()
}

/// Write data source results as pretty JSON
pub fn write_output_file(path: &str, value: &serde_json::Value) -> AlicloudResult<()> {
    let to_error = |source| AlicloudError::OutputFile {
        path: path.to_string(),
        source,
    };
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| AlicloudError::InvalidArgument(format!("output_file: {}", e)))?;
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, body).map_err(to_error)
}
