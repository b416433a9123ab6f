//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource and data source type,
//! enabling type validation before any API call is made.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::resource::Value;

/// Validation function attached to a custom type
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Attribute type
#[derive(Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number (integers are accepted)
    Float,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: Validator,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Struct(Vec<AttributeSchema>),
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // References resolve at apply time; their target is checked then
            (_, Value::ResourceRef(_, _)) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Struct(fields), Value::Map(map)) => {
                let errors = validate_fields(fields, map);
                match errors.into_iter().next() {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Struct(_) => "Block".to_string(),
        }
    }

    /// Fields of a nested block, looking through a surrounding list
    pub fn struct_fields(&self) -> Option<&[AttributeSchema]> {
        match self {
            AttributeType::Struct(fields) => Some(fields),
            AttributeType::List(inner) => inner.struct_fields(),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' allows at most {max} items, got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("Attribute '{name}' requires at least {min} items, got {got}")]
    TooFewItems { name: String, min: usize, got: usize },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    pub(crate) fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Value is filled in by the cloud API
    pub computed: bool,
    /// Users may set the attribute even though it is computed
    pub settable: bool,
    /// Changing the attribute requires replacing the resource
    pub force_new: bool,
    /// Value is masked in plan output
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// API-side field name (e.g., "RuleName")
    pub provider_name: Option<String>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            settable: true,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
            provider_name: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Read-only attribute populated from the API
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.settable = false;
        self
    }

    /// Optional attribute that the API fills in when omitted
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.settable = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn with_items(mut self, min: usize, max: usize) -> Self {
        self.min_items = Some(min);
        self.max_items = Some(max);
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// True if users cannot set this attribute
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.settable
    }

    /// API-side name, defaulting to the attribute name
    pub fn api_name(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(&self.name)
    }

    fn check(&self, value: &Value) -> Vec<TypeError> {
        let mut errors = Vec::new();
        if self.is_read_only() {
            errors.push(TypeError::ComputedAttribute {
                name: self.name.clone(),
            });
            return errors;
        }

        if let Value::List(items) = value {
            if let Some(max) = self.max_items
                && items.len() > max
            {
                errors.push(TypeError::TooManyItems {
                    name: self.name.clone(),
                    max,
                    got: items.len(),
                });
            }
            if let Some(min) = self.min_items
                && items.len() < min
            {
                errors.push(TypeError::TooFewItems {
                    name: self.name.clone(),
                    min,
                    got: items.len(),
                });
            }
        }

        if let Err(e) = self.attr_type.validate(value) {
            errors.push(TypeError::AttributeError {
                name: self.name.clone(),
                inner: Box::new(e),
            });
        }
        errors
    }
}

fn validate_fields(fields: &[AttributeSchema], values: &HashMap<String, Value>) -> Vec<TypeError> {
    let mut errors = Vec::new();
    for field in fields {
        if field.required && !values.contains_key(&field.name) && field.default.is_none() {
            errors.push(TypeError::MissingRequired {
                name: field.name.clone(),
            });
        }
    }
    for (name, value) in values {
        match fields.iter().find(|f| &f.name == name) {
            Some(field) => errors.extend(field.check(value)),
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
        }
    }
    errors
}

/// Per-operation timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const DEFAULT: Duration = Duration::from_secs(120);

    /// Override defaults from a `timeouts { create = "5m" }` block
    pub fn with_overrides(mut self, attributes: &HashMap<String, Value>) -> Result<Self, TypeError> {
        let block = match attributes.get("timeouts") {
            Some(Value::List(items)) => items.first().and_then(Value::as_map),
            Some(Value::Map(map)) => Some(map),
            _ => None,
        };
        let Some(block) = block else {
            return Ok(self);
        };

        for (key, value) in block {
            let text = value.as_str().ok_or_else(|| TypeError::TypeMismatch {
                expected: "String".to_string(),
                got: value.type_name(),
            })?;
            let duration =
                parse_duration(text).map_err(|message| TypeError::ValidationFailed { message })?;
            match key.as_str() {
                "create" => self.create = duration,
                "update" => self.update = duration,
                "delete" => self.delete = duration,
                other => {
                    return Err(TypeError::UnknownAttribute {
                        name: format!("timeouts.{}", other),
                    });
                }
            }
        }
        Ok(self)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Self::DEFAULT,
            update: Self::DEFAULT,
            delete: Self::DEFAULT,
        }
    }
}

/// Parse durations like "90s", "5m", "1h30m"
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let mut total = 0u64;
    let mut digits = String::new();
    let mut saw_unit = false;

    for c in text.trim().chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let multiplier = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            _ => return Err(format!("Invalid duration '{}': unknown unit '{}'", text, c)),
        };
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("Invalid duration '{}': missing number", text))?;
        total += n * multiplier;
        digits.clear();
        saw_unit = true;
    }

    if !digits.is_empty() || !saw_unit {
        return Err(format!("Invalid duration '{}': expected e.g. 30s, 5m, 1h", text));
    }
    Ok(Duration::from_secs(total))
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    pub timeouts: Timeouts,
    /// Read-only query surface rather than a managed object
    pub data_source: bool,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            timeouts: Timeouts::default(),
            data_source: false,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_timeouts(mut self, create: Duration, update: Duration, delete: Duration) -> Self {
        self.timeouts = Timeouts {
            create,
            update,
            delete,
        };
        self
    }

    pub fn as_data_source(mut self) -> Self {
        self.data_source = true;
        self
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort();
        names
    }

    /// Fill in declared defaults for attributes that were not set
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Effective timeouts for a resource, honoring its `timeouts` block
    pub fn timeouts_for(&self, attributes: &HashMap<String, Value>) -> Result<Timeouts, TypeError> {
        self.timeouts.with_overrides(attributes)
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let fields: Vec<AttributeSchema> = self.attributes.values().cloned().collect();
        let user_attrs: HashMap<String, Value> = attributes
            .iter()
            .filter(|(k, _)| !k.starts_with('_') && k.as_str() != "timeouts")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut errors = validate_fields(&fields, &user_attrs);
        if !self.data_source
            && let Err(e) = self.timeouts_for(attributes)
        {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;
    use regex::Regex;

    fn custom(
        name: impl Into<String>,
        base: AttributeType,
        validate: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> AttributeType {
        AttributeType::Custom {
            name: name.into(),
            base: Box::new(base),
            validate: Arc::new(validate),
        }
    }

    /// Integer within an inclusive range
    pub fn int_between(min: i64, max: i64) -> AttributeType {
        custom(
            format!("Int({}..={})", min, max),
            AttributeType::Int,
            move |value| match value {
                Value::Int(n) if *n < min || *n > max => Err(format!(
                    "expected to be in the range ({} - {}), got {}",
                    min, max, n
                )),
                _ => Ok(()),
            },
        )
    }

    /// String with an inclusive length range (in characters)
    pub fn string_len_between(min: usize, max: usize) -> AttributeType {
        custom(
            format!("String({}..={})", min, max),
            AttributeType::String,
            move |value| match value {
                Value::String(s) => {
                    let len = s.chars().count();
                    if len < min || len > max {
                        Err(format!(
                            "expected length to be in the range ({} - {}), got {}",
                            min, max, len
                        ))
                    } else {
                        Ok(())
                    }
                }
                _ => Ok(()),
            },
        )
    }

    /// String matching a regular expression
    pub fn string_match(pattern: &str, message: impl Into<String>) -> AttributeType {
        let re = Regex::new(pattern);
        let message = message.into();
        custom("Pattern", AttributeType::String, move |value| match (&re, value) {
            (Err(e), _) => Err(format!("invalid validation pattern: {}", e)),
            (Ok(re), Value::String(s)) if !re.is_match(s) => Err(format!("'{}': {}", s, message)),
            _ => Ok(()),
        })
    }

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        custom("Cidr", AttributeType::String, |value| match value {
            Value::String(s) => validate_cidr(s),
            _ => Ok(()),
        })
    }

    /// Shorthand for a string enum
    pub fn one_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Map of string tags
    pub fn tags() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    /// List of nested blocks
    pub fn blocks(fields: Vec<AttributeSchema>) -> AttributeType {
        AttributeType::List(Box::new(AttributeType::Struct(fields)))
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let Some((ip, prefix)) = cidr.split_once('/') else {
        return Err(format!("Invalid CIDR format '{}': expected IP/prefix", cidr));
    };

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("Invalid IP address '{}': expected 4 octets", ip));
    }
    for octet in &octets {
        if octet.parse::<u8>().is_err() {
            return Err(format!(
                "Invalid octet '{}' in IP address: must be 0-255",
                octet
            ));
        }
    }

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}
