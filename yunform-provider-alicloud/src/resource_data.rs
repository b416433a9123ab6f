//! Typed access to desired attributes, with change detection for updates

use std::collections::HashMap;

use yunform_core::resource::Value;

/// Desired attributes of a resource, optionally paired with the last
/// known state so updates can tell which fields changed.
pub struct ResourceData<'a> {
    attributes: &'a HashMap<String, Value>,
    previous: Option<&'a HashMap<String, Value>>,
}

impl<'a> ResourceData<'a> {
    pub fn new(attributes: &'a HashMap<String, Value>) -> Self {
        Self {
            attributes,
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: &'a HashMap<String, Value>) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn attributes(&self) -> &'a HashMap<String, Value> {
        self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_list(&self, name: &str) -> Option<&'a [Value]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn get_map(&self, name: &str) -> Option<&'a HashMap<String, Value>> {
        self.get(name).and_then(Value::as_map)
    }

    /// String items of a list attribute
    pub fn get_strings(&self, name: &str) -> Vec<String> {
        self.get_list(name)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    pub fn previous(&self, name: &str) -> Option<&'a Value> {
        self.previous.and_then(|p| p.get(name))
    }

    /// True if the attribute is set and differs from the previous state.
    /// Unset attributes are left as they are.
    pub fn has_change(&self, name: &str) -> bool {
        match (self.get(name), self.previous(name)) {
            (Some(new), Some(old)) => !new.semantically_equals(old),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn has_changes(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_change(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Value)>) -> HashMap<String, Value> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn typed_getters() {
        let attrs = map(vec![
            ("name", Value::String("main".to_string())),
            ("port", Value::Int(80)),
            ("enabled", Value::Bool(true)),
            (
                "ids",
                Value::List(vec![Value::String("a".to_string()), Value::Int(1)]),
            ),
        ]);
        let data = ResourceData::new(&attrs);

        assert_eq!(data.get_str("name"), Some("main"));
        assert_eq!(data.get_int("port"), Some(80));
        assert_eq!(data.get_bool("enabled"), Some(true));
        assert_eq!(data.get_strings("ids"), vec!["a".to_string()]);
        assert!(data.get_strings("missing").is_empty());
    }

    #[test]
    fn change_detection() {
        let previous = map(vec![
            ("name", Value::String("old".to_string())),
            ("port", Value::Int(80)),
            ("description", Value::String("d".to_string())),
        ]);
        let desired = map(vec![
            ("name", Value::String("new".to_string())),
            ("port", Value::Float(80.0)),
        ]);
        let data = ResourceData::new(&desired).with_previous(&previous);

        assert!(data.has_change("name"));
        assert!(!data.has_change("port"));
        assert!(!data.has_change("description"));
        assert!(!data.has_change("tags"));
        assert!(data.has_changes(&["port", "name"]));
    }
}
