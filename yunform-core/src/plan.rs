//! Plan - Collection of Effects
//!
//! A Plan is an ordered list of Effects to be executed.
//! No side effects occur until the Plan is applied.
//!
//! Reads, creates, updates and replaces are kept in dependency order.
//! Deletes are kept dependents first.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::resource::{Resource, Value};

/// Plan containing Effects to be executed
#[derive(Debug, Clone, Default)]
pub struct Plan {
    effects: Vec<Effect>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn extend(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.effects.extend(effects);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Number of mutating Effects
    pub fn mutation_count(&self) -> usize {
        self.effects.iter().filter(|e| e.is_mutating()).count()
    }

    /// True if nothing but data source reads is planned
    pub fn has_no_changes(&self) -> bool {
        self.mutation_count() == 0
    }

    /// Effects in the order they are executed.
    ///
    /// Every removal runs before anything is created: plain deletes first,
    /// then the delete half of each replace with dependents before the
    /// resources they reference. Reads, creates, updates and the create
    /// half of each replace follow in dependency order.
    pub fn apply_order(&self) -> Vec<Effect> {
        let mut deletes = Vec::new();
        let mut replaced = Vec::new();
        let mut rest = Vec::new();

        for effect in &self.effects {
            match effect {
                Effect::Delete { .. } => deletes.push(effect.clone()),
                Effect::Replace { id, from, to, .. } => {
                    if let Some(identifier) = &from.identifier {
                        replaced.push(Effect::Delete {
                            id: id.clone(),
                            identifier: identifier.clone(),
                            state: from.clone(),
                        });
                    }
                    rest.push(Effect::Create(to.clone()));
                }
                _ => rest.push(effect.clone()),
            }
        }

        replaced.reverse();
        deletes.extend(replaced);
        deletes.extend(rest);
        deletes
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for effect in &self.effects {
            match effect {
                Effect::Read(_) => summary.read += 1,
                Effect::Create(_) => summary.create += 1,
                Effect::Update { .. } => summary.update += 1,
                Effect::Replace { .. } => summary.replace += 1,
                Effect::Delete { .. } => summary.delete += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub read: usize,
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}

/// Binding names a resource refers to
pub fn dependencies_of(resource: &Resource) -> HashSet<String> {
    let mut deps = HashSet::new();
    for (key, value) in &resource.attributes {
        if !key.starts_with('_') {
            collect_dependencies(value, &mut deps);
        }
    }
    deps
}

fn collect_dependencies(value: &Value, deps: &mut HashSet<String>) {
    match value {
        Value::ResourceRef(binding_name, _) => {
            deps.insert(binding_name.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_dependencies(item, deps);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_dependencies(v, deps);
            }
        }
        _ => {}
    }
}

/// Sort resources topologically so that every resource comes after the
/// resources it references. Declaration order breaks ties.
pub fn sort_by_dependencies(resources: &[Resource]) -> Vec<Resource> {
    let by_binding: HashMap<&str, &Resource> =
        resources.iter().map(|r| (r.binding(), r)).collect();

    let mut sorted = Vec::with_capacity(resources.len());
    let mut visited: HashSet<String> = HashSet::new();
    let mut visiting: HashSet<String> = HashSet::new();

    fn visit(
        resource: &Resource,
        by_binding: &HashMap<&str, &Resource>,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        sorted: &mut Vec<Resource>,
    ) {
        let binding = resource.binding().to_string();
        if visited.contains(&binding) {
            return;
        }
        if !visiting.insert(binding.clone()) {
            log::warn!("Circular reference involving '{}'", binding);
            return;
        }

        let mut deps: Vec<String> = dependencies_of(resource).into_iter().collect();
        deps.sort();
        for dep in deps {
            if let Some(dep_resource) = by_binding.get(dep.as_str()) {
                visit(dep_resource, by_binding, visited, visiting, sorted);
            }
        }

        visiting.remove(&binding);
        visited.insert(binding);
        sorted.push(resource.clone());
    }

    for resource in resources {
        visit(resource, &by_binding, &mut visited, &mut visiting, &mut sorted);
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceId, State};

    fn bound(resource_type: &str, binding: &str) -> Resource {
        Resource::new(resource_type, binding)
            .with_attribute("_binding", Value::String(binding.to_string()))
    }

    fn reference(binding: &str) -> Value {
        Value::ResourceRef(binding.to_string(), "id".to_string())
    }

    #[test]
    fn summary_counts_each_kind() {
        let mut plan = Plan::new();
        plan.add(Effect::Read(Resource::new("vpcs", "all").with_read_only(true)));
        plan.add(Effect::Create(Resource::new("vpc", "a")));
        let id = ResourceId::new("vpc", "b");
        plan.add(Effect::Delete {
            id: id.clone(),
            identifier: "vpc-b".to_string(),
            state: State::not_found(id),
        });

        let summary = plan.summary();
        assert_eq!(summary.read, 1);
        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(plan.mutation_count(), 2);
        assert_eq!(
            summary.to_string(),
            "Plan: 1 to create, 0 to update, 0 to replace, 1 to delete"
        );
    }

    #[test]
    fn replaced_parents_are_deleted_after_their_dependents() {
        let net = ResourceId::new("vpc", "net");
        let web = ResourceId::new("vswitch", "web");
        let old = ResourceId::new("vswitch", "old");
        let recorded = |id: &ResourceId, identifier: &str| {
            State::existing(id.clone(), HashMap::new()).with_identifier(identifier)
        };

        let mut plan = Plan::new();
        plan.add(Effect::Read(Resource::new("zones", "all").with_read_only(true)));
        plan.add(Effect::Replace {
            id: net.clone(),
            from: recorded(&net, "vpc-1"),
            to: bound("vpc", "net"),
            changed: vec!["cidr_block".to_string()],
        });
        plan.add(Effect::Replace {
            id: web.clone(),
            from: recorded(&web, "vsw-1"),
            to: bound("vswitch", "web").with_attribute("vpc_id", reference("net")),
            changed: vec!["vpc_id".to_string()],
        });
        plan.add(Effect::Create(bound("alb_listener", "http")));
        plan.add(Effect::Delete {
            id: old.clone(),
            identifier: "vsw-0".to_string(),
            state: recorded(&old, "vsw-0"),
        });

        let order: Vec<String> = plan.apply_order().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "- vswitch.old",
                "- vswitch.web",
                "- vpc.net",
                "<= zones.all",
                "+ vpc.net",
                "+ vswitch.web",
                "+ alb_listener.http",
            ]
        );
        assert_eq!(plan.summary().replace, 2);
    }

    #[test]
    fn replace_without_identifier_only_creates() {
        let id = ResourceId::new("vpc", "net");
        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            id: id.clone(),
            from: State::existing(id, HashMap::new()),
            to: bound("vpc", "net"),
            changed: vec![],
        });

        let order = plan.apply_order();
        assert_eq!(order.len(), 1);
        assert!(matches!(order[0], Effect::Create(_)));
    }

    #[test]
    fn read_only_plan_has_no_changes() {
        let mut plan = Plan::new();
        plan.add(Effect::Read(Resource::new("vpcs", "all").with_read_only(true)));
        assert!(!plan.is_empty());
        assert!(plan.has_no_changes());
    }

    #[test]
    fn dependencies_come_first() {
        let rule = bound("alb_rule", "rule").with_attribute("listener_id", reference("listener"));
        let listener = bound("alb_listener", "listener");
        let vsw = bound("vswitch", "vsw").with_attribute(
            "tags",
            Value::Map(
                [("Vpc".to_string(), reference("vpc"))]
                    .into_iter()
                    .collect(),
            ),
        );
        let vpc = bound("vpc", "vpc");

        let sorted = sort_by_dependencies(&[rule, vsw, listener, vpc]);
        let order: Vec<&str> = sorted.iter().map(|r| r.binding()).collect();
        assert_eq!(order, vec!["listener", "rule", "vpc", "vsw"]);
    }

    #[test]
    fn cycles_do_not_loop_forever() {
        let a = bound("vpc", "a").with_attribute("x", reference("b"));
        let b = bound("vpc", "b").with_attribute("x", reference("a"));

        let sorted = sort_by_dependencies(&[a, b]);
        assert_eq!(sorted.len(), 2);
    }
}
