//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in DSL with the "current state" fetched
//! from the Provider, and generates a list of required Effects (Plan).

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute differs -> needs replacement
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forces_new = schema.is_some_and(|s| {
        changed
            .iter()
            .any(|name| s.attributes.get(name).is_some_and(|a| a.force_new))
    });

    if forces_new {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _) and operation timeouts
        if key.starts_with('_') || key == "timeouts" {
            continue;
        }

        let attr = schema.and_then(|s| s.attributes.get(key));
        if attr.is_some_and(|a| a.is_read_only()) {
            continue;
        }

        match current.get(key) {
            Some(current_value)
                if values_match(desired_value, current_value, attr.map(|a| &a.attr_type)) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Nested blocks only compare the fields the user declared, since the API
/// echoes back extra computed fields. Maps and scalars compare exactly.
fn values_match(desired: &Value, current: &Value, attr_type: Option<&AttributeType>) -> bool {
    if desired.has_unresolved_ref() {
        return false;
    }

    match (attr_type, desired, current) {
        (Some(AttributeType::List(inner)), Value::List(d), Value::List(c)) => {
            d.len() == c.len()
                && d.iter()
                    .zip(c)
                    .all(|(dv, cv)| values_match(dv, cv, Some(inner)))
        }
        (Some(AttributeType::Struct(fields)), Value::Map(d), Value::Map(c)) => {
            d.iter().all(|(k, dv)| {
                let field_type = fields.iter().find(|f| &f.name == k).map(|f| &f.attr_type);
                c.get(k).is_some_and(|cv| values_match(dv, cv, field_type))
            })
        }
        (Some(AttributeType::Custom { base, .. }), _, _) => {
            values_match(desired, current, Some(base))
        }
        _ => desired.semantically_equals(current),
    }
}

/// Compute Diff for multiple resources and generate a Plan.
///
/// Data sources are read first; resources keep the given order, which
/// callers sort by dependency.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired.iter().filter(|r| r.is_data_source()) {
        plan.add(Effect::Read(resource.clone()));
    }

    for resource in desired.iter().filter(|r| !r.is_data_source()) {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current, schemas.get(&resource.id.resource_type)) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed: changed_attributes,
            }),
            Diff::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Replace {
                id,
                from,
                to,
                changed: changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    plan
}

/// Delete effects for recorded resources that are no longer declared.
/// `recorded` is in creation order; deletes come out in reverse.
pub fn orphaned(desired: &[Resource], recorded: &[State]) -> Vec<Effect> {
    let declared: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();

    recorded
        .iter()
        .rev()
        .filter(|s| s.exists && !declared.contains(&s.id))
        .filter_map(|s| {
            s.identifier.as_ref().map(|identifier| Effect::Delete {
                id: s.id.clone(),
                identifier: identifier.clone(),
                state: s.clone(),
            })
        })
        .collect()
}
