//! Terminal rendering of plans and values

use std::collections::{HashMap, HashSet};

use colored::Colorize;
use yunform_core::effect::Effect;
use yunform_core::plan::{Plan, dependencies_of};
use yunform_core::resource::{Resource, Value};
use yunform_core::schema::ResourceSchema;

const BASE_INDENT: &str = "  ";
const ATTR_INDENT: &str = "    ";

pub fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.has_no_changes() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    // Dependency graph between the effects of this plan
    let mut binding_to_effect: HashMap<String, usize> = HashMap::new();
    let mut effect_deps: Vec<HashSet<String>> = Vec::new();
    for (idx, effect) in plan.effects().iter().enumerate() {
        match effect.resource() {
            Some(resource) => {
                binding_to_effect.insert(resource.binding().to_string(), idx);
                effect_deps.push(dependencies_of(resource));
            }
            None => effect_deps.push(HashSet::new()),
        }
    }

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); plan.effects().len()];
    let mut roots = Vec::new();
    for (idx, deps) in effect_deps.iter().enumerate() {
        let mut parents: Vec<usize> = deps
            .iter()
            .filter_map(|d| binding_to_effect.get(d).copied())
            .filter(|&parent| parent != idx)
            .collect();
        parents.sort();
        match parents.first() {
            // Shown under the first resource it depends on
            Some(&parent) => dependents[parent].push(idx),
            None => roots.push(idx),
        }
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let mut printer = TreePrinter {
        plan,
        schemas,
        dependents: &dependents,
        printed: HashSet::new(),
    };
    for (i, &root) in roots.iter().enumerate() {
        printer.print(root, 0, i == roots.len() - 1, "");
    }
    // Cycles leave effects unreachable from any root
    for idx in 0..plan.effects().len() {
        printer.print(idx, 0, true, "");
    }

    println!();
    print_summary(plan);
}

pub fn print_summary(plan: &Plan) {
    let summary = plan.summary();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

struct TreePrinter<'a> {
    plan: &'a Plan,
    schemas: &'a HashMap<String, ResourceSchema>,
    dependents: &'a [Vec<usize>],
    printed: HashSet<usize>,
}

impl TreePrinter<'_> {
    fn print(&mut self, idx: usize, depth: usize, is_last: bool, prefix: &str) {
        if !self.printed.insert(idx) {
            return;
        }
        let effect = &self.plan.effects()[idx];

        let connector = match (depth, is_last) {
            (0, _) => String::new(),
            (_, true) => format!("{}└─ ", prefix),
            (_, false) => format!("{}├─ ", prefix),
        };
        let continuation = match (depth, is_last) {
            (0, _) => String::new(),
            (_, true) => format!("{}   ", prefix),
            (_, false) => format!("{}│  ", prefix),
        };
        let attr_prefix = if depth == 0 {
            format!("{}{}", BASE_INDENT, ATTR_INDENT)
        } else {
            format!("{}{}   ", BASE_INDENT, continuation)
        };

        let id = effect.resource_id();
        println!(
            "{}{}{} {}.{}",
            BASE_INDENT,
            connector,
            colored_symbol(effect),
            id.resource_type.cyan().bold(),
            id.name.bold()
        );

        let schema = self.schemas.get(&id.resource_type);
        match effect {
            Effect::Read(resource) | Effect::Create(resource) => {
                for (key, value) in sorted_attributes(resource) {
                    println!(
                        "{}{}: {}",
                        attr_prefix,
                        key,
                        display_value(key, value, schema).green()
                    );
                }
            }
            Effect::Update { from, to, changed, .. } | Effect::Replace { from, to, changed, .. } => {
                for key in changed {
                    let Some(new_value) = to.attributes.get(key) else {
                        continue;
                    };
                    let old = from
                        .attributes
                        .get(key)
                        .map(|v| display_value(key, v, schema))
                        .unwrap_or_else(|| "(none)".to_string());
                    let forces_new = matches!(effect, Effect::Replace { .. })
                        && schema
                            .and_then(|s| s.attributes.get(key))
                            .is_some_and(|a| a.force_new);
                    println!(
                        "{}{}: {} → {}{}",
                        attr_prefix,
                        key,
                        old.red(),
                        display_value(key, new_value, schema).green(),
                        if forces_new {
                            " (forces replacement)".magenta().to_string()
                        } else {
                            String::new()
                        }
                    );
                }
            }
            Effect::Delete { identifier, .. } => {
                println!("{}{}: {}", attr_prefix, "id".bold(), identifier.red());
            }
        }

        let children: Vec<usize> = self.dependents[idx]
            .iter()
            .copied()
            .filter(|c| !self.printed.contains(c))
            .collect();
        let child_prefix = if depth == 0 {
            format!("{}  ", ATTR_INDENT)
        } else {
            format!("{}   ", continuation)
        };
        for (i, &child) in children.iter().enumerate() {
            self.print(child, depth + 1, i == children.len() - 1, &child_prefix);
        }
    }
}

fn colored_symbol(effect: &Effect) -> colored::ColoredString {
    match effect {
        Effect::Read(_) => effect.symbol().cyan().bold(),
        Effect::Create(_) => effect.symbol().green().bold(),
        Effect::Update { .. } => effect.symbol().yellow().bold(),
        Effect::Replace { .. } => effect.symbol().magenta().bold(),
        Effect::Delete { .. } => effect.symbol().red().bold(),
    }
}

/// User attributes, name-like keys first
fn sorted_attributes(resource: &Resource) -> Vec<(&String, &Value)> {
    let mut attrs: Vec<_> = resource
        .attributes
        .iter()
        .filter(|(k, _)| !k.starts_with('_'))
        .collect();
    attrs.sort_by(|(a, _), (b, _)| {
        (!a.ends_with("_name"), a.as_str()).cmp(&(!b.ends_with("_name"), b.as_str()))
    });
    attrs
}

fn display_value(key: &str, value: &Value, schema: Option<&ResourceSchema>) -> String {
    let sensitive = schema
        .and_then(|s| s.attributes.get(key))
        .is_some_and(|a| a.sensitive);
    if sensitive {
        "(sensitive)".to_string()
    } else {
        format_value(value)
    }
}

pub fn format_effect(effect: &Effect) -> String {
    let id = effect.resource_id();
    let verb = effect.verb();
    let mut chars = verb.chars();
    let verb = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{} {}.{}", verb, id.resource_type, id.name)
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let strs: Vec<_> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("{}.{} (known after apply)", binding, attr),
    }
}
