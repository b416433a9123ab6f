//! Executor - Execute Effects using a Provider
//!
//! The Executor runs the Effects contained in a Plan in apply order (see
//! `Plan::apply_order`), resolving references against what earlier Effects
//! produced. This is where side effects actually occur.

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{Resource, State, Value};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    Read { state: State },
    Created { state: State },
    Updated { state: State },
    Deleted,
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

impl EffectOutcome {
    pub fn state(&self) -> Option<&State> {
        match self {
            EffectOutcome::Read { state }
            | EffectOutcome::Created { state }
            | EffectOutcome::Updated { state } => Some(state),
            EffectOutcome::Deleted | EffectOutcome::Skipped { .. } => None,
        }
    }
}

/// Result of executing the entire Plan
#[derive(Debug, Default)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Attribute values known per binding name, used to resolve references
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, HashMap<String, Value>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what is known about a resource: declared attributes, overlaid
    /// with the observed state (which carries `id` and computed fields)
    pub fn record(&mut self, resource: &Resource, state: Option<&State>) {
        let mut attrs = resource.attributes.clone();
        if let Some(state) = state.filter(|s| s.exists) {
            for (k, v) in &state.attributes {
                attrs.insert(k.clone(), v.clone());
            }
            if let Some(identifier) = &state.identifier {
                attrs
                    .entry("id".to_string())
                    .or_insert_with(|| Value::String(identifier.clone()));
            }
        }
        self.values.insert(resource.binding().to_string(), attrs);
    }

    pub fn get(&self, binding: &str, attribute: &str) -> Option<&Value> {
        self.values.get(binding).and_then(|attrs| attrs.get(attribute))
    }

    /// Substitute every reference that can be resolved; others are kept
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::ResourceRef(binding, attr) => match self.get(binding, attr) {
                Some(v) if v != value => self.resolve_value(v),
                _ => value.clone(),
            },
            Value::List(items) => Value::List(items.iter().map(|v| self.resolve_value(v)).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    pub fn resolve(&self, resource: &Resource) -> Resource {
        let mut resolved = resource.clone();
        for value in resolved.attributes.values_mut() {
            *value = self.resolve_value(value);
        }
        resolved
    }

    /// Resolve fully, failing on references that are still unknown
    pub fn resolve_strict(&self, resource: &Resource) -> ProviderResult<Resource> {
        let resolved = self.resolve(resource);
        for (key, value) in &resolved.attributes {
            if let Some((binding, attr)) = first_ref(value) {
                return Err(ProviderError::new(format!(
                    "Attribute '{}' references {}.{}, which is not known",
                    key, binding, attr
                ))
                .for_resource(resource.id.clone()));
            }
        }
        Ok(resolved)
    }
}

fn first_ref(value: &Value) -> Option<(&str, &str)> {
    match value {
        Value::ResourceRef(b, a) => Some((b, a)),
        Value::List(items) => items.iter().find_map(first_ref),
        Value::Map(map) => map.values().find_map(first_ref),
        _ => None,
    }
}

/// Executor that runs Effects using a Provider
pub struct Executor<'p> {
    provider: &'p dyn Provider,
    config: ExecutorConfig,
}

impl<'p> Executor<'p> {
    pub fn new(provider: &'p dyn Provider) -> Self {
        Self {
            provider,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute a Plan. A replace runs as a delete and a create, so
    /// `on_applied` sees those halves. It is called right after each
    /// successful Effect, so callers can persist state incrementally.
    pub async fn apply<F>(&self, plan: &Plan, bindings: &mut Bindings, mut on_applied: F) -> ApplyResult
    where
        F: FnMut(&Effect, &EffectOutcome),
    {
        let mut result = ApplyResult::default();

        for effect in plan.apply_order() {
            let outcome = self.execute_effect(&effect, bindings).await;

            match &outcome {
                Ok(o) => {
                    if let (Some(resource), Some(state)) = (effect.resource(), o.state()) {
                        bindings.record(resource, Some(state));
                    }
                    on_applied(&effect, o);
                    result.success_count += 1;
                }
                Err(e) => {
                    log::warn!("{} failed: {}", effect, e);
                    result.failure_count += 1;
                    if !self.config.continue_on_error {
                        result.outcomes.push(outcome);
                        break;
                    }
                }
            }

            result.outcomes.push(outcome);
        }

        result
    }

    /// Execute a single Effect
    async fn execute_effect(
        &self,
        effect: &Effect,
        bindings: &Bindings,
    ) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read(resource) => {
                let resolved = bindings.resolve_strict(resource)?;
                let state = self.provider.read_data_source(&resolved).await?;
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let resolved = bindings.resolve_strict(resource)?;
                let state = self.provider.create(&resolved).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to, .. } => {
                let resolved = bindings.resolve_strict(to)?;
                let identifier = from.identifier.as_deref().ok_or_else(|| {
                    ProviderError::new("Cannot update a resource without identifier")
                        .for_resource(id.clone())
                })?;
                let state = self.provider.update(id, identifier, from, &resolved).await?;
                Ok(EffectOutcome::Updated { state })
            }
            // `apply` hands over replaces already split by `Plan::apply_order`
            Effect::Replace { id, from, to, .. } => {
                let resolved = bindings.resolve_strict(to)?;
                if let Some(identifier) = from.identifier.as_deref() {
                    self.provider.delete(id, identifier, from).await?;
                }
                let state = self.provider.create(&resolved).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Delete {
                id,
                identifier,
                state,
            } => {
                self.provider.delete(id, identifier, state).await?;
                Ok(EffectOutcome::Deleted)
            }
        }
    }
}
