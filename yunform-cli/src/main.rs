mod display;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use yunform_core::differ::{Diff, create_plan, diff, orphaned};
use yunform_core::effect::Effect;
use yunform_core::executor::{Bindings, EffectOutcome, Executor, ExecutorConfig};
use yunform_core::parser::{self, ParsedFile};
use yunform_core::plan::{Plan, dependencies_of, sort_by_dependencies};
use yunform_core::provider::Provider;
use yunform_core::resource::{Resource, ResourceId, State};
use yunform_core::schema::ResourceSchema;
use yunform_provider_alicloud::AlicloudProvider;
use yunform_provider_alicloud::data_sources::{self, AlicloudDataSource};
use yunform_provider_alicloud::resources::{self, AlicloudResource};
use yunform_state::{BackendConfig, LockInfo, ResourceState, StateBackend, StateFile, create_backend};

use display::{format_effect, format_value, print_plan, print_summary};

const PROVIDER_NAME: &str = "alicloud";

#[derive(Parser)]
#[command(name = "yunform")]
#[command(about = "Infrastructure management for Alibaba Cloud", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,

        /// Walk through the changes in execution order without making them
        #[arg(long)]
        dry_run: bool,

        /// Keep going after a failed change
        #[arg(long)]
        continue_on_error: bool,
    },
    /// Destroy every resource recorded in the state
    Destroy {
        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
    /// Re-read recorded resources and update the state
    Refresh {
        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,
    },
    /// Inspect the state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Remove a lock left behind by an interrupted run
    ForceUnlock {
        /// Lock ID printed by the failed run
        lock_id: String,

        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List recorded resources
    List {
        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,
    },
    /// Show a recorded resource
    Show {
        /// Resource address, e.g. vpc.main
        address: String,

        /// Path to .yf file
        #[arg(default_value = "main.yf")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply {
            file,
            auto_approve,
            dry_run,
            continue_on_error,
        } => {
            let config = ExecutorConfig {
                dry_run,
                continue_on_error,
            };
            run_apply(&file, auto_approve, &config).await
        }
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Refresh { file } => run_refresh(&file).await,
        Commands::State { command } => match command {
            StateCommands::List { file } => run_state_list(&file).await,
            StateCommands::Show { address, file } => run_state_show(&file, &address).await,
        },
        Commands::ForceUnlock { lock_id, file } => run_force_unlock(&file, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn get_schemas() -> HashMap<String, ResourceSchema> {
    resources::all()
        .into_iter()
        .map(|r| (r.name().to_string(), r.schema()))
        .collect()
}

fn get_data_source_schemas() -> HashMap<String, ResourceSchema> {
    data_sources::all()
        .into_iter()
        .map(|d| (d.name().to_string(), d.schema()))
        .collect()
}

fn load_configuration(file: &PathBuf) -> Result<ParsedFile, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    parser::parse_and_resolve(&content).map_err(|e| format!("Parse error: {}", e))
}

fn validate_resources(resources: &[Resource]) -> Result<(), String> {
    let schemas = get_schemas();
    let data_source_schemas = get_data_source_schemas();
    let mut all_errors = Vec::new();

    for resource in resources {
        let address = format!("{}.{}", resource.id.resource_type, resource.id.name);
        let provider = resource.provider().unwrap_or_default();
        if provider != PROVIDER_NAME {
            all_errors.push(format!("{}: unknown provider '{}'", address, provider));
            continue;
        }

        let (kind, schema) = if resource.is_data_source() {
            ("data source", data_source_schemas.get(&resource.id.resource_type))
        } else {
            ("resource type", schemas.get(&resource.id.resource_type))
        };
        match schema {
            Some(schema) => {
                if let Err(errors) = schema.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!("{}: {}", address, error));
                    }
                }
            }
            None => all_errors.push(format!(
                "{}: unknown {} '{}.{}'",
                address, kind, PROVIDER_NAME, resource.id.resource_type
            )),
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n  {}", all_errors.join("\n  ")))
    }
}

fn get_provider(parsed: &ParsedFile) -> Result<AlicloudProvider, String> {
    let attributes = parsed
        .providers
        .iter()
        .find(|p| p.name == PROVIDER_NAME)
        .map(|p| p.attributes.clone())
        .unwrap_or_default();
    AlicloudProvider::from_attributes(&attributes)
        .map_err(|e| format!("Failed to configure provider: {}", e))
}

async fn get_backend(parsed: &ParsedFile) -> Result<Box<dyn StateBackend>, String> {
    let config = match &parsed.backend {
        Some(backend) => BackendConfig {
            backend_type: backend.backend_type.clone(),
            attributes: backend.attributes.clone(),
        },
        None => BackendConfig::local(),
    };
    let backend = create_backend(&config).map_err(|e| e.to_string())?;
    backend
        .init()
        .await
        .map_err(|e| format!("Failed to initialize backend: {}", e))?;
    Ok(backend)
}

async fn load_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    backend
        .read_state()
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| format!("Failed to read state: {}", e))
}

async fn acquire_lock(backend: &dyn StateBackend, operation: &str) -> Result<LockInfo, String> {
    let lock = backend
        .acquire_lock(operation)
        .await
        .map_err(|e| format!("{}\nIf no other run is active, use 'yunform force-unlock <id>'.", e))?;
    log::debug!("acquired lock {} for {}", lock.id, operation);
    Ok(lock)
}

async fn release_lock(backend: &dyn StateBackend, lock: &LockInfo) {
    if let Err(e) = backend.release_lock(lock).await {
        eprintln!(
            "{} failed to release lock {}: {}",
            "Warning:".yellow().bold(),
            lock.id,
            e
        );
    }
}

/// Re-read every recorded resource. Attributes the API never returns
/// (passwords and other write-only fields) are carried over from the
/// saved state.
async fn refresh_states(provider: &dyn Provider, state_file: &StateFile) -> Result<Vec<State>, String> {
    let mut refreshed = Vec::with_capacity(state_file.resources.len());
    for recorded in &state_file.resources {
        let saved = recorded.to_state();
        let current = provider
            .read(&saved.id, saved.identifier.as_deref())
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;
        refreshed.push(carry_over(current, &saved));
    }
    Ok(refreshed)
}

fn carry_over(mut current: State, saved: &State) -> State {
    if !current.exists {
        return current;
    }
    for (key, value) in &saved.attributes {
        current
            .attributes
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    if current.identifier.is_none() {
        current.identifier = saved.identifier.clone();
    }
    current
}

/// Diff the configuration against the refreshed states.
///
/// References to unchanged resources are resolved up front so they do not
/// show up as changes. References to resources that are created or replaced
/// stay unresolved until apply. Data sources whose arguments are known are
/// read here for the same reason.
async fn build_plan(
    provider: &dyn Provider,
    parsed: &ParsedFile,
    recorded: &[ResourceState],
    refreshed: &[State],
) -> Result<(Plan, Bindings), String> {
    let schemas = get_schemas();
    let current: HashMap<ResourceId, State> = refreshed
        .iter()
        .filter(|s| s.exists)
        .map(|s| (s.id.clone(), s.clone()))
        .collect();

    let mut bindings = Bindings::new();
    let mut desired = Vec::with_capacity(parsed.resources.len());
    for resource in sort_by_dependencies(&parsed.resources) {
        if resource.is_data_source() {
            match bindings.resolve_strict(&resource) {
                Ok(query) => {
                    let state = provider
                        .read_data_source(&query)
                        .await
                        .map_err(|e| format!("Failed to read data source: {}", e))?;
                    bindings.record(&resource, Some(&state));
                }
                Err(_) => bindings.record(&resource, None),
            }
            desired.push(resource);
            continue;
        }

        let resolved = bindings.resolve(&resource);
        let state = current
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));
        match diff(&resolved, &state, schemas.get(&resource.id.resource_type)) {
            Diff::Create(_) | Diff::Replace { .. } => bindings.record(&resource, None),
            _ => bindings.record(&resource, Some(&state)),
        }
        desired.push(resolved);
    }

    let mut plan = create_plan(&desired, &current, &schemas);

    // Resources dropped from the configuration go dependents first
    let rank: HashMap<ResourceId, usize> = destroy_order(recorded)
        .into_iter()
        .enumerate()
        .map(|(i, r)| (r.resource_id(), i))
        .collect();
    let mut removed = orphaned(&desired, refreshed);
    removed.sort_by_key(|e| rank.get(e.resource_id()).copied().unwrap_or(usize::MAX));
    plan.extend(removed);
    Ok((plan, bindings))
}

/// Recorded resources ordered so that every resource comes before the
/// resources it depends on
fn destroy_order(resources: &[ResourceState]) -> Vec<&ResourceState> {
    fn visit<'a>(
        resource: &'a ResourceState,
        by_name: &HashMap<&str, &'a ResourceState>,
        visited: &mut HashSet<&'a str>,
        sorted: &mut Vec<&'a ResourceState>,
    ) {
        if !visited.insert(resource.name.as_str()) {
            return;
        }
        for dep in &resource.dependencies {
            if let Some(dependency) = by_name.get(dep.as_str()) {
                visit(dependency, by_name, visited, sorted);
            }
        }
        sorted.push(resource);
    }

    let by_name: HashMap<&str, &ResourceState> =
        resources.iter().map(|r| (r.name.as_str(), r)).collect();
    let mut visited = HashSet::new();
    let mut sorted = Vec::with_capacity(resources.len());
    for resource in resources {
        visit(resource, &by_name, &mut visited, &mut sorted);
    }
    sorted.reverse();
    sorted
}

/// Update the in-memory state with the outcome of one effect
fn record_outcome(
    state_file: &mut StateFile,
    effect: &Effect,
    outcome: &EffectOutcome,
    dependencies: &HashMap<ResourceId, Vec<String>>,
) {
    let id = effect.resource_id();
    match outcome {
        EffectOutcome::Deleted => {
            state_file.remove_resource(&id.resource_type, &id.name);
        }
        EffectOutcome::Created { state } | EffectOutcome::Updated { state } => {
            let provider = effect
                .resource()
                .and_then(Resource::provider)
                .unwrap_or(PROVIDER_NAME);
            let deps = dependencies.get(id).cloned().unwrap_or_default();
            state_file.upsert_resource(ResourceState::from_state(state, provider).with_dependencies(deps));
        }
        EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => {}
    }
}

/// Execute `plan` one effect at a time in apply order, writing the state
/// after each change. Stops at the first failure unless the config says to
/// continue.
async fn execute_plan(
    provider: &dyn Provider,
    backend: &dyn StateBackend,
    state_file: &mut StateFile,
    plan: &Plan,
    mut bindings: Bindings,
    dependencies: &HashMap<ResourceId, Vec<String>>,
    config: &ExecutorConfig,
) -> Result<usize, String> {
    let executor = Executor::new(provider).with_config(config.clone());
    let mut applied = 0;
    let mut failed = 0;

    for effect in plan.apply_order() {
        let mut step = Plan::new();
        step.add(effect.clone());

        let mut changed = false;
        let result = executor
            .apply(&step, &mut bindings, |effect, outcome| {
                if let EffectOutcome::Skipped { reason } = outcome {
                    println!("  {} {} ({})", "○".dimmed(), format_effect(effect), reason);
                    return;
                }
                println!("  {} {}", "✓".green(), format_effect(effect));
                record_outcome(state_file, effect, outcome, dependencies);
                changed = effect.is_mutating();
            })
            .await;

        if changed {
            applied += 1;
            state_file.increment_serial();
            backend
                .write_state(state_file)
                .await
                .map_err(|e| format!("Failed to save state: {}", e))?;
        }

        if let Some(Err(e)) = result.outcomes.last() {
            println!("  {} {} - {}", "✗".red(), format_effect(&effect), e);
            failed += 1;
            if !config.continue_on_error {
                return Err(format!(
                    "Apply failed after {} change(s); the state records what was completed.",
                    applied
                ));
            }
        }
    }

    if failed > 0 {
        return Err(format!(
            "{} change(s) failed and {} succeeded; the state records what was completed.",
            failed, applied
        ));
    }
    Ok(applied)
}

fn confirm(question: &str, detail: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!("  {}", detail.yellow());
    print!("\n  Enter a value: ");
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();
    Ok(input.trim() == "yes")
}

fn run_validate(file: &PathBuf) -> Result<(), String> {
    let parsed = load_configuration(file)?;

    println!("{}", "Validating...".cyan());

    validate_resources(&parsed.resources)?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            parsed.resources.len()
        )
        .green()
        .bold()
    );

    for resource in &parsed.resources {
        let prefix = if resource.is_data_source() { "data " } else { "" };
        println!(
            "  • {}{}.{}",
            prefix, resource.id.resource_type, resource.id.name
        );
    }

    Ok(())
}

async fn run_plan(file: &PathBuf) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    validate_resources(&parsed.resources)?;

    let provider = get_provider(&parsed)?;
    let backend = get_backend(&parsed).await?;
    let state_file = load_state(backend.as_ref()).await?;

    println!("{}", "Refreshing state...".cyan());
    let refreshed = refresh_states(&provider, &state_file).await?;
    let (plan, _) = build_plan(&provider, &parsed, &state_file.resources, &refreshed).await?;

    println!();
    print_plan(&plan, &get_schemas());
    Ok(())
}

async fn run_apply(file: &PathBuf, auto_approve: bool, config: &ExecutorConfig) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    validate_resources(&parsed.resources)?;

    let provider = get_provider(&parsed)?;
    let backend = get_backend(&parsed).await?;
    let lock = acquire_lock(backend.as_ref(), "apply").await?;
    let result = apply_locked(&provider, backend.as_ref(), &parsed, auto_approve, config).await;
    release_lock(backend.as_ref(), &lock).await;
    result
}

async fn apply_locked(
    provider: &AlicloudProvider,
    backend: &dyn StateBackend,
    parsed: &ParsedFile,
    auto_approve: bool,
    config: &ExecutorConfig,
) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;

    println!("{}", "Refreshing state...".cyan());
    let refreshed = refresh_states(provider, &state_file).await?;
    let (plan, bindings) = build_plan(provider, parsed, &state_file.resources, &refreshed).await?;

    println!();
    if plan.has_no_changes() {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }
    print_plan(&plan, &get_schemas());
    println!();

    if !auto_approve
        && !config.dry_run
        && !confirm(
            "Do you want to perform these actions?",
            "Only 'yes' will be accepted to approve.",
        )?
    {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    if config.dry_run {
        println!("{}", "Dry run, in execution order:".cyan().bold());
    } else {
        println!("{}", "Applying changes...".cyan().bold());
    }
    println!();

    let dependencies: HashMap<ResourceId, Vec<String>> = parsed
        .resources
        .iter()
        .filter(|r| !r.is_data_source())
        .map(|r| (r.id.clone(), dependencies_of(r).into_iter().collect()))
        .collect();
    let applied = execute_plan(
        provider,
        backend,
        &mut state_file,
        &plan,
        bindings,
        &dependencies,
        config,
    )
    .await?;

    println!();
    if config.dry_run {
        println!("{}", "Dry run complete. No changes were made.".green().bold());
        return Ok(());
    }
    println!(
        "{}",
        format!("Apply complete! {} changes applied.", applied)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_destroy(file: &PathBuf, auto_approve: bool) -> Result<(), String> {
    let parsed = load_configuration(file)?;

    let provider = get_provider(&parsed)?;
    let backend = get_backend(&parsed).await?;
    let lock = acquire_lock(backend.as_ref(), "destroy").await?;
    let result = destroy_locked(&provider, backend.as_ref(), auto_approve).await;
    release_lock(backend.as_ref(), &lock).await;
    result
}

async fn destroy_locked(
    provider: &AlicloudProvider,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;

    println!("{}", "Refreshing state...".cyan());
    let refreshed: HashMap<ResourceId, State> = refresh_states(provider, &state_file)
        .await?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    let mut plan = Plan::new();
    for recorded in destroy_order(&state_file.resources) {
        let id = recorded.resource_id();
        if let Some(state) = refreshed.get(&id).filter(|s| s.exists)
            && let Some(identifier) = &state.identifier
        {
            plan.add(Effect::Delete {
                id,
                identifier: identifier.clone(),
                state: state.clone(),
            });
        }
    }

    // Resources that are already gone only need to leave the state
    let vanished: Vec<ResourceId> = refreshed
        .values()
        .filter(|s| !s.exists)
        .map(|s| s.id.clone())
        .collect();
    if !vanished.is_empty() {
        for id in &vanished {
            log::info!("{} no longer exists, removing it from the state", id);
            state_file.remove_resource(&id.resource_type, &id.name);
        }
        state_file.increment_serial();
        backend
            .write_state(&state_file)
            .await
            .map_err(|e| format!("Failed to save state: {}", e))?;
    }

    println!();
    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        let id = effect.resource_id();
        println!(
            "  {} {}.{}",
            "-".red().bold(),
            id.resource_type,
            id.name
        );
    }
    println!();
    print_summary(&plan);
    println!();

    if !auto_approve
        && !confirm(
            "Do you really want to destroy all resources?",
            "This action cannot be undone. Type 'yes' to confirm.",
        )?
    {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let destroyed = execute_plan(
        provider,
        backend,
        &mut state_file,
        &plan,
        Bindings::new(),
        &HashMap::new(),
        &ExecutorConfig::default(),
    )
    .await?;

    println!();
    println!(
        "{}",
        format!("Destroy complete! {} resources destroyed.", destroyed)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_refresh(file: &PathBuf) -> Result<(), String> {
    let parsed = load_configuration(file)?;

    let provider = get_provider(&parsed)?;
    let backend = get_backend(&parsed).await?;
    let lock = acquire_lock(backend.as_ref(), "refresh").await?;
    let result = refresh_locked(&provider, backend.as_ref()).await;
    release_lock(backend.as_ref(), &lock).await;
    result
}

async fn refresh_locked(provider: &AlicloudProvider, backend: &dyn StateBackend) -> Result<(), String> {
    let mut state_file = load_state(backend).await?;
    if state_file.resources.is_empty() {
        println!("{}", "No resources in state.".green());
        return Ok(());
    }

    let refreshed = refresh_states(provider, &state_file).await?;
    for state in refreshed {
        let address = format!("{}.{}", state.id.resource_type, state.id.name);
        if state.exists {
            let updated = match state_file.find_resource(&state.id.resource_type, &state.id.name) {
                Some(recorded) => ResourceState::from_state(&state, recorded.provider.clone())
                    .with_dependencies(recorded.dependencies.clone()),
                None => continue,
            };
            state_file.upsert_resource(updated);
            println!("  {} {}", "✓".green(), address);
        } else {
            state_file.remove_resource(&state.id.resource_type, &state.id.name);
            println!("  {} {} (no longer exists)", "-".red(), address);
        }
    }

    state_file.increment_serial();
    backend
        .write_state(&state_file)
        .await
        .map_err(|e| format!("Failed to save state: {}", e))?;

    println!();
    println!(
        "{}",
        format!("Refresh complete! State serial is now {}.", state_file.serial)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_state_list(file: &PathBuf) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    let backend = get_backend(&parsed).await?;
    let state_file = load_state(backend.as_ref()).await?;

    for resource in &state_file.resources {
        println!(
            "{}.{}  {}",
            resource.resource_type,
            resource.name.bold(),
            resource.identifier.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}

async fn run_state_show(file: &PathBuf, address: &str) -> Result<(), String> {
    let (resource_type, name) = parse_address(address)?;

    let parsed = load_configuration(file)?;
    let backend = get_backend(&parsed).await?;
    let state_file = load_state(backend.as_ref()).await?;
    let resource = state_file
        .find_resource(resource_type, name)
        .ok_or_else(|| format!("No resource {} in state", address))?;

    let schemas = get_schemas();
    let schema = schemas.get(resource_type);

    println!("{} {}", "#".dimmed(), address.cyan().bold());
    println!("  {}: {}", "provider".bold(), resource.provider);
    if let Some(identifier) = &resource.identifier {
        println!("  {}: {}", "id".bold(), identifier);
    }
    if !resource.dependencies.is_empty() {
        println!("  {}: {}", "depends_on".bold(), resource.dependencies.join(", "));
    }

    let state = resource.to_state();
    let mut keys: Vec<&String> = state.attributes.keys().collect();
    keys.sort();
    for key in keys {
        let sensitive = schema
            .and_then(|s| s.attributes.get(key))
            .is_some_and(|a| a.sensitive);
        let shown = if sensitive {
            "(sensitive)".to_string()
        } else {
            format_value(&state.attributes[key])
        };
        println!("  {}: {}", key, shown);
    }
    Ok(())
}

fn parse_address(address: &str) -> Result<(&str, &str), String> {
    match address.split_once('.') {
        Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
            Ok((resource_type, name))
        }
        _ => Err(format!(
            "Invalid resource address '{}', expected <type>.<name>",
            address
        )),
    }
}

async fn run_force_unlock(file: &PathBuf, lock_id: &str) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    let backend = get_backend(&parsed).await?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| format!("Failed to unlock: {}", e))?;
    println!("{}", format!("Lock {} removed.", lock_id).green());
    Ok(())
}
