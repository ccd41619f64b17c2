use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;

use ycloud_core::differ::{Diff, diff_with_schema};
use ycloud_core::provider::{Provider, ProviderError, ResourceKind, ResourceType};
use ycloud_core::resource::{Resource, ResourceId, State, Value};
use ycloud_core::schema::ResourceSchema;
use ycloud_provider::node_group::NodeGroupLookup;
use ycloud_provider::resources::{self, FUNCTION_TRIGGER, KUBERNETES_NODE_GROUP};
use ycloud_provider::trigger::TriggerConfig;
use ycloud_provider::{ProviderConfig, YandexProvider, schemas};

/// Identifiers of the objects created by `apply`, keyed by `type.name`
const STATE_FILE: &str = ".ycloud/state.json";

#[derive(Parser)]
#[command(name = "ycloud")]
#[command(
    about = "Manage Yandex Cloud function triggers and look up Kubernetes node groups",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to the JSON resource file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the JSON resource file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the JSON resource file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Read an existing object by its cloud id and print its attributes
    Read {
        /// Resource type (function_trigger or kubernetes_node_group)
        resource_type: String,
        /// Cloud-side identifier
        identifier: String,
    },
    /// Destroy all resources defined in the configuration file
    Destroy {
        /// Path to the JSON resource file
        #[arg(default_value = "main.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Read {
            resource_type,
            identifier,
        } => run_read(&resource_type, &identifier).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// =============================================================================
// Configuration and state files
// =============================================================================

/// Parse a resource file:
///
/// ```json
/// { "resources": [
///     { "type": "function_trigger", "name": "nightly", "attributes": { ... } }
/// ] }
/// ```
fn parse_resources(content: &str) -> Result<Vec<Resource>, String> {
    let json: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;
    let entries = json
        .get("resources")
        .and_then(|r| r.as_array())
        .ok_or_else(|| "Parse error: expected a top-level \"resources\" array".to_string())?;

    let mut seen = HashSet::new();
    let mut resources = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let field = |key: &str| {
            entry
                .get(key)
                .and_then(|v| v.as_str())
                .ok_or_else(|| format!("resources[{}]: \"{}\" must be a string", i, key))
        };
        let resource_type = field("type")?;
        let name = field("name")?;

        let kind = resources::resource_type(resource_type)
            .map(|t| t.kind())
            .ok_or_else(|| format!("resources[{}]: unknown resource type {}", i, resource_type))?;

        let mut resource = Resource::new(resource_type, name)
            .with_read_only(kind == ResourceKind::DataSource);
        if !seen.insert(resource.id.clone()) {
            return Err(format!("duplicate resource {}", resource.id));
        }

        if let Some(attributes) = entry.get("attributes") {
            let attributes = attributes
                .as_object()
                .ok_or_else(|| format!("{}: \"attributes\" must be an object", resource.id))?;
            for (key, value) in attributes {
                if let Some(value) = Value::from_json(value) {
                    resource.attributes.insert(key.clone(), value);
                }
            }
        }
        resources.push(resource);
    }
    Ok(resources)
}

fn load_resources(file: &Path) -> Result<Vec<Resource>, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    parse_resources(&content)
}

fn get_schemas() -> HashMap<String, ResourceSchema> {
    let mut all_schemas = HashMap::new();
    for schema in schemas::all_schemas() {
        all_schemas.insert(schema.resource_type.clone(), schema);
    }
    all_schemas
}

fn validate_resources(resources: &[Resource]) -> Result<(), String> {
    let schemas = get_schemas();
    let mut all_errors = Vec::new();

    for resource in resources {
        if let Some(schema) = schemas.get(&resource.id.resource_type)
            && let Err(errors) = schema.validate(&resource.attributes)
        {
            for error in errors {
                all_errors.push(format!("{}: {}", resource.id, error));
            }
        }

        let checked = match resource.id.resource_type.as_str() {
            FUNCTION_TRIGGER => TriggerConfig::from_attributes(&resource.attributes)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            KUBERNETES_NODE_GROUP => NodeGroupLookup::from_attributes(&resource.attributes)
                .map(|_| ())
                .map_err(|e| e.message),
            _ => Ok(()),
        };
        if let Err(e) = checked {
            all_errors.push(format!("{}: {}", resource.id, e));
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n  {}", all_errors.join("\n  ")))
    }
}

/// Desired trigger attributes in the shape the provider reads back
fn canonicalize(resource: &Resource) -> Resource {
    let mut resource = resource.clone();
    if resource.id.resource_type == FUNCTION_TRIGGER
        && let Ok(config) = TriggerConfig::from_attributes(&resource.attributes)
    {
        resource.attributes = config.to_attributes();
    }
    resource
}

type Identifiers = BTreeMap<String, String>;

fn load_state() -> Result<Identifiers, String> {
    let path = Path::new(STATE_FILE);
    if !path.exists() {
        return Ok(Identifiers::new());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    Ok(json
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|id| (k.clone(), id.to_string())))
                .collect()
        })
        .unwrap_or_default())
}

fn save_state(identifiers: &Identifiers) -> Result<(), String> {
    let path = Path::new(STATE_FILE);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    }
    let content = serde_json::to_string_pretty(identifiers).map_err(|e| e.to_string())?;
    fs::write(path, content).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

fn get_provider() -> Result<YandexProvider, String> {
    let config = ProviderConfig::from_env().map_err(|e| e.to_string())?;
    YandexProvider::new(config).map_err(|e| e.to_string())
}

// =============================================================================
// Commands
// =============================================================================

fn run_validate(file: &Path) -> Result<(), String> {
    let resources = load_resources(file)?;
    validate_resources(&resources)?;
    println!(
        "{}",
        format!("Validation successful: {} resources", resources.len()).green()
    );
    Ok(())
}

/// One step of an execution plan
enum Step {
    Read(Resource),
    Change(Diff),
}

async fn create_plan(
    provider: &dyn Provider,
    resources: &[Resource],
    identifiers: &Identifiers,
) -> Result<Vec<Step>, String> {
    let schemas = get_schemas();
    let mut steps = Vec::new();

    for resource in resources {
        if resource.is_data_source() {
            steps.push(Step::Read(resource.clone()));
            continue;
        }
        let identifier = identifiers.get(&resource.id.to_string());
        let current = provider
            .read(&resource.id, identifier.map(String::as_str))
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;
        debug!("{}: exists={}", resource.id, current.exists);
        let desired = canonicalize(resource);
        steps.push(Step::Change(diff_with_schema(
            &desired,
            &current,
            schemas.get(&resource.id.resource_type),
        )));
    }
    Ok(steps)
}

fn print_plan(steps: &[Step]) {
    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let (mut add, mut change, mut destroy) = (0, 0, 0);
    for step in steps {
        match step {
            Step::Read(resource) => {
                println!("  {} {} (read)", "<=".cyan().bold(), resource.id);
            }
            Step::Change(Diff::Create(resource)) => {
                add += 1;
                println!("  {} {}", "+".green().bold(), resource.id);
                print_attributes(&resource.attributes);
            }
            Step::Change(Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            }) => {
                change += 1;
                println!("  {} {}", "~".yellow().bold(), id);
                print_changes(from, to, changed_attributes);
            }
            Step::Change(Diff::Replace {
                id,
                from,
                to,
                changed_attributes,
            }) => {
                add += 1;
                destroy += 1;
                println!("  {} {} (must be replaced)", "-/+".magenta().bold(), id);
                print_changes(from, to, changed_attributes);
            }
            Step::Change(Diff::NoChange(_)) => {}
        }
    }

    println!();
    if add + change + destroy == 0 {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
    } else {
        println!(
            "Plan: {} to add, {} to change, {} to destroy.",
            add.to_string().green(),
            change.to_string().yellow(),
            destroy.to_string().red()
        );
    }
}

fn print_attributes(attributes: &HashMap<String, Value>) {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!("      {}: {}", key, format_value(&attributes[key]));
    }
}

fn print_changes(from: &State, to: &Resource, changed: &[String]) {
    for key in changed {
        let old = from.attributes.get(key).map(format_value);
        let new = to.attributes.get(key).map(format_value);
        println!(
            "      {}: {} => {}",
            key,
            old.unwrap_or_else(|| "(none)".to_string()).red(),
            new.unwrap_or_else(|| "(none)".to_string()).green()
        );
    }
}

fn format_value(value: &Value) -> String {
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
            let mut strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

fn print_state(state: &State) {
    let json = serde_json::Value::Object(
        state
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    );
    match serde_json::to_string_pretty(&json) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
    }
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let resources = load_resources(file)?;
    validate_resources(&resources)?;

    let provider = get_provider()?;
    let identifiers = load_state()?;
    let steps = create_plan(&provider, &resources, &identifiers).await?;
    print_plan(&steps);
    Ok(())
}

async fn run_apply(file: &Path) -> Result<(), String> {
    let resources = load_resources(file)?;
    validate_resources(&resources)?;

    let provider = get_provider()?;
    let mut identifiers = load_state()?;
    let steps = create_plan(&provider, &resources, &identifiers).await?;

    let pending = steps
        .iter()
        .filter(|s| !matches!(s, Step::Change(Diff::NoChange(_))))
        .count();
    if pending == 0 {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&steps);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let mut success_count = 0;
    let mut failure_count = 0;

    for step in &steps {
        let (id, result) = match step {
            Step::Read(resource) => (
                &resource.id,
                provider.read_data_source(resource).await.map(|state| {
                    if state.exists {
                        print_state(&state);
                    } else {
                        println!("  {} {} not found", "!".yellow(), resource.id);
                    }
                }),
            ),
            Step::Change(Diff::Create(resource)) => (
                &resource.id,
                create(&provider, resource, &mut identifiers).await,
            ),
            Step::Change(Diff::Update { id, from, to, .. }) => {
                let result = match &from.identifier {
                    Some(identifier) => provider.update(id, identifier, from, to).await.map(|_| ()),
                    None => Err(ProviderError::new("no identifier in state")
                        .for_resource(id.clone())),
                };
                (id, result)
            }
            Step::Change(Diff::Replace { id, from, to, .. }) => (
                id,
                replace(&provider, from, to, &mut identifiers).await,
            ),
            Step::Change(Diff::NoChange(_)) => continue,
        };

        match result {
            Ok(()) => {
                println!("  {} {}", "✓".green(), id);
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), id, e);
                failure_count += 1;
            }
        }
    }

    save_state(&identifiers)?;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", success_count)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!(
                "Apply failed. {} succeeded, {} failed.",
                success_count, failure_count
            )
            .red()
            .bold()
        );
    }

    Ok(())
}

async fn create(
    provider: &dyn Provider,
    resource: &Resource,
    identifiers: &mut Identifiers,
) -> Result<(), ProviderError> {
    let state = provider.create(resource).await?;
    if let Some(identifier) = state.identifier {
        identifiers.insert(resource.id.to_string(), identifier);
    }
    Ok(())
}

/// Delete then create; the old identifier is kept if the delete fails
async fn replace(
    provider: &dyn Provider,
    from: &State,
    to: &Resource,
    identifiers: &mut Identifiers,
) -> Result<(), ProviderError> {
    if let Some(identifier) = &from.identifier {
        provider.delete(&from.id, identifier).await?;
        identifiers.remove(&from.id.to_string());
    }
    create(provider, to, identifiers).await
}

async fn run_read(resource_type: &str, identifier: &str) -> Result<(), String> {
    if resources::resource_type(resource_type).is_none() {
        return Err(format!("unknown resource type {}", resource_type));
    }
    let provider = get_provider()?;
    let id = ResourceId::new(resource_type, identifier);
    let state = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| e.to_string())?;
    if !state.exists {
        return Err(format!("{} {} not found", resource_type, identifier));
    }
    print_state(&state);
    Ok(())
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let resources = load_resources(file)?;
    let mut identifiers = load_state()?;

    // Reverse the declaration order for destruction
    let resources_to_destroy: Vec<(ResourceId, String)> = resources
        .iter()
        .rev()
        .filter(|r| !r.is_data_source())
        .filter_map(|r| {
            identifiers
                .get(&r.id.to_string())
                .map(|identifier| (r.id.clone(), identifier.clone()))
        })
        .collect();

    if resources_to_destroy.is_empty() {
        println!("{}", "No resources to destroy.".yellow());
        return Ok(());
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();
    for (id, identifier) in &resources_to_destroy {
        println!("  {} {} ({})", "-".red().bold(), id, identifier);
    }
    println!();
    println!(
        "Plan: {} to destroy.",
        resources_to_destroy.len().to_string().red()
    );
    println!();

    // Confirmation prompt
    if !auto_approve {
        println!(
            "{}",
            "Do you really want to destroy all resources?"
                .yellow()
                .bold()
        );
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    let provider = get_provider()?;
    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut success_count = 0;
    let mut failure_count = 0;

    for (id, identifier) in &resources_to_destroy {
        match provider.delete(id, identifier).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), id);
                identifiers.remove(&id.to_string());
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), id, e);
                failure_count += 1;
            }
        }
    }

    save_state(&identifiers)?;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", success_count)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!(
                "Destroy failed. {} succeeded, {} failed.",
                success_count, failure_count
            )
            .red()
            .bold()
        );
    }

    Ok(())
}
