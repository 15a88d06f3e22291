//! CLI subcommands — init, validate, graph, plan, apply, destroy, outputs, status, drift.

use crate::core::error::{Error, Result};
use crate::core::{executor, parser, planner, resolver, state, types};
use crate::provider::local::LocalProvider;
use crate::provider::Provider;
use crate::stack::composition;
use crate::tripwire::{drift, eventlog};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "cloudjar",
    version,
    about = "Declarative cloud stacks: typed resource graph, BLAKE3 plans, provenance log"
)]
pub struct Cli {
    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project with the canonical stack
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate cloudjar.yaml without touching the provider
    Validate {
        /// Path to cloudjar.yaml
        #[arg(short, long, default_value = "cloudjar.yaml")]
        file: PathBuf,
    },

    /// Show execution order and dependency edges
    Graph {
        /// Path to cloudjar.yaml
        #[arg(short, long, default_value = "cloudjar.yaml")]
        file: PathBuf,
    },

    /// Show execution plan (diff desired vs lock)
    Plan {
        /// Path to cloudjar.yaml
        #[arg(short, long, default_value = "cloudjar.yaml")]
        file: PathBuf,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Provision the stack
    Apply {
        /// Path to cloudjar.yaml
        #[arg(short, long, default_value = "cloudjar.yaml")]
        file: PathBuf,

        /// Force re-apply all resources
        #[arg(long)]
        force: bool,

        /// Show what would be applied without calling the provider
        #[arg(long)]
        dry_run: bool,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Tear down every resource of the stack, dependents first
    Destroy {
        /// Path to cloudjar.yaml
        #[arg(short, long, default_value = "cloudjar.yaml")]
        file: PathBuf,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Confirm the teardown
        #[arg(long)]
        yes: bool,
    },

    /// Print stack outputs from the last apply
    Outputs {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Stack name
        #[arg(long, default_value = composition::STACK_NAME)]
        stack: String,
    },

    /// Show current state from lock files
    Status {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Target specific stack
        #[arg(short, long)]
        stack: Option<String>,
    },

    /// Detect changes made outside cloudjar (tripwire)
    Drift {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Target specific stack
        #[arg(short, long)]
        stack: Option<String>,

        /// Exit non-zero on any drift (for CI/cron)
        #[arg(long)]
        tripwire: bool,
    },

    /// Print the JSON schema of cloudjar.yaml
    Schema,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Graph { file } => cmd_graph(&file),
        Commands::Plan { file, state_dir } => cmd_plan(&file, &state_dir),
        Commands::Apply {
            file,
            force,
            dry_run,
            state_dir,
        } => cmd_apply(&file, &state_dir, force, dry_run),
        Commands::Destroy {
            file,
            state_dir,
            yes,
        } => cmd_destroy(&file, &state_dir, yes),
        Commands::Outputs { state_dir, stack } => cmd_outputs(&state_dir, &stack),
        Commands::Status { state_dir, stack } => cmd_status(&state_dir, stack.as_deref()),
        Commands::Drift {
            state_dir,
            stack,
            tripwire,
        } => cmd_drift(&state_dir, stack.as_deref(), tripwire),
        Commands::Schema => cmd_schema(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "cloudjar", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join("cloudjar.yaml");
    if config_path.exists() {
        return Err(Error::Command(format!(
            "{} already exists",
            config_path.display()
        )));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| Error::write(&state_dir, e))?;

    let body = serde_yaml_ng::to_string(&composition::searchx())?;
    let contents = format!("# Managed by cloudjar\n{}", body);
    std::fs::write(&config_path, contents).map_err(|e| Error::write(&config_path, e))?;

    println!("Initialized cloudjar project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    println!(
        "OK: {} ({} params, {} resources, {} outputs)",
        config.name,
        config.params.len(),
        config.resources.len(),
        config.outputs.len()
    );
    Ok(())
}

/// Parse and validate a config file, printing every validation error.
fn parse_and_validate(file: &Path) -> Result<types::StackConfig> {
    match parser::load_config(file) {
        Err(Error::Validation { errors }) => {
            for e in &errors {
                eprintln!("  ERROR: {}", e);
            }
            Err(Error::Validation { errors })
        }
        other => other,
    }
}

fn cmd_graph(file: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    let order = resolver::build_execution_order(&config)?;
    let edges = resolver::dependency_edges(&config)?;

    println!("{} ({} resources)", config.name, order.len());
    for (i, id) in order.iter().enumerate() {
        let rt = config.resources[id.as_str()].resource_type();
        let deps: Vec<&str> = edges
            .get(id)
            .map(|d| d.iter().map(String::as_str).collect())
            .unwrap_or_default();
        if deps.is_empty() {
            println!("  {:>2}. {} [{}]", i + 1, id, rt);
        } else {
            println!("  {:>2}. {} [{}] <- {}", i + 1, id, rt, deps.join(", "));
        }
    }
    Ok(())
}

fn cmd_plan(file: &Path, state_dir: &Path) -> Result<()> {
    let config = parse_and_validate(file)?;
    let execution_order = resolver::build_execution_order(&config)?;

    // Load the existing lock so plan shows accurate Create vs Update vs NoOp
    let lock = state::load_lock(state_dir, &config.name)?;
    let plan = planner::plan(&config, &execution_order, lock.as_ref())?;

    print_plan(&plan);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &types::ExecutionPlan) {
    println!("Planning: {} ({} resources)", plan.name, plan.changes.len());
    println!();

    for change in &plan.changes {
        let symbol = match change.action {
            types::PlanAction::Create => "+",
            types::PlanAction::Update => "~",
            types::PlanAction::Read => "<",
            types::PlanAction::Destroy => "-",
            types::PlanAction::NoOp => " ",
        };
        println!("  {} {}", symbol, change.description);
    }
    for id in &plan.orphaned {
        println!("  ! {}: no longer declared (kept until destroy)", id);
    }

    println!();
    println!(
        "Plan: {} to add, {} to change, {} to read, {} to destroy, {} unchanged.",
        plan.to_create, plan.to_update, plan.to_read, plan.to_destroy, plan.unchanged
    );
}

fn open_provider(state_dir: &Path, config: &types::StackConfig) -> Result<LocalProvider> {
    LocalProvider::open(state_dir, &config.name, config.provider.clone())
}

fn cmd_apply(file: &Path, state_dir: &Path, force: bool, dry_run: bool) -> Result<()> {
    let config = parse_and_validate(file)?;

    if dry_run {
        let execution_order = resolver::build_execution_order(&config)?;
        let lock = state::load_lock(state_dir, &config.name)?;
        print_plan(&planner::plan(&config, &execution_order, lock.as_ref())?);
        println!();
        println!("Dry run — no changes applied.");
        return Ok(());
    }

    let mut provider = open_provider(state_dir, &config)?;
    let cfg = executor::ApplyConfig {
        config: &config,
        state_dir,
        force,
        dry_run,
    };
    let result = executor::apply(&cfg, &mut provider)?;

    println!(
        "{}: {} provisioned, {} unchanged ({:.1}s)",
        result.stack,
        result.resources_provisioned,
        result.resources_unchanged,
        result.total_duration.as_secs_f64()
    );
    print_outputs(&result.outputs);
    Ok(())
}

fn cmd_destroy(file: &Path, state_dir: &Path, yes: bool) -> Result<()> {
    let config = parse_and_validate(file)?;
    let Some(lock) = state::load_lock(state_dir, &config.name)? else {
        println!("Nothing to destroy: {} has no state.", config.name);
        return Ok(());
    };

    let plan = planner::plan_destroy(&lock);
    for change in &plan.changes {
        println!("  - {}", change.description);
    }
    if !yes {
        return Err(Error::Command(format!(
            "refusing to destroy {} resource(s) without --yes",
            plan.to_destroy
        )));
    }

    let mut provider = open_provider(state_dir, &config)?;
    let result = executor::destroy(&config, state_dir, &mut provider)?;
    println!(
        "{}: {} destroyed ({:.1}s)",
        result.stack,
        result.resources_destroyed,
        result.total_duration.as_secs_f64()
    );
    Ok(())
}

fn print_outputs(outputs: &indexmap::IndexMap<String, String>) {
    if outputs.is_empty() {
        return;
    }
    println!();
    println!("Outputs:");
    for (name, value) in outputs {
        println!("  {} = {}", name, value);
    }
}

fn cmd_outputs(state_dir: &Path, stack: &str) -> Result<()> {
    let lock = state::load_lock(state_dir, stack)?.ok_or_else(|| {
        Error::Command(format!("no state for stack '{}'. Run `cloudjar apply` first.", stack))
    })?;
    for (name, value) in &lock.outputs {
        println!("{} = {}", name, value);
    }
    Ok(())
}

/// Stack names under the state dir, optionally narrowed to one.
fn selected_stacks(state_dir: &Path, filter: Option<&str>) -> Result<Vec<String>> {
    Ok(state::list_stacks(state_dir)?
        .into_iter()
        .filter(|s| filter.map_or(true, |f| f == s.as_str()))
        .collect())
}

fn cmd_status(state_dir: &Path, stack_filter: Option<&str>) -> Result<()> {
    let mut found = false;

    for name in selected_stacks(state_dir, stack_filter)? {
        let Some(lock) = state::load_lock(state_dir, &name)? else {
            continue;
        };
        found = true;
        println!("Stack: {}", lock.stack);
        println!("  Generated: {}", lock.generated_at);
        println!("  Generator: {}", lock.generator);
        println!("  Resources: {}", lock.resources.len());

        for (id, rl) in &lock.resources {
            let duration = rl
                .duration_seconds
                .map(|d| format!(" ({:.2}s)", d))
                .unwrap_or_default();
            println!("    {}: {} [{}]{}", id, rl.status, rl.resource_type, duration);
        }
        println!();
    }

    if !found {
        println!("No state found. Run `cloudjar apply` first.");
    }

    Ok(())
}

fn cmd_drift(state_dir: &Path, stack_filter: Option<&str>, tripwire_mode: bool) -> Result<()> {
    let mut total_drift = 0;

    for name in selected_stacks(state_dir, stack_filter)? {
        let Some(mut lock) = state::load_lock(state_dir, &name)? else {
            continue;
        };
        println!("Checking {} ({} resources)...", name, lock.resources.len());
        let provider = LocalProvider::reopen(state_dir, &name)?;
        let findings = drift::detect_drift(&lock, provider.records());

        if findings.is_empty() {
            println!("  No drift detected.");
            continue;
        }
        for f in &findings {
            println!("  DRIFTED: {} ({})", f.resource_id, f.detail);
            println!("    Expected: {}", f.expected_hash);
            println!("    Actual:   {}", f.actual_hash);
            if let Err(e) = eventlog::append_event(state_dir, &name, f.to_event(&name)) {
                warn!(stack = %name, error = %e, "cannot append provenance event");
            }
        }
        drift::mark_drifted(&mut lock, &findings);
        state::save_lock(state_dir, &lock)?;
        total_drift += findings.len();
    }

    if total_drift > 0 {
        println!();
        println!("Drift detected: {} resource(s)", total_drift);
        if tripwire_mode {
            return Err(Error::Command(format!("{} drift finding(s)", total_drift)));
        }
    } else {
        println!("No drift detected.");
    }

    Ok(())
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(types::StackConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let file = dir.path().join("cloudjar.yaml");
        let state = dir.path().join("state");
        (dir, file, state)
    }

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["cloudjar", "-vv", "apply", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Apply { dry_run: true, .. }));
    }

    #[test]
    fn test_init_writes_canonical_stack() {
        let (_dir, file, state) = project();
        assert!(state.is_dir());
        let config = parser::load_config(&file).unwrap();
        assert_eq!(config, composition::searchx());
    }

    #[test]
    fn test_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cloudjar.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cloudjar.yaml");
        std::fs::write(&file, "version: \"2.0\"\nname: \"\"\nresources: {}\n").unwrap();
        assert!(matches!(cmd_validate(&file), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_validate_graph_plan() {
        let (_dir, file, state) = project();
        cmd_validate(&file).unwrap();
        cmd_graph(&file).unwrap();
        cmd_plan(&file, &state).unwrap();
    }

    #[test]
    fn test_apply_status_outputs_drift() {
        let (_dir, file, state) = project();
        cmd_apply(&file, &state, false, true).unwrap();
        assert!(state::load_lock(&state, "searchx").unwrap().is_none());

        cmd_apply(&file, &state, false, false).unwrap();
        cmd_status(&state, None).unwrap();
        cmd_outputs(&state, "searchx").unwrap();
        cmd_drift(&state, None, true).unwrap();
    }

    #[test]
    fn test_drift_marks_lock() {
        let (_dir, file, state) = project();
        cmd_apply(&file, &state, false, false).unwrap();

        let config = parser::load_config(&file).unwrap();
        let mut provider = open_provider(&state, &config).unwrap();
        provider.delete("redis").unwrap();

        assert!(cmd_drift(&state, Some("searchx"), true).is_err());
        let lock = state::load_lock(&state, "searchx").unwrap().unwrap();
        assert_eq!(lock.resources["redis"].status, types::ResourceStatus::Drifted);

        // The next apply repairs it.
        cmd_apply(&file, &state, false, false).unwrap();
        cmd_drift(&state, None, true).unwrap();
    }

    #[test]
    fn test_drift_uses_stack_account_and_region() {
        let (_dir, file, state) = project();
        cmd_apply(&file, &state, false, false).unwrap();
        cmd_drift(&state, None, true).unwrap();

        let config = parser::load_config(&file).unwrap();
        let provider = LocalProvider::reopen(&state, "searchx").unwrap();
        assert_eq!(provider.config(), &config.provider);
        assert_ne!(provider.config(), &types::ProviderConfig::default());
    }

    #[test]
    fn test_destroy_requires_yes() {
        let (_dir, file, state) = project();
        cmd_apply(&file, &state, false, false).unwrap();
        assert!(cmd_destroy(&file, &state, false).is_err());
        assert!(state::load_lock(&state, "searchx").unwrap().is_some());

        cmd_destroy(&file, &state, true).unwrap();
        assert!(state::load_lock(&state, "searchx").unwrap().is_none());
    }

    #[test]
    fn test_outputs_without_state() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_outputs(dir.path(), "searchx").is_err());
    }

    #[test]
    fn test_status_empty() {
        let dir = tempfile::tempdir().unwrap();
        cmd_status(dir.path(), None).unwrap();
    }

    #[test]
    fn test_schema() {
        cmd_schema().unwrap();
    }
}
