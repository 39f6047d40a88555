//! Pipeline command handlers
//!
//! Handles all pipeline-related CLI commands: creating, refreshing,
//! updating, deleting and importing tracked pipelines, plus inspecting the
//! local state file.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use conduit_client::ControlPlaneClient;
use conduit_core::domain::pipeline::PipelineRecord;
use conduit_reconciler::{
    Cancellation, Diagnostics, Disposition, HttpConnector, Outcome, PipelineReconciler,
    RecordStore, Severity, StoredRecord,
};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create a pipeline from a record file and start tracking it
    Create {
        /// Local name to track the pipeline under
        name: String,

        /// Path to a JSON pipeline record
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Re-read a tracked pipeline from the remote side
    Refresh {
        /// Local name of the tracked pipeline
        name: String,
    },
    /// Apply a record file to a tracked pipeline
    Update {
        /// Local name of the tracked pipeline
        name: String,

        /// Path to a JSON pipeline record
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete a tracked pipeline
    Delete {
        /// Local name of the tracked pipeline
        name: String,
    },
    /// Start tracking an existing pipeline
    Import {
        /// Local name to track the pipeline under
        name: String,

        /// Import ID in the form <pipeline_id>,<cluster_id>
        import_id: String,
    },
    /// Show a tracked record
    Show {
        /// Local name of the tracked pipeline
        name: String,
    },
    /// List tracked records
    List,
}

/// Handle pipeline commands
///
/// Routes pipeline subcommands to their respective handlers.
pub async fn handle_pipeline_command(
    command: PipelineCommands,
    config: &Config,
    cancel: Cancellation,
) -> Result<()> {
    let mut store = RecordStore::load(&config.state_file)
        .with_context(|| format!("Failed to load state file: {}", config.state_file.display()))?;
    let reconciler = PipelineReconciler::new(
        HttpConnector::from_config(&config.reconciler),
        &config.reconciler,
        cancel,
    );

    match command {
        PipelineCommands::Create { name, file } => {
            if store.get(&name).is_some() {
                anyhow::bail!("Pipeline '{}' is already tracked; use update instead", name);
            }
            let plan = load_plan(&file)?;
            let outcome = reconciler.create(&plan).await;
            finish(&mut store, &name, outcome)
        }
        PipelineCommands::Refresh { name } => {
            let prior = tracked(&store, &name)?.record.clone();
            let outcome = reconciler.read(&prior).await;
            finish(&mut store, &name, outcome)
        }
        PipelineCommands::Update { name, file } => {
            let prior = tracked(&store, &name)?.record.clone();
            let plan = load_plan(&file)?;
            let outcome = reconciler.update(&plan, &prior).await;
            finish(&mut store, &name, outcome)
        }
        PipelineCommands::Delete { name } => {
            let prior = tracked(&store, &name)?.record.clone();
            let outcome = reconciler.delete(&prior).await;
            finish(&mut store, &name, outcome)
        }
        PipelineCommands::Import { name, import_id } => {
            if store.get(&name).is_some() {
                anyhow::bail!("Pipeline '{}' is already tracked", name);
            }
            let mut clusters = ControlPlaneClient::new(&config.reconciler.control_plane_url);
            if let Some(token) = &config.reconciler.token {
                clusters = clusters.with_token(token.clone());
            }

            let seeded = reconciler.import(&import_id, &clusters).await;
            let Some(seed) = seeded.record().cloned() else {
                return finish(&mut store, &name, seeded);
            };

            // The seed only carries identity; fill in the rest from the remote side
            let refreshed = reconciler.read(&seed).await;
            finish_import(&mut store, &name, seeded, refreshed)
        }
        PipelineCommands::Show { name } => {
            let stored = tracked(&store, &name)?;
            print_record_details(&name, stored);
            Ok(())
        }
        PipelineCommands::List => {
            list_records(&store);
            Ok(())
        }
    }
}

/// Read a pipeline record from a JSON file
fn load_plan(path: &Path) -> Result<PipelineRecord> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse record file: {}", path.display()))
}

fn tracked<'a>(store: &'a RecordStore, name: &str) -> Result<&'a StoredRecord> {
    store
        .get(name)
        .with_context(|| format!("No tracked pipeline named '{}'", name))
}

/// Report an outcome, write the store if it changed, and fail on hard errors
fn finish(store: &mut RecordStore, name: &str, outcome: Outcome) -> Result<()> {
    settle(store, name, outcome, false)
}

/// Track the import seed, then apply the refresh that followed it
///
/// A refresh that leaves the record unchanged keeps the seed.
fn finish_import(
    store: &mut RecordStore,
    name: &str,
    seeded: Outcome,
    refreshed: Outcome,
) -> Result<()> {
    print_diagnostics(&seeded.diagnostics);
    let seed_tracked = store.apply(name, &seeded.disposition);
    settle(store, name, refreshed, seed_tracked)
}

fn settle(store: &mut RecordStore, name: &str, outcome: Outcome, dirty: bool) -> Result<()> {
    print_diagnostics(&outcome.diagnostics);

    let changed = store.apply(name, &outcome.disposition);
    if dirty || changed {
        store
            .save()
            .with_context(|| format!("Failed to save state file: {}", store.path().display()))?;
    }

    if outcome.diagnostics.has_errors() {
        anyhow::bail!("Operation on pipeline '{}' failed", name);
    }

    match (&outcome.disposition, store.get(name)) {
        (Disposition::Persist(record), _) => {
            println!("{}", format!("✓ Pipeline '{}' saved", name).green().bold());
            println!("  ID:    {}", record.id.cyan());
            println!("  State: {}", format_state(&record.state));
        }
        (Disposition::Remove, _) => {
            println!("{}", format!("✓ Pipeline '{}' removed from state", name).green().bold());
        }
        (Disposition::Unchanged, Some(stored)) if dirty => {
            println!("{}", format!("✓ Pipeline '{}' tracked", name).green().bold());
            println!("  ID:    {}", stored.record.id.cyan());
        }
        (Disposition::Unchanged, _) => {
            println!("{}", format!("Pipeline '{}' left unchanged", name).yellow());
        }
    }

    Ok(())
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };
        eprintln!("{}: {}", label, diagnostic.summary);
        if !diagnostic.detail.is_empty() {
            eprintln!("  {}", diagnostic.detail.dimmed());
        }
    }
}

fn format_state(state: &str) -> ColoredString {
    match state {
        "" => "-".dimmed(),
        "running" => state.green(),
        "stopped" | "completed" => state.yellow(),
        "error" => state.red(),
        _ => state.normal(),
    }
}

/// List tracked records
fn list_records(store: &RecordStore) {
    let count = store.names().count();
    if count == 0 {
        println!("{}", "No tracked pipelines.".yellow());
        return;
    }

    println!("{}", format!("Found {} tracked pipeline(s):", count).bold());
    println!();
    for (name, stored) in store.iter() {
        print_record_summary(name, stored);
    }
}

/// Print a record summary
fn print_record_summary(name: &str, stored: &StoredRecord) {
    let record = &stored.record;
    println!("  {} {}", "▸".cyan(), name.bold());
    println!("    ID:      {}", record.id.dimmed());
    println!("    State:   {}", format_state(&record.state));
    println!(
        "    Updated: {}",
        stored
            .updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed record information
fn print_record_details(name: &str, stored: &StoredRecord) {
    let record = &stored.record;
    println!("{}", "Pipeline Details:".bold());
    println!("  Name:           {}", name.bold());
    println!("  ID:             {}", record.id.cyan());
    println!("  Display name:   {}", record.display_name);
    if !record.description.is_empty() {
        println!("  Description:    {}", record.description);
    }
    println!("  State:          {}", format_state(&record.state));
    if let Some(url) = &record.cluster_api_url {
        println!("  Cluster API:    {}", url);
    }
    if !record.url.is_empty() {
        println!("  URL:            {}", record.url);
    }
    if let Some(resources) = &record.resources {
        println!(
            "  Resources:      memory={} cpu={}",
            resources.memory_shares, resources.cpu_shares
        );
    }
    if let Some(account) = &record.service_account {
        println!(
            "  Service acct:   {}",
            account.client_id.as_deref().unwrap_or("-")
        );
    }
    if let Some(tags) = &record.tags {
        let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("  Tags:           {}", tags.join(", "));
    }
    println!(
        "  Allow deletion: {}",
        match record.allow_deletion {
            Some(true) => "true",
            Some(false) => "false",
            None => "unset",
        }
    );
    println!(
        "  Updated:        {}",
        stored.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!("\n{}", "Config:".bold());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", record.config_yaml);
    println!("{}", "─".repeat(80).dimmed());
}
