//! `depsync sync` — reconcile the graph into the remote tables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use depsync_core::{config, graph, SyncConfig, TableKind, Target};
use depsync_sync::{pipeline, FinalState, SyncReport, TableReport};

/// Arguments for `depsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Targets to sync (`org/repo`, `gitlab.com/group/project`, URLs).
    /// Replaces the targets from the config file when given.
    pub targets: Vec<String>,

    /// Graph snapshot written by the collector.
    #[arg(long, short = 'g', value_name = "FILE")]
    pub graph: PathBuf,

    /// Fetch and classify, but send no create, update or delete.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub airtable: AirtableArgs,
}

/// Flags that override the config file and environment.
#[derive(Args, Debug, Default)]
pub struct AirtableArgs {
    #[arg(long = "airtable-base-id", value_name = "ID")]
    pub base_id: Option<String>,

    #[arg(long = "airtable-token", value_name = "TOKEN")]
    pub token: Option<String>,

    #[arg(long = "airtable-providers-table-name", value_name = "NAME")]
    pub providers_table: Option<String>,

    #[arg(long = "airtable-accounts-table-name", value_name = "NAME")]
    pub accounts_table: Option<String>,

    #[arg(long = "airtable-repositories-table-name", value_name = "NAME")]
    pub repositories_table: Option<String>,

    #[arg(long = "airtable-labels-table-name", value_name = "NAME")]
    pub labels_table: Option<String>,

    #[arg(long = "airtable-milestones-table-name", value_name = "NAME")]
    pub milestones_table: Option<String>,

    #[arg(long = "airtable-issues-table-name", value_name = "NAME")]
    pub issues_table: Option<String>,

    /// Delete remote rows that match no local entity.
    #[arg(long = "airtable-destroy-invalid-records")]
    pub destroy_invalid_records: bool,
}

impl AirtableArgs {
    fn apply(self, config: &mut SyncConfig) {
        if let Some(base_id) = self.base_id {
            config.airtable.base_id = base_id;
        }
        if let Some(token) = self.token {
            config.airtable.token = token;
        }
        let tables = [
            (TableKind::Provider, self.providers_table),
            (TableKind::Account, self.accounts_table),
            (TableKind::Repository, self.repositories_table),
            (TableKind::Label, self.labels_table),
            (TableKind::Milestone, self.milestones_table),
            (TableKind::Issue, self.issues_table),
        ];
        for (kind, name) in tables {
            if let Some(name) = name {
                config.airtable.tables.set(kind, name);
            }
        }
        if self.destroy_invalid_records {
            config.destroy_invalid_records = true;
        }
    }
}

impl SyncArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let mut config = config::load_from(config_path)
            .with_context(|| format!("failed to load config '{}'", config_path.display()))?;
        config.apply_env();
        if !self.targets.is_empty() {
            config.targets = self.targets;
        }
        self.airtable.apply(&mut config);
        config.validate()?;

        let targets = Target::parse_all(&config.targets)?;
        let issues = graph::load_filtered(&self.graph, &targets)
            .with_context(|| format!("failed to load graph '{}'", self.graph.display()))?;
        tracing::debug!(
            "{} issues selected by {} target(s)",
            issues.len(),
            targets.len()
        );

        let report =
            pipeline::run_airtable(&config, &issues, self.dry_run).context("sync aborted")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "id")]
    external_id: String,
    #[tabled(rename = "record")]
    remote_id: String,
    #[tabled(rename = "error")]
    failure: String,
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    for table in &report.tables {
        print_table(prefix, table);
    }

    let summary = report.summary();
    let line = format!(
        "{prefix}{} new, {} changed, {} deleted, {} unmatched, {} unchanged",
        summary.new, summary.changed, summary.deleted, summary.unmatched, summary.unchanged
    );
    if report.has_problems() {
        println!(
            "{} {line} ({} failed, {} skipped)",
            "⚠".yellow(),
            summary.failed,
            summary.skipped
        );
    } else {
        println!("{} {line}", "✓".green());
    }
    if summary.unmatched > 0 && !report.destroy_invalid_records {
        println!(
            "  {} unmatched rows kept; pass --airtable-destroy-invalid-records to delete them",
            summary.unmatched
        );
    }
}

fn print_table(prefix: &str, table: &TableReport) {
    let unchanged = table.count(FinalState::Unchanged);
    let rows: Vec<RecordRow> = table
        .records
        .iter()
        .filter(|r| r.state != FinalState::Unchanged || r.failure.is_some())
        .map(|r| RecordRow {
            state: colorize(r.state, r.failure.is_some()),
            external_id: r
                .external_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string()),
            remote_id: r
                .remote_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string()),
            failure: r.failure.clone().unwrap_or_default(),
        })
        .collect();

    println!(
        "{prefix}{} ({}): {} unchanged",
        table.table.bold(),
        table.kind,
        unchanged
    );
    if !rows.is_empty() {
        let mut rendered = Table::new(rows);
        rendered.with(Style::rounded());
        println!("{rendered}");
    }
    for skipped in &table.skipped {
        println!("  {} {}", "skipped".yellow(), skipped.reason);
    }
}

fn colorize(state: FinalState, failed: bool) -> String {
    let text = state.to_string();
    if failed {
        return format!("{text} (failed)").red().to_string();
    }
    match state {
        FinalState::New => text.green().to_string(),
        FinalState::Changed => text.cyan().to_string(),
        FinalState::Deleted => text.red().to_string(),
        FinalState::Unmatched => text.yellow().to_string(),
        FinalState::Unchanged => text.dimmed().to_string(),
    }
}
