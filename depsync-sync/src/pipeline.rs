//! Shared sync entrypoint used by the CLI and the integration tests.

use depsync_core::{model::Issue, SyncConfig, TableKind, TableNames};

use crate::cache::RemoteCache;
use crate::classify::classify;
use crate::dedup::DesiredState;
use crate::error::SyncError;
use crate::reconcile::Reconciler;
use crate::report::SyncReport;
use crate::store::{AirtableStore, PlanStore, RemoteStore};

/// Knobs for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete remote rows with no local counterpart instead of only reporting them.
    pub destroy_invalid_records: bool,
    /// Read the remote state but route every mutation through [`PlanStore`].
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig, dry_run: bool) -> Self {
        Self {
            destroy_invalid_records: config.destroy_invalid_records,
            dry_run,
        }
    }
}

/// Reconcile `issues` into `store`.
///
/// Every table is fetched before anything is written; a fetch failure aborts
/// the run. After that, kinds are applied one by one in [`TableKind::ALL`]
/// order and per-record failures only show up in the report.
pub fn run<S: RemoteStore + ?Sized>(
    store: &S,
    names: &TableNames,
    issues: &[Issue],
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    run_desired(store, names, &DesiredState::from_issues(issues), options)
}

/// Same as [`run`] for an already collected [`DesiredState`].
pub fn run_desired<S: RemoteStore + ?Sized>(
    store: &S,
    names: &TableNames,
    desired: &DesiredState,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    if options.dry_run {
        reconcile(&PlanStore::new(store), names, desired, options)
    } else {
        reconcile(store, names, desired, options)
    }
}

/// Build an [`AirtableStore`] from `config` and [`run`] against it.
///
/// Missing credentials fail here, before any request goes out.
pub fn run_airtable(
    config: &SyncConfig,
    issues: &[Issue],
    dry_run: bool,
) -> Result<SyncReport, SyncError> {
    config.validate()?;
    let store = AirtableStore::new(&config.airtable)?;
    run(
        &store,
        &config.airtable.tables,
        issues,
        SyncOptions::from_config(config, dry_run),
    )
}

fn reconcile<S: RemoteStore + ?Sized>(
    store: &S,
    names: &TableNames,
    desired: &DesiredState,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let mut cache = RemoteCache::fetch_all(store, names)?;
    let reconciler = Reconciler::new(store, options.destroy_invalid_records);

    let mut tables = Vec::with_capacity(TableKind::ALL.len());
    for kind in TableKind::ALL {
        let classification = classify(kind, desired.set(kind), &mut cache);
        tables.push(reconciler.apply(classification, &mut cache));
    }

    Ok(SyncReport {
        dry_run: options.dry_run,
        destroy_invalid_records: options.destroy_invalid_records,
        tables,
    })
}
