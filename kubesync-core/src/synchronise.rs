//! High-level pipeline: discover → build patches → merge → persist.
//!
//! # Responsibilities
//! - Load the kubeconfig once, before any discovery starts (a bad kubeconfig is fatal)
//! - Scan every account concurrently and collect per-account results
//! - Accumulate all patches and merge them in a single, sequential pass
//! - Write the document back once, unless this is a dry run
//!
//! Discovery errors never fail the run; they are returned in the
//! [`SynchroniseReport`] for the caller to display.
//!
//! # Navigation
//! - Entrypoint: [`synchronise`]
//! - Inputs: [`SyncContext`]; outputs: [`SynchroniseReport`]

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::contract::ClusterAccount;
use crate::discover::{discover_accounts, DEFAULT_ACCOUNT_DEADLINE};
use crate::error::{DiscoveryError, KubeconfigError};
use crate::kubeconfig::Kubeconfig;
use crate::merge::{apply_patch, KubeconfigDiff};
use crate::patch::KubeConfigPatch;

/// Everything one sync run needs, passed explicitly instead of living in
/// process-wide state.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub kubeconfig_path: PathBuf,
    /// Merge in memory and report the diff, but do not write.
    pub dry_run: bool,
    /// Delete kubeconfig entries that discovery did not produce.
    pub purge: bool,
    pub account_deadline: Duration,
}

impl SyncContext {
    pub fn new(kubeconfig_path: PathBuf) -> Self {
        Self {
            kubeconfig_path,
            dry_run: false,
            purge: false,
            account_deadline: DEFAULT_ACCOUNT_DEADLINE,
        }
    }
}

#[derive(Debug)]
pub struct SynchroniseReport {
    pub accounts: Vec<AccountReport>,
    pub diff: KubeconfigDiff,
    /// Whether the kubeconfig was written back.
    pub written: bool,
}

impl SynchroniseReport {
    pub fn error_count(&self) -> usize {
        self.accounts.iter().map(|a| a.errors.len()).sum()
    }
}

#[derive(Debug)]
pub struct AccountReport {
    pub account: String,
    pub clusters: usize,
    pub errors: Vec<DiscoveryError>,
}

pub async fn synchronise(
    ctx: &SyncContext,
    accounts: &[Box<dyn ClusterAccount>],
) -> Result<SynchroniseReport, KubeconfigError> {
    info!(
        kubeconfig = %ctx.kubeconfig_path.display(),
        accounts = accounts.len(),
        dry_run = ctx.dry_run,
        purge = ctx.purge,
        "[SYNC] Starting kubeconfig synchronisation"
    );
    let mut kubeconfig = Kubeconfig::load(&ctx.kubeconfig_path)?;

    let mut patch = KubeConfigPatch::default();
    let mut reports = Vec::with_capacity(accounts.len());
    for discovery in discover_accounts(accounts, ctx.account_deadline).await {
        if !discovery.is_clean() {
            warn!(
                account = %discovery.account,
                errors = discovery.errors.len(),
                "[SYNC] Account finished with errors"
            );
        }
        patch.extend(discovery.patch);
        reports.push(AccountReport {
            account: discovery.account,
            clusters: discovery.clusters,
            errors: discovery.errors,
        });
    }

    if ctx.purge && reports.iter().any(|r| !r.errors.is_empty()) {
        warn!("[SYNC] Purging while some accounts reported errors; entries from failed scopes will be removed");
    }

    let diff = apply_patch(&patch, &mut kubeconfig, ctx.purge);
    info!(changes = diff.len(), "[SYNC] Patch applied in memory");

    let written = if ctx.dry_run {
        info!("[SYNC] Dry run, kubeconfig left untouched");
        false
    } else {
        kubeconfig.write(&ctx.kubeconfig_path)?;
        true
    };

    Ok(SynchroniseReport {
        accounts: reports,
        diff,
        written,
    })
}
