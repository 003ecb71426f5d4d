//! Account-level fan-out.
//!
//! Every account is scanned concurrently and joined before anything is merged.
//! Each account scan runs under its own deadline so one hung remote call can
//! stall at most its own account. Dropping the returned future cancels every
//! in-flight scan, which is how the CLI implements Ctrl-C.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::contract::{ClusterAccount, ScanResult};
use crate::error::DiscoveryError;
use crate::patch::{build_patch, KubeConfigPatch};

/// Default upper bound for scanning one account end to end.
pub const DEFAULT_ACCOUNT_DEADLINE: Duration = Duration::from_secs(300);

/// The outcome of scanning one account.
#[derive(Debug)]
pub struct AccountDiscovery {
    pub account: String,
    pub clusters: usize,
    pub patch: KubeConfigPatch,
    pub errors: Vec<DiscoveryError>,
}

impl AccountDiscovery {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scan all `accounts` concurrently. Results come back in input order.
pub async fn discover_accounts(
    accounts: &[Box<dyn ClusterAccount>],
    deadline: Duration,
) -> Vec<AccountDiscovery> {
    info!(accounts = accounts.len(), "[DISCOVER] Starting discovery");
    join_all(
        accounts
            .iter()
            .map(|account| discover_account(account.as_ref(), deadline)),
    )
    .await
}

/// Scan one account and build its patch.
pub async fn discover_account(account: &dyn ClusterAccount, deadline: Duration) -> AccountDiscovery {
    let name = account.pretty_name();
    let scan = match tokio::time::timeout(deadline, account.scan_for_clusters()).await {
        Ok(scan) => scan,
        Err(_) => {
            warn!(account = %name, ?deadline, "[DISCOVER] Account scan hit its deadline");
            ScanResult::failed(DiscoveryError::Deadline {
                account: name.clone(),
                after: deadline,
            })
        }
    };

    let patch = build_patch(&account.identity(), &scan.clusters);
    AccountDiscovery {
        account: name,
        clusters: scan.clusters.len(),
        patch,
        errors: scan.errors,
    }
}
