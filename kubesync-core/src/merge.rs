//! Apply a [`KubeConfigPatch`] to a [`Kubeconfig`].
//!
//! Upserts run first (clusters, users, contexts). The optional purge pass runs
//! after all upserts and deletes entries whose names are absent from the patch,
//! except for a fixed allowlist of local cluster names. Purge decisions only
//! look at the final patch, so the order in which discovery finished has no
//! effect on the result.
//!
//! Only cluster changes are recorded in the [`KubeconfigDiff`]. CA bytes are
//! never shown; a change is signalled with [`CA_REDACTED`].

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info};

use crate::kubeconfig::{Kubeconfig, NamedCluster, NamedEntry, NamedList};
use crate::patch::KubeConfigPatch;

pub const CA_REDACTED: &str = "certificate-authority-data: <OMITTED>";

/// Clusters purge never deletes.
pub const PROTECTED_CLUSTERS: &[&str] = &["docker-desktop", "minikube", "microk8s-cluster"];
/// Users purge never deletes. `admin` is the microk8s user.
pub const PROTECTED_USERS: &[&str] = &["docker-desktop", "minikube", "admin"];
/// Contexts purge never deletes.
pub const PROTECTED_CONTEXTS: &[&str] = &["docker-desktop", "minikube", "microk8s"];

/// One line-level change inside a modified entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub removed: String,
    pub added: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRecord {
    Added { name: String },
    Modified { name: String, changes: Vec<FieldChange> },
    Removed { name: String },
}

impl fmt::Display for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffRecord::Added { name } => write!(f, "+ {name}"),
            DiffRecord::Removed { name } => write!(f, "- {name}"),
            DiffRecord::Modified { name, changes } => {
                write!(f, "~ {name}")?;
                for change in changes {
                    write!(f, "\n- {}\n+ {}", change.removed, change.added)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubeconfigDiff {
    pub records: Vec<DiffRecord>,
}

impl KubeconfigDiff {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl fmt::Display for KubeconfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

/// Merge `patch` into `kubeconfig`, optionally purging stale entries.
pub fn apply_patch(
    patch: &KubeConfigPatch,
    kubeconfig: &mut Kubeconfig,
    purge: bool,
) -> KubeconfigDiff {
    info!(
        clusters = patch.clusters.len(),
        users = patch.users.len(),
        contexts = patch.contexts.len(),
        purge,
        "[MERGE] Applying patch"
    );
    let mut diff = KubeconfigDiff::default();

    for cluster in &patch.clusters {
        if let Some(record) = compare_cluster(&kubeconfig.clusters, cluster) {
            diff.records.push(record);
        }
        kubeconfig.clusters.upsert(cluster.clone());
    }
    for user in &patch.users {
        kubeconfig.users.upsert(user.clone());
    }
    for context in &patch.contexts {
        kubeconfig.contexts.upsert(context.clone());
    }

    if purge {
        purge_kubeconfig(patch, kubeconfig, &mut diff);
    }

    diff
}

fn compare_cluster(
    current: &NamedList<NamedCluster>,
    incoming: &NamedCluster,
) -> Option<DiffRecord> {
    let Some(existing) = current.get(&incoming.name) else {
        return Some(DiffRecord::Added {
            name: incoming.name.clone(),
        });
    };

    let mut changes = Vec::new();
    if existing.cluster.server != incoming.cluster.server {
        changes.push(FieldChange {
            removed: existing.cluster.server.clone(),
            added: incoming.cluster.server.clone(),
        });
    }
    if existing.cluster.certificate_authority_data != incoming.cluster.certificate_authority_data {
        changes.push(FieldChange {
            removed: CA_REDACTED.to_string(),
            added: CA_REDACTED.to_string(),
        });
    }

    if changes.is_empty() {
        None
    } else {
        Some(DiffRecord::Modified {
            name: incoming.name.clone(),
            changes,
        })
    }
}

fn purge_kubeconfig(
    patch: &KubeConfigPatch,
    kubeconfig: &mut Kubeconfig,
    diff: &mut KubeconfigDiff,
) {
    let clusters = stale_names(
        &kubeconfig.clusters,
        patch.clusters.iter().map(|c| c.name()),
        PROTECTED_CLUSTERS,
    );
    for name in clusters {
        kubeconfig.clusters.remove(&name);
        info!(cluster = %name, "[MERGE][PURGE] Removed cluster");
        diff.records.push(DiffRecord::Removed { name });
    }

    let users = stale_names(
        &kubeconfig.users,
        patch.users.iter().map(|u| u.name()),
        PROTECTED_USERS,
    );
    for name in users {
        kubeconfig.users.remove(&name);
        debug!(user = %name, "[MERGE][PURGE] Removed user");
    }

    let contexts = stale_names(
        &kubeconfig.contexts,
        patch.contexts.iter().map(|c| c.name()),
        PROTECTED_CONTEXTS,
    );
    for name in contexts {
        kubeconfig.contexts.remove(&name);
        debug!(context = %name, "[MERGE][PURGE] Removed context");
    }
}

/// Names in `current` that are neither in the patch nor protected, in document order.
fn stale_names<'a, T: NamedEntry>(
    current: &NamedList<T>,
    patched: impl Iterator<Item = &'a str>,
    protected: &[&'a str],
) -> Vec<String> {
    let keep: HashSet<&str> = patched.chain(protected.iter().copied()).collect();
    let mut stale: Vec<String> = Vec::new();
    for name in current.names() {
        if !keep.contains(name) && !stale.iter().any(|s| s == name) {
            stale.push(name.to_string());
        }
    }
    stale
}
