//! Error types shared across the discovery and reconciliation pipeline.
//!
//! Discovery failures are values, not early returns: they are collected per
//! account and reported once the run is over. Kubeconfig failures are fatal.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A single failed call against the cluster provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cluster description is missing `{0}`")]
    MissingField(&'static str),

    #[error("invalid certificate authority data: {0}")]
    InvalidCertificate(#[from] base64::DecodeError),

    #[error("{0}")]
    Api(String),
}

/// A labelled, non-fatal failure from one unit of discovery work.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("account='{account}' region='{region}': {source}")]
    ListClusters {
        account: String,
        region: String,
        #[source]
        source: ProviderError,
    },

    #[error("cluster={cluster}, region={region}: {source}")]
    DescribeCluster {
        cluster: String,
        region: String,
        #[source]
        source: ProviderError,
    },

    #[error("account='{account}': discovery did not finish within {after:?}")]
    Deadline { account: String, after: Duration },
}

#[derive(Debug, Error)]
pub enum KubeconfigError {
    #[error("failed to read kubeconfig {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse kubeconfig {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialise kubeconfig: {0}")]
    Serialise(#[source] serde_yaml::Error),

    #[error("failed to write kubeconfig {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine the home directory for the default kubeconfig path")]
    NoHomeDirectory,
}
