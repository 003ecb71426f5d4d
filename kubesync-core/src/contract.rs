#![allow(unused)]

//! # contract: the seams of the discovery pipeline
//!
//! Two traits sit at the edges of discovery:
//! - [`EksApi`]: the raw provider client (list and describe clusters in a region).
//!   Implemented by [`crate::aws_cli::AwsCliClient`] and by test mocks.
//! - [`ClusterAccount`]: one configured account that can scan for clusters.
//!   Implemented by [`crate::eks::EksAccount`]; the orchestrator in
//!   [`crate::discover`] only ever sees this trait.
//!
//! Both traits are annotated for `mockall` so integration tests in this crate and
//! in the CLI crate can build deterministic fakes (see the `test-export-mocks` feature).
//!
//! The plain data types that cross these seams live here too.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, ProviderError};

/// Connection data for one discovered cluster. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescriptor {
    pub name: String,
    pub region: String,
    /// API server endpoint URL.
    pub server: String,
    /// Decoded CA bundle (PEM bytes).
    pub certificate_authority_data: Vec<u8>,
    pub arn: String,
}

/// Cluster description as the provider returns it, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub certificate_authority: Option<CertificateAuthority>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CertificateAuthority {
    /// Base64-encoded CA bundle.
    #[serde(default)]
    pub data: Option<String>,
}

/// A secondary credential identity attached to an account.
///
/// Each one yields an extra user/context pair per cluster, named
/// `<formatted-name>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraIdentity {
    pub name: String,
    pub profile: String,
}

/// Which executable the generated kubeconfig users invoke for a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialPlugin {
    /// `aws-iam-authenticator token -i <cluster> --region <region>`
    #[default]
    AwsIamAuthenticator,
    /// `aws eks get-token --cluster-name <cluster> --region <region>`
    AwsCli,
}

/// Everything the patch builder needs to know about an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountIdentity {
    pub name: String,
    pub profile: String,
    /// Name template; empty means the default template.
    pub format: String,
    pub extra_users: Vec<ExtraIdentity>,
    pub credential_plugin: CredentialPlugin,
}

/// Descriptors and errors collected from one scope of discovery.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub clusters: Vec<ClusterDescriptor>,
    pub errors: Vec<DiscoveryError>,
}

impl ScanResult {
    pub fn failed(error: DiscoveryError) -> Self {
        Self {
            clusters: Vec::new(),
            errors: vec![error],
        }
    }

    /// Flattens a child scope into this one.
    pub fn absorb(mut self, other: ScanResult) -> Self {
        self.clusters.extend(other.clusters);
        self.errors.extend(other.errors);
        self
    }
}

/// Raw provider client for one set of credentials.
///
/// Implementations do no retries and no timeouts of their own; the
/// [`crate::describe::ClusterDescriber`] bounds every call.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EksApi: Send + Sync {
    /// List the names of all clusters in `region`.
    async fn list_clusters(&self, region: &str) -> Result<Vec<String>, ProviderError>;

    /// Describe a single cluster by name.
    async fn describe_cluster(
        &self,
        name: &str,
        region: &str,
    ) -> Result<ClusterDescription, ProviderError>;
}

/// One configured account that can enumerate clusters.
///
/// The orchestrator is polymorphic over this trait rather than over a concrete
/// account kind.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ClusterAccount: Send + Sync {
    /// Scan every configured region and return what was found plus what failed.
    /// Never fails as a whole.
    async fn scan_for_clusters(&self) -> ScanResult;

    /// Display name used in reports and error labels.
    fn pretty_name(&self) -> String;

    /// Identity and naming settings for the patch builder.
    fn identity(&self) -> AccountIdentity;
}
