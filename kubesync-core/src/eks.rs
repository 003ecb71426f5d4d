//! EKS accounts: one AWS profile scanned across a list of regions.
//!
//! [`EksAccount`] fans out one future per region and, inside each region, one
//! future per cluster name. Each level joins exactly as many results as it
//! started, so nothing is dropped and nothing outlives the scan. Errors are
//! labelled and collected; a failed region listing skips only that region and
//! a failed describe skips only that cluster.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aws_cli::AwsCliClient;
use crate::contract::{
    AccountIdentity, ClusterAccount, CredentialPlugin, EksApi, ExtraIdentity, ScanResult,
};
use crate::describe::ClusterDescriber;
use crate::error::DiscoveryError;

/// One account entry as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub name: String,
    pub profile: String,
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_users: Vec<ExtraIdentity>,
    #[serde(default, skip_serializing_if = "is_default_plugin")]
    pub credential_plugin: CredentialPlugin,
}

fn is_default_plugin(plugin: &CredentialPlugin) -> bool {
    *plugin == CredentialPlugin::default()
}

impl AccountSettings {
    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            name: self.name.clone(),
            profile: self.profile.clone(),
            format: self.format.clone(),
            extra_users: self.extra_users.clone(),
            credential_plugin: self.credential_plugin,
        }
    }
}

pub struct EksAccount<C> {
    settings: AccountSettings,
    describer: ClusterDescriber<C>,
}

impl EksAccount<AwsCliClient> {
    /// Account backed by the AWS CLI under the account's own profile.
    pub fn from_settings(settings: AccountSettings, call_timeout: Duration) -> Self {
        let client = AwsCliClient::new(settings.profile.clone());
        Self::new(settings, ClusterDescriber::with_timeout(client, call_timeout))
    }
}

impl<C: EksApi> EksAccount<C> {
    pub fn new(settings: AccountSettings, describer: ClusterDescriber<C>) -> Self {
        Self {
            settings,
            describer,
        }
    }

    pub fn settings(&self) -> &AccountSettings {
        &self.settings
    }

    async fn scan_region(&self, region: &str) -> ScanResult {
        let names = match self.describer.list_clusters(region).await {
            Ok(names) => names,
            Err(source) => {
                warn!(account = %self.settings.name, region, error = %source, "[DISCOVER] Listing clusters failed");
                return ScanResult::failed(DiscoveryError::ListClusters {
                    account: self.settings.name.clone(),
                    region: region.to_string(),
                    source,
                });
            }
        };

        let described = join_all(
            names
                .iter()
                .map(|name| self.describer.describe_cluster(name, region)),
        )
        .await;

        let mut result = ScanResult::default();
        for (name, outcome) in names.iter().zip(described) {
            match outcome {
                Ok(descriptor) => result.clusters.push(descriptor),
                Err(source) => {
                    warn!(account = %self.settings.name, cluster = %name, region, error = %source, "[DISCOVER] Describing cluster failed");
                    result.errors.push(DiscoveryError::DescribeCluster {
                        cluster: name.clone(),
                        region: region.to_string(),
                        source,
                    });
                }
            }
        }
        result
    }
}

#[async_trait]
impl<C: EksApi> ClusterAccount for EksAccount<C> {
    async fn scan_for_clusters(&self) -> ScanResult {
        info!(account = %self.settings.name, regions = self.settings.regions.len(), "[DISCOVER] Scanning account");
        let regions = join_all(
            self.settings
                .regions
                .iter()
                .map(|region| self.scan_region(region)),
        )
        .await;

        let result = regions
            .into_iter()
            .fold(ScanResult::default(), ScanResult::absorb);
        info!(
            account = %self.settings.name,
            clusters = result.clusters.len(),
            errors = result.errors.len(),
            "[DISCOVER] Account scan finished"
        );
        result
    }

    fn pretty_name(&self) -> String {
        self.settings.name.clone()
    }

    fn identity(&self) -> AccountIdentity {
        self.settings.identity()
    }
}
