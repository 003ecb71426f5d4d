//! [`EksApi`] backed by the AWS command line tool.
//!
//! Credentials never pass through this crate: each call runs
//! `aws eks ... --profile <profile> --output json` and lets the AWS tooling
//! resolve the named profile. Child processes are killed if the caller stops
//! waiting (for example when the describer's timeout fires).

use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, error};

use crate::contract::{ClusterDescription, EksApi};
use crate::error::ProviderError;

pub const DEFAULT_PROGRAM: &str = "aws";

#[derive(Debug, Clone)]
pub struct AwsCliClient {
    program: String,
    profile: String,
}

#[derive(Deserialize)]
struct ListClustersOutput {
    #[serde(default)]
    clusters: Vec<String>,
}

#[derive(Deserialize)]
struct DescribeClusterOutput {
    cluster: ClusterDescription,
}

impl AwsCliClient {
    pub fn new(profile: impl Into<String>) -> Self {
        Self::with_program(DEFAULT_PROGRAM, profile)
    }

    /// Use a different executable, e.g. an absolute path or a wrapper script.
    pub fn with_program(program: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: profile.into(),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, ProviderError> {
        debug!(program = %self.program, profile = %self.profile, ?args, "[AWS] Running command");
        let output = Command::new(&self.program)
            .args(args)
            .arg("--profile")
            .arg(&self.profile)
            .arg("--output")
            .arg("json")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProviderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(program = %self.program, status = %output.status, stderr = %stderr, "[AWS] Command failed");
            return Err(ProviderError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl EksApi for AwsCliClient {
    async fn list_clusters(&self, region: &str) -> Result<Vec<String>, ProviderError> {
        let output: ListClustersOutput = self
            .run_json(&["eks", "list-clusters", "--region", region])
            .await?;
        Ok(output.clusters)
    }

    async fn describe_cluster(
        &self,
        name: &str,
        region: &str,
    ) -> Result<ClusterDescription, ProviderError> {
        let output: DescribeClusterOutput = self
            .run_json(&["eks", "describe-cluster", "--name", name, "--region", region])
            .await?;
        Ok(output.cluster)
    }
}
