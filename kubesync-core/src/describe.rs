//! Bounded, validated access to a provider client.
//!
//! [`ClusterDescriber`] wraps an [`EksApi`] and adds the two things every call
//! needs: a fixed timeout and conversion of the raw description into a
//! [`ClusterDescriptor`]. Nothing here retries.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::contract::{ClusterDescription, ClusterDescriptor, EksApi};
use crate::error::ProviderError;
use crate::kubeconfig::decode_certificate;

/// Upper bound for one list or describe call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ClusterDescriber<C> {
    client: C,
    timeout: Duration,
}

impl<C: EksApi> ClusterDescriber<C> {
    pub fn new(client: C) -> Self {
        Self::with_timeout(client, DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(client: C, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn list_clusters(&self, region: &str) -> Result<Vec<String>, ProviderError> {
        let names = self.bounded(self.client.list_clusters(region)).await?;
        debug!(region, count = names.len(), "[DESCRIBE] Listed clusters");
        Ok(names)
    }

    pub async fn describe_cluster(
        &self,
        name: &str,
        region: &str,
    ) -> Result<ClusterDescriptor, ProviderError> {
        let description = self.bounded(self.client.describe_cluster(name, region)).await?;
        let descriptor = into_descriptor(name, region, description)?;
        debug!(cluster = name, region, server = %descriptor.server, "[DESCRIBE] Described cluster");
        Ok(descriptor)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
    }
}

/// Validates a raw description. Endpoint, ARN and CA data are all required and
/// the CA must be valid base64.
pub fn into_descriptor(
    name: &str,
    region: &str,
    description: ClusterDescription,
) -> Result<ClusterDescriptor, ProviderError> {
    let server = description
        .endpoint
        .filter(|endpoint| !endpoint.is_empty())
        .ok_or(ProviderError::MissingField("endpoint"))?;
    let arn = description
        .arn
        .filter(|arn| !arn.is_empty())
        .ok_or(ProviderError::MissingField("arn"))?;
    let encoded = description
        .certificate_authority
        .and_then(|ca| ca.data)
        .ok_or(ProviderError::MissingField("certificateAuthority.data"))?;
    let certificate_authority_data = decode_certificate(&encoded)?;

    Ok(ClusterDescriptor {
        name: name.to_string(),
        region: region.to_string(),
        server,
        certificate_authority_data,
        arn,
    })
}
