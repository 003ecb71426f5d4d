//! Turn discovered clusters into kubeconfig entries.
//!
//! For every cluster the builder emits one cluster, one user and one context,
//! all sharing the formatted name. Each extra identity adds a user and a
//! context named `<formatted-name>.<identity>` that point at the same cluster
//! but authenticate with the identity's profile.

use std::collections::BTreeMap;

use crate::contract::{AccountIdentity, ClusterDescriptor, CredentialPlugin};
use crate::format::{cluster_replacements, format_name};
use crate::kubeconfig::{
    AuthInfo, CertificateData, Cluster, Context, ExecConfig, ExecEnvVar, NamedCluster,
    NamedContext, NamedUser,
};

pub const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";
pub const PROFILE_ENV: &str = "AWS_PROFILE";

/// Entries produced by one run, before they are merged into a kubeconfig.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KubeConfigPatch {
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
    pub contexts: Vec<NamedContext>,
}

impl KubeConfigPatch {
    pub fn extend(&mut self, other: KubeConfigPatch) {
        self.clusters.extend(other.clusters);
        self.users.extend(other.users);
        self.contexts.extend(other.contexts);
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty() && self.users.is_empty() && self.contexts.is_empty()
    }
}

pub fn build_patch(account: &AccountIdentity, clusters: &[ClusterDescriptor]) -> KubeConfigPatch {
    let mut patch = KubeConfigPatch::default();

    for cluster in clusters {
        let name = format_name(&account.format, &cluster_replacements(&account.name, cluster));

        patch.clusters.push(NamedCluster {
            name: name.clone(),
            cluster: Cluster {
                server: cluster.server.clone(),
                certificate_authority_data: Some(CertificateData::from_bytes(
                    cluster.certificate_authority_data.clone(),
                )),
                other: BTreeMap::new(),
            },
        });

        patch.users.push(user(&name, account.credential_plugin, &account.profile, cluster));
        patch.contexts.push(context(&name, &name, &name));

        for extra in &account.extra_users {
            let suffixed = format!("{name}.{}", extra.name);
            patch
                .users
                .push(user(&suffixed, account.credential_plugin, &extra.profile, cluster));
            patch.contexts.push(context(&suffixed, &name, &suffixed));
        }
    }

    patch
}

fn user(
    name: &str,
    plugin: CredentialPlugin,
    profile: &str,
    cluster: &ClusterDescriptor,
) -> NamedUser {
    NamedUser {
        name: name.to_string(),
        user: AuthInfo {
            exec: Some(exec_config(plugin, profile, cluster)),
            other: BTreeMap::new(),
        },
    }
}

fn context(name: &str, cluster: &str, user: &str) -> NamedContext {
    NamedContext {
        name: name.to_string(),
        context: Context {
            cluster: cluster.to_string(),
            user: user.to_string(),
            other: BTreeMap::new(),
        },
    }
}

/// The exec plugin invocation that fetches a token for `cluster` as `profile`.
pub fn exec_config(
    plugin: CredentialPlugin,
    profile: &str,
    cluster: &ClusterDescriptor,
) -> ExecConfig {
    let (command, args) = match plugin {
        CredentialPlugin::AwsIamAuthenticator => (
            "aws-iam-authenticator",
            vec![
                "token",
                "-i",
                cluster.name.as_str(),
                "--region",
                cluster.region.as_str(),
            ],
        ),
        CredentialPlugin::AwsCli => (
            "aws",
            vec![
                "eks",
                "get-token",
                "--cluster-name",
                cluster.name.as_str(),
                "--region",
                cluster.region.as_str(),
            ],
        ),
    };

    ExecConfig {
        command: command.to_string(),
        args: args.into_iter().map(str::to_string).collect(),
        env: vec![ExecEnvVar {
            name: PROFILE_ENV.to_string(),
            value: profile.to_string(),
        }],
        api_version: EXEC_API_VERSION.to_string(),
        other: BTreeMap::new(),
    }
}
