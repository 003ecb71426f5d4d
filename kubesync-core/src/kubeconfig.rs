//! # kubeconfig: the persisted document
//!
//! A typed view of the parts of a kubeconfig that kubesync manages, with every
//! other key carried through untouched in `other` maps. Loading and saving a
//! document therefore never drops fields that kubesync does not understand,
//! whether they sit at the top level (`current-context`, `preferences`) or on
//! individual entries (`namespace`, `insecure-skip-tls-verify`, ...).
//!
//! The three collections are [`NamedList`]s: ordered, keyed by entry name, with
//! an explicit [`NamedList::upsert`] instead of implicit map overwrites.
//!
//! Writes are atomic: the document is written to a temporary file next to the
//! target and renamed over it.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::KubeconfigError;

pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// An entry in one of the kubeconfig collections.
pub trait NamedEntry {
    fn name(&self) -> &str;

    /// Overwrite every field kubesync manages with the values from `incoming`.
    /// Fields kubesync does not manage are kept.
    fn overwrite_with(&mut self, incoming: Self);
}

/// What [`NamedList::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Ordered collection of uniquely named entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedList<T> {
    items: Vec<T>,
}

impl<T> Default for NamedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> FromIterator<T> for NamedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: NamedEntry> NamedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.iter().find(|item| item.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert `entry`, or overwrite the existing entry with the same name.
    pub fn upsert(&mut self, entry: T) -> Upsert {
        match self.items.iter_mut().find(|item| item.name() == entry.name()) {
            Some(existing) => {
                existing.overwrite_with(entry);
                Upsert::Updated
            }
            None => {
                self.items.push(entry);
                Upsert::Inserted
            }
        }
    }

    /// Remove every entry named `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.name() != name);
        before - self.items.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(NamedEntry::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: NamedList<NamedCluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: NamedList<NamedUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: NamedList<NamedContext>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Default for Kubeconfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            clusters: NamedList::default(),
            users: NamedList::default(),
            contexts: NamedList::default(),
            other: BTreeMap::new(),
        }
    }
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Config".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default)]
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_data: Option<CertificateData>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl NamedEntry for NamedCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn overwrite_with(&mut self, incoming: Self) {
        self.cluster.server = incoming.cluster.server;
        // Same bytes keep the existing on-disk text, line wrapping included.
        if self.cluster.certificate_authority_data != incoming.cluster.certificate_authority_data {
            self.cluster.certificate_authority_data = incoming.cluster.certificate_authority_data;
        }
    }
}

/// A base64 CA bundle as it appears in a kubeconfig.
///
/// The original text is kept and written back verbatim, so an entry that is
/// loaded and saved again is unchanged even when its value is wrapped over
/// several lines. Decoding skips ASCII whitespace, as kubectl does. A value
/// that still fails to decode is carried through as text and compares unequal
/// to any decoded bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CertificateData {
    encoded: String,
    decoded: Option<Vec<u8>>,
}

impl CertificateData {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            encoded: STANDARD.encode(&bytes),
            decoded: Some(bytes),
        }
    }

    /// Decoded bytes, or `None` when the stored text is not valid base64.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.decoded.as_deref()
    }

    /// The text as it is stored in the document.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// Base64-decode `encoded`, ignoring ASCII whitespace anywhere in the value.
pub fn decode_certificate(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}

impl From<String> for CertificateData {
    fn from(encoded: String) -> Self {
        let decoded = decode_certificate(&encoded).ok();
        Self { encoded, decoded }
    }
}

impl From<CertificateData> for String {
    fn from(data: CertificateData) -> Self {
        data.encoded
    }
}

impl PartialEq for CertificateData {
    fn eq(&self, other: &Self) -> bool {
        match (&self.decoded, &other.decoded) {
            (Some(a), Some(b)) => a == b,
            _ => self.encoded == other.encoded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: AuthInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// An exec credential plugin invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecConfig {
    pub command: String,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub args: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub env: Vec<ExecEnvVar>,
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

impl NamedEntry for NamedUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn overwrite_with(&mut self, incoming: Self) {
        match (&mut self.user.exec, incoming.user.exec) {
            (Some(current), Some(exec)) => {
                current.command = exec.command;
                current.args = exec.args;
                current.env = exec.env;
                current.api_version = exec.api_version;
            }
            (slot, exec) => *slot = exec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    #[serde(default)]
    pub context: Context,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl NamedEntry for NamedContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn overwrite_with(&mut self, incoming: Self) {
        self.context.cluster = incoming.context.cluster;
        self.context.user = incoming.context.user;
    }
}

impl Kubeconfig {
    /// Load the document at `path`. A missing or empty file is an empty document.
    pub fn load(path: &Path) -> Result<Self, KubeconfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "[KUBECONFIG] No kubeconfig found, starting from an empty document");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(KubeconfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let kubeconfig = Self::from_yaml(&content).map_err(|source| KubeconfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            clusters = kubeconfig.clusters.len(),
            users = kubeconfig.users.len(),
            contexts = kubeconfig.contexts.len(),
            "[KUBECONFIG] Loaded kubeconfig"
        );
        Ok(kubeconfig)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, KubeconfigError> {
        serde_yaml::to_string(self).map_err(KubeconfigError::Serialise)
    }

    /// Atomically replace the file at `path` with this document, creating
    /// parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), KubeconfigError> {
        let yaml = self.to_yaml()?;
        let write_error = |source: std::io::Error| KubeconfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_error)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_error)?;
        tmp.write_all(yaml.as_bytes()).map_err(write_error)?;
        tmp.as_file().sync_all().map_err(write_error)?;
        tmp.persist(path).map_err(|e| write_error(e.error))?;

        info!(path = %path.display(), "[KUBECONFIG] Wrote kubeconfig");
        Ok(())
    }
}

/// Resolve the kubeconfig path: the first entry of `$KUBECONFIG`, otherwise
/// `~/.kube/config`.
pub fn default_path() -> Result<PathBuf, KubeconfigError> {
    resolve_path(std::env::var_os(KUBECONFIG_ENV), dirs::home_dir())
        .ok_or(KubeconfigError::NoHomeDirectory)
}

pub fn resolve_path(kubeconfig_env: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    kubeconfig_env
        .and_then(|value| std::env::split_paths(&value).find(|p| !p.as_os_str().is_empty()))
        .or_else(|| home.map(|home| home.join(".kube").join("config")))
}
