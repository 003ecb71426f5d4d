/// `load_config` module: reads, validates and writes the kubesync settings file.
///
/// The settings file is YAML (default `~/.kubesync.yaml`) listing the AWS accounts to scan:
///
/// ```yaml
/// accounts:
///   - name: Dev
///     profile: dev
///     regions: [us-west-2, us-east-1]
///     format: "${name}.${region}.${clusterName}"   # optional
///     extraUsers:                                  # optional
///       - name: admin
///         profile: dev-admin
///     credentialPlugin: aws-cli                    # optional, default aws-iam-authenticator
/// timeouts:                                        # optional
///   callSeconds: 30
///   accountSeconds: 300
/// ```
///
/// # Responsibilities
/// - Parse the YAML into [`Settings`] and validate it before any discovery starts
/// - Select accounts for a run and list filter names that are not configured
/// - Append accounts and write the file back (`kubesync configure`)
///
/// Validation failures are [`SettingsError`]s; I/O and parse failures are surfaced
/// through `anyhow` with the offending path attached.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use kubesync_core::eks::AccountSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

pub const SETTINGS_FILE_NAME: &str = ".kubesync.yaml";

/// Regions an account may list.
pub const VALID_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-north-1",
    "sa-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
];

const DEFAULT_CALL_SECONDS: u64 = 30;
const DEFAULT_ACCOUNT_SECONDS: u64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("couldn't find {}, try running `kubesync configure`", .path.display())]
    Missing { path: PathBuf },

    #[error("account name already exists: `{name}` at accounts[{index}]")]
    DuplicateAccount { name: String, index: usize },

    #[error("account must contain at least one region: {account}")]
    NoRegions { account: String },

    #[error("invalid AWS region: region {region} in account {account}")]
    InvalidRegion { account: String, region: String },

    #[error("invalid extra user in account {account}: {reason}")]
    InvalidExtraUser { account: String, reason: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
    #[serde(default, skip_serializing_if = "Timeouts::is_default")]
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    /// Upper bound for a single list/describe call.
    #[serde(default = "default_call_seconds")]
    pub call_seconds: u64,
    /// Upper bound for scanning one account across all its regions.
    #[serde(default = "default_account_seconds")]
    pub account_seconds: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            call_seconds: DEFAULT_CALL_SECONDS,
            account_seconds: DEFAULT_ACCOUNT_SECONDS,
        }
    }
}

impl Timeouts {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

fn default_call_seconds() -> u64 {
    DEFAULT_CALL_SECONDS
}

fn default_account_seconds() -> u64 {
    DEFAULT_ACCOUNT_SECONDS
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (index, account) in self.accounts.iter().enumerate() {
            if self.accounts[..index].iter().any(|a| a.name == account.name) {
                return Err(SettingsError::DuplicateAccount {
                    name: account.name.clone(),
                    index,
                });
            }
            validate_account(account)?;
        }

        if self.timeouts.call_seconds == 0 {
            return Err(SettingsError::ZeroTimeout("callSeconds"));
        }
        if self.timeouts.account_seconds == 0 {
            return Err(SettingsError::ZeroTimeout("accountSeconds"));
        }
        Ok(())
    }

    /// Accounts named in `filter`, in settings order. An empty filter selects
    /// every account. Names that match nothing are skipped; see
    /// [`Settings::unknown_accounts`] to report them.
    pub fn accounts_filtered(&self, filter: &[String]) -> Vec<AccountSettings> {
        if filter.is_empty() {
            return self.accounts.clone();
        }
        self.accounts
            .iter()
            .filter(|account| filter.contains(&account.name))
            .cloned()
            .collect()
    }

    /// Names in `filter` that match no configured account, without duplicates.
    pub fn unknown_accounts(&self, filter: &[String]) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for name in filter {
            if !self.accounts.iter().any(|a| &a.name == name) && !unknown.contains(name) {
                unknown.push(name.clone());
            }
        }
        unknown
    }

    /// Configured account names, skipping any listed in `exclude`.
    pub fn account_names(&self, exclude: &[String]) -> Vec<&str> {
        self.accounts
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| !exclude.iter().any(|e| e == name))
            .collect()
    }

    /// Append `account` after validating it against the existing accounts.
    pub fn add_account(&mut self, account: AccountSettings) -> Result<(), SettingsError> {
        if self.accounts.iter().any(|a| a.name == account.name) {
            return Err(SettingsError::DuplicateAccount {
                name: account.name,
                index: self.accounts.len(),
            });
        }
        validate_account(&account)?;
        self.accounts.push(account);
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.call_seconds)
    }

    pub fn account_deadline(&self) -> Duration {
        Duration::from_secs(self.timeouts.account_seconds)
    }

    /// Write the settings as YAML, creating parent directories as needed.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("failed to serialise settings")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, yaml)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        info!(settings_path = %path.display(), accounts = self.accounts.len(), "Settings written");
        Ok(())
    }
}

fn validate_account(account: &AccountSettings) -> Result<(), SettingsError> {
    if account.regions.is_empty() {
        return Err(SettingsError::NoRegions {
            account: account.name.clone(),
        });
    }

    if let Some(region) = account
        .regions
        .iter()
        .find(|region| !VALID_REGIONS.contains(&region.as_str()))
    {
        return Err(SettingsError::InvalidRegion {
            account: account.name.clone(),
            region: region.clone(),
        });
    }

    for extra in &account.extra_users {
        if extra.name.is_empty() || extra.profile.is_empty() {
            return Err(SettingsError::InvalidExtraUser {
                account: account.name.clone(),
                reason: "extra users need both a name and a profile".to_string(),
            });
        }
    }
    Ok(())
}

/// `~/.kubesync.yaml`.
pub fn default_settings_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("failed to find user home directory")?;
    Ok(home.join(SETTINGS_FILE_NAME))
}

/// Load and validate the settings file. A missing file is an error that points
/// the user at `kubesync configure`.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        error!(settings_path = %path.display(), "Settings file not found");
        return Err(SettingsError::Missing {
            path: path.to_path_buf(),
        }
        .into());
    }

    let settings = read_settings(path)?;
    settings
        .validate()
        .with_context(|| format!("error validating settings in {}", path.display()))?;
    info!(settings_path = %path.display(), accounts = settings.accounts.len(), "Settings loaded");
    Ok(settings)
}

/// Like [`load_settings`], but a missing file yields empty settings so that a
/// first `kubesync configure` can create it.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!(settings_path = %path.display(), "No settings file yet, starting empty");
        return Ok(Settings::default());
    }
    load_settings(path)
}

fn read_settings(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse settings YAML in {}", path.display()))
}
