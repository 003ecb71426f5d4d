///
/// This module implements the CLI interface for kubesync: command parsing, settings
/// resolution and the user-visible output of each subcommand.
///
/// Discovery, patch building and kubeconfig reconciliation live in [`kubesync-core`].
/// This module only turns arguments into a [`SyncContext`] plus a set of accounts,
/// runs the pipeline and prints the report.
///
/// ## Subcommands
/// - `sync [ACCOUNT...] [--dry-run] [--purge]`: discover clusters and update the kubeconfig
/// - `configure --name N --profile P --region R...`: append an account to the settings file
/// - `accounts`: list configured account names
///
/// ## Cancellation
/// `sync` races the pipeline against Ctrl-C. Dropping the pipeline future cancels
/// every in-flight AWS call (child processes are killed on drop) and `run` returns
/// [`UserCancelled`], which [`exit_code`] maps to 130.
///
/// [`kubesync-core`]: ../../kubesync-core/
/// [`SyncContext`]: kubesync_core::synchronise::SyncContext
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kubesync_core::contract::{ClusterAccount, CredentialPlugin};
use kubesync_core::eks::{AccountSettings, EksAccount};
use kubesync_core::kubeconfig;
use kubesync_core::synchronise::{synchronise, SyncContext};
use thiserror::Error;

use crate::load_config::{default_settings_path, load_or_default, load_settings, Settings};
use crate::report::{render_report, SUCCESS_MARK, WARNING_MARK};

/// CLI for kubesync: keep your kubeconfig in sync with your EKS clusters.
#[derive(Parser)]
#[clap(
    name = "kubesync",
    version,
    about = "Discover EKS clusters across AWS accounts and regions and sync them into your kubeconfig"
)]
pub struct Cli {
    /// Settings file (default is $HOME/.kubesync.yaml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[clap(long, global = true)]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync your kubeconfig with every cluster the configured accounts can see
    Sync {
        /// Only sync these accounts (default: all configured accounts)
        accounts: Vec<String>,

        /// Show the changes without writing the kubeconfig
        #[clap(long)]
        dry_run: bool,

        /// Remove kubeconfig entries for clusters that were not found
        #[clap(long)]
        purge: bool,
    },
    /// Add an account to the settings file, creating it if needed
    Configure {
        /// Display name of the account, used in generated entry names
        #[clap(long)]
        name: String,

        /// AWS profile used to scan the account
        #[clap(long)]
        profile: String,

        /// Region to scan; repeat for more than one
        #[clap(long = "region", required = true)]
        regions: Vec<String>,

        /// Name template, e.g. "${name}.${region}.${clusterName}"
        #[clap(long)]
        format: Option<String>,

        /// Executable the generated users call for a token
        #[clap(long, value_enum, default_value_t = PluginArg::AwsIamAuthenticator)]
        credential_plugin: PluginArg,
    },
    /// List the configured account names
    Accounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PluginArg {
    AwsIamAuthenticator,
    AwsCli,
}

impl From<PluginArg> for CredentialPlugin {
    fn from(arg: PluginArg) -> Self {
        match arg {
            PluginArg::AwsIamAuthenticator => CredentialPlugin::AwsIamAuthenticator,
            PluginArg::AwsCli => CredentialPlugin::AwsCli,
        }
    }
}

/// Returned by [`run`] when the user interrupts a sync.
#[derive(Debug, Error)]
#[error("cancelled by user")]
pub struct UserCancelled;

pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USER_QUIT: u8 = 130;

/// Process exit status for an error returned by [`run`].
pub fn exit_code(error: &anyhow::Error) -> u8 {
    if error.chain().any(|cause| cause.is::<UserCancelled>()) {
        EXIT_USER_QUIT
    } else {
        EXIT_ERROR
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings_path = match cli.config {
        Some(path) => path,
        None => default_settings_path()?,
    };

    match cli.command {
        Commands::Sync {
            accounts,
            dry_run,
            purge,
        } => sync(&settings_path, &accounts, dry_run, purge).await,
        Commands::Configure {
            name,
            profile,
            regions,
            format,
            credential_plugin,
        } => {
            let account = AccountSettings {
                name,
                profile,
                regions,
                format: format.unwrap_or_default(),
                extra_users: Vec::new(),
                credential_plugin: credential_plugin.into(),
            };
            configure(&settings_path, account)
        }
        Commands::Accounts => {
            let settings = load_settings(&settings_path)?;
            for name in settings.account_names(&[]) {
                println!("{name}");
            }
            Ok(())
        }
    }
}

async fn sync(settings_path: &Path, filter: &[String], dry_run: bool, purge: bool) -> Result<()> {
    let settings = load_settings(settings_path)?;

    for name in settings.unknown_accounts(filter) {
        println!("{WARNING_MARK} can't find account `{name}`");
    }
    if purge && !filter.is_empty() {
        println!(
            "{WARNING_MARK} purging with an account filter removes entries of every account that was not selected"
        );
    }

    let accounts = build_accounts(&settings, filter);
    let ctx = SyncContext {
        kubeconfig_path: kubeconfig::default_path()?,
        dry_run,
        purge,
        account_deadline: settings.account_deadline(),
    };
    tracing::info!(
        command = "sync",
        accounts = accounts.len(),
        kubeconfig = %ctx.kubeconfig_path.display(),
        "Starting synchronisation process"
    );

    let report = tokio::select! {
        report = synchronise(&ctx, &accounts) => report.context("error updating kubeconfig")?,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!(command = "sync", "Interrupted, cancelling discovery");
            return Err(UserCancelled.into());
        }
    };

    tracing::info!(
        command = "sync",
        errors = report.error_count(),
        changes = report.diff.len(),
        written = report.written,
        "Synchronisation complete"
    );
    print!("{}", render_report(&report, dry_run));
    Ok(())
}

fn build_accounts(settings: &Settings, filter: &[String]) -> Vec<Box<dyn ClusterAccount>> {
    settings
        .accounts_filtered(filter)
        .into_iter()
        .map(|account| {
            Box::new(EksAccount::from_settings(account, settings.call_timeout()))
                as Box<dyn ClusterAccount>
        })
        .collect()
}

fn configure(settings_path: &Path, account: AccountSettings) -> Result<()> {
    let mut settings = load_or_default(settings_path)?;
    let name = account.name.clone();
    settings
        .add_account(account)
        .context("error adding account")?;
    settings.write_to_file(settings_path)?;
    println!("Account {name} configured {SUCCESS_MARK}");
    Ok(())
}
