//! Terminal rendering for a finished sync.
//!
//! Everything here returns plain strings so the CLI decides where they go
//! (stdout) and tests can assert on them directly.

use std::fmt::Write;

use kubesync_core::synchronise::{AccountReport, SynchroniseReport};

pub const SUCCESS_MARK: &str = "✓";
pub const WARNING_MARK: &str = "⚠";

/// One line per account, followed by a bullet per error for accounts that had any.
pub fn render_accounts(accounts: &[AccountReport]) -> String {
    let mut out = String::new();
    for account in accounts {
        let clusters = plural(account.clusters, "cluster");
        if account.errors.is_empty() {
            let _ = writeln!(out, "{} {SUCCESS_MARK} ({clusters})", account.account);
        } else {
            let errors = plural(account.errors.len(), "error");
            let _ = writeln!(out, "{} {WARNING_MARK} ({clusters}, {errors})", account.account);
            for error in &account.errors {
                let _ = writeln!(out, "  • {error}");
            }
        }
    }
    out
}

/// The whole report: accounts, the kubeconfig diff and a closing status line.
pub fn render_report(report: &SynchroniseReport, dry_run: bool) -> String {
    let mut out = render_accounts(&report.accounts);

    if report.diff.is_empty() {
        out.push_str("No kubeconfig changes\n");
    } else {
        let _ = writeln!(out, "{}", report.diff);
    }

    if dry_run {
        let _ = writeln!(out, "Dry run complete {SUCCESS_MARK}");
    } else if report.written {
        let _ = writeln!(out, "kubeconfig updated {SUCCESS_MARK}");
    }
    out
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
