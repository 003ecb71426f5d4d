//! Name templates for generated kubeconfig entries.
//!
//! A template is plain text with `${token}` placeholders. Substitution is a
//! single left-to-right pass: text produced by a replacement is never scanned
//! again, so a value that happens to contain `${region}` stays literal.
//! Unknown placeholders are left untouched.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::contract::ClusterDescriptor;

pub const NAME_TOKEN: &str = "${name}";
pub const REGION_TOKEN: &str = "${region}";
pub const CLUSTER_NAME_TOKEN: &str = "${clusterName}";
pub const CLUSTER_ARN_TOKEN: &str = "${clusterArn}";

/// Used whenever an account has no `format` configured.
pub const DEFAULT_FORMAT: &str = "${name}.${region}.${clusterName}";

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{[A-Za-z0-9_]+\}").expect("token pattern is valid"))
}

/// Replaces every known token in `format` with its value.
///
/// An empty `format` falls back to [`DEFAULT_FORMAT`].
pub fn format_name(format: &str, replacements: &HashMap<&str, &str>) -> String {
    let format = if format.is_empty() {
        DEFAULT_FORMAT
    } else {
        format
    };

    token_pattern()
        .replace_all(format, |caps: &Captures<'_>| {
            let token = &caps[0];
            replacements
                .get(token)
                .map(|value| value.to_string())
                .unwrap_or_else(|| token.to_string())
        })
        .into_owned()
}

/// The standard replacement table for one cluster of one account.
pub fn cluster_replacements<'a>(
    account_name: &'a str,
    cluster: &'a ClusterDescriptor,
) -> HashMap<&'static str, &'a str> {
    HashMap::from([
        (NAME_TOKEN, account_name),
        (REGION_TOKEN, cluster.region.as_str()),
        (CLUSTER_NAME_TOKEN, cluster.name.as_str()),
        (CLUSTER_ARN_TOKEN, cluster.arn.as_str()),
    ])
}
