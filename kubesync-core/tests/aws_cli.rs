#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kubesync_core::aws_cli::AwsCliClient;
use kubesync_core::contract::EksApi;
use kubesync_core::describe::ClusterDescriber;
use kubesync_core::error::ProviderError;
use serial_test::serial;
use tempfile::{tempdir, TempDir};

/// A stand-in for the `aws` executable. It records its arguments next to
/// itself and answers based on the subcommand.
const FAKE_AWS: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/last-args"
case "$2" in
  list-clusters)
    echo '{"clusters": ["foo", "bar"]}'
    ;;
  describe-cluster)
    if [ "$4" = "broken" ]; then
      echo "An error occurred (ResourceNotFoundException): No cluster found for name: broken." >&2
      exit 254
    fi
    if [ "$4" = "slow" ]; then
      sleep 30
    fi
    cat <<JSON
{"cluster": {"name": "$4", "arn": "arn:aws:eks:us-west-2:012345678910:cluster/$4",
 "endpoint": "https://$4.eks.amazonaws.com", "status": "ACTIVE",
 "certificateAuthority": {"data": "Y2EtZGF0YQ=="}}}
JSON
    ;;
  *)
    echo "not json"
    ;;
esac
"#;

fn fake_aws() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let program = dir.path().join("aws");
    std::fs::write(&program, FAKE_AWS).unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
    (dir, program)
}

fn last_args(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("last-args"))
        .unwrap()
        .trim()
        .to_string()
}

#[tokio::test]
#[serial]
async fn test_list_clusters_passes_profile_and_parses_names() {
    let (dir, program) = fake_aws();
    let client = AwsCliClient::with_program(program.to_string_lossy(), "dev");

    let names = client.list_clusters("us-west-2").await.expect("list clusters");

    assert_eq!(names, vec!["foo", "bar"]);
    assert_eq!(
        last_args(dir.path()),
        "eks list-clusters --region us-west-2 --profile dev --output json"
    );
}

#[tokio::test]
#[serial]
async fn test_describe_cluster_through_describer_decodes_ca() {
    let (dir, program) = fake_aws();
    let describer =
        ClusterDescriber::new(AwsCliClient::with_program(program.to_string_lossy(), "dev"));

    let cluster = describer
        .describe_cluster("foo", "us-west-2")
        .await
        .expect("describe cluster");

    assert_eq!(cluster.server, "https://foo.eks.amazonaws.com");
    assert_eq!(cluster.certificate_authority_data, b"ca-data");
    assert_eq!(cluster.arn, "arn:aws:eks:us-west-2:012345678910:cluster/foo");
    assert_eq!(
        last_args(dir.path()),
        "eks describe-cluster --name foo --region us-west-2 --profile dev --output json"
    );
}

#[tokio::test]
#[serial]
async fn test_non_zero_exit_carries_stderr() {
    let (_dir, program) = fake_aws();
    let client = AwsCliClient::with_program(program.to_string_lossy(), "dev");

    let err = client
        .describe_cluster("broken", "us-west-2")
        .await
        .expect_err("broken cluster must fail");

    match err {
        ProviderError::Command { stderr, .. } => {
            assert!(stderr.contains("ResourceNotFoundException"), "stderr: {stderr}");
        }
        other => panic!("expected a command error, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn test_missing_program_is_a_spawn_error() {
    let dir = tempdir().unwrap();
    let client = AwsCliClient::with_program(dir.path().join("no-such-aws").to_string_lossy(), "dev");

    let err = client.list_clusters("us-west-2").await.expect_err("must fail");
    assert!(matches!(err, ProviderError::Spawn { .. }), "got {err:?}");
}

#[tokio::test]
#[serial]
async fn test_slow_command_is_cut_off_by_call_timeout() {
    let (_dir, program) = fake_aws();
    let describer = ClusterDescriber::with_timeout(
        AwsCliClient::with_program(program.to_string_lossy(), "dev"),
        Duration::from_millis(300),
    );

    let started = std::time::Instant::now();
    let err = describer
        .describe_cluster("slow", "us-west-2")
        .await
        .expect_err("slow cluster must time out");

    assert!(matches!(err, ProviderError::Timeout(_)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
}
