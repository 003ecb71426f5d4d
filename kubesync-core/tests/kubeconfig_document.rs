use std::ffi::OsString;
use std::path::PathBuf;

use kubesync_core::error::KubeconfigError;
use kubesync_core::kubeconfig::{
    decode_certificate, resolve_path, CertificateData, Kubeconfig, NamedUser, Upsert,
};
use kubesync_core::merge::apply_patch;
use kubesync_core::patch::KubeConfigPatch;
use tempfile::tempdir;

const EXISTING: &str = r#"
apiVersion: v1
kind: Config
current-context: minikube
preferences:
  colors: true
clusters:
- name: minikube
  cluster:
    server: https://192.168.49.2:8443
    certificate-authority-data: aGVsbG8=
    insecure-skip-tls-verify: false
users:
- name: minikube
  user:
    client-certificate: /home/dev/.minikube/profiles/minikube/client.crt
- name: Dev.us-west-2.foo
  user:
    exec:
      command: aws-iam-authenticator
      args:
      - token
      - -i
      - foo
      env:
      - name: AWS_PROFILE
        value: dev
      apiVersion: client.authentication.k8s.io/v1beta1
      interactiveMode: Never
- name: sparse
  user:
    exec:
      command: foo
contexts:
- name: minikube
  context:
    cluster: minikube
    user: minikube
    namespace: default
- name: half-context
  context:
    cluster: c
"#;

#[test]
fn test_parse_keeps_unknown_fields_through_a_round_trip() {
    let kubeconfig = Kubeconfig::from_yaml(EXISTING).expect("parse kubeconfig");

    let minikube = kubeconfig.clusters.get("minikube").expect("minikube cluster");
    assert_eq!(
        minikube.cluster.certificate_authority_data.as_ref().and_then(|ca| ca.as_bytes()),
        Some(&b"hello"[..])
    );
    assert!(kubeconfig.other.contains_key("current-context"));

    let user = kubeconfig.users.get("Dev.us-west-2.foo").expect("dev user");
    let exec = user.user.exec.as_ref().expect("exec config");
    assert_eq!(exec.args, vec!["token", "-i", "foo"]);
    assert!(exec.other.contains_key("interactiveMode"));

    let yaml = kubeconfig.to_yaml().expect("serialise kubeconfig");
    assert!(yaml.contains("current-context: minikube"));
    assert!(yaml.contains("insecure-skip-tls-verify: false"));
    assert!(yaml.contains("client-certificate: /home/dev/.minikube/profiles/minikube/client.crt"));
    assert!(yaml.contains("namespace: default"));
    assert!(yaml.contains("interactiveMode: Never"));
    assert!(yaml.contains("certificate-authority-data: aGVsbG8="));

    // Sparse entries gain no keys that were absent from the input.
    assert!(!yaml.contains("apiVersion: ''"), "yaml: {yaml}");
    assert!(!yaml.contains("user: ''"), "yaml: {yaml}");
    assert!(!yaml.contains("server: ''"), "yaml: {yaml}");
    let sparse = kubeconfig.users.get("sparse").expect("sparse user");
    assert_eq!(sparse.user.exec.as_ref().map(|e| e.api_version.as_str()), Some(""));

    let reparsed = Kubeconfig::from_yaml(&yaml).expect("reparse kubeconfig");
    assert_eq!(reparsed, kubeconfig);
}

#[test]
fn test_null_and_missing_collections_are_empty() {
    let kubeconfig = Kubeconfig::from_yaml("apiVersion: v1\nkind: Config\nclusters: null\nusers:\n")
        .expect("parse kubeconfig");
    assert!(kubeconfig.clusters.is_empty());
    assert!(kubeconfig.users.is_empty());
    assert!(kubeconfig.contexts.is_empty());

    let empty = Kubeconfig::from_yaml("   \n").expect("parse empty document");
    assert_eq!(empty, Kubeconfig::default());
    assert_eq!(empty.api_version, "v1");
    assert_eq!(empty.kind, "Config");
}

#[test]
fn test_upsert_reports_insert_then_update() {
    let mut kubeconfig = Kubeconfig::default();
    let user = NamedUser {
        name: "foo".to_string(),
        user: Default::default(),
    };

    assert_eq!(kubeconfig.users.upsert(user.clone()), Upsert::Inserted);
    assert_eq!(kubeconfig.users.upsert(user), Upsert::Updated);
    assert_eq!(kubeconfig.users.len(), 1);
    assert_eq!(kubeconfig.users.remove("foo"), 1);
    assert!(kubeconfig.users.is_empty());
}

#[test]
fn test_load_missing_file_is_empty_document() {
    let dir = tempdir().unwrap();
    let kubeconfig = Kubeconfig::load(&dir.path().join("does-not-exist")).expect("load");
    assert_eq!(kubeconfig, Kubeconfig::default());
}

#[test]
fn test_load_invalid_yaml_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config");
    std::fs::write(&path, "clusters: [this is: not: valid").unwrap();

    let err = Kubeconfig::load(&path).expect_err("invalid yaml must fail");
    assert!(matches!(err, KubeconfigError::Parse { .. }), "got {err:?}");
}

#[test]
fn test_write_creates_parents_and_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join(".kube").join("config");
    let kubeconfig = Kubeconfig::from_yaml(EXISTING).expect("parse kubeconfig");

    kubeconfig.write(&path).expect("write kubeconfig");
    let loaded = Kubeconfig::load(&path).expect("load kubeconfig");
    assert_eq!(loaded, kubeconfig);

    // Only the target file is left behind, no temporary siblings.
    let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![OsString::from("config")]);
}

#[test]
fn test_resolve_path_prefers_first_kubeconfig_entry() {
    let home = Some(PathBuf::from("/home/dev"));

    let joined = std::env::join_paths([
        PathBuf::from("/tmp/first"),
        PathBuf::from("/tmp/second"),
    ])
    .unwrap();
    assert_eq!(
        resolve_path(Some(joined), home.clone()),
        Some(PathBuf::from("/tmp/first"))
    );
    assert_eq!(
        resolve_path(None, home.clone()),
        Some(PathBuf::from("/home/dev/.kube/config"))
    );
    assert_eq!(
        resolve_path(Some(OsString::new()), home),
        Some(PathBuf::from("/home/dev/.kube/config"))
    );
    assert_eq!(resolve_path(None, None), None);
}

/// base64 output wrapped at 76 columns, as `base64` and many tools write it.
const WRAPPED_CA: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: on-prem
  cluster:
    server: https://10.0.0.1:6443
    certificate-authority-data: |
      LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0tCk1JSUJkekNDQVIyZ0F3SUJBZ0lCQURBS0JnZ3Foa2pP
      UFFRREFqQWpNU0V3SHdZRFZRUUREQmhyTTNNdGMyVnkKLS0tLS1FTkQgQ0VSVElGSUNBVEUtLS0tLQo=
- name: broken
  cluster:
    server: https://10.0.0.2:6443
    certificate-authority-data: "not base64!"
"#;

#[test]
fn test_wrapped_and_invalid_ca_data_load_and_survive_a_merge() {
    let mut kubeconfig = Kubeconfig::from_yaml(WRAPPED_CA).expect("wrapped CA data must parse");

    let on_prem = kubeconfig.clusters.get("on-prem").expect("on-prem cluster");
    let ca = on_prem.cluster.certificate_authority_data.clone().expect("CA data");
    let bytes = ca.as_bytes().expect("wrapped CA decodes").to_vec();
    assert!(bytes.starts_with(b"-----BEGIN CERTIFICATE-----"));
    assert!(ca.encoded().contains('\n'));

    let broken = kubeconfig.clusters.get("broken").expect("broken cluster");
    let broken_ca = broken.cluster.certificate_authority_data.as_ref().expect("CA text");
    assert_eq!(broken_ca.as_bytes(), None);
    assert_eq!(broken_ca.encoded(), "not base64!");

    // Re-applying the same bytes under the same name leaves the stored text alone.
    let mut same = on_prem.clone();
    same.cluster.certificate_authority_data = Some(CertificateData::from_bytes(bytes.clone()));
    let patch = KubeConfigPatch {
        clusters: vec![same],
        ..KubeConfigPatch::default()
    };
    let before = kubeconfig.clone();
    let diff = apply_patch(&patch, &mut kubeconfig, false);
    assert!(diff.is_empty(), "unchanged CA must not show up in the diff: {diff}");

    let yaml = kubeconfig.to_yaml().expect("serialise kubeconfig");
    let reparsed = Kubeconfig::from_yaml(&yaml).expect("reparse kubeconfig");
    assert_eq!(reparsed, before);
    for name in ["on-prem", "broken"] {
        let written = reparsed.clusters.get(name).unwrap();
        let original = before.clusters.get(name).unwrap();
        assert_eq!(
            written.cluster.certificate_authority_data.as_ref().map(|ca| ca.encoded()),
            original.cluster.certificate_authority_data.as_ref().map(|ca| ca.encoded()),
            "stored text of {name} changed"
        );
    }
}

#[test]
fn test_decode_certificate_skips_whitespace() {
    assert_eq!(decode_certificate("aGVs\nbG8=\r\n").unwrap(), b"hello");
    assert_eq!(decode_certificate("  aGVsbG8=  ").unwrap(), b"hello");
    assert!(decode_certificate("not base64!").is_err());
}
