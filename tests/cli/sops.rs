//! Tests for `fleetkeys update-sops-files`.

use crate::support::*;

#[test]
fn test_update_sops_files_visits_matching_files() {
    let t = Test::new();
    t.write_file("hosts/x/secrets.yaml", ENCRYPTED_FIXTURE);
    t.write_file("terraform/state.ENC.json", "{}");
    t.write_file("hosts/x/configuration.nix", "{ }");
    t.write_file(".git/secrets.yaml", "");

    let output = t.update_sops_files();
    assert_success(&output);
    assert_stdout_contains(&output, "updated 2 sops files");

    let calls = t.calls_to("sops");
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.starts_with("sops updatekeys --yes ")));
    assert!(calls.iter().any(|c| c.ends_with("hosts/x/secrets.yaml")));
    assert!(!calls.iter().any(|c| c.ends_with("secrets/a.yaml")));
    assert!(calls.iter().any(|c| c.ends_with("terraform/state.ENC.json")));
}

#[test]
fn test_update_sops_files_reports_failures() {
    let t = Test::new();
    t.write_file("hosts/x/secrets.yaml", ENCRYPTED_FIXTURE);
    t.fail_sops();

    let output = t.update_sops_files();
    assert_exit_1(&output);
    assert_stderr_contains(&output, "1 of 1 files failed");
}

#[test]
fn test_update_sops_files_with_no_matches() {
    let t = Test::new();

    let output = t.update_sops_files();
    assert_success(&output);
    assert_stdout_contains(&output, "no sops files found");
    assert!(t.calls_to("sops").is_empty());
}
