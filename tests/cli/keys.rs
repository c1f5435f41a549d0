//! Tests for `fleetkeys print-keys`.

use crate::support::*;

#[test]
fn test_print_keys_outputs_ssh_and_age_keys() {
    let t = Test::new();

    let output = t.print_keys("a");
    assert_success(&output);
    assert_stdout_contains(&output, "###### Public keys ######");
    assert_stdout_contains(&output, PUBLIC_KEY);
    assert_stdout_contains(&output, "###### Age keys ######");
    assert_stdout_contains(&output, AGE_KEY);

    let out = stdout(&output);
    assert!(out.find(PUBLIC_KEY).unwrap() < out.find(AGE_KEY).unwrap());
}

#[test]
fn test_print_keys_decrypts_requested_field() {
    let t = Test::new();

    assert_success(&t.print_keys("a"));

    let sops = t.calls_to("sops");
    assert_eq!(sops.len(), 1);
    assert!(sops[0].starts_with(r#"sops --extract ["ssh_host_ed25519_key"] --decrypt "#));
    assert!(sops[0].ends_with("secrets/a.yaml"));
}

#[test]
fn test_private_key_is_owner_read_only_when_derived() {
    let t = Test::new();

    assert_success(&t.print_keys("a"));

    let keygen = t.calls_to("ssh-keygen");
    assert!(!keygen.is_empty());
    for call in keygen {
        assert!(call.ends_with("mode=-r--------"), "unexpected mode: {}", call);
    }
}

#[test]
fn test_print_keys_removes_scoped_directory() {
    let t = Test::new();

    assert_success(&t.print_keys("a"));

    let keygen = t.calls_to("ssh-keygen");
    let path = keygen[0]
        .split_whitespace()
        .find(|w| w.ends_with("ssh_host_ed25519_key"))
        .unwrap()
        .to_string();
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_print_keys_unknown_alias() {
    let t = Test::new();

    let output = t.print_keys("nope");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "unknown alias 'nope'");
    assert!(t.calls().is_empty());
}

#[test]
fn test_print_keys_without_secrets_path() {
    let t = Test::new();

    let output = t.print_keys("b");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "no secrets file");
    assert!(t.calls_to("sops").is_empty());
}

#[test]
fn test_decrypt_failure_declined_aborts() {
    let t = Test::new();
    t.fail_sops();

    let output = t.print_keys_answering("a", "n");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "Failed reading secret 'ssh_host_ed25519_key' for 'a-nixos'");
    assert_stderr_contains(&output, "Still continue?");
    assert!(t.calls_to("ssh-keygen").is_empty());
}

#[test]
fn test_decrypt_failure_empty_answer_aborts() {
    let t = Test::new();
    t.fail_sops();

    let output = t.print_keys_answering("a", "");
    assert_exit_1(&output);
    assert!(t.calls_to("ssh-keygen").is_empty());
}

#[test]
fn test_decrypt_failure_accepted_fails_downstream() {
    let t = Test::new();
    t.fail_sops();

    let output = t.print_keys_answering("a", "y");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "ssh-keygen failed");
    assert!(t.calls_to("ssh-to-age").is_empty());
}

#[test]
fn test_missing_sops_is_fatal() {
    let t = Test::new();
    std::fs::remove_file(t.bin().join("sops")).unwrap();

    let output = t.print_keys("a");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "sops not found");
}
