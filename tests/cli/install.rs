//! Tests for `fleetkeys install-host-keys`.

use crate::support::*;

/// Index of the first call containing `needle`.
fn position(calls: &[String], needle: &str) -> usize {
    calls
        .iter()
        .position(|c| c.contains(needle))
        .unwrap_or_else(|| panic!("no call containing '{}' in {:#?}", needle, calls))
}

#[test]
fn test_install_runs_full_sequence() {
    let t = Test::new();

    let output = t.install(Some("a"), "");
    assert_success(&output);
    assert_stdout_contains(&output, "installed host key for a");

    let calls = t.calls();
    let order = [
        "-- whoami",
        "sops --extract",
        "-- mkdir -p",
        "scp ",
        "-- find",
        "-- sudo mv",
        "-- sudo rm -fr",
        "-- sudo reboot now",
        "-- nix-info; uname -a",
    ];
    let positions: Vec<usize> = order.iter().map(|n| position(&calls, n)).collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "unexpected order: {:#?}",
        calls
    );
}

#[test]
fn test_install_copy_disables_host_key_checking_only_for_scp() {
    let t = Test::new();

    assert_success(&t.install(Some("a"), ""));

    let scp = t.calls_to("scp");
    assert_eq!(scp.len(), 1);
    assert!(scp[0].contains("StrictHostKeyChecking=no"));
    assert!(scp[0].contains("UserKnownHostsFile=/dev/null"));
    assert!(scp[0].contains("-P 2222 -r"));
    assert!(scp[0].contains("10.0.0.5:/tmp/fleetkeys-"));

    for call in t.calls_to("ssh") {
        assert!(!call.contains("StrictHostKeyChecking=no"), "{}", call);
    }
    let whoami = position(&t.calls(), "-- whoami");
    assert!(t.calls()[whoami].contains("StrictHostKeyChecking=accept-new"));
}

#[test]
fn test_install_moves_key_into_live_directory() {
    let t = Test::new();

    assert_success(&t.install(Some("a"), ""));

    let calls = t.calls();
    let mv = &calls[position(&calls, "-- sudo mv")];
    assert!(mv.contains("/etc/ssh/ssh_host_ed25519_key'* '/etc/ssh'/"));
}

#[test]
fn test_install_verifies_against_new_host_key() {
    let t = Test::new();

    assert_success(&t.install(Some("a"), ""));

    let calls = t.calls();
    let verify = &calls[position(&calls, "-- nix-info")];
    assert!(verify.contains("StrictHostKeyChecking=yes"));
    assert!(verify.contains("UserKnownHostsFile="));
}

#[test]
fn test_install_unreachable_host_never_decrypts() {
    let t = Test::new();
    t.fail_ssh();

    let output = t.install(Some("a"), "");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "no ssh access");
    assert!(t.calls_to("sops").is_empty());
    assert!(t.calls_to("scp").is_empty());
}

#[test]
fn test_install_decrypt_failure_declined_never_copies() {
    let t = Test::new();
    t.fail_sops();

    let output = t.install(Some("a"), "n");
    assert_exit_1(&output);
    assert_eq!(t.calls_to("sops").len(), 1);
    assert!(t.calls_to("scp").is_empty());
    assert!(!t.calls().iter().any(|c| c.contains("reboot")));
}

#[test]
fn test_install_post_reboot_unreachable_is_fatal() {
    let t = Test::new();
    let log = t.log_path();
    t.fake(
        "ssh",
        &format!(
            r#"echo "ssh $*" >> {}
for last; do :; done
case "$last" in
  nix-info*) exit 255 ;;
esac"#,
            log.display()
        ),
    );

    let output = t.install(Some("a"), "");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "could not confirm ssh access");
    assert!(t.calls().iter().filter(|c| c.contains("nix-info")).count() > 1);
}

#[test]
fn test_install_all_stops_at_first_failure() {
    let t = Test::new();

    // `a` succeeds, `b` has no secrets file
    let output = t.install(None, "");
    assert_exit_1(&output);
    assert_stdout_contains(&output, "installed host key for a");
    assert_stderr_contains(&output, "'b' has no secrets file");
    assert_eq!(t.calls_to("scp").len(), 1);
}

#[test]
fn test_install_all_processes_targets_in_order() {
    let t = Test::new();
    t.write_file("secrets/c.yaml", ENCRYPTED_FIXTURE);
    t.write_config(
        r#"
[[target]]
alias = "c"
hostname = "10.0.0.7"
port = 22
nixosconfig = "c-nixos"
secrets = "secrets/c.yaml"

[[target]]
alias = "a"
hostname = "10.0.0.5"
port = 2222
nixosconfig = "a-nixos"
secrets = "secrets/a.yaml"
"#,
    );

    let output = t.install(None, "");
    assert_success(&output);

    let scp = t.calls_to("scp");
    assert_eq!(scp.len(), 2);
    assert!(scp[0].contains("10.0.0.7:"));
    assert!(scp[1].contains("10.0.0.5:"));

    // first target fully verified before the second is contacted
    let calls = t.calls();
    let c_verify = position(&calls, "10.0.0.7 -- nix-info");
    let a_whoami = position(&calls, "10.0.0.5 -- whoami");
    assert!(c_verify < a_whoami);
}

#[test]
fn test_install_unknown_alias() {
    let t = Test::new();

    let output = t.install(Some("nope"), "");
    assert_exit_1(&output);
    assert_stderr_contains(&output, "unknown alias 'nope'");
    assert!(t.calls().is_empty());
}
