//! Tests for `fleetkeys list`.

use crate::support::*;

#[test]
fn test_list_shows_table() {
    let t = Test::new();

    let output = t.list();
    assert_success(&output);
    assert_stdout_contains(&output, "Current targets:");
    assert_stdout_contains(&output, "nixosconfig");
    assert_stdout_contains(&output, "a-nixos");
    assert_stdout_contains(&output, "10.0.0.6");
    assert_stdout_contains(&output, "2222");
}

#[test]
fn test_list_preserves_config_order() {
    let t = Test::new();

    let out = stdout(&t.list());
    let a = out.find("a-nixos").unwrap();
    let b = out.find("b-nixos").unwrap();
    assert!(a < b);
}

#[test]
fn test_list_json() {
    let t = Test::new();

    let output = t.cmd().args(["list", "--json"]).output().unwrap();
    assert_success(&output);

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["count"], 2);
    assert_eq!(json["targets"][0]["alias"], "a");
    assert_eq!(json["targets"][0]["port"], 2222);
    assert!(json["targets"][1]["secrets"].is_null());
}

#[test]
fn test_list_does_not_invoke_tools() {
    let t = Test::new();

    assert_success(&t.list());
    assert!(t.calls().is_empty());
}
