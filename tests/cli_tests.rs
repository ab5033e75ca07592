//! CLI integration tests.

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn amm_quoter() -> Command {
    let mut cmd = cargo_bin_cmd!("amm-quoter");
    for key in [
        "NEAR_NETWORK_ID",
        "NEAR_NODE_URL",
        "NEAR_SIGNER_URL",
        "NEAR_GAS_LIMIT",
        "AGENT_ACCOUNT_ID",
        "USER_ACCOUNT_ID",
        "PORT",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_help() {
    amm_quoter()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("amm-quoter"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("serve-quotes"))
        .stdout(predicate::str::contains("quote"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version() {
    amm_quoter()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amm-quoter"));
}

#[test]
fn test_offline_quote() {
    amm_quoter()
        .args([
            "quote",
            "--amount-in",
            "10000",
            "--reserve-in",
            "1000000",
            "--reserve-out",
            "2000000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Amount out"))
        .stdout(predicate::str::contains("19802"));
}

#[test]
fn test_offline_quote_json() {
    amm_quoter()
        .args([
            "quote",
            "--amount-in",
            "10000",
            "--reserve-in",
            "1000000",
            "--reserve-out",
            "2000000",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"ok\""))
        .stdout(predicate::str::contains("\"amountOut\": \"19802\""));
}

#[test]
fn test_quote_against_empty_pool_fails() {
    amm_quoter()
        .args([
            "quote",
            "--amount-in",
            "10000",
            "--reserve-in",
            "0",
            "--reserve-out",
            "2000000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("illegal amount"));
}

#[test]
fn test_quote_requires_both_reserves() {
    amm_quoter()
        .args(["quote", "--amount-in", "10000", "--reserve-in", "1000000"])
        .assert()
        .failure();
}

#[test]
fn test_check_config_valid() {
    let file = config_file(
        r#"
dry_run = true

[network]
network_id = "testnet"
rpc_url = "https://rpc.testnet.near.org"
"#,
    );
    amm_quoter()
        .args(["check", "config", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"))
        .stdout(predicate::str::contains("testnet"));
}

#[test]
fn test_check_config_invalid() {
    let file = config_file(
        r#"
[network]
network_id = "moonnet"
"#,
    );
    amm_quoter()
        .args(["check", "config", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("network_id"));
}

#[test]
fn test_check_config_missing_file() {
    amm_quoter()
        .args(["check", "config", "--config", "/nonexistent/config.toml"])
        .assert()
        .failure();
}

#[test]
fn test_run_without_agent_account_fails() {
    let file = config_file(
        r#"
[network]
rpc_url = "http://127.0.0.1:9"
timeout_ms = 500
connect_timeout_ms = 500

[health]
enabled = false
"#,
    );
    amm_quoter()
        .args(["run", "--config"])
        .arg(file.path())
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure();
}
