//! CLI paths that never reach the database.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn dca() -> Command {
    let mut cmd = Command::cargo_bin("dca").unwrap();
    cmd.env_remove("DCA_DATABASE_URL").env("RUST_LOG", "off");
    cmd
}

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn help_lists_command_families() {
    dca()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config-hash"))
        .stdout(predicate::str::contains("order"))
        .stdout(predicate::str::contains("reconcile"));
}

#[test]
fn config_hash_prints_hash_and_canonical_json() {
    let base = yaml_file("engine:\n  txn_max_attempts: 5\n");
    let over = yaml_file("engine:\n  txn_max_attempts: 7\n");
    dca()
        .arg("config-hash")
        .arg(base.path())
        .arg(over.path())
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"config_hash=[0-9a-f]{64}\n").unwrap())
        .stdout(predicate::str::contains(r#"{"engine":{"txn_max_attempts":7}}"#));
}

#[test]
fn config_hash_refuses_secret_literals() {
    let leaky = yaml_file("exchange:\n  api_secret: sk_live_0123456789\n");
    dca()
        .arg("config-hash")
        .arg(leaky.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("0123456789").not());
}

#[test]
fn alloc_set_rejects_bad_amount_before_connecting() {
    dca()
        .args([
            "alloc",
            "set",
            "--account",
            "acct-1",
            "--asset",
            "BTC-USD",
            "--daily-target",
            "1.2345678",
            "--frequency",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --daily-target"));
}

#[test]
fn order_place_needs_asset_or_all() {
    dca()
        .args(["order", "place", "--account", "acct-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--asset"));
}

#[test]
fn db_status_without_url_names_the_variable() {
    dca()
        .args(["db", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DCA_DATABASE_URL"));
}
