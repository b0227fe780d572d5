// Regression tests for the one-shot CLI commands
use std::fs;
use std::process::Command;

fn write_config(tmp: &tempfile::TempDir) -> std::path::PathBuf {
    let db_dir = tmp.path().join("data");
    fs::create_dir_all(&db_dir).unwrap();
    let base = fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
    let cfg = base.replace(
        "path = \"xcmwallet_data\"",
        &format!("path = \"{}\"", db_dir.to_string_lossy().replace('\\', "\\\\")),
    );
    let cfg_path = tmp.path().join("config.toml");
    fs::write(&cfg_path, cfg).unwrap();
    cfg_path
}

fn run(cfg_path: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_xcmwallet"))
        .arg("--config")
        .arg(cfg_path)
        .args(args)
        .output()
        .expect("run xcmwallet")
}

#[test]
fn simulate_then_list_history() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let cfg_path = write_config(&tmp);

    let out = run(&cfg_path, &[
        "simulate", "--origin", "karura", "--dest", "dolphin", "--asset", "KAR",
        "--amount", "2", "--balance", "10", "--fee-balance", "10",
    ]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "simulate failed: {}{}", stdout, String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("sent, extrinsic 0x"), "unexpected output: {stdout}");

    let out = run(&cfg_path, &["history", "list"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success());
    assert!(stdout.contains("2 KAR"), "history should show the bridge transfer: {stdout}");
    assert!(stdout.contains("Success"));
}

#[test]
fn simulate_rejects_unknown_chain() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let cfg_path = write_config(&tmp);

    let out = run(&cfg_path, &[
        "simulate", "--origin", "atlantis", "--dest", "dolphin", "--asset", "KAR",
        "--amount", "1", "--balance", "10", "--fee-balance", "10",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("atlantis"));
}

#[test]
fn check_only_does_not_touch_history() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let cfg_path = write_config(&tmp);

    let out = run(&cfg_path, &[
        "simulate", "--origin", "dolphin", "--dest", "rococo", "--asset", "ROC",
        "--amount", "20", "--balance", "10", "--fee-balance", "1", "--check-only",
    ]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success());
    assert!(stdout.contains("valid to send:         false"), "{stdout}");

    let out = run(&cfg_path, &["history", "list"]);
    assert!(String::from_utf8_lossy(&out.stdout).contains("You have no activity yet."));
}

#[test]
fn native_asset_balance_flags_must_agree() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let cfg_path = write_config(&tmp);

    let out = run(&cfg_path, &[
        "simulate", "--origin", "karura", "--dest", "dolphin", "--asset", "KAR",
        "--amount", "2", "--balance", "10", "--fee-balance", "3",
    ]);
    assert!(!out.status.success(), "conflicting balances for a native asset must be rejected");
    assert!(String::from_utf8_lossy(&out.stderr).contains("--fee-balance"));

    // for the native asset --balance alone is enough
    let out = run(&cfg_path, &[
        "simulate", "--origin", "karura", "--dest", "dolphin", "--asset", "KAR",
        "--amount", "2", "--balance", "10", "--check-only",
    ]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "{stdout}{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("valid to send:         true"), "{stdout}");

    let out = run(&cfg_path, &[
        "simulate", "--origin", "dolphin", "--dest", "karura", "--asset", "KAR",
        "--amount", "2", "--balance", "10", "--check-only",
    ]);
    assert!(!out.status.success(), "non-native assets need an explicit fee balance");
}
