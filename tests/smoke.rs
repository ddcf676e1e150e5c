use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("insider-pulse").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn scan_help_lists_window_flags() {
    let mut cmd = Command::cargo_bin("insider-pulse").expect("binary exists");
    let output = cmd.args(["scan", "--help"]).assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("--baseline-days"));
    assert!(text.contains("--current-days"));
}

#[test]
fn unknown_subcommand_fails() {
    let mut cmd = Command::cargo_bin("insider-pulse").expect("binary exists");
    cmd.arg("frobnicate").assert().failure();
}
