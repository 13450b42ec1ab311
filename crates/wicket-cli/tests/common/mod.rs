use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI binary against an isolated state directory.
pub fn run_cli(args: &[&str], state_dir: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wicket"));
    cmd.args(args);
    cmd.arg("--state-dir").arg(state_dir);
    cmd.env_remove("WICKET_API_URL");
    cmd.env_remove("WICKET_PASSWORD");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], state_dir: &Path) -> String {
    let output = run_cli(args, state_dir);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub fn run_cli_failure(args: &[&str], state_dir: &Path) -> String {
    let output = run_cli(args, state_dir);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
