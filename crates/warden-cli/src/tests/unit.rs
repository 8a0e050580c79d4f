//! End-to-end runs of the CLI runtime against an in-memory fleet.

use std::fs;
use std::process::ExitCode;

use rstest::rstest;
use warden_config::{LATEST_STATE_FILE, LOCK_FILE};

use super::support::{Fleet, Workspace, workspace};

fn fleet() -> Fleet {
    Fleet::with_processes(&[("api", "online"), ("worker", "stopped"), ("cron", "online")])
}

#[rstest]
fn restart_restores_stopped_processes(workspace: Workspace) {
    let fleet = fleet();
    let run = workspace.run(&fleet, &["restart", "staging"]);

    assert_eq!(run.exit, ExitCode::SUCCESS, "stderr: {}", run.stderr);
    assert!(run.stdout.contains("Platform: Staging Environment [staging]"));
    assert!(run.stdout.contains("Expected: 2 online, 1 stopped (3 total)"));
    assert!(run.stdout.contains("Result: converged"));
    assert_eq!(fleet.status_of("worker").as_deref(), Some("stopped"));
    assert_eq!(fleet.status_of("api").as_deref(), Some("online"));
    assert!(fleet.calls().contains(&String::from("kill_daemon")));
    assert!(!workspace.home().join(LOCK_FILE).exists());
}

#[rstest]
fn restart_that_diverges_still_exits_zero(workspace: Workspace) {
    let fleet = fleet();
    fleet.refuse_stop("worker");

    let run = workspace.run(&fleet, &["restart", "staging"]);

    assert_eq!(run.exit, ExitCode::SUCCESS, "stderr: {}", run.stderr);
    assert!(run.stdout.contains("warning: could not stop worker"));
    assert!(run.stdout.contains("Left online: worker"));
    assert!(run.stdout.contains("Result: diverged"));
    assert_eq!(fleet.status_of("worker").as_deref(), Some("online"));
}

#[rstest]
fn failed_resurrection_exits_nonzero_and_names_state_file(workspace: Workspace) {
    let fleet = fleet();
    fleet.fail_resurrection();

    let run = workspace.run(&fleet, &["restart", "staging"]);

    assert_eq!(run.exit, ExitCode::FAILURE);
    let saved = run
        .stdout
        .lines()
        .find_map(|line| line.split_once("; saved to ").map(|(_, path)| path))
        .expect("snapshot path announced");
    assert!(saved.contains("warden-restart-"));
    assert!(run.stderr.contains(&format!("state saved to {saved}")));
    assert!(run.stderr.contains("hint: run `pm2 resurrect` manually"));
    assert!(run.stderr.contains("troubleshooting:"));
    assert!(!run.stdout.contains("Result:"));
    assert!(!workspace.home().join(LOCK_FILE).exists());
}

#[rstest]
fn restart_without_platform_auto_detects(workspace: Workspace) {
    let run = workspace.run(&fleet(), &["restart"]);

    assert_eq!(run.exit, ExitCode::SUCCESS, "stderr: {}", run.stderr);
    assert!(run.stdout.contains("Auto-detected platform staging"));
}

#[rstest]
fn restart_refuses_while_another_run_holds_the_lock(workspace: Workspace) {
    let home = workspace.home();
    fs::create_dir_all(&home).expect("create home");
    fs::write(home.join(LOCK_FILE), std::process::id().to_string()).expect("write lock");
    let fleet = fleet();

    let run = workspace.run(&fleet, &["restart", "staging"]);

    assert_eq!(run.exit, ExitCode::FAILURE);
    assert!(run.stderr.contains("another warden run"));
    assert!(fleet.calls().is_empty());
}

#[rstest]
fn unreachable_daemon_prints_hint_and_troubleshooting(workspace: Workspace) {
    let fleet = fleet();
    fleet.make_unavailable();

    let run = workspace.run(&fleet, &["restart", "staging"]);

    assert_eq!(run.exit, ExitCode::FAILURE);
    assert!(run.stderr.contains("error: PM2 is unavailable; nothing was changed"));
    assert!(run.stderr.contains("hint: check that PM2 is installed"));
    assert!(run.stderr.contains("troubleshooting:"));
}

#[rstest]
fn save_writes_state_file_pointer_and_dump(workspace: Workspace) {
    let fleet = fleet();
    let run = workspace.run(&fleet, &["save", "staging", "--name", "custom_state_manual.json"]);

    assert_eq!(run.exit, ExitCode::SUCCESS, "stderr: {}", run.stderr);
    assert!(run.stdout.contains("Saved 3 processes: 2 online, 1 stopped"));
    let home = workspace.home();
    assert!(home.join("custom_state_manual.json").is_file());
    assert!(home.join(LATEST_STATE_FILE).exists());
    assert_eq!(fleet.calls().last().map(String::as_str), Some("disconnect"));
    assert!(fleet.calls().contains(&String::from("dump")));
}

#[rstest]
fn states_lists_saved_files_newest_first(workspace: Workspace) {
    let fleet = fleet();
    let saved = workspace.run(&fleet, &["save", "staging"]);
    assert_eq!(saved.exit, ExitCode::SUCCESS, "stderr: {}", saved.stderr);

    let run = workspace.run(&fleet, &["states", "staging"]);

    assert_eq!(run.exit, ExitCode::SUCCESS);
    let listing: Vec<&str> = run
        .stdout
        .lines()
        .filter(|line| line.contains("custom_state_"))
        .collect();
    assert_eq!(listing.len(), 1);
    assert!(listing.first().is_some_and(|line| line.starts_with('*')));
}

#[rstest]
fn states_on_an_empty_home_reports_nothing_saved(workspace: Workspace) {
    let run = workspace.run(&fleet(), &["states", "staging"]);

    assert_eq!(run.exit, ExitCode::SUCCESS);
    assert!(run.stdout.contains("No saved state files"));
}

#[rstest]
fn restore_puts_back_the_latest_saved_state(workspace: Workspace) {
    let fleet = fleet();
    let saved = workspace.run(&fleet, &["save", "staging"]);
    assert_eq!(saved.exit, ExitCode::SUCCESS, "stderr: {}", saved.stderr);
    fleet.set_status("worker", "online");

    let run = workspace.run(&fleet, &["restore", "staging"]);

    assert_eq!(run.exit, ExitCode::SUCCESS, "stderr: {}", run.stderr);
    assert!(run.stdout.contains("Restoring 3 processes (2 online, 1 stopped)"));
    assert!(run.stdout.contains("Result: converged"));
    assert_eq!(fleet.status_of("worker").as_deref(), Some("stopped"));
    assert!(!fleet.calls().contains(&String::from("kill_daemon")));
}

#[rstest]
fn restore_without_a_saved_state_fails(workspace: Workspace) {
    let run = workspace.run(&fleet(), &["restore", "staging"]);

    assert_eq!(run.exit, ExitCode::FAILURE);
    assert!(run.stderr.contains("no saved state file at"));
    assert!(run.stderr.contains("hint: run `warden save` first"));
}

#[rstest]
fn show_prints_the_process_table(workspace: Workspace) {
    let run = workspace.run(&fleet(), &["show", "staging"]);

    assert_eq!(run.exit, ExitCode::SUCCESS, "stderr: {}", run.stderr);
    assert!(run.stdout.contains("worker"));
    assert!(run.stdout.contains("online: 2  stopped: 1  errored: 0  total: 3"));
}

#[rstest]
fn unknown_platform_without_home_override_fails(mut workspace: Workspace) {
    workspace.config.pm2_home = None;

    let run = workspace.run(&fleet(), &["show", "atlantis"]);

    assert_eq!(run.exit, ExitCode::FAILURE);
    assert!(run.stderr.contains("unknown platform: atlantis"));
    assert!(run.stderr.contains("Supported platforms: staging"));
}

#[rstest]
fn help_is_printed_to_stdout(workspace: Workspace) {
    let run = workspace.run(&fleet(), &["--help"]);

    assert_eq!(run.exit, ExitCode::SUCCESS);
    assert!(run.stdout.contains("restart"));
    assert!(run.stderr.is_empty());
}

#[rstest]
fn missing_subcommand_is_a_usage_error(workspace: Workspace) {
    let run = workspace.run(&fleet(), &[]);

    assert_eq!(run.exit, ExitCode::FAILURE);
    assert!(run.stderr.contains("Usage"));
}
