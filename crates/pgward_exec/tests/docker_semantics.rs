//! Docker-layer behavior over a scripted executor: command construction,
//! exact-name matching, and the probe operations' absence handling.

use pgward_exec::{CommandOutput, DockerOps, ExecError, Executor, Invocation, MockExecutor};

fn output(stdout: &str, exit_code: i32) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code,
    }
}

#[tokio::test]
async fn docker_exec_adds_interactive_flag_for_stdin() {
    let mock = MockExecutor::new();
    mock.docker_exec("postgres", "psql -U postgres app", None, Some("select 1;"), true)
        .await
        .expect("scripted success");

    let recorded = mock.invocations();
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        recorded[0].command,
        "docker exec -i postgres psql -U postgres app"
    );
    assert_eq!(recorded[0].stdin.as_deref(), Some("select 1;"));
}

#[tokio::test]
async fn docker_exec_omits_interactive_flag_without_stdin() {
    let mock = MockExecutor::new();
    mock.docker_exec("postgres", "pg_isready", None, None, true)
        .await
        .expect("scripted success");
    assert_eq!(mock.invocations()[0].command, "docker exec postgres pg_isready");
}

#[tokio::test]
async fn docker_exec_places_user_before_container() {
    let mock = MockExecutor::new();
    mock.docker_exec("db-backup", "wal-g backup-list", Some("postgres"), None, true)
        .await
        .expect("scripted success");
    assert_eq!(
        mock.invocations()[0].command,
        "docker exec -u postgres db-backup wal-g backup-list"
    );
}

#[tokio::test]
async fn docker_exec_passes_check_through() {
    let mock = MockExecutor::new();
    mock.push_failure(2, "no such container");
    let result = mock
        .docker_exec("ghost", "true", None, None, false)
        .await
        .expect("check=false returns data");
    assert_eq!(result.exit_code, 2);

    mock.push_failure(2, "no such container");
    let err = mock
        .docker_exec("ghost", "true", None, None, true)
        .await
        .unwrap_err();
    match err {
        ExecError::CommandFailed { exit_code, .. } => assert_eq!(exit_code, 2),
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn container_running_requires_exact_name_line() {
    let mock = MockExecutor::new();
    mock.push_result(output("web2", 0));
    assert!(!mock.check_container_running("web").await.expect("probe"));

    mock.push_result(output("web2\nweb", 0));
    assert!(mock.check_container_running("web").await.expect("probe"));
}

#[tokio::test]
async fn container_running_false_when_probe_fails() {
    let mock = MockExecutor::new();
    mock.push_result(output("web", 1));
    assert!(!mock.check_container_running("web").await.expect("probe"));
}

#[tokio::test]
async fn probes_run_quiet_and_unchecked() {
    let mock = MockExecutor::new();
    mock.push_result(output("", 1));
    mock.check_container_running("web").await.expect("probe");
    mock.push_result(output("", 1));
    mock.get_container_status("web").await.expect("probe");

    for invocation in mock.invocations() {
        assert!(!invocation.show_command, "probes must not echo");
        assert!(!invocation.check, "probes must not escalate");
    }
}

#[tokio::test]
async fn container_status_present() {
    let mock = MockExecutor::new();
    mock.push_result(output("Up 2 hours", 0));
    assert_eq!(
        mock.get_container_status("postgres").await.expect("probe"),
        Some("Up 2 hours".to_string())
    );
}

#[tokio::test]
async fn container_status_absent_on_empty_or_failed_probe() {
    let mock = MockExecutor::new();
    mock.push_result(output("", 0));
    assert_eq!(mock.get_container_status("ghost").await.expect("probe"), None);

    mock.push_result(output("Exited (0) 5 minutes ago", 1));
    assert_eq!(mock.get_container_status("ghost").await.expect("probe"), None);
}

#[tokio::test]
async fn probe_query_filters_by_anchored_name() {
    let mock = MockExecutor::new();
    mock.check_container_running("web").await.expect("probe");
    let command = &mock.invocations()[0].command;
    assert!(command.contains("name=^web$"), "unanchored filter: {command}");
    assert!(command.contains("status=running"));

    let mock = MockExecutor::new();
    mock.get_container_status("web").await.expect("probe");
    let command = &mock.invocations()[0].command;
    assert!(command.starts_with("docker ps -a "), "must include stopped containers: {command}");
    assert!(command.contains("name=^web$"));
}

#[tokio::test]
async fn check_false_never_raises_for_any_exit_code() {
    let mock = MockExecutor::new();
    for code in [-1, 1, 2, 126, 127, 255] {
        mock.push_result(output("", code));
        let result = mock
            .execute(Invocation::new("probe").check(false))
            .await
            .expect("check=false returns data");
        assert_eq!(result.exit_code, code);
    }
}
