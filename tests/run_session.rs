// tests/run_session.rs
#![cfg(unix)]

mod common;
use crate::common::{TestResult, init_tracing, write_script};

use std::sync::Arc;
use std::time::Duration;

use procharness::announcer::{AnnouncerEvent, NullAnnouncer, TimeoutKind};
use procharness::errors::HarnessError;
use procharness::process::{ProcessState, SearchPath, Spawner};
use procharness::session::RunSession;
use procharness_test_utils::{RecordingAnnouncer, eventually};
use procharness_test_utils::builders::ConfigFileBuilder;
use tempfile::tempdir;

#[tokio::test]
async fn launch_is_announced_before_the_command() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let recorder = RecordingAnnouncer::new();
    let session = RunSession::new(
        ConfigFileBuilder::new()
            .working_directory(dir.path())
            .env("LANG", "C")
            .build(),
    )
    .with_announcer(Arc::new(recorder.clone()));

    session.run("echo hi").await?;

    let events = recorder.events();
    assert_eq!(events.first(), Some(&AnnouncerEvent::Directory(dir.path().to_path_buf())));
    assert_eq!(events.last(), Some(&AnnouncerEvent::Command("echo hi".to_string())));
    assert!(events.iter().any(|e| matches!(e, AnnouncerEvent::Environment(env) if env["LANG"] == "C")));
    assert!(events.contains(&AnnouncerEvent::Timeout {
        kind: TimeoutKind::Exit,
        duration: Duration::from_secs(5),
    }));
    assert_eq!(recorder.commands(), vec!["echo hi"]);
    Ok(())
}

#[tokio::test]
async fn per_command_timeout_is_announced_and_applied() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let recorder = RecordingAnnouncer::new();
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build())
        .with_announcer(Arc::new(recorder.clone()));

    let handle = session
        .run_to_completion("sleep 10", Some(Duration::from_millis(300)), false)
        .await?;

    assert!(handle.timed_out());
    assert!(recorder.events().contains(&AnnouncerEvent::Timeout {
        kind: TimeoutKind::Exit,
        duration: Duration::from_millis(300),
    }));
    Ok(())
}

#[tokio::test]
async fn fail_on_nonzero_turns_outcomes_into_errors() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build());

    match session.run_to_completion("sh -c 'exit 4'", None, true).await {
        Err(HarnessError::NonZeroExit { command, exit_code }) => {
            assert_eq!(command, "sh -c 'exit 4'");
            assert_eq!(exit_code, 4);
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }

    match session
        .run_to_completion("sleep 10", Some(Duration::from_millis(200)), true)
        .await
    {
        Err(HarnessError::TimeoutExceeded { command, timeout }) => {
            assert_eq!(command, "sleep 10");
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected TimeoutExceeded, got {other:?}"),
    }

    // Failed commands are still registered and inspectable.
    assert_eq!(session.registry().len(), 2);
    assert!(session.lookup("sleep 10")?.timed_out());
    Ok(())
}

#[tokio::test]
async fn without_fail_on_nonzero_the_handle_is_returned() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build())
        .with_announcer(Arc::new(NullAnnouncer));

    let handle = session
        .run_to_completion("sh -c 'echo partial; exit 2'", None, false)
        .await?;

    assert_eq!(handle.state(), ProcessState::Stopped { exit_code: 2 });
    assert_eq!(session.all_stdout(), "partial\n");
    Ok(())
}

#[tokio::test]
async fn typing_defaults_to_the_last_process() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build());

    let first = session.run("cat").await?;
    let second = session.run("cat -u").await?;

    session.type_into(None, "to the second").await?;
    session.type_into(Some(first.as_ref()), "to the first").await?;
    session.type_into(None, "").await?;
    session.close_input(Some(first.as_ref())).await?;

    assert_eq!(second.run_to_completion(None).await?, 0);
    assert_eq!(first.run_to_completion(None).await?, 0);
    assert_eq!(second.stdout(), "to the second\n");
    assert_eq!(first.stdout(), "to the first\n");
    assert_eq!(session.all_stdout(), "to the first\nto the second\n");
    Ok(())
}

#[tokio::test]
async fn typing_without_any_process_is_not_found() -> TestResult {
    let dir = tempdir()?;
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build());

    let result = session.type_into(None, "hello").await;
    assert!(matches!(result, Err(HarnessError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn configured_search_path_finds_project_scripts() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let bin = tempdir()?;
    write_script(bin.path(), "greet", "echo \"hello $1\"");

    let session = RunSession::new(
        ConfigFileBuilder::new()
            .working_directory(dir.path())
            .search_path_dir(bin.path())
            .build(),
    );

    let handle = session.run_to_completion("greet world", None, true).await?;
    assert_eq!(handle.stdout(), "hello world\n");

    // Only the configured directories are searched.
    let missing = session.run("echo not-on-the-search-path").await;
    assert!(matches!(missing, Err(HarnessError::Launch { .. })));
    Ok(())
}

#[tokio::test]
async fn configured_stop_signal_is_used_and_announced() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_script(
        dir.path(),
        "on-int",
        "trap 'echo interrupted; exit 0' INT\necho ready\nwhile true; do sleep 0.05; done",
    );
    let recorder = RecordingAnnouncer::new();
    let session = RunSession::new(
        ConfigFileBuilder::new()
            .working_directory(dir.path())
            .stop_signal("INT")
            .build(),
    )
    .with_announcer(Arc::new(recorder.clone()));

    let handle = session.run("./on-int").await?;
    assert!(eventually(Duration::from_secs(5), || handle.stdout().contains("ready")).await);

    session.terminate_all().await?;

    assert_eq!(handle.state(), ProcessState::Terminated);
    assert!(handle.stdout().contains("interrupted"));
    assert!(recorder.events().iter().any(|e| matches!(
        e,
        AnnouncerEvent::StopSignal { signal, pid, .. } if signal == "SIGINT" && *pid == handle.pid()
    )));
    Ok(())
}

#[tokio::test]
async fn finish_stops_then_terminates_everything() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build());

    let reader = session.run("cat").await?;
    let sleeper = session.run("sleep 10").await?;
    let done = session.run_to_completion("echo done", None, true).await?;

    session.finish().await?;

    assert_eq!(reader.state(), ProcessState::Stopped { exit_code: 0 });
    assert_eq!(sleeper.state(), ProcessState::Terminated);
    assert_eq!(done.state(), ProcessState::Stopped { exit_code: 0 });

    // Teardown is repeatable.
    session.finish().await?;
    Ok(())
}

#[tokio::test]
async fn launch_failure_registers_nothing() -> TestResult {
    let dir = tempdir()?;
    let recorder = RecordingAnnouncer::new();
    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build())
        .with_announcer(Arc::new(recorder.clone()));

    let result = session.run("procharness-no-such-binary").await;

    assert!(matches!(result, Err(HarnessError::Launch { .. })));
    assert!(session.registry().is_empty());
    assert_eq!(recorder.commands(), vec!["procharness-no-such-binary"]);
    Ok(())
}

#[tokio::test]
async fn custom_spawner_replaces_the_configured_one() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let bin = tempdir()?;
    write_script(bin.path(), "tool.sh", "echo from-tool");

    let session = RunSession::new(ConfigFileBuilder::new().working_directory(dir.path()).build())
        .with_spawner(Spawner::with_search_path(SearchPath::new(
            vec![bin.path().to_path_buf()],
            vec![".sh".to_string()],
        )));

    assert!(session.config().search_path.is_empty());
    let search_path = session.spawner().search_path_for(&session.launch_options());
    assert_eq!(search_path.extensions(), &[".sh".to_string()]);

    let handle = session.run_to_completion("tool", None, true).await?;
    assert_eq!(handle.stdout(), "from-tool\n");
    Ok(())
}
