// tests/announcer_events.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use procharness::announcer::{AnnouncerEvent, TimeoutKind};

#[test]
fn test_events_render_like_a_shell_transcript() {
    assert_eq!(
        AnnouncerEvent::Directory(PathBuf::from("/tmp/work")).to_string(),
        "$ cd /tmp/work"
    );
    assert_eq!(
        AnnouncerEvent::Command("echo hi".to_string()).to_string(),
        "$ echo hi"
    );
    assert_eq!(
        AnnouncerEvent::Timeout {
            kind: TimeoutKind::Exit,
            duration: Duration::from_secs(15),
        }
        .to_string(),
        "# exit timeout: 15s"
    );
    assert_eq!(
        AnnouncerEvent::StopSignal {
            command: "sleep 10".to_string(),
            pid: 42,
            signal: "SIGTERM".to_string(),
        }
        .to_string(),
        "# sending SIGTERM to 42 (sleep 10)"
    );
}

#[test]
fn test_environment_lists_variables_sorted() {
    let mut env = BTreeMap::new();
    env.insert("LANG".to_string(), "C".to_string());
    env.insert("HOME".to_string(), "/tmp".to_string());

    assert_eq!(
        AnnouncerEvent::Environment(env).to_string(),
        "<<-ENVIRONMENT\nHOME=/tmp\nLANG=C\nENVIRONMENT"
    );
}
