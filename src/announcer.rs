// src/announcer.rs

//! Diagnostic event sink.
//!
//! The run session reports what it is about to do (directory, command,
//! environment, timeouts, stop signals) to an [`Announcer`]. Presentation is
//! entirely up to the implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::config::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Exit,
    IoWait,
    Startup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncerEvent {
    Directory(PathBuf),
    Command(String),
    /// Variables overlaid on the inherited environment.
    Environment(BTreeMap<String, String>),
    Timeout {
        kind: TimeoutKind,
        duration: Duration,
    },
    StopSignal {
        command: String,
        pid: u32,
        signal: String,
    },
}

impl fmt::Display for AnnouncerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnouncerEvent::Directory(dir) => write!(f, "$ cd {}", dir.display()),
            AnnouncerEvent::Command(cmd) => write!(f, "$ {cmd}"),
            AnnouncerEvent::Environment(env) => {
                write!(f, "<<-ENVIRONMENT")?;
                for (name, value) in env {
                    write!(f, "\n{name}={value}")?;
                }
                write!(f, "\nENVIRONMENT")
            }
            AnnouncerEvent::Timeout { kind, duration } => {
                let label = match kind {
                    TimeoutKind::Exit => "exit timeout",
                    TimeoutKind::IoWait => "io wait timeout",
                    TimeoutKind::Startup => "startup wait time",
                };
                write!(f, "# {label}: {}", format_duration(*duration))
            }
            AnnouncerEvent::StopSignal {
                command,
                pid,
                signal,
            } => write!(f, "# sending {signal} to {pid} ({command})"),
        }
    }
}

pub trait Announcer: Send + Sync {
    fn announce(&self, event: &AnnouncerEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnnouncer;

impl Announcer for NullAnnouncer {
    fn announce(&self, _event: &AnnouncerEvent) {}
}

/// Emits every event as an `info` log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnnouncer;

impl Announcer for TracingAnnouncer {
    fn announce(&self, event: &AnnouncerEvent) {
        info!(target: "procharness::announce", "{event}");
    }
}
