// src/aggregate.rs

//! Read-only output views, per process and across a whole run.
//!
//! Run-wide views concatenate per-process captures in registration order,
//! not in real time. Nothing is inserted between processes, so newline
//! boundaries are whatever the processes printed. Views never block: they
//! copy whatever the drains have captured at call time.

use crate::process::ProcessHandle;
use crate::registry::ProcessRegistry;

/// Which capture a view reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputView {
    Stdout,
    Stderr,
    /// Stdout and stderr interleaved in arrival order (best-effort).
    Combined,
}

impl OutputView {
    pub fn bytes_of(self, handle: &ProcessHandle) -> Vec<u8> {
        match self {
            OutputView::Stdout => handle.stdout_bytes(),
            OutputView::Stderr => handle.stderr_bytes(),
            OutputView::Combined => handle.combined_bytes(),
        }
    }
}

pub fn stdout_of(handle: &ProcessHandle) -> String {
    handle.stdout()
}

pub fn stderr_of(handle: &ProcessHandle) -> String {
    handle.stderr()
}

pub fn combined_of(handle: &ProcessHandle) -> String {
    handle.combined()
}

/// Run-wide views over a [`ProcessRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct OutputAggregator<'a> {
    registry: &'a ProcessRegistry,
}

impl<'a> OutputAggregator<'a> {
    pub fn new(registry: &'a ProcessRegistry) -> Self {
        Self { registry }
    }

    /// Raw bytes of `view` for every registered process, concatenated.
    pub fn collect_bytes(&self, view: OutputView) -> Vec<u8> {
        self.registry
            .handles()
            .iter()
            .flat_map(|handle| view.bytes_of(handle))
            .collect()
    }

    pub fn collect(&self, view: OutputView) -> String {
        String::from_utf8_lossy(&self.collect_bytes(view)).into_owned()
    }

    pub fn all_stdout(&self) -> String {
        self.collect(OutputView::Stdout)
    }

    pub fn all_stderr(&self) -> String {
        self.collect(OutputView::Stderr)
    }

    pub fn all_output(&self) -> String {
        self.collect(OutputView::Combined)
    }
}
