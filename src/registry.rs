// src/registry.rs

//! Ordered record of every process launched during one test run.
//!
//! Entries are appended on launch and never removed individually, so output
//! stays inspectable after a process has finished. Lookups by exact command
//! line follow "last command wins".

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::aggregate::OutputAggregator;
use crate::errors::{CleanupFailure, HarnessError, Result};
use crate::process::ProcessHandle;

/// One registered process.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub commandline: String,
    pub handle: Arc<ProcessHandle>,
}

#[derive(Debug, Clone, Copy)]
enum Sweep {
    Stop,
    Terminate,
}

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handle` under `commandline`. Duplicates are allowed.
    pub fn register(&self, commandline: impl Into<String>, handle: Arc<ProcessHandle>) {
        let commandline = commandline.into();
        debug!(command = %commandline, pid = handle.pid(), "registering process");
        self.write().push(RegistryEntry {
            commandline,
            handle,
        });
    }

    /// Most recently registered handle for exactly `commandline`.
    pub fn lookup(&self, commandline: &str) -> Result<Arc<ProcessHandle>> {
        self.read()
            .iter()
            .rev()
            .find(|entry| entry.commandline == commandline)
            .map(|entry| Arc::clone(&entry.handle))
            .ok_or_else(|| HarnessError::NotFound(commandline.to_string()))
    }

    /// The one command line containing `fragment`.
    ///
    /// Several entries with the same command line count as one candidate
    /// (the latest of them is returned); two different matching command
    /// lines are [`HarnessError::Ambiguous`].
    pub fn lookup_unique_substring(&self, fragment: &str) -> Result<Arc<ProcessHandle>> {
        let entries = self.read();

        let mut candidates: Vec<&RegistryEntry> = Vec::new();
        for entry in entries.iter().filter(|e| e.commandline.contains(fragment)) {
            match candidates
                .iter_mut()
                .find(|c| c.commandline == entry.commandline)
            {
                Some(existing) => *existing = entry,
                None => candidates.push(entry),
            }
        }

        match candidates.as_slice() {
            [] => Err(HarnessError::NotFound(fragment.to_string())),
            [only] => Ok(Arc::clone(&only.handle)),
            many => Err(HarnessError::Ambiguous {
                fragment: fragment.to_string(),
                candidates: many.iter().map(|c| c.commandline.clone()).collect(),
            }),
        }
    }

    /// The most recently registered handle: the target of "the current
    /// process" operations.
    pub fn last(&self) -> Result<Arc<ProcessHandle>> {
        self.read()
            .last()
            .map(|entry| Arc::clone(&entry.handle))
            .ok_or_else(|| HarnessError::NotFound("last command (no process was started)".to_string()))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all entries in registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.read().clone()
    }

    pub fn handles(&self) -> Vec<Arc<ProcessHandle>> {
        self.read()
            .iter()
            .map(|entry| Arc::clone(&entry.handle))
            .collect()
    }

    /// Read-only output views over this registry.
    pub fn output(&self) -> OutputAggregator<'_> {
        OutputAggregator::new(self)
    }

    /// Stop every registered process, in registration order.
    pub async fn stop_all(&self) -> Result<()> {
        self.sweep(Sweep::Stop).await
    }

    /// Terminate every process still running. Safe to call repeatedly.
    pub async fn terminate_all(&self) -> Result<()> {
        self.sweep(Sweep::Terminate).await
    }

    /// Terminate everything, then forget all entries.
    pub async fn clear(&self) -> Result<()> {
        let terminated = self.terminate_all().await;
        self.write().clear();
        terminated
    }

    /// Apply `sweep` to a snapshot of the entries. Holding the lock only for
    /// the snapshot keeps registrations out of the copy step; failures are
    /// collected and reported together.
    async fn sweep(&self, sweep: Sweep) -> Result<()> {
        let snapshot = self.entries();
        let mut failures = Vec::new();

        for entry in snapshot {
            let result = match sweep {
                Sweep::Stop => entry.handle.stop().await,
                Sweep::Terminate => entry.handle.terminate().await,
            };
            if let Err(error) = result {
                warn!(
                    command = %entry.commandline,
                    pid = entry.handle.pid(),
                    ?sweep,
                    error = %error,
                    "failed to shut down process"
                );
                failures.push(CleanupFailure {
                    command: entry.commandline,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Cleanup(failures))
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<RegistryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<RegistryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
