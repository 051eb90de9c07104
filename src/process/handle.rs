// src/process/handle.rs

//! Live handle on one spawned child process.
//!
//! Every handle owns three background tasks for its whole lifetime:
//! - a supervisor that owns the `Child`, reaps it, publishes the exit on a
//!   `watch` channel and executes signal/kill requests,
//! - one drain per output stream (see [`super::output`]).
//!
//! Callers never touch the `Child` directly, so waiting, signalling and
//! writing can happen concurrently from different tasks.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{HarnessError, Result};
use crate::process::output::{OutputBuffers, Stream, spawn_drain};
use crate::process::signal;

/// Exit code returned by run-to-completion when the deadline passed.
///
/// Processes ended by a signal report `128 + signal number` instead, the way
/// shells do, so the two cases never share a value on unix.
pub const TIMED_OUT_EXIT_CODE: i32 = -1;

/// Lifecycle of a handle.
///
/// `Running -> Stopped` on a natural exit, `Running -> TimedOut` when a
/// run-to-completion deadline passes, and `-> Terminated` once the process
/// had to be signalled to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped { exit_code: i32 },
    TimedOut,
    Terminated,
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }
}

/// Timing and signal used by the stop/terminate protocol of one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Default deadline for [`ProcessHandle::run_to_completion`].
    pub exit_timeout: Duration,
    /// How long to let output drains catch up after an exit.
    pub io_wait_timeout: Duration,
    /// Stop phase: wait for a natural exit after input is closed.
    pub stop_grace: Duration,
    /// Terminate phase: wait after each signal.
    pub terminate_grace: Duration,
    /// Cooperative signal sent first when terminating (canonical name).
    pub stop_signal: String,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            exit_timeout: Duration::from_secs(15),
            io_wait_timeout: Duration::from_millis(100),
            stop_grace: Duration::from_secs(1),
            terminate_grace: Duration::from_secs(3),
            stop_signal: "SIGTERM".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    Code(i32),
    WaitFailed(String),
}

#[derive(Debug)]
enum Control {
    Signal(String),
    Kill,
}

#[derive(Debug)]
struct ControlRequest {
    action: Control,
    reply: oneshot::Sender<io::Result<()>>,
}

pub struct ProcessHandle {
    commandline: String,
    pid: u32,
    working_dir: PathBuf,
    policy: ShutdownPolicy,
    state: Arc<Mutex<ProcessState>>,
    timed_out: AtomicBool,
    output: Arc<OutputBuffers>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    /// Flipped once by `close_input`; aborts any write stuck on a full pipe.
    closing_tx: watch::Sender<bool>,
    exit_rx: watch::Receiver<Option<Exit>>,
    control_tx: mpsc::UnboundedSender<ControlRequest>,
    drains: Mutex<Vec<JoinHandle<()>>>,
}

impl ProcessHandle {
    /// Take ownership of a freshly spawned child and start draining it.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start(
        commandline: String,
        mut child: Child,
        working_dir: PathBuf,
        policy: ShutdownPolicy,
    ) -> Result<Self> {
        let pid = child.id().ok_or_else(|| HarnessError::Wait {
            command: commandline.clone(),
            message: "process was reaped before its id could be read".to_string(),
        })?;

        let output = Arc::new(OutputBuffers::new());
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(
                stdout,
                Stream::Stdout,
                Arc::clone(&output),
                commandline.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(
                stderr,
                Stream::Stderr,
                Arc::clone(&output),
                commandline.clone(),
            ));
        }
        let stdin = child.stdin.take();

        let state = Arc::new(Mutex::new(ProcessState::Running));
        let (exit_tx, exit_rx) = watch::channel(None);
        let (closing_tx, _) = watch::channel(false);
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        tokio::spawn(supervise(
            child,
            pid,
            commandline.clone(),
            control_rx,
            exit_tx,
            Arc::clone(&state),
        ));

        Ok(Self {
            commandline,
            pid,
            working_dir,
            policy,
            state,
            timed_out: AtomicBool::new(false),
            output,
            stdin: tokio::sync::Mutex::new(stdin),
            closing_tx,
            exit_rx,
            control_tx,
            drains: Mutex::new(drains),
        })
    }

    /// The literal command line this process was launched with.
    pub fn commandline(&self) -> &str {
        &self.commandline
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn policy(&self) -> &ShutdownPolicy {
        &self.policy
    }

    pub fn state(&self) -> ProcessState {
        *lock(&self.state)
    }

    /// Whether a run-to-completion deadline expired for this process.
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    /// Whether the OS process has been reaped.
    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Exit code once reaped; `128 + signal` for processes ended by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match &*self.exit_rx.borrow() {
            Some(Exit::Code(code)) => Some(*code),
            _ => None,
        }
    }

    pub fn is_input_open(&self) -> bool {
        if self.has_exited() || *self.closing_tx.borrow() {
            return false;
        }
        // Locked means a write is in flight, which implies open.
        self.stdin
            .try_lock()
            .map(|stdin| stdin.is_some())
            .unwrap_or(true)
    }

    pub fn stdout_bytes(&self) -> Vec<u8> {
        self.output.stdout()
    }

    pub fn stderr_bytes(&self) -> Vec<u8> {
        self.output.stderr()
    }

    pub fn combined_bytes(&self) -> Vec<u8> {
        self.output.combined()
    }

    /// Stdout captured so far, lossily decoded.
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout()).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr()).into_owned()
    }

    /// Both streams in arrival order (best-effort across the two pipes).
    pub fn combined(&self) -> String {
        String::from_utf8_lossy(&self.output.combined()).into_owned()
    }

    /// Write raw bytes to the process's stdin.
    ///
    /// Fails with [`HarnessError::InputClosed`] once input was closed or the
    /// process has exited. A write blocked on a process that does not read
    /// is abandoned as soon as input is closed.
    pub async fn write(&self, input: &[u8]) -> Result<()> {
        if self.has_exited() {
            return Err(self.input_closed());
        }

        let mut closing = self.closing_tx.subscribe();
        let mut stdin = self.stdin.lock().await;
        if *closing.borrow_and_update() {
            return Err(self.input_closed());
        }
        let pipe = stdin.as_mut().ok_or_else(|| self.input_closed())?;

        let written = tokio::select! {
            written = async {
                pipe.write_all(input).await?;
                pipe.flush().await
            } => written,
            _ = closing.wait_for(|closed| *closed) => {
                debug!(command = %self.commandline, "input closed during a pending write");
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
        };

        match written {
            Ok(()) => {
                debug!(command = %self.commandline, bytes = input.len(), "wrote input");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                *stdin = None;
                Err(self.input_closed())
            }
            Err(e) => Err(HarnessError::IoError(e)),
        }
    }

    /// Write `line` followed by a newline.
    pub async fn write_line(&self, line: &str) -> Result<()> {
        let mut input = Vec::with_capacity(line.len() + 1);
        input.extend_from_slice(line.as_bytes());
        input.push(b'\n');
        self.write(&input).await
    }

    /// Close stdin, signalling end-of-input. Closing twice is a no-op.
    ///
    /// Never waits behind a pending write: that write is cancelled first.
    pub async fn close_input(&self) {
        self.closing_tx.send_replace(true);
        let Some(mut pipe) = self.stdin.lock().await.take() else {
            return;
        };
        if let Err(e) = pipe.shutdown().await {
            debug!(command = %self.commandline, error = %e, "error while closing input");
        }
        debug!(command = %self.commandline, "input closed");
    }

    /// Wait for the process to finish within `timeout` (or the policy's
    /// `exit_timeout`).
    ///
    /// Input is closed first. If the deadline passes the handle is marked
    /// timed out and stopped (then terminated if needed), and
    /// [`TIMED_OUT_EXIT_CODE`] is returned; check [`Self::timed_out`].
    pub async fn run_to_completion(&self, timeout: Option<Duration>) -> Result<i32> {
        let timeout = timeout.unwrap_or(self.policy.exit_timeout);
        self.close_input().await;

        match self.wait_for_exit(timeout).await? {
            Some(code) => {
                self.settle_output().await;
                Ok(code)
            }
            None => {
                warn!(
                    command = %self.commandline,
                    pid = self.pid,
                    ?timeout,
                    "process did not finish in time; stopping it"
                );
                self.timed_out.store(true, Ordering::SeqCst);
                self.transition_from_running(ProcessState::TimedOut);
                self.stop().await?;
                Ok(TIMED_OUT_EXIT_CODE)
            }
        }
    }

    /// Stop phase: close input and give the process `stop_grace` to exit on
    /// its own, then fall through to [`Self::terminate`].
    pub async fn stop(&self) -> Result<()> {
        self.close_input().await;
        if self.has_exited() {
            self.settle_output().await;
            return Ok(());
        }

        debug!(command = %self.commandline, pid = self.pid, "waiting for process to stop");
        if self.wait_for_exit(self.policy.stop_grace).await?.is_some() {
            self.settle_output().await;
            return Ok(());
        }

        self.terminate().await
    }

    /// Terminate phase: cooperative signal, then a forceful kill if the
    /// process outlives `terminate_grace`. No-op once the process has exited.
    pub async fn terminate(&self) -> Result<()> {
        if self.has_exited() {
            return Ok(());
        }
        self.close_input().await;

        // Reported after the kill, so a bad stop signal never leaks a process.
        let mut signal_error = None;
        if signal::supports_cooperative_signals() {
            info!(
                command = %self.commandline,
                pid = self.pid,
                signal = %self.policy.stop_signal,
                "terminating process"
            );
            match self
                .control(Control::Signal(self.policy.stop_signal.clone()))
                .await
            {
                Ok(()) => {
                    if self
                        .wait_for_exit(self.policy.terminate_grace)
                        .await?
                        .is_some()
                    {
                        self.mark_terminated().await;
                        return Ok(());
                    }
                    warn!(
                        command = %self.commandline,
                        pid = self.pid,
                        "process outlived its stop signal; killing it"
                    );
                }
                Err(e) => {
                    warn!(
                        command = %self.commandline,
                        pid = self.pid,
                        error = %e,
                        "stop signal not delivered; killing process"
                    );
                    signal_error = Some(e);
                }
            }
        }

        self.control(Control::Kill).await?;
        if self
            .wait_for_exit(self.policy.terminate_grace)
            .await?
            .is_none()
        {
            return Err(HarnessError::Signal {
                command: self.commandline.clone(),
                message: format!(
                    "still running {:?} after being killed",
                    self.policy.terminate_grace
                ),
            });
        }

        self.mark_terminated().await;
        signal_error.map_or(Ok(()), Err)
    }

    /// Deliver a named signal (`"INT"`, `"SIGUSR1"`, ...) to a running process.
    pub async fn send_signal(&self, name: &str) -> Result<()> {
        let canonical = signal::canonical_signal_name(name).ok_or_else(|| HarnessError::Signal {
            command: self.commandline.clone(),
            message: format!("unknown signal '{name}'"),
        })?;
        if self.has_exited() {
            return Err(HarnessError::Signal {
                command: self.commandline.clone(),
                message: format!("cannot send {canonical}: process has exited"),
            });
        }
        debug!(command = %self.commandline, pid = self.pid, signal = %canonical, "sending signal");
        self.control(Control::Signal(canonical)).await
    }

    /// Wait up to `timeout` for the exit; `Ok(None)` if it has not happened.
    pub async fn wait_for_exit(&self, timeout: Duration) -> Result<Option<i32>> {
        let mut exit_rx = self.exit_rx.clone();
        let waited = tokio::time::timeout(timeout, async move {
            exit_rx
                .wait_for(Option::is_some)
                .await
                .map(|exit| (*exit).clone())
        })
        .await;

        match waited {
            Err(_elapsed) => Ok(None),
            Ok(Ok(Some(Exit::Code(code)))) => Ok(Some(code)),
            Ok(Ok(Some(Exit::WaitFailed(message)))) => Err(HarnessError::Wait {
                command: self.commandline.clone(),
                message,
            }),
            Ok(Ok(None)) => Ok(None),
            Ok(Err(_closed)) => Err(HarnessError::Wait {
                command: self.commandline.clone(),
                message: "supervisor ended without reporting an exit".to_string(),
            }),
        }
    }

    async fn control(&self, action: Control) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ControlRequest {
            action,
            reply: reply_tx,
        };
        if self.control_tx.send(request).is_err() {
            // Supervisor is gone: the process has already been reaped.
            return Ok(());
        }

        match reply_rx.await {
            Ok(Ok(())) | Err(_) => Ok(()),
            Ok(Err(e)) => Err(HarnessError::Signal {
                command: self.commandline.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Give the drain tasks up to `io_wait_timeout` to reach end-of-stream.
    async fn settle_output(&self) {
        let drains = std::mem::take(&mut *lock(&self.drains));
        if drains.is_empty() {
            return;
        }

        let settled = tokio::time::timeout(self.policy.io_wait_timeout, async move {
            for drain in drains {
                let _ = drain.await;
            }
        })
        .await;

        if settled.is_err() {
            debug!(
                command = %self.commandline,
                "output streams still open after io wait timeout; keeping partial output"
            );
        }
    }

    async fn mark_terminated(&self) {
        *lock(&self.state) = ProcessState::Terminated;
        info!(command = %self.commandline, pid = self.pid, "process terminated");
        self.settle_output().await;
    }

    fn transition_from_running(&self, next: ProcessState) {
        let mut state = lock(&self.state);
        if state.is_running() {
            *state = next;
        }
    }

    fn input_closed(&self) -> HarnessError {
        HarnessError::InputClosed {
            command: self.commandline.clone(),
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("commandline", &self.commandline)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .field("timed_out", &self.timed_out())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Own the child until it is reaped, serving control requests meanwhile.
/// If every handle is dropped while the child runs, it is killed.
async fn supervise(
    mut child: Child,
    pid: u32,
    command: String,
    mut control_rx: mpsc::UnboundedReceiver<ControlRequest>,
    exit_tx: watch::Sender<Option<Exit>>,
    state: Arc<Mutex<ProcessState>>,
) {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            request = control_rx.recv() => match request {
                Some(request) => {
                    let result = apply_control(&mut child, pid, &request.action);
                    let _ = request.reply.send(result);
                }
                None => {
                    debug!(command = %command, pid, "handle dropped while running; killing process");
                    if let Err(e) = apply_control(&mut child, pid, &Control::Kill) {
                        warn!(command = %command, pid, error = %e, "failed to kill orphaned process");
                    }
                    break child.wait().await;
                }
            }
        }
    };

    let exit = match status {
        Ok(status) => {
            let code = exit_code_of(&status);
            info!(command = %command, pid, exit_code = code, success = status.success(), "process exited");
            Exit::Code(code)
        }
        Err(e) => {
            warn!(command = %command, pid, error = %e, "waiting for process failed");
            Exit::WaitFailed(e.to_string())
        }
    };

    if let Exit::Code(exit_code) = exit {
        let mut state = lock(&state);
        if state.is_running() {
            *state = ProcessState::Stopped { exit_code };
        }
    }
    exit_tx.send_replace(Some(exit));
}

fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return 128 + signo;
        }
    }
    TIMED_OUT_EXIT_CODE
}

fn apply_control(child: &mut Child, pid: u32, action: &Control) -> io::Result<()> {
    if let Ok(Some(_)) = child.try_wait() {
        return Ok(());
    }

    match action {
        Control::Signal(name) => signal::deliver(pid, name),
        Control::Kill if signal::supports_cooperative_signals() => {
            signal::deliver(pid, "SIGKILL")
        }
        Control::Kill => child.start_kill(),
    }
}
