// src/process/mod.rs

//! Process execution layer.
//!
//! - [`spawner`] resolves a command line on the search path and starts it.
//! - [`handle`] owns one running child: input, captured output, exit
//!   tracking and the stop/terminate protocol.
//! - [`output`] holds the capture buffers and the drain tasks feeding them.
//! - [`search_path`] implements executable lookup.
//! - [`signal`] maps signal names to OS signals.

pub mod handle;
pub mod output;
pub mod search_path;
pub mod signal;
pub mod spawner;

pub use handle::{ProcessHandle, ProcessState, ShutdownPolicy, TIMED_OUT_EXIT_CODE};
pub use output::{OutputBuffers, Stream};
pub use search_path::SearchPath;
pub use spawner::{LaunchOptions, ResolvedCommand, Spawner};
