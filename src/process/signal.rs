// src/process/signal.rs

//! Signal names and delivery.
//!
//! On unix every child leads its own process group, so signals go to the
//! whole group (a `sh -c` wrapper and whatever it started). Elsewhere only a
//! forceful kill is available; see [`supports_cooperative_signals`].

use std::io;

/// Normalise a signal name (`"term"`, `"TERM"`, `"SIGTERM"`) to its
/// canonical `SIG*` spelling, or `None` if the platform does not know it.
pub fn canonical_signal_name(name: &str) -> Option<String> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    let canonical = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };

    #[cfg(unix)]
    {
        use std::str::FromStr;
        nix::sys::signal::Signal::from_str(&canonical)
            .ok()
            .map(|_| canonical)
    }

    #[cfg(not(unix))]
    {
        matches!(canonical.as_str(), "SIGTERM" | "SIGKILL" | "SIGINT").then_some(canonical)
    }
}

/// Whether named signals other than a forceful kill can be delivered.
pub const fn supports_cooperative_signals() -> bool {
    cfg!(unix)
}

/// Deliver `name` to the process group led by `pid`,
/// falling back to the single process. A target that is already gone is not
/// an error.
#[cfg(unix)]
pub(crate) fn deliver(pid: u32, name: &str) -> io::Result<()> {
    use std::str::FromStr;

    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::Pid;

    let signal = canonical_signal_name(name)
        .and_then(|canonical| Signal::from_str(&canonical).ok())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unknown signal {name}"))
        })?;
    let target = Pid::from_raw(pid as i32);

    match killpg(target, signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => match kill(target, signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        },
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(not(unix))]
pub(crate) fn deliver(_pid: u32, name: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot deliver {name} on this platform"),
    ))
}
