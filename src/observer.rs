/// Process observation: liveness probing and signal delivery.
///
/// A pid is an external, recyclable resource. Nothing here caches what it
/// learned about a pid; every call asks the OS again.
use crate::signals::SignalNumber;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// A signal could not be delivered to the target.
#[derive(Debug, thiserror::Error)]
#[error("failed to send {signal} to process {pid}: {source}")]
pub struct DeliveryError {
    pub pid: Pid,
    pub signal: SignalNumber,
    #[source]
    pub source: Errno,
}

/// Answers "is there still something to wait for?" and delivers signals.
pub trait ProcessObserver {
    /// True iff a process with this pid is live and signalable by us.
    ///
    /// Any lookup failure (never allocated, already reaped, no permission)
    /// reads as "does not exist".
    fn exists(&self, pid: Pid) -> bool;

    /// Attempt to deliver `signal` to `pid`. Numbers the OS rejects fail
    /// here, not earlier.
    fn signal(&self, pid: Pid, signal: SignalNumber) -> Result<(), DeliveryError>;
}

impl<T: ProcessObserver + ?Sized> ProcessObserver for &T {
    fn exists(&self, pid: Pid) -> bool {
        (**self).exists(pid)
    }

    fn signal(&self, pid: Pid, signal: SignalNumber) -> Result<(), DeliveryError> {
        (**self).signal(pid, signal)
    }
}

/// Observer backed by `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemObserver;

impl ProcessObserver for SystemObserver {
    fn exists(&self, pid: Pid) -> bool {
        // Null signal: permission and existence checks only, nothing delivered.
        match kill(pid, None) {
            Ok(()) => true,
            Err(errno) => {
                tracing::trace!(pid = pid.as_raw(), error = %errno, "liveness check failed");
                false
            }
        }
    }

    fn signal(&self, pid: Pid, signal: SignalNumber) -> Result<(), DeliveryError> {
        let delivered = match signal.known() {
            Some(named) => kill(pid, named),
            None => {
                // Unnamed numbers (0, real-time, invalid) go to kill(2) as-is
                // so the kernel decides; EINVAL for anything it rejects.
                // SAFETY: kill(2) takes plain integers and touches no memory.
                let rc = unsafe { nix::libc::kill(pid.as_raw(), signal.raw()) };
                Errno::result(rc).map(drop)
            }
        };
        delivered.map_err(|source| DeliveryError {
            pid,
            signal,
            source,
        })
    }
}
