/// Signal vocabulary for the escalation run.
///
/// The primary signal is whatever number the caller asked for; whether the
/// OS accepts it is only discovered at delivery time. The kill signal is
/// fixed and cannot be intercepted by the target.
use nix::sys::signal::Signal;
use std::fmt;

/// Default primary signal (SIGTERM).
pub const DEFAULT_PRIMARY_SIGNAL: i32 = 15;

/// A signal number as given by the caller, not necessarily one the
/// platform defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalNumber(i32);

/// Signal sent when the grace deadline elapses.
pub const KILL_SIGNAL: SignalNumber = SignalNumber(Signal::SIGKILL as i32);

impl SignalNumber {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    /// The named signal, if the platform defines this number. 0 (the null
    /// signal, which only checks existence) has no name.
    pub fn known(self) -> Option<Signal> {
        if self.0 == 0 {
            return None;
        }
        Signal::try_from(self.0).ok()
    }
}

impl From<Signal> for SignalNumber {
    fn from(signal: Signal) -> Self {
        Self(signal as i32)
    }
}

impl fmt::Display for SignalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known() {
            Some(signal) => write!(f, "{}", signal),
            None => write!(f, "signal {}", self.0),
        }
    }
}

/// Escalation tier a signal delivery belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// The caller-configured termination request.
    Primary,
    /// The unconditional SIGKILL.
    Kill,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Primary => write!(f, "primary"),
            Tier::Kill => write!(f, "kill"),
        }
    }
}
