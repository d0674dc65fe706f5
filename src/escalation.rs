/// Escalation controller: send the primary signal, wait out the grace
/// deadline, escalate to SIGKILL, then confirm the exit.
///
/// Every OS-level ambiguity (a delivery that fails because the process
/// vanished around signal time) is resolved here by re-checking liveness,
/// so a run always ends in an [`EscalationOutcome`] rather than an error.
use crate::observer::ProcessObserver;
use crate::poll::{poll_until, PollOutcome};
use crate::signals::{SignalNumber, Tier, KILL_SIGNAL};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument, Level, Span};

/// Interval between liveness checks in both waiting phases.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the process gets to disappear after SIGKILL.
pub const KILL_CONFIRMATION_WINDOW: Duration = Duration::from_millis(1000);

/// Why a run ended with the process still present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUp {
    /// The signal of this tier could not be delivered and the process is
    /// still there.
    SignalRefused(Tier),
    /// SIGKILL was delivered but the process outlived the confirmation window.
    KillWindowElapsed,
}

/// Terminal result of one escalation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// No such process when the run started.
    AlreadyGone,
    /// Exited within the grace deadline (or vanished as the primary signal
    /// was being sent).
    StoppedGracefully,
    /// Exited after SIGKILL, within the confirmation window.
    StoppedAfterKill,
    /// Still present when the run gave up.
    StillAlive { cause: GiveUp },
}

impl EscalationOutcome {
    /// True when the process is confirmed absent.
    pub fn is_success(&self) -> bool {
        !matches!(self, EscalationOutcome::StillAlive { .. })
    }

    /// Process exit code reported for this outcome.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// States of a run. `started` is the primary signal's send time; the kill
/// window runs on its own clock from `killed_at`.
#[derive(Debug)]
enum Phase {
    Init,
    SendPrimary,
    GraceWaiting { started: Instant },
    SendKill { started: Instant },
    KillWaiting { started: Instant, killed_at: Instant },
    Done(EscalationOutcome),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::SendPrimary => "send_primary",
            Phase::GraceWaiting { .. } => "grace_waiting",
            Phase::SendKill { .. } => "send_kill",
            Phase::KillWaiting { .. } => "kill_waiting",
            Phase::Done(_) => "done",
        }
    }
}

/// Result of a single delivery attempt after disambiguation.
enum Delivery {
    Sent(Instant),
    /// Delivery failed and the process is gone.
    Vanished,
    /// Delivery failed and the process is still there.
    Refused,
}

/// Drives one target process to a terminal outcome.
pub struct Escalator<O> {
    observer: O,
    pid: Pid,
    primary: SignalNumber,
    grace: Duration,
    span: Span,
}

impl<O: ProcessObserver> Escalator<O> {
    /// Create a controller for `pid`. All events of the run are recorded
    /// inside a `smart_kill` span carrying the pid.
    pub fn new(observer: O, pid: Pid, primary: SignalNumber, grace: Duration) -> Self {
        // ERROR level so the pid context survives every `--log-level`.
        let span = tracing::span!(Level::ERROR, "smart_kill", pid = pid.as_raw());
        Self {
            observer,
            pid,
            primary,
            grace,
            span,
        }
    }

    /// Run the escalation to completion.
    ///
    /// Sends at most one signal per tier. There is no cancellation: once
    /// started the run always reaches a terminal outcome.
    pub async fn run(&self) -> EscalationOutcome {
        let span = self.span.clone();
        async {
            let mut phase = Phase::Init;
            loop {
                if let Phase::Done(outcome) = phase {
                    debug!(?outcome, "escalation finished");
                    return outcome;
                }
                let from = phase.name();
                phase = self.step(phase).await;
                debug!(from, to = phase.name(), "phase transition");
            }
        }
        .instrument(span)
        .await
    }

    async fn step(&self, phase: Phase) -> Phase {
        match phase {
            Phase::Init => {
                if self.observer.exists(self.pid) {
                    Phase::SendPrimary
                } else {
                    warn!("can't find process");
                    Phase::Done(EscalationOutcome::AlreadyGone)
                }
            }
            Phase::SendPrimary => match self.deliver(Tier::Primary, self.primary, None) {
                Delivery::Sent(started) => Phase::GraceWaiting { started },
                Delivery::Vanished => Phase::Done(EscalationOutcome::StoppedGracefully),
                Delivery::Refused => Phase::Done(EscalationOutcome::StillAlive {
                    cause: GiveUp::SignalRefused(Tier::Primary),
                }),
            },
            Phase::GraceWaiting { started } => {
                match poll_until(started, POLL_INTERVAL, self.grace, |elapsed| {
                    self.is_gone(elapsed)
                })
                .await
                {
                    PollOutcome::Satisfied { elapsed } => {
                        info!(elapsed_ms = as_millis(elapsed), "process stopped");
                        Phase::Done(EscalationOutcome::StoppedGracefully)
                    }
                    PollOutcome::DeadlineReached { elapsed } => {
                        info!(
                            elapsed_ms = as_millis(elapsed),
                            wait_ms = as_millis(self.grace),
                            "grace deadline reached, escalating"
                        );
                        Phase::SendKill { started }
                    }
                }
            }
            Phase::SendKill { started } => {
                match self.deliver(Tier::Kill, KILL_SIGNAL, Some(started)) {
                    Delivery::Sent(killed_at) => Phase::KillWaiting { started, killed_at },
                    Delivery::Vanished => Phase::Done(EscalationOutcome::StoppedAfterKill),
                    Delivery::Refused => Phase::Done(EscalationOutcome::StillAlive {
                        cause: GiveUp::SignalRefused(Tier::Kill),
                    }),
                }
            }
            Phase::KillWaiting { started, killed_at } => {
                match poll_until(killed_at, POLL_INTERVAL, KILL_CONFIRMATION_WINDOW, |_| {
                    self.is_gone(started.elapsed())
                })
                .await
                {
                    PollOutcome::Satisfied { .. } => {
                        info!(
                            elapsed_ms = as_millis(started.elapsed()),
                            "process stopped"
                        );
                        Phase::Done(EscalationOutcome::StoppedAfterKill)
                    }
                    PollOutcome::DeadlineReached { elapsed } => {
                        warn!(
                            elapsed_ms = as_millis(started.elapsed()),
                            since_kill_ms = as_millis(elapsed),
                            "{} sent but process still here, giving up", KILL_SIGNAL
                        );
                        Phase::Done(EscalationOutcome::StillAlive {
                            cause: GiveUp::KillWindowElapsed,
                        })
                    }
                }
            }
            done @ Phase::Done(_) => done,
        }
    }

    /// Send one signal and, on failure, re-check liveness to tell a vanished
    /// process apart from a refused delivery.
    ///
    /// `started` is the primary signal's send time; `None` while sending it.
    fn deliver(&self, tier: Tier, signal: SignalNumber, started: Option<Instant>) -> Delivery {
        let elapsed_ms = started.map_or(0, |at| as_millis(at.elapsed()));
        match self.observer.signal(self.pid, signal) {
            Ok(()) => {
                info!(%signal, %tier, elapsed_ms, "signal sent");
                Delivery::Sent(Instant::now())
            }
            Err(err) => {
                if self.observer.exists(self.pid) {
                    warn!(%tier, elapsed_ms, error = %err, "can't send signal");
                    Delivery::Refused
                } else {
                    warn!(
                        %signal,
                        %tier,
                        elapsed_ms,
                        "the process stopped without receiving the signal"
                    );
                    Delivery::Vanished
                }
            }
        }
    }

    fn is_gone(&self, elapsed: Duration) -> bool {
        if self.observer.exists(self.pid) {
            debug!(elapsed_ms = as_millis(elapsed), "process still here");
            false
        } else {
            true
        }
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
