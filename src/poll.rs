/// Bounded polling: sleep, check, repeat until a predicate holds or a
/// deadline measured from an anchor instant passes.
use std::time::Duration;
use tokio::time::Instant;

/// How a bounded poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate held `elapsed` after the anchor.
    Satisfied { elapsed: Duration },
    /// The deadline passed with the predicate still false.
    DeadlineReached { elapsed: Duration },
}

/// Poll `done` every `interval` until it returns true or `deadline` has
/// elapsed since `anchor`.
///
/// Each round sleeps first, then evaluates the predicate, then compares the
/// elapsed time against the deadline. A satisfied predicate wins over a
/// deadline reached in the same round.
pub async fn poll_until<F>(
    anchor: Instant,
    interval: Duration,
    deadline: Duration,
    mut done: F,
) -> PollOutcome
where
    F: FnMut(Duration) -> bool,
{
    loop {
        tokio::time::sleep(interval).await;
        let elapsed = anchor.elapsed();
        if done(elapsed) {
            return PollOutcome::Satisfied { elapsed };
        }
        if elapsed >= deadline {
            return PollOutcome::DeadlineReached { elapsed };
        }
    }
}
