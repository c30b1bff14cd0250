use std::thread;
use std::time::{Duration, Instant};

/// Fixed-interval retry bounded by an absolute deadline measured from the
/// first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    /// `should_stop` returned true at a suspension point.
    Stopped { attempts: u32 },
    Expired { attempts: u32, waited: Duration },
}

/// Runs `attempt` until it yields a value, the deadline passes, or
/// `should_stop` asks to abandon the wait. Each attempt is handed the time
/// left before the deadline and must not block past it. Attempt errors end
/// the loop immediately. `should_stop` is only consulted between attempts,
/// never while an attempt is in flight.
pub fn poll_until<T, E, A, S>(
    policy: PollPolicy,
    mut should_stop: S,
    mut attempt: A,
) -> Result<PollOutcome<T>, E>
where
    A: FnMut(Duration) -> Result<Option<T>, E>,
    S: FnMut() -> bool,
{
    let started = Instant::now();
    let mut attempts = 0_u32;
    loop {
        let remaining = policy.deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Ok(PollOutcome::Expired {
                attempts,
                waited: started.elapsed(),
            });
        }
        attempts = attempts.saturating_add(1);
        if let Some(value) = attempt(remaining)? {
            return Ok(PollOutcome::Ready(value));
        }

        let waited = started.elapsed();
        if waited >= policy.deadline {
            return Ok(PollOutcome::Expired { attempts, waited });
        }
        let pause = policy.interval.min(policy.deadline - waited);
        thread::sleep(pause);

        if should_stop() {
            return Ok(PollOutcome::Stopped { attempts });
        }
    }
}
