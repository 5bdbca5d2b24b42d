use std::time::Duration;

/// Sleep before the next round: `max(0, target - elapsed)`.
pub fn pacing_delay(target: Duration, elapsed: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
