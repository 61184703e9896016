use std::time::{Duration, Instant};

/// Gate that opens at most once per `interval` of wall-clock time.
///
/// Elapsed time is measured against the gate's own last opening, so a slow
/// frame never makes a block run twice and a fast frame never makes it early.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fire: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Returns `true` and records `now` if the interval has elapsed.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match self.last_fire {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if due {
            self.last_fire = Some(now);
        }
        due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn reset(&mut self) {
        self.last_fire = None;
    }

    /// Treat `now` as the last opening, so the next one is a full interval away.
    pub fn restart(&mut self, now: Instant) {
        self.last_fire = Some(now);
    }
}

/// On-demand periodic timer. Idle until started; the owner cancels it once
/// whatever it drives has finished.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Arm the timer; the first tick is one period after `now`. Restarting an
    /// armed ticker reschedules it.
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    /// Returns `true` when a tick is due and schedules the following one.
    /// Missed ticks collapse into one.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                self.next = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}
