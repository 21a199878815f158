//! Request pacing between candidate submissions.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::config::{ThrottleConfig, ThrottleMode};

/// Spacing applied ahead of each submission.
///
/// Trackers ban sessions that hammer detail pages, so the default is a
/// fixed pause per request. The token bucket variant allows short
/// bursts while holding a sustained rate.
pub enum Throttle {
    Off,
    FixedDelay(Duration),
    TokenBucket(Mutex<TokenBucket>),
}

impl Throttle {
    pub fn from_config(config: &ThrottleConfig) -> Self {
        match config.mode {
            ThrottleMode::Off => Throttle::Off,
            ThrottleMode::FixedDelay => {
                Throttle::FixedDelay(Duration::from_millis(config.delay_ms))
            }
            ThrottleMode::TokenBucket => {
                Throttle::TokenBucket(Mutex::new(TokenBucket::new(config.requests_per_minute)))
            }
        }
    }

    /// Wait until the next request may go out.
    pub async fn acquire(&self) {
        match self {
            Throttle::Off => {}
            Throttle::FixedDelay(delay) => sleep(*delay).await,
            Throttle::TokenBucket(bucket) => loop {
                let attempt = bucket.lock().await.try_acquire();
                match attempt {
                    Ok(()) => break,
                    Err(wait) => sleep(wait).await,
                }
            },
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Throttle::Off => write!(f, "Throttle::Off"),
            Throttle::FixedDelay(delay) => write!(f, "Throttle::FixedDelay({delay:?})"),
            Throttle::TokenBucket(_) => write!(f, "Throttle::TokenBucket"),
        }
    }
}

/// Token bucket limiter.
///
/// Tokens are added at a constant rate and consumed per request. The
/// bucket starts full, allowing immediate requests up to the capacity.
pub struct TokenBucket {
    /// Max tokens (= requests per minute).
    capacity: f32,
    /// Current available tokens.
    tokens: f32,
    /// Tokens added per second.
    refill_rate: f32,
    /// Last refill time.
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = requests_per_minute.max(1) as f32;
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Try to take a token.
    ///
    /// Returns `Err(wait)` with the time until one becomes available
    /// when the bucket is empty.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let tokens_needed = 1.0 - self.tokens;
            let wait_secs = tokens_needed / self.refill_rate;
            Err(Duration::from_secs_f32(wait_secs))
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f32();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}
