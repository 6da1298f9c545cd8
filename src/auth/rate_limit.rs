//! Per-session generation cooldown

use crate::auth::session::SessionContext;
use crate::error::{BoardnotesError, Result};
use chrono::{DateTime, Duration, Utc};

/// Minimum spacing between generation attempts from one session
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    period: Duration,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Cooldown of `ms` milliseconds, saturating at `i64::MAX`
    pub fn from_millis(ms: u64) -> Self {
        let ms = i64::try_from(ms).unwrap_or(i64::MAX);
        Self::new(Duration::milliseconds(ms))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Admit an attempt at `now` and record it in the context
    ///
    /// A rejected attempt leaves the recorded time unchanged, so the wait is
    /// measured from the last admitted attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use boardnotes::auth::{Cooldown, SessionContext};
    /// use chrono::{Duration, Utc};
    ///
    /// let cooldown = Cooldown::from_millis(1000);
    /// let mut ctx = SessionContext::default();
    /// let start = Utc::now();
    ///
    /// assert!(cooldown.check_and_record(&mut ctx, start).is_ok());
    /// assert!(cooldown.check_and_record(&mut ctx, start + Duration::milliseconds(500)).is_err());
    /// assert!(cooldown.check_and_record(&mut ctx, start + Duration::milliseconds(1000)).is_ok());
    /// ```
    pub fn check_and_record(&self, ctx: &mut SessionContext, now: DateTime<Utc>) -> Result<()> {
        if let Some(last) = ctx.last_generation {
            let elapsed = now - last;
            if elapsed < self.period {
                let remaining = (self.period - elapsed).num_milliseconds().max(1) as u64;
                tracing::debug!(remaining_ms = remaining, "Generation rate limited");
                return Err(BoardnotesError::RateLimited {
                    retry_after_ms: remaining,
                }
                .into());
            }
        }

        ctx.last_generation = Some(now);
        Ok(())
    }
}
