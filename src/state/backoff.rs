/// Delivery backoff after rate-limit feedback
///
/// The state lives only in memory; a restart forgets it, which at worst costs
/// one extra rate-limited send.
use std::fmt;

/// Whether the delivery loop may try to send right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffState {
    /// Sends are allowed
    #[default]
    Ready,

    /// No sends before `until` (unix seconds)
    Suppressed { until: i64 },
}

impl BackoffState {
    /// Returns the deadline if sends are still suppressed at `now`
    ///
    /// Once `now` reaches the deadline the state falls back to `Ready`.
    pub fn suppressed_until(&mut self, now: i64) -> Option<i64> {
        match *self {
            Self::Suppressed { until } if now < until => Some(until),
            Self::Suppressed { .. } => {
                *self = Self::Ready;
                None
            }
            Self::Ready => None,
        }
    }

    /// Enters suppression until `until`
    pub fn suppress(&mut self, until: i64) {
        *self = Self::Suppressed { until };
    }

    pub fn clear(&mut self) {
        *self = Self::Ready;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for BackoffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Suppressed { until } => write!(f, "suppressed until {}", until),
        }
    }
}
