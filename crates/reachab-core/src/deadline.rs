use std::time::{Duration, Instant};

use reachab_types::{ReachabError, Result};

/// Wall-clock cancellation checked between iteration-set layers (C5) and
/// between bit-mask iterations (C6). `deadline_ms = 0` means no deadline;
/// [`Deadline::check`] is then a no-op.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    deadline_ms: u64,
    expires_at: Option<Instant>,
}

impl Deadline {
    pub fn new(deadline_ms: u64) -> Self {
        let expires_at = (deadline_ms > 0).then(|| Instant::now() + Duration::from_millis(deadline_ms));
        Deadline {
            deadline_ms,
            expires_at,
        }
    }

    pub fn none() -> Self {
        Deadline {
            deadline_ms: 0,
            expires_at: None,
        }
    }

    pub fn check(&self) -> Result<()> {
        match self.expires_at {
            Some(at) if Instant::now() >= at => Err(ReachabError::Timeout {
                deadline_ms: self.deadline_ms,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_trips() {
        let d = Deadline::new(0);
        assert!(d.check().is_ok());
    }

    #[test]
    fn expired_deadline_trips() {
        let d = Deadline::new(1);
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(d.check(), Err(ReachabError::Timeout { .. })));
    }
}
