//! Slippage guard
//!
//! Rejects trades whose slippage tolerance falls outside `[min_bps, max_bps]`.

use std::fmt;

/// Which bound a slippage request violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippageViolation {
    TooHigh { requested_bps: u32, max_bps: u32 },
    TooLow { requested_bps: u32, min_bps: u32 },
}

impl fmt::Display for SlippageViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlippageViolation::TooHigh {
                requested_bps,
                max_bps,
            } => write!(
                f,
                "slippage too high: {} bps exceeds maximum {} bps",
                requested_bps, max_bps
            ),
            SlippageViolation::TooLow {
                requested_bps,
                min_bps,
            } => write!(
                f,
                "slippage unrealistically low: {} bps is below minimum {} bps",
                requested_bps, min_bps
            ),
        }
    }
}

/// Static slippage bounds check
#[derive(Debug, Clone, Copy)]
pub struct SlippageGuard {
    min_bps: u32,
    max_bps: u32,
}

impl SlippageGuard {
    /// Create a new slippage guard
    ///
    /// # Arguments
    /// * `min_bps` - Smallest tolerance accepted (1 = 0.01%)
    /// * `max_bps` - Largest tolerance accepted (300 = 3%)
    pub fn new(min_bps: u32, max_bps: u32) -> Self {
        Self { min_bps, max_bps }
    }

    pub fn min_bps(&self) -> u32 {
        self.min_bps
    }

    pub fn max_bps(&self) -> u32 {
        self.max_bps
    }

    pub fn check(&self, requested_bps: u32) -> Result<(), SlippageViolation> {
        if requested_bps > self.max_bps {
            return Err(SlippageViolation::TooHigh {
                requested_bps,
                max_bps: self.max_bps,
            });
        }
        if requested_bps < self.min_bps {
            return Err(SlippageViolation::TooLow {
                requested_bps,
                min_bps: self.min_bps,
            });
        }

        tracing::debug!(
            requested_bps,
            max_bps = self.max_bps,
            "Slippage check passed"
        );
        Ok(())
    }
}
