// crates/control-check-core/src/runtime/clock.rs
// ============================================================================
// Module: Clocks
// Description: Wall-clock and logical clock implementations.
// Purpose: Supply timestamps to the pipeline through the Clock interface.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`SystemClock`] is used by hosts; [`LogicalClock`] ticks deterministically
//! and keeps test histories stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Clock reading unix epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::UnixMillis(i64::try_from(now.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Clock returning strictly increasing logical ticks.
#[derive(Debug, Default)]
pub struct LogicalClock {
    /// Last issued tick.
    tick: AtomicU64,
}

impl LogicalClock {
    /// Creates a clock starting at tick 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp::Logical(self.tick.fetch_add(1, Ordering::SeqCst).saturating_add(1))
    }
}
