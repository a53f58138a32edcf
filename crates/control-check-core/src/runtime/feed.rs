// crates/control-check-core/src/runtime/feed.rs
// ============================================================================
// Module: Live Audit Feed
// Description: Push-based fan-out of audit events to per-job subscribers.
// Purpose: Let progress consumers follow a job without polling the store.
// Dependencies: crate::core, crate::interfaces, tokio
// ============================================================================

//! ## Overview
//! [`AuditFeed`] is an [`AuditSink`] that forwards every appended event to
//! the subscribers of its job over a `tokio::sync::broadcast` channel.
//! Events reach a subscriber in append order. Subscribers that fall behind
//! the channel capacity observe a lag error and can resynchronize from the
//! store with `events(job, after_seq)`. The channel is dropped once the
//! job's terminal event has been forwarded, so receivers see the stream close
//! after the last event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::core::AuditEvent;
use crate::core::JobId;
use crate::interfaces::AuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-job channel capacity.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

// ============================================================================
// SECTION: Feed
// ============================================================================

/// Per-job broadcast hub for audit events.
pub struct AuditFeed {
    /// Senders keyed by job identifier.
    channels: Mutex<BTreeMap<JobId, broadcast::Sender<AuditEvent>>>,
    /// Capacity of newly created channels.
    capacity: usize,
}

impl AuditFeed {
    /// Creates a feed with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Creates a feed with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(BTreeMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to events of one job appended after this call.
    ///
    /// Returns `None` when the feed lock is poisoned.
    #[must_use]
    pub fn subscribe(&self, job_id: &JobId) -> Option<broadcast::Receiver<AuditEvent>> {
        let mut channels = self.channels.lock().ok()?;
        let sender = channels
            .entry(job_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Some(sender.subscribe())
    }

    /// Drops the channel of a finished job; subscribers see the stream close.
    pub fn close(&self, job_id: &JobId) {
        if let Ok(mut channels) = self.channels.lock() {
            channels.remove(job_id);
        }
    }
}

impl Default for AuditFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for AuditFeed {
    fn record(&self, event: &AuditEvent) {
        let Ok(mut channels) = self.channels.lock() else {
            return;
        };
        if let Some(sender) = channels.get(&event.job_id) {
            let _ = sender.send(event.clone());
        }
        if event.terminal {
            channels.remove(&event.job_id);
        }
    }
}
