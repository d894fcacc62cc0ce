// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics hooks for the instrumentation pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`Instrumentation`](crate::instrument::Instrumentation) context calls as
//! presents flow through it. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.

use crate::event::EventId;
use crate::latency::LatencyReport;
use crate::present::{PresentId, PresentOutcome};
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a present is handed to the queue tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentPostedEvent {
    /// Present counter value.
    pub present_id: PresentId,
    /// When the CPU began building the frame.
    pub frame_begin: HostTime,
    /// When the present was submitted.
    pub entered: HostTime,
    /// Presents awaiting statistics, this one included.
    pub in_flight: u64,
}

/// Emitted once per present reconciled against frame statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentRetiredEvent {
    /// Present counter value.
    pub present_id: PresentId,
    /// When the CPU began building the frame.
    pub frame_begin: HostTime,
    /// When the present was submitted.
    pub entered: HostTime,
    /// Displayed or dropped.
    pub outcome: PresentOutcome,
}

/// Emitted when reconciliation had to skip entries.
///
/// Counters are running totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentQueueHealthEvent {
    /// Unreconciled entries overwritten by newer submissions.
    pub overwritten: u64,
    /// Ids whose slot held a different present.
    pub stale: u64,
    /// Entries that exited before they entered.
    pub anomalies: u64,
}

/// Emitted when history is trimmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrimEvent {
    /// Events starting before this time were removed.
    pub cutoff: HostTime,
    /// How many events were removed.
    pub removed: usize,
    /// How many events remain.
    pub remaining: usize,
}

/// Emitted when a stale event handle is ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaleHandleEvent {
    /// The handle whose event had already been trimmed.
    pub id: EventId,
    /// Attempted end time.
    pub at: HostTime,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the instrumentation pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a present is posted.
    fn on_present_posted(&mut self, e: &PresentPostedEvent) {
        _ = e;
    }

    /// Called for each retired present.
    fn on_present_retired(&mut self, e: &PresentRetiredEvent) {
        _ = e;
    }

    /// Called when skip counters changed during reconciliation.
    fn on_queue_health(&mut self, e: &PresentQueueHealthEvent) {
        _ = e;
    }

    /// Called with each new latency sample and the updated statistics.
    fn on_latency_sample(&mut self, r: &LatencyReport) {
        _ = r;
    }

    /// Called after history was trimmed.
    fn on_trim(&mut self, e: &TrimEvent) {
        _ = e;
    }

    /// Called when a stale handle is ended.
    fn on_stale_handle(&mut self, e: &StaleHandleEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`PresentPostedEvent`].
    #[inline]
    pub fn present_posted(&mut self, e: &PresentPostedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_present_posted(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PresentRetiredEvent`].
    #[inline]
    pub fn present_retired(&mut self, e: &PresentRetiredEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_present_retired(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PresentQueueHealthEvent`].
    #[inline]
    pub fn queue_health(&mut self, e: &PresentQueueHealthEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_queue_health(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LatencyReport`].
    #[inline]
    pub fn latency_sample(&mut self, r: &LatencyReport) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_latency_sample(r);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = r;
        }
    }

    /// Emits a [`TrimEvent`].
    #[inline]
    pub fn trim(&mut self, e: &TrimEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_trim(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StaleHandleEvent`].
    #[inline]
    pub fn stale_handle(&mut self, e: &StaleHandleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stale_handle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_posted() -> PresentPostedEvent {
        PresentPostedEvent {
            present_id: PresentId(42),
            frame_begin: HostTime(1_000_000),
            entered: HostTime(1_004_000),
            in_flight: 2,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_present_posted(&sample_posted());
        sink.on_trim(&TrimEvent {
            cutoff: HostTime(0),
            removed: 0,
            remaining: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.present_posted(&sample_posted());
        tracer.queue_health(&PresentQueueHealthEvent {
            overwritten: 0,
            stale: 1,
            anomalies: 0,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            posted: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_present_posted(&mut self, e: &PresentPostedEvent) {
                self.posted.push(e.present_id.0);
            }
        }

        let mut sink = RecordingSink { posted: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.present_posted(&sample_posted());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.posted, &[42]);
    }
}
