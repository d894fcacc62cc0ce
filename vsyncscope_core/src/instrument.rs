// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The instrumentation context a render loop talks to.
//!
//! [`Instrumentation`] bundles the event stream, the present-queue tracker,
//! and the latency statistics behind one object that the render loop owns
//! and passes around explicitly. A typical frame:
//!
//! ```text
//!   begin = clock.now()
//!   cpu   = start(Cpu)  ... end(cpu)
//!   post_present(present_id, begin)      // opens a Present event
//!   retire_presents(swapchain)           // closes Present events, records
//!                                        // vsyncs, samples latency
//!   trim_history()
//! ```

use crate::clock::Clock;
use crate::event::{EventId, EventTag, Queue};
use crate::latency::{LatencyReport, LatencySmoother, LatencyStatistics};
use crate::present::{FrameStatisticsSource, PresentId, PresentOutcome, PresentQueue};
use crate::stream::EventStream;
use crate::time::HostTime;
use crate::trace::{
    PresentPostedEvent, PresentQueueHealthEvent, PresentRetiredEvent, StaleHandleEvent, TrimEvent,
    Tracer,
};

/// Tuning for an [`Instrumentation`] context.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstrumentationConfig {
    /// Number of latency samples the jitter metrics cover.
    pub history_length: usize,
    /// Vsyncs of history kept by [`Instrumentation::trim_history`].
    pub retained_vsyncs: usize,
    /// Weight of each new sample in the smoothed latency (0.0–1.0).
    pub latency_ema_alpha: f64,
}

impl InstrumentationConfig {
    /// Roughly four seconds of history at 60 Hz, lightly smoothed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history_length: 256,
            retained_vsyncs: 256,
            latency_ema_alpha: 0.1,
        }
    }

    /// A short window for high-refresh displays where only the last second
    /// matters.
    #[must_use]
    pub const fn high_refresh() -> Self {
        Self {
            history_length: 144,
            retained_vsyncs: 144,
            latency_ema_alpha: 0.2,
        }
    }
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Event stream, present tracker, and latency statistics for one render
/// loop.
///
/// `N` is the present ring capacity.
#[derive(Debug)]
pub struct Instrumentation<C, const N: usize = 32> {
    clock: C,
    config: InstrumentationConfig,
    stream: EventStream,
    presents: PresentQueue<Option<EventId>, N>,
    latency: LatencyStatistics,
    smoother: LatencySmoother,
}

impl<C: Clock, const N: usize> Instrumentation<C, N> {
    /// Creates a context reading time from `clock`.
    #[must_use]
    pub fn new(clock: C, config: InstrumentationConfig) -> Self {
        Self {
            clock,
            stream: EventStream::new(),
            presents: PresentQueue::new(),
            latency: LatencyStatistics::new(config.history_length),
            smoother: LatencySmoother::new(config.latency_ema_alpha),
            config,
        }
    }

    /// The clock timestamps come from.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &InstrumentationConfig {
        &self.config
    }

    /// Recorded events.
    #[inline]
    #[must_use]
    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Recorded events, mutably (layout queries sort lazily).
    #[inline]
    pub fn stream_mut(&mut self) -> &mut EventStream {
        &mut self.stream
    }

    /// The present-queue tracker.
    #[inline]
    #[must_use]
    pub fn presents(&self) -> &PresentQueue<Option<EventId>, N> {
        &self.presents
    }

    /// Latency sample window.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> &LatencyStatistics {
        &self.latency
    }

    /// Smoothed latency in milliseconds, once any present was displayed.
    #[inline]
    #[must_use]
    pub fn smoothed_latency_ms(&self) -> Option<f64> {
        self.smoother.get()
    }

    /// Changes how many samples the jitter metrics cover.
    pub fn set_history_length(&mut self, history_length: usize) {
        self.config.history_length = history_length;
        self.latency.set_history_length(history_length);
    }

    /// Freezes (`true`) or resumes (`false`) event recording.
    ///
    /// Latency statistics keep updating while paused.
    pub fn pause(&mut self, paused: bool) {
        self.stream.pause(paused);
    }

    /// Opens an event now.
    pub fn start(&mut self, queue: Queue, tag: EventTag, correlation_id: u64) -> Option<EventId> {
        let now = self.clock.now();
        self.stream.start(queue, tag, correlation_id, now)
    }

    /// Closes an event now.
    ///
    /// Returns `false` if nothing was recorded (paused or stale handle).
    pub fn end(&mut self, id: EventId, tracer: &mut Tracer<'_>) -> bool {
        let now = self.clock.now();
        let applied = self.stream.end(id, now);
        if !applied && !self.stream.is_paused() {
            tracer.stale_handle(&StaleHandleEvent { id, at: now });
        }
        applied
    }

    /// Records a finished GPU interval, e.g. from resolved timestamp queries.
    ///
    /// # Panics
    ///
    /// Panics if `start` is zero or `end` precedes `start`.
    pub fn insert_gpu_event(
        &mut self,
        start: HostTime,
        end: HostTime,
        tag: EventTag,
        correlation_id: u64,
    ) -> Option<EventId> {
        self.stream
            .insert_event(Queue::Gpu, start, end, tag, correlation_id)
    }

    /// Records a vsync marker now.
    pub fn vsync_now(&mut self) -> Option<EventId> {
        let now = self.clock.now();
        self.stream.vsync(now)
    }

    /// Records a present submission and opens its Present event.
    ///
    /// `frame_begin` is when the CPU started building this frame; latency is
    /// measured from it.
    pub fn post_present(
        &mut self,
        present_id: PresentId,
        frame_begin: HostTime,
        tag: EventTag,
        correlation_id: u64,
        tracer: &mut Tracer<'_>,
    ) -> Option<EventId> {
        let now = self.clock.now();
        let event = self.stream.start(Queue::Present, tag, correlation_id, now);
        self.presents
            .post_present(present_id, frame_begin, now, event);
        tracer.present_posted(&PresentPostedEvent {
            present_id,
            frame_begin,
            entered: now,
            in_flight: self.presents.in_flight(),
        });
        event
    }

    /// Reconciles posted presents against `source`.
    ///
    /// Displayed presents close their Present event at the sync time, add a
    /// vsync marker there, and contribute a latency sample; dropped presents
    /// are closed as dropped. Returns the report for the newest latency
    /// sample taken, if any.
    pub fn retire_presents<S>(
        &mut self,
        source: &mut S,
        tracer: &mut Tracer<'_>,
    ) -> Result<Option<LatencyReport>, S::Error>
    where
        S: FrameStatisticsSource + ?Sized,
    {
        let before = self.health();
        let rate = self.clock.tick_rate();
        let Self {
            stream,
            presents,
            latency,
            smoother,
            ..
        } = self;

        let mut newest = None;
        presents.retrieve_stats(source, |entry, outcome| {
            tracer.present_retired(&PresentRetiredEvent {
                present_id: entry.present_id,
                frame_begin: entry.frame_begin,
                entered: entry.entered,
                outcome,
            });
            match outcome {
                PresentOutcome::Dropped => {
                    if let Some(id) = entry.payload {
                        close(stream, tracer, StreamClose::Dropped, id, entry.entered);
                    }
                }
                PresentOutcome::Completed(at) => {
                    if let Some(id) = entry.payload {
                        close(stream, tracer, StreamClose::At(at), id, at);
                    }
                    stream.vsync(at);
                    let ticks = at.saturating_duration_since(entry.frame_begin).ticks();
                    if ticks != 0 {
                        let latency_ms = rate.ticks_to_millis(ticks);
                        latency.sample(latency_ms);
                        let report = LatencyReport {
                            present_id: entry.present_id,
                            latency_ms,
                            smoothed_ms: smoother.update(latency_ms),
                            std_dev_ms: latency.evaluate_std_dev_metric(),
                            min_max_ms: latency.evaluate_min_max_metric(),
                        };
                        tracer.latency_sample(&report);
                        newest = Some(report);
                    }
                }
            }
        })?;

        let after = self.health();
        if after != before {
            tracer.queue_health(&after);
        }
        Ok(newest)
    }

    /// Drops history older than the configured number of vsyncs.
    ///
    /// Returns the number of events removed.
    pub fn trim_history(&mut self, tracer: &mut Tracer<'_>) -> usize {
        let removed = self
            .stream
            .trim_to_last_n_vsyncs(self.config.retained_vsyncs);
        if removed > 0 {
            tracer.trim(&TrimEvent {
                cutoff: self.stream.vsync_time(0).unwrap_or_default(),
                removed,
                remaining: self.stream.len(),
            });
        }
        removed
    }

    fn health(&self) -> PresentQueueHealthEvent {
        PresentQueueHealthEvent {
            overwritten: self.presents.overwritten_count(),
            stale: self.presents.stale_count(),
            anomalies: self.presents.anomaly_count(),
        }
    }
}

enum StreamClose {
    At(HostTime),
    Dropped,
}

fn close(
    stream: &mut EventStream,
    tracer: &mut Tracer<'_>,
    how: StreamClose,
    id: EventId,
    at: HostTime,
) {
    let applied = match how {
        StreamClose::At(t) => stream.end(id, t),
        StreamClose::Dropped => stream.end_dropped(id),
    };
    if !applied && !stream.is_paused() {
        tracer.stale_handle(&StaleHandleEvent { id, at });
    }
}
