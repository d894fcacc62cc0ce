// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to milliseconds using a [`TickRate`].

use std::io::Write;

use vsyncscope_core::latency::LatencyReport;
use vsyncscope_core::present::PresentOutcome;
use vsyncscope_core::time::{HostTime, TickRate};
use vsyncscope_core::trace::{
    PresentPostedEvent, PresentQueueHealthEvent, PresentRetiredEvent, StaleHandleEvent, TraceSink,
    TrimEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    rate: TickRate,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(rate: TickRate) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            rate,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, rate: TickRate) -> Self {
        Self { writer, rate }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, rate: TickRate) -> Self {
        Self { writer, rate }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ms(&self, t: HostTime) -> f64 {
        self.rate.ticks_to_millis(t.ticks())
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_present_posted(&mut self, e: &PresentPostedEvent) {
        let _ = writeln!(
            self.writer,
            "[post] present={} begin={:.3}ms entered={:.3}ms in_flight={}",
            e.present_id.0,
            self.ms(e.frame_begin),
            self.ms(e.entered),
            e.in_flight,
        );
    }

    fn on_present_retired(&mut self, e: &PresentRetiredEvent) {
        match e.outcome {
            PresentOutcome::Completed(at) => {
                let _ = writeln!(
                    self.writer,
                    "[retire] present={} displayed at {:.3}ms (queued {:.3}ms)",
                    e.present_id.0,
                    self.ms(at),
                    self.rate
                        .ticks_to_millis(at.saturating_duration_since(e.entered).ticks()),
                );
            }
            PresentOutcome::Dropped => {
                let _ = writeln!(
                    self.writer,
                    "[retire] present={} DROPPED (entered {:.3}ms)",
                    e.present_id.0,
                    self.ms(e.entered),
                );
            }
        }
    }

    fn on_queue_health(&mut self, e: &PresentQueueHealthEvent) {
        let _ = writeln!(
            self.writer,
            "[queue] overwritten={} stale={} anomalies={}",
            e.overwritten, e.stale, e.anomalies,
        );
    }

    fn on_latency_sample(&mut self, r: &LatencyReport) {
        let _ = writeln!(
            self.writer,
            "[latency] present={} {:.3}ms avg={:.3}ms sd={:.3}ms spread={:.3}ms",
            r.present_id.0, r.latency_ms, r.smoothed_ms, r.std_dev_ms, r.min_max_ms,
        );
    }

    fn on_trim(&mut self, e: &TrimEvent) {
        let _ = writeln!(
            self.writer,
            "[trim] before {:.3}ms removed={} remaining={}",
            self.ms(e.cutoff),
            e.removed,
            e.remaining,
        );
    }

    fn on_stale_handle(&mut self, e: &StaleHandleEvent) {
        let _ = writeln!(
            self.writer,
            "[stale] {:?} ended at {:.3}ms after trim",
            e.id,
            self.ms(e.at),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsyncscope_core::present::PresentId;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn posted_and_retired_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), TickRate::MICROS);
        sink.on_present_posted(&PresentPostedEvent {
            present_id: PresentId(3),
            frame_begin: HostTime(1_000),
            entered: HostTime(5_000),
            in_flight: 1,
        });
        sink.on_present_retired(&PresentRetiredEvent {
            present_id: PresentId(3),
            frame_begin: HostTime(1_000),
            entered: HostTime(5_000),
            outcome: PresentOutcome::Completed(HostTime(21_000)),
        });
        let out = output(sink);
        assert!(out.contains("[post] present=3"), "got: {out}");
        assert!(out.contains("in_flight=1"), "got: {out}");
        assert!(out.contains("displayed at 21.000ms"), "got: {out}");
        assert!(out.contains("queued 16.000ms"), "got: {out}");
    }

    #[test]
    fn dropped_present_is_flagged() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), TickRate::MICROS);
        sink.on_present_retired(&PresentRetiredEvent {
            present_id: PresentId(9),
            frame_begin: HostTime(0),
            entered: HostTime(2_500),
            outcome: PresentOutcome::Dropped,
        });
        let out = output(sink);
        assert!(out.contains("present=9 DROPPED"), "got: {out}");
    }

    #[test]
    fn latency_line_has_all_metrics() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), TickRate::NANOS);
        sink.on_latency_sample(&LatencyReport {
            present_id: PresentId(12),
            latency_ms: 33.5,
            smoothed_ms: 32.0,
            std_dev_ms: 1.25,
            min_max_ms: 4.0,
        });
        let out = output(sink);
        assert_eq!(
            out,
            "[latency] present=12 33.500ms avg=32.000ms sd=1.250ms spread=4.000ms\n"
        );
    }
}
