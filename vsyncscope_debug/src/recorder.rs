// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Stale-handle events keep the raw slot index and generation rather than an
//! [`EventId`](vsyncscope_core::event::EventId), since a handle cannot be
//! rebuilt outside the stream that issued it.

use vsyncscope_core::latency::LatencyReport;
use vsyncscope_core::present::{PresentId, PresentOutcome};
use vsyncscope_core::time::HostTime;
use vsyncscope_core::trace::{
    PresentPostedEvent, PresentQueueHealthEvent, PresentRetiredEvent, StaleHandleEvent, TraceSink,
    TrimEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PRESENT_POSTED: u8 = 1;
const TAG_PRESENT_RETIRED: u8 = 2;
const TAG_QUEUE_HEALTH: u8 = 3;
const TAG_LATENCY_SAMPLE: u8 = 4;
const TAG_TRIM: u8 = 5;
const TAG_STALE_HANDLE: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_usize(&mut self, v: usize) {
        self.write_u64(u64::try_from(v).unwrap_or(u64::MAX));
    }

    fn write_outcome(&mut self, outcome: PresentOutcome) {
        match outcome {
            PresentOutcome::Completed(at) => {
                self.write_u8(1);
                self.write_u64(at.ticks());
            }
            PresentOutcome::Dropped => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_present_posted(&mut self, e: &PresentPostedEvent) {
        self.write_u8(TAG_PRESENT_POSTED);
        self.write_u64(e.present_id.0);
        self.write_u64(e.frame_begin.ticks());
        self.write_u64(e.entered.ticks());
        self.write_u64(e.in_flight);
    }

    fn on_present_retired(&mut self, e: &PresentRetiredEvent) {
        self.write_u8(TAG_PRESENT_RETIRED);
        self.write_u64(e.present_id.0);
        self.write_u64(e.frame_begin.ticks());
        self.write_u64(e.entered.ticks());
        self.write_outcome(e.outcome);
    }

    fn on_queue_health(&mut self, e: &PresentQueueHealthEvent) {
        self.write_u8(TAG_QUEUE_HEALTH);
        self.write_u64(e.overwritten);
        self.write_u64(e.stale);
        self.write_u64(e.anomalies);
    }

    fn on_latency_sample(&mut self, r: &LatencyReport) {
        self.write_u8(TAG_LATENCY_SAMPLE);
        self.write_u64(r.present_id.0);
        self.write_f64(r.latency_ms);
        self.write_f64(r.smoothed_ms);
        self.write_f64(r.std_dev_ms);
        self.write_f64(r.min_max_ms);
    }

    fn on_trim(&mut self, e: &TrimEvent) {
        self.write_u8(TAG_TRIM);
        self.write_u64(e.cutoff.ticks());
        self.write_usize(e.removed);
        self.write_usize(e.remaining);
    }

    fn on_stale_handle(&mut self, e: &StaleHandleEvent) {
        self.write_u8(TAG_STALE_HANDLE);
        self.write_u32(e.id.index());
        self.write_u32(e.id.generation());
        self.write_u64(e.at.ticks());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`PresentPostedEvent`].
    PresentPosted(PresentPostedEvent),
    /// A [`PresentRetiredEvent`].
    PresentRetired(PresentRetiredEvent),
    /// A [`PresentQueueHealthEvent`].
    QueueHealth(PresentQueueHealthEvent),
    /// A [`LatencyReport`].
    LatencySample(LatencyReport),
    /// A [`TrimEvent`].
    Trim(TrimEvent),
    /// A stale handle was ended.
    StaleHandle {
        /// Slot index of the handle.
        index: u32,
        /// Generation of the handle.
        generation: u32,
        /// Attempted end time.
        at: HostTime,
    },
}

/// Decodes a recording produced by [`RecorderSink`].
///
/// Iteration stops at the first unknown tag or truncated record.
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const LEN: usize>(&mut self) -> Option<[u8; LEN]> {
        let bytes = self.data.get(self.pos..self.pos + LEN)?.try_into().ok()?;
        self.pos += LEN;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_usize(&mut self) -> Option<usize> {
        Some(usize::try_from(self.read_u64()?).unwrap_or(usize::MAX))
    }

    fn read_outcome(&mut self) -> Option<PresentOutcome> {
        let completed = self.read_u8()?;
        let at = self.read_u64()?;
        Some(if completed != 0 {
            PresentOutcome::Completed(HostTime(at))
        } else {
            PresentOutcome::Dropped
        })
    }

    fn decode_present_posted(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PresentPosted(PresentPostedEvent {
            present_id: PresentId(self.read_u64()?),
            frame_begin: HostTime(self.read_u64()?),
            entered: HostTime(self.read_u64()?),
            in_flight: self.read_u64()?,
        }))
    }

    fn decode_present_retired(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PresentRetired(PresentRetiredEvent {
            present_id: PresentId(self.read_u64()?),
            frame_begin: HostTime(self.read_u64()?),
            entered: HostTime(self.read_u64()?),
            outcome: self.read_outcome()?,
        }))
    }

    fn decode_queue_health(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::QueueHealth(PresentQueueHealthEvent {
            overwritten: self.read_u64()?,
            stale: self.read_u64()?,
            anomalies: self.read_u64()?,
        }))
    }

    fn decode_latency_sample(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LatencySample(LatencyReport {
            present_id: PresentId(self.read_u64()?),
            latency_ms: self.read_f64()?,
            smoothed_ms: self.read_f64()?,
            std_dev_ms: self.read_f64()?,
            min_max_ms: self.read_f64()?,
        }))
    }

    fn decode_trim(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Trim(TrimEvent {
            cutoff: HostTime(self.read_u64()?),
            removed: self.read_usize()?,
            remaining: self.read_usize()?,
        }))
    }

    fn decode_stale_handle(&mut self) -> Option<RecordedEvent> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        let at = HostTime(self.read_u64()?);
        Some(RecordedEvent::StaleHandle {
            index,
            generation,
            at,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_PRESENT_POSTED => self.decode_present_posted(),
            TAG_PRESENT_RETIRED => self.decode_present_retired(),
            TAG_QUEUE_HEALTH => self.decode_queue_health(),
            TAG_LATENCY_SAMPLE => self.decode_latency_sample(),
            TAG_TRIM => self.decode_trim(),
            TAG_STALE_HANDLE => self.decode_stale_handle(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsyncscope_core::event::{EventTag, Queue};
    use vsyncscope_core::stream::EventStream;

    #[test]
    fn records_decode_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_present_posted(&PresentPostedEvent {
            present_id: PresentId(1),
            frame_begin: HostTime(100),
            entered: HostTime(400),
            in_flight: 1,
        });
        rec.on_present_retired(&PresentRetiredEvent {
            present_id: PresentId(1),
            frame_begin: HostTime(100),
            entered: HostTime(400),
            outcome: PresentOutcome::Dropped,
        });
        rec.on_latency_sample(&LatencyReport {
            present_id: PresentId(2),
            latency_ms: 16.5,
            smoothed_ms: 16.0,
            std_dev_ms: 0.25,
            min_max_ms: 1.0,
        });
        rec.on_trim(&TrimEvent {
            cutoff: HostTime(50),
            removed: 3,
            remaining: 7,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[1],
            RecordedEvent::PresentRetired(PresentRetiredEvent {
                outcome: PresentOutcome::Dropped,
                ..
            })
        ));
        let RecordedEvent::LatencySample(r) = &events[2] else {
            panic!("expected a latency sample, got {:?}", events[2]);
        };
        assert_eq!(r.latency_ms, 16.5, "f64 bits survive");
        assert_eq!(
            events[3],
            RecordedEvent::Trim(TrimEvent {
                cutoff: HostTime(50),
                removed: 3,
                remaining: 7,
            })
        );
    }

    #[test]
    fn stale_handle_keeps_raw_parts() {
        let mut stream = EventStream::new();
        let id = stream
            .start(Queue::Cpu, EventTag(0), 0, HostTime(10))
            .unwrap();
        let mut rec = RecorderSink::new();
        rec.on_stale_handle(&StaleHandleEvent {
            id,
            at: HostTime(99),
        });
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(
            events,
            [RecordedEvent::StaleHandle {
                index: id.index(),
                generation: id.generation(),
                at: HostTime(99),
            }]
        );
    }

    #[test]
    fn truncated_recording_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_queue_health(&PresentQueueHealthEvent {
            overwritten: 1,
            stale: 2,
            anomalies: 3,
        });
        rec.on_queue_health(&PresentQueueHealthEvent {
            overwritten: 4,
            stale: 5,
            anomalies: 6,
        });
        let bytes = rec.into_bytes();
        assert_eq!(decode(&bytes[..bytes.len() - 1]).count(), 1);
        assert_eq!(decode(&[0xee]).count(), 0, "unknown tag");
    }
}
