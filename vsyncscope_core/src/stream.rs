// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event stream: every recorded interval, indexed by start time.
//!
//! [`EventStream`] owns the events in a generational slab and keeps a
//! [`TimelineMultimap`] from start time to [`EventId`] for range queries.
//! Vsync markers are additionally kept in a deque so "the last N vsyncs"
//! is an O(1) lookup.
//!
//! While paused, recording (start, end, insert, vsync) is a no-op, which
//! freezes the picture for inspection. Trimming still applies.
//!
//! Trimming is by start time only. An event that is still pending when its
//! start falls behind the cutoff is removed with everything else; its handle
//! goes stale, and a later [`end`](EventStream::end) on it is counted in
//! [`stale_handle_count`](EventStream::stale_handle_count) instead of
//! touching whatever now occupies the slot.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::event::{Event, EventEnd, EventId, EventTag, Queue};
use crate::time::{Duration, HostTime, TickRate};
use crate::timeline::TimelineMultimap;

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    event: Option<Event>,
}

/// Time-indexed store of CPU, GPU, present, and vsync events.
#[derive(Clone, Debug, Default)]
pub struct EventStream {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    timeline: TimelineMultimap<HostTime, EventId>,
    /// Vsync times and handles in non-decreasing time order.
    vsyncs: VecDeque<(HostTime, EventId)>,
    paused: bool,
    stale_handle_count: u64,
}

impl EventStream {
    /// Creates an empty, running stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events, vsyncs included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// Returns `true` if no events are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Freezes (`true`) or resumes (`false`) recording.
    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Returns `true` while recording is frozen.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// How many `end`/`end_dropped` calls targeted an event that had already
    /// been trimmed.
    #[inline]
    #[must_use]
    pub fn stale_handle_count(&self) -> u64 {
        self.stale_handle_count
    }

    // -- recording ---------------------------------------------------------

    /// Opens an event at `time`.
    ///
    /// Returns `None` while paused. The event stays pending until
    /// [`end`](Self::end) or [`end_dropped`](Self::end_dropped) is called,
    /// which should happen exactly once.
    pub fn start(
        &mut self,
        queue: Queue,
        tag: EventTag,
        correlation_id: u64,
        time: HostTime,
    ) -> Option<EventId> {
        if self.paused {
            return None;
        }
        Some(self.push(Event {
            queue,
            tag,
            correlation_id,
            start: time,
            end: EventEnd::Pending,
        }))
    }

    /// Closes an event at `time`.
    ///
    /// Returns `false` without effect while paused or when `id` is stale.
    /// Calling it again on the same event overwrites the end time.
    ///
    /// # Panics
    ///
    /// Panics if `time` precedes the event's start.
    pub fn end(&mut self, id: EventId, time: HostTime) -> bool {
        self.close(id, EventEnd::Completed(time))
    }

    /// Closes a present that was superseded before it reached the display.
    ///
    /// Same no-op rules as [`end`](Self::end).
    pub fn end_dropped(&mut self, id: EventId) -> bool {
        self.close(id, EventEnd::Dropped)
    }

    /// Records an already-finished interval (e.g. a GPU timestamp pair
    /// resolved after the fact).
    ///
    /// Returns `None` while paused.
    ///
    /// # Panics
    ///
    /// Panics if `start` is zero or `end` precedes `start`.
    pub fn insert_event(
        &mut self,
        queue: Queue,
        start: HostTime,
        end: HostTime,
        tag: EventTag,
        correlation_id: u64,
    ) -> Option<EventId> {
        assert!(start != HostTime(0), "event start time must be non-zero");
        assert!(end >= start, "event end must not precede its start");
        if self.paused {
            return None;
        }
        Some(self.push(Event {
            queue,
            tag,
            correlation_id,
            start,
            end: EventEnd::Completed(end),
        }))
    }

    /// Records a vertical-sync marker at `time`.
    ///
    /// Returns `None` while paused.
    pub fn vsync(&mut self, time: HostTime) -> Option<EventId> {
        if self.paused {
            return None;
        }
        let id = self.push(Event {
            queue: Queue::Vsync,
            tag: EventTag::default(),
            correlation_id: 0,
            start: time,
            end: EventEnd::Completed(time),
        });
        if self.vsyncs.back().is_none_or(|(last, _)| *last <= time) {
            self.vsyncs.push_back((time, id));
        } else {
            // A late marker; keep the deque ordered.
            let at = self.vsyncs.partition_point(|(t, _)| *t <= time);
            self.vsyncs.insert(at, (time, id));
        }
        Some(id)
    }

    // -- trimming ----------------------------------------------------------

    /// Removes every event (and vsync marker) that started before
    /// `max_start`, returning how many events were removed.
    ///
    /// Applies whether or not the stream is paused.
    pub fn trim(&mut self, max_start: HostTime) -> usize {
        let cut = self.timeline.lower_bound(max_start);
        for (_, id) in &self.timeline.as_sorted_slice()[..cut] {
            let slot = &mut self.slots[id.idx as usize];
            slot.event = None;
            // Bump generation so old handles immediately fail validation.
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(id.idx);
        }
        self.timeline.erase_prefix(cut);
        let stale_vsyncs = self.vsyncs.partition_point(|(t, _)| *t < max_start);
        self.vsyncs.drain(..stale_vsyncs);
        cut
    }

    /// Keeps only events that started within the last `seconds` before
    /// `now`.
    pub fn trim_to_last_n_seconds(&mut self, seconds: u64, now: HostTime, rate: TickRate) -> usize {
        self.trim(now.saturating_sub(Duration::from_secs(seconds, rate)))
    }

    /// Keeps only events that started at or after the `n`-th most recent
    /// vsync.
    ///
    /// Does nothing when `n` or fewer vsyncs are stored.
    pub fn trim_to_last_n_vsyncs(&mut self, n: usize) -> usize {
        let count = self.vsyncs.len();
        if count <= n {
            return 0;
        }
        let cutoff = self.vsyncs[count - n].0;
        self.trim(cutoff)
    }

    // -- queries -----------------------------------------------------------

    /// Looks up a live event.
    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.event.as_ref())
    }

    /// Returns `true` if `id` still refers to a stored event.
    #[must_use]
    pub fn is_alive(&self, id: EventId) -> bool {
        self.get(id).is_some()
    }

    /// Number of stored vsync markers.
    #[inline]
    #[must_use]
    pub fn vsync_count(&self) -> usize {
        self.vsyncs.len()
    }

    /// Time of the `index`-th stored vsync (oldest first).
    #[must_use]
    pub fn vsync_time(&self, index: usize) -> Option<HostTime> {
        self.vsyncs.get(index).map(|(t, _)| *t)
    }

    /// All stored vsync times, oldest first.
    pub fn vsync_times(&self) -> impl ExactSizeIterator<Item = HostTime> + '_ {
        self.vsyncs.iter().map(|(t, _)| *t)
    }

    /// Inclusive vsync index range covering the last `n` vsyncs.
    ///
    /// When fewer than `n` are stored the range starts at the oldest one.
    /// Returns `None` if there are no vsyncs.
    #[must_use]
    pub fn last_vsync_window(&self, n: usize) -> Option<(usize, usize)> {
        let count = self.vsyncs.len();
        if count == 0 {
            return None;
        }
        Some((count.saturating_sub(n), count - 1))
    }

    /// Events whose start lies in `[lo, hi]`, in start order.
    pub fn events_between(
        &mut self,
        lo: HostTime,
        hi: HostTime,
    ) -> impl Iterator<Item = (EventId, &Event)> {
        let slots = &self.slots;
        self.timeline
            .between(lo, hi)
            .iter()
            .filter_map(move |(_, id)| lookup(slots, *id).map(|e| (*id, e)))
    }

    /// Every stored event in start order.
    pub fn events(&mut self) -> impl Iterator<Item = (EventId, &Event)> {
        let slots = &self.slots;
        self.timeline
            .as_sorted_slice()
            .iter()
            .filter_map(move |(_, id)| lookup(slots, *id).map(|e| (*id, e)))
    }

    /// Every stored event in storage order (not necessarily sorted).
    pub fn events_unordered(&self) -> impl Iterator<Item = (EventId, &Event)> {
        self.timeline
            .entries_unordered()
            .iter()
            .filter_map(|(_, id)| self.get(*id).map(|e| (*id, e)))
    }

    // -- internals ---------------------------------------------------------

    fn push(&mut self, event: Event) -> EventId {
        let start = event.start;
        let id = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.event = Some(event);
            EventId {
                idx,
                generation: slot.generation,
            }
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            assert!(idx != u32::MAX, "event stream slot space exhausted");
            self.slots.push(Slot {
                generation: 0,
                event: Some(event),
            });
            EventId { idx, generation: 0 }
        };
        self.timeline.emplace(start, id);
        id
    }

    fn close(&mut self, id: EventId, end: EventEnd) -> bool {
        if self.paused {
            return false;
        }
        let live = self
            .slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.event.as_mut());
        match live {
            Some(event) => {
                if let EventEnd::Completed(t) = end {
                    assert!(t >= event.start, "event end must not precede its start");
                }
                event.end = end;
                true
            }
            None => {
                self.stale_handle_count += 1;
                false
            }
        }
    }
}

fn lookup(slots: &[Slot], id: EventId) -> Option<&Event> {
    slots
        .get(id.idx as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.event.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn cpu(stream: &mut EventStream, t: u64, corr: u64) -> EventId {
        stream
            .start(Queue::Cpu, EventTag(1), corr, HostTime(t))
            .unwrap()
    }

    #[test]
    fn start_end_round_trip() {
        let mut stream = EventStream::new();
        let id = cpu(&mut stream, 100, 7);
        assert_eq!(stream.get(id).unwrap().end, EventEnd::Pending);
        assert!(stream.end(id, HostTime(250)));
        let ev = stream.get(id).unwrap();
        assert_eq!(ev.end, EventEnd::Completed(HostTime(250)));
        assert_eq!(ev.correlation_id, 7);
        assert_eq!(ev.tag, EventTag(1));
    }

    #[test]
    fn end_dropped_marks_event() {
        let mut stream = EventStream::new();
        let id = stream
            .start(Queue::Present, EventTag(2), 1, HostTime(10))
            .unwrap();
        assert!(stream.end_dropped(id));
        assert!(stream.get(id).unwrap().is_dropped());
    }

    #[test]
    fn paused_stream_ignores_mutations() {
        let mut stream = EventStream::new();
        let id = cpu(&mut stream, 100, 1);
        stream.vsync(HostTime(120));
        stream.pause(true);
        assert!(stream.is_paused());
        assert_eq!(stream.start(Queue::Gpu, EventTag(0), 1, HostTime(130)), None);
        assert_eq!(stream.vsync(HostTime(140)), None);
        assert_eq!(
            stream.insert_event(Queue::Gpu, HostTime(1), HostTime(2), EventTag(0), 1),
            None
        );
        assert!(!stream.end(id, HostTime(150)), "end is ignored while paused");
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.get(id).unwrap().end, EventEnd::Pending);
        assert_eq!(stream.stale_handle_count(), 0, "paused is not stale");

        stream.pause(false);
        assert!(stream.end(id, HostTime(150)));
    }

    #[test]
    fn trim_applies_while_paused() {
        let mut stream = EventStream::new();
        let old = cpu(&mut stream, 100, 1);
        stream.vsync(HostTime(120));
        let kept = cpu(&mut stream, 500, 2);
        stream.pause(true);
        assert_eq!(stream.trim(HostTime(300)), 2);
        assert!(!stream.is_alive(old));
        assert!(stream.is_alive(kept));
        assert_eq!(stream.vsync_count(), 0);
        assert!(stream.is_paused(), "trim leaves the pause flag alone");
    }

    #[test]
    #[should_panic(expected = "event end must not precede its start")]
    fn insert_rejects_inverted_interval() {
        let mut stream = EventStream::new();
        stream.insert_event(Queue::Gpu, HostTime(10), HostTime(5), EventTag(0), 0);
    }

    #[test]
    #[should_panic(expected = "event start time must be non-zero")]
    fn insert_rejects_zero_start() {
        let mut stream = EventStream::new();
        stream.insert_event(Queue::Gpu, HostTime(0), HostTime(5), EventTag(0), 0);
    }

    #[test]
    fn trim_removes_events_before_cutoff() {
        let mut stream = EventStream::new();
        for t in [10_u64, 20, 30, 40] {
            stream.vsync(HostTime(t));
        }
        let early = cpu(&mut stream, 15, 1);
        let late = cpu(&mut stream, 35, 2);
        assert_eq!(stream.trim(HostTime(30)), 3, "two vsyncs and one cpu event");
        assert_eq!(stream.vsync_count(), 2);
        assert_eq!(stream.vsync_time(0), Some(HostTime(30)));
        assert!(!stream.is_alive(early));
        assert!(stream.is_alive(late));

        // Idempotent.
        assert_eq!(stream.trim(HostTime(30)), 0);
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn trim_is_monotonic() {
        let mut stream = EventStream::new();
        for t in 1..=50_u64 {
            cpu(&mut stream, t * 10, t);
        }
        let mut remaining = stream.len();
        for cutoff in [50_u64, 120, 120, 300, 510] {
            stream.trim(HostTime(cutoff));
            assert!(stream.len() <= remaining, "trim never grows the store");
            remaining = stream.len();
            assert!(
                stream.events().all(|(_, e)| e.start >= HostTime(cutoff)),
                "nothing older than the cutoff survives"
            );
        }
        assert_eq!(remaining, 0);
    }

    #[test]
    fn trim_to_last_n_vsyncs() {
        let mut stream = EventStream::new();
        for t in 1..=10_u64 {
            stream.vsync(HostTime(t * 100));
        }
        assert_eq!(stream.trim_to_last_n_vsyncs(10), 0, "exactly n is a no-op");
        stream.trim_to_last_n_vsyncs(4);
        assert_eq!(stream.vsync_count(), 4);
        assert_eq!(stream.vsync_time(0), Some(HostTime(700)));
        assert_eq!(stream.last_vsync_window(3), Some((1, 3)));
        assert_eq!(stream.last_vsync_window(10), Some((0, 3)));
    }

    #[test]
    fn trim_to_last_n_seconds() {
        let mut stream = EventStream::new();
        let rate = TickRate::new(1_000);
        cpu(&mut stream, 500, 1);
        cpu(&mut stream, 2_500, 2);
        cpu(&mut stream, 4_000, 3);
        assert_eq!(stream.trim_to_last_n_seconds(2, HostTime(4_600), rate), 2);
        assert_eq!(stream.len(), 1);
        // A window longer than the clock has run trims nothing.
        assert_eq!(stream.trim_to_last_n_seconds(60, HostTime(4_600), rate), 0);
    }

    #[test]
    fn pending_event_trimmed_then_ended_is_counted_stale() {
        let mut stream = EventStream::new();
        let long_running = cpu(&mut stream, 100, 1);
        stream.trim(HostTime(200));
        // The slot is reused by a newer event.
        let newer = cpu(&mut stream, 300, 2);
        assert_eq!(newer.index(), long_running.index(), "slot reused");
        assert!(!stream.end(long_running, HostTime(400)));
        assert_eq!(stream.stale_handle_count(), 1);
        assert_eq!(stream.get(newer).unwrap().end, EventEnd::Pending);
    }

    #[test]
    fn out_of_order_vsync_keeps_deque_sorted() {
        let mut stream = EventStream::new();
        stream.vsync(HostTime(100));
        stream.vsync(HostTime(300));
        stream.vsync(HostTime(200));
        let times: Vec<HostTime> = stream.vsync_times().collect();
        assert_eq!(times, vec![HostTime(100), HostTime(200), HostTime(300)]);
    }

    #[test]
    fn events_between_is_sorted_by_start() {
        let mut stream = EventStream::new();
        cpu(&mut stream, 50, 1);
        cpu(&mut stream, 10, 2);
        cpu(&mut stream, 30, 3);
        cpu(&mut stream, 90, 4);
        let ids: Vec<u64> = stream
            .events_between(HostTime(10), HostTime(50))
            .map(|(_, e)| e.correlation_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(stream.events_unordered().count(), 4);
        assert_eq!(stream.last_vsync_window(4), None);
    }
}
