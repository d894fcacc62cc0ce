// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Present-queue tracking.
//!
//! Display subsystems report presentation asynchronously: the application
//! learns *that* present `n` was submitted when it calls present, and later
//! learns from frame statistics that "the most recent present to reach the
//! display was `m`, at sync time `t`". [`PresentQueue`] reconciles the two.
//!
//! Each submission is recorded in a fixed ring of `N` slots indexed by
//! `present_id % N`. When frame statistics advance, every present between the
//! last reconciled id and the reported one is retired exactly once:
//!
//! - the reported present completes at the reported sync time;
//! - earlier ones that never got an exit time were superseded in the queue
//!   and are reported as dropped;
//! - slots whose id does not match were overwritten by a newer submission
//!   (ring overflow) and are skipped;
//! - entries whose exit precedes their entry are timing anomalies (typically
//!   a debugger pause) and are skipped.
//!
//! Skips are silent at the API but counted.

use core::fmt;

use crate::time::HostTime;

/// Present counter value as reported by the display subsystem.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PresentId(pub u64);

impl fmt::Debug for PresentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PresentId({})", self.0)
    }
}

/// When a present left the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExitTime {
    /// No completion has been reported for it.
    StillInQueue,
    /// Reached the display at this sync time.
    At(HostTime),
}

/// One tracked submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueEntry<T> {
    /// Present counter value of this submission.
    pub present_id: PresentId,
    /// When the CPU started building the frame.
    pub frame_begin: HostTime,
    /// When the frame was handed to the present queue.
    pub entered: HostTime,
    /// When the frame left the queue, if it has.
    pub exited: ExitTime,
    /// Caller payload carried through to retirement.
    pub payload: T,
}

/// How a retired present ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresentOutcome {
    /// Displayed at the given sync time.
    Completed(HostTime),
    /// Superseded before it was ever displayed.
    Dropped,
}

/// One sample of display-side frame statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStatistics {
    /// Id of the most recent present that reached the display.
    pub present_count: u64,
    /// Display sync time of that present.
    pub sync_time: HostTime,
}

/// Source of [`FrameStatistics`], typically a swapchain.
pub trait FrameStatisticsSource {
    /// Error reported when statistics cannot be read.
    type Error;

    /// Reads the latest statistics.
    fn frame_statistics(&mut self) -> Result<FrameStatistics, Self::Error>;
}

impl<S: FrameStatisticsSource + ?Sized> FrameStatisticsSource for &mut S {
    type Error = S::Error;

    fn frame_statistics(&mut self) -> Result<FrameStatistics, Self::Error> {
        (**self).frame_statistics()
    }
}

/// Ring of in-flight presents awaiting frame statistics.
///
/// `N` bounds how many presents may be in flight before older ones are
/// overwritten; 32 covers any realistic swapchain depth.
pub struct PresentQueue<T, const N: usize = 32> {
    slots: [Option<QueueEntry<T>>; N],
    last_retrieved: u64,
    last_posted: u64,
    overwritten_count: u64,
    stale_count: u64,
    anomaly_count: u64,
}

impl<T, const N: usize> fmt::Debug for PresentQueue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentQueue")
            .field("capacity", &N)
            .field("last_retrieved", &self.last_retrieved)
            .field("last_posted", &self.last_posted)
            .field("overwritten_count", &self.overwritten_count)
            .field("stale_count", &self.stale_count)
            .field("anomaly_count", &self.anomaly_count)
            .finish_non_exhaustive()
    }
}

impl<T, const N: usize> Default for PresentQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> PresentQueue<T, N> {
    /// Creates an empty queue.
    ///
    /// # Panics
    ///
    /// Panics if `N` is zero.
    #[must_use]
    pub fn new() -> Self {
        assert!(N > 0, "present queue capacity must be non-zero");
        Self {
            slots: core::array::from_fn(|_| None),
            last_retrieved: 0,
            last_posted: 0,
            overwritten_count: 0,
            stale_count: 0,
            anomaly_count: 0,
        }
    }

    /// Ring capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Highest present id already reconciled.
    #[inline]
    #[must_use]
    pub fn last_retrieved(&self) -> PresentId {
        PresentId(self.last_retrieved)
    }

    /// Presents posted but not yet reconciled.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.last_posted.saturating_sub(self.last_retrieved)
    }

    /// Unreconciled entries that a newer submission overwrote.
    #[inline]
    #[must_use]
    pub fn overwritten_count(&self) -> u64 {
        self.overwritten_count
    }

    /// Ids skipped during retrieval because their slot held another present.
    #[inline]
    #[must_use]
    pub fn stale_count(&self) -> u64 {
        self.stale_count
    }

    /// Entries skipped because they exited before they entered.
    #[inline]
    #[must_use]
    pub fn anomaly_count(&self) -> u64 {
        self.anomaly_count
    }

    /// Looks up the entry for `id` if its slot still holds it.
    #[must_use]
    pub fn entry(&self, id: PresentId) -> Option<&QueueEntry<T>> {
        self.slots[slot_index::<N>(id.0)]
            .as_ref()
            .filter(|e| e.present_id == id)
    }

    /// Records a submission.
    ///
    /// `present_id` is the counter value the display subsystem assigned to
    /// this present; ids are expected to increase.
    pub fn post_present(
        &mut self,
        present_id: PresentId,
        frame_begin: HostTime,
        now: HostTime,
        payload: T,
    ) {
        let slot = &mut self.slots[slot_index::<N>(present_id.0)];
        if slot
            .as_ref()
            .is_some_and(|old| old.present_id.0 > self.last_retrieved)
        {
            self.overwritten_count += 1;
        }
        *slot = Some(QueueEntry {
            present_id,
            frame_begin,
            entered: now,
            exited: ExitTime::StillInQueue,
            payload,
        });
        self.last_posted = self.last_posted.max(present_id.0);
    }

    /// Reconciles against the latest frame statistics.
    ///
    /// Polls `source` until it stops reporting new presents and calls
    /// `on_retired` once for every present that can be attributed, in id
    /// order. Returns the number of callbacks made; errors from the source
    /// are returned unchanged and leave already-retired presents retired.
    pub fn retrieve_stats<S, F>(
        &mut self,
        source: &mut S,
        mut on_retired: F,
    ) -> Result<usize, S::Error>
    where
        S: FrameStatisticsSource + ?Sized,
        F: FnMut(&QueueEntry<T>, PresentOutcome),
    {
        let mut delivered = 0;
        loop {
            let stats = source.frame_statistics()?;
            if stats.present_count <= self.last_retrieved {
                break;
            }
            let count = stats.present_count;
            self.record_exit(count, stats.sync_time);

            // Below `first` an id and a newer one may share a slot, so only
            // entries whose slot was never reused are still reachable.
            let oldest_possible = count.saturating_sub(N as u64 - 1).max(1);
            let first = (self.last_retrieved + 1).max(oldest_possible);
            let mut survivors = 0;
            let mut after = self.last_retrieved;
            while let Some((slot, id)) = self.next_unreused(after, first) {
                after = id;
                survivors += 1;
                if self.retire(slot, &mut on_retired) {
                    delivered += 1;
                }
            }
            self.stale_count += first - (self.last_retrieved + 1) - survivors;

            for id in first..=count {
                let slot = slot_index::<N>(id);
                let held = self.slots[slot]
                    .as_ref()
                    .is_some_and(|e| e.present_id.0 == id);
                if !held {
                    self.stale_count += 1;
                    continue;
                }
                if self.retire(slot, &mut on_retired) {
                    delivered += 1;
                }
            }
            self.last_retrieved = count;
        }
        Ok(delivered)
    }

    /// Slot and id of the oldest entry with `after < id < before`.
    fn next_unreused(&self, after: u64, before: u64) -> Option<(usize, u64)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| Some((slot, e.as_ref()?.present_id.0)))
            .filter(|&(_, id)| after < id && id < before)
            .min_by_key(|&(_, id)| id)
    }

    /// Hands the entry in `slot` to `on_retired` unless it is anomalous.
    fn retire<F>(&mut self, slot: usize, on_retired: &mut F) -> bool
    where
        F: FnMut(&QueueEntry<T>, PresentOutcome),
    {
        let Some(entry) = self.slots[slot].as_ref() else {
            return false;
        };
        let outcome = match entry.exited {
            ExitTime::StillInQueue => PresentOutcome::Dropped,
            ExitTime::At(t) if t < entry.entered => {
                self.anomaly_count += 1;
                return false;
            }
            ExitTime::At(t) => PresentOutcome::Completed(t),
        };
        on_retired(entry, outcome);
        true
    }

    fn record_exit(&mut self, id: u64, sync_time: HostTime) {
        if let Some(entry) = self.slots[slot_index::<N>(id)]
            .as_mut()
            .filter(|e| e.present_id.0 == id)
        {
            entry.exited = ExitTime::At(sync_time);
        }
    }
}

#[inline]
#[expect(
    clippy::cast_possible_truncation,
    reason = "the remainder is below N, which is a usize"
)]
fn slot_index<const N: usize>(id: u64) -> usize {
    (id % N as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;

    /// Replays scripted statistics; repeats the last one once exhausted.
    struct Scripted {
        script: VecDeque<FrameStatistics>,
        last: FrameStatistics,
    }

    impl Scripted {
        fn new(steps: &[(u64, u64)]) -> Self {
            Self {
                script: steps
                    .iter()
                    .map(|&(c, t)| FrameStatistics {
                        present_count: c,
                        sync_time: HostTime(t),
                    })
                    .collect(),
                last: FrameStatistics {
                    present_count: 0,
                    sync_time: HostTime(0),
                },
            }
        }
    }

    impl FrameStatisticsSource for Scripted {
        type Error = ();

        fn frame_statistics(&mut self) -> Result<FrameStatistics, ()> {
            if let Some(next) = self.script.pop_front() {
                self.last = next;
            }
            Ok(self.last)
        }
    }

    struct Failing;

    impl FrameStatisticsSource for Failing {
        type Error = &'static str;

        fn frame_statistics(&mut self) -> Result<FrameStatistics, &'static str> {
            Err("device lost")
        }
    }

    fn collect<const N: usize>(
        queue: &mut PresentQueue<u64, N>,
        source: &mut Scripted,
    ) -> Vec<(u64, u64, PresentOutcome)> {
        let mut out = Vec::new();
        queue
            .retrieve_stats(source, |e, outcome| {
                out.push((e.present_id.0, e.payload, outcome));
            })
            .unwrap();
        out
    }

    #[test]
    fn completion_yields_one_callback_with_payload() {
        let mut queue = PresentQueue::<u64>::new();
        queue.post_present(PresentId(1), HostTime(100), HostTime(150), 11);
        let mut source = Scripted::new(&[(1, 400)]);
        let retired = collect(&mut queue, &mut source);
        assert_eq!(
            retired,
            [(1, 11, PresentOutcome::Completed(HostTime(400)))]
        );
        assert_eq!(queue.last_retrieved(), PresentId(1));
        assert_eq!(queue.entry(PresentId(1)).unwrap().frame_begin, HostTime(100));

        // Nothing new: no callbacks.
        assert!(collect(&mut queue, &mut source).is_empty());
    }

    #[test]
    fn superseded_presents_are_dropped() {
        let mut queue = PresentQueue::<u64>::new();
        for id in 1..=3 {
            queue.post_present(PresentId(id), HostTime(id * 10), HostTime(id * 10 + 5), 0);
        }
        assert_eq!(queue.in_flight(), 3);
        let mut source = Scripted::new(&[(3, 90)]);
        let outcomes: Vec<PresentOutcome> = collect(&mut queue, &mut source)
            .into_iter()
            .map(|(_, _, o)| o)
            .collect();
        assert_eq!(
            outcomes,
            [
                PresentOutcome::Dropped,
                PresentOutcome::Dropped,
                PresentOutcome::Completed(HostTime(90)),
            ]
        );
        assert_eq!(queue.in_flight(), 0);
    }

    #[test]
    fn polls_until_statistics_settle() {
        let mut queue = PresentQueue::<u64>::new();
        queue.post_present(PresentId(1), HostTime(1), HostTime(2), 1);
        queue.post_present(PresentId(2), HostTime(3), HostTime(4), 2);
        // The second read reports another completion; the third repeats it.
        let mut source = Scripted::new(&[(1, 10), (2, 20)]);
        let retired = collect(&mut queue, &mut source);
        assert_eq!(
            retired,
            [
                (1, 1, PresentOutcome::Completed(HostTime(10))),
                (2, 2, PresentOutcome::Completed(HostTime(20))),
            ]
        );
    }

    #[test]
    fn overflow_never_misattributes() {
        let mut queue = PresentQueue::<u64, 4>::new();
        for id in 1..=10 {
            queue.post_present(PresentId(id), HostTime(id), HostTime(id + 1), id);
        }
        assert_eq!(queue.overwritten_count(), 6);
        let mut source = Scripted::new(&[(10, 100)]);
        let retired = collect(&mut queue, &mut source);
        // Only ids still in the ring (7..=10) are attributed, each to its own
        // payload.
        assert!(
            retired.iter().all(|(id, payload, _)| *id == *payload),
            "payload must match id"
        );
        assert_eq!(
            retired.iter().map(|(id, _, _)| *id).collect::<Vec<_>>(),
            [7, 8, 9, 10]
        );
        assert_eq!(queue.stale_count(), 6);
    }

    #[test]
    fn overwritten_slot_is_skipped() {
        let mut queue = PresentQueue::<u64, 4>::new();
        queue.post_present(PresentId(1), HostTime(1), HostTime(2), 1);
        queue.post_present(PresentId(5), HostTime(5), HostTime(6), 5);
        // Statistics only reached id 2: slot 1 now holds id 5.
        let mut source = Scripted::new(&[(2, 50)]);
        let retired = collect(&mut queue, &mut source);
        assert!(retired.is_empty(), "ids 1 and 2 are no longer in the ring");
        assert_eq!(queue.stale_count(), 2);
    }

    #[test]
    fn sparse_ids_older_than_the_window_are_still_retired() {
        let mut queue = PresentQueue::<u64>::new();
        queue.post_present(PresentId(1), HostTime(10), HostTime(20), 1);
        queue.post_present(PresentId(40), HostTime(30), HostTime(40), 40);
        let mut source = Scripted::new(&[(40, 100)]);
        let retired = collect(&mut queue, &mut source);
        assert_eq!(
            retired,
            [
                (1, 1, PresentOutcome::Dropped),
                (40, 40, PresentOutcome::Completed(HostTime(100))),
            ]
        );
        // Ids 2..=39 were never posted.
        assert_eq!(queue.stale_count(), 38);
        assert_eq!(queue.in_flight(), 0);
    }

    #[test]
    fn exit_before_entry_is_an_anomaly() {
        let mut queue = PresentQueue::<u64>::new();
        queue.post_present(PresentId(1), HostTime(500), HostTime(600), 0);
        let mut source = Scripted::new(&[(1, 550)]);
        assert!(collect(&mut queue, &mut source).is_empty());
        assert_eq!(queue.anomaly_count(), 1);
        assert_eq!(queue.last_retrieved(), PresentId(1), "advances regardless");
    }

    #[test]
    fn source_error_propagates() {
        let mut queue = PresentQueue::<u64>::new();
        queue.post_present(PresentId(1), HostTime(1), HostTime(2), 0);
        let result = queue.retrieve_stats(&mut Failing, |_, _| {});
        assert_eq!(result, Err("device lost"));
        assert_eq!(queue.last_retrieved(), PresentId(0));
    }
}
