// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event records and their identity types.

use core::fmt;

use crate::time::HostTime;

/// Which pipeline stage an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Queue {
    /// Work recorded on the CPU (frame build, command recording).
    Cpu,
    /// Work executed on the GPU.
    Gpu,
    /// A present request, from submission until the display picks it up.
    Present,
    /// A vertical-sync marker (zero duration).
    Vsync,
    /// Caller-defined queue; ignored by the built-in layout.
    Custom(u32),
}

impl Queue {
    /// Short lowercase label for diagnostics output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Present => "present",
            Self::Vsync => "vsync",
            Self::Custom(_) => "custom",
        }
    }
}

/// Opaque caller-owned handle carried by every event.
///
/// The engine never interprets it; the visualization hands it back so the
/// caller can pick colors or labels.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTag(pub u32);

impl fmt::Debug for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventTag({})", self.0)
    }
}

/// How an event's interval ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventEnd {
    /// Still running; the end has not been recorded yet.
    Pending,
    /// Finished at the given time.
    Completed(HostTime),
    /// A present that left the queue without ever being displayed.
    Dropped,
}

/// One interval (or instant) on a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// Queue this event was recorded on.
    pub queue: Queue,
    /// Caller handle, passed through untouched.
    pub tag: EventTag,
    /// Links related events across queues (typically a frame number).
    pub correlation_id: u64,
    /// When the event began.
    pub start: HostTime,
    /// When (and whether) the event finished.
    pub end: EventEnd,
}

impl Event {
    /// Returns `true` once the end has been recorded (completed or dropped).
    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        !matches!(self.end, EventEnd::Pending)
    }

    /// Returns `true` if this is a present that was never displayed.
    #[inline]
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        matches!(self.end, EventEnd::Dropped)
    }

    /// The recorded end time, if the event completed normally.
    #[inline]
    #[must_use]
    pub const fn end_time(&self) -> Option<HostTime> {
        match self.end {
            EventEnd::Completed(t) => Some(t),
            EventEnd::Pending | EventEnd::Dropped => None,
        }
    }

    /// Duration in ticks for completed events.
    #[inline]
    #[must_use]
    pub const fn duration_ticks(&self) -> Option<u64> {
        match self.end {
            EventEnd::Completed(t) => Some(t.ticks().saturating_sub(self.start.ticks())),
            EventEnd::Pending | EventEnd::Dropped => None,
        }
    }
}

/// A handle to an event in an [`EventStream`](crate::stream::EventStream).
///
/// Contains both a slot index and a generation counter so that handles to
/// trimmed events are detected instead of aliasing a newer event that reused
/// the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl EventId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({}@gen{})", self.idx, self.generation)
    }
}
