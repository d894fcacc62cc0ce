// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeline layout: turns a vsync window of recorded events into geometry.
//!
//! The visualization has four tracks, top to bottom:
//!
//! ```text
//!   ┌ CPU ──────── [frame 7]──────[frame 8]──────────────┐   linear
//!   ├ GPU ────────────[7]──────────[8]───────────────────┤   linear
//!   ├ Present ┊ [6]      ┊ [7]      ┊ [8]      ┊         │   stacked per
//!   │         ┊ [7]      ┊ [8]      ┊          ┊         │   vsync interval
//!   ├ Display ┊          ┊ [7]      ┊ [8]      ┊         │   one row
//!   └─────────┴──────────┴──────────┴──────────┴─────────┘
//!             vsync      vsync      vsync      vsync
//! ```
//!
//! CPU and GPU events are drawn over their own interval in a single row.
//! Present events are scattered into every vsync interval they overlap and
//! stacked within it, newest at the bottom next to the Display row. The
//! Display row shows, for each interval, the present considered on screen
//! during it. Connector lines join rectangles that share a correlation id.

use alloc::vec::Vec;
use core::ops::Range;

use hashbrown::HashMap;
use kurbo::{Line, Point, Rect};

use vsyncscope_core::event::{Event, EventEnd, EventId, EventTag, Queue};
use vsyncscope_core::stream::EventStream;
use vsyncscope_core::time::{Duration, HostTime, TickRate};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Which track a rectangle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Track {
    /// CPU work, one row.
    Cpu,
    /// GPU work, one row.
    Gpu,
    /// Queued presents, stacked per vsync interval.
    Present,
    /// The present on screen during each interval.
    Display,
}

impl Track {
    /// All tracks, top to bottom.
    pub const ALL: [Self; 4] = [Self::Cpu, Self::Gpu, Self::Present, Self::Display];

    const fn index(self) -> usize {
        match self {
            Self::Cpu => 0,
            Self::Gpu => 1,
            Self::Present => 2,
            Self::Display => 3,
        }
    }
}

/// Per-rectangle markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RectFlags {
    /// The rectangle is where the event "happens" in this track: the whole
    /// event for linear tracks, the interval containing its start for the
    /// Present track, the first interval after leaving the queue for Display.
    pub primary: bool,
    /// The event is a present that was never displayed.
    pub dropped: bool,
}

/// One laid-out rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VizRect {
    /// Pixel-space rectangle.
    pub rect: Rect,
    /// Track it was placed on.
    pub track: Track,
    /// Source event.
    pub event: EventId,
    /// Caller tag of the source event.
    pub tag: EventTag,
    /// Correlation id of the source event.
    pub correlation_id: u64,
    /// Primary / dropped markers.
    pub flags: RectFlags,
    /// 1-based count of rectangles produced so far for this correlation id
    /// across the Present and Display tracks; 0 on linear tracks.
    pub sequence: u32,
}

/// Geometry produced by [`VisualizationBuilder::build`].
#[derive(Clone, Debug, Default)]
pub struct Visualization {
    /// Rectangles, grouped by track in top-to-bottom order.
    pub rectangles: Vec<VizRect>,
    /// Lines joining related rectangles.
    pub connectors: Vec<Line>,
    /// One vertical line per vsync in the window.
    pub vsync_lines: Vec<Line>,
    /// `true` if geometry limits cut the output short.
    pub truncated: bool,
    tracks: [Rect; 4],
    ranges: [Range<usize>; 4],
}

impl Visualization {
    /// Returns `true` if nothing was laid out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rectangles.is_empty() && self.connectors.is_empty() && self.vsync_lines.is_empty()
    }

    /// Rectangles on one track.
    #[must_use]
    pub fn track_rectangles(&self, track: Track) -> &[VizRect] {
        &self.rectangles[self.ranges[track.index()].clone()]
    }

    /// Pixel bounds of one track (zero-sized when nothing was laid out).
    #[must_use]
    pub fn track_bounds(&self, track: Track) -> Rect {
        self.tracks[track.index()]
    }

    /// Union of all track bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.tracks[0].union(self.tracks[3])
    }

    fn clear(&mut self) {
        self.rectangles.clear();
        self.connectors.clear();
        self.vsync_lines.clear();
        self.truncated = false;
        self.tracks = [Rect::ZERO; 4];
        self.ranges = [0..0, 0..0, 0..0, 0..0];
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How connector lines are routed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectorStyle {
    /// One segment between rectangle centers.
    #[default]
    Straight,
    /// Vertical, horizontal, vertical through the midpoint height.
    Staircase,
}

/// Which present the Display row shows for an interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayPolicy {
    /// The newest present of the previous interval's stack; nothing after an
    /// empty interval.
    #[default]
    MostRecent,
    /// The oldest present of the previous interval's stack (the queue head);
    /// after an empty interval the last shown present is held, without the
    /// primary flag.
    QueueHead,
}

/// Layout parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Height of one row in pixels.
    pub row_height: f64,
    /// Gap between tracks, and horizontal inset from the screen edges.
    pub padding: f64,
    /// How far outside the window events are searched for, so long events
    /// that started earlier are still found.
    pub search_radius: Duration,
    /// Connector routing.
    pub connector_style: ConnectorStyle,
    /// Display row selection.
    pub display_policy: DisplayPolicy,
    /// Rectangles beyond this are not emitted.
    pub max_rectangles: usize,
    /// Lines (connector segments plus vsync lines) beyond this are not
    /// emitted.
    pub max_lines: usize,
}

impl LayoutConfig {
    /// Defaults for a clock running at `rate`: 33 px rows and padding, a
    /// quarter-second search radius.
    #[must_use]
    pub const fn new(rate: TickRate) -> Self {
        Self {
            row_height: 33.0,
            padding: 33.0,
            search_radius: Duration(rate.ticks_per_second() / 4),
            connector_style: ConnectorStyle::Straight,
            display_policy: DisplayPolicy::MostRecent,
            max_rectangles: 4096,
            max_lines: 8192,
        }
    }

    /// Same as [`new`](Self::new) with compact 16 px rows for small
    /// overlays.
    #[must_use]
    pub const fn compact(rate: TickRate) -> Self {
        Self {
            row_height: 16.0,
            padding: 8.0,
            ..Self::new(rate)
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Lays out visualizations, reusing its buffers from call to call.
#[derive(Debug, Default)]
pub struct VisualizationBuilder {
    cpu: Vec<(EventId, Event)>,
    gpu: Vec<(EventId, Event)>,
    present: Vec<(EventId, Event)>,
    vsync_times: Vec<HostTime>,
    /// Per vsync interval, indices into `present` in start order.
    stacks: Vec<Vec<usize>>,
    sequence: HashMap<u64, u32>,
    out: Visualization,
}

impl VisualizationBuilder {
    /// Creates a builder with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent result.
    #[must_use]
    pub fn visualization(&self) -> &Visualization {
        &self.out
    }

    /// Lays out vsyncs `first..=last` of `stream` into `screen`.
    ///
    /// Degenerate requests (an empty stream, `last <= first`, or an index
    /// past the stored vsyncs) produce an empty visualization.
    pub fn build(
        &mut self,
        stream: &mut EventStream,
        first: usize,
        last: usize,
        screen: Rect,
        config: &LayoutConfig,
    ) -> &Visualization {
        self.out.clear();
        self.cpu.clear();
        self.gpu.clear();
        self.present.clear();
        self.vsync_times.clear();
        self.sequence.clear();

        let count = stream.vsync_count();
        if stream.is_empty() || last <= first || first >= count || last >= count {
            return &self.out;
        }
        let (Some(start), Some(end)) = (stream.vsync_time(first), stream.vsync_time(last)) else {
            return &self.out;
        };

        self.collect(stream, start, end, config.search_radius);

        let left = screen.x0 + config.padding;
        let right = screen.x1 - config.padding;
        let axis = TimeAxis {
            start,
            left,
            px_per_tick: (right - left + 1.0) / ((end.ticks() - start.ticks()) as f64 + 1.0),
        };

        let h = config.row_height;
        let mut emit = Emitter {
            out: &mut self.out,
            max_rectangles: config.max_rectangles,
            max_lines: config.max_lines,
        };

        let mut y = screen.y0;
        let cpu_row = Rect::new(left, y, right, y + h);
        y += h + config.padding;
        let gpu_row = Rect::new(left, y, right, y + h);
        y += h + config.padding;

        let rows = compute_stacks(&self.present, &self.vsync_times, &mut self.stacks);
        let present_track = Rect::new(left, y, right, y + rows as f64 * h);
        y = present_track.y1 + config.padding;
        let display_row = Rect::new(left, y, right, y + h);

        emit.out.tracks = [cpu_row, gpu_row, present_track, display_row];

        // Vsync markers span every track.
        for &t in &self.vsync_times {
            let x = axis.x(t);
            emit.vsync_line(Line::new((x, cpu_row.y0), (x, display_row.y1)));
        }

        let cpu = emit.track(Track::Cpu, |emit| {
            layout_linear(emit, Track::Cpu, &self.cpu, &axis, end, cpu_row);
        });
        let gpu = emit.track(Track::Gpu, |emit| {
            layout_linear(emit, Track::Gpu, &self.gpu, &axis, end, gpu_row);
        });
        let intervals = Intervals {
            events: &self.present,
            stacks: &self.stacks,
            vsyncs: &self.vsync_times,
            axis,
        };
        let sequence = &mut self.sequence;
        let present = emit.track(Track::Present, |emit| {
            layout_stacked(emit, sequence, &intervals, present_track, h);
        });
        let display = emit.track(Track::Display, |emit| {
            layout_display(emit, sequence, &intervals, display_row, config.display_policy);
        });

        let style = config.connector_style;
        emit.connect(cpu.clone(), gpu, true, style);
        emit.connect(cpu, present.clone(), true, style);
        emit.connect(present.clone(), present.clone(), false, style);
        emit.connect(present, display, false, style);

        &self.out
    }

    fn collect(
        &mut self,
        stream: &mut EventStream,
        start: HostTime,
        end: HostTime,
        radius: Duration,
    ) {
        let lo = start.saturating_sub(radius);
        let hi = end.saturating_add(radius);
        for (id, event) in stream.events_between(lo, hi) {
            let Some(extent_end) = extent_end(event) else {
                continue;
            };
            if !intervals_intersect(start, end, event.start, extent_end) {
                continue;
            }
            match event.queue {
                Queue::Cpu => self.cpu.push((id, *event)),
                Queue::Gpu => self.gpu.push((id, *event)),
                Queue::Present => self.present.push((id, *event)),
                Queue::Vsync => self.vsync_times.push(event.start),
                Queue::Custom(_) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Maps host time to x coordinates.
#[derive(Clone, Copy, Debug)]
struct TimeAxis {
    start: HostTime,
    left: f64,
    px_per_tick: f64,
}

impl TimeAxis {
    fn x(&self, t: HostTime) -> f64 {
        let delta = i128::from(t.ticks()) - i128::from(self.start.ticks());
        self.left + self.px_per_tick * delta as f64
    }
}

/// Appends geometry while respecting the configured limits.
struct Emitter<'a> {
    out: &'a mut Visualization,
    max_rectangles: usize,
    max_lines: usize,
}

impl Emitter<'_> {
    fn rect(&mut self, r: VizRect) {
        if self.out.rectangles.len() >= self.max_rectangles {
            self.out.truncated = true;
            return;
        }
        self.out.rectangles.push(r);
    }

    fn vsync_line(&mut self, line: Line) {
        if self.lines_used() >= self.max_lines {
            self.out.truncated = true;
            return;
        }
        self.out.vsync_lines.push(line);
    }

    /// Emits all of `segments` or none of them.
    fn connector(&mut self, segments: &[Line]) {
        if self.lines_used() + segments.len() > self.max_lines {
            self.out.truncated = true;
            return;
        }
        self.out.connectors.extend_from_slice(segments);
    }

    fn lines_used(&self) -> usize {
        self.out.connectors.len() + self.out.vsync_lines.len()
    }

    fn track(&mut self, track: Track, f: impl FnOnce(&mut Self)) -> Range<usize> {
        let begin = self.out.rectangles.len();
        f(self);
        let range = begin..self.out.rectangles.len();
        self.out.ranges[track.index()] = range.clone();
        range
    }

    /// Joins rectangles in `from` to rectangles in `to` that share a
    /// correlation id and sit next to each other in sequence.
    ///
    /// Rectangles are only paired forward (`j >= i`) so each pair is joined
    /// once when `from` and `to` are the same range.
    fn connect(
        &mut self,
        from: Range<usize>,
        to: Range<usize>,
        primary_only: bool,
        style: ConnectorStyle,
    ) {
        for i in from {
            for j in i.max(to.start)..to.end {
                let a = self.out.rectangles[i];
                let b = self.out.rectangles[j];
                if a.correlation_id != b.correlation_id {
                    continue;
                }
                if primary_only && !(a.flags.primary && b.flags.primary) {
                    continue;
                }
                if !sequences_adjacent(a.sequence, b.sequence) {
                    continue;
                }
                let (p0, p1) = (a.rect.center(), b.rect.center());
                match style {
                    ConnectorStyle::Straight => self.connector(&[Line::new(p0, p1)]),
                    ConnectorStyle::Staircase => {
                        let mid = 0.5 * (p0.y + p1.y);
                        self.connector(&[
                            Line::new(p0, Point::new(p0.x, mid)),
                            Line::new(Point::new(p0.x, mid), Point::new(p1.x, mid)),
                            Line::new(Point::new(p1.x, mid), p1),
                        ]);
                    }
                }
            }
        }
    }
}

/// Linear rectangles (sequence 0) pair with each other; otherwise the two
/// rectangles must be consecutive in their correlation id's sequence.
fn sequences_adjacent(a: u32, b: u32) -> bool {
    (a == 0 && b == 0) || a.abs_diff(b) == 1
}

/// Closed-interval overlap test.
fn intervals_intersect(a: HostTime, b: HostTime, c: HostTime, d: HostTime) -> bool {
    !(b < c || a > d)
}

/// End of an event for window selection. Dropped presents never left the
/// queue, so they extend indefinitely; pending events are not drawn.
fn extent_end(event: &Event) -> Option<HostTime> {
    match event.end {
        EventEnd::Pending => None,
        EventEnd::Completed(t) => Some(t),
        EventEnd::Dropped => Some(HostTime::MAX),
    }
}

fn layout_linear(
    emit: &mut Emitter<'_>,
    track: Track,
    events: &[(EventId, Event)],
    axis: &TimeAxis,
    window_end: HostTime,
    row: Rect,
) {
    for (id, event) in events {
        let end = event.end_time().unwrap_or(window_end);
        emit.rect(VizRect {
            rect: Rect::new(axis.x(event.start), row.y0, axis.x(end), row.y1),
            track,
            event: *id,
            tag: event.tag,
            correlation_id: event.correlation_id,
            flags: RectFlags {
                primary: true,
                dropped: event.is_dropped(),
            },
            sequence: 0,
        });
    }
}

/// Scatters presents into the vsync intervals they overlap and returns the
/// deepest stack.
///
/// Interval `i` is `[vsyncs[i], vsyncs[i + 1])`. A dropped present occupies
/// only the interval containing its start.
fn compute_stacks(
    events: &[(EventId, Event)],
    vsyncs: &[HostTime],
    stacks: &mut Vec<Vec<usize>>,
) -> usize {
    let intervals = vsyncs.len().saturating_sub(1);
    stacks.resize_with(intervals, Vec::new);
    for stack in stacks.iter_mut() {
        stack.clear();
    }

    let mut deepest = 0;
    for (n, (_, event)) in events.iter().enumerate() {
        let s = event.start;
        let e = event.end_time().unwrap_or(s);
        let first = vsyncs.partition_point(|v| *v < s).saturating_sub(1);
        let last = vsyncs.partition_point(|v| *v <= e).min(intervals);
        for i in first..last {
            let (lo, hi) = (vsyncs[i], vsyncs[i + 1]);
            let occupies = if s == e {
                lo <= s && s < hi
            } else {
                lo < e && hi > s
            };
            if occupies {
                stacks[i].push(n);
                deepest = deepest.max(stacks[i].len());
            }
        }
    }
    deepest
}

/// Presents scattered over the vsync intervals of the window.
struct Intervals<'a> {
    events: &'a [(EventId, Event)],
    stacks: &'a [Vec<usize>],
    vsyncs: &'a [HostTime],
    axis: TimeAxis,
}

impl Intervals<'_> {
    fn bounds(&self, i: usize) -> (HostTime, HostTime) {
        (self.vsyncs[i], self.vsyncs[i + 1])
    }
}

fn bump(sequence: &mut HashMap<u64, u32>, correlation_id: u64) -> u32 {
    let seq = sequence.entry(correlation_id).or_insert(0);
    *seq += 1;
    *seq
}

fn layout_stacked(
    emit: &mut Emitter<'_>,
    sequence: &mut HashMap<u64, u32>,
    intervals: &Intervals<'_>,
    track: Rect,
    row_height: f64,
) {
    let axis = &intervals.axis;
    for (i, stack) in intervals.stacks.iter().enumerate() {
        let (lo, hi) = intervals.bounds(i);
        // Newest at the bottom, older presents above it.
        for (row, &n) in stack.iter().rev().enumerate() {
            let (id, event) = &intervals.events[n];
            let block_start = event.start.max(lo);
            let block_end = event.end_time().unwrap_or(hi).min(hi);
            let y1 = track.y1 - row as f64 * row_height;
            emit.rect(VizRect {
                rect: Rect::new(axis.x(block_start), y1 - row_height, axis.x(block_end), y1),
                track: Track::Present,
                event: *id,
                tag: event.tag,
                correlation_id: event.correlation_id,
                flags: RectFlags {
                    primary: lo <= event.start && event.start < hi,
                    dropped: event.is_dropped(),
                },
                sequence: bump(sequence, event.correlation_id),
            });
        }
    }
}

fn layout_display(
    emit: &mut Emitter<'_>,
    sequence: &mut HashMap<u64, u32>,
    intervals: &Intervals<'_>,
    row: Rect,
    policy: DisplayPolicy,
) {
    let axis = &intervals.axis;
    let mut shown: Option<usize> = None;
    let mut fresh = false;
    for (i, stack) in intervals.stacks.iter().enumerate() {
        if let Some(n) = shown {
            let (id, event) = &intervals.events[n];
            let (lo, hi) = intervals.bounds(i);
            emit.rect(VizRect {
                rect: Rect::new(axis.x(lo), row.y0, axis.x(hi), row.y1),
                track: Track::Display,
                event: *id,
                tag: event.tag,
                correlation_id: event.correlation_id,
                flags: RectFlags {
                    primary: fresh,
                    dropped: false,
                },
                sequence: bump(sequence, event.correlation_id),
            });
            fresh = false;
        }
        match policy {
            DisplayPolicy::MostRecent => {
                shown = stack.last().copied();
                fresh = shown.is_some();
            }
            DisplayPolicy::QueueHead => {
                if let Some(&head) = stack.first() {
                    shown = Some(head);
                    fresh = true;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
