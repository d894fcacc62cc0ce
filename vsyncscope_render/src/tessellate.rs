// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex generation for a [`Visualization`].
//!
//! Output is a single bounded buffer of [`ColorVertex`] in draw order:
//!
//! 1. rectangle fills (triangle list)
//! 2. connector joints, 3×3 px squares at both ends of non-vertical
//!    connectors (triangle list)
//! 3. rectangle outlines (line list)
//! 4. connectors and vsync markers (line list)
//!
//! The triangle portion comes first, so a renderer issues one triangle-list
//! draw over [`TessellationStats::triangle_vertices`] and one line-list draw
//! over [`TessellationStats::line_vertices`].

use alloc::vec::Vec;
use core::ops::Range;

use bytemuck::{Pod, Zeroable};
use kurbo::{Line, Rect};

use vsyncscope_core::event::EventTag;

use crate::layout::{Visualization, VizRect};

/// Opaque black, `0xAABBGGRR`.
pub const BLACK: u32 = 0xff00_0000;

/// Screen-space vertex with a packed `0xAABBGGRR` color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    /// Horizontal position in pixels.
    pub x: f32,
    /// Vertical position in pixels (y down).
    pub y: f32,
    /// Packed color.
    pub rgba: u32,
}

impl ColorVertex {
    /// Creates a vertex.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, rgba: u32) -> Self {
        Self { x, y, rgba }
    }
}

/// Darkens a color to 7/8 of its brightness, forcing full alpha.
#[must_use]
pub const fn shade(rgba: u32) -> u32 {
    (((rgba >> 3) & 0x001f_1f1f) * 7) | BLACK
}

/// Fixed-capacity vertex storage.
#[derive(Clone, Debug)]
pub struct VertexBuffer {
    vertices: Vec<ColorVertex>,
    capacity: usize,
}

impl VertexBuffer {
    /// Creates a buffer holding at most `capacity` vertices.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of vertices.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of vertices written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if no vertices were written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Written vertices.
    #[must_use]
    pub fn vertices(&self) -> &[ColorVertex] {
        &self.vertices
    }

    /// Written vertices as raw bytes, ready for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Discards all vertices.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Appends a whole primitive, or nothing if it would not fit.
    fn push(&mut self, primitive: &[ColorVertex]) -> Option<()> {
        if self.vertices.len() + primitive.len() > self.capacity {
            return None;
        }
        self.vertices.extend_from_slice(primitive);
        Some(())
    }
}

/// What [`tessellate`] wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TessellationStats {
    /// Triangles filling rectangles.
    pub fill_triangles: usize,
    /// Triangles drawing connector joints.
    pub joint_triangles: usize,
    /// Segments outlining rectangles.
    pub outline_lines: usize,
    /// Connector and vsync segments.
    pub lines: usize,
    /// `true` if the buffer filled up before everything was written.
    pub truncated: bool,
}

impl TessellationStats {
    /// Vertex range to draw as a triangle list.
    #[must_use]
    pub fn triangle_vertices(&self) -> Range<usize> {
        0..3 * (self.fill_triangles + self.joint_triangles)
    }

    /// Vertex range to draw as a line list.
    #[must_use]
    pub fn line_vertices(&self) -> Range<usize> {
        let start = self.triangle_vertices().end;
        start..start + 2 * (self.outline_lines + self.lines)
    }
}

/// Writes `viz` into `out`, replacing its previous contents.
///
/// `palette` maps an event's tag to its fill color. Outlines, joints, and
/// lines are black. Emission stops at the first primitive that does not fit.
pub fn tessellate(
    viz: &Visualization,
    palette: impl Fn(EventTag) -> u32,
    out: &mut VertexBuffer,
) -> TessellationStats {
    out.clear();
    let mut stats = TessellationStats::default();
    if write_all(viz, &palette, out, &mut stats).is_none() {
        stats.truncated = true;
    }
    stats
}

fn write_all(
    viz: &Visualization,
    palette: &impl Fn(EventTag) -> u32,
    out: &mut VertexBuffer,
    stats: &mut TessellationStats,
) -> Option<()> {
    for r in &viz.rectangles {
        stats.fill_triangles += fill(out, r, palette(r.tag))?;
    }
    for line in &viz.connectors {
        stats.joint_triangles += joints(out, line)?;
    }
    for r in &viz.rectangles {
        stats.outline_lines += outline(out, r)?;
    }
    for line in viz.connectors.iter().chain(&viz.vsync_lines) {
        out.push(&[
            ColorVertex::new(px(line.p0.x), px(line.p0.y), BLACK),
            ColorVertex::new(px(line.p1.x), px(line.p1.y), BLACK),
        ])?;
        stats.lines += 1;
    }
    Some(())
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "vertex positions are f32 on the GPU"
)]
fn px(v: f64) -> f32 {
    v as f32
}

struct Corners {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl Corners {
    fn of(rect: Rect) -> Self {
        Self {
            left: px(rect.x0),
            top: px(rect.y0),
            right: px(rect.x1),
            bottom: px(rect.y1),
        }
    }

    fn mid_y(&self) -> f32 {
        0.5 * (self.top + self.bottom)
    }
}

/// Returns the number of triangles written.
fn fill(out: &mut VertexBuffer, r: &VizRect, rgba: u32) -> Option<usize> {
    let c = Corners::of(r.rect);
    let edge = shade(rgba);
    if r.flags.dropped {
        // A right-pointing notch: the present never made it to the screen.
        out.push(&[
            ColorVertex::new(c.left, c.bottom, rgba),
            ColorVertex::new(c.left, c.top, rgba),
            ColorVertex::new(c.right, c.mid_y(), edge),
        ])?;
        return Some(1);
    }
    out.push(&[
        ColorVertex::new(c.left, c.bottom, rgba),
        ColorVertex::new(c.left, c.top, rgba),
        ColorVertex::new(c.right, c.bottom, edge),
        ColorVertex::new(c.left, c.top, rgba),
        ColorVertex::new(c.right, c.bottom, edge),
        ColorVertex::new(c.right, c.top, edge),
    ])?;
    Some(2)
}

/// Returns the number of segments written.
fn outline(out: &mut VertexBuffer, r: &VizRect) -> Option<usize> {
    let c = Corners::of(r.rect);
    let v = |x, y| ColorVertex::new(x, y, BLACK);
    if r.flags.dropped {
        out.push(&[
            v(c.left, c.top),
            v(c.left, c.bottom),
            v(c.left, c.top),
            v(c.right, c.mid_y()),
            v(c.left, c.bottom),
            v(c.right, c.mid_y()),
        ])?;
        return Some(3);
    }
    out.push(&[
        v(c.left, c.top),
        v(c.right, c.top),
        v(c.right, c.top),
        v(c.right, c.bottom),
        v(c.right, c.bottom),
        v(c.left, c.bottom),
        v(c.left, c.bottom),
        v(c.left, c.top),
    ])?;
    Some(4)
}

/// Returns the number of triangles written.
fn joints(out: &mut VertexBuffer, line: &Line) -> Option<usize> {
    if line.p0.x == line.p1.x {
        return Some(0);
    }
    let square = |x: f32, y: f32| {
        let (l, r, t, b) = (x - 1.5, x + 1.5, y - 1.5, y + 1.5);
        [
            ColorVertex::new(l, b, BLACK),
            ColorVertex::new(l, t, BLACK),
            ColorVertex::new(r, b, BLACK),
            ColorVertex::new(l, t, BLACK),
            ColorVertex::new(r, b, BLACK),
            ColorVertex::new(r, t, BLACK),
        ]
    };
    let [a0, a1, a2, a3, a4, a5] = square(px(line.p0.x), px(line.p0.y));
    let [b0, b1, b2, b3, b4, b5] = square(px(line.p1.x), px(line.p1.y));
    // Both ends or neither.
    out.push(&[a0, a1, a2, a3, a4, a5, b0, b1, b2, b3, b4, b5])?;
    Some(4)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
