// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeline visualization for [`vsyncscope_core`] event streams.
//!
//! This crate turns a window of recorded events into drawable geometry. It
//! defines:
//!
//! - [`VisualizationBuilder`] — lays out a vsync window as rectangles on four
//!   tracks (CPU, GPU, Present, Display) plus connector and vsync lines
//! - [`LayoutConfig`] — row sizes, search radius, connector and display
//!   policies, geometry limits
//! - [`tessellate`] — converts a [`Visualization`] into [`ColorVertex`]
//!   triangles and lines for a GPU vertex buffer
//!
//! Rendering itself (pipelines, shaders, text) is left to the caller.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod layout;
mod tessellate;

pub use layout::{
    ConnectorStyle, DisplayPolicy, LayoutConfig, RectFlags, Track, Visualization,
    VisualizationBuilder, VizRect,
};
pub use tessellate::{BLACK, ColorVertex, TessellationStats, VertexBuffer, shade, tessellate};
