// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event timeline and present-latency analysis for frame-pacing diagnostics.
//!
//! `vsyncscope_core` records what a render loop does (CPU work, GPU work,
//! present submissions, vertical syncs), reconciles asynchronous present
//! completions against display sync times, and keeps running latency
//! statistics. It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   render loop ──► Instrumentation::start / end / post_present
//!                        │                         │
//!                        ▼                         ▼
//!                   EventStream ◄──────────── PresentQueue
//!                        ▲          close,         ▲
//!                        │          vsync          │
//!                        │                   FrameStatisticsSource
//!                        │                         │
//!                        │                  LatencyStatistics ──► LatencyReport
//!                        ▼
//!   vsyncscope_render::VisualizationBuilder ──► rectangles + lines
//! ```
//!
//! **[`timeline`]** — Append-friendly multimap ordered by time, sorted lazily
//! on query.
//!
//! **[`stream`]** — Generational slab of [`Event`](event::Event)s indexed by
//! start time, with a vsync deque, pausing, and trimming.
//!
//! **[`present`]** — Ring-buffer reconciliation of present submissions with
//! display frame statistics.
//!
//! **[`latency`]** — Sliding-window jitter metrics and smoothed latency.
//!
//! **[`instrument`]** — The [`Instrumentation`](instrument::Instrumentation)
//! context tying the above together.
//!
//! **[`clock`]** / **[`time`]** — Monotonic tick types and clock sources.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types,
//! with zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod event;
pub mod instrument;
pub mod latency;
pub mod present;
pub mod stream;
pub mod time;
pub mod timeline;
pub mod trace;
