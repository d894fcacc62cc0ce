// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, and Chrome trace export for vsyncscope
//! diagnostics.
//!
//! This crate provides [`TraceSink`](vsyncscope_core::trace::TraceSink)
//! implementations and exporters for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`] — writes an
//!   [`EventStream`](vsyncscope_core::stream::EventStream) as Chrome Trace
//!   Event Format JSON.

pub mod chrome;
pub mod pretty;
pub mod recorder;
