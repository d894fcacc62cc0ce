// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated render loop that exercises the instrumentation pipeline.
//!
//! Runs 120 synthetic frames against a mailbox-style swapchain at 60 Hz. CPU
//! frame times cycle between fast frames (two presents land in one refresh,
//! so the older one is dropped) and a slow frame that misses a refresh.
//! Events go to both a
//! [`PrettyPrintSink`](vsyncscope_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](vsyncscope_debug::recorder::RecorderSink). At the end the
//! last few refreshes are laid out and tessellated, and the whole stream is
//! exported as a Chrome trace JSON file.

use std::convert::Infallible;
use std::fs::File;
use std::io::BufWriter;

use kurbo::Rect;

use vsyncscope_core::clock::{Clock, ManualClock};
use vsyncscope_core::event::{EventTag, Queue};
use vsyncscope_core::instrument::{Instrumentation, InstrumentationConfig};
use vsyncscope_core::latency::LatencyReport;
use vsyncscope_core::present::{FrameStatistics, FrameStatisticsSource, PresentId, PresentOutcome};
use vsyncscope_core::time::{Duration, HostTime, TickRate};
use vsyncscope_core::trace::{
    PresentPostedEvent, PresentQueueHealthEvent, PresentRetiredEvent, StaleHandleEvent, TraceSink,
    Tracer, TrimEvent,
};

use vsyncscope_debug::chrome;
use vsyncscope_debug::pretty::PrettyPrintSink;
use vsyncscope_debug::recorder::{RecordedEvent, RecorderSink, decode};

use vsyncscope_render::{LayoutConfig, Track, VertexBuffer, VisualizationBuilder, tessellate};

const FRAME_COUNT: u64 = 120;
/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: u64 = 16_666_667;
/// CPU time per frame, cycled.
const CPU_WORK_NS: [u64; 6] = [6_000_000, 9_000_000, 7_000_000, 24_000_000, 5_000_000, 8_000_000];
const GPU_WORK_NS: u64 = 3_000_000;
const PRESENT_CALL_NS: u64 = 500_000;
/// Refreshes shown in the final visualization.
const VISIBLE_VSYNCS: usize = 8;
const TRACE_PATH: &str = "vsyncscope_trace.json";

const TAG_RENDER: EventTag = EventTag(1);
const TAG_GPU: EventTag = EventTag(2);
const TAG_PRESENT: EventTag = EventTag(3);

// ---------------------------------------------------------------------------
// Simulated swapchain
// ---------------------------------------------------------------------------

/// Shows the newest submitted present at each refresh; older queued ones are
/// superseded.
#[derive(Default)]
struct MailboxSwapchain {
    queued: Option<PresentId>,
    stats: FrameStatistics,
}

impl MailboxSwapchain {
    fn submit(&mut self, id: PresentId) {
        self.queued = Some(id);
    }

    fn latch(&mut self, vsync: HostTime) {
        if let Some(id) = self.queued.take() {
            self.stats = FrameStatistics {
                present_count: id.0,
                sync_time: vsync,
            };
        }
    }
}

impl FrameStatisticsSource for MailboxSwapchain {
    type Error = Infallible;

    fn frame_statistics(&mut self) -> Result<FrameStatistics, Infallible> {
        Ok(self.stats)
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Forwards every event to both the console and the recorder.
struct DemoSink {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for DemoSink {
    fn on_present_posted(&mut self, e: &PresentPostedEvent) {
        self.pretty.on_present_posted(e);
        self.recorder.on_present_posted(e);
    }

    fn on_present_retired(&mut self, e: &PresentRetiredEvent) {
        self.pretty.on_present_retired(e);
        self.recorder.on_present_retired(e);
    }

    fn on_queue_health(&mut self, e: &PresentQueueHealthEvent) {
        self.pretty.on_queue_health(e);
        self.recorder.on_queue_health(e);
    }

    fn on_latency_sample(&mut self, r: &LatencyReport) {
        self.pretty.on_latency_sample(r);
        self.recorder.on_latency_sample(r);
    }

    fn on_trim(&mut self, e: &TrimEvent) {
        self.pretty.on_trim(e);
        self.recorder.on_trim(e);
    }

    fn on_stale_handle(&mut self, e: &StaleHandleEvent) {
        self.pretty.on_stale_handle(e);
        self.recorder.on_stale_handle(e);
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

struct Sim<'a> {
    clock: &'a ManualClock,
    instrumentation: Instrumentation<&'a ManualClock>,
    swapchain: MailboxSwapchain,
    next_vsync: HostTime,
}

impl Sim<'_> {
    /// Moves time forward, latching and reconciling at every refresh passed.
    fn advance(&mut self, by: Duration, tracer: &mut Tracer<'_>) {
        let target = self.clock.now() + by;
        while self.next_vsync <= target {
            self.clock.set(self.next_vsync);
            self.swapchain.latch(self.next_vsync);
            let Ok(_) = self
                .instrumentation
                .retire_presents(&mut self.swapchain, tracer);
            self.next_vsync = self.next_vsync + Duration(REFRESH_INTERVAL_NS);
        }
        self.clock.set(target);
    }
}

fn palette(tag: EventTag) -> u32 {
    match tag {
        TAG_RENDER => 0xff22_d429,
        TAG_GPU => 0xff00_00ff,
        TAG_PRESENT => 0xfffe_2e9a,
        _ => 0xff80_8080,
    }
}

fn main() {
    let rate = TickRate::NANOS;
    let clock = ManualClock::new(HostTime(1_000_000_000), rate); // start at 1s

    // -- sinks -------------------------------------------------------------
    let mut sink = DemoSink {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout()), rate),
        recorder: RecorderSink::new(),
    };
    let mut tracer = Tracer::new(&mut sink);

    // -- instrumentation ---------------------------------------------------
    let config = InstrumentationConfig {
        retained_vsyncs: 64,
        ..InstrumentationConfig::new()
    };
    let mut sim = Sim {
        clock: &clock,
        instrumentation: Instrumentation::new(&clock, config),
        swapchain: MailboxSwapchain::default(),
        next_vsync: clock.now() + Duration(REFRESH_INTERVAL_NS),
    };

    // -- simulated loop ----------------------------------------------------
    for (frame, &work) in (0..FRAME_COUNT).zip(CPU_WORK_NS.iter().cycle()) {
        let frame_begin = clock.now();
        let cpu = sim.instrumentation.start(Queue::Cpu, TAG_RENDER, frame);
        sim.advance(Duration(work), &mut tracer);
        if let Some(cpu) = cpu {
            sim.instrumentation.end(cpu, &mut tracer);
        }

        let gpu_start = clock.now();
        sim.instrumentation.insert_gpu_event(
            gpu_start,
            gpu_start + Duration(GPU_WORK_NS),
            TAG_GPU,
            frame,
        );

        let present_id = PresentId(frame + 1);
        sim.instrumentation
            .post_present(present_id, frame_begin, TAG_PRESENT, frame, &mut tracer);
        sim.swapchain.submit(present_id);
        sim.advance(Duration(PRESENT_CALL_NS), &mut tracer);

        if frame % 30 == 29 {
            sim.instrumentation.trim_history(&mut tracer);
        }
    }
    drop(tracer);

    // -- summary -----------------------------------------------------------
    let inst = &mut sim.instrumentation;
    let presents = inst.presents();
    println!(
        "\n{} events, {} vsyncs, overwritten={} stale={} anomalies={}",
        inst.stream().len(),
        inst.stream().vsync_count(),
        presents.overwritten_count(),
        presents.stale_count(),
        presents.anomaly_count(),
    );
    println!(
        "latency: avg={:.3}ms sd={:.3}ms spread={:.3}ms over {} samples",
        inst.smoothed_latency_ms().unwrap_or(0.0),
        inst.latency().evaluate_std_dev_metric(),
        inst.latency().evaluate_min_max_metric(),
        inst.latency().len(),
    );

    let recorded = decode(sink.recorder.as_bytes()).collect::<Vec<_>>();
    let dropped = recorded
        .iter()
        .filter(|e| {
            matches!(
                e,
                RecordedEvent::PresentRetired(r) if r.outcome == PresentOutcome::Dropped
            )
        })
        .count();
    println!(
        "recorded {} trace events ({} bytes), {dropped} dropped presents",
        recorded.len(),
        sink.recorder.as_bytes().len(),
    );

    // -- visualization -----------------------------------------------------
    let (first, last) = inst
        .stream()
        .last_vsync_window(VISIBLE_VSYNCS)
        .expect("simulation produced vsyncs");
    let mut builder = VisualizationBuilder::new();
    let viz = builder.build(
        inst.stream_mut(),
        first,
        last,
        Rect::new(0.0, 0.0, 1280.0, 720.0),
        &LayoutConfig::new(rate),
    );
    for track in Track::ALL {
        println!(
            "{track:?}: {} rectangles",
            viz.track_rectangles(track).len()
        );
    }
    println!(
        "{} connectors, {} vsync lines, truncated={}",
        viz.connectors.len(),
        viz.vsync_lines.len(),
        viz.truncated,
    );

    let mut vertices = VertexBuffer::new(64 * 1024);
    let stats = tessellate(viz, palette, &mut vertices);
    println!(
        "tessellated {} vertices ({} bytes): {:?} triangles, {:?} lines",
        vertices.len(),
        vertices.as_bytes().len(),
        stats.triangle_vertices(),
        stats.line_vertices(),
    );

    // -- chrome trace ------------------------------------------------------
    let file = File::create(TRACE_PATH).expect("failed to create trace file");
    let mut writer = BufWriter::new(file);
    chrome::export(inst.stream(), rate, &mut writer).expect("failed to write trace");
    println!("wrote {TRACE_PATH}");
}
