// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] writes the events of an [`EventStream`] as
//! [Chrome Trace Event Format][spec] JSON, one thread per queue.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::collections::BTreeSet;
use std::io::{self, Write};

use serde_json::{Value, json};

use vsyncscope_core::event::{Event, EventEnd, Queue};
use vsyncscope_core::stream::EventStream;
use vsyncscope_core::time::TickRate;

/// Exports the stream as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// - completed events become `X` (complete) events on their queue's thread;
/// - dropped presents become zero-length `X` events with `"dropped": true`
///   in `args`;
/// - vsyncs become global instant events;
/// - pending events are skipped.
///
/// Timestamps are converted to microseconds using `rate`.
pub fn export(stream: &EventStream, rate: TickRate, writer: &mut dyn Write) -> io::Result<()> {
    let mut recorded: Vec<&Event> = stream.events_unordered().map(|(_, e)| e).collect();
    recorded.sort_by_key(|e| e.start);

    let mut threads = BTreeSet::new();
    let mut events: Vec<Value> = Vec::new();

    for e in recorded {
        let ts = rate.ticks_to_micros(e.start.ticks());
        match (e.queue, e.end) {
            (_, EventEnd::Pending) => {}
            (Queue::Vsync, _) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Vsync",
                    "cat": "Display",
                    "ts": ts,
                    "pid": 0,
                    "tid": thread_id(Queue::Vsync),
                    "s": "g",
                }));
            }
            (queue, EventEnd::Completed(end)) => {
                threads.insert(thread_id(queue));
                events.push(json!({
                    "ph": "X",
                    "name": event_name(e),
                    "cat": category(queue),
                    "ts": ts,
                    "dur": rate.ticks_to_micros(end.saturating_duration_since(e.start).ticks()),
                    "pid": 0,
                    "tid": thread_id(queue),
                    "args": {
                        "tag": e.tag.0,
                        "correlation_id": e.correlation_id,
                    }
                }));
            }
            (queue, EventEnd::Dropped) => {
                threads.insert(thread_id(queue));
                events.push(json!({
                    "ph": "X",
                    "name": event_name(e),
                    "cat": category(queue),
                    "ts": ts,
                    "dur": 0,
                    "pid": 0,
                    "tid": thread_id(queue),
                    "args": {
                        "tag": e.tag.0,
                        "correlation_id": e.correlation_id,
                        "dropped": true,
                    }
                }));
            }
        }
    }

    // Thread names go first so viewers label tracks before any slices.
    let names = threads.into_iter().map(|tid| {
        json!({
            "ph": "M",
            "name": "thread_name",
            "pid": 0,
            "tid": tid,
            "args": { "name": thread_name(tid) },
        })
    });
    let all: Vec<Value> = names.chain(events).collect();

    serde_json::to_writer_pretty(writer, &all)?;
    Ok(())
}

const CUSTOM_TID_BASE: u64 = 16;

fn thread_id(queue: Queue) -> u64 {
    match queue {
        Queue::Vsync => 0,
        Queue::Cpu => 1,
        Queue::Gpu => 2,
        Queue::Present => 3,
        Queue::Custom(n) => CUSTOM_TID_BASE + u64::from(n),
    }
}

fn thread_name(tid: u64) -> String {
    match tid {
        0 => "Vsync".into(),
        1 => "CPU".into(),
        2 => "GPU".into(),
        3 => "Present".into(),
        n => format!("Custom {}", n - CUSTOM_TID_BASE),
    }
}

fn category(queue: Queue) -> &'static str {
    match queue {
        Queue::Present | Queue::Vsync => "Display",
        _ => "Work",
    }
}

fn event_name(e: &Event) -> String {
    format!("{} #{}", e.queue.label(), e.correlation_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsyncscope_core::event::EventTag;
    use vsyncscope_core::time::HostTime;

    fn export_to_values(stream: &EventStream) -> Vec<Value> {
        let mut out = Vec::new();
        export(stream, TickRate::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        serde_json::from_str(&json_str).unwrap()
    }

    #[test]
    fn export_produces_valid_json() {
        let mut stream = EventStream::new();
        stream.vsync(HostTime(1_000_000));
        stream.insert_event(
            Queue::Cpu,
            HostTime(2_000_000),
            HostTime(6_000_000),
            EventTag(4),
            7,
        );
        let dropped = stream
            .start(Queue::Present, EventTag(5), 7, HostTime(6_000_000))
            .unwrap();
        stream.end_dropped(dropped);
        stream.start(Queue::Gpu, EventTag(0), 7, HostTime(6_500_000));

        let parsed = export_to_values(&stream);
        // Two thread names (CPU, Present), vsync, CPU slice, dropped present.
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0]["ph"], "M");
        assert_eq!(parsed[0]["args"]["name"], "CPU");
        assert_eq!(parsed[1]["args"]["name"], "Present");

        assert_eq!(parsed[2]["ph"], "i");
        assert_eq!(parsed[2]["name"], "Vsync");
        assert_eq!(parsed[2]["ts"], 1000.0);

        assert_eq!(parsed[3]["ph"], "X");
        assert_eq!(parsed[3]["name"], "cpu #7");
        assert_eq!(parsed[3]["dur"], 4000.0);
        assert_eq!(parsed[3]["args"]["tag"], 4);

        assert_eq!(parsed[4]["tid"], 3);
        assert_eq!(parsed[4]["args"]["dropped"], true);
    }

    #[test]
    fn empty_stream_exports_empty_array() {
        assert!(export_to_values(&EventStream::new()).is_empty());
    }

    #[test]
    fn custom_queues_get_their_own_thread() {
        let mut stream = EventStream::new();
        stream.insert_event(Queue::Custom(2), HostTime(10), HostTime(20), EventTag(0), 1);
        let parsed = export_to_values(&stream);
        assert_eq!(parsed[0]["args"]["name"], "Custom 2");
        assert_eq!(parsed[1]["tid"], 18);
    }
}
