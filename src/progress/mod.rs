//! Progress event plumbing between transfer workers and one consumer.
//!
//! Workers never touch the presentation layer directly; they push events
//! into an mpsc channel and a single consumer loop drains the receiver.
//! Per-producer enqueue order is preserved. Cross-task interleaving
//! carries no guarantee, so consumers must key their state by `task_id`.

pub mod bar;

use std::sync::mpsc::{channel, Receiver, Sender};

/// One progress observation for a task.
///
/// Within a task, `bytes` is cumulative and never decreases. Exactly one
/// event per task has `terminal == true`; its `message` says how the task
/// ended in human-readable form.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub task_id: u64,
    pub bytes: u64,
    /// Total size when the source reports one; chunked sources may not.
    pub total: Option<u64>,
    pub message: String,
    pub terminal: bool,
}

/// Cloneable producer handle for transfer workers.
///
/// Sends are infallible from the worker's point of view: if the consumer
/// has gone away there is nobody left to show progress to, so events are
/// silently dropped.
#[derive(Clone)]
pub struct ProgressReporter {
    tx: Sender<ProgressEvent>,
}

/// Create a reporter and the receiver its events arrive on.
///
/// The channel closes once every reporter clone has been dropped, which
/// is how the consumer loop knows the batch is over.
pub fn progress_channel() -> (ProgressReporter, Receiver<ProgressEvent>) {
    let (tx, rx) = channel();
    (ProgressReporter { tx }, rx)
}

impl ProgressReporter {
    /// Report cumulative bytes moved so far for a task.
    pub fn transferred(&self, task_id: u64, bytes: u64, total: Option<u64>) {
        let _ = self.tx.send(ProgressEvent {
            task_id,
            bytes,
            total,
            message: String::new(),
            terminal: false,
        });
    }

    /// Report successful completion. Emitted exactly once per task.
    pub fn finished(&self, task_id: u64, bytes: u64, message: String) {
        let _ = self.tx.send(ProgressEvent {
            task_id,
            bytes,
            total: Some(bytes),
            message,
            terminal: true,
        });
    }

    /// Report failure. Emitted exactly once per failing task.
    pub fn failed(&self, task_id: u64, bytes: u64, message: String) {
        let _ = self.tx.send(ProgressEvent {
            task_id,
            bytes,
            total: None,
            message,
            terminal: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn events_arrive_in_producer_order() {
        let (reporter, rx) = progress_channel();
        reporter.transferred(1, 10, Some(30));
        reporter.transferred(1, 20, Some(30));
        reporter.finished(1, 30, "done".to_string());
        drop(reporter);

        let events: Vec<ProgressEvent> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().map(|e| e.bytes).collect::<Vec<_>>(),
            vec![10, 20, 30]
        );
        assert!(events[2].terminal);
        assert_eq!(events[2].message, "done");
    }

    #[test]
    fn channel_closes_when_all_reporters_drop() {
        let (reporter, rx) = progress_channel();
        let clone = reporter.clone();
        drop(reporter);
        clone.transferred(7, 1, None);
        drop(clone);

        let events: Vec<ProgressEvent> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].task_id, 7);
    }

    #[test]
    fn concurrent_producers_deliver_every_event() {
        let (reporter, rx) = progress_channel();
        let mut handles = Vec::new();
        for task_id in 0..4u64 {
            let reporter = reporter.clone();
            handles.push(thread::spawn(move || {
                for i in 1..=25u64 {
                    reporter.transferred(task_id, i, Some(25));
                }
                reporter.finished(task_id, 25, "done".to_string());
            }));
        }
        drop(reporter);
        for handle in handles {
            handle.join().unwrap();
        }

        let mut last_bytes = std::collections::HashMap::new();
        let mut terminals = 0;
        let mut count = 0;
        for event in rx.iter() {
            count += 1;
            // Per task, bytes are monotone even though tasks interleave
            let last = last_bytes.entry(event.task_id).or_insert(0u64);
            assert!(event.bytes >= *last, "task {} regressed", event.task_id);
            *last = event.bytes;
            if event.terminal {
                terminals += 1;
            }
        }
        assert_eq!(count, 4 * 26);
        assert_eq!(terminals, 4);
    }

    #[test]
    fn send_after_receiver_drop_is_ignored() {
        let (reporter, rx) = progress_channel();
        drop(rx);
        // Must not panic
        reporter.transferred(1, 1, None);
        reporter.failed(1, 1, "gone".to_string());
    }
}
