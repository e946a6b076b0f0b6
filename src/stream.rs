//! The merged line stream shared by both consoles.
//!
//! Line sources publish into an unbounded multi-producer queue; the active
//! classifier pulls from it one phase at a time. The only place a classifier
//! ever waits is [`PhaseLines::next`], a timed receive whose countdown restarts
//! on every call.

use crate::line::LogLine;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Create the queue: a clone-able producer side and the single consumer.
pub fn merged_queue() -> (LineSender, MergedStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LineSender { tx }, MergedStream { rx, delivered: 0 })
}

/// Producer handle held by each line source.
#[derive(Debug, Clone)]
pub struct LineSender {
    tx: mpsc::UnboundedSender<LogLine>,
}

impl LineSender {
    /// Publish a line. Returns `false` once the consumer is gone.
    pub fn publish(&self, line: LogLine) -> bool {
        self.tx.send(line).is_ok()
    }
}

/// Consumer side of the merged queue.
#[derive(Debug)]
pub struct MergedStream {
    rx: mpsc::UnboundedReceiver<LogLine>,
    delivered: u64,
}

impl MergedStream {
    /// Start iterating for one phase with its own inactivity timeout.
    ///
    /// Lines still queued from an earlier phase are delivered first; lines an
    /// earlier phase already took are gone.
    pub fn phase(&mut self, name: &'static str, timeout: Duration) -> PhaseLines<'_> {
        debug!(phase = name, ?timeout, "phase started consuming the merged stream");
        PhaseLines {
            stream: self,
            name,
            timeout,
            consumed: 0,
            end: None,
        }
    }

    /// Total number of lines handed to classifiers so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// One step of a phase iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// The next line in arrival order.
    Line(LogLine),
    /// Nothing arrived within the phase's inactivity timeout.
    Timeout(Duration),
    /// Every line source has gone away and the queue is drained.
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum End {
    Timeout,
    Closed,
}

/// Forward-only view of the merged stream for a single phase.
///
/// Once it has yielded `Timeout` or `Closed` it keeps yielding the same item.
#[derive(Debug)]
pub struct PhaseLines<'a> {
    stream: &'a mut MergedStream,
    name: &'static str,
    timeout: Duration,
    consumed: u64,
    end: Option<End>,
}

impl PhaseLines<'_> {
    /// Wait for the next line, or for the inactivity timeout to elapse.
    pub async fn next(&mut self) -> StreamItem {
        match self.end {
            Some(End::Timeout) => return StreamItem::Timeout(self.timeout),
            Some(End::Closed) => return StreamItem::Closed,
            None => {}
        }

        // `recv` is cancel safe: a timeout never drops a queued line.
        match tokio::time::timeout(self.timeout, self.stream.rx.recv()).await {
            Ok(Some(line)) => {
                self.consumed += 1;
                self.stream.delivered += 1;
                StreamItem::Line(line)
            }
            Ok(None) => {
                debug!(phase = self.name, consumed = self.consumed, "merged stream closed");
                self.end = Some(End::Closed);
                StreamItem::Closed
            }
            Err(_) => {
                debug!(
                    phase = self.name,
                    consumed = self.consumed,
                    timeout = ?self.timeout,
                    "inactivity timeout"
                );
                self.end = Some(End::Timeout);
                StreamItem::Timeout(self.timeout)
            }
        }
    }

    /// Lines taken by this phase so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}
