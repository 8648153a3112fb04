// Bounded playback queue between the scheduler and the playback consumer.

use tokio::sync::mpsc;

use crate::SessionError;
use crate::segment::SegmentContent;

/// Creates the queue. A capacity of 0 is raised to 1.
pub fn playback_queue(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueProducer { tx }, QueueConsumer { rx })
}

/// Scheduler side of the queue.
#[derive(Debug)]
pub struct QueueProducer {
    tx: mpsc::Sender<SegmentContent>,
}

impl QueueProducer {
    /// Waits for a free slot, then enqueues `content`.
    pub async fn push(&self, content: SegmentContent) -> Result<(), SessionError> {
        self.tx
            .send(content)
            .await
            .map_err(|_| SessionError::ConsumerGone)
    }

    /// Items currently buffered and not yet taken by the consumer.
    pub fn occupancy(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Playback side of the queue.
#[derive(Debug)]
pub struct QueueConsumer {
    rx: mpsc::Receiver<SegmentContent>,
}

impl QueueConsumer {
    /// Next item, or `None` once the scheduler has finished and the queue is drained.
    ///
    /// A `None` not preceded by an end-of-stream item means the session failed.
    pub async fn recv(&mut self) -> Option<SegmentContent> {
        self.rx.recv().await
    }

    /// Blocking variant for consumers running on plain threads.
    /// Panics if called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<SegmentContent> {
        self.rx.blocking_recv()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
