//! The per-link bounded, priority-ordered send queue (§4.2, §5: "Link
//! send queue: bounded, single writer task drains; producers use
//! non-blocking try-enqueue with backpressure signal").

use mesh_protocol::Priority;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("link send queue is full")]
    Full,
    #[error("link is closed")]
    Closed,
}

/// Four bounded channels, one per `Priority`, drained highest-first by
/// the write loop so urgent control traffic never queues behind bulk
/// data.
pub struct PriorityQueue {
    urgent: (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>),
    high: (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>),
    normal: (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>),
    low: (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>),
}

pub struct PriorityQueueSender {
    urgent: mpsc::Sender<Vec<u8>>,
    high: mpsc::Sender<Vec<u8>>,
    normal: mpsc::Sender<Vec<u8>>,
    low: mpsc::Sender<Vec<u8>>,
}

impl Clone for PriorityQueueSender {
    fn clone(&self) -> Self {
        PriorityQueueSender {
            urgent: self.urgent.clone(),
            high: self.high.clone(),
            normal: self.normal.clone(),
            low: self.low.clone(),
        }
    }
}

impl PriorityQueueSender {
    /// Non-blocking enqueue; signals backpressure by returning an error
    /// rather than awaiting room in the channel (§5 "non-blocking
    /// try-enqueue with backpressure signal").
    pub fn try_enqueue(&self, priority: Priority, frame: Vec<u8>) -> Result<(), EnqueueError> {
        let sender = match priority {
            Priority::Urgent => &self.urgent,
            Priority::High => &self.high,
            Priority::Normal => &self.normal,
            Priority::Low => &self.low,
        };
        sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

impl PriorityQueue {
    pub fn new(capacity_per_priority: usize) -> (PriorityQueueSender, Self) {
        let urgent = mpsc::channel(capacity_per_priority);
        let high = mpsc::channel(capacity_per_priority);
        let normal = mpsc::channel(capacity_per_priority);
        let low = mpsc::channel(capacity_per_priority);
        let handle = PriorityQueueSender {
            urgent: urgent.0.clone(),
            high: high.0.clone(),
            normal: normal.0.clone(),
            low: low.0.clone(),
        };
        (handle, PriorityQueue { urgent, high, normal, low })
    }

    /// Pull the next frame to send, preferring urgent, then high, normal,
    /// low. Returns `None` once every sender half has dropped.
    pub async fn recv_next(&mut self) -> Option<Vec<u8>> {
        loop {
            if let Ok(frame) = self.urgent.1.try_recv() {
                return Some(frame);
            }
            if let Ok(frame) = self.high.1.try_recv() {
                return Some(frame);
            }
            if let Ok(frame) = self.normal.1.try_recv() {
                return Some(frame);
            }
            if let Ok(frame) = self.low.1.try_recv() {
                return Some(frame);
            }
            tokio::select! {
                frame = self.urgent.1.recv() => return frame,
                frame = self.high.1.recv() => return frame,
                frame = self.normal.1.recv() => return frame,
                frame = self.low.1.recv() => return frame,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn urgent_frames_drain_before_lower_priorities() {
        let (sender, mut queue) = PriorityQueue::new(8);
        sender.try_enqueue(Priority::Low, b"low".to_vec()).unwrap();
        sender.try_enqueue(Priority::Urgent, b"urgent".to_vec()).unwrap();
        sender.try_enqueue(Priority::Normal, b"normal".to_vec()).unwrap();

        assert_eq!(queue.recv_next().await, Some(b"urgent".to_vec()));
        assert_eq!(queue.recv_next().await, Some(b"normal".to_vec()));
        assert_eq!(queue.recv_next().await, Some(b"low".to_vec()));
    }

    #[tokio::test]
    async fn full_queue_reports_backpressure_without_blocking() {
        let (sender, _queue) = PriorityQueue::new(1);
        sender.try_enqueue(Priority::Normal, b"a".to_vec()).unwrap();
        let err = sender.try_enqueue(Priority::Normal, b"b".to_vec()).unwrap_err();
        assert!(matches!(err, EnqueueError::Full));
    }
}
