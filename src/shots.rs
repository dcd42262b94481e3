//! Pending still captures
//!
//! Capture completion and frame availability arrive on two unrelated
//! callback paths. Completions push the shot here, frames pop the oldest one.
//! Pairing is strictly by submission order; nothing correlates a frame with
//! the request that produced it.

use crate::errors::CameraError;
use crate::types::{CapturedImage, RequestId};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Receives the frame of one still capture, or the reason it failed
pub type ShotCallback = Box<dyn FnOnce(Result<CapturedImage, CameraError>) + Send + 'static>;

/// A completed capture waiting for its frame
pub struct PendingShot {
    pub request: RequestId,
    /// Sensor timestamp carried by the completion, when the platform gives one
    pub sensor_timestamp_ns: Option<i64>,
    callback: ShotCallback,
}

impl PendingShot {
    pub fn new(request: RequestId, sensor_timestamp_ns: Option<i64>, callback: ShotCallback) -> Self {
        Self {
            request,
            sensor_timestamp_ns,
            callback,
        }
    }

    pub fn resolve(self, result: Result<CapturedImage, CameraError>) {
        (self.callback)(result)
    }
}

impl std::fmt::Debug for PendingShot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingShot")
            .field("request", &self.request)
            .field("sensor_timestamp_ns", &self.sensor_timestamp_ns)
            .finish_non_exhaustive()
    }
}

/// Thread-safe FIFO of shots whose capture has completed
#[derive(Clone)]
pub struct ShotQueue {
    tx: Sender<PendingShot>,
    rx: Receiver<PendingShot>,
}

impl Default for ShotQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, shot: PendingShot) {
        // Both ends live in self, so the channel cannot be disconnected here.
        if let Err(e) = self.tx.send(shot) {
            log::error!("Shot queue rejected {:?}", e.into_inner());
        }
    }

    /// Oldest pending shot, if any
    pub fn pop(&self) -> Option<PendingShot> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Remove every pending shot, oldest first
    pub fn drain(&self) -> Vec<PendingShot> {
        self.rx.try_iter().collect()
    }

    pub fn frame_sink(&self) -> FrameSink {
        FrameSink {
            queue: self.clone(),
        }
    }
}

/// Entry point for "frame available" notifications.
///
/// Cloneable and callable from any thread; it never touches the session
/// controller.
#[derive(Clone)]
pub struct FrameSink {
    queue: ShotQueue,
}

impl FrameSink {
    /// Hand `image` to the oldest pending shot. The image is dropped when no
    /// shot is waiting. Returns whether a shot received it.
    pub fn deliver(&self, image: CapturedImage) -> bool {
        match self.queue.pop() {
            Some(shot) => {
                if let Some(expected) = shot.sensor_timestamp_ns {
                    if expected != image.timestamp_ns {
                        log::warn!(
                            "Frame timestamp {} does not match completion timestamp {} of {:?}; pairing by order",
                            image.timestamp_ns,
                            expected,
                            shot.request
                        );
                    }
                }
                log::debug!("Delivering {}x{} frame to {:?}", image.width, image.height, shot.request);
                shot.resolve(Ok(image));
                true
            }
            None => {
                log::debug!(
                    "No pending shot for frame at {}, releasing it",
                    image.timestamp_ns
                );
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageFormat, Size};
    use std::sync::mpsc;

    fn image(ts: i64) -> CapturedImage {
        CapturedImage::new(Size::new(4, 4), ImageFormat::Jpeg, ts, Vec::new())
    }

    #[test]
    fn test_fifo_pairing() {
        let queue = ShotQueue::new();
        let (tx, rx) = mpsc::channel();
        for i in 0..3u64 {
            let tx = tx.clone();
            queue.push(PendingShot::new(
                RequestId(i),
                None,
                Box::new(move |r| tx.send((i, r.map(|img| img.timestamp_ns))).unwrap()),
            ));
        }

        let sink = queue.frame_sink();
        for ts in [100, 200, 300] {
            assert!(sink.deliver(image(ts)));
        }

        let got: Vec<_> = rx.try_iter().map(|(i, r)| (i, r.unwrap())).collect();
        assert_eq!(got, vec![(0, 100), (1, 200), (2, 300)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_frame_without_shot_is_released() {
        let queue = ShotQueue::new();
        assert!(!queue.frame_sink().deliver(image(1)));
    }

    #[test]
    fn test_drain_returns_oldest_first() {
        let queue = ShotQueue::new();
        for i in 0..2 {
            queue.push(PendingShot::new(RequestId(i), None, Box::new(|_| {})));
        }
        let drained: Vec<_> = queue.drain().into_iter().map(|s| s.request).collect();
        assert_eq!(drained, vec![RequestId(0), RequestId(1)]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let queue = ShotQueue::new();
        let sink = queue.frame_sink();
        let (tx, rx) = mpsc::channel();

        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for i in 0..100u64 {
                    let tx = tx.clone();
                    queue.push(PendingShot::new(
                        RequestId(i),
                        None,
                        Box::new(move |r| tx.send((i, r.unwrap().timestamp_ns)).unwrap()),
                    ));
                }
            })
        };
        producer.join().unwrap();

        let consumer = std::thread::spawn(move || {
            for ts in 0..100i64 {
                assert!(sink.deliver(image(ts)));
            }
        });
        consumer.join().unwrap();

        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(got.len(), 100);
        for (i, ts) in got {
            assert_eq!(i as i64, ts);
        }
    }
}
