// # Frame Ring Module
//
// Keeps the most recent captures in memory so a recorder can save the last
// few seconds on demand.
//
// ## Overview
//
// - **Producer**: the capture loop pushes every frame as it arrives
// - **Ring**: holds at most `capacity` frames, evicting the oldest
// - **Consumer**: on save, the ring is drained into an encoding pipeline
//
// ```text
// ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
// │  Capture loop   │───▶│    FrameRing    │───▶│    Pipeline     │
// │    (push)       │    │  oldest..newest │    │  (drain_into)   │
// └─────────────────┘    └─────────────────┘    └─────────────────┘
// ```

use std::collections::VecDeque;
use std::io::Write;

use tracing::debug;

use crate::core::frame::Capture;
use crate::error::GifResult;
use crate::processing::Pipeline;

/// Default number of frames kept (5 seconds at the 200 ms capture interval).
pub const DEFAULT_RING_CAPACITY: usize = 25;

/// Fixed-capacity FIFO of recent captures.
///
/// # Examples
///
/// ```rust
/// use std::time::SystemTime;
/// use gif_capture::core::{frame::Capture, ring_buffer::FrameRing};
///
/// let mut ring = FrameRing::new(2);
/// for i in 0..3u32 {
///     ring.push(Capture::new(vec![0xFF00_0000 | i], 1, 1, SystemTime::now()));
/// }
/// assert_eq!(ring.status(), (2, 2));
/// assert_eq!(ring.iter().next().unwrap().pixels[0], 0xFF00_0001);
/// ```
#[derive(Debug)]
pub struct FrameRing {
    frames: VecDeque<Capture>,
    capacity: usize,
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

impl FrameRing {
    /// Creates a ring holding at most `capacity` frames (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, returning the evicted oldest frame when full.
    pub fn push(&mut self, frame: Capture) -> Option<Capture> {
        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Returns `(stored_frames, capacity)`.
    pub fn status(&self) -> (usize, usize) {
        (self.frames.len(), self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Capture> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Submit every stored frame, oldest first, and empty the ring.
    ///
    /// Frames not yet submitted when an error occurs are discarded.
    pub fn drain_into<W: Write + Send + 'static>(
        &mut self,
        pipeline: &mut Pipeline<W>,
    ) -> GifResult<usize> {
        let mut submitted = 0;
        while let Some(frame) = self.frames.pop_front() {
            if let Err(err) = pipeline.submit_capture(frame) {
                self.frames.clear();
                return Err(err);
            }
            submitted += 1;
        }
        debug!(frames = submitted, "ring drained");
        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;
    use std::time::{Duration, SystemTime};

    fn capture(i: u32) -> Capture {
        Capture::new(
            vec![0xFF00_0000 | i; 4],
            2,
            2,
            SystemTime::UNIX_EPOCH + Duration::from_millis(200 * i as u64),
        )
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut ring = FrameRing::new(3);
        assert!(ring.push(capture(0)).is_none());
        ring.push(capture(1));
        ring.push(capture(2));
        let evicted = ring.push(capture(3)).unwrap();
        assert_eq!(evicted.pixels[0], 0xFF00_0000);

        let kept: Vec<u32> = ring.iter().map(|c| c.pixels[0] & 0xFF).collect();
        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(ring.status(), (3, 3));

        ring.clear();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_drain_into_pipeline() {
        let mut ring = FrameRing::default();
        for i in 0..5 {
            ring.push(capture(i));
        }
        let config = EncoderConfig::default().without_scaling().with_sample_factor(1);
        let mut pipeline = Pipeline::<Vec<u8>>::new(config).unwrap();
        pipeline.start(Vec::new(), true).unwrap();

        assert_eq!(ring.drain_into(&mut pipeline).unwrap(), 5);
        assert!(ring.is_empty());
        assert_eq!(pipeline.submitted(), 5);

        let bytes = pipeline.finish().unwrap();
        assert_eq!(bytes.last(), Some(&0x3B));
    }

    #[test]
    fn test_drain_into_idle_pipeline_fails_and_empties() {
        let mut ring = FrameRing::new(2);
        ring.push(capture(0));
        let mut pipeline = Pipeline::<Vec<u8>>::new(EncoderConfig::default()).unwrap();
        assert!(ring.drain_into(&mut pipeline).is_err());
        assert!(ring.is_empty());
    }
}
