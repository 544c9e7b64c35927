use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::SampleBlock;
use crate::models::error::CaptureError;

/// Append-only store of filtered sample blocks for one recording.
///
/// Shared as `Arc<CaptureBuffer>` between the capture callback (sole writer)
/// and the display / flush paths (readers). The lock guards only a `Vec` of
/// `Arc` handles: `append` holds it for one push, `snapshot` for as many
/// handle clones as the requested window spans. Sample copying happens
/// outside the lock.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    blocks: Mutex<Vec<Arc<SampleBlock>>>,
    total: AtomicUsize,
    capturing: AtomicBool,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block after all previously appended blocks.
    pub fn append(&self, block: SampleBlock) {
        if block.is_empty() {
            return;
        }
        let len = block.len();
        let mut blocks = self.blocks.lock();
        blocks.push(Arc::new(block));
        self.total.fetch_add(len, Ordering::Release);
    }

    /// The most recent `max_samples` samples (or fewer), oldest first.
    ///
    /// Does not remove anything from the buffer.
    pub fn snapshot(&self, max_samples: usize) -> Vec<f32> {
        if max_samples == 0 {
            return Vec::new();
        }

        let mut tail: Vec<Arc<SampleBlock>> = Vec::new();
        {
            let blocks = self.blocks.lock();
            let mut gathered = 0;
            for block in blocks.iter().rev() {
                if gathered >= max_samples {
                    break;
                }
                gathered += block.len();
                tail.push(Arc::clone(block));
            }
        }

        let available: usize = tail.iter().map(|b| b.len()).sum();
        let skip = available.saturating_sub(max_samples);
        let mut window = Vec::with_capacity(available - skip);
        for block in tail.iter().rev() {
            window.extend_from_slice(block.samples());
        }
        window.drain(..skip);
        window
    }

    /// Every stored sample in arrival order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.snapshot(self.total_samples())
    }

    /// Handles to all blocks in arrival order.
    pub fn blocks(&self) -> Vec<Arc<SampleBlock>> {
        self.blocks.lock().clone()
    }

    pub fn total_samples(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }

    /// Mark a capture as in flight. `reset` is rejected until [`end_capture`](Self::end_capture).
    pub fn begin_capture(&self) {
        self.capturing.store(true, Ordering::SeqCst);
    }

    pub fn end_capture(&self) {
        self.capturing.store(false, Ordering::SeqCst);
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    /// Drop every stored block. Only allowed while no capture is in flight.
    pub fn reset(&self) -> Result<(), CaptureError> {
        if self.is_capturing() {
            return Err(CaptureError::InvalidState(
                "cannot reset the capture buffer while recording".into(),
            ));
        }
        let mut blocks = self.blocks.lock();
        blocks.clear();
        self.total.store(0, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn block(values: &[f32]) -> SampleBlock {
        SampleBlock::new(values.to_vec(), 16000)
    }

    #[test]
    fn total_is_sum_of_block_lengths() {
        let buf = CaptureBuffer::new();
        for size in [3usize, 1, 7, 5] {
            buf.append(SampleBlock::new(vec![0.0; size], 16000));
        }
        assert_eq!(buf.total_samples(), 16);
        assert_eq!(buf.block_count(), 4);
    }

    #[test]
    fn snapshot_returns_trailing_window_in_order() {
        let buf = CaptureBuffer::new();
        buf.append(block(&[1.0, 2.0, 3.0]));
        buf.append(block(&[4.0, 5.0]));
        buf.append(block(&[6.0, 7.0, 8.0, 9.0]));

        assert_eq!(buf.snapshot(4), vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(buf.snapshot(5), vec![5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(buf.snapshot(8), vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(buf.snapshot(1), vec![9.0]);
        assert!(buf.snapshot(0).is_empty());
    }

    #[test]
    fn snapshot_larger_than_buffer_returns_everything() {
        let buf = CaptureBuffer::new();
        buf.append(block(&[1.0, 2.0]));
        buf.append(block(&[3.0]));

        assert_eq!(buf.snapshot(100), vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.to_vec(), vec![1.0, 2.0, 3.0]);
        // Snapshots never consume data.
        assert_eq!(buf.total_samples(), 3);
    }

    #[test]
    fn empty_blocks_are_ignored() {
        let buf = CaptureBuffer::new();
        buf.append(block(&[]));
        assert!(buf.is_empty());
        assert_eq!(buf.block_count(), 0);
        assert!(buf.blocks().is_empty());
    }

    #[test]
    fn reset_clears_buffer() {
        let buf = CaptureBuffer::new();
        buf.append(block(&[1.0, 2.0, 3.0]));
        buf.reset().unwrap();

        assert!(buf.is_empty());
        assert_eq!(buf.total_samples(), 0);
        assert!(buf.snapshot(10).is_empty());
    }

    #[test]
    fn reset_rejected_while_capturing() {
        let buf = CaptureBuffer::new();
        buf.append(block(&[1.0]));
        buf.begin_capture();
        assert!(matches!(buf.reset(), Err(CaptureError::InvalidState(_))));
        assert_eq!(buf.total_samples(), 1);

        buf.end_capture();
        assert!(buf.reset().is_ok());
    }

    #[test]
    fn concurrent_append_and_snapshot_never_lose_or_duplicate() {
        let buf = Arc::new(CaptureBuffer::new());
        let writer_buf = Arc::clone(&buf);
        let block_sizes: Vec<usize> = (0..2000).map(|i| 1 + (i * 7) % 64).collect();
        let expected_total: usize = block_sizes.iter().sum();

        let writer = thread::spawn(move || {
            let mut next = 0u32;
            for size in block_sizes {
                let values: Vec<f32> = (0..size)
                    .map(|_| {
                        next += 1;
                        next as f32
                    })
                    .collect();
                writer_buf.append(SampleBlock::new(values, 16000));
            }
        });

        let mut snapshots = 0;
        while !writer.is_finished() || snapshots < 10 {
            let window = buf.snapshot(500);
            assert!(window.len() <= 500);
            // Values are consecutive integers: any loss or duplication breaks the run.
            for pair in window.windows(2) {
                assert_eq!(pair[1], pair[0] + 1.0);
            }
            snapshots += 1;
        }
        writer.join().unwrap();

        assert_eq!(buf.total_samples(), expected_total);
        let all = buf.to_vec();
        assert_eq!(all.len(), expected_total);
        for (i, value) in all.iter().enumerate() {
            assert_eq!(*value, (i + 1) as f32);
        }
    }
}
