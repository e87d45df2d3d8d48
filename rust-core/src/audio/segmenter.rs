//! Half-overlapping frame segmentation of a block stream
//!
//! A raw block of L samples is cut into L/h slices of h = n/2 samples.
//! Slot 0 of the arena holds the tail of the previous block, so frame i is
//! slot[i] ++ slot[i+1] and every frame overlaps the previous one by h
//! samples, also across block boundaries.

use crate::error::PipelineError;

/// Stateful segmenter producing n-sample frames with 50% overlap
pub struct OverlapSegmenter {
    /// Segment length h (half a frame)
    half_len: usize,

    /// Number of slots, L/h + 1
    segment_count: usize,

    /// `segment_count` contiguous slots of `half_len` samples, slot 0 first
    arena: Vec<i16>,

    /// Frame assembled from two consecutive slots
    frame: Vec<i16>,
}

impl OverlapSegmenter {
    /// Allocate `segment_count` silent slots of `half_len` samples
    ///
    /// # Arguments
    /// * `half_len` - Segment length h = n/2, clamped to at least 1
    /// * `segment_count` - L/h + 1 slots, clamped to at least 2 (carry-over
    ///   plus one block slice)
    ///
    /// Values normally come from a validated `SpectrogramConfig`.
    pub fn new(half_len: usize, segment_count: usize) -> Self {
        let half_len = half_len.max(1);
        let segment_count = segment_count.max(2);

        Self {
            half_len,
            segment_count,
            arena: vec![0; half_len * segment_count],
            frame: vec![0; 2 * half_len],
        }
    }

    #[inline]
    fn slot(&self, index: usize) -> &[i16] {
        let start = index * self.half_len;
        &self.arena[start..start + self.half_len]
    }

    /// Segment one raw block and hand every frame to `emit`, in order
    ///
    /// # Arguments
    /// * `block` - Exactly `block_len()` raw samples
    /// * `emit` - Called with each n-sample frame; the slice is reused
    ///
    /// # Returns
    /// The number of frames emitted (always `segment_count - 1`).
    /// A wrong block length is rejected before any state changes. If `emit`
    /// fails the remaining frames are skipped and the carry-over is left as
    /// it was before the call.
    pub fn ingest<F>(&mut self, block: &[i16], mut emit: F) -> Result<usize, PipelineError>
    where
        F: FnMut(&[i16]) -> Result<(), PipelineError>,
    {
        let expected = self.block_len();
        if block.len() != expected {
            return Err(PipelineError::BlockLength {
                expected,
                actual: block.len(),
            });
        }

        let h = self.half_len;

        // Slots 1.. take the block's consecutive slices; slot 0 keeps the carry-over
        self.arena[h..].copy_from_slice(block);

        for i in 0..self.segment_count - 1 {
            let start = i * h;
            self.frame.copy_from_slice(&self.arena[start..start + 2 * h]);
            emit(&self.frame)?;
        }

        // Newest slot becomes the carry-over for the next block
        let newest = (self.segment_count - 1) * h;
        self.arena.copy_within(newest..newest + h, 0);

        Ok(self.segment_count - 1)
    }

    /// Return to the cold-start state (silent carry-over)
    pub fn reset(&mut self) {
        self.arena.fill(0);
        self.frame.fill(0);
    }

    /// Tail of the last block, to be paired with the next block's first slice
    pub fn carry_over(&self) -> &[i16] {
        self.slot(0)
    }

    /// Segment length h
    pub fn half_len(&self) -> usize {
        self.half_len
    }

    /// Frame length n = 2h
    pub fn frame_len(&self) -> usize {
        2 * self.half_len
    }

    /// Slots in the arena, carry-over included
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Required raw block length L
    pub fn block_len(&self) -> usize {
        (self.segment_count - 1) * self.half_len
    }

    /// Frames emitted by every `ingest`
    pub fn frames_per_block(&self) -> usize {
        self.segment_count - 1
    }
}
