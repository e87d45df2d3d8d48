//! Lock-free ring buffer between capture and the processing thread
//!
//! Capture writes raw samples as they arrive; the processing thread only
//! pops whole blocks, so block boundaries stay aligned with the stream.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Single-producer single-consumer sample queue
pub struct SampleRing {
    producer: HeapProducer<i16>,
    consumer: HeapConsumer<i16>,
    capacity: usize,
}

impl SampleRing {
    /// Create new ring buffer
    ///
    /// # Arguments
    /// * `capacity` - Queue capacity in samples
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<i16>::new(capacity);
        let (producer, consumer) = rb.split();

        Self {
            producer,
            consumer,
            capacity,
        }
    }

    /// Split into capture and processing ends
    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        (
            SampleProducer {
                producer: self.producer,
                capacity: self.capacity,
            },
            SampleConsumer {
                consumer: self.consumer,
            },
        )
    }
}

/// Capture end of the queue
pub struct SampleProducer {
    producer: HeapProducer<i16>,
    capacity: usize,
}

impl SampleProducer {
    /// Queue samples without blocking
    ///
    /// # Arguments
    /// * `samples` - Raw samples, in stream order
    ///
    /// # Returns
    /// Number of samples accepted. The remainder did not fit because
    /// processing fell behind; the caller decides whether to drop them.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Free space in samples
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Processing end of the queue
pub struct SampleConsumer {
    consumer: HeapConsumer<i16>,
}

impl SampleConsumer {
    /// Pop exactly `block.len()` samples, or nothing if fewer are queued
    ///
    /// # Returns
    /// `true` if `block` was filled
    pub fn read_block(&mut self, block: &mut [i16]) -> bool {
        if self.consumer.len() < block.len() {
            return false;
        }
        self.consumer.pop_slice(block) == block.len()
    }

    /// Number of queued samples
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}
