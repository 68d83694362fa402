//! Single-producer/single-consumer handoff between the audio callback thread
//! and session finalization.
//!
//! The producer half lives inside the capture callback. The consumer half is
//! only drained after `AudioCapture::stop()` has returned, so every block the
//! callback accepted is visible and no further block can arrive.

use super::backend::AudioBlock;
use std::sync::mpsc;
use std::time::Duration;

/// Ordered audio blocks for one session (insertion order = playback order)
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    blocks: Vec<AudioBlock>,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: AudioBlock) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[AudioBlock] {
        &self.blocks
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn total_samples(&self) -> usize {
        self.blocks.iter().map(AudioBlock::len).sum()
    }

    pub fn duration(&self, sample_rate: u32) -> Duration {
        Duration::from_secs_f64(self.total_samples() as f64 / sample_rate as f64)
    }

    /// Concatenate all blocks in temporal order
    pub fn concat(&self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.total_samples());
        for block in &self.blocks {
            samples.extend_from_slice(&block.samples);
        }
        samples
    }
}

/// Create a connected producer/consumer pair
pub fn handoff() -> (BlockProducer, BlockConsumer) {
    let (tx, rx) = mpsc::channel();
    (BlockProducer { tx }, BlockConsumer { rx })
}

/// Callback-side half: copies each accepted block into the handoff
#[derive(Clone)]
pub struct BlockProducer {
    tx: mpsc::Sender<AudioBlock>,
}

impl BlockProducer {
    /// Returns false once the consumer has gone away
    pub fn push(&self, samples: &[f32]) -> bool {
        self.tx.send(AudioBlock::new(samples.to_vec())).is_ok()
    }
}

/// Session-side half, read once after capture is quiescent
pub struct BlockConsumer {
    rx: mpsc::Receiver<AudioBlock>,
}

impl BlockConsumer {
    /// Collect every block pushed so far into an [`AudioBuffer`]
    pub fn drain(self) -> AudioBuffer {
        let mut buffer = AudioBuffer::new();
        for block in self.rx.try_iter() {
            buffer.push(block);
        }
        buffer
    }
}
