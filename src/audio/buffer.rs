//! Decoded audio buffer

/// Decoded, immutable audio samples
///
/// Samples are stored planar (one `Vec` per channel) as floats in
/// [-1.0, 1.0]. Once produced a buffer is never modified; the controller
/// and the engine share it through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data
    ///
    /// All channels must have the same length; the shortest one wins if not.
    pub fn from_planar(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in channels.iter_mut() {
            ch.truncate(frames);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Build a single-channel buffer
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::from_planar(sample_rate, vec![samples])
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel
    pub fn channel(&self, idx: usize) -> Option<&[f32]> {
        self.channels.get(idx).map(Vec::as_slice)
    }

    /// Whether the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Mono mixdown of the sample at a fractional frame position
    ///
    /// Linearly interpolates between neighbouring frames. Positions outside
    /// the buffer read as silence.
    pub fn sample_at(&self, position: f64) -> f32 {
        let frames = self.frames();
        if frames == 0 || position < 0.0 {
            return 0.0;
        }
        let idx = position.floor() as usize;
        if idx >= frames {
            return 0.0;
        }
        let frac = (position - idx as f64) as f32;
        let next = (idx + 1).min(frames - 1);

        let mut sum = 0.0;
        for ch in &self.channels {
            sum += ch[idx] + (ch[next] - ch[idx]) * frac;
        }
        sum / self.channels.len() as f32
    }
}
