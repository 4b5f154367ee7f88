use ringbuffer::{AllocRingBuffer, RingBuffer};

/// The in-progress episode of one environment instance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeRecord {
    pub reward: f64,
    pub steps: usize,
}

/// Tracks the running episode and a bounded history of finished episode returns.
pub struct EpisodeTracker {
    current: EpisodeRecord,
    history: AllocRingBuffer<f64>,
}

impl EpisodeTracker {
    pub fn new(history_len: usize) -> Self {
        Self {
            current: EpisodeRecord::default(),
            history: AllocRingBuffer::new(history_len),
        }
    }

    pub fn current(&self) -> EpisodeRecord {
        self.current
    }

    pub fn step(&mut self, reward: f32) {
        self.current.reward += reward as f64;
        self.current.steps += 1;
    }

    /// Closes the running episode: its return enters the history (evicting the oldest one when
    /// full) and a fresh record starts.
    pub fn finish(&mut self) -> EpisodeRecord {
        let finished = std::mem::take(&mut self.current);
        self.history.enqueue(finished.reward);
        finished
    }

    pub fn history(&self) -> impl Iterator<Item = &f64> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Mean return over the history, `NaN` before the first episode finished.
    pub fn history_mean(&self) -> f64 {
        if self.history.is_empty() {
            return f64::NAN;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }
}
