use serde::Serialize;

/// Think time the engine allocated on one probed ply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSample {
    /// Index of the ply in the game's move list.
    pub ply: usize,
    pub allocated_ms: i64,
}

/// Append-only list of samples, kept in ply order.
#[derive(Debug, Clone, Default)]
pub struct ResultRecorder {
    samples: Vec<TimeSample>,
}

impl ResultRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ply: usize, allocated_ms: i64) {
        self.samples.push(TimeSample { ply, allocated_ms });
    }

    pub fn samples(&self) -> Vec<TimeSample> {
        self.samples.clone()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<TimeSample> {
        self.samples
    }
}
