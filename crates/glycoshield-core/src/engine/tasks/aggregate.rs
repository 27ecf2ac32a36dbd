use crate::engine::config::AggregationMode;

/// Per-residue reduction of shielding deltas over frames.
///
/// Frames must be pushed in frame order; with that, the result does not
/// depend on the order in which workers finished the frames.
#[derive(Debug, Clone)]
pub struct Aggregator {
    mode: AggregationMode,
    values: Vec<f64>,
    frames: usize,
}

impl Aggregator {
    pub fn new(mode: AggregationMode, residue_count: usize) -> Self {
        let initial = match mode {
            AggregationMode::Max => f64::NEG_INFINITY,
            AggregationMode::Avg => 0.0,
        };
        Self {
            mode,
            values: vec![initial; residue_count],
            frames: 0,
        }
    }

    pub fn push(&mut self, deltas: &[f64]) {
        debug_assert_eq!(deltas.len(), self.values.len());
        for (acc, &delta) in self.values.iter_mut().zip(deltas) {
            match self.mode {
                AggregationMode::Max => *acc = acc.max(delta),
                AggregationMode::Avg => *acc += delta,
            }
        }
        self.frames += 1;
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Returns the reduced values, or `None` when no frame was pushed.
    pub fn finish(self) -> Option<Vec<f64>> {
        if self.frames == 0 {
            return None;
        }
        let values = match self.mode {
            AggregationMode::Max => self.values,
            AggregationMode::Avg => {
                let n = self.frames as f64;
                self.values.into_iter().map(|sum| sum / n).collect()
            }
        };
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: [[f64; 3]; 3] = [[1.0, 0.0, 2.0], [3.0, 0.5, 2.0], [2.0, 0.25, 2.0]];

    fn reduce(mode: AggregationMode) -> Vec<f64> {
        let mut aggregator = Aggregator::new(mode, 3);
        for frame in FRAMES {
            aggregator.push(&frame);
        }
        assert_eq!(aggregator.frame_count(), 3);
        aggregator.finish().unwrap()
    }

    #[test]
    fn max_keeps_largest_delta() {
        assert_eq!(reduce(AggregationMode::Max), vec![3.0, 0.5, 2.0]);
    }

    #[test]
    fn avg_takes_arithmetic_mean() {
        assert_eq!(reduce(AggregationMode::Avg), vec![2.0, 0.25, 2.0]);
    }

    #[test]
    fn avg_never_exceeds_max() {
        let max = reduce(AggregationMode::Max);
        let avg = reduce(AggregationMode::Avg);
        assert!(avg.iter().zip(&max).all(|(a, m)| a <= m));
    }

    #[test]
    fn finish_without_frames_is_none() {
        assert!(Aggregator::new(AggregationMode::Max, 4).finish().is_none());
    }
}
