//! Per-parameter movement statistics collected during a random walk

use serde::{Deserialize, Serialize};

/// Movement statistics of one parameter over a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveStatistics {
    /// Sum of |applied step| over all proposals
    pub sum_abs_step: f64,

    /// Largest |applied step|
    pub max_abs_step: f64,

    pub positive_moves: usize,
    pub negative_moves: usize,
    pub no_moves: usize,

    /// Sign of the last applied step; a zero step counts as negative
    pub last_direction: i8,

    /// Smallest proposed value
    pub min_value: f64,

    /// Largest proposed value
    pub max_value: f64,
}

impl Default for MoveStatistics {
    fn default() -> Self {
        Self {
            sum_abs_step: 0.0,
            max_abs_step: 0.0,
            positive_moves: 0,
            negative_moves: 0,
            no_moves: 0,
            last_direction: 1,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
        }
    }
}

impl MoveStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one proposal with its applied step (after bounds) and resulting value
    pub fn record(&mut self, step: f64, new_value: f64) {
        if step > 0.0 {
            self.last_direction = 1;
            self.positive_moves += 1;
        } else if step < 0.0 {
            self.last_direction = -1;
            self.negative_moves += 1;
        } else {
            self.last_direction = -1;
            self.no_moves += 1;
        }

        let abs_step = step.abs();
        self.sum_abs_step += abs_step;
        if abs_step > self.max_abs_step {
            self.max_abs_step = abs_step;
        }

        self.min_value = self.min_value.min(new_value);
        self.max_value = self.max_value.max(new_value);
    }

    /// Number of proposals recorded
    pub fn proposals(&self) -> usize {
        self.positive_moves + self.negative_moves + self.no_moves
    }

    /// Mean |step| over the recorded proposals, zero if none
    pub fn mean_abs_step(&self) -> f64 {
        match self.proposals() {
            0 => 0.0,
            n => self.sum_abs_step / n as f64,
        }
    }

    /// Explored value range, if anything was proposed
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.proposals() == 0 {
            None
        } else {
            Some((self.min_value, self.max_value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_record_moves() {
        let mut stats = MoveStatistics::new();
        assert_eq!(stats.last_direction, 1);
        assert_eq!(stats.value_range(), None);
        assert_eq!(stats.mean_abs_step(), 0.0);

        stats.record(2.0, 12.0);
        assert_eq!(stats.last_direction, 1);

        stats.record(-0.5, 11.5);
        assert_eq!(stats.last_direction, -1);

        stats.record(0.0, 11.5);
        assert_eq!(stats.last_direction, -1);

        stats.record(1.0, 12.5);

        assert_eq!(stats.positive_moves, 2);
        assert_eq!(stats.negative_moves, 1);
        assert_eq!(stats.no_moves, 1);
        assert_eq!(stats.proposals(), 4);
        assert_eq!(stats.max_abs_step, 2.0);
        assert_relative_eq!(stats.mean_abs_step(), 3.5 / 4.0);
        assert_eq!(stats.value_range(), Some((11.5, 12.5)));
    }
}
