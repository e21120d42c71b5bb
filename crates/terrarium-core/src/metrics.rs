//! Rolling cooperation window and yearly dashboard records.

use std::collections::VecDeque;

use terrarium_types::{Population, YearlyMetrics};

/// Collects interaction outcomes and yearly records.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecorder {
    /// Most recent outcomes, oldest first; `true` means mutual cooperation.
    window: VecDeque<bool>,
    capacity: usize,
    records: Vec<YearlyMetrics>,
}

impl MetricsRecorder {
    /// A recorder whose rolling window holds `capacity` outcomes.
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            records: Vec::new(),
        }
    }

    /// Push one interaction outcome, evicting the oldest when full.
    pub fn record_outcome(&mut self, cooperative: bool) {
        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(cooperative);
    }

    /// Share of cooperative outcomes in the window (0 when empty).
    #[allow(clippy::cast_precision_loss)]
    pub fn cooperation_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let cooperative = self.window.iter().filter(|c| **c).count();
        cooperative as f64 / self.window.len() as f64
    }

    /// Outcomes currently held.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Append a yearly record built from the current window.
    pub fn close_year(
        &mut self,
        tick: u64,
        year: u64,
        institutions: usize,
        average_energy: f64,
        population: Population,
    ) -> YearlyMetrics {
        let record = YearlyMetrics {
            tick,
            year,
            cooperation_rate: self.cooperation_rate(),
            institutions,
            average_energy,
            population,
        };
        self.records.push(record);
        record
    }

    /// Every yearly record so far, oldest first.
    pub fn records(&self) -> &[YearlyMetrics] {
        &self.records
    }

    /// The most recent yearly record.
    pub fn latest(&self) -> Option<&YearlyMetrics> {
        self.records.last()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_rate_is_zero() {
        let metrics = MetricsRecorder::new(4);
        assert_eq!(metrics.cooperation_rate(), 0.0);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut metrics = MetricsRecorder::new(4);
        for outcome in [false, false, true, true, true, true] {
            metrics.record_outcome(outcome);
        }
        assert_eq!(metrics.window_len(), 4);
        assert_eq!(metrics.cooperation_rate(), 1.0);
        metrics.record_outcome(false);
        assert_eq!(metrics.cooperation_rate(), 0.75);
    }

    #[test]
    fn close_year_snapshots_the_rate() {
        let mut metrics = MetricsRecorder::new(10);
        metrics.record_outcome(true);
        metrics.record_outcome(false);
        let population = Population {
            herbivores: 0,
            predators: 0,
            social: 12,
        };
        let record = metrics.close_year(10, 1, 2, 4.5, population);
        assert_eq!(record.cooperation_rate, 0.5);
        assert_eq!(metrics.records().len(), 1);
        assert_eq!(metrics.latest().unwrap().population.social, 12);
    }
}
