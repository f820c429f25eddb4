//! Pipeline execution statistics.
//!
//! Counting only happens with the `metrics` feature compiled in and
//! [`COLLECT_METRICS`] set; otherwise every `record_*` call is a no-op.
//!
//! ```ignore
//! // cargo build --features metrics
//! COLLECT_METRICS.store(false, Ordering::Relaxed); // pause collection
//!
//! let m = pipeline.metrics();
//! println!("{} executions, {:.1}us avg", m.executions, m.avg_execute_us());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime switch for collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

#[inline]
fn collecting() -> bool {
    cfg!(feature = "metrics") && COLLECT_METRICS.load(Ordering::Relaxed)
}

/// Last `capacity` execution times in microseconds.
#[derive(Debug, Clone)]
pub struct TimingWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl TimingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, us: u64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(us);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of the retained samples, 0 when empty.
    pub fn mean(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            n => self.samples.iter().sum::<u64>() as f64 / n as f64,
        }
    }
}

/// Counters for one pipeline, updated by the update protocol.
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    /// `execute_data` calls that actually ran.
    pub executions: u64,
    /// `execute_information` calls.
    pub information_passes: u64,
    /// Data pulls that found the data current and skipped the producer.
    pub up_to_date_pulls: u64,
    /// Updates that ended on an empty request.
    pub empty_requests: u64,
    /// Updates that asked for more pieces than the producer can make.
    pub piece_shortfalls: u64,
    /// Walks that re-entered a process already on the stack.
    pub cycles_defused: u64,
    /// Executions skipped for missing inputs.
    pub insufficient_inputs: u64,

    pub execute_timings_us: TimingWindow,
    pub last_execute_us: u64,
}

macro_rules! counter {
    ($($method:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $method(&mut self) {
                if collecting() {
                    self.$field += 1;
                }
            }
        )*
    };
}

impl PipelineMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            executions: 0,
            information_passes: 0,
            up_to_date_pulls: 0,
            empty_requests: 0,
            piece_shortfalls: 0,
            cycles_defused: 0,
            insufficient_inputs: 0,
            execute_timings_us: TimingWindow::new(window),
            last_execute_us: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.execute_timings_us.capacity);
    }

    pub fn record_execution(&mut self, timing_us: u64) {
        if collecting() {
            self.executions += 1;
            self.execute_timings_us.record(timing_us);
            self.last_execute_us = timing_us;
        }
    }

    counter! {
        record_information_pass => information_passes,
        record_up_to_date => up_to_date_pulls,
        record_empty_request => empty_requests,
        record_piece_shortfall => piece_shortfalls,
        record_cycle => cycles_defused,
        record_insufficient_inputs => insufficient_inputs,
    }

    pub fn avg_execute_us(&self) -> f64 {
        self.execute_timings_us.mean()
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_window_evicts_oldest() {
        let mut window = TimingWindow::new(3);
        assert_eq!(window.mean(), 0.0);

        for us in [10, 20, 30] {
            window.record(us);
        }
        assert_eq!(window.mean(), 20.0);

        window.record(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), 30.0);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_execution_recording() {
        let mut metrics = PipelineMetrics::new(4);
        metrics.record_execution(1000);
        metrics.record_execution(3000);
        metrics.record_cycle();

        assert_eq!(metrics.executions, 2);
        assert_eq!(metrics.cycles_defused, 1);
        assert_eq!(metrics.avg_execute_us(), 2000.0);
        assert_eq!(metrics.last_execute_us, 3000);

        metrics.reset();
        assert_eq!(metrics.executions, 0);
        assert!(metrics.execute_timings_us.is_empty());
    }

    #[cfg(not(feature = "metrics"))]
    #[test]
    fn test_disabled_metrics_stay_zero() {
        let mut metrics = PipelineMetrics::default();
        metrics.record_execution(1000);
        metrics.record_empty_request();
        assert_eq!(metrics.executions, 0);
        assert_eq!(metrics.empty_requests, 0);
        assert!(metrics.execute_timings_us.is_empty());
    }
}
