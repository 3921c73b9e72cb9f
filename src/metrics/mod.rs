//! Metrics: per-batch evaluation with explicit running-average state

mod accuracy;
mod aggregator;
mod binary_accuracy;
mod metric;
mod running;

pub use accuracy::Accuracy;
pub use aggregator::Metrics;
pub use binary_accuracy::BinaryAccuracy;
pub use metric::{metric, MetricFn, MetricSpec, NamedMetric};
pub use running::RunningAverage;
