//! Running average over per-batch log mappings

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logs::Logs;

/// Cumulative mean of every key in a stream of [`Logs`].
///
/// State is explicit: the accumulated totals and the batch count live here
/// and nowhere else, so resetting between epochs is just replacing the
/// value. The key set is fixed by the first update; later updates must
/// carry exactly the same keys.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunningAverage {
    count: u32,
    total: Option<Logs>,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches folded in so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Fold one batch of logs in and return the averages so far.
    ///
    /// A rejected batch leaves the accumulated state untouched; the next
    /// valid batch continues from where the average left off.
    pub fn update(&mut self, logs: &Logs) -> Result<Logs> {
        let next = match &self.total {
            None => logs.clone(),
            Some(total) => {
                if total.len() != logs.len() || !logs.keys().all(|k| total.contains_key(k)) {
                    return Err(Error::shape_mismatch(
                        format!("logs with keys {:?}", total.keys().collect::<Vec<_>>()),
                        format!("{:?}", logs.keys().collect::<Vec<_>>()),
                    ));
                }
                let mut next = Logs::with_capacity(logs.len());
                for (key, value) in logs {
                    next.insert(key.clone(), total[key].add(value)?);
                }
                next
            }
        };

        self.count += 1;
        let averages = next
            .iter()
            .map(|(k, v)| (k.clone(), v.div(self.count as f32)))
            .collect();
        self.total = Some(next);
        Ok(averages)
    }
}
