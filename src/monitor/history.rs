use std::collections::{BTreeMap, VecDeque};
use std::num::NonZeroUsize;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// One sample of a history: the poll cycle it was taken at, and the tracked values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySample {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

/// Fixed-capacity FIFO of samples, ordered oldest to newest.
///
/// Pushing past the capacity evicts the oldest sample. Pushing is the only mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer<T> {
    capacity: NonZeroUsize,
    samples: VecDeque<T>,
}

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.get()),
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// The `count` newest samples, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> {
        self.samples.iter().skip(self.len().saturating_sub(count))
    }

    pub fn push(&mut self, sample: T) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity.get() {
            self.samples.pop_front();
        }
    }
}

impl<T: PartialEq> HistoryBuffer<T> {
    /// Push `sample` unless it is identical to the newest sample.
    ///
    /// Returns whether the sample was pushed.
    pub fn append(&mut self, sample: T) -> bool {
        if self.latest() == Some(&sample) {
            return false;
        }
        self.push(sample);
        true
    }
}

impl<T> IntoIterator for HistoryBuffer<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<T: Serialize> Serialize for HistoryBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.samples)
    }
}
