use std::collections::VecDeque;

use crate::types::FeatureSample;

/// Sliding window of feature samples. Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct FeatureHistory {
    samples: VecDeque<FeatureSample>,
    capacity: usize,
}

impl FeatureHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: FeatureSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&FeatureSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureSample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<FeatureSample> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureHistory;
    use crate::types::FeatureSample;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut history = FeatureHistory::with_capacity(800);
        let inserted = 1_000;
        for index in 1..=inserted {
            history.push(FeatureSample::new(index as f32, index as f64));
        }
        assert_eq!(history.len(), 800);
        let oldest = history.iter().next().unwrap();
        assert_eq!(oldest.timestamp, (inserted - 799) as f64);
        assert_eq!(history.last().unwrap().timestamp, inserted as f64);
    }

    #[test]
    fn keeps_everything_below_capacity() {
        let mut history = FeatureHistory::with_capacity(4);
        history.push(FeatureSample::new(0.1, 0.0));
        history.push(FeatureSample::new(0.2, 0.01));
        assert_eq!(history.to_vec().len(), 2);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 4);
    }
}
