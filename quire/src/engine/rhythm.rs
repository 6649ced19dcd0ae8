use std::collections::VecDeque;

use web_time::Duration;

/// Bounded history of inter-keystroke intervals.
///
/// Only meant for visualization. Gaps at or above the pause threshold are
/// dropped.
#[derive(Debug, Clone)]
pub struct Rhythm {
    samples: VecDeque<Duration>,
    capacity: usize,
    pause: Duration,
}

impl Rhythm {
    pub fn new(capacity: usize, pause: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            pause,
        }
    }

    pub fn record(&mut self, interval: Duration) {
        if interval >= self.pause || self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(interval);
    }

    pub fn samples(&self) -> impl ExactSizeIterator<Item = Duration> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Mean interval, if any samples were recorded.
    pub fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).ok().filter(|&n| n > 0)?;
        Some(self.samples.iter().sum::<Duration>() / count)
    }
}
