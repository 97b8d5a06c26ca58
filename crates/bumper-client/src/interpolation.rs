use std::collections::VecDeque;

/// One authoritative opponent position and when it arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentSample {
    pub x: f32,
    pub timestamp_ms: f64,
}

/// Plays the opponent paddle back a fixed delay behind real time.
#[derive(Debug, Clone)]
pub struct RemoteInterpolator {
    samples: VecDeque<OpponentSample>,
    capacity: usize,
    delay_ms: f64,
}

impl RemoteInterpolator {
    pub fn new(capacity: usize, delay_ms: f64) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            delay_ms,
        }
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

    /// Buffer a sample, keeping timestamp order and evicting the oldest.
    pub fn push(&mut self, x: f32, timestamp_ms: f64) {
        let sample = OpponentSample { x, timestamp_ms };
        let idx = self
            .samples
            .partition_point(|s| s.timestamp_ms <= timestamp_ms);
        if idx > 0 && self.samples[idx - 1].timestamp_ms == timestamp_ms {
            self.samples[idx - 1] = sample;
            return;
        }
        self.samples.insert(idx, sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Opponent x to draw at `now_ms`.
    pub fn sample(&self, now_ms: f64) -> Option<f32> {
        let render_ms = now_ms - self.delay_ms;
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        if render_ms <= first.timestamp_ms {
            return Some(first.x);
        }
        if render_ms >= last.timestamp_ms {
            return Some(last.x);
        }

        let after = self
            .samples
            .partition_point(|s| s.timestamp_ms <= render_ms);
        let (a, b) = (self.samples[after - 1], self.samples[after]);
        let span = b.timestamp_ms - a.timestamp_ms;
        let t = ((render_ms - a.timestamp_ms) / span) as f32;
        Some(a.x + (b.x - a.x) * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_between_straddling_samples() {
        let mut interp = RemoteInterpolator::new(10, 100.0);
        interp.push(0.0, 0.0);
        interp.push(4.0, 200.0);
        assert_eq!(interp.sample(200.0), Some(2.0));
    }

    #[test]
    fn empty_buffer_has_nothing_to_show() {
        let interp = RemoteInterpolator::new(10, 100.0);
        assert_eq!(interp.sample(500.0), None);
    }

    #[test]
    fn falls_back_to_nearest_sample() {
        let mut interp = RemoteInterpolator::new(10, 100.0);
        interp.push(1.0, 1000.0);
        interp.push(3.0, 1050.0);
        assert_eq!(interp.sample(1000.0), Some(1.0), "render time before buffer");
        assert_eq!(interp.sample(5000.0), Some(3.0), "render time after buffer");
    }

    #[test]
    fn out_of_order_samples_are_sorted() {
        let mut interp = RemoteInterpolator::new(10, 0.0);
        interp.push(4.0, 200.0);
        interp.push(0.0, 0.0);
        interp.push(2.0, 100.0);
        assert_eq!(interp.sample(50.0), Some(1.0));
        assert_eq!(interp.sample(150.0), Some(3.0));
    }

    #[test]
    fn ring_keeps_newest_samples() {
        let mut interp = RemoteInterpolator::new(10, 0.0);
        for i in 0..25 {
            interp.push(i as f32, f64::from(i) * 10.0);
        }
        assert_eq!(interp.len(), 10);
        assert_eq!(interp.sample(0.0), Some(15.0));
    }

    #[test]
    fn duplicate_timestamp_replaces() {
        let mut interp = RemoteInterpolator::new(10, 0.0);
        interp.push(1.0, 10.0);
        interp.push(2.0, 10.0);
        assert_eq!(interp.len(), 1);
        assert_eq!(interp.sample(10.0), Some(2.0));
    }
}
