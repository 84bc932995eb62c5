//! Time-indexed run log

use heapless::Vec;

use super::point::DataPoint;

/// Longest run that can be logged, seconds
pub const MAX_DATA_POINTS: usize = 540;

/// One data point per elapsed second of a run
pub struct RunLog {
    points: Vec<DataPoint, MAX_DATA_POINTS>,
    dropped: u32,
}

impl RunLog {
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            dropped: 0,
        }
    }

    /// Forget the previous run
    pub fn reset(&mut self) {
        self.points.clear();
        self.dropped = 0;
    }

    /// Record the point for `second`
    ///
    /// Overwrites an existing slot; a gap since the last point is filled
    /// with copies of this one. Points past the capacity are counted and
    /// dropped. Returns false if the point was dropped.
    pub fn record(&mut self, second: usize, point: DataPoint) -> bool {
        if second >= MAX_DATA_POINTS {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        if let Some(slot) = self.points.get_mut(second) {
            *slot = point;
            return true;
        }
        while self.points.len() <= second {
            // Bounded by the capacity check above
            let _ = self.points.push(point);
        }
        true
    }

    pub fn get(&self, second: usize) -> Option<&DataPoint> {
        self.points.get(second)
    }

    /// Newest point
    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    /// Second of the newest point
    pub fn last_index(&self) -> Option<usize> {
        self.points.len().checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Measurement;
    use crate::state::ControllerState;

    fn point(target: f32) -> DataPoint {
        DataPoint::new(ControllerState::Preheat, target, 50, 30, &Measurement::NONE)
    }

    #[test]
    fn test_sequential_records() {
        let mut log = RunLog::new();
        for second in 0..5 {
            assert!(log.record(second, point(second as f32)));
        }
        assert_eq!(log.len(), 5);
        assert_eq!(log.last_index(), Some(4));
        assert_eq!(log.get(3).unwrap().target(), 3.0);
    }

    #[test]
    fn test_overwrite_and_gap_fill() {
        let mut log = RunLog::new();
        log.record(0, point(1.0));
        log.record(0, point(2.0));
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(0).unwrap().target(), 2.0);

        log.record(3, point(5.0));
        assert_eq!(log.len(), 4);
        assert_eq!(log.get(1).unwrap().target(), 5.0);
    }

    #[test]
    fn test_capacity() {
        let mut log = RunLog::new();
        assert!(log.record(MAX_DATA_POINTS - 1, point(1.0)));
        assert!(!log.record(MAX_DATA_POINTS, point(1.0)));
        assert_eq!(log.len(), MAX_DATA_POINTS);
        assert_eq!(log.dropped(), 1);

        log.reset();
        assert!(log.is_empty());
        assert_eq!(log.dropped(), 0);
        assert_eq!(log.last_index(), None);
    }
}
