//! Scanpaths and successor lookup.
//!
//! A scanpath is the time-ordered fixation sequence of one person viewing one
//! image under one condition. Points are sorted at construction and
//! timestamps are unique, so the successor of any time is found by binary
//! search instead of a linear scan.

use crate::error::{CoreError, Result};
use crate::id::{ColorTag, PersonId};
use crate::model::Point;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanPath {
    pub person: PersonId,
    pub color: ColorTag,
    points: Vec<Point>,
}

impl ScanPath {
    /// Build a scanpath, sorting `points` by time.
    ///
    /// Fails on duplicate timestamps and on non-finite coordinates or times.
    pub fn new(person: PersonId, color: ColorTag, mut points: Vec<Point>) -> Result<Self> {
        if points
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite() || !p.time.is_finite())
        {
            return Err(CoreError::InvalidPoint { person });
        }

        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        if let Some(pair) = points.windows(2).find(|w| w[0].time == w[1].time) {
            return Err(CoreError::DuplicateTimestamp {
                person,
                time: pair[0].time,
            });
        }

        Ok(Self {
            person,
            color,
            points,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the point with the smallest time strictly greater than `time`.
    pub fn next_index(&self, time: f64) -> Option<usize> {
        let idx = self.points.partition_point(|p| p.time <= time);
        (idx < self.points.len()).then_some(idx)
    }

    /// The point with the smallest time strictly greater than `time`, or
    /// `None` when `time` is at or past the last point.
    pub fn next_point(&self, time: f64) -> Option<&Point> {
        self.next_index(time).map(|i| &self.points[i])
    }

    /// Timespan covered by the path, `(first, last)`.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.time, self.points.last()?.time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(times: &[f64]) -> ScanPath {
        let points = times
            .iter()
            .map(|&t| Point::new(t as f32, t as f32, t))
            .collect();
        ScanPath::new(PersonId::intern("p1"), ColorTag::intern("color"), points).unwrap()
    }

    #[test]
    fn sorts_points_by_time() {
        let p = path(&[30.0, 10.0, 20.0]);
        let times: Vec<f64> = p.points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
        assert_eq!(p.time_range(), Some((10.0, 30.0)));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = ScanPath::new(
            PersonId::intern("p1"),
            ColorTag::intern("color"),
            vec![Point::new(0.0, 0.0, 5.0), Point::new(1.0, 1.0, 5.0)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTimestamp { time, .. } if time == 5.0));
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = ScanPath::new(
            PersonId::intern("p1"),
            ColorTag::intern("color"),
            vec![Point::new(f32::NAN, 0.0, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPoint { .. }));
    }

    #[test]
    fn next_point_is_strict_successor() {
        let p = path(&[0.0, 1.0, 2.0]);
        assert_eq!(p.next_point(0.0).map(|p| p.time), Some(1.0));
        assert_eq!(p.next_point(0.5).map(|p| p.time), Some(1.0));
        assert_eq!(p.next_point(-3.0).map(|p| p.time), Some(0.0));
        assert!(p.next_point(2.0).is_none());
        assert!(p.next_point(7.0).is_none());
    }

    #[test]
    fn next_point_on_empty_path() {
        let p = path(&[]);
        assert!(p.is_empty());
        assert!(p.next_point(0.0).is_none());
        assert!(p.time_range().is_none());
    }

    #[test]
    fn next_point_is_monotonic() {
        let p = path(&[0.0, 3.0, 4.5, 9.0, 12.0, 20.0]);
        let probes = [-1.0, 0.0, 1.0, 3.0, 4.0, 4.5, 8.9, 9.0, 15.0, 19.9];
        for w in probes.windows(2) {
            let (t1, t2) = (w[0], w[1]);
            if let (Some(a), Some(b)) = (p.next_point(t1), p.next_point(t2)) {
                assert!(a.time <= b.time, "next({t1}) > next({t2})");
            }
        }
    }
}
