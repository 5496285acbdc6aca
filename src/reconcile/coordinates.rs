//! Representative coordinate per location from many block-level samples.
//!
//! The centroid of a concave settlement can fall outside it, so instead of
//! averaging we pick the real sample closest to the center of the samples'
//! bounding box.

use geo::{BoundingRect, Distance, Euclidean, MultiPoint, Point};
use hashbrown::HashMap;
use std::hash::Hash;

use crate::models::Coordinate;

/// Accumulates samples per key; `resolve` consumes it, so no sample can be
/// added after resolution starts.
#[derive(Debug, Clone)]
pub struct CoordinateConsolidator<K> {
    groups: HashMap<K, Vec<Coordinate>>,
    samples: usize,
}

impl<K: Eq + Hash> CoordinateConsolidator<K> {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            samples: 0,
        }
    }

    pub fn add(&mut self, key: K, sample: Coordinate) {
        self.groups.entry(key).or_default().push(sample);
        self.samples += 1;
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// One representative coordinate per key.
    pub fn resolve(self) -> HashMap<K, Coordinate> {
        self.groups
            .into_iter()
            .filter_map(|(key, samples)| representative(&samples).map(|c| (key, c)))
            .collect()
    }
}

impl<K: Eq + Hash> Default for CoordinateConsolidator<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// The sample nearest to the center of the samples' bounding box.
///
/// Ties go to the smallest (lng, lat), so the choice does not depend on
/// sample order.
pub fn representative(samples: &[Coordinate]) -> Option<Coordinate> {
    let points: MultiPoint<f64> = samples.iter().map(to_point).collect();
    let center = Point::from(points.bounding_rect()?.center());

    samples.iter().copied().min_by(|a, b| {
        let da = Euclidean.distance(to_point(a), center);
        let db = Euclidean.distance(to_point(b), center);
        da.total_cmp(&db)
            .then(a.lng.total_cmp(&b.lng))
            .then(a.lat.total_cmp(&b.lat))
    })
}

fn to_point(c: &Coordinate) -> Point<f64> {
    Point::new(c.lng, c.lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_corners_pick_a_corner() {
        let samples = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 2.0),
            Coordinate::new(2.0, 0.0),
            Coordinate::new(2.0, 2.0),
        ];
        let chosen = representative(&samples).unwrap();
        assert!(samples.contains(&chosen));
        assert_ne!(chosen, Coordinate::new(1.0, 1.0));
        assert_eq!(chosen, Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn test_order_independent() {
        let mut samples = vec![
            Coordinate::new(2.0, 2.0),
            Coordinate::new(0.0, 2.0),
            Coordinate::new(2.0, 0.0),
            Coordinate::new(0.0, 0.0),
        ];
        let first = representative(&samples);
        samples.reverse();
        assert_eq!(representative(&samples), first);
    }

    #[test]
    fn test_nearest_to_bbox_center_not_mean() {
        // The mean sits near the cluster; the bbox center is (lat 5, lng 5)
        let samples = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.1, 0.1),
            Coordinate::new(0.2, 0.0),
            Coordinate::new(0.0, 0.2),
            Coordinate::new(0.1, 0.0),
            Coordinate::new(4.0, 6.0),
            Coordinate::new(10.0, 10.0),
        ];
        assert_eq!(representative(&samples), Some(Coordinate::new(4.0, 6.0)));
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(representative(&[]), None);
        let one = Coordinate::new(36.5, 138.1);
        assert_eq!(representative(&[one]), Some(one));
    }

    #[test]
    fn test_consolidator_groups_by_key() {
        let mut consolidator = CoordinateConsolidator::new();
        consolidator.add("a", Coordinate::new(0.0, 0.0));
        consolidator.add("a", Coordinate::new(0.0, 4.0));
        consolidator.add("a", Coordinate::new(0.0, 1.5));
        consolidator.add("b", Coordinate::new(5.0, 5.0));
        assert_eq!(consolidator.group_count(), 2);
        assert_eq!(consolidator.sample_count(), 4);

        let resolved = consolidator.resolve();
        assert_eq!(resolved["a"], Coordinate::new(0.0, 1.5));
        assert_eq!(resolved["b"], Coordinate::new(5.0, 5.0));
    }
}
