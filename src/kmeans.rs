//! Weighted K-means clusterer (step-wise Lloyd's algorithm).

use crate::error::Result;
use crate::random::Random;
use crate::vector::WeightedVector;

/// Step-wise weighted K-means. Call [`KMeans::step`] until `delta <= epsilon`.
pub struct KMeans<'a> {
    points: &'a [WeightedVector],
    centroids: Vec<WeightedVector>,
    current_iteration: u32,
    delta: f64,
}

impl<'a> KMeans<'a> {
    /// Create a clusterer over `points` with `k` clusters. If
    /// `initial_centroids` is `None`, `k` centroids are drawn from `points`
    /// via `rng`.
    pub fn new(
        points: &'a [WeightedVector],
        k: usize,
        rng: &mut Random,
        initial_centroids: Option<Vec<WeightedVector>>,
    ) -> Self {
        let centroids = initial_centroids.unwrap_or_else(|| {
            (0..k)
                .map(|_| points[rng.choice_index(points.len())].clone())
                .collect()
        });
        Self {
            points,
            centroids,
            current_iteration: 0,
            delta: f64::INFINITY,
        }
    }

    pub fn centroids(&self) -> &[WeightedVector] {
        &self.centroids
    }

    pub fn current_iteration(&self) -> u32 {
        self.current_iteration
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Classify a point to its nearest centroid id (ties broken toward the
    /// lowest index).
    pub fn classify(&self, point: &WeightedVector) -> usize {
        let mut best = 0usize;
        let mut best_dist = f64::INFINITY;
        for (k, c) in self.centroids.iter().enumerate() {
            let d = point.distance_to(c);
            if d < best_dist {
                best_dist = d;
                best = k;
            }
        }
        best
    }

    /// Run one assignment + update step. Returns the new `delta`.
    pub fn step(&mut self) -> Result<f64> {
        let k = self.centroids.len();
        let mut members: Vec<Vec<&WeightedVector>> = vec![Vec::new(); k];
        for p in self.points {
            let cluster = self.classify(p);
            members[cluster].push(p);
        }

        let mut total_delta = 0.0;
        let mut new_centroids = Vec::with_capacity(k);
        for (idx, assigned) in members.into_iter().enumerate() {
            let old = &self.centroids[idx];
            if assigned.is_empty() {
                new_centroids.push(old.clone());
                continue;
            }
            let owned: Vec<WeightedVector> = assigned.into_iter().cloned().collect();
            let new_centroid = WeightedVector::average(&owned)?;
            total_delta += new_centroid.distance_to(old);
            new_centroids.push(new_centroid);
        }

        self.centroids = new_centroids;
        self.current_iteration += 1;
        self.delta = total_delta;
        Ok(total_delta)
    }

    /// Step until `delta <= epsilon` or `max_iterations` is reached.
    pub fn converge(&mut self, epsilon: f64, max_iterations: u32) -> Result<()> {
        loop {
            let delta = self.step()?;
            if delta <= epsilon || self.current_iteration >= max_iterations {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec2(x: f64, y: f64) -> WeightedVector {
        WeightedVector::new(vec![x, y], 1.0, [0, 0, 0])
    }

    #[test]
    fn converges_on_two_well_separated_clusters() {
        let points = vec![
            vec2(0.0, 0.0),
            vec2(0.0, 1.0),
            vec2(1.0, 0.0),
            vec2(100.0, 100.0),
            vec2(100.0, 101.0),
            vec2(101.0, 100.0),
        ];
        let mut rng = Random::new(1);
        let initial = vec![vec2(0.0, 0.0), vec2(100.0, 100.0)];
        let mut km = KMeans::new(&points, 2, &mut rng, Some(initial));
        km.converge(0.001, 100).unwrap();

        let c0 = km.classify(&vec2(0.3, 0.3));
        let c1 = km.classify(&vec2(100.3, 100.3));
        assert_ne!(c0, c1);
    }

    #[test]
    fn empty_cluster_centroid_is_left_unchanged() {
        let points = vec![vec2(0.0, 0.0), vec2(0.1, 0.1)];
        let mut rng = Random::new(1);
        let initial = vec![vec2(0.0, 0.0), vec2(1000.0, 1000.0)];
        let mut km = KMeans::new(&points, 2, &mut rng, Some(initial));
        km.step().unwrap();
        assert_eq!(km.centroids()[1].values, vec![1000.0, 1000.0]);
    }

    #[test]
    fn ties_break_to_lowest_cluster_id() {
        let points = vec![vec2(5.0, 0.0)];
        let mut rng = Random::new(1);
        let initial = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let km = KMeans::new(&points, 2, &mut rng, Some(initial));
        assert_eq!(km.classify(&vec2(5.0, 0.0)), 0);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let points: Vec<WeightedVector> = (0..20)
            .map(|i| vec2((i % 5) as f64, (i / 5) as f64))
            .collect();

        let mut rng1 = Random::new(42);
        let mut km1 = KMeans::new(&points, 3, &mut rng1, None);
        km1.converge(0.01, 50).unwrap();

        let mut rng2 = Random::new(42);
        let mut km2 = KMeans::new(&points, 3, &mut rng2, None);
        km2.converge(0.01, 50).unwrap();

        assert_eq!(km1.centroids().len(), km2.centroids().len());
        for (a, b) in km1.centroids().iter().zip(km2.centroids().iter()) {
            assert_eq!(a.values, b.values);
        }
    }
}
