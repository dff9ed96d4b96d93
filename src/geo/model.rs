use crate::geo::math::{circular_mean_degrees, distance, normalize_longitude};

/// Raw input row: an identifier with a latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl PointRecord {
    pub fn new(id: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
        }
    }

    /// True when latitude lies in [-90, 90] and longitude in [-180, 180].
    pub fn is_within_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A location in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in kilometers.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// A point being clustered.
///
/// `current_cluster` always names the cluster whose membership holds the point;
/// `pending_cluster` is the target chosen by the latest assignment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub current_cluster: usize,
    pub pending_cluster: usize,
}

impl DataPoint {
    pub fn from_record(record: &PointRecord, cluster: usize) -> Self {
        Self {
            id: record.id,
            latitude: record.latitude,
            longitude: record.longitude,
            current_cluster: cluster,
            pending_cluster: cluster,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn distance_to(&self, target: &Coordinate) -> f64 {
        distance(self.latitude, self.longitude, target.latitude, target.longitude)
    }
}

/// A group of points and its centroid.
///
/// The centroid is `None` until first computed. An empty cluster is a valid
/// transient state and keeps whatever centroid it last had.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    centroid: Option<Coordinate>,
    members: Vec<DataPoint>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn centroid(&self) -> Option<Coordinate> {
        self.centroid
    }

    /// Sets the centroid, normalizing its longitude into (-180, 180].
    pub fn set_centroid(&mut self, centroid: Coordinate) {
        self.centroid = Some(Coordinate::new(
            centroid.latitude,
            normalize_longitude(centroid.longitude),
        ));
    }

    pub fn members(&self) -> &[DataPoint] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Recomputes the centroid from the current members: arithmetic mean of
    /// latitudes, circular mean of longitudes. Returns `false` and leaves the
    /// centroid untouched when the cluster is empty.
    pub fn recompute_centroid(&mut self) -> bool {
        if self.members.is_empty() {
            return false;
        }
        let n = self.members.len() as f64;
        let latitude = self.members.iter().map(|p| p.latitude).sum::<f64>() / n;
        let longitude = circular_mean_degrees(self.members.iter().map(|p| p.longitude));
        self.set_centroid(Coordinate::new(latitude, longitude));
        true
    }

    /// Sum of member-to-centroid distances; 0 when empty or without a centroid.
    pub fn total_distance(&self) -> f64 {
        match self.centroid {
            Some(centroid) => self.members.iter().map(|p| p.distance_to(&centroid)).sum(),
            None => 0.0,
        }
    }

    /// The member nearest to the centroid, first occurrence winning ties.
    pub fn nearest_member(&self) -> Option<&DataPoint> {
        let centroid = self.centroid?;
        let mut best: Option<(&DataPoint, f64)> = None;
        for point in &self.members {
            let d = point.distance_to(&centroid);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((point, d)),
            }
        }
        best.map(|(point, _)| point)
    }

    pub(crate) fn members_mut(&mut self) -> &mut [DataPoint] {
        &mut self.members
    }

    fn push(&mut self, point: DataPoint) {
        self.members.push(point);
    }

    /// Removes and returns the members matching `pred`, preserving the order
    /// of both the removed and the remaining points.
    fn drain_where<F>(&mut self, pred: F) -> Vec<DataPoint>
    where
        F: FnMut(&DataPoint) -> bool,
    {
        let members = std::mem::take(&mut self.members);
        let (removed, kept): (Vec<_>, Vec<_>) = members.into_iter().partition(pred);
        self.members = kept;
        removed
    }
}

/// The full clustering state: exactly `k` clusters that own every point.
#[derive(Debug, Clone)]
pub struct ClusterModel {
    clusters: Vec<Cluster>,
}

impl ClusterModel {
    /// Creates `k` empty clusters.
    pub fn new(k: usize) -> Self {
        Self {
            clusters: (0..k).map(|_| Cluster::new()).collect(),
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// # Panics
    ///
    /// Panics if `index >= self.cluster_count()`.
    pub fn cluster(&self, index: usize) -> &Cluster {
        &self.clusters[index]
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Cluster::len).collect()
    }

    pub fn point_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// Iterates every point, cluster by cluster in membership order.
    pub fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.clusters.iter().flat_map(|c| c.members.iter())
    }

    /// True when every point's `current_cluster` matches the cluster holding it.
    pub fn is_consistent(&self) -> bool {
        self.clusters
            .iter()
            .enumerate()
            .all(|(idx, c)| c.members.iter().all(|p| p.current_cluster == idx))
    }

    /// Adds `point` to cluster `index` and points both of its ids at it.
    pub(crate) fn insert(&mut self, index: usize, mut point: DataPoint) {
        point.current_cluster = index;
        point.pending_cluster = index;
        self.clusters[index].push(point);
    }

    /// Removes every member of cluster `index`.
    pub(crate) fn take_members(&mut self, index: usize) -> Vec<DataPoint> {
        std::mem::take(&mut self.clusters[index].members)
    }

    /// Removes the members of cluster `index` matching `pred`.
    pub(crate) fn drain_where<F>(&mut self, index: usize, pred: F) -> Vec<DataPoint>
    where
        F: FnMut(&DataPoint) -> bool,
    {
        self.clusters[index].drain_where(pred)
    }

    pub(crate) fn set_centroid(&mut self, index: usize, centroid: Coordinate) {
        self.clusters[index].set_centroid(centroid);
    }

    pub(crate) fn clusters_mut(&mut self) -> &mut [Cluster] {
        &mut self.clusters
    }

    /// Recomputes every non-empty cluster's centroid.
    pub fn recompute_centroids(&mut self) {
        for cluster in &mut self.clusters {
            cluster.recompute_centroid();
        }
    }

    /// Mean distance from each point to its cluster's representative member.
    pub fn mean_representative_distance(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for cluster in &self.clusters {
            if let Some(rep) = cluster.nearest_member() {
                let rep = rep.coordinate();
                total += cluster.members.iter().map(|p| p.distance_to(&rep)).sum::<f64>();
                count += cluster.len();
            }
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}
