//! Deterministic point sampling on box volumes and faces.
//!
//! Points follow a Halton sequence shifted by a per-box random offset (Cranley-Patterson
//! rotation). The offset comes from a `StdRng` whose seed is derived from the global seed,
//! the box id and the point-set kind, so a box always gets the same points no matter which
//! thread samples it or in which order boxes are visited.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RelationConfig;
use crate::geometry::{LocalAxis, OrientedBox};

const HALTON_BASES: [u64; 3] = [2, 3, 5];

/// Shared point cloud.
pub type PointCloud = Arc<Vec<Point3<f64>>>;

/// The kind of point set sampled from a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointSet {
    Volume,
    Face(LocalAxis),
    /// All six faces plus corners and face centers.
    Surface,
}

impl PointSet {
    fn tag(&self) -> String {
        match self {
            PointSet::Volume => "volume".to_string(),
            PointSet::Face(face) => format!("face:{face:?}"),
            PointSet::Surface => "surface".to_string(),
        }
    }
}

/// Seed of the random stream owned by one (box, point set) pair.
pub fn stream_seed(seed: u64, bbox: &OrientedBox, set: PointSet) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(bbox.id.as_bytes());
    hasher.update(set.tag().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn radical_inverse(mut index: u64, base: u64) -> f64 {
    let mut inverse = 0.0;
    let mut fraction = 1.0 / base as f64;
    while index > 0 {
        inverse += (index % base) as f64 * fraction;
        index /= base;
        fraction /= base as f64;
    }
    inverse
}

/// `count` points of a shifted Halton sequence in `[0, 1)^dims`.
fn shifted_halton<const DIMS: usize>(count: usize, stream: u64) -> Vec<[f64; DIMS]> {
    let mut rng = StdRng::seed_from_u64(stream);
    let mut shift = [0.0; DIMS];
    for value in shift.iter_mut() {
        *value = rng.gen::<f64>();
    }
    (1..=count as u64)
        .map(|index| {
            let mut point = [0.0; DIMS];
            for (d, value) in point.iter_mut().enumerate() {
                *value = (radical_inverse(index, HALTON_BASES[d]) + shift[d]).fract();
            }
            point
        })
        .collect()
}

fn point_count(measure: f64, density: f64, min_count: usize, max_count: usize) -> usize {
    let wanted = (measure * density).ceil();
    let wanted = if wanted.is_finite() && wanted > 0.0 {
        wanted.min(max_count as f64) as usize
    } else {
        0
    };
    wanted.max(min_count).max(1)
}

/// Samples points inside the box volume.
///
/// `density` is points per cubic meter; `min_count` is a floor so tiny boxes still get
/// meaningful coverage.
pub fn sample_volume(
    bbox: &OrientedBox,
    density: f64,
    min_count: usize,
    seed: u64,
) -> Vec<Point3<f64>> {
    sample_volume_capped(bbox, density, min_count, usize::MAX, seed)
}

fn sample_volume_capped(
    bbox: &OrientedBox,
    density: f64,
    min_count: usize,
    max_count: usize,
    seed: u64,
) -> Vec<Point3<f64>> {
    let count = point_count(bbox.volume(), density, min_count, max_count);
    let h = bbox.half_extents;
    shifted_halton::<3>(count, stream_seed(seed, bbox, PointSet::Volume))
        .into_iter()
        .map(|[u, v, w]| {
            bbox.to_world(&Vector3::new(
                (2.0 * u - 1.0) * h.x,
                (2.0 * v - 1.0) * h.y,
                (2.0 * w - 1.0) * h.z,
            ))
        })
        .collect()
}

/// Samples points on one face of the box. `density` is points per square meter.
pub fn sample_face(
    bbox: &OrientedBox,
    face: LocalAxis,
    density: f64,
    min_count: usize,
    seed: u64,
) -> Vec<Point3<f64>> {
    sample_face_capped(bbox, face, density, min_count, usize::MAX, seed)
}

fn sample_face_capped(
    bbox: &OrientedBox,
    face: LocalAxis,
    density: f64,
    min_count: usize,
    max_count: usize,
    seed: u64,
) -> Vec<Point3<f64>> {
    let count = point_count(bbox.face_area(face), density, min_count, max_count);
    let (u_axis, v_axis) = face.in_face_indices();
    let h = bbox.half_extents;
    shifted_halton::<2>(count, stream_seed(seed, bbox, PointSet::Face(face)))
        .into_iter()
        .map(|[u, v]| {
            let mut local = face.unit() * h[face.index()];
            local[u_axis] = (2.0 * u - 1.0) * h[u_axis];
            local[v_axis] = (2.0 * v - 1.0) * h[v_axis];
            bbox.to_world(&local)
        })
        .collect()
}

/// Samples the whole box surface, including its corners and face centers so that extreme
/// points are always represented.
pub fn sample_surface(
    bbox: &OrientedBox,
    density: f64,
    min_count_per_face: usize,
    seed: u64,
) -> Vec<Point3<f64>> {
    sample_surface_capped(bbox, density, min_count_per_face, usize::MAX, seed)
}

fn sample_surface_capped(
    bbox: &OrientedBox,
    density: f64,
    min_count_per_face: usize,
    max_count: usize,
    seed: u64,
) -> Vec<Point3<f64>> {
    let mut points: Vec<Point3<f64>> = bbox.corners().to_vec();
    for face in LocalAxis::ALL {
        points.push(bbox.face_center(face));
        points.extend(sample_face_capped(
            bbox,
            face,
            density,
            min_count_per_face,
            max_count,
            seed,
        ));
    }
    points
}

/// Point clouds cached per box geometry and point-set kind.
///
/// The first caller for a key samples; concurrent callers for the same key block on that
/// single pass and then share its result. Every pose of a box is a separate entry, so the
/// cache is meant to cover one scene snapshot and be cleared between snapshots.
#[derive(Debug, Default)]
pub struct PointCloudCache {
    entries: DashMap<blake3::Hash, Arc<OnceLock<PointCloud>>>,
}

impl PointCloudCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Clouds already handed out stay alive with their holders.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn key(bbox: &OrientedBox, set: PointSet) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(bbox.id.as_bytes());
        hasher.update(set.tag().as_bytes());
        let q = bbox.rotation.quaternion().coords;
        for value in bbox
            .center
            .iter()
            .chain(bbox.half_extents.iter())
            .chain(q.iter())
        {
            hasher.update(&value.to_bits().to_le_bytes());
        }
        hasher.update(&[bbox.frame.front as u8, bbox.frame.up as u8]);
        hasher.finalize()
    }

    pub fn get_or_sample<F>(&self, bbox: &OrientedBox, set: PointSet, sample: F) -> PointCloud
    where
        F: FnOnce() -> Vec<Point3<f64>>,
    {
        let cell = Arc::clone(
            self.entries
                .entry(Self::key(bbox, set))
                .or_default()
                .value(),
        );
        Arc::clone(cell.get_or_init(|| Arc::new(sample())))
    }
}

/// Sampling front end bound to one configuration.
#[derive(Debug)]
pub struct Sampler {
    seed: u64,
    volume_density: f64,
    face_density: f64,
    min_volume_points: usize,
    min_face_points: usize,
    max_points: usize,
    cache: Option<PointCloudCache>,
}

impl Sampler {
    pub fn new(config: &RelationConfig) -> Self {
        let sampling = &config.sampling;
        Self {
            seed: sampling.seed,
            volume_density: sampling.volume_density,
            face_density: sampling.face_density,
            min_volume_points: sampling.min_volume_points,
            min_face_points: config.spatial.distance_score.min_num_sample_points,
            max_points: sampling.max_points,
            cache: sampling.presample.then(PointCloudCache::new),
        }
    }

    pub fn cache(&self) -> Option<&PointCloudCache> {
        self.cache.as_ref()
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn volume(&self, bbox: &OrientedBox) -> PointCloud {
        self.fetch(bbox, PointSet::Volume, || {
            sample_volume_capped(
                bbox,
                self.volume_density,
                self.min_volume_points,
                self.max_points,
                self.seed,
            )
        })
    }

    pub fn face(&self, bbox: &OrientedBox, face: LocalAxis) -> PointCloud {
        self.fetch(bbox, PointSet::Face(face), || {
            sample_face_capped(
                bbox,
                face,
                self.face_density,
                self.min_face_points,
                self.max_points,
                self.seed,
            )
        })
    }

    pub fn surface(&self, bbox: &OrientedBox) -> PointCloud {
        self.fetch(bbox, PointSet::Surface, || {
            sample_surface_capped(
                bbox,
                self.face_density,
                self.min_face_points,
                self.max_points,
                self.seed,
            )
        })
    }

    fn fetch<F>(&self, bbox: &OrientedBox, set: PointSet, sample: F) -> PointCloud
    where
        F: FnOnce() -> Vec<Point3<f64>>,
    {
        match &self.cache {
            Some(cache) => cache.get_or_sample(bbox, set, sample),
            None => Arc::new(sample()),
        }
    }
}
