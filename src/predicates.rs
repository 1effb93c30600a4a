//! Geometric tests and score shapes shared by every relation scorer.

use std::f64::consts::TAU;

use nalgebra::{Point3, Vector2, Vector3};

use crate::error::RelationResult;
use crate::geometry::{LocalAxis, OrientedBox, Side};
use crate::sampler::Sampler;

/// True if `point` lies within the half extents (grown by `epsilon`) on all local axes.
pub fn contains(bbox: &OrientedBox, point: &Point3<f64>, epsilon: f64) -> bool {
    let local = bbox.to_local(point);
    (0..3).all(|i| local[i].abs() <= bbox.half_extents[i] + epsilon)
}

/// A point projected onto the plane of one box face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceProjection {
    /// Perpendicular distance to the face plane, positive outside the box.
    pub signed_distance: f64,
    /// Offset from the box center along the face normal.
    pub normal_offset: f64,
    /// Face-local 2D coordinates, centered on the face.
    pub uv: Vector2<f64>,
    /// Whether `uv` lies inside the face rectangle grown by the margin.
    pub in_bounds: bool,
}

/// Projects `point` onto the plane of `face`.
///
/// `margin` is fractional slack: 0.25 grows each face half extent by 25%. The signed
/// distance is reported whether or not the projection is in bounds.
pub fn project_to_face(
    bbox: &OrientedBox,
    face: LocalAxis,
    point: &Point3<f64>,
    margin: f64,
) -> FaceProjection {
    let local = bbox.to_local(point);
    let (u_axis, v_axis) = face.in_face_indices();
    let normal_offset = face.sign() * local[face.index()];
    let uv = Vector2::new(local[u_axis], local[v_axis]);
    let scale = 1.0 + margin;
    FaceProjection {
        signed_distance: normal_offset - bbox.half_extents[face.index()],
        normal_offset,
        uv,
        in_bounds: uv.x.abs() <= bbox.half_extents[u_axis] * scale
            && uv.y.abs() <= bbox.half_extents[v_axis] * scale,
    }
}

fn clamp_to_box(bbox: &OrientedBox, local: &Vector3<f64>) -> Vector3<f64> {
    Vector3::from_fn(|i, _| local[i].clamp(-bbox.half_extents[i], bbox.half_extents[i]))
}

/// Unsigned distance from `point` to the nearest point of the box surface.
///
/// Where the foot of the perpendicular lands on a face this is the perpendicular distance
/// to that face; inside the box it is the distance to the closest face.
pub fn face_distance(bbox: &OrientedBox, point: &Point3<f64>) -> f64 {
    let local = bbox.to_local(point);
    let h = &bbox.half_extents;
    let inside = (0..3).all(|i| local[i].abs() <= h[i]);
    if inside {
        (0..3)
            .map(|i| h[i] - local[i].abs())
            .fold(f64::INFINITY, f64::min)
    } else {
        (local - clamp_to_box(bbox, &local)).norm()
    }
}

/// Distance from `point` to the solid box; zero inside.
pub fn point_box_distance(bbox: &OrientedBox, point: &Point3<f64>) -> f64 {
    let local = bbox.to_local(point);
    (local - clamp_to_box(bbox, &local)).norm()
}

/// Surface-to-surface gap between two boxes, zero when they touch or overlap.
///
/// Both boxes' surface samples are measured against the other box and the smaller
/// minimum wins, which makes the result symmetric in its arguments.
pub fn surface_gap(sampler: &Sampler, a: &OrientedBox, b: &OrientedBox) -> f64 {
    let one_way = |from: &OrientedBox, to: &OrientedBox| {
        sampler
            .surface(from)
            .iter()
            .map(|point| point_box_distance(to, point))
            .fold(f64::INFINITY, f64::min)
    };
    one_way(b, a).min(one_way(a, b))
}

/// Vertical side faces split by the horizontal extent they span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongShortSides {
    pub long: [LocalAxis; 2],
    pub short: [LocalAxis; 2],
}

/// Partitions the four vertical faces into long and short sides.
///
/// On a square footprint left/right count as long and front/back as short.
pub fn long_short_sides(bbox: &OrientedBox) -> RelationResult<LongShortSides> {
    let front = bbox.side_face(Side::Front)?;
    let right = bbox.side_face(Side::Right)?;
    let front_back = [front, front.opposite()];
    let left_right = [right, right.opposite()];
    // A face perpendicular to the front axis spans the right axis, and vice versa.
    let front_back_span = bbox.half_extents[right.index()];
    let left_right_span = bbox.half_extents[front.index()];
    Ok(if front_back_span > left_right_span {
        LongShortSides {
            long: front_back,
            short: left_right,
        }
    } else {
        LongShortSides {
            long: left_right,
            short: front_back,
        }
    })
}

/// Horizontal bearing of `to` as seen from `from`, in radians within `[0, 2pi)`.
///
/// Returns `None` when the two points are vertically aligned.
pub fn horizontal_bearing(from: &Point3<f64>, to: &Point3<f64>) -> Option<f64> {
    let delta = Vector2::new(to.x - from.x, to.y - from.y);
    if delta.norm() < 1e-9 {
        return None;
    }
    Some(delta.y.atan2(delta.x).rem_euclid(TAU))
}

/// Angle between two horizontal directions, in degrees within `[0, 180]`.
pub fn angle_between(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let norms = a.norm() * b.norm();
    if norms < 1e-12 {
        return 180.0;
    }
    (a.dot(b) / norms).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Outcome of a facing test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facing {
    /// Deviation of `a`'s front from the direction towards `b`, in degrees.
    pub deviation_degrees: f64,
    pub within_tolerance: bool,
}

/// Whether `a`'s horizontal front points at `b`'s center within `max_deviation_degrees`.
///
/// A vertical front, or coincident centers, counts as the worst possible deviation.
pub fn facing(a: &OrientedBox, b: &OrientedBox, max_deviation_degrees: f64) -> Facing {
    let towards = Vector2::new(b.center.x - a.center.x, b.center.y - a.center.y);
    let deviation_degrees = match a.front_direction() {
        Some(front) => angle_between(&front, &towards),
        None => 180.0,
    };
    Facing {
        deviation_degrees,
        within_tolerance: deviation_degrees <= max_deviation_degrees,
    }
}

/// Unnormalized Gaussian falloff: 1 at zero, `exp(-x^2 / 2 std^2)` elsewhere.
pub fn gaussian(x: f64, std: f64) -> f64 {
    (-(x * x) / (2.0 * std * std)).exp()
}

/// 1 inside `[min, max)`, Gaussian decay with the distance to the band outside it.
pub fn range_score(value: f64, [min, max]: [f64; 2], std: f64) -> f64 {
    if value >= min && value < max {
        return 1.0;
    }
    let excess = if value < min { min - value } else { value - max };
    gaussian(excess.max(0.0), std)
}

/// 1 within the tolerance, then linear decay to 0 at 180 degrees.
pub fn angular_decay(deviation_degrees: f64, max_deviation_degrees: f64) -> f64 {
    if deviation_degrees <= max_deviation_degrees {
        return 1.0;
    }
    let span = 180.0 - max_deviation_degrees;
    if span <= 0.0 {
        return 0.0;
    }
    (1.0 - (deviation_degrees - max_deviation_degrees) / span).clamp(0.0, 1.0)
}

/// How evenly a set of bearings spreads around the circle.
///
/// 1 for equal angular gaps, 0 when every bearing coincides. Fewer than two bearings
/// cannot spread and score 0.
pub fn angular_spread(bearings: &[f64]) -> f64 {
    let n = bearings.len();
    if n < 2 {
        return 0.0;
    }
    let mut sorted: Vec<f64> = bearings.iter().map(|b| b.rem_euclid(TAU)).collect();
    sorted.sort_by(f64::total_cmp);
    let ideal = TAU / n as f64;
    let deviation: f64 = (0..n)
        .map(|i| {
            let gap = if i + 1 < n {
                sorted[i + 1] - sorted[i]
            } else {
                sorted[0] + TAU - sorted[i]
            };
            (gap - ideal).abs()
        })
        .sum();
    let worst = 2.0 * (TAU - ideal);
    (1.0 - deviation / worst).clamp(0.0, 1.0)
}
