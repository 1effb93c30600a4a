//! Oriented bounding boxes and their semantic faces.
//!
//! Boxes wrap the posed geometry of a scene object: a center, positive half extents along
//! the local axes and a rotation into the world frame (Z up). The mapping from semantic
//! sides (front, left, ...) to local axes comes from object metadata through a
//! [`FaceFrame`] and is never inferred here.

use nalgebra::{Point3, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{RelationError, RelationResult};

/// One of the six local box faces, named by its outward axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalAxis {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl LocalAxis {
    pub const ALL: [LocalAxis; 6] = [
        LocalAxis::PosX,
        LocalAxis::NegX,
        LocalAxis::PosY,
        LocalAxis::NegY,
        LocalAxis::PosZ,
        LocalAxis::NegZ,
    ];

    /// Index of the local coordinate this face is perpendicular to.
    pub fn index(&self) -> usize {
        match self {
            LocalAxis::PosX | LocalAxis::NegX => 0,
            LocalAxis::PosY | LocalAxis::NegY => 1,
            LocalAxis::PosZ | LocalAxis::NegZ => 2,
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            LocalAxis::PosX | LocalAxis::PosY | LocalAxis::PosZ => 1.0,
            LocalAxis::NegX | LocalAxis::NegY | LocalAxis::NegZ => -1.0,
        }
    }

    pub fn opposite(&self) -> LocalAxis {
        match self {
            LocalAxis::PosX => LocalAxis::NegX,
            LocalAxis::NegX => LocalAxis::PosX,
            LocalAxis::PosY => LocalAxis::NegY,
            LocalAxis::NegY => LocalAxis::PosY,
            LocalAxis::PosZ => LocalAxis::NegZ,
            LocalAxis::NegZ => LocalAxis::PosZ,
        }
    }

    /// Outward unit normal in local coordinates.
    pub fn unit(&self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = self.sign();
        v
    }

    /// The two local coordinates spanning this face, in ascending order.
    pub fn in_face_indices(&self) -> (usize, usize) {
        match self.index() {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        }
    }

    fn from_unit(v: &Vector3<f64>) -> Option<LocalAxis> {
        LocalAxis::ALL
            .into_iter()
            .find(|axis| (axis.unit() - v).norm() < 1e-9)
    }
}

/// Semantic box sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

/// Declared front and up axes of an object, in its local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceFrame {
    pub front: LocalAxis,
    pub up: LocalAxis,
}

impl Default for FaceFrame {
    fn default() -> Self {
        Self {
            front: LocalAxis::PosY,
            up: LocalAxis::PosZ,
        }
    }
}

impl FaceFrame {
    pub fn new(front: LocalAxis, up: LocalAxis) -> Self {
        Self { front, up }
    }

    /// Maps a semantic side onto a local face.
    ///
    /// Right is `front x up`; a frame whose front and up share an axis is rejected.
    pub fn face(&self, side: Side) -> RelationResult<LocalAxis> {
        if self.front.index() == self.up.index() {
            return Err(RelationError::Geometry(format!(
                "face frame has parallel front ({:?}) and up ({:?}) axes",
                self.front, self.up
            )));
        }
        let right = LocalAxis::from_unit(&self.front.unit().cross(&self.up.unit())).ok_or_else(
            || RelationError::Geometry("face frame axes are not orthogonal".into()),
        )?;
        Ok(match side {
            Side::Front => self.front,
            Side::Back => self.front.opposite(),
            Side::Top => self.up,
            Side::Bottom => self.up.opposite(),
            Side::Right => right,
            Side::Left => right.opposite(),
        })
    }
}

/// An oriented bounding box of one posed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    /// Stable identifier; seeds the sampling streams of this box.
    pub id: String,
    pub center: Point3<f64>,
    pub half_extents: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    #[serde(default)]
    pub frame: FaceFrame,
}

impl OrientedBox {
    pub fn new(
        id: impl Into<String>,
        center: Point3<f64>,
        half_extents: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            center,
            half_extents,
            rotation,
            frame: FaceFrame::default(),
        }
    }

    /// An unrotated box from its full size along x, y and z.
    pub fn axis_aligned(id: impl Into<String>, center: Point3<f64>, size: Vector3<f64>) -> Self {
        Self::new(id, center, size * 0.5, UnitQuaternion::identity())
    }

    pub fn with_frame(mut self, frame: FaceFrame) -> Self {
        self.frame = frame;
        self
    }

    pub fn volume(&self) -> f64 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    pub fn face_area(&self, face: LocalAxis) -> f64 {
        let (u, v) = face.in_face_indices();
        4.0 * self.half_extents[u] * self.half_extents[v]
    }

    /// World direction of a local coordinate axis.
    pub fn axis(&self, index: usize) -> Vector3<f64> {
        let mut local = Vector3::zeros();
        local[index] = 1.0;
        self.rotation * local
    }

    pub fn face_normal(&self, face: LocalAxis) -> Vector3<f64> {
        self.rotation * face.unit()
    }

    pub fn face_center(&self, face: LocalAxis) -> Point3<f64> {
        self.center + self.face_normal(face) * self.half_extents[face.index()]
    }

    /// World point to local box coordinates (relative to the center).
    pub fn to_local(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&(point - self.center))
    }

    pub fn to_world(&self, local: &Vector3<f64>) -> Point3<f64> {
        self.center + self.rotation * local
    }

    pub fn corners(&self) -> [Point3<f64>; 8] {
        let h = self.half_extents;
        let mut corners = [self.center; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let local = Vector3::new(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            );
            *corner = self.to_world(&local);
        }
        corners
    }

    pub fn min_z(&self) -> f64 {
        self.corners()
            .iter()
            .map(|corner| corner.z)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_z(&self) -> f64 {
        self.corners()
            .iter()
            .map(|corner| corner.z)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Half the diagonal of the box footprint, measured across its non-up axes.
    pub fn horizontal_half_diagonal(&self) -> f64 {
        let up = self.frame.up.index();
        (0..3)
            .filter(|i| *i != up)
            .map(|i| self.half_extents[i].powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// The local face carrying a semantic side.
    pub fn side_face(&self, side: Side) -> RelationResult<LocalAxis> {
        self.frame.face(side)
    }

    /// Front direction projected onto the horizontal plane; `None` if it points vertically.
    pub fn front_direction(&self) -> Option<Vector2<f64>> {
        let front = self.face_normal(self.frame.front);
        let horizontal = Vector2::new(front.x, front.y);
        let norm = horizontal.norm();
        (norm > 1e-9).then(|| horizontal / norm)
    }

    /// Fails fast on degenerate boxes.
    pub fn ensure_valid(&self, epsilon: f64) -> RelationResult<()> {
        let h = &self.half_extents;
        if !h.iter().all(|e| e.is_finite()) || !self.center.iter().all(|c| c.is_finite()) {
            return Err(RelationError::Geometry(format!(
                "box `{}` has non-finite coordinates",
                self.id
            )));
        }
        if h.iter().any(|e| *e < epsilon) {
            return Err(RelationError::Geometry(format!(
                "box `{}` has a half extent below {epsilon}: [{}, {}, {}]",
                self.id, h.x, h.y, h.z
            )));
        }
        if self.volume() < epsilon.powi(3) {
            return Err(RelationError::Geometry(format!(
                "box `{}` has near-zero volume",
                self.id
            )));
        }
        self.frame.face(Side::Right).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn unit_box() -> OrientedBox {
        OrientedBox::axis_aligned("box", Point3::origin(), Vector3::new(2.0, 4.0, 6.0))
    }

    #[test]
    fn default_frame_maps_sides() {
        let frame = FaceFrame::default();
        assert_eq!(frame.face(Side::Front).ok(), Some(LocalAxis::PosY));
        assert_eq!(frame.face(Side::Back).ok(), Some(LocalAxis::NegY));
        assert_eq!(frame.face(Side::Right).ok(), Some(LocalAxis::PosX));
        assert_eq!(frame.face(Side::Left).ok(), Some(LocalAxis::NegX));
        assert_eq!(frame.face(Side::Top).ok(), Some(LocalAxis::PosZ));
        assert_eq!(frame.face(Side::Bottom).ok(), Some(LocalAxis::NegZ));
    }

    #[test]
    fn custom_frame_maps_right_by_cross_product() {
        let frame = FaceFrame::new(LocalAxis::NegX, LocalAxis::PosZ);
        assert_eq!(frame.face(Side::Right).ok(), Some(LocalAxis::PosY));
        assert_eq!(frame.face(Side::Left).ok(), Some(LocalAxis::NegY));

        let parallel = FaceFrame::new(LocalAxis::PosZ, LocalAxis::NegZ);
        assert!(parallel.face(Side::Left).is_err());
    }

    #[test]
    fn box_measures() {
        let b = unit_box();
        assert!((b.volume() - 48.0).abs() < 1e-12);
        assert!((b.face_area(LocalAxis::PosZ) - 8.0).abs() < 1e-12);
        assert!((b.face_area(LocalAxis::NegX) - 24.0).abs() < 1e-12);
        assert!((b.min_z() + 3.0).abs() < 1e-12);
        assert!((b.max_z() - 3.0).abs() < 1e-12);
        assert!((b.horizontal_half_diagonal() - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rotation_moves_faces_and_front() {
        let b = OrientedBox::new(
            "rotated",
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.5, 0.5),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let center = b.face_center(LocalAxis::PosX);
        assert!((center - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);

        let front = b.front_direction().expect("horizontal front");
        assert!((front - Vector2::new(-1.0, 0.0)).norm() < 1e-12);

        let local = b.to_local(&Point3::new(1.0, 1.0, 0.0));
        assert!((local - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn degenerate_boxes_are_rejected() {
        let flat = OrientedBox::axis_aligned("rug", Point3::origin(), Vector3::new(2.0, 3.0, 0.0));
        assert!(matches!(
            flat.ensure_valid(1e-6),
            Err(RelationError::Geometry(_))
        ));
        assert!(unit_box().ensure_valid(1e-6).is_ok());
    }
}
