//! Architectural elements: walls, floor, ceiling and the room volume they bound.
//!
//! Elements are built either directly from a floor outline or from an `arch@1.0.2`
//! architecture document. Windows and doors are kept as openings on their wall but are
//! never scored on their own.

use nalgebra::{Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RelationError, RelationResult};

const SUPPORTED_ARCH_VERSION: &str = "arch@1.0.2";

/// Kind of wall opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpeningKind {
    Window,
    Door,
}

/// A window or door cut into a wall; `min`/`max` are in the document's hole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub id: String,
    pub kind: OpeningKind,
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// A finite vertical wall rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub id: String,
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub base_elevation: f64,
    pub height: f64,
    pub thickness: f64,
    /// Horizontal unit normal pointing into the room.
    pub inward: Vector2<f64>,
    #[serde(default)]
    pub openings: Vec<Opening>,
}

/// A point projected onto a wall plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallProjection {
    /// Distance to the wall plane, positive on the room side.
    pub signed_distance: f64,
    pub in_bounds: bool,
}

impl Wall {
    /// A wall between two floor points whose inward normal points into `floor`.
    ///
    /// The side is chosen by testing a point just off the wall midpoint against the floor
    /// polygon, so inner-corner walls of concave rooms face the right way. Walls that do not
    /// border the polygon fall back to its winding.
    pub fn between(
        id: impl Into<String>,
        start: Point2<f64>,
        end: Point2<f64>,
        base_elevation: f64,
        height: f64,
        floor: &[Point2<f64>],
    ) -> Self {
        let direction = end - start;
        let length = direction.norm();
        let left = if length > 0.0 {
            Vector2::new(-direction.y, direction.x) / length
        } else {
            Vector2::zeros()
        };
        let midpoint = start + direction * 0.5;
        let step = (length * 1e-3).max(1e-6);
        let inward = if polygon_contains(floor, &(midpoint + left * step)) {
            left
        } else if polygon_contains(floor, &(midpoint - left * step)) {
            -left
        } else if polygon_area(floor) >= 0.0 {
            left
        } else {
            -left
        };
        Self {
            id: id.into(),
            start,
            end,
            base_elevation,
            height,
            thickness: 0.0,
            inward,
            openings: Vec::new(),
        }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Unit direction from `start` to `end`.
    pub fn direction(&self) -> Vector2<f64> {
        let d = self.end - self.start;
        let norm = d.norm();
        if norm > 0.0 {
            d / norm
        } else {
            d
        }
    }

    pub fn normal(&self) -> Vector3<f64> {
        Vector3::new(self.inward.x, self.inward.y, 0.0)
    }

    fn local(&self, point: &Point3<f64>) -> (f64, f64, f64) {
        let offset = Vector2::new(point.x - self.start.x, point.y - self.start.y);
        let along = offset.dot(&self.direction());
        let up = point.z - self.base_elevation;
        let out = offset.dot(&self.inward);
        (along, up, out)
    }

    /// Projects a point onto the wall plane; `margin` is fractional slack on the extent.
    pub fn project(&self, point: &Point3<f64>, margin: f64) -> WallProjection {
        let (along, up, out) = self.local(point);
        let half_length = self.length() * 0.5;
        let half_height = self.height * 0.5;
        let scale = 1.0 + margin;
        WallProjection {
            signed_distance: out,
            in_bounds: (along - half_length).abs() <= half_length * scale
                && (up - half_height).abs() <= half_height * scale,
        }
    }

    /// Euclidean distance to the wall rectangle.
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        let (along, up, out) = self.local(point);
        let d_along = (along - along.clamp(0.0, self.length())).abs();
        let d_up = (up - up.clamp(0.0, self.height)).abs();
        (d_along * d_along + d_up * d_up + out * out).sqrt()
    }

    /// Horizontal distance from a floor point to the wall's base segment.
    pub fn horizontal_distance(&self, point: &Point2<f64>) -> f64 {
        segment_distance(point, &self.start, &self.end)
    }
}

/// A horizontal floor polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: String,
    pub polygon: Vec<Point2<f64>>,
    pub elevation: f64,
}

/// A horizontal ceiling polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ceiling {
    pub id: String,
    pub polygon: Vec<Point2<f64>>,
    pub elevation: f64,
}

/// The floor polygon extruded up to the ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub polygon: Vec<Point2<f64>>,
    pub elevation: f64,
    pub height: f64,
}

impl Room {
    pub fn contains(&self, point: &Point3<f64>, epsilon: f64) -> bool {
        point.z >= self.elevation - epsilon
            && point.z <= self.elevation + self.height + epsilon
            && polygon_contains(&self.polygon, &Point2::new(point.x, point.y))
    }

    pub fn centroid(&self) -> Point2<f64> {
        polygon_centroid(&self.polygon)
    }

    /// Extents of the axis-aligned footprint as (long, short), with the long axis direction.
    pub fn footprint(&self) -> (f64, f64, Vector2<f64>) {
        let (min, max) = polygon_bounds(&self.polygon);
        let size = max - min;
        if size.x >= size.y {
            (size.x, size.y, Vector2::x())
        } else {
            (size.y, size.x, Vector2::y())
        }
    }
}

/// Tagged architectural element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArchElement {
    Wall(Wall),
    Floor(Floor),
    Room(Room),
    Ceiling(Ceiling),
    /// Not scored directly.
    Opening(Opening),
}

/// All architecture of one scene snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub floor: Option<Floor>,
    pub ceiling: Option<Ceiling>,
    pub walls: Vec<Wall>,
    pub room: Option<Room>,
}

impl Architecture {
    /// A single room from its floor outline; walls run along every polygon edge.
    pub fn from_floor_polygon(polygon: Vec<Point2<f64>>, elevation: f64, height: f64) -> Self {
        let walls = (0..polygon.len())
            .map(|i| {
                let start = polygon[i];
                let end = polygon[(i + 1) % polygon.len()];
                Wall::between(format!("wall_{i}"), start, end, elevation, height, &polygon)
            })
            .collect();
        Self {
            floor: Some(Floor {
                id: "floor".into(),
                polygon: polygon.clone(),
                elevation,
            }),
            ceiling: Some(Ceiling {
                id: "ceiling".into(),
                polygon: polygon.clone(),
                elevation: elevation + height,
            }),
            walls,
            room: Some(Room {
                id: "room".into(),
                polygon,
                elevation,
                height,
            }),
        }
    }

    pub fn wall(&self, id: &str) -> Option<&Wall> {
        self.walls.iter().find(|wall| wall.id == id)
    }

    /// Every element, tagged.
    pub fn elements(&self) -> Vec<ArchElement> {
        let mut elements = Vec::new();
        elements.extend(self.floor.clone().map(ArchElement::Floor));
        elements.extend(self.ceiling.clone().map(ArchElement::Ceiling));
        elements.extend(self.room.clone().map(ArchElement::Room));
        for wall in &self.walls {
            elements.extend(wall.openings.iter().cloned().map(ArchElement::Opening));
            elements.push(ArchElement::Wall(wall.clone()));
        }
        elements
    }

    /// Parses an `arch@1.0.2` architecture document.
    pub fn from_arch_json(json: &str) -> RelationResult<Self> {
        let document: ArchDocument =
            serde_json::from_str(json).map_err(|e| RelationError::Architecture(e.to_string()))?;
        document.into_architecture()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchDocument {
    version: Option<String>,
    up: Option<[f64; 3]>,
    scale_to_meters: Option<f64>,
    #[serde(default)]
    elements: Vec<ArchElementDocument>,
}

#[derive(Debug, Deserialize)]
struct ArchElementDocument {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    points: Vec<Vec<f64>>,
    height: Option<f64>,
    depth: Option<f64>,
    #[serde(default)]
    holes: Vec<HoleDocument>,
}

#[derive(Debug, Deserialize)]
struct HoleDocument {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "box")]
    bounds: Option<HoleBox>,
}

#[derive(Debug, Deserialize)]
struct HoleBox {
    min: [f64; 3],
    max: [f64; 3],
}

fn to_point(values: &[f64], scale: f64) -> RelationResult<Point3<f64>> {
    match values {
        [x, y, z, ..] => Ok(Point3::new(x * scale, y * scale, z * scale)),
        [x, y] => Ok(Point3::new(x * scale, y * scale, 0.0)),
        _ => Err(RelationError::Architecture(format!(
            "expected a 2D or 3D point, got {} coordinates",
            values.len()
        ))),
    }
}

impl ArchDocument {
    fn into_architecture(self) -> RelationResult<Architecture> {
        if self.version.as_deref() != Some(SUPPORTED_ARCH_VERSION) {
            warn!(
                version = ?self.version,
                expected = SUPPORTED_ARCH_VERSION,
                "unexpected architecture version"
            );
        }
        if let Some(up) = self.up {
            if up != [0.0, 0.0, 1.0] {
                warn!(?up, "architecture up axis is not +Z; elevations assume +Z");
            }
        }
        let scale = self.scale_to_meters.unwrap_or(1.0);

        let mut floor_points = Vec::new();
        let mut ceiling_points = Vec::new();
        let mut wall_documents = Vec::new();
        let mut floor_id = None;
        let mut ceiling_id = None;
        for element in self.elements {
            match element.kind.as_str() {
                "Floor" => {
                    floor_id = element.id.clone();
                    for point in &element.points {
                        floor_points.push(to_point(point, scale)?);
                    }
                }
                "Ceiling" => {
                    ceiling_id = element.id.clone();
                    for point in &element.points {
                        ceiling_points.push(to_point(point, scale)?);
                    }
                }
                "Wall" => wall_documents.push(element),
                other => warn!(kind = other, "skipping unknown architecture element"),
            }
        }

        if floor_points.len() < 3 {
            return Err(RelationError::Architecture(
                "floor needs at least three points".into(),
            ));
        }
        let polygon: Vec<Point2<f64>> =
            floor_points.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let elevation = floor_points.iter().map(|p| p.z).sum::<f64>() / floor_points.len() as f64;

        let mut walls = Vec::new();
        for (index, element) in wall_documents.into_iter().enumerate() {
            let [start, end] = match element.points.as_slice() {
                [start, end, ..] => [to_point(start, scale)?, to_point(end, scale)?],
                _ => {
                    return Err(RelationError::Architecture(format!(
                        "wall {index} needs two points"
                    )))
                }
            };
            let height = element.height.unwrap_or(0.0) * scale;
            let mut wall = Wall::between(
                element.id.unwrap_or_else(|| format!("wall_{index}")),
                Point2::new(start.x, start.y),
                Point2::new(end.x, end.y),
                start.z.min(end.z),
                height,
                &polygon,
            );
            wall.thickness = element.depth.unwrap_or(0.0) * scale;
            wall.openings = element
                .holes
                .into_iter()
                .enumerate()
                .filter_map(|(hole_index, hole)| {
                    let bounds = hole.bounds?;
                    let kind = match hole.kind.as_deref() {
                        Some("Window") => OpeningKind::Window,
                        Some("Door") => OpeningKind::Door,
                        other => {
                            warn!(kind = ?other, "skipping unknown wall opening");
                            return None;
                        }
                    };
                    Some(Opening {
                        id: hole.id.unwrap_or_else(|| format!("{}_hole_{hole_index}", wall.id)),
                        kind,
                        min: bounds.min.map(|v| v * scale),
                        max: bounds.max.map(|v| v * scale),
                    })
                })
                .collect();
            walls.push(wall);
        }

        let wall_height = walls.iter().map(|wall| wall.height).fold(0.0, f64::max);
        let ceiling_elevation = if ceiling_points.is_empty() {
            elevation + wall_height
        } else {
            let mean =
                ceiling_points.iter().map(|p| p.z).sum::<f64>() / ceiling_points.len() as f64;
            // Some exporters place the ceiling outline at floor level.
            if mean <= elevation + 1e-6 {
                elevation + wall_height
            } else {
                mean
            }
        };
        let height = ceiling_elevation - elevation;
        if height <= 0.0 {
            return Err(RelationError::Architecture(
                "room height could not be determined".into(),
            ));
        }

        if walls.is_empty() {
            let mut derived = Architecture::from_floor_polygon(polygon.clone(), elevation, height);
            walls = std::mem::take(&mut derived.walls);
        }

        let ceiling_polygon = if ceiling_points.is_empty() {
            polygon.clone()
        } else {
            ceiling_points.iter().map(|p| Point2::new(p.x, p.y)).collect()
        };

        Ok(Architecture {
            floor: Some(Floor {
                id: floor_id.unwrap_or_else(|| "floor".into()),
                polygon: polygon.clone(),
                elevation,
            }),
            ceiling: Some(Ceiling {
                id: ceiling_id.unwrap_or_else(|| "ceiling".into()),
                polygon: ceiling_polygon,
                elevation: ceiling_elevation,
            }),
            walls,
            room: Some(Room {
                id: "room".into(),
                polygon,
                elevation,
                height,
            }),
        })
    }
}

/// Even-odd point-in-polygon test on the horizontal plane.
pub fn polygon_contains(polygon: &[Point2<f64>], point: &Point2<f64>) -> bool {
    let mut inside = false;
    let n = polygon.len();
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + n - 1) % n];
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Signed shoelace area; positive for counter-clockwise polygons.
pub fn polygon_area(polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Area centroid, falling back to the vertex mean for degenerate polygons.
pub fn polygon_centroid(polygon: &[Point2<f64>]) -> Point2<f64> {
    if polygon.is_empty() {
        return Point2::origin();
    }
    let area = polygon_area(polygon);
    let n = polygon.len();
    if area.abs() < 1e-12 {
        let sum = polygon
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        return Point2::from(sum / n as f64);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

fn polygon_bounds(polygon: &[Point2<f64>]) -> (Point2<f64>, Point2<f64>) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in polygon {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Distance from a point to a segment on the horizontal plane.
pub fn segment_distance(point: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let length_sq = ab.norm_squared();
    if length_sq < 1e-18 {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Intersection of the infinite lines through two walls, if they are not parallel.
pub fn wall_line_intersection(first: &Wall, second: &Wall) -> Option<Point2<f64>> {
    let d1 = first.end - first.start;
    let d2 = second.end - second.start;
    let denominator = d1.x * d2.y - d1.y * d2.x;
    if denominator.abs() < 1e-12 {
        return None;
    }
    let delta = second.start - first.start;
    let t = (delta.x * d2.y - delta.y * d2.x) / denominator;
    Some(first.start + d1 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_room() -> Architecture {
        Architecture::from_floor_polygon(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 3.0),
                Point2::new(0.0, 3.0),
            ],
            0.0,
            2.5,
        )
    }

    #[test]
    fn derived_walls_face_into_the_room() {
        let arch = square_room();
        assert_eq!(arch.walls.len(), 4);
        let south = &arch.walls[0];
        assert!((south.inward - Vector2::new(0.0, 1.0)).norm() < 1e-12);
        let east = &arch.walls[1];
        assert!((east.inward - Vector2::new(-1.0, 0.0)).norm() < 1e-12);
        assert_eq!(arch.ceiling.as_ref().map(|c| c.elevation), Some(2.5));
    }

    fn l_shaped_room() -> Architecture {
        Architecture::from_floor_polygon(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 1.0),
                Point2::new(1.0, 1.0),
                Point2::new(1.0, 4.0),
                Point2::new(0.0, 4.0),
            ],
            0.0,
            2.5,
        )
    }

    #[test]
    fn inner_corner_walls_of_a_concave_room_face_inward() {
        let arch = l_shaped_room();
        let expected = [
            Vector2::new(0.0, 1.0),
            Vector2::new(-1.0, 0.0),
            Vector2::new(0.0, -1.0),
            Vector2::new(-1.0, 0.0),
            Vector2::new(0.0, -1.0),
            Vector2::new(1.0, 0.0),
        ];
        for (wall, inward) in arch.walls.iter().zip(expected) {
            assert!((wall.inward - inward).norm() < 1e-12, "{}: {}", wall.id, wall.inward);
        }
    }

    #[test]
    fn clockwise_outline_gives_the_same_normals() {
        let arch = Architecture::from_floor_polygon(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 4.0),
                Point2::new(1.0, 4.0),
                Point2::new(1.0, 1.0),
                Point2::new(4.0, 1.0),
                Point2::new(4.0, 0.0),
            ],
            0.0,
            2.5,
        );
        // (1,1) -> (4,1) borders the short arm from above.
        assert!((arch.walls[3].inward - Vector2::new(0.0, -1.0)).norm() < 1e-12);
        // (1,4) -> (1,1) borders the tall arm from the right.
        assert!((arch.walls[2].inward - Vector2::new(-1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn room_containment_and_centroid() {
        let arch = square_room();
        let room = arch.room.as_ref().expect("room");
        assert!(room.contains(&Point3::new(1.0, 1.0, 1.0), 0.0));
        assert!(!room.contains(&Point3::new(5.0, 1.0, 1.0), 0.0));
        assert!(!room.contains(&Point3::new(1.0, 1.0, 3.0), 0.0));
        assert!((room.centroid() - Point2::new(2.0, 1.5)).norm() < 1e-12);
        let (long, short, axis) = room.footprint();
        assert_eq!((long, short), (4.0, 3.0));
        assert_eq!(axis, Vector2::x());
    }

    #[test]
    fn wall_projection_and_distance() {
        let arch = square_room();
        let south = &arch.walls[0];
        let inside = south.project(&Point3::new(2.0, 0.3, 1.0), 0.0);
        assert!(inside.in_bounds);
        assert!((inside.signed_distance - 0.3).abs() < 1e-12);
        let beyond_end = south.project(&Point3::new(4.5, 0.3, 1.0), 0.0);
        assert!(!beyond_end.in_bounds);
        assert!((south.distance(&Point3::new(5.0, 0.0, 1.0)) - 1.0).abs() < 1e-12);
        let above_and_behind = south.distance(&Point3::new(2.0, -0.5, 3.0));
        assert!((above_and_behind - (0.25f64 + 0.25).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn perpendicular_walls_meet_at_the_corner() {
        let arch = square_room();
        let corner = wall_line_intersection(&arch.walls[0], &arch.walls[1]).expect("corner");
        assert!((corner - Point2::new(4.0, 0.0)).norm() < 1e-12);
        assert!(wall_line_intersection(&arch.walls[0], &arch.walls[2]).is_none());
    }

    #[test]
    fn parses_arch_document() {
        let json = r#"{
            "version": "arch@1.0.2",
            "up": [0, 0, 1],
            "scaleToMeters": 1.0,
            "elements": [
                {"id": "floor_0", "type": "Floor", "points": [[0,0,0],[5,0,0],[5,4,0],[0,4,0]]},
                {"id": "ceiling_0", "type": "Ceiling", "points": [[0,0,0],[5,0,0],[5,4,0],[0,4,0]]},
                {"id": "wall_a", "type": "Wall", "points": [[0,0,0],[5,0,0]],
                 "height": 2.8, "depth": 0.1,
                 "holes": [
                    {"id": "win", "type": "Window", "box": {"min": [1,1,0], "max": [2,2,0.1]}}
                 ]},
                {"id": "wall_b", "type": "Wall", "points": [[5,0,0],[5,4,0]],
                 "height": 2.8, "depth": 0.1}
            ]
        }"#;
        let arch = Architecture::from_arch_json(json).expect("valid document");

        assert_eq!(arch.walls.len(), 2);
        let wall = arch.wall("wall_a").expect("wall_a");
        assert_eq!(wall.openings.len(), 1);
        assert_eq!(wall.openings[0].kind, OpeningKind::Window);
        assert!((wall.inward - Vector2::new(0.0, 1.0)).norm() < 1e-12);
        assert!((wall.thickness - 0.1).abs() < 1e-12);
        let ceiling = arch.ceiling.as_ref().expect("ceiling");
        assert!((ceiling.elevation - 2.8).abs() < 1e-12);
        assert!(arch
            .elements()
            .iter()
            .any(|element| matches!(element, ArchElement::Opening(_))));
    }

    #[test]
    fn document_units_are_scaled_to_meters() {
        let json = r#"{
            "version": "arch@1.0.2",
            "scaleToMeters": 0.01,
            "elements": [
                {"id": "floor_0", "type": "Floor",
                 "points": [[0,0,0],[500,0,0],[500,400,0],[0,400,0]]},
                {"id": "wall_a", "type": "Wall", "points": [[0,0,0],[500,0,0]],
                 "height": 280, "depth": 10,
                 "holes": [
                    {"id": "door", "type": "Door", "box": {"min": [100,0,0], "max": [190,210,10]}}
                 ]}
            ]
        }"#;
        let arch = Architecture::from_arch_json(json).expect("valid document");

        let wall = arch.wall("wall_a").expect("wall_a");
        assert!((wall.length() - 5.0).abs() < 1e-9);
        assert!((wall.height - 2.8).abs() < 1e-9);
        assert!((wall.thickness - 0.1).abs() < 1e-9);
        assert!((wall.openings[0].max[1] - 2.1).abs() < 1e-9);
        let room = arch.room.as_ref().expect("room");
        let (long, short, _) = room.footprint();
        assert!((long - 5.0).abs() < 1e-9 && (short - 4.0).abs() < 1e-9);
        assert!((room.height - 2.8).abs() < 1e-9);
        assert!(room.contains(&Point3::new(2.5, 2.0, 1.0), 0.0));
    }

    #[test]
    fn document_without_floor_is_rejected() {
        let err = Architecture::from_arch_json(r#"{"elements": []}"#).expect_err("no floor");
        assert!(matches!(err, RelationError::Architecture(_)));
    }
}
