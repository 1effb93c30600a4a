//! Object-to-architecture relation scorers: room, walls, floor and ceiling.

use nalgebra::{Point2, Vector2};

use crate::arch::{wall_line_intersection, Architecture, Room, Wall};
use crate::config::{ArchAgainstWallRelationConfig, ArchOnWallRelationConfig};
use crate::descriptor::{AnchorRef, RelationSide, RelationType};
use crate::error::{RelationError, RelationResult};
use crate::geometry::OrientedBox;
use crate::object_relations::{ScoreContext, Scored};
use crate::predicates::{angle_between, angular_decay, gaussian, range_score};

fn room(architecture: &Architecture) -> RelationResult<&Room> {
    architecture
        .room
        .as_ref()
        .ok_or_else(|| RelationError::Geometry("architecture has no room".into()))
}

fn floor_elevation(architecture: &Architecture) -> RelationResult<f64> {
    architecture
        .floor
        .as_ref()
        .map(|floor| floor.elevation)
        .or_else(|| architecture.room.as_ref().map(|room| room.elevation))
        .ok_or_else(|| RelationError::Geometry("architecture has no floor".into()))
}

fn ceiling_elevation(architecture: &Architecture) -> RelationResult<f64> {
    architecture
        .ceiling
        .as_ref()
        .map(|ceiling| ceiling.elevation)
        .or_else(|| {
            architecture
                .room
                .as_ref()
                .map(|room| room.elevation + room.height)
        })
        .ok_or_else(|| RelationError::Geometry("architecture has no ceiling".into()))
}

/// The walls an anchor refers to: one by id, or every wall for `Wall(None)` and `Room`.
fn walls_for<'a>(
    anchor: &AnchorRef,
    architecture: &'a Architecture,
) -> RelationResult<Vec<&'a Wall>> {
    let walls: Vec<&Wall> = match anchor {
        AnchorRef::Wall(Some(id)) => vec![architecture
            .wall(id)
            .ok_or_else(|| RelationError::Geometry(format!("missing wall `{id}`")))?],
        AnchorRef::Wall(None) | AnchorRef::Room => architecture.walls.iter().collect(),
        other => {
            return Err(RelationError::Descriptor(format!(
                "{other} is not a wall anchor"
            )))
        }
    };
    if walls.is_empty() {
        return Err(RelationError::Geometry("architecture has no walls".into()));
    }
    Ok(walls)
}

fn center_xy(target: &OrientedBox) -> Point2<f64> {
    Point2::new(target.center.x, target.center.y)
}

/// Fraction of the target's volume inside the room.
pub fn inside_room(
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let room = room(architecture)?;
    let epsilon = ctx.config.scoring.contain_epsilon;
    let points = ctx.sampler.volume(target);
    let inside = points.iter().filter(|p| room.contains(p, epsilon)).count() as f64
        / points.len().max(1) as f64;
    Ok(Scored::new(
        inside,
        format!("{:.0}% of `{}` is inside the room", inside * 100.0, target.id),
    ))
}

/// Horizontal offset from the room centroid with size- and aspect-aware tolerance.
///
/// The Gaussian std is `base_std_dev` half short extents of the room plus a share of the
/// object's footprint, so both larger rooms and larger objects tolerate more offset.
/// Offsets along the room's long axis shrink by the room's aspect ratio.
pub fn middle_of_room(
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let room = room(architecture)?;
    let config = &ctx.config.architectural.middle_of_room;
    let (long, short, long_axis) = room.footprint();
    let short_axis = Vector2::new(-long_axis.y, long_axis.x);
    let aspect = if short > 0.0 { long / short } else { 1.0 };

    let offset = center_xy(target) - room.centroid();
    let along_long = offset.dot(&long_axis) / (1.0 + config.ratio_weight * (aspect - 1.0));
    let along_short = offset.dot(&short_axis);
    let distance = (along_long * along_long + along_short * along_short).sqrt();
    let room_scale = if short > 0.0 { short * 0.5 } else { 1.0 };
    let std = config.base_std_dev * room_scale
        + config.obj_size_weight * target.horizontal_half_diagonal();

    Ok(Scored::new(
        gaussian(distance, std),
        format!(
            "`{}` is {:.3} m from the room center (adjusted {distance:.3}, std {std:.3})",
            target.id,
            offset.norm()
        ),
    ))
}

/// Shared knobs of `on_wall` and `against_wall`.
struct WallContactParams {
    distance_range: [f64; 2],
    gaussian_std: f64,
    no_contain: bool,
    within_area_margin: f64,
    max_deviation_degrees: f64,
}

impl From<&ArchOnWallRelationConfig> for WallContactParams {
    fn from(config: &ArchOnWallRelationConfig) -> Self {
        Self {
            distance_range: config.distance_range,
            gaussian_std: config.gaussian_std,
            no_contain: config.no_contain,
            within_area_margin: config.within_area_margin,
            max_deviation_degrees: config.max_deviation_degrees,
        }
    }
}

impl From<&ArchAgainstWallRelationConfig> for WallContactParams {
    fn from(config: &ArchAgainstWallRelationConfig) -> Self {
        Self {
            distance_range: config.distance_range,
            gaussian_std: config.gaussian_std,
            no_contain: config.no_contain,
            within_area_margin: config.within_area_margin,
            max_deviation_degrees: config.max_deviation_degrees,
        }
    }
}

struct WallContact {
    facing: f64,
    gap: f64,
    in_area: f64,
}

fn wall_contact(
    wall: &Wall,
    target: &OrientedBox,
    params: &WallContactParams,
    ctx: &ScoreContext,
) -> WallContact {
    let facing = match target.front_direction() {
        Some(front) => angular_decay(
            angle_between(&front, &wall.inward),
            params.max_deviation_degrees,
        ),
        None => 0.0,
    };
    // Negative when a corner pokes through the wall.
    let gap = target
        .corners()
        .iter()
        .map(|corner| wall.project(corner, 0.0).signed_distance)
        .fold(f64::INFINITY, f64::min);
    let points = ctx.sampler.volume(target);
    let in_area = points
        .iter()
        .filter(|p| {
            let projection = wall.project(p, params.within_area_margin);
            projection.in_bounds && !(params.no_contain && projection.signed_distance < 0.0)
        })
        .count() as f64
        / points.len().max(1) as f64;
    WallContact {
        facing,
        gap,
        in_area,
    }
}

fn score_wall_contact(
    label: &str,
    anchor: &AnchorRef,
    architecture: &Architecture,
    target: &OrientedBox,
    params: WallContactParams,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let walls = walls_for(anchor, architecture)?;
    let best = walls
        .into_iter()
        .map(|wall| {
            let contact = wall_contact(wall, target, &params, ctx);
            let gap = range_score(contact.gap, params.distance_range, params.gaussian_std);
            (contact.facing * gap * contact.in_area, wall, contact)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0));
    let Some((score, wall, contact)) = best else {
        return Err(RelationError::Geometry("architecture has no walls".into()));
    };
    Ok(Scored::new(
        score,
        format!(
            "`{}` {label} `{}`: gap {:.3} m, facing {:.2}, {:.0}% within the wall",
            target.id,
            wall.id,
            contact.gap,
            contact.facing,
            contact.in_area * 100.0
        ),
    ))
}

/// Flush against a wall (near-zero gap) and facing into the room.
pub fn on_wall(
    anchor: &AnchorRef,
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let params = WallContactParams::from(&ctx.config.architectural.on_wall);
    score_wall_contact("on", anchor, architecture, target, params, ctx)
}

/// Backed up to a wall within the contact range and facing into the room.
pub fn against_wall(
    anchor: &AnchorRef,
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let params = WallContactParams::from(&ctx.config.architectural.against_wall);
    score_wall_contact("against", anchor, architecture, target, params, ctx)
}

/// Proximity to the corner formed by the two walls nearest the target.
///
/// The two walls must be close to perpendicular; otherwise the target is not near a
/// corner at all and scores 0.
pub fn corner_of_room(
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let config = &ctx.config.architectural.corner_of_room;
    let center = center_xy(target);
    let mut walls: Vec<(f64, &Wall)> = architecture
        .walls
        .iter()
        .map(|wall| (wall.horizontal_distance(&center), wall))
        .collect();
    if walls.len() < 2 {
        return Err(RelationError::Geometry(
            "a room corner needs at least two walls".into(),
        ));
    }
    walls.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (first, second) = (walls[0].1, walls[1].1);

    let cosine = first.direction().dot(&second.direction()).abs();
    if cosine > config.perpendicular_threshold {
        return Ok(Scored::new(
            0.0,
            format!(
                "nearest walls `{}` and `{}` of `{}` do not form a corner (|cos| {cosine:.2})",
                first.id, second.id, target.id
            ),
        ));
    }
    let Some(corner) = wall_line_intersection(first, second) else {
        return Ok(Scored::new(
            0.0,
            format!("walls `{}` and `{}` never meet", first.id, second.id),
        ));
    };

    let distance = (center - corner).norm();
    let threshold = config.base_distance_threshold + target.horizontal_half_diagonal();
    let score = if distance <= threshold {
        1.0
    } else {
        gaussian(distance - threshold, config.gaussian_std)
    };
    Ok(Scored::new(
        score,
        format!(
            "`{}` is {distance:.3} m from the corner of `{}` and `{}` (threshold {threshold:.3})",
            target.id, first.id, second.id
        ),
    ))
}

/// Top of the target near the ceiling while staying clear of the floor.
pub fn hang_from_ceiling(
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let config = &ctx.config.architectural.hang_from_ceiling;
    let ceiling = ceiling_elevation(architecture)?;
    let floor = floor_elevation(architecture)?;
    let gap = ceiling - target.max_z();
    let clearance = target.min_z() - floor;
    if clearance < config.min_floor_clearance {
        return Ok(Scored::new(
            0.0,
            format!(
                "`{}` is {clearance:.3} m above the floor (needs {})",
                target.id, config.min_floor_clearance
            ),
        ));
    }
    Ok(Scored::new(
        range_score(gap, config.distance_range, config.gaussian_std),
        format!("`{}` hangs {gap:.3} m below the ceiling", target.id),
    ))
}

/// Distance from the target's surface to the nearest point of the anchor element.
fn element_distance(
    anchor: &AnchorRef,
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<f64> {
    match anchor {
        AnchorRef::Floor => Ok((target.min_z() - floor_elevation(architecture)?).max(0.0)),
        AnchorRef::Ceiling => Ok((ceiling_elevation(architecture)? - target.max_z()).max(0.0)),
        AnchorRef::Wall(_) | AnchorRef::Room => {
            let walls = walls_for(anchor, architecture)?;
            let points = ctx.sampler.surface(target);
            Ok(walls
                .iter()
                .flat_map(|wall| points.iter().map(|p| wall.distance(p)))
                .fold(f64::INFINITY, f64::min))
        }
        AnchorRef::Object(name) => Err(RelationError::Descriptor(format!(
            "object `{name}` is not an architectural anchor"
        ))),
    }
}

/// Distance band measured against an architectural element.
pub fn distance_band(
    relation: RelationType,
    anchor: &AnchorRef,
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let band = ctx.config.architectural.band(relation).ok_or_else(|| {
        RelationError::Descriptor(format!("{relation} is not a distance relation"))
    })?;
    let distance = element_distance(anchor, architecture, target, ctx)?;
    let [min, max] = band.distance_range;
    Ok(Scored::new(
        range_score(distance, band.distance_range, band.gaussian_std),
        format!(
            "`{}` is {distance:.3} m from the {anchor} (range [{min}, {max}))",
            target.id
        ),
    ))
}

fn require_room_anchor(relation: RelationType, anchor: &AnchorRef) -> RelationResult<()> {
    match anchor {
        AnchorRef::Room => Ok(()),
        other => Err(RelationError::Descriptor(format!(
            "{relation} is measured against the room, not the {other}"
        ))),
    }
}

/// Scores one object-to-architecture relation for a single target.
///
/// Side qualifiers do not apply to architectural relations and are ignored.
pub fn score_arch(
    relation: RelationType,
    _side: Option<RelationSide>,
    anchor: &AnchorRef,
    architecture: &Architecture,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    target.ensure_valid(ctx.config.scoring.degenerate_epsilon)?;

    match relation {
        RelationType::InsideRoom => {
            require_room_anchor(relation, anchor)?;
            inside_room(architecture, target, ctx)
        }
        RelationType::MiddleOfRoom => {
            require_room_anchor(relation, anchor)?;
            middle_of_room(architecture, target, ctx)
        }
        RelationType::CornerOfRoom => {
            require_room_anchor(relation, anchor)?;
            corner_of_room(architecture, target, ctx)
        }
        RelationType::OnWall => on_wall(anchor, architecture, target, ctx),
        RelationType::AgainstWall => against_wall(anchor, architecture, target, ctx),
        RelationType::HangFromCeiling => match anchor {
            AnchorRef::Ceiling | AnchorRef::Room => hang_from_ceiling(architecture, target, ctx),
            other => Err(RelationError::Descriptor(format!(
                "hang_from_ceiling is measured against the ceiling, not the {other}"
            ))),
        },
        RelationType::NextTo
        | RelationType::Near
        | RelationType::AcrossFrom
        | RelationType::Far => distance_band(relation, anchor, architecture, target, ctx),
        RelationType::None => Err(RelationError::Descriptor(
            "an unmapped relation has no scorer".into(),
        )),
        other => Err(RelationError::Descriptor(format!(
            "{other} needs an object anchor"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationConfig;
    use crate::sampler::Sampler;
    use nalgebra::{Point3, UnitQuaternion, Vector3};
    use std::f64::consts::{FRAC_PI_2, PI};

    /// A 4 m x 3 m room, 2.5 m high; walls are south, east, north, west in that order.
    fn room_architecture() -> Architecture {
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

    fn l_shaped_architecture() -> Architecture {
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

    fn square_architecture(side: f64) -> Architecture {
        Architecture::from_floor_polygon(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(side, 0.0),
                Point2::new(side, side),
                Point2::new(0.0, side),
            ],
            0.0,
            2.5,
        )
    }

    fn score_in(
        architecture: &Architecture,
        relation: RelationType,
        anchor: AnchorRef,
        target: &OrientedBox,
    ) -> f64 {
        let config = RelationConfig::default();
        let sampler = Sampler::new(&config);
        let ctx = ScoreContext::new(&config, &sampler);
        score_arch(relation, None, &anchor, architecture, target, &ctx)
            .expect("scorable")
            .score
    }

    fn score(relation: RelationType, anchor: AnchorRef, target: &OrientedBox) -> f64 {
        score_in(&room_architecture(), relation, anchor, target)
    }

    fn wall(id: &str) -> AnchorRef {
        AnchorRef::Wall(Some(id.into()))
    }

    fn cube(id: &str, x: f64, y: f64, z: f64, size: f64) -> OrientedBox {
        OrientedBox::axis_aligned(id, Point3::new(x, y, z), Vector3::repeat(size))
    }

    #[test]
    fn inside_and_middle_of_room() {
        let table = cube("table", 2.0, 1.5, 0.4, 0.8);
        assert!(score(RelationType::InsideRoom, AnchorRef::Room, &table) > 0.99);
        assert!((score(RelationType::MiddleOfRoom, AnchorRef::Room, &table) - 1.0).abs() < 1e-12);

        let outside = cube("table", 6.0, 1.5, 0.4, 0.8);
        assert!(score(RelationType::InsideRoom, AnchorRef::Room, &outside) < 0.01);

        let corner = cube("table", 0.3, 0.3, 0.4, 0.4);
        let off_center = score(RelationType::MiddleOfRoom, AnchorRef::Room, &corner);
        assert!(off_center < 0.6, "{off_center}");
    }

    #[test]
    fn larger_rooms_tolerate_larger_offsets() {
        let small = square_architecture(4.0);
        let large = square_architecture(12.0);
        let in_small = cube("table", 3.5, 2.0, 0.4, 0.4);
        let in_large = cube("table", 7.5, 6.0, 0.4, 0.4);

        let small_score = score_in(&small, RelationType::MiddleOfRoom, AnchorRef::Room, &in_small);
        let large_score = score_in(&large, RelationType::MiddleOfRoom, AnchorRef::Room, &in_large);
        assert!(large_score > 0.95, "{large_score}");
        assert!(large_score - small_score > 0.15, "{small_score} vs {large_score}");
    }

    #[test]
    fn long_axis_offsets_are_tolerated_more() {
        let along_long = cube("table", 3.0, 1.5, 0.4, 0.4);
        let along_short = cube("table", 2.0, 2.5, 0.4, 0.4);
        assert!(
            score(RelationType::MiddleOfRoom, AnchorRef::Room, &along_long)
                > score(RelationType::MiddleOfRoom, AnchorRef::Room, &along_short)
        );
    }

    #[test]
    fn painting_on_the_south_wall() {
        // Default front is +Y, which is the south wall's inward normal.
        let painting = OrientedBox::axis_aligned(
            "painting",
            Point3::new(2.0, 0.025, 1.5),
            Vector3::new(0.8, 0.05, 0.6),
        );
        assert!(score(RelationType::OnWall, wall("wall_0"), &painting) > 0.99);
        assert!(score(RelationType::OnWall, AnchorRef::Wall(None), &painting) > 0.99);
        assert!(score(RelationType::OnWall, wall("wall_2"), &painting) < 0.01);

        let detached = OrientedBox::axis_aligned(
            "painting",
            Point3::new(2.0, 0.5, 1.5),
            Vector3::new(0.8, 0.05, 0.6),
        );
        assert!(score(RelationType::OnWall, AnchorRef::Wall(None), &detached) < 0.01);
        assert!(score(RelationType::AgainstWall, AnchorRef::Wall(None), &detached) < 0.5);
    }

    #[test]
    fn dresser_against_the_west_wall() {
        // Rotating +Y by -90 degrees about Z points the front along +X, into the room.
        let dresser = OrientedBox::new(
            "dresser",
            Point3::new(0.35, 1.5, 0.5),
            Vector3::new(0.6, 0.25, 0.5),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -FRAC_PI_2),
        );
        assert!(score(RelationType::AgainstWall, AnchorRef::Wall(None), &dresser) > 0.99);

        let facing_wall = OrientedBox::new(
            "dresser",
            Point3::new(0.35, 1.5, 0.5),
            Vector3::new(0.6, 0.25, 0.5),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        assert!(score(RelationType::AgainstWall, wall("wall_3"), &facing_wall) < 1e-6);
    }

    #[test]
    fn dresser_against_an_inner_corner_wall() {
        // wall_2 runs (4,1) -> (1,1) and bounds the short arm of the L from above.
        let arch = l_shaped_architecture();
        let dresser = OrientedBox::new(
            "dresser",
            Point3::new(2.5, 0.7, 0.5),
            Vector3::new(0.6, 0.25, 0.5),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI),
        );
        let against = score_in(&arch, RelationType::AgainstWall, wall("wall_2"), &dresser);
        assert!(against > 0.99, "{against}");

        let backwards = OrientedBox::new(
            "dresser",
            Point3::new(2.5, 0.7, 0.5),
            Vector3::new(0.6, 0.25, 0.5),
            UnitQuaternion::identity(),
        );
        assert!(score_in(&arch, RelationType::AgainstWall, wall("wall_2"), &backwards) < 1e-6);
    }

    #[test]
    fn corner_needs_perpendicular_walls() {
        let plant = cube("plant", 0.4, 0.4, 0.3, 0.5);
        assert!((score(RelationType::CornerOfRoom, AnchorRef::Room, &plant) - 1.0).abs() < 1e-12);

        // Equidistant from the north and south walls, which are parallel.
        let centered = cube("plant", 2.0, 1.5, 0.3, 0.5);
        assert_eq!(score(RelationType::CornerOfRoom, AnchorRef::Room, &centered), 0.0);
    }

    #[test]
    fn lamp_hangs_from_ceiling() {
        let lamp = cube("lamp", 2.0, 1.5, 2.3, 0.4);
        let hanging = score(RelationType::HangFromCeiling, AnchorRef::Ceiling, &lamp);
        assert!((hanging - 1.0).abs() < 1e-9);

        let lowered = cube("lamp", 2.0, 1.5, 1.5, 0.4);
        assert!(score(RelationType::HangFromCeiling, AnchorRef::Ceiling, &lowered) < 0.01);

        // Floor-to-ceiling objects touch the ceiling but are not hanging.
        let pillar = OrientedBox::axis_aligned(
            "pillar",
            Point3::new(2.0, 1.5, 1.25),
            Vector3::new(0.3, 0.3, 2.5),
        );
        assert_eq!(score(RelationType::HangFromCeiling, AnchorRef::Ceiling, &pillar), 0.0);
    }

    #[test]
    fn distance_bands_against_walls_and_floor() {
        let chair = cube("chair", 1.0, 0.45, 0.4, 0.5);
        assert!(score(RelationType::NextTo, wall("wall_0"), &chair) > 0.99);
        assert!(score(RelationType::Far, wall("wall_0"), &chair) < 0.01);

        let on_floor = cube("rug", 2.0, 1.5, 0.01, 0.02);
        assert!(score(RelationType::NextTo, AnchorRef::Floor, &on_floor) > 0.99);
    }

    #[test]
    fn mismatched_anchors_are_rejected() {
        let config = RelationConfig::default();
        let sampler = Sampler::new(&config);
        let ctx = ScoreContext::new(&config, &sampler);
        let arch = room_architecture();
        let chair = cube("chair", 1.0, 1.0, 0.4, 0.5);

        let err = score_arch(RelationType::InsideRoom, None, &AnchorRef::Floor, &arch, &chair, &ctx)
            .expect_err("room relation against floor");
        assert!(matches!(err, RelationError::Descriptor(_)));
        assert!(
            score_arch(RelationType::SideOf, None, &AnchorRef::Room, &arch, &chair, &ctx).is_err()
        );
        let err = score_arch(RelationType::OnWall, None, &wall("wall_9"), &arch, &chair, &ctx)
            .expect_err("unknown wall");
        assert!(matches!(err, RelationError::Geometry(_)));
    }
}
