//! Object-to-object relation scorers.
//!
//! Each scorer takes the anchor and the target box and returns a score in `[0, 1]` with a
//! short rationale. Sampled point clouds always come from the target, so a scorer asks
//! "how much of the target sits where the relation wants it".

use nalgebra::Point3;

use crate::config::RelationConfig;
use crate::descriptor::{RelationSide, RelationType};
use crate::error::{RelationError, RelationResult};
use crate::geometry::{LocalAxis, OrientedBox, Side};
use crate::predicates::{
    angular_decay, angular_spread, contains, facing, gaussian, horizontal_bearing,
    long_short_sides, project_to_face, range_score, surface_gap,
};
use crate::sampler::Sampler;

/// Read-only inputs shared by every scoring call.
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    pub config: &'a RelationConfig,
    pub sampler: &'a Sampler,
}

impl<'a> ScoreContext<'a> {
    pub fn new(config: &'a RelationConfig, sampler: &'a Sampler) -> Self {
        Self { config, sampler }
    }
}

/// A raw score with its explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: f64,
    pub rationale: String,
}

impl Scored {
    pub fn new(score: f64, rationale: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }
}

fn percent(fraction: f64) -> f64 {
    (fraction * 100.0).round()
}

fn fraction<F>(points: &[Point3<f64>], predicate: F) -> f64
where
    F: Fn(&Point3<f64>) -> bool,
{
    if points.is_empty() {
        return 0.0;
    }
    points.iter().filter(|p| predicate(p)).count() as f64 / points.len() as f64
}

/// Whether a point sits on the outer side of `face`, within the face extent.
fn beside_face(
    anchor: &OrientedBox,
    face: LocalAxis,
    point: &Point3<f64>,
    no_contain: bool,
    margin: f64,
    epsilon: f64,
) -> bool {
    let projection = project_to_face(anchor, face, point, margin);
    projection.in_bounds
        && projection.normal_offset >= 0.0
        && !(no_contain && contains(anchor, point, epsilon))
}

fn require_side(relation: RelationType, side: Option<RelationSide>) -> RelationResult<Side> {
    side.and_then(|side| side.as_side()).ok_or_else(|| {
        RelationError::Descriptor(format!(
            "{relation} needs a front/back/left/right/top/bottom side, got {side:?}"
        ))
    })
}

/// Fraction of the target's volume inside the anchor.
pub fn inside_of(anchor: &OrientedBox, target: &OrientedBox, ctx: &ScoreContext) -> Scored {
    let epsilon = ctx.config.scoring.contain_epsilon;
    let points = ctx.sampler.volume(target);
    let inside = fraction(&points, |p| contains(anchor, p, epsilon));
    Scored::new(
        inside,
        format!("{}% of `{}` is inside `{}`", percent(inside), target.id, anchor.id),
    )
}

/// Fraction of the target's volume outside the anchor.
pub fn outside_of(anchor: &OrientedBox, target: &OrientedBox, ctx: &ScoreContext) -> Scored {
    let epsilon = ctx.config.scoring.contain_epsilon;
    let points = ctx.sampler.volume(target);
    let outside = fraction(&points, |p| !contains(anchor, p, epsilon));
    Scored::new(
        outside,
        format!("{}% of `{}` is outside `{}`", percent(outside), target.id, anchor.id),
    )
}

/// Whether the target's front points at the anchor.
pub fn face_to(anchor: &OrientedBox, target: &OrientedBox, ctx: &ScoreContext) -> Scored {
    let max_deviation = ctx.config.spatial.face_to.max_deviation_degrees;
    let result = facing(target, anchor, max_deviation);
    Scored::new(
        angular_decay(result.deviation_degrees, max_deviation),
        format!(
            "`{}` faces {:.1} degrees away from `{}` (tolerance {max_deviation})",
            target.id, result.deviation_degrees, anchor.id
        ),
    )
}

fn side_fraction(
    anchor: &OrientedBox,
    target: &OrientedBox,
    faces: &[LocalAxis],
    no_contain: bool,
    margin: f64,
    ctx: &ScoreContext,
) -> f64 {
    let epsilon = ctx.config.scoring.contain_epsilon;
    let points = ctx.sampler.volume(target);
    fraction(&points, |p| {
        faces
            .iter()
            .any(|face| beside_face(anchor, *face, p, no_contain, margin, epsilon))
    })
}

/// Fraction of the target beside the anchor's named face, outside the anchor.
pub fn side_of(
    anchor: &OrientedBox,
    target: &OrientedBox,
    side: Option<RelationSide>,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let named = require_side(RelationType::SideOf, side)?;
    let face = anchor.side_face(named)?;
    let config = &ctx.config.spatial.side_of;
    let score = side_fraction(
        anchor,
        target,
        &[face],
        config.no_contain,
        config.within_area_margin,
        ctx,
    );
    Ok(Scored::new(
        score,
        format!(
            "{}% of `{}` lies off the {named:?} face of `{}`",
            percent(score),
            target.id,
            anchor.id
        ),
    ))
}

/// Like [`side_of`] but points may sit inside the anchor and the face extent is near exact.
pub fn side_region(
    anchor: &OrientedBox,
    target: &OrientedBox,
    side: Option<RelationSide>,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let named = require_side(RelationType::SideRegion, side)?;
    let face = anchor.side_face(named)?;
    let config = &ctx.config.spatial.side_region;
    let score = side_fraction(
        anchor,
        target,
        &[face],
        config.no_contain,
        config.within_area_margin,
        ctx,
    );
    Ok(Scored::new(
        score,
        format!(
            "{}% of `{}` lies in the {named:?} region of `{}`",
            percent(score),
            target.id,
            anchor.id
        ),
    ))
}

/// Fraction of the target beside either face of the anchor's long or short pair.
pub fn long_short_side_of(
    anchor: &OrientedBox,
    target: &OrientedBox,
    side: Option<RelationSide>,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let sides = long_short_sides(anchor)?;
    let (faces, label) = match side {
        Some(RelationSide::Long) => (sides.long, "long"),
        Some(RelationSide::Short) => (sides.short, "short"),
        other => {
            return Err(RelationError::Descriptor(format!(
                "long_short_side_of needs a long or short side, got {other:?}"
            )))
        }
    };
    let config = &ctx.config.spatial.long_short_side_of;
    let score = side_fraction(
        anchor,
        target,
        &faces,
        config.no_contain,
        config.within_area_margin,
        ctx,
    );
    Ok(Scored::new(
        score,
        format!(
            "{}% of `{}` lies along a {label} side of `{}`",
            percent(score),
            target.id,
            anchor.id
        ),
    ))
}

/// Target resting on the anchor's top face.
///
/// The footprint fraction is weighted by how close the target's lowest point is to the
/// top face; a gap beyond `max_gap` decays with the distance Gaussian.
pub fn on_top(
    anchor: &OrientedBox,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let top = anchor.side_face(Side::Top)?;
    let config = &ctx.config.spatial.on_top;
    let epsilon = ctx.config.scoring.contain_epsilon;
    let points = ctx.sampler.volume(target);
    let supported = fraction(&points, |p| {
        beside_face(anchor, top, p, config.no_contain, config.within_area_margin, epsilon)
    });
    let gap = points
        .iter()
        .map(|p| project_to_face(anchor, top, p, 0.0).signed_distance)
        .fold(f64::INFINITY, f64::min);
    let contact = range_score(
        gap,
        [0.0, config.max_gap],
        ctx.config.spatial.distance_score.gaussian_std,
    );
    Ok(Scored::new(
        supported * contact,
        format!(
            "{}% of `{}` is above the top of `{}` with a {gap:.3} m gap",
            percent(supported),
            target.id,
            anchor.id
        ),
    ))
}

/// Horizontal offset of the target center from the anchor center.
pub fn middle_of(anchor: &OrientedBox, target: &OrientedBox, ctx: &ScoreContext) -> Scored {
    let dx = target.center.x - anchor.center.x;
    let dy = target.center.y - anchor.center.y;
    let offset = (dx * dx + dy * dy).sqrt();
    Scored::new(
        gaussian(offset, ctx.config.spatial.middle_of.gaussian_std),
        format!(
            "`{}` is {offset:.3} m from the middle of `{}`",
            target.id, anchor.id
        ),
    )
}

/// Surface gap between the boxes scored against the relation's distance band.
pub fn distance_band(
    relation: RelationType,
    anchor: &OrientedBox,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let band = ctx.config.spatial.band(relation).ok_or_else(|| {
        RelationError::Descriptor(format!("{relation} is not a distance relation"))
    })?;
    let gap = surface_gap(ctx.sampler, anchor, target);
    let [min, max] = band.distance_range;
    Ok(Scored::new(
        range_score(gap, band.distance_range, ctx.config.spatial.distance_score.gaussian_std),
        format!(
            "`{}` is {gap:.3} m from `{}` (range [{min}, {max}))",
            target.id, anchor.id
        ),
    ))
}

/// Joint score of a group of targets around one anchor.
///
/// Blends the mean per-target distance score with the evenness of the targets' bearings
/// around the anchor center. A target straight above or below the center has no bearing
/// and counts as coincident with the first target that does.
pub fn score_surround(
    anchor: &OrientedBox,
    targets: &[&OrientedBox],
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let epsilon = ctx.config.scoring.degenerate_epsilon;
    anchor.ensure_valid(epsilon)?;
    for target in targets {
        target.ensure_valid(epsilon)?;
    }
    if targets.is_empty() {
        return Err(RelationError::Descriptor("surround needs targets".into()));
    }

    let config = &ctx.config.spatial.surround;
    let std = ctx.config.spatial.distance_score.gaussian_std;
    let distance = targets
        .iter()
        .map(|target| {
            let gap = surface_gap(ctx.sampler, anchor, target);
            range_score(gap, config.distance_range, std)
        })
        .sum::<f64>()
        / targets.len() as f64;
    let bearings: Vec<Option<f64>> = targets
        .iter()
        .map(|target| horizontal_bearing(&anchor.center, &target.center))
        .collect();
    let stacked = bearings.iter().filter(|bearing| bearing.is_none()).count();
    let fallback = bearings.iter().flatten().next().copied().unwrap_or(0.0);
    let bearings: Vec<f64> = bearings
        .into_iter()
        .map(|bearing| bearing.unwrap_or(fallback))
        .collect();
    let spread = angular_spread(&bearings);
    let total = config.distance_weight + config.angle_weight;
    let score = (config.distance_weight * distance + config.angle_weight * spread) / total;

    let mut rationale = format!(
        "{} targets around `{}`: distance {distance:.2}, spread {spread:.2}",
        targets.len(),
        anchor.id
    );
    if stacked > 0 {
        rationale.push_str(&format!(", {stacked} directly above or below"));
    }
    Ok(Scored::new(score, rationale))
}

/// Scores one object-to-object relation for a single target.
pub fn score_pair(
    relation: RelationType,
    side: Option<RelationSide>,
    anchor: &OrientedBox,
    target: &OrientedBox,
    ctx: &ScoreContext,
) -> RelationResult<Scored> {
    let epsilon = ctx.config.scoring.degenerate_epsilon;
    anchor.ensure_valid(epsilon)?;
    target.ensure_valid(epsilon)?;

    match relation {
        RelationType::InsideOf => Ok(inside_of(anchor, target, ctx)),
        RelationType::OutsideOf => Ok(outside_of(anchor, target, ctx)),
        RelationType::FaceTo => Ok(face_to(anchor, target, ctx)),
        RelationType::SideOf => side_of(anchor, target, side, ctx),
        RelationType::SideRegion => side_region(anchor, target, side, ctx),
        RelationType::LongShortSideOf => long_short_side_of(anchor, target, side, ctx),
        RelationType::OnTop => on_top(anchor, target, ctx),
        RelationType::MiddleOf => Ok(middle_of(anchor, target, ctx)),
        RelationType::Surround => score_surround(anchor, &[target], ctx),
        RelationType::NextTo
        | RelationType::Near
        | RelationType::AcrossFrom
        | RelationType::Far => distance_band(relation, anchor, target, ctx),
        RelationType::InsideRoom
        | RelationType::MiddleOfRoom
        | RelationType::OnWall
        | RelationType::AgainstWall
        | RelationType::CornerOfRoom
        | RelationType::HangFromCeiling => Err(RelationError::Descriptor(format!(
            "{relation} needs an architectural anchor"
        ))),
        RelationType::None => Err(RelationError::Descriptor(
            "an unmapped relation has no scorer".into(),
        )),
    }
}
