//! Descriptor evaluation: per-type dispatch, thresholds and the batch entry point.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::arch_relations::score_arch;
use crate::config::RelationConfig;
use crate::descriptor::{
    AnchorRef, Evaluation, RelationDescriptor, RelationSide, RelationType, ScoreResult,
};
use crate::error::{RelationError, RelationResult};
use crate::geometry::OrientedBox;
use crate::object_relations::{score_pair, score_surround, ScoreContext, Scored};
use crate::sampler::Sampler;
use crate::scene::SceneGeometry;

const UNMAPPED_RATIONALE: &str = "no predefined relation applies";

/// Scores relation descriptors against scene snapshots with one validated configuration.
///
/// Serial [`Evaluator::evaluate`] calls share the evaluator's sampler, so boxes shared
/// between descriptors are sampled once. Its point-cloud cache is keyed by pose and only
/// ever grows; call [`Evaluator::clear_cache`] when moving on to a new snapshot. Batches
/// get a sampler of their own that is dropped with the batch.
#[derive(Debug)]
pub struct Evaluator {
    config: RelationConfig,
    sampler: Sampler,
}

impl Evaluator {
    /// Validates the configuration and builds the sampler.
    pub fn new(config: RelationConfig) -> RelationResult<Self> {
        config.validate()?;
        let sampler = Sampler::new(&config);
        Ok(Self { config, sampler })
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    /// Drops every cached point cloud of the serial sampler.
    pub fn clear_cache(&self) {
        self.sampler.clear_cache();
    }

    /// Evaluates every relation type of a descriptor.
    ///
    /// Never fails: malformed descriptors and broken geometry come back as unsatisfied
    /// results carrying the reason.
    pub fn evaluate(&self, descriptor: &RelationDescriptor, scene: &SceneGeometry) -> Evaluation {
        self.evaluate_with(&self.sampler, descriptor, scene)
    }

    #[instrument(
        skip_all,
        fields(anchor = %descriptor.anchor, types = descriptor.relation_types.len())
    )]
    fn evaluate_with(
        &self,
        sampler: &Sampler,
        descriptor: &RelationDescriptor,
        scene: &SceneGeometry,
    ) -> Evaluation {
        let ctx = ScoreContext::new(&self.config, sampler);
        if let Err(err) = descriptor.validate() {
            warn!(error = %err, "rejecting relation descriptor");
            return failed_evaluation(descriptor, &err);
        }

        let results = descriptor
            .relation_types
            .iter()
            .zip(&descriptor.sides)
            .map(|(relation, side)| self.evaluate_one(&ctx, descriptor, *relation, *side, scene))
            .collect();
        Evaluation::from_results(results)
    }

    fn evaluate_one(
        &self,
        ctx: &ScoreContext,
        descriptor: &RelationDescriptor,
        relation: RelationType,
        side: Option<RelationSide>,
        scene: &SceneGeometry,
    ) -> ScoreResult {
        if relation == RelationType::None {
            let rationale = descriptor
                .rationale
                .clone()
                .unwrap_or_else(|| UNMAPPED_RATIONALE.to_string());
            debug!(%relation, "unmapped relation");
            return ScoreResult {
                relation,
                side,
                score: 0.0,
                satisfied: false,
                rationale,
            };
        }

        match score(ctx, descriptor, relation, side, scene) {
            Ok(scored) => {
                let threshold = self.config.threshold_for(relation);
                let satisfied = scored.score >= threshold;
                debug!(%relation, score = scored.score, satisfied, "scored relation");
                ScoreResult {
                    relation,
                    side,
                    score: scored.score,
                    satisfied,
                    rationale: scored.rationale,
                }
            }
            Err(err) => {
                warn!(%relation, error = %err, "relation check failed");
                ScoreResult::unsatisfiable(relation, side, err)
            }
        }
    }

    /// Evaluates a batch of descriptors in parallel, preserving input order.
    ///
    /// Work runs on the blocking pool, at most one check per available core at a time. A
    /// check that panics yields a failed evaluation for its descriptor only. The batch
    /// samples through its own cache, which is released when the batch completes.
    #[instrument(skip_all, fields(descriptors = descriptors.len()))]
    pub async fn evaluate_all(
        self: &Arc<Self>,
        scene: Arc<SceneGeometry>,
        descriptors: Vec<RelationDescriptor>,
    ) -> Vec<Evaluation> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let permits = Arc::new(Semaphore::new(workers));
        let sampler = Arc::new(Sampler::new(&self.config));
        let total = descriptors.len();
        let mut slots: Vec<Option<Evaluation>> = vec![None; total];
        let mut fallbacks = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            fallbacks.push((descriptor.relation_types.clone(), descriptor.sides.clone()));
            let evaluator = Arc::clone(self);
            let scene = Arc::clone(&scene);
            let permits = Arc::clone(&permits);
            let sampler = Arc::clone(&sampler);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = tokio::task::spawn_blocking(move || {
                    evaluator.evaluate_with(&sampler, &descriptor, &scene)
                })
                .await;
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(evaluation))) => slots[index] = Some(evaluation),
                Ok((index, Err(err))) => {
                    warn!(index, error = %err, "relation check panicked");
                    let (relation_types, sides) = &fallbacks[index];
                    slots[index] =
                        Some(failed_types(relation_types, sides, "evaluation panicked"));
                }
                Err(err) => warn!(error = %err, "evaluation task failed"),
            }
        }

        let evaluations: Vec<Evaluation> = slots
            .into_iter()
            .zip(&fallbacks)
            .map(|(slot, (relation_types, sides))| {
                slot.unwrap_or_else(|| {
                    failed_types(relation_types, sides, "evaluation task failed")
                })
            })
            .collect();
        let satisfied = evaluations.iter().filter(|e| e.satisfied).count();
        let sampled = sampler.cache().map_or(0, |cache| cache.len());
        info!(total, satisfied, workers, sampled, "evaluated relation batch");
        evaluations
    }
}

/// Evaluates one descriptor with a fresh evaluator.
///
/// Fails only when the configuration is invalid; per-relation failures are reported inside
/// the returned [`Evaluation`].
pub fn evaluate(
    descriptor: &RelationDescriptor,
    scene: &SceneGeometry,
    config: &RelationConfig,
) -> RelationResult<Evaluation> {
    Ok(Evaluator::new(config.clone())?.evaluate(descriptor, scene))
}

fn score(
    ctx: &ScoreContext,
    descriptor: &RelationDescriptor,
    relation: RelationType,
    side: Option<RelationSide>,
    scene: &SceneGeometry,
) -> RelationResult<Scored> {
    check_anchor_kind(relation, &descriptor.anchor)?;
    let targets = resolve_targets(descriptor, scene)?;

    match &descriptor.anchor {
        AnchorRef::Object(name) => {
            let anchor = first(scene.resolve(name, 1)?, name)?;
            if relation.is_group() {
                return score_surround(anchor, &targets, ctx);
            }
            weakest(
                targets
                    .iter()
                    .map(|target| score_pair(relation, side, anchor, target, ctx)),
            )
        }
        anchor => {
            let architecture = scene.architecture()?;
            weakest(targets.iter().map(|target| {
                score_arch(relation, side, anchor, architecture, target, ctx)
            }))
        }
    }
}

fn check_anchor_kind(relation: RelationType, anchor: &AnchorRef) -> RelationResult<()> {
    if relation.is_distance_band() {
        return Ok(());
    }
    if relation.is_architectural() && !anchor.is_architectural() {
        return Err(RelationError::Descriptor(format!(
            "{relation} needs an architectural anchor, got {anchor}"
        )));
    }
    if !relation.is_architectural() && anchor.is_architectural() {
        return Err(RelationError::Descriptor(format!(
            "{relation} needs an object anchor, got {anchor}"
        )));
    }
    Ok(())
}

fn resolve_targets<'a>(
    descriptor: &RelationDescriptor,
    scene: &'a SceneGeometry,
) -> RelationResult<Vec<&'a OrientedBox>> {
    let mut boxes = Vec::new();
    for target in &descriptor.targets {
        boxes.extend(scene.resolve(&target.name, target.count)?);
    }
    Ok(boxes)
}

fn first<'a>(boxes: Vec<&'a OrientedBox>, name: &str) -> RelationResult<&'a OrientedBox> {
    boxes
        .into_iter()
        .next()
        .ok_or_else(|| RelationError::Geometry(format!("missing object `{name}`")))
}

/// Multiple targets must all satisfy the relation, so the lowest score stands.
fn weakest<I>(scores: I) -> RelationResult<Scored>
where
    I: Iterator<Item = RelationResult<Scored>>,
{
    let mut lowest: Option<Scored> = None;
    for scored in scores {
        let scored = scored?;
        if lowest.as_ref().map_or(true, |l| scored.score < l.score) {
            lowest = Some(scored);
        }
    }
    lowest.ok_or_else(|| RelationError::Descriptor("no targets".into()))
}

fn failed_types(
    relation_types: &[RelationType],
    sides: &[Option<RelationSide>],
    reason: impl std::fmt::Display,
) -> Evaluation {
    let per_type = if relation_types.is_empty() {
        vec![ScoreResult::unsatisfiable(RelationType::None, None, &reason)]
    } else {
        relation_types
            .iter()
            .enumerate()
            .map(|(i, relation)| {
                ScoreResult::unsatisfiable(*relation, sides.get(i).copied().flatten(), &reason)
            })
            .collect()
    };
    Evaluation::from_results(per_type)
}

fn failed_evaluation(descriptor: &RelationDescriptor, err: &RelationError) -> Evaluation {
    failed_types(&descriptor.relation_types, &descriptor.sides, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Architecture;
    use crate::descriptor::TargetRef;
    use nalgebra::{Point2, Point3, Vector3};

    fn bedroom() -> SceneGeometry {
        let mut scene = SceneGeometry::new().with_architecture(Architecture::from_floor_polygon(
            vec![
                Point2::new(-3.0, -3.0),
                Point2::new(3.0, -3.0),
                Point2::new(3.0, 3.0),
                Point2::new(-3.0, 3.0),
            ],
            -0.25,
            2.5,
        ));
        scene.insert(
            "bed",
            OrientedBox::axis_aligned("bed_0", Point3::origin(), Vector3::new(1.6, 2.0, 0.5)),
        );
        scene.insert(
            "nightstand",
            OrientedBox::axis_aligned(
                "nightstand_0",
                Point3::new(-1.1, 0.0, 0.0),
                Vector3::new(0.4, 0.4, 0.5),
            ),
        );
        scene.insert(
            "flat",
            OrientedBox::axis_aligned(
                "flat_0",
                Point3::new(2.0, 2.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
            ),
        );
        scene
    }

    fn nightstand_beside_bed() -> RelationDescriptor {
        RelationDescriptor::new(
            AnchorRef::Object("bed".into()),
            vec![TargetRef::new("nightstand")],
        )
        .with_relation(RelationType::SideOf, Some(RelationSide::Left))
        .with_relation(RelationType::NextTo, None)
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(RelationConfig::default()).expect("default config is valid")
    }

    #[test]
    fn all_types_must_pass() {
        let evaluator = evaluator();
        let scene = bedroom();

        let evaluation = evaluator.evaluate(&nightstand_beside_bed(), &scene);
        assert!(evaluation.satisfied);
        assert_eq!(evaluation.per_type.len(), 2);

        let wrong_side = RelationDescriptor::new(
            AnchorRef::Object("bed_0".into()),
            vec![TargetRef::new("nightstand_0")],
        )
        .with_relation(RelationType::SideOf, Some(RelationSide::Right))
        .with_relation(RelationType::NextTo, None);
        let evaluation = evaluator.evaluate(&wrong_side, &scene);
        assert!(!evaluation.satisfied);
        assert!(!evaluation.per_type[0].satisfied);
        assert!(evaluation.per_type[1].satisfied);
    }

    #[test]
    fn unmapped_relation_keeps_upstream_rationale() {
        let descriptor = RelationDescriptor::new(AnchorRef::Room, Vec::new())
            .with_relation(RelationType::None, None)
            .with_rationale("the lamp is tilted towards the window");
        let evaluation = evaluator().evaluate(&descriptor, &bedroom());

        assert!(!evaluation.satisfied);
        assert_eq!(evaluation.per_type[0].score, 0.0);
        assert_eq!(
            evaluation.per_type[0].rationale,
            "the lamp is tilted towards the window"
        );
    }

    #[test]
    fn failures_become_unsatisfiable_results() {
        let evaluator = evaluator();
        let scene = bedroom();

        let mut misaligned = nightstand_beside_bed();
        misaligned.sides.pop();
        let evaluation = evaluator.evaluate(&misaligned, &scene);
        assert!(!evaluation.satisfied);
        assert_eq!(evaluation.per_type.len(), 2);
        assert!(evaluation.per_type[0]
            .rationale
            .starts_with("unsatisfiable, reason: invalid relation descriptor"));

        let degenerate = RelationDescriptor::new(
            AnchorRef::Object("bed".into()),
            vec![TargetRef::new("flat")],
        )
        .with_relation(RelationType::Near, None);
        let evaluation = evaluator.evaluate(&degenerate, &scene);
        assert!(evaluation.per_type[0]
            .rationale
            .starts_with("unsatisfiable, reason: degenerate geometry"));

        let wrong_anchor = RelationDescriptor::new(
            AnchorRef::Object("bed".into()),
            vec![TargetRef::new("nightstand")],
        )
        .with_relation(RelationType::OnWall, None);
        let evaluation = evaluator.evaluate(&wrong_anchor, &scene);
        assert!(!evaluation.satisfied);
    }

    #[test]
    fn architectural_anchor_resolves_walls() {
        let descriptor = RelationDescriptor::new(AnchorRef::Room, vec![TargetRef::new("bed")])
            .with_relation(RelationType::InsideRoom, None)
            .with_relation(RelationType::MiddleOfRoom, None);
        let evaluation = evaluator().evaluate(&descriptor, &bedroom());
        assert!(evaluation.satisfied, "{:?}", evaluation.per_type);
    }

    #[test]
    fn per_type_thresholds_apply() {
        // A 0.1 m gap scores about 0.28 for `near`.
        let descriptor = RelationDescriptor::new(
            AnchorRef::Object("bed".into()),
            vec![TargetRef::new("nightstand")],
        )
        .with_relation(RelationType::Near, None);
        assert!(!evaluator().evaluate(&descriptor, &bedroom()).satisfied);

        let mut config = RelationConfig::default();
        config.scoring.thresholds.insert("near".into(), 0.2);
        let lenient = Evaluator::new(config).expect("valid");
        assert!(lenient.evaluate(&descriptor, &bedroom()).satisfied);
        assert_eq!(lenient.config().threshold_for(RelationType::Near), 0.2);
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let scene = bedroom();
        let descriptor = nightstand_beside_bed();
        let first = evaluator().evaluate(&descriptor, &scene);
        let second = evaluator().evaluate(&descriptor, &scene);
        assert_eq!(first, second);

        let config = RelationConfig::default();
        let free = evaluate(&descriptor, &scene, &config).expect("valid config");
        assert_eq!(first, free);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = RelationConfig::default();
        config.spatial.middle_of.gaussian_std = 0.0;
        assert!(matches!(
            Evaluator::new(config),
            Err(RelationError::Config(_))
        ));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let evaluator = Arc::new(evaluator());
        let scene = Arc::new(bedroom());
        let far = RelationDescriptor::new(
            AnchorRef::Object("bed".into()),
            vec![TargetRef::new("nightstand")],
        )
        .with_relation(RelationType::Far, None);
        let descriptors = vec![
            nightstand_beside_bed(),
            far.clone(),
            nightstand_beside_bed(),
            far,
        ];

        let evaluations = evaluator.evaluate_all(scene, descriptors).await;
        let verdicts: Vec<bool> = evaluations.iter().map(|e| e.satisfied).collect();
        assert_eq!(verdicts, vec![true, false, true, false]);
    }

    #[tokio::test]
    async fn batch_matches_serial_evaluation() {
        let evaluator = Arc::new(evaluator());
        let scene = Arc::new(bedroom());
        let descriptors = vec![
            nightstand_beside_bed(),
            RelationDescriptor::new(AnchorRef::Room, vec![TargetRef::new("bed")])
                .with_relation(RelationType::InsideRoom, None)
                .with_relation(RelationType::MiddleOfRoom, None),
            RelationDescriptor::new(
                AnchorRef::Object("bed".into()),
                vec![TargetRef::new("nightstand"), TargetRef::new("flat")],
            )
            .with_relation(RelationType::Near, None)
            .with_relation(RelationType::Far, None),
            RelationDescriptor::new(
                AnchorRef::Object("bed".into()),
                vec![TargetRef::new("lamp")],
            )
            .with_relation(RelationType::NextTo, None),
        ];

        let serial: Vec<Evaluation> = descriptors
            .iter()
            .map(|descriptor| evaluator.evaluate(descriptor, &scene))
            .collect();
        evaluator.clear_cache();
        let batch = evaluator.evaluate_all(Arc::clone(&scene), descriptors).await;
        assert_eq!(batch, serial);
    }

    #[tokio::test]
    async fn batches_leave_the_serial_cache_alone() {
        let evaluator = Arc::new(evaluator());
        let scene = Arc::new(bedroom());
        let descriptors = vec![nightstand_beside_bed(); 8];

        evaluator.evaluate_all(Arc::clone(&scene), descriptors).await;
        assert_eq!(evaluator.sampler.cache().map(|cache| cache.len()), Some(0));

        evaluator.evaluate(&nightstand_beside_bed(), &scene);
        assert!(evaluator.sampler.cache().is_some_and(|cache| !cache.is_empty()));
        evaluator.clear_cache();
        assert!(evaluator.sampler.cache().is_some_and(|cache| cache.is_empty()));
    }
}
