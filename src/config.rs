//! Tunable parameters for every relation scorer.
//!
//! All tables and fields have defaults, so a configuration file only needs to list the
//! values it overrides. The configuration is validated once when an
//! [`Evaluator`](crate::Evaluator) is built and is read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::RelationType;
use crate::error::{RelationError, RelationResult};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    pub sampling: SamplingConfig,
    pub scoring: ScoringConfig,
    pub spatial: SpatialRelationConfig,
    pub architectural: ArchitecturalRelationConfig,
}

/// Point sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Global seed; per-box streams are derived from it.
    pub seed: u64,
    /// Points per cubic meter for volume samples.
    pub volume_density: f64,
    /// Points per square meter for face samples.
    pub face_density: f64,
    pub min_volume_points: usize,
    /// Upper bound on the size of any single point cloud.
    pub max_points: usize,
    /// Cache point clouds per box for the lifetime of an evaluator.
    pub presample: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            volume_density: 5000.0,
            face_density: 1000.0,
            min_volume_points: 1000,
            max_points: 20_000,
            presample: true,
        }
    }
}

/// Verdict thresholds and numeric tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub default_threshold: f64,
    /// Per-relation overrides keyed by relation name (e.g. `side_of`).
    pub thresholds: HashMap<String, f64>,
    pub contain_epsilon: f64,
    pub degenerate_epsilon: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.5,
            thresholds: HashMap::new(),
            contain_epsilon: 1e-6,
            degenerate_epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceToRelationConfig {
    pub max_deviation_degrees: f64,
}

impl Default for FaceToRelationConfig {
    fn default() -> Self {
        Self {
            max_deviation_degrees: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideOfRelationConfig {
    pub no_contain: bool,
    pub within_area_margin: f64,
}

impl Default for SideOfRelationConfig {
    fn default() -> Self {
        Self {
            no_contain: true,
            within_area_margin: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideRegionRelationConfig {
    pub no_contain: bool,
    pub within_area_margin: f64,
}

impl Default for SideRegionRelationConfig {
    fn default() -> Self {
        Self {
            no_contain: false,
            within_area_margin: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongShortSideRelationConfig {
    pub no_contain: bool,
    pub within_area_margin: f64,
}

impl Default for LongShortSideRelationConfig {
    fn default() -> Self {
        Self {
            no_contain: false,
            within_area_margin: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnTopRelationConfig {
    pub no_contain: bool,
    pub within_area_margin: f64,
    /// Vertical gap above the top face still counted as resting on it.
    pub max_gap: f64,
}

impl Default for OnTopRelationConfig {
    fn default() -> Self {
        Self {
            no_contain: true,
            within_area_margin: 1e-9,
            max_gap: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddleOfRelationConfig {
    pub gaussian_std: f64,
}

impl Default for MiddleOfRelationConfig {
    fn default() -> Self {
        Self { gaussian_std: 0.25 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurroundRelationConfig {
    pub distance_weight: f64,
    pub angle_weight: f64,
    pub distance_range: [f64; 2],
}

impl Default for SurroundRelationConfig {
    fn default() -> Self {
        Self {
            distance_weight: 0.5,
            angle_weight: 0.5,
            distance_range: [0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceScoreConfig {
    /// Floor on the number of points sampled per face for surface distances.
    pub min_num_sample_points: usize,
    pub gaussian_std: f64,
}

impl Default for DistanceScoreConfig {
    fn default() -> Self {
        Self {
            min_num_sample_points: 64,
            gaussian_std: 0.25,
        }
    }
}

/// A `[min, max)` surface-gap band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBandConfig {
    pub distance_range: [f64; 2],
}

fn next_to_band() -> DistanceBandConfig {
    DistanceBandConfig {
        distance_range: [0.0, 0.5],
    }
}

fn near_band() -> DistanceBandConfig {
    DistanceBandConfig {
        distance_range: [0.5, 1.5],
    }
}

fn across_from_band() -> DistanceBandConfig {
    DistanceBandConfig {
        distance_range: [1.5, 4.0],
    }
}

fn far_band() -> DistanceBandConfig {
    DistanceBandConfig {
        distance_range: [4.0, f64::INFINITY],
    }
}

/// Object-object relation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialRelationConfig {
    pub face_to: FaceToRelationConfig,
    pub side_of: SideOfRelationConfig,
    pub side_region: SideRegionRelationConfig,
    pub long_short_side_of: LongShortSideRelationConfig,
    pub on_top: OnTopRelationConfig,
    pub middle_of: MiddleOfRelationConfig,
    pub surround: SurroundRelationConfig,
    pub distance_score: DistanceScoreConfig,
    pub next_to: DistanceBandConfig,
    pub near: DistanceBandConfig,
    pub across_from: DistanceBandConfig,
    pub far: DistanceBandConfig,
}

impl Default for SpatialRelationConfig {
    fn default() -> Self {
        Self {
            face_to: FaceToRelationConfig::default(),
            side_of: SideOfRelationConfig::default(),
            side_region: SideRegionRelationConfig::default(),
            long_short_side_of: LongShortSideRelationConfig::default(),
            on_top: OnTopRelationConfig::default(),
            middle_of: MiddleOfRelationConfig::default(),
            surround: SurroundRelationConfig::default(),
            distance_score: DistanceScoreConfig::default(),
            next_to: next_to_band(),
            near: near_band(),
            across_from: across_from_band(),
            far: far_band(),
        }
    }
}

impl SpatialRelationConfig {
    /// The band for a distance relation, `None` for any other relation.
    pub fn band(&self, relation: RelationType) -> Option<&DistanceBandConfig> {
        match relation {
            RelationType::NextTo => Some(&self.next_to),
            RelationType::Near => Some(&self.near),
            RelationType::AcrossFrom => Some(&self.across_from),
            RelationType::Far => Some(&self.far),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchMiddleOfRoomRelationConfig {
    /// In half short extents of the room.
    pub base_std_dev: f64,
    pub obj_size_weight: f64,
    pub ratio_weight: f64,
}

impl Default for ArchMiddleOfRoomRelationConfig {
    fn default() -> Self {
        Self {
            base_std_dev: 1.0,
            obj_size_weight: 0.5,
            ratio_weight: 1.0,
        }
    }
}

fn default_arch_std() -> f64 {
    0.25
}

/// A distance band against an architectural surface, with its own falloff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchDistanceBandConfig {
    pub distance_range: [f64; 2],
    #[serde(default = "default_arch_std")]
    pub gaussian_std: f64,
}

impl ArchDistanceBandConfig {
    fn new(min: f64, max: f64) -> Self {
        Self {
            distance_range: [min, max],
            gaussian_std: default_arch_std(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchOnWallRelationConfig {
    pub distance_range: [f64; 2],
    pub gaussian_std: f64,
    pub no_contain: bool,
    pub within_area_margin: f64,
    pub max_deviation_degrees: f64,
}

impl Default for ArchOnWallRelationConfig {
    fn default() -> Self {
        Self {
            distance_range: [0.0, 0.01],
            gaussian_std: 0.01,
            no_contain: true,
            within_area_margin: 1e-9,
            max_deviation_degrees: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchAgainstWallRelationConfig {
    pub distance_range: [f64; 2],
    pub gaussian_std: f64,
    pub no_contain: bool,
    pub within_area_margin: f64,
    pub max_deviation_degrees: f64,
}

impl Default for ArchAgainstWallRelationConfig {
    fn default() -> Self {
        Self {
            distance_range: [0.0, 0.3],
            gaussian_std: 0.1,
            no_contain: true,
            within_area_margin: 1e-9,
            max_deviation_degrees: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchCornerOfRoomRelationConfig {
    pub base_distance_threshold: f64,
    pub gaussian_std: f64,
    /// Largest `|cos|` between the two nearest walls still treated as perpendicular.
    pub perpendicular_threshold: f64,
}

impl Default for ArchCornerOfRoomRelationConfig {
    fn default() -> Self {
        Self {
            base_distance_threshold: 0.8,
            gaussian_std: 0.25,
            perpendicular_threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchHangFromCeilingRelationConfig {
    pub distance_range: [f64; 2],
    pub gaussian_std: f64,
    /// The object's bottom must stay at least this far above the floor.
    pub min_floor_clearance: f64,
}

impl Default for ArchHangFromCeilingRelationConfig {
    fn default() -> Self {
        Self {
            distance_range: [0.0, 0.01],
            gaussian_std: 0.03,
            min_floor_clearance: 0.1,
        }
    }
}

/// Object-architecture relation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitecturalRelationConfig {
    pub middle_of_room: ArchMiddleOfRoomRelationConfig,
    pub next_to: ArchDistanceBandConfig,
    pub near: ArchDistanceBandConfig,
    pub across_from: ArchDistanceBandConfig,
    pub far: ArchDistanceBandConfig,
    pub on_wall: ArchOnWallRelationConfig,
    pub against_wall: ArchAgainstWallRelationConfig,
    pub corner_of_room: ArchCornerOfRoomRelationConfig,
    pub hang_from_ceiling: ArchHangFromCeilingRelationConfig,
}

impl Default for ArchitecturalRelationConfig {
    fn default() -> Self {
        Self {
            middle_of_room: ArchMiddleOfRoomRelationConfig::default(),
            next_to: ArchDistanceBandConfig::new(0.0, 0.5),
            near: ArchDistanceBandConfig::new(0.5, 1.5),
            across_from: ArchDistanceBandConfig::new(1.5, 4.0),
            far: ArchDistanceBandConfig::new(4.0, f64::INFINITY),
            on_wall: ArchOnWallRelationConfig::default(),
            against_wall: ArchAgainstWallRelationConfig::default(),
            corner_of_room: ArchCornerOfRoomRelationConfig::default(),
            hang_from_ceiling: ArchHangFromCeilingRelationConfig::default(),
        }
    }
}

impl ArchitecturalRelationConfig {
    pub fn band(&self, relation: RelationType) -> Option<&ArchDistanceBandConfig> {
        match relation {
            RelationType::NextTo => Some(&self.next_to),
            RelationType::Near => Some(&self.near),
            RelationType::AcrossFrom => Some(&self.across_from),
            RelationType::Far => Some(&self.far),
            _ => None,
        }
    }
}

impl RelationConfig {
    /// Parses a TOML document; missing tables and fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> RelationResult<Self> {
        let config: RelationConfig =
            toml::from_str(contents).map_err(|e| RelationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    pub fn load(path: &Path) -> RelationResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RelationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// The verdict threshold for a relation type.
    pub fn threshold_for(&self, relation: RelationType) -> f64 {
        self.scoring
            .thresholds
            .get(relation.as_str())
            .copied()
            .unwrap_or(self.scoring.default_threshold)
    }

    /// Rejects parameter values no scorer can work with.
    pub fn validate(&self) -> RelationResult<()> {
        let sampling = &self.sampling;
        positive("sampling.volume_density", sampling.volume_density)?;
        positive("sampling.face_density", sampling.face_density)?;
        if sampling.min_volume_points == 0 {
            return Err(invalid("sampling.min_volume_points must be at least 1"));
        }
        if sampling.max_points < sampling.min_volume_points {
            return Err(invalid(
                "sampling.max_points must not be below sampling.min_volume_points",
            ));
        }

        let scoring = &self.scoring;
        unit_interval("scoring.default_threshold", scoring.default_threshold)?;
        for (relation, threshold) in &scoring.thresholds {
            relation.parse::<RelationType>().map_err(|_| {
                invalid(format!("scoring.thresholds names unknown relation `{relation}`"))
            })?;
            unit_interval(&format!("scoring.thresholds.{relation}"), *threshold)?;
        }
        non_negative("scoring.contain_epsilon", scoring.contain_epsilon)?;
        positive("scoring.degenerate_epsilon", scoring.degenerate_epsilon)?;

        let spatial = &self.spatial;
        angle("spatial.face_to.max_deviation_degrees", spatial.face_to.max_deviation_degrees)?;
        non_negative("spatial.side_of.within_area_margin", spatial.side_of.within_area_margin)?;
        non_negative(
            "spatial.side_region.within_area_margin",
            spatial.side_region.within_area_margin,
        )?;
        non_negative(
            "spatial.long_short_side_of.within_area_margin",
            spatial.long_short_side_of.within_area_margin,
        )?;
        non_negative("spatial.on_top.within_area_margin", spatial.on_top.within_area_margin)?;
        non_negative("spatial.on_top.max_gap", spatial.on_top.max_gap)?;
        positive("spatial.middle_of.gaussian_std", spatial.middle_of.gaussian_std)?;
        weights(
            "spatial.surround",
            spatial.surround.distance_weight,
            spatial.surround.angle_weight,
        )?;
        range("spatial.surround.distance_range", spatial.surround.distance_range)?;
        if spatial.distance_score.min_num_sample_points == 0 {
            return Err(invalid(
                "spatial.distance_score.min_num_sample_points must be at least 1",
            ));
        }
        positive("spatial.distance_score.gaussian_std", spatial.distance_score.gaussian_std)?;
        range("spatial.next_to.distance_range", spatial.next_to.distance_range)?;
        range("spatial.near.distance_range", spatial.near.distance_range)?;
        range("spatial.across_from.distance_range", spatial.across_from.distance_range)?;
        range("spatial.far.distance_range", spatial.far.distance_range)?;

        let arch = &self.architectural;
        positive(
            "architectural.middle_of_room.base_std_dev",
            arch.middle_of_room.base_std_dev,
        )?;
        non_negative(
            "architectural.middle_of_room.obj_size_weight",
            arch.middle_of_room.obj_size_weight,
        )?;
        non_negative(
            "architectural.middle_of_room.ratio_weight",
            arch.middle_of_room.ratio_weight,
        )?;
        for (name, band) in [
            ("next_to", &arch.next_to),
            ("near", &arch.near),
            ("across_from", &arch.across_from),
            ("far", &arch.far),
        ] {
            range(&format!("architectural.{name}.distance_range"), band.distance_range)?;
            positive(&format!("architectural.{name}.gaussian_std"), band.gaussian_std)?;
        }
        range("architectural.on_wall.distance_range", arch.on_wall.distance_range)?;
        positive("architectural.on_wall.gaussian_std", arch.on_wall.gaussian_std)?;
        non_negative(
            "architectural.on_wall.within_area_margin",
            arch.on_wall.within_area_margin,
        )?;
        angle(
            "architectural.on_wall.max_deviation_degrees",
            arch.on_wall.max_deviation_degrees,
        )?;
        range(
            "architectural.against_wall.distance_range",
            arch.against_wall.distance_range,
        )?;
        positive("architectural.against_wall.gaussian_std", arch.against_wall.gaussian_std)?;
        non_negative(
            "architectural.against_wall.within_area_margin",
            arch.against_wall.within_area_margin,
        )?;
        angle(
            "architectural.against_wall.max_deviation_degrees",
            arch.against_wall.max_deviation_degrees,
        )?;
        non_negative(
            "architectural.corner_of_room.base_distance_threshold",
            arch.corner_of_room.base_distance_threshold,
        )?;
        positive(
            "architectural.corner_of_room.gaussian_std",
            arch.corner_of_room.gaussian_std,
        )?;
        unit_interval(
            "architectural.corner_of_room.perpendicular_threshold",
            arch.corner_of_room.perpendicular_threshold,
        )?;
        range(
            "architectural.hang_from_ceiling.distance_range",
            arch.hang_from_ceiling.distance_range,
        )?;
        positive(
            "architectural.hang_from_ceiling.gaussian_std",
            arch.hang_from_ceiling.gaussian_std,
        )?;
        non_negative(
            "architectural.hang_from_ceiling.min_floor_clearance",
            arch.hang_from_ceiling.min_floor_clearance,
        )?;

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> RelationError {
    RelationError::Config(message.into())
}

fn positive(name: &str, value: f64) -> RelationResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> RelationResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be non-negative, got {value}")))
    }
}

fn unit_interval(name: &str, value: f64) -> RelationResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must lie in [0, 1], got {value}")))
    }
}

fn angle(name: &str, value: f64) -> RelationResult<()> {
    if value > 0.0 && value <= 180.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must lie in (0, 180], got {value}")))
    }
}

fn range(name: &str, [min, max]: [f64; 2]) -> RelationResult<()> {
    if !min.is_finite() || min < 0.0 || max.is_nan() || max < min {
        return Err(invalid(format!(
            "{name} must satisfy 0 <= min <= max, got [{min}, {max}]"
        )));
    }
    Ok(())
}

fn weights(name: &str, first: f64, second: f64) -> RelationResult<()> {
    non_negative(&format!("{name} weight"), first)?;
    non_negative(&format!("{name} weight"), second)?;
    if first + second <= 0.0 {
        return Err(invalid(format!("{name} weights must not both be zero")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RelationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.spatial.next_to.distance_range, [0.0, 0.5]);
        assert!(config.spatial.far.distance_range[1].is_infinite());
        assert_eq!(config.spatial.side_of.within_area_margin, 0.25);
        assert!(!config.spatial.side_region.no_contain);
        assert_eq!(config.architectural.against_wall.gaussian_std, 0.1);
        assert_eq!(config.threshold_for(RelationType::NextTo), 0.5);
    }

    #[test]
    fn partial_toml_overrides_keep_other_defaults() {
        let config = RelationConfig::from_toml_str(
            r#"
            [sampling]
            seed = 7

            [scoring.thresholds]
            side_of = 0.8

            [spatial.next_to]
            distance_range = [0.0, 0.4]

            [architectural.far]
            distance_range = [5.0, inf]
            "#,
        )
        .expect("valid config");

        assert_eq!(config.sampling.seed, 7);
        assert_eq!(config.sampling.min_volume_points, 1000);
        assert_eq!(config.threshold_for(RelationType::SideOf), 0.8);
        assert_eq!(config.threshold_for(RelationType::Near), 0.5);
        assert_eq!(config.spatial.next_to.distance_range, [0.0, 0.4]);
        assert_eq!(config.spatial.near.distance_range, [0.5, 1.5]);
        assert_eq!(config.architectural.far.gaussian_std, 0.25);
        assert!(config.architectural.far.distance_range[1].is_infinite());
    }

    #[test]
    fn reversed_range_is_a_config_error() {
        let mut config = RelationConfig::default();
        config.spatial.near.distance_range = [1.5, 0.5];

        let err = config.validate().expect_err("reversed range");
        assert!(matches!(err, RelationError::Config(_)));
        assert!(err.to_string().contains("spatial.near.distance_range"));
    }

    #[test]
    fn zero_surround_weights_are_rejected() {
        let mut config = RelationConfig::default();
        config.spatial.surround.distance_weight = 0.0;
        config.spatial.surround.angle_weight = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = RelationConfig::load(Path::new("/nonexistent/relations.toml"))
            .expect_err("missing file");
        assert!(matches!(err, RelationError::Config(_)));
    }
}
