//! Relation descriptors consumed from upstream and the results handed back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RelationError, RelationResult};
use crate::geometry::Side;

/// The closed set of relation types the engine can score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    InsideOf,
    OutsideOf,
    FaceTo,
    SideOf,
    SideRegion,
    LongShortSideOf,
    OnTop,
    MiddleOf,
    Surround,
    NextTo,
    Near,
    AcrossFrom,
    Far,
    InsideRoom,
    MiddleOfRoom,
    OnWall,
    AgainstWall,
    CornerOfRoom,
    HangFromCeiling,
    /// No predefined relation applies.
    #[serde(alias = "None")]
    None,
}

impl RelationType {
    pub const ALL: [RelationType; 20] = [
        RelationType::InsideOf,
        RelationType::OutsideOf,
        RelationType::FaceTo,
        RelationType::SideOf,
        RelationType::SideRegion,
        RelationType::LongShortSideOf,
        RelationType::OnTop,
        RelationType::MiddleOf,
        RelationType::Surround,
        RelationType::NextTo,
        RelationType::Near,
        RelationType::AcrossFrom,
        RelationType::Far,
        RelationType::InsideRoom,
        RelationType::MiddleOfRoom,
        RelationType::OnWall,
        RelationType::AgainstWall,
        RelationType::CornerOfRoom,
        RelationType::HangFromCeiling,
        RelationType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::InsideOf => "inside_of",
            RelationType::OutsideOf => "outside_of",
            RelationType::FaceTo => "face_to",
            RelationType::SideOf => "side_of",
            RelationType::SideRegion => "side_region",
            RelationType::LongShortSideOf => "long_short_side_of",
            RelationType::OnTop => "on_top",
            RelationType::MiddleOf => "middle_of",
            RelationType::Surround => "surround",
            RelationType::NextTo => "next_to",
            RelationType::Near => "near",
            RelationType::AcrossFrom => "across_from",
            RelationType::Far => "far",
            RelationType::InsideRoom => "inside_room",
            RelationType::MiddleOfRoom => "middle_of_room",
            RelationType::OnWall => "on_wall",
            RelationType::AgainstWall => "against_wall",
            RelationType::CornerOfRoom => "corner_of_room",
            RelationType::HangFromCeiling => "hang_from_ceiling",
            RelationType::None => "none",
        }
    }

    /// Group relations are scored once per anchor over all targets jointly.
    pub fn is_group(&self) -> bool {
        matches!(self, RelationType::Surround)
    }

    /// Distance-band relations apply to both object and architectural anchors.
    pub fn is_distance_band(&self) -> bool {
        matches!(
            self,
            RelationType::NextTo | RelationType::Near | RelationType::AcrossFrom | RelationType::Far
        )
    }

    /// Relations that only make sense against an architectural anchor.
    pub fn is_architectural(&self) -> bool {
        matches!(
            self,
            RelationType::InsideRoom
                | RelationType::MiddleOfRoom
                | RelationType::OnWall
                | RelationType::AgainstWall
                | RelationType::CornerOfRoom
                | RelationType::HangFromCeiling
        )
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        RelationType::ALL
            .into_iter()
            .find(|relation| relation.as_str() == normalized)
            .ok_or_else(|| RelationError::Descriptor(format!("unknown relation type `{s}`")))
    }
}

/// Side qualifier attached to a relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationSide {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
    Long,
    Short,
}

impl RelationSide {
    /// The box side this qualifier names, if it names one.
    pub fn as_side(&self) -> Option<Side> {
        match self {
            RelationSide::Front => Some(Side::Front),
            RelationSide::Back => Some(Side::Back),
            RelationSide::Left => Some(Side::Left),
            RelationSide::Right => Some(Side::Right),
            RelationSide::Top => Some(Side::Top),
            RelationSide::Bottom => Some(Side::Bottom),
            RelationSide::Long | RelationSide::Short => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationSide::Front => "front",
            RelationSide::Back => "back",
            RelationSide::Left => "left",
            RelationSide::Right => "right",
            RelationSide::Top => "top",
            RelationSide::Bottom => "bottom",
            RelationSide::Long => "long",
            RelationSide::Short => "short",
        }
    }
}

impl fmt::Display for RelationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a relation is measured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRef {
    /// Another object, referenced by id or by category.
    Object(String),
    Room,
    Floor,
    Ceiling,
    /// A specific wall by id, or `None` for whichever wall fits best.
    Wall(Option<String>),
}

impl AnchorRef {
    pub fn is_architectural(&self) -> bool {
        !matches!(self, AnchorRef::Object(_))
    }
}

impl fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorRef::Object(name) => write!(f, "object `{name}`"),
            AnchorRef::Room => f.write_str("room"),
            AnchorRef::Floor => f.write_str("floor"),
            AnchorRef::Ceiling => f.write_str("ceiling"),
            AnchorRef::Wall(Some(id)) => write!(f, "wall `{id}`"),
            AnchorRef::Wall(None) => f.write_str("any wall"),
        }
    }
}

fn one() -> usize {
    1
}

/// A target reference: an object id, or a category with an instance count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub name: String,
    #[serde(default = "one")]
    pub count: usize,
}

impl TargetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 1,
        }
    }

    pub fn group(category: impl Into<String>, count: usize) -> Self {
        Self {
            name: category.into(),
            count,
        }
    }
}

/// A structured relation produced upstream (annotation or language-model mapping).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub anchor: AnchorRef,
    pub targets: Vec<TargetRef>,
    /// Applied in parallel; aligned with `sides`.
    pub relation_types: Vec<RelationType>,
    pub sides: Vec<Option<RelationSide>>,
    /// Upstream explanation, reported verbatim for unmapped relations.
    #[serde(default)]
    pub rationale: Option<String>,
}

impl RelationDescriptor {
    pub fn new(anchor: AnchorRef, targets: Vec<TargetRef>) -> Self {
        Self {
            anchor,
            targets,
            relation_types: Vec::new(),
            sides: Vec::new(),
            rationale: None,
        }
    }

    /// Appends a relation type with its (optional) side qualifier.
    pub fn with_relation(mut self, relation: RelationType, side: Option<RelationSide>) -> Self {
        self.relation_types.push(relation);
        self.sides.push(side);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Checks the structural invariants of the descriptor.
    pub fn validate(&self) -> RelationResult<()> {
        if self.relation_types.len() != self.sides.len() {
            return Err(RelationError::Descriptor(format!(
                "{} relation types but {} sides",
                self.relation_types.len(),
                self.sides.len()
            )));
        }
        if self.relation_types.is_empty() {
            return Err(RelationError::Descriptor("no relation types".into()));
        }
        let needs_targets = self
            .relation_types
            .iter()
            .any(|relation| *relation != RelationType::None);
        if needs_targets && self.targets.is_empty() {
            return Err(RelationError::Descriptor("no targets".into()));
        }
        if let Some(target) = self.targets.iter().find(|target| target.count == 0) {
            return Err(RelationError::Descriptor(format!(
                "target `{}` has a zero instance count",
                target.name
            )));
        }
        Ok(())
    }
}

/// The outcome of scoring one relation type of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub relation: RelationType,
    pub side: Option<RelationSide>,
    /// Raw score in `[0, 1]`.
    pub score: f64,
    pub satisfied: bool,
    pub rationale: String,
}

impl ScoreResult {
    /// An unsatisfied result carrying a failure reason.
    pub fn unsatisfiable(
        relation: RelationType,
        side: Option<RelationSide>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            relation,
            side,
            score: 0.0,
            satisfied: false,
            rationale: format!("unsatisfiable, reason: {reason}"),
        }
    }
}

/// The outcome of evaluating a whole descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub per_type: Vec<ScoreResult>,
    /// Logical AND of every per-type verdict.
    pub satisfied: bool,
}

impl Evaluation {
    pub fn from_results(per_type: Vec<ScoreResult>) -> Self {
        let satisfied = !per_type.is_empty() && per_type.iter().all(|result| result.satisfied);
        Self {
            per_type,
            satisfied,
        }
    }
}
