//! Model module - scoring models, their scalings and per-user collections

use std::collections::{BTreeMap, BTreeSet};

use crate::score::Score;
use crate::table::{format_float, parse_float, MultiKeyTable, TableValue};

impl TableValue for Score {
    fn value_names() -> Vec<&'static str> {
        vec!["value", "left_unc", "right_unc"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            format_float(self.value),
            format_float(self.left_unc),
            format_float(self.right_unc),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [value, left, right] => {
                let (value, left, right) = (parse_float(value)?, parse_float(left)?, parse_float(right)?);
                if value.is_nan() {
                    return Ok(Score::nan());
                }
                if left < 0.0 || right < 0.0 || left.is_nan() || right.is_nan() {
                    return Err(format!("Invalid uncertainties ({}, {})", left, right));
                }
                Ok(Score::new(value, left, right))
            }
            _ => Err(format!("Expected 3 fields, got {}", fields.len())),
        }
    }
}

/// Scores indexed by named keys
pub type MultiScore = MultiKeyTable<Score>;

/// Kind of scaling applied on top of direct scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalingKind {
    /// Multiply the score
    Multiplier,

    /// Add to the score
    Translation,
}

impl ScalingKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingKind::Multiplier => "multiplier",
            ScalingKind::Translation => "translation",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "multiplier" => Some(ScalingKind::Multiplier),
            "translation" => Some(ScalingKind::Translation),
            _ => None,
        }
    }
}

/// One scaling record of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Scaling {
    /// Multiplier or translation
    pub kind: ScalingKind,
    /// Criterion the scaling applies to
    pub criterion: String,
    /// Scaling value with uncertainty
    pub score: Score,
}

/// A scoring model: direct scores plus an ordered list of scalings
///
/// Evaluation starts from the direct score and applies every scaling of the
/// same criterion in insertion order, using interval arithmetic.
///
/// # Examples
///
/// ```
/// use concord_domain::{Score, ScoringModel, ScalingKind};
///
/// let mut model = ScoringModel::new();
/// model.set_direct("a", "importance", Score::new(1.0, 0.5, 0.5));
/// model.add_scaling(ScalingKind::Multiplier, "importance", Score::exact(2.0));
/// model.add_scaling(ScalingKind::Translation, "importance", Score::exact(1.0));
///
/// let scaled = model.evaluate("a", "importance").unwrap();
/// assert_eq!(scaled.value, 3.0);
/// assert_eq!(scaled.left_unc, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    directs: MultiScore,
    scalings: Vec<Scaling>,
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringModel {
    /// Key names of the direct scores
    pub const KEYNAMES: [&'static str; 2] = ["entity_name", "criterion"];

    /// Create an empty model
    pub fn new() -> Self {
        Self {
            directs: MultiKeyTable::new(&Self::KEYNAMES),
            scalings: Vec::new(),
        }
    }

    /// Set the direct score of an entity
    pub fn set_direct(&mut self, entity_name: &str, criterion: &str, score: Score) {
        self.directs.insert(&[entity_name, criterion], score);
    }

    /// Direct (unscaled) score of an entity
    pub fn direct(&self, entity_name: &str, criterion: &str) -> Option<Score> {
        self.directs.get(&[entity_name, criterion]).copied()
    }

    /// Remove the direct score of an entity
    pub fn remove_direct(&mut self, entity_name: &str, criterion: &str) -> Option<Score> {
        self.directs.remove(&[entity_name, criterion])
    }

    /// Append a scaling for a criterion
    pub fn add_scaling(&mut self, kind: ScalingKind, criterion: &str, score: Score) {
        self.scalings.push(Scaling {
            kind,
            criterion: criterion.to_string(),
            score,
        });
    }

    /// Scalings in insertion order
    pub fn scalings(&self) -> &[Scaling] {
        &self.scalings
    }

    /// Scaled score of an entity
    pub fn evaluate(&self, entity_name: &str, criterion: &str) -> Option<Score> {
        let direct = self.direct(entity_name, criterion)?;
        Some(self.apply_scalings(criterion, direct))
    }

    /// Apply every scaling of `criterion` to a score
    pub fn apply_scalings(&self, criterion: &str, score: Score) -> Score {
        self.scalings
            .iter()
            .filter(|s| s.criterion == criterion)
            .fold(score, |acc, s| match s.kind {
                ScalingKind::Multiplier => acc * s.score,
                ScalingKind::Translation => acc + s.score,
            })
    }

    /// Entities with a direct score on `criterion`
    pub fn scored_entities(&self, criterion: &str) -> BTreeSet<String> {
        self.directs
            .iter()
            .into_iter()
            .filter(|(keys, _)| keys[1] == criterion)
            .map(|(mut keys, _)| keys.swap_remove(0))
            .collect()
    }

    /// Criteria with at least one direct score
    pub fn criteria(&self) -> BTreeSet<String> {
        self.directs.keys("criterion")
    }

    /// Scaled scores of every entity on `criterion`
    pub fn scaled(&self, criterion: &str) -> BTreeMap<String, Score> {
        self.directs
            .iter()
            .into_iter()
            .filter(|(keys, _)| keys[1] == criterion)
            .map(|(keys, direct)| (keys[0].clone(), self.apply_scalings(criterion, *direct)))
            .collect()
    }

    /// Direct scores table
    pub fn directs(&self) -> &MultiScore {
        &self.directs
    }
}

/// Scoring models of every user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserModels {
    models: BTreeMap<String, ScoringModel>,
}

impl UserModels {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Model of a user
    pub fn get(&self, username: &str) -> Option<&ScoringModel> {
        self.models.get(username)
    }

    /// Mutable model of a user
    pub fn get_mut(&mut self, username: &str) -> Option<&mut ScoringModel> {
        self.models.get_mut(username)
    }

    /// Model of a user, created empty if missing
    pub fn entry(&mut self, username: &str) -> &mut ScoringModel {
        self.models.entry(username.to_string()).or_default()
    }

    /// Iterate over `(username, model)` in username order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScoringModel)> {
        self.models.iter()
    }

    /// Number of users with a model
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no user has a model
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Users with at least one direct score on `criterion`
    pub fn scored_users(&self, criterion: &str) -> Vec<&str> {
        self.models
            .iter()
            .filter(|(_, m)| !m.scored_entities(criterion).is_empty())
            .map(|(u, _)| u.as_str())
            .collect()
    }

    /// Entities scored by at least one user on `criterion`
    pub fn scored_entities(&self, criterion: &str) -> BTreeSet<String> {
        self.models
            .values()
            .flat_map(|m| m.scored_entities(criterion))
            .collect()
    }

    /// Every criterion scored by some user
    pub fn criteria(&self) -> BTreeSet<String> {
        self.models.values().flat_map(|m| m.criteria()).collect()
    }

    /// Scaled scores on `criterion`, keyed by `(username, entity_name)`
    pub fn scores(&self, criterion: &str) -> MultiScore {
        let mut table = MultiKeyTable::new(&["username", "entity_name"]);
        for (username, model) in &self.models {
            for (entity_name, score) in model.scaled(criterion) {
                table.insert(&[username.as_str(), entity_name.as_str()], score);
            }
        }
        table
    }

    /// All direct scores, keyed by `(username, entity_name, criterion)`
    pub fn directs_table(&self) -> MultiScore {
        let mut table = MultiKeyTable::new(&["username", "entity_name", "criterion"]);
        for (username, model) in &self.models {
            for (keys, score) in model.directs().iter() {
                table.insert(&[username.as_str(), keys[0].as_str(), keys[1].as_str()], *score);
            }
        }
        table
    }

    /// All scalings as `(username, scaling)` in username then insertion order
    pub fn scalings(&self) -> Vec<(&str, &Scaling)> {
        self.models
            .iter()
            .flat_map(|(u, m)| m.scalings().iter().map(move |s| (u.as_str(), s)))
            .collect()
    }
}

/// Voting rights keyed by `(username, entity_name, criterion)`
#[derive(Debug, Clone, PartialEq)]
pub struct VotingRights {
    table: MultiKeyTable<f64>,
}

impl Default for VotingRights {
    fn default() -> Self {
        Self::new()
    }
}

impl VotingRights {
    /// Key names of the underlying table
    pub const KEYNAMES: [&'static str; 3] = ["username", "entity_name", "criterion"];

    /// Create an empty table
    pub fn new() -> Self {
        Self {
            table: MultiKeyTable::new(&Self::KEYNAMES).with_valuenames(&["voting_right"]),
        }
    }

    /// Set a voting right
    ///
    /// # Panics
    /// Panics if the voting right is negative or NaN
    pub fn set(&mut self, username: &str, entity_name: &str, criterion: &str, voting_right: f64) {
        assert!(voting_right >= 0.0, "Voting right must be >= 0, got {}", voting_right);
        self.table.insert(&[username, entity_name, criterion], voting_right);
    }

    /// Voting right of a user on an entity; 0 when unset
    pub fn get(&self, username: &str, entity_name: &str, criterion: &str) -> f64 {
        self.table
            .get(&[username, entity_name, criterion])
            .copied()
            .unwrap_or(0.0)
    }

    /// Voting rights on one entity and criterion, keyed by username
    pub fn for_entity(&self, entity_name: &str, criterion: &str) -> BTreeMap<String, f64> {
        self.table
            .filter(&[("entity_name", entity_name), ("criterion", criterion)])
            .iter()
            .into_iter()
            .map(|(keys, v)| (keys[0].clone(), *v))
            .collect()
    }

    /// Index by `(entity_name, criterion)` for [`VotingRights::for_entity`]
    pub fn cache_by_entity(&mut self) {
        // both names are declared keys
        let _ = self.table.cache(&["entity_name", "criterion"]);
    }

    /// Underlying table
    pub fn table(&self) -> &MultiKeyTable<f64> {
        &self.table
    }

    /// Number of stored voting rights
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no voting right is stored
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_kind_roundtrip() {
        for kind in [ScalingKind::Multiplier, ScalingKind::Translation] {
            assert_eq!(ScalingKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ScalingKind::parse("Multiplier"), Some(ScalingKind::Multiplier));
        assert_eq!(ScalingKind::parse("rotation"), None);
    }

    #[test]
    fn test_evaluate_without_scalings() {
        let mut model = ScoringModel::new();
        model.set_direct("a", "importance", Score::new(1.5, 0.1, 0.2));
        assert_eq!(model.evaluate("a", "importance"), model.direct("a", "importance"));
        assert!(model.evaluate("b", "importance").is_none());
    }

    #[test]
    fn test_scalings_apply_in_order_per_criterion() {
        let mut model = ScoringModel::new();
        model.set_direct("a", "importance", Score::exact(2.0));
        model.set_direct("a", "reliability", Score::exact(2.0));
        model.add_scaling(ScalingKind::Translation, "importance", Score::exact(1.0));
        model.add_scaling(ScalingKind::Multiplier, "importance", Score::exact(3.0));

        // (2 + 1) * 3
        assert_eq!(model.evaluate("a", "importance").unwrap().value, 9.0);
        assert_eq!(model.evaluate("a", "reliability").unwrap().value, 2.0);
    }

    #[test]
    fn test_user_models_tables() {
        let mut models = UserModels::new();
        models.entry("alice").set_direct("a", "importance", Score::exact(1.0));
        models.entry("alice").set_direct("b", "importance", Score::exact(-1.0));
        models.entry("bob").set_direct("a", "importance", Score::exact(0.5));
        models
            .entry("bob")
            .add_scaling(ScalingKind::Multiplier, "importance", Score::exact(2.0));

        assert_eq!(models.scored_entities("importance").len(), 2);
        assert_eq!(models.scored_users("importance"), vec!["alice", "bob"]);
        assert_eq!(models.directs_table().len(), 3);
        assert_eq!(models.scalings().len(), 1);

        let scores = models.scores("importance");
        assert_eq!(scores.get(&["bob", "a"]).unwrap().value, 1.0);
    }

    #[test]
    fn test_score_fields() {
        let score = Score::new(1.0, 0.5, f64::INFINITY);
        let fields = score.to_fields();
        assert_eq!(fields, vec!["1", "0.5", "inf"]);
        let refs: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        assert_eq!(Score::from_fields(&refs).unwrap(), score);
        assert!(Score::from_fields(&["nan", "0", "0"]).unwrap().is_nan());
        assert!(Score::from_fields(&["1", "-1", "0"]).is_err());
    }

    #[test]
    fn test_voting_rights_default_zero() {
        let mut rights = VotingRights::new();
        rights.set("alice", "a", "importance", 0.7);
        rights.set("bob", "a", "importance", 0.3);
        rights.cache_by_entity();
        assert_eq!(rights.get("alice", "a", "importance"), 0.7);
        assert_eq!(rights.get("carol", "a", "importance"), 0.0);
        assert_eq!(rights.for_entity("a", "importance").len(), 2);
        assert_eq!(rights.table().header().last().unwrap(), "voting_right");
    }
}
