//! State module - everything a pipeline step reads and produces

use crate::entities::{Assessments, Comparisons, Entities, MadePublic, Users, Vouch, ASSESSMENT_KEYNAMES};
use crate::model::{ScoringModel, UserModels, VotingRights};
use crate::table::{format_float, parse_bool, parse_float, MultiKeyTable, TableValue};

/// Voting statistics of one (entity, criterion)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityVotingStats {
    /// Σ privacy weight × trust over evaluators
    pub cumulative_trust: f64,
    /// Uniform floor r* given to every evaluator
    pub min_voting_right: f64,
    /// Σ voting rights − cumulative trust
    pub overtrust: f64,
}

impl TableValue for EntityVotingStats {
    fn value_names() -> Vec<&'static str> {
        vec!["cumulative_trust", "min_voting_right", "overtrust"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            format_float(self.cumulative_trust),
            format_float(self.min_voting_right),
            format_float(self.overtrust),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [cumulative_trust, min_voting_right, overtrust] => Ok(Self {
                cumulative_trust: parse_float(cumulative_trust)?,
                min_voting_right: parse_float(min_voting_right)?,
                overtrust: parse_float(overtrust)?,
            }),
            _ => Err(format!("Expected 3 fields, got {}", fields.len())),
        }
    }
}

/// Scaling statistics of one (username, criterion)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalerStats {
    /// trust × Σ privacy penalty over finitely scored entities
    pub activity: f64,
    /// Whether the user was selected as a scaler
    pub is_scaler: bool,
    /// Weighted p-norm of the user's scores
    pub model_norm: f64,
}

impl TableValue for ScalerStats {
    fn value_names() -> Vec<&'static str> {
        vec!["activity", "is_scaler", "model_norm"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            format_float(self.activity),
            self.is_scaler.to_string(),
            format_float(self.model_norm),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [activity, is_scaler, model_norm] => Ok(Self {
                activity: parse_float(activity)?,
                is_scaler: parse_bool(is_scaler)?,
                model_norm: parse_float(model_norm)?,
            }),
            _ => Err(format!("Expected 3 fields, got {}", fields.len())),
        }
    }
}

/// Key names of the voting statistics table
pub const VOTING_STATISTICS_KEYNAMES: [&str; 2] = ["entity_name", "criterion"];

/// Key names of the scaling statistics table
pub const SCALING_STATISTICS_KEYNAMES: [&str; 2] = ["username", "criterion"];

/// Inputs and outputs of a pipeline run
///
/// Steps never mutate the state they receive; each returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Contributors and their trust
    pub users: Users,
    /// Known entities
    pub entities: Entities,
    /// Vouches between users
    pub vouches: Vec<Vouch>,
    /// Public/private flags of ratings
    pub made_public: MadePublic,
    /// Direct assessments
    pub assessments: Assessments,
    /// Pairwise comparisons
    pub comparisons: Comparisons,
    /// Voting rights per (username, entity_name, criterion)
    pub voting_rights: VotingRights,
    /// Per-user scoring models
    pub user_models: UserModels,
    /// Global scores
    pub global_model: ScoringModel,
    /// Voting statistics per (entity_name, criterion)
    pub voting_statistics: MultiKeyTable<EntityVotingStats>,
    /// Scaling statistics per (username, criterion)
    pub scaling_statistics: MultiKeyTable<ScalerStats>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            users: Users::default(),
            entities: Entities::default(),
            vouches: Vec::new(),
            made_public: MadePublic::all_public(),
            assessments: MultiKeyTable::new(&ASSESSMENT_KEYNAMES),
            comparisons: Comparisons::new(),
            voting_rights: VotingRights::new(),
            user_models: UserModels::new(),
            global_model: ScoringModel::new(),
            voting_statistics: MultiKeyTable::new(&VOTING_STATISTICS_KEYNAMES),
            scaling_statistics: MultiKeyTable::new(&SCALING_STATISTICS_KEYNAMES),
        }
    }
}

impl State {
    /// Create a state from raw inputs, with empty outputs
    pub fn from_inputs(users: Users, comparisons: Comparisons, made_public: MadePublic) -> Self {
        let mut entities = Entities::new();
        for name in comparisons.entity_names() {
            entities.insert(name);
        }
        Self {
            users,
            entities,
            comparisons,
            made_public,
            ..Self::default()
        }
    }

    /// Every criterion with at least one comparison
    pub fn criteria(&self) -> Vec<String> {
        self.comparisons.criteria().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Comparison, User};

    #[test]
    fn test_from_inputs_collects_entities() {
        let users: Users = vec![User::new("alice", 1.0, true)].into_iter().collect();
        let mut comparisons = Comparisons::new();
        comparisons.add("alice", "importance", "a", "b", Comparison::new(-1.0, 2.0).unwrap());
        let state = State::from_inputs(users, comparisons, MadePublic::all_public());
        assert_eq!(state.entities.len(), 2);
        assert_eq!(state.criteria(), vec!["importance"]);
        assert!(state.user_models.is_empty());
    }

    #[test]
    fn test_statistics_fields() {
        let stats = ScalerStats {
            activity: 12.5,
            is_scaler: true,
            model_norm: 1.25,
        };
        let fields = stats.to_fields();
        let refs: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        assert_eq!(ScalerStats::from_fields(&refs).unwrap(), stats);
        assert!(EntityVotingStats::from_fields(&["1", "2"]).is_err());
    }
}
