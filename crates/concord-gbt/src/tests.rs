//! Integration tests for the preference learner

#[cfg(test)]
mod tests {
    use crate::{GbtConfig, GbtError, PreferenceLearner, Solver};
    use concord_domain::{CancelToken, Comparison, Comparisons, MadePublic, State, StateFunction, Users};

    fn comparison(value: f64, max: f64) -> Comparison {
        Comparison::new(value, max).unwrap()
    }

    fn state_of(rows: &[(&str, &str, &str, &str, f64)]) -> State {
        let mut comparisons = Comparisons::new();
        for (username, criterion, left, right, value) in rows {
            comparisons.add(username, criterion, left, right, comparison(*value, 10.0));
        }
        State::from_inputs(Users::new(), comparisons, MadePublic::all_public())
    }

    #[test]
    fn test_unanimous_preference_orders_every_user() {
        let state = state_of(&[
            ("u1", "importance", "a", "b", -8.0),
            ("u2", "importance", "a", "b", -3.0),
            ("u3", "importance", "b", "a", 6.0),
        ]);
        let learned = PreferenceLearner::new(GbtConfig::default()).apply(&state).unwrap();

        for username in ["u1", "u2", "u3"] {
            let model = learned.user_models.get(username).unwrap();
            let a = model.direct("a", "importance").unwrap();
            let b = model.direct("b", "importance").unwrap();
            assert!(a.value > b.value, "{}: {} <= {}", username, a.value, b.value);
        }
    }

    #[test]
    fn test_uncompared_entity_is_absent() {
        let state = state_of(&[
            ("u1", "importance", "a", "b", -4.0),
            ("u2", "importance", "b", "c", 2.0),
        ]);
        let learned = PreferenceLearner::new(GbtConfig::default()).apply(&state).unwrap();

        let u1 = learned.user_models.get("u1").unwrap();
        assert!(u1.direct("c", "importance").is_none());
        assert_eq!(u1.scored_entities("importance").len(), 2);
    }

    #[test]
    fn test_tie_cycle_is_centred_and_symmetric() {
        let config = GbtConfig::default();
        let state = state_of(&[
            ("u1", "importance", "a", "b", 0.0),
            ("u1", "importance", "b", "c", 0.0),
            ("u1", "importance", "c", "a", 0.0),
        ]);
        let learned = PreferenceLearner::new(config.clone()).apply(&state).unwrap();
        let model = learned.user_models.get("u1").unwrap();

        let scores: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|e| model.direct(e, "importance").unwrap())
            .collect();
        for score in &scores {
            assert!(score.value.abs() < config.convergence_error);
            assert!(score.left_unc.is_finite() && score.left_unc < config.max_uncertainty);
            assert!((score.left_unc - score.right_unc).abs() < 1e-4);
            assert!((score.left_unc - scores[0].left_unc).abs() < 1e-4);
        }
    }

    #[test]
    fn test_criteria_are_learned_independently() {
        let state = state_of(&[
            ("u1", "importance", "a", "b", -9.0),
            ("u1", "clarity", "a", "b", 9.0),
        ]);
        let learned = PreferenceLearner::new(GbtConfig::default()).apply(&state).unwrap();
        let model = learned.user_models.get("u1").unwrap();

        assert!(model.direct("a", "importance").unwrap().value > 0.0);
        assert!(model.direct("a", "clarity").unwrap().value < 0.0);
    }

    #[test]
    fn test_lbfgs_matches_coordinate_descent() {
        let rows = [
            ("u1", "importance", "a", "b", -3.0),
            ("u1", "importance", "b", "c", -7.0),
            ("u1", "importance", "c", "d", 2.0),
            ("u1", "importance", "a", "d", -10.0),
        ];
        let state = state_of(&rows);
        let mut exact = GbtConfig::strict();
        exact.solver = Solver::CoordinateDescent;
        let mut quasi_newton = GbtConfig::strict();
        quasi_newton.solver = Solver::Lbfgs;

        let a = PreferenceLearner::new(exact).apply(&state).unwrap();
        let b = PreferenceLearner::new(quasi_newton).apply(&state).unwrap();
        let ma = a.user_models.get("u1").unwrap();
        let mb = b.user_models.get("u1").unwrap();
        for entity in ["a", "b", "c", "d"] {
            let sa = ma.direct(entity, "importance").unwrap();
            let sb = mb.direct(entity, "importance").unwrap();
            assert!((sa.value - sb.value).abs() < 1e-4, "{}: {} vs {}", entity, sa.value, sb.value);
        }
    }

    #[test]
    fn test_non_convergence_names_the_slice() {
        let state = state_of(&[
            ("u1", "importance", "a", "b", -3.0),
            ("u1", "importance", "b", "c", -6.0),
        ]);
        let config = GbtConfig {
            convergence_error: 1e-12,
            max_iter: 1,
            ..GbtConfig::default()
        };
        let err = PreferenceLearner::new(config).apply(&state).unwrap_err();
        assert_eq!(
            err,
            GbtError::NonConvergence {
                username: "u1".to_string(),
                criterion: "importance".to_string(),
                iterations: 1,
            }
        );
        assert!(err.to_string().contains("u1"));
    }

    #[test]
    fn test_cancelled_run_discards_output() {
        let state = state_of(&[("u1", "importance", "a", "b", -3.0)]);
        let token = CancelToken::new();
        token.cancel();
        let learner = PreferenceLearner::new(GbtConfig::default()).with_cancel_token(token);
        assert_eq!(learner.apply(&state).unwrap_err(), GbtError::Cancelled);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let state = state_of(&[("u1", "importance", "a", "b", -3.0)]);
        let config = GbtConfig {
            prior_std_dev: 0.0,
            ..GbtConfig::default()
        };
        assert!(matches!(
            PreferenceLearner::new(config).apply(&state),
            Err(GbtError::Config(_))
        ));
    }

    #[test]
    fn test_same_seed_same_scores() {
        let state = state_of(&[
            ("u1", "importance", "a", "b", -3.0),
            ("u1", "importance", "b", "c", -6.0),
            ("u1", "importance", "c", "a", 1.0),
        ]);
        let first = PreferenceLearner::new(GbtConfig::default())
            .with_seed(7)
            .apply(&state)
            .unwrap();
        let second = PreferenceLearner::new(GbtConfig::default())
            .with_seed(7)
            .apply(&state)
            .unwrap();
        assert_eq!(first.user_models, second.user_models);
    }

    #[test]
    fn test_inputs_are_untouched() {
        let state = state_of(&[("u1", "importance", "a", "b", -3.0)]);
        let before = state.clone();
        let _ = PreferenceLearner::new(GbtConfig::default()).apply(&state).unwrap();
        assert_eq!(state.comparisons.len(), before.comparisons.len());
        assert!(state.user_models.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use crate::{GbtConfig, PreferenceLearner};
    use concord_domain::{Comparison, Comparisons, MadePublic, State, StateFunction, Users};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_sign_preservation(values in prop::collection::vec(1u8..=10, 1..6), seed in any::<u64>()) {
            let mut comparisons = Comparisons::new();
            for (i, value) in values.iter().enumerate() {
                let username = format!("u{}", i);
                comparisons.add(&username, "importance", "a", "b", Comparison::new(-f64::from(*value), 10.0).unwrap());
            }
            let state = State::from_inputs(Users::new(), comparisons, MadePublic::all_public());
            let learned = PreferenceLearner::new(GbtConfig::default()).with_seed(seed).apply(&state).unwrap();

            for (_, model) in learned.user_models.iter() {
                let a = model.direct("a", "importance").unwrap();
                let b = model.direct("b", "importance").unwrap();
                prop_assert!(a.value > b.value);
                prop_assert!(a.left_unc >= 0.0 && a.right_unc >= 0.0);
            }
        }
    }
}
