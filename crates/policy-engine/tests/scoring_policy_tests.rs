use poolwatch_policy_engine::types::MinerAnswer;
use poolwatch_policy_engine::{
    EXACT_MATCH_V1, FLAT_AGREEMENT_V1, PolicySpec, ScoringPolicy, ScoringPolicyRegistry,
    bounded_score,
};
use std::sync::Arc;

fn answer(hash: &str) -> MinerAnswer {
    MinerAnswer {
        overall_hash: hash.to_owned(),
        data: Vec::new(),
    }
}

struct Overshoot;

impl ScoringPolicy for Overshoot {
    fn id(&self) -> &'static str {
        "overshoot.test"
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn spec(&self) -> PolicySpec {
        PolicySpec {
            policy_id: self.id().to_owned(),
            policy_version: self.version().to_owned(),
            description: "returns out-of-range scores".to_owned(),
            max_score: 3.0,
        }
    }

    fn score(&self, answer: Option<&MinerAnswer>, _accepted: &MinerAnswer) -> f64 {
        match answer {
            Some(_) => 3.0,
            None => -1.0,
        }
    }
}

#[test]
fn flat_agreement_scores_constant_or_zero() {
    let registry = ScoringPolicyRegistry::with_builtin();
    let policy = registry.require(FLAT_AGREEMENT_V1).expect("builtin policy");
    let accepted = answer("A");
    assert!((policy.score(Some(&answer("A")), &accepted) - 0.9).abs() < 1e-12);
    assert_eq!(policy.score(None, &accepted), 0.0);
}

#[test]
fn exact_match_requires_same_fingerprint() {
    let registry = ScoringPolicyRegistry::with_builtin();
    let policy = registry.require(EXACT_MATCH_V1).expect("builtin policy");
    let accepted = answer("A");
    assert_eq!(policy.score(Some(&answer("A")), &accepted), 1.0);
    assert_eq!(policy.score(Some(&answer("B")), &accepted), 0.0);
}

#[test]
fn registry_rejects_unknown_policy_and_accepts_custom_ones() {
    let mut registry = ScoringPolicyRegistry::with_builtin();
    assert!(registry.require("nope.v9").is_err());
    registry.register(Arc::new(Overshoot));
    assert_eq!(
        registry.ids(),
        vec![EXACT_MATCH_V1, FLAT_AGREEMENT_V1, "overshoot.test"]
    );
}

#[test]
fn bounded_score_clamps_into_unit_interval() {
    let accepted = answer("A");
    assert_eq!(bounded_score(&Overshoot, Some(&accepted), &accepted), 1.0);
    assert_eq!(bounded_score(&Overshoot, None, &accepted), 0.0);
}

#[test]
fn policy_hash_tracks_spec() {
    let registry = ScoringPolicyRegistry::with_builtin();
    let flat = registry.require(FLAT_AGREEMENT_V1).expect("flat");
    let exact = registry.require(EXACT_MATCH_V1).expect("exact");
    assert_eq!(flat.hash(), flat.hash());
    assert_ne!(flat.hash(), exact.hash());
    assert_eq!(flat.hash().len(), 64);
}
