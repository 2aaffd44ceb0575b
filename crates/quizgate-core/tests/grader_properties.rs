//! Property tests for the grader.

use proptest::prelude::*;
use quizgate_core::{grade, AnswerKey, Answers, Level};

fn option() -> impl Strategy<Value = String> {
    prop_oneof![Just("A"), Just("B"), Just("C"), Just("D")].prop_map(String::from)
}

fn answers() -> impl Strategy<Value = Answers> {
    prop::collection::btree_map("q[0-9]{1,2}", option(), 0..12)
}

fn key() -> impl Strategy<Value = AnswerKey> {
    prop::collection::btree_map("q[0-9]{1,2}", option(), 0..12).prop_map(AnswerKey::new)
}

proptest! {
    #[test]
    fn score_is_bounded_by_key_size(a in answers(), k in key()) {
        let g = grade(&a, &k);
        prop_assert!(g.score <= k.len());
        prop_assert_eq!(g.out_of, k.len());
    }

    #[test]
    fn grading_is_deterministic(a in answers(), k in key()) {
        prop_assert_eq!(grade(&a, &k), grade(&a, &k));
    }

    #[test]
    fn level_follows_thirds(a in answers()) {
        let k = AnswerKey::default();
        let g = grade(&a, &k);
        let expected = match g.score {
            0..=2 => Level::Beginner,
            3..=4 => Level::Intermediate,
            _ => Level::Advanced,
        };
        prop_assert_eq!(g.level, expected);
    }

    #[test]
    fn copying_the_key_scores_full_marks(k in key()) {
        let a: Answers = k.iter().map(|(q, o)| (q.to_string(), o.to_string())).collect();
        prop_assert_eq!(grade(&a, &k).score, k.len());
    }
}
