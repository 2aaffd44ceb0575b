//! Multiple-choice grading.
//!
//! Pure functions only: the same answers against the same key always give
//! the same [`Grade`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw answers as collected from the form: question id -> chosen option.
pub type Answers = BTreeMap<String, String>;

/// Question id -> correct option. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(BTreeMap<String, String>);

impl AnswerKey {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.0.get(question).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }
}

impl Default for AnswerKey {
    fn default() -> Self {
        [
            ("q1", "B"),
            ("q2", "C"),
            ("q3", "B"),
            ("q4", "B"),
            ("q5", "B"),
            ("q6", "C"),
        ]
        .into_iter()
        .collect()
    }
}

impl<Q: Into<String>, A: Into<String>> FromIterator<(Q, A)> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = (Q, A)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(q, a)| (q.into(), a.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    /// Bands are thirds of the key: up to 1/3 correct is Beginner, up to
    /// 2/3 Intermediate, anything above Advanced. For a six-question key
    /// this is 0-2 / 3-4 / 5-6.
    pub fn from_score(score: usize, key_size: usize) -> Self {
        if score * 3 <= key_size {
            Level::Beginner
        } else if score * 3 <= key_size * 2 {
            Level::Intermediate
        } else {
            Level::Advanced
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub score: usize,
    pub out_of: usize,
    pub level: Level,
}

/// Count the key's questions answered correctly.
///
/// Missing answers count as wrong; answers to questions not in the key
/// are ignored.
pub fn grade(answers: &Answers, key: &AnswerKey) -> Grade {
    let score = key
        .iter()
        .filter(|(question, correct)| answers.get(*question).map(String::as_str) == Some(*correct))
        .count();
    Grade {
        score,
        out_of: key.len(),
        level: Level::from_score(score, key.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }

    #[test]
    fn all_correct_is_advanced() {
        let a = answers(&[
            ("q1", "B"),
            ("q2", "C"),
            ("q3", "B"),
            ("q4", "B"),
            ("q5", "B"),
            ("q6", "C"),
        ]);
        let g = grade(&a, &AnswerKey::default());
        assert_eq!(g.score, 6);
        assert_eq!(g.out_of, 6);
        assert_eq!(g.level, Level::Advanced);
    }

    #[test]
    fn empty_answers_is_beginner() {
        let g = grade(&Answers::new(), &AnswerKey::default());
        assert_eq!(g.score, 0);
        assert_eq!(g.level, Level::Beginner);
    }

    #[test]
    fn three_correct_is_intermediate() {
        let a = answers(&[("q1", "B"), ("q2", "C"), ("q3", "B"), ("q4", "A")]);
        let g = grade(&a, &AnswerKey::default());
        assert_eq!(g.score, 3);
        assert_eq!(g.level, Level::Intermediate);
    }

    #[test]
    fn extra_questions_are_ignored() {
        let a = answers(&[("q1", "B"), ("essay", "hello"), ("q99", "B")]);
        assert_eq!(grade(&a, &AnswerKey::default()).score, 1);
    }

    #[test]
    fn six_question_thresholds_match_fixed_bands() {
        let expected = [
            Level::Beginner,
            Level::Beginner,
            Level::Beginner,
            Level::Intermediate,
            Level::Intermediate,
            Level::Advanced,
            Level::Advanced,
        ];
        for (score, level) in expected.iter().enumerate() {
            assert_eq!(Level::from_score(score, 6), *level, "score {score}");
        }
    }

    #[test]
    fn empty_key_grades_as_beginner() {
        let g = grade(&answers(&[("q1", "B")]), &AnswerKey::new(BTreeMap::new()));
        assert_eq!(g.score, 0);
        assert_eq!(g.out_of, 0);
        assert_eq!(g.level, Level::Beginner);
    }

    #[test]
    fn level_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Level::Intermediate).unwrap(),
            "\"Intermediate\""
        );
    }
}
