//! Self-report questionnaire scoring.
//!
//! Produces the `quiz` feature: a weighted, normalized severity in [0, 1].

use serde::{Deserialize, Serialize};

/// Highest answer value on the 0-3 scale.
const MAX_ANSWER: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Mood,
    Stress,
    Sleep,
    Motivation,
    Social,
}

/// One questionnaire item. Answers use Never(0) .. Almost always(3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuestionnaireItem {
    pub id: &'static str,
    pub question: &'static str,
    pub category: QuestionCategory,
    pub weight: f64,
    /// Reverse-scored: 3 -> 0, 2 -> 1, ...
    pub reverse: bool,
}

const fn item(
    id: &'static str,
    question: &'static str,
    category: QuestionCategory,
    weight: f64,
    reverse: bool,
) -> QuestionnaireItem {
    QuestionnaireItem {
        id,
        question,
        category,
        weight,
        reverse,
    }
}

/// The fixed eight-item questionnaire.
pub const QUESTIONNAIRE_V1: [QuestionnaireItem; 8] = [
    item("q1", "How often have you felt unmotivated to do things you usually enjoy?", QuestionCategory::Motivation, 1.2, false),
    item("q2", "How often have you felt emotionally drained during the day?", QuestionCategory::Mood, 1.3, false),
    item("q3", "How often do you feel overwhelmed by your responsibilities?", QuestionCategory::Stress, 1.2, false),
    item("q4", "How often do you find it difficult to relax, even during free time?", QuestionCategory::Stress, 1.1, false),
    item("q5", "How often do you wake up feeling tired or unrested?", QuestionCategory::Sleep, 1.0, false),
    item("q6", "How often do you find it hard to focus on your studies or tasks?", QuestionCategory::Motivation, 1.1, false),
    item("q7", "How often do you feel disconnected from people around you?", QuestionCategory::Social, 1.0, false),
    item("q8", "How often do you feel confident handling everyday challenges?", QuestionCategory::Mood, 0.8, true),
];

/// A submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAnswer {
    pub id: String,
    pub value: f64,
}

/// Coarse band of the questionnaire score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionnaireBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireScore {
    /// Weighted severity in [0, 1], rounded to 4 decimals
    pub score: f64,
    pub band: QuestionnaireBand,
}

/// Score answers against a set of items.
///
/// Answers for unknown ids are ignored and values are clamped to 0-3.
/// With no scorable answers the score is 0.
#[must_use]
pub fn score_answers(answers: &[QuestionnaireAnswer], items: &[QuestionnaireItem]) -> QuestionnaireScore {
    let (weighted, total_weight) = answers
        .iter()
        .filter_map(|ans| {
            let item = items.iter().find(|q| q.id == ans.id)?;
            let value = if ans.value.is_finite() { ans.value } else { 0.0 };
            let clamped = value.clamp(0.0, MAX_ANSWER);
            let scored = if item.reverse { MAX_ANSWER - clamped } else { clamped };
            Some((item.weight * scored / MAX_ANSWER, item.weight))
        })
        .fold((0.0, 0.0), |(s, w), (ds, dw)| (s + ds, w + dw));

    let score = if total_weight > 0.0 {
        (weighted / total_weight * 10_000.0).round() / 10_000.0
    } else {
        0.0
    };

    let band = if score >= 0.67 {
        QuestionnaireBand::High
    } else if score >= 0.34 {
        QuestionnaireBand::Medium
    } else {
        QuestionnaireBand::Low
    };

    QuestionnaireScore { score, band }
}

/// Score answers against `QUESTIONNAIRE_V1`.
#[must_use]
pub fn score_questionnaire(answers: &[QuestionnaireAnswer]) -> QuestionnaireScore {
    score_answers(answers, &QUESTIONNAIRE_V1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(values: [f64; 8]) -> Vec<QuestionnaireAnswer> {
        QUESTIONNAIRE_V1
            .iter()
            .zip(values)
            .map(|(q, value)| QuestionnaireAnswer {
                id: q.id.to_string(),
                value,
            })
            .collect()
    }

    #[test]
    fn test_all_never_with_confident_reverse_item_scores_zero() {
        let result = score_questionnaire(&answers([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0]));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.band, QuestionnaireBand::Low);
    }

    #[test]
    fn test_maximum_severity_scores_one() {
        let result = score_questionnaire(&answers([3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 0.0]));
        assert!((result.score - 1.0).abs() < 1e-12);
        assert_eq!(result.band, QuestionnaireBand::High);
    }

    #[test]
    fn test_unknown_ids_ignored_and_values_clamped() {
        let input = vec![
            QuestionnaireAnswer {
                id: "q1".into(),
                value: 9.0,
            },
            QuestionnaireAnswer {
                id: "q99".into(),
                value: 0.0,
            },
        ];
        let result = score_questionnaire(&input);
        assert!((result.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_answers() {
        let result = score_questionnaire(&[]);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.band, QuestionnaireBand::Low);
    }

    #[test]
    fn test_medium_band() {
        let result = score_questionnaire(&answers([1.5; 8]));
        assert!((result.score - 0.5).abs() < 1e-12);
        assert_eq!(result.band, QuestionnaireBand::Medium);
    }
}
