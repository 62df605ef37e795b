use super::*;
use records::{AnswerKey, AssessmentQuestion, QuestionKind};
use serde_json::json;
use time::macros::date;

fn question(id: &str, kind: QuestionKind, key: AnswerKey, points: u32) -> AssessmentQuestion {
    AssessmentQuestion { id: id.to_owned(), kind, correct_answer: key, points, ..AssessmentQuestion::default() }
}

fn quiz() -> Assessment {
    Assessment {
        id: "a1".to_owned(),
        title: "Math Quiz".to_owned(),
        status: AssessmentStatus::Published,
        questions: vec![
            question("q1", QuestionKind::MultipleChoice, AnswerKey::Index(1), 5),
            question("q2", QuestionKind::TrueFalse, AnswerKey::Text("true".to_owned()), 2),
            question("q3", QuestionKind::ShortAnswer, AnswerKey::Text("Paris".to_owned()), 3),
        ],
        ..Assessment::default()
    }
}

fn answers(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
}

#[test]
fn all_correct_scores_full_marks() {
    let score = score_answers(&quiz(), &answers(&[("q1", json!(1)), ("q2", json!(true)), ("q3", json!("paris"))]));
    assert_eq!(score, Score { correct: 3, total: 3, percentage: 100, points: 10, max_points: 10 });
}

#[test]
fn percentage_rounds_to_nearest_whole() {
    let score = score_answers(&quiz(), &answers(&[("q1", json!(1)), ("q2", json!(false))]));
    assert_eq!(score.correct, 1);
    assert_eq!(score.percentage, 33);

    let score = score_answers(&quiz(), &answers(&[("q1", json!(1)), ("q2", json!(true))]));
    assert_eq!(score.percentage, 67);
    assert_eq!(score.points, 7);
}

#[test]
fn unanswered_questions_count_as_wrong() {
    let score = score_answers(&quiz(), &BTreeMap::new());
    assert_eq!(score.correct, 0);
    assert_eq!(score.percentage, 0);
}

#[test]
fn empty_assessment_scores_zero() {
    let score = score_answers(&Assessment::default(), &answers(&[("q1", json!(1))]));
    assert_eq!(score, Score::default());
}

#[test]
fn half_rounds_up() {
    assert_eq!(rounded_percentage(1, 2), 50);
    assert_eq!(rounded_percentage(1, 8), 13);
    assert_eq!(rounded_percentage(2, 3), 67);
}

#[test]
fn clock_formats_minutes_and_padded_seconds() {
    assert_eq!(format_clock(0), "0:00");
    assert_eq!(format_clock(65), "1:05");
    assert_eq!(format_clock(30 * 60), "30:00");
    assert_eq!(format_clock(3599), "59:59");
}

#[test]
fn open_requires_published_and_not_past_due() {
    let today = date!(2025 - 01 - 15);
    let mut a = quiz();
    a.due_date = "2025-01-15T23:59:00Z".to_owned();
    assert!(is_open(&a, today));

    a.due_date = "2025-01-14".to_owned();
    assert!(!is_open(&a, today));

    a.due_date = String::new();
    assert!(is_open(&a, today));

    a.status = AssessmentStatus::Draft;
    assert!(!is_open(&a, today));
}

#[test]
fn render_lists_time_limit_and_submit_hint() {
    let mut a = quiz();
    a.time_limit = 45;
    let view = AssessmentsView { assessments: vec![a], today: date!(2025 - 01 - 15), can_create: false, can_submit: true };
    let text = view.to_string();
    assert!(text.contains("1 total, 1 open"));
    assert!(text.contains("time limit 45:00"));
    assert!(text.contains("3 questions | 10 points"));
    assert!(text.contains("assessments submit"));
}
