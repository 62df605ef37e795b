use super::*;
use crate::routes::Location;

fn class(id: &str, title: &str, teacher: &str, date: &str, start: &str, status: ClassStatus) -> Class {
    Class {
        id: id.to_owned(),
        title: title.to_owned(),
        teacher_name: teacher.to_owned(),
        date: date.to_owned(),
        start_time: start.to_owned(),
        status,
        ..Class::default()
    }
}

fn catalog() -> Vec<Class> {
    vec![
        class("c3", "Physics Lab", "Prof. Wilson", "2025-01-16", "14:00", ClassStatus::Scheduled),
        class("c1", "Mathematics 101", "Dr. Smith", "2025-01-15", "10:00", ClassStatus::Live),
        class("c2", "Chemistry", "Dr. Brown", "2025-01-15", "09:00", ClassStatus::Completed),
    ]
}

fn ids(classes: &[Class]) -> Vec<&str> {
    classes.iter().map(|c| c.id.as_str()).collect()
}

#[test]
fn query_reads_search_and_status() {
    let query = ClassQuery::from_location(&Location::parse("/classes?search=%20smith%20&status=LIVE"));
    assert_eq!(query, ClassQuery { search: "smith".to_owned(), status: Some(ClassStatus::Live) });
}

#[test]
fn status_all_or_unknown_shows_everything() {
    assert_eq!(ClassQuery::from_location(&Location::parse("/classes?status=all")).status, None);
    assert_eq!(ClassQuery::from_location(&Location::parse("/classes?status=bogus")).status, None);
    assert_eq!(
        ClassQuery::from_location(&Location::parse("/classes?status=upcoming")).status,
        Some(ClassStatus::Scheduled)
    );
}

#[test]
fn unfiltered_list_is_in_schedule_order() {
    let all = filter_classes(&catalog(), &ClassQuery::default());
    assert_eq!(ids(&all), vec!["c2", "c1", "c3"]);
}

#[test]
fn search_matches_title_or_teacher_case_insensitively() {
    let by_title = filter_classes(&catalog(), &ClassQuery { search: "physics".to_owned(), status: None });
    assert_eq!(ids(&by_title), vec!["c3"]);

    let by_teacher = filter_classes(&catalog(), &ClassQuery { search: "SMITH".to_owned(), status: None });
    assert_eq!(ids(&by_teacher), vec!["c1"]);
}

#[test]
fn status_filter_combines_with_search() {
    let query = ClassQuery { search: "dr.".to_owned(), status: Some(ClassStatus::Completed) };
    assert_eq!(ids(&filter_classes(&catalog(), &query)), vec!["c2"]);
}

#[test]
fn empty_result_renders_hint() {
    let view = ClassesView {
        query: ClassQuery { search: "nothing".to_owned(), status: None },
        classes: Vec::new(),
        total: 3,
        can_create: false,
        can_enroll: true,
    };
    let text = view.to_string();
    assert!(text.contains("Showing 0 of 3"));
    assert!(text.contains("No classes found."));
    assert!(text.contains("classes enroll"));
    assert!(!text.contains("classes create"));
}
