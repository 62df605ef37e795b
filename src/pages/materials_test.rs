use super::*;
use crate::routes::Location;

fn material(id: &str, title: &str, subject: &str, teacher: &str, created_at: &str) -> Material {
    Material {
        id: id.to_owned(),
        title: title.to_owned(),
        subject: subject.to_owned(),
        teacher_name: teacher.to_owned(),
        created_at: created_at.to_owned(),
        ..Material::default()
    }
}

fn library() -> Vec<Material> {
    vec![
        material("m1", "Algebra Basics", "Mathematics", "Dr. Smith", "2025-01-10T00:00:00Z"),
        material("m2", "Newton's Laws", "Physics", "Prof. Wilson", "2025-01-12T00:00:00Z"),
        material("m3", "Calculus Notes", "Mathematics", "Dr. Smith", "2025-01-11T00:00:00Z"),
    ]
}

fn ids(materials: &[Material]) -> Vec<&str> {
    materials.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn file_sizes_are_human_readable() {
    assert_eq!(format_file_size(0), "0 B");
    assert_eq!(format_file_size(1023), "1023 B");
    assert_eq!(format_file_size(1024), "1.0 KB");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(2_516_582), "2.4 MB");
    assert_eq!(format_file_size(1024 * 1024 * 1024), "1.0 GB");
}

#[test]
fn subject_all_means_no_filter() {
    assert_eq!(MaterialQuery::from_location(&Location::parse("/materials?subject=All")).subject, None);
    assert_eq!(
        MaterialQuery::from_location(&Location::parse("/materials?subject=Physics")).subject.as_deref(),
        Some("Physics")
    );
}

#[test]
fn unfiltered_list_is_newest_first() {
    assert_eq!(ids(&filter_materials(&library(), &MaterialQuery::default())), vec!["m2", "m3", "m1"]);
}

#[test]
fn search_covers_title_teacher_and_subject() {
    let q = |s: &str| MaterialQuery { search: s.to_owned(), subject: None };
    assert_eq!(ids(&filter_materials(&library(), &q("algebra"))), vec!["m1"]);
    assert_eq!(ids(&filter_materials(&library(), &q("wilson"))), vec!["m2"]);
    assert_eq!(ids(&filter_materials(&library(), &q("MATHEMATICS"))), vec!["m3", "m1"]);
}

#[test]
fn subject_filter_is_case_insensitive() {
    let query = MaterialQuery { search: String::new(), subject: Some("physics".to_owned()) };
    assert_eq!(ids(&filter_materials(&library(), &query)), vec!["m2"]);
}

#[test]
fn subjects_are_distinct_and_sorted() {
    assert_eq!(subjects(&library()), vec!["Mathematics".to_owned(), "Physics".to_owned()]);
}

#[test]
fn render_shows_sizes_and_upload_hint_for_staff() {
    let mut m = material("m1", "Algebra Basics", "Mathematics", "Dr. Smith", "");
    m.file_name = "algebra.pdf".to_owned();
    m.file_size = 2048;
    let view = MaterialsView {
        query: MaterialQuery::default(),
        subjects: vec!["Mathematics".to_owned()],
        materials: vec![m],
        total: 1,
        can_upload: true,
    };
    let text = view.to_string();
    assert!(text.contains("algebra.pdf (2.0 KB)"));
    assert!(text.contains("materials upload"));
}
