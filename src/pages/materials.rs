//! Material library: search, subject filter and file sizes.

use std::collections::BTreeSet;
use std::fmt;

use records::{Material, MaterialFilter};

use super::{LoadContext, contains_ci, heading};
use crate::net::http::ApiError;
use crate::net::identity::can_upload_materials;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialQuery {
    pub search: String,
    /// `None` means every subject.
    pub subject: Option<String>,
}

impl MaterialQuery {
    /// Read `search` and `subject`; `subject=All` shows every subject.
    #[must_use]
    pub fn from_location(location: &crate::routes::Location) -> Self {
        Self {
            search: location.param("search").unwrap_or_default().trim().to_owned(),
            subject: location
                .param("subject")
                .map(str::trim)
                .filter(|s| !s.eq_ignore_ascii_case("all"))
                .map(str::to_owned),
        }
    }
}

/// Materials matching `query`, newest first.
#[must_use]
pub fn filter_materials(materials: &[Material], query: &MaterialQuery) -> Vec<Material> {
    let mut matched: Vec<Material> = materials
        .iter()
        .filter(|m| {
            contains_ci(&m.title, &query.search)
                || contains_ci(&m.description, &query.search)
                || contains_ci(&m.teacher_name, &query.search)
                || contains_ci(&m.subject, &query.search)
        })
        .filter(|m| query.subject.as_deref().is_none_or(|s| m.subject.eq_ignore_ascii_case(s)))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matched
}

/// Distinct subjects, sorted, for the filter list.
#[must_use]
pub fn subjects(materials: &[Material]) -> Vec<String> {
    materials
        .iter()
        .map(|m| m.subject.trim())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Human-readable size: `512 B`, `1.5 KB`, `2.4 MB`, `1.0 GB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialsView {
    pub query: MaterialQuery,
    pub subjects: Vec<String>,
    pub materials: Vec<Material>,
    pub total: usize,
    pub can_upload: bool,
}

pub async fn load(cx: &LoadContext) -> Result<MaterialsView, ApiError> {
    let page = cx
        .platform
        .materials(&cx.token, &MaterialFilter::default())
        .await?;
    let query = MaterialQuery::from_location(&cx.location);

    Ok(MaterialsView {
        subjects: subjects(&page.data),
        materials: filter_materials(&page.data, &query),
        total: page.data.len(),
        query,
        can_upload: can_upload_materials(Some(&cx.user)),
    })
}

impl fmt::Display for MaterialsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Materials")?;
        writeln!(
            f,
            "Showing {} of {} (subject: {})",
            self.materials.len(),
            self.total,
            self.query.subject.as_deref().unwrap_or("All")
        )?;
        if !self.subjects.is_empty() {
            writeln!(f, "Subjects: All, {}", self.subjects.join(", "))?;
        }
        writeln!(f)?;

        if self.materials.is_empty() {
            writeln!(f, "No materials found.")?;
            writeln!(f, "Try adjusting your search or filter criteria.")?;
        }
        for m in &self.materials {
            writeln!(f, "{} [{}]", m.title, m.subject)?;
            if !m.description.is_empty() {
                writeln!(f, "    {}", m.description)?;
            }
            writeln!(
                f,
                "    {} ({}) | by {} | {} downloads | id {}",
                m.file_name,
                format_file_size(m.file_size),
                m.teacher_name,
                m.download_count,
                m.id
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Download: eduportal materials download <MATERIAL ID>")?;
        if self.can_upload {
            writeln!(f, "Upload: eduportal materials upload <FILE> --title <TITLE> --class <CLASS ID> --subject <SUBJECT>")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "materials_test.rs"]
mod tests;
