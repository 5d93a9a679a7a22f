use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

/// One weekly progress entry. All content columns are text; the form
/// leaves unused ones empty rather than null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_class: String,
    #[serde(default)]
    pub student_level: String,
    #[serde(default)]
    pub halaqoh_name: String,
    #[serde(default)]
    pub teacher_name: String,
    #[serde(default)]
    pub juz: String,
    #[serde(default)]
    pub surah: String,
    #[serde(default)]
    pub verses: String,
    #[serde(default)]
    pub amount_memorized: String,
    #[serde(default)]
    pub tasmi: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub pages: String,
    #[serde(default)]
    pub lines: String,
    #[serde(default)]
    pub teacher_notes: String,
    #[serde(default)]
    pub parent_sign: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Report content as submitted by the admin forms. Everything is
/// optional on the wire; normalization fills the gaps.
#[derive(Debug, Default, Deserialize)]
pub struct ReportFieldsPayload {
    pub student_name: Option<String>,
    pub student_class: Option<String>,
    pub student_level: Option<String>,
    pub halaqoh_name: Option<String>,
    pub teacher_name: Option<String>,
    pub juz: Option<String>,
    pub surah: Option<String>,
    pub verses: Option<String>,
    pub amount_memorized: Option<String>,
    pub tasmi: Option<String>,
    pub module: Option<String>,
    pub chapter: Option<String>,
    pub pages: Option<String>,
    pub lines: Option<String>,
    pub teacher_notes: Option<String>,
    /// Report date, not record-creation time; the form may backdate it.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Normalized content columns, used for both insert and the
/// full-overwrite edit.
#[derive(Debug, Clone, Serialize)]
pub struct ReportContent {
    pub student_name: String,
    pub student_class: String,
    pub student_level: String,
    pub halaqoh_name: String,
    pub teacher_name: String,
    pub juz: String,
    pub surah: String,
    pub verses: String,
    pub amount_memorized: String,
    pub tasmi: String,
    pub module: String,
    pub chapter: String,
    pub pages: String,
    pub lines: String,
    pub teacher_notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ReportFieldsPayload {
    /// Omitted fields become empty strings; an omitted date becomes
    /// `fallback` (the caller passes now).
    pub fn normalize(self, fallback: OffsetDateTime) -> ReportContent {
        ReportContent {
            student_name: self.student_name.unwrap_or_default(),
            student_class: self.student_class.unwrap_or_default(),
            student_level: self.student_level.unwrap_or_default(),
            halaqoh_name: self.halaqoh_name.unwrap_or_default(),
            teacher_name: self.teacher_name.unwrap_or_default(),
            juz: self.juz.unwrap_or_default(),
            surah: self.surah.unwrap_or_default(),
            verses: self.verses.unwrap_or_default(),
            amount_memorized: self.amount_memorized.unwrap_or_default(),
            tasmi: self.tasmi.unwrap_or_default(),
            module: self.module.unwrap_or_default(),
            chapter: self.chapter.unwrap_or_default(),
            pages: self.pages.unwrap_or_default(),
            lines: self.lines.unwrap_or_default(),
            teacher_notes: self.teacher_notes.unwrap_or_default(),
            created_at: self.created_at.unwrap_or(fallback),
        }
    }
}

/// Row shape for the insert. Ownership columns plus normalized content;
/// reports start unsigned.
#[derive(Debug, Serialize)]
pub struct NewReport {
    pub user_id: Uuid,
    pub user_email: String,
    #[serde(flatten)]
    pub content: ReportContent,
    pub parent_sign: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddReportPayload {
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    #[serde(flatten)]
    pub fields: ReportFieldsPayload,
}

impl AddReportPayload {
    pub fn into_new_report(self, now: OffsetDateTime) -> Result<NewReport, ApiError> {
        let user_id = self
            .user_id
            .ok_or_else(|| ApiError::Validation("Required fields are missing".into()))?;
        let user_email = required_text(self.user_email)?;
        if self.fields.student_name.as_deref().unwrap_or("").trim().is_empty() {
            return Err(ApiError::Validation("Required fields are missing".into()));
        }
        Ok(NewReport {
            user_id,
            user_email,
            content: self.fields.normalize(now),
            parent_sign: false,
        })
    }
}

fn required_text(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Required fields are missing".into()))
}
