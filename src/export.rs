use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::SurveyError;
use crate::models::{AnswerRow, QuestionColumn, RespondentType};

pub const FIXED_COLUMNS: [&str; 3] = ["ID Pengisian", "Tanggal Submit", "Nama Surveyor"];
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SHEET_NAME_LIMIT: usize = 31;
pub const CELL_TEXT_LIMIT: usize = 32_767;

const FALLBACK_SHEET_NAME: &str = "Responden";
const COLUMN_WIDTH: f64 = 25.0;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct PivotRow {
    pub submission_id: i64,
    pub submitted_at: DateTime<Utc>,
    pub surveyor_name: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PivotSheet {
    pub name: String,
    pub respondent_type: RespondentType,
    pub questions: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl PivotSheet {
    pub fn headers(&self) -> Vec<&str> {
        FIXED_COLUMNS
            .iter()
            .copied()
            .chain(self.questions.iter().map(String::as_str))
            .collect()
    }
}

pub fn export_file_name(event_id: i64) -> String {
    format!("hasil_survei_event_{event_id}.xlsx")
}

pub fn question_order(columns: &[QuestionColumn]) -> BTreeMap<RespondentType, Vec<String>> {
    let mut grouped: BTreeMap<RespondentType, Vec<&QuestionColumn>> = BTreeMap::new();
    for column in columns {
        grouped
            .entry(column.respondent_type.clone())
            .or_default()
            .push(column);
    }

    grouped
        .into_iter()
        .map(|(respondent_type, mut columns)| {
            columns.sort_by_key(|column| column.position);
            let mut seen: HashSet<&str> = HashSet::new();
            let mut questions = Vec::with_capacity(columns.len());
            for column in columns {
                if seen.insert(column.question_text.as_str()) {
                    questions.push(column.question_text.clone());
                }
            }
            (respondent_type, questions)
        })
        .collect()
}

pub fn sheet_name(label: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '[' | ']' => '_',
            other => other,
        })
        .collect();
    let truncated = truncate_chars(&cleaned, SHEET_NAME_LIMIT);
    let trimmed = trim_sheet_name(&truncated);
    let base = if trimmed.is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        trimmed.to_string()
    };

    let mut candidate = base.clone();
    let mut counter = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({counter})");
        counter += 1;
        let prefix_len = SHEET_NAME_LIMIT.saturating_sub(suffix.chars().count());
        let prefix = truncate_chars(&base, prefix_len);
        candidate = format!("{}{}", trim_sheet_name(&prefix), suffix);
    }
    used.insert(candidate.to_lowercase());
    candidate
}

// Excel rejects names that start or end with an apostrophe.
fn trim_sheet_name(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\'')
}

fn truncate_chars(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}

fn cell_text(value: &str, submission_id: Option<i64>) -> Cow<'_, str> {
    match value.char_indices().nth(CELL_TEXT_LIMIT) {
        Some((cut, _)) => {
            tracing::warn!(
                submission_id,
                length = value.chars().count(),
                "cell text truncated to {CELL_TEXT_LIMIT} characters"
            );
            Cow::Borrowed(&value[..cut])
        }
        None => Cow::Borrowed(value),
    }
}

fn column_index(sheet: &str, idx: usize) -> Result<u16, SurveyError> {
    u16::try_from(idx).map_err(|_| SurveyError::SheetTooLarge(sheet.to_string()))
}

fn row_index(sheet: &str, idx: usize) -> Result<u32, SurveyError> {
    idx.checked_add(1)
        .and_then(|line| u32::try_from(line).ok())
        .ok_or_else(|| SurveyError::SheetTooLarge(sheet.to_string()))
}

pub fn build_sheets(
    event_id: i64,
    rows: &[AnswerRow],
    columns: &[QuestionColumn],
) -> Result<Vec<PivotSheet>, SurveyError> {
    if rows.is_empty() {
        return Err(SurveyError::NoExportData { event_id });
    }

    let mut order = question_order(columns);
    let mut by_type: BTreeMap<RespondentType, Vec<&AnswerRow>> = BTreeMap::new();
    for row in rows {
        by_type.entry(row.respondent_type.clone()).or_default().push(row);
    }

    let mut used_names = HashSet::new();
    let mut sheets = Vec::with_capacity(by_type.len());

    for (respondent_type, type_rows) in by_type {
        let questions = order.remove(&respondent_type).unwrap_or_default();
        let index: HashMap<&str, usize> = questions
            .iter()
            .enumerate()
            .map(|(idx, question)| (question.as_str(), idx))
            .collect();

        let mut pivot: BTreeMap<i64, PivotRow> = BTreeMap::new();
        let mut dropped = 0usize;

        for row in type_rows {
            let entry = pivot.entry(row.submission_id).or_insert_with(|| PivotRow {
                submission_id: row.submission_id,
                submitted_at: row.submitted_at,
                surveyor_name: row.surveyor_name.clone(),
                answers: vec![String::new(); questions.len()],
            });

            match index.get(row.question_text.as_str()) {
                Some(&column) => entry.answers[column] = row.answer_value.clone(),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!(
                respondent_type = %respondent_type,
                dropped,
                "answers without a matching question column were skipped"
            );
        }

        sheets.push(PivotSheet {
            name: sheet_name(respondent_type.as_str(), &mut used_names),
            respondent_type,
            questions,
            rows: pivot.into_values().collect(),
        });
    }

    Ok(sheets)
}

pub fn render_workbook(sheets: &[PivotSheet]) -> Result<Vec<u8>, SurveyError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (idx, title) in sheet.headers().into_iter().enumerate() {
            let col = column_index(&sheet.name, idx)?;
            worksheet.write_string_with_format(0, col, cell_text(title, None), &header_format)?;
            worksheet.set_column_width(col, COLUMN_WIDTH)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        for (idx, row) in sheet.rows.iter().enumerate() {
            let line = row_index(&sheet.name, idx)?;
            let submission = Some(row.submission_id);
            worksheet.write_number(line, 0, row.submission_id as f64)?;
            worksheet.write_string(line, 1, row.submitted_at.format(TIMESTAMP_FORMAT).to_string())?;
            worksheet.write_string(line, 2, cell_text(&row.surveyor_name, submission))?;

            for (offset, value) in row.answers.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let col = column_index(&sheet.name, FIXED_COLUMNS.len() + offset)?;
                worksheet.write_string(line, col, cell_text(value, submission))?;
            }
        }

        tracing::info!(
            sheet = %sheet.name,
            respondent_type = %sheet.respondent_type,
            rows = sheet.rows.len(),
            "wrote sheet"
        );
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn export_workbook(
    event_id: i64,
    rows: &[AnswerRow],
    columns: &[QuestionColumn],
) -> Result<Vec<u8>, SurveyError> {
    let sheets = build_sheets(event_id, rows, columns)?;
    render_workbook(&sheets)
}
