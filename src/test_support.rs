use chrono::{TimeZone, Utc};

use crate::error::SurveyError;
use crate::models::{AnswerKind, AnswerRow, QuestionColumn, RespondentType};
use crate::source::RowSource;

pub fn answer(
    submission_id: i64,
    respondent_type: &str,
    question_text: &str,
    answer_kind: AnswerKind,
    answer_value: &str,
) -> AnswerRow {
    AnswerRow {
        submission_id,
        submitted_at: Utc
            .with_ymd_and_hms(2025, 8, 17, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
        surveyor_name: "Sari Wulandari".to_string(),
        respondent_type: RespondentType::new(respondent_type),
        question_text: question_text.to_string(),
        question_position: 0,
        answer_kind,
        answer_value: answer_value.to_string(),
    }
}

pub fn column(respondent_type: &str, question_text: &str, position: i32) -> QuestionColumn {
    QuestionColumn {
        respondent_type: RespondentType::new(respondent_type),
        question_text: question_text.to_string(),
        position,
    }
}

pub fn vendor_scenario_rows() -> Vec<AnswerRow> {
    let mut rows = vec![
        answer(1, "Vendor", "Business type", AnswerKind::Text, "Food"),
        answer(1, "Vendor", "Revenue", AnswerKind::Currency, "500000"),
        answer(2, "Vendor", "Business type", AnswerKind::Text, "Food"),
        answer(2, "Vendor", "Revenue", AnswerKind::Currency, "abc"),
    ];
    for row in rows.iter_mut() {
        row.question_position = if row.question_text == "Business type" { 1 } else { 2 };
    }
    rows
}

pub fn vendor_scenario_columns() -> Vec<QuestionColumn> {
    vec![
        column("Vendor", "Business type", 1),
        column("Vendor", "Revenue", 2),
    ]
}

pub struct MemoryRowSource {
    pub event_id: i64,
    pub rows: Vec<AnswerRow>,
    pub columns: Vec<QuestionColumn>,
}

#[async_trait::async_trait]
impl RowSource for MemoryRowSource {
    async fn answer_rows(&self, event_id: i64) -> Result<Vec<AnswerRow>, SurveyError> {
        if event_id == self.event_id {
            Ok(self.rows.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn question_columns(&self, event_id: i64) -> Result<Vec<QuestionColumn>, SurveyError> {
        if event_id == self.event_id {
            Ok(self.columns.clone())
        } else {
            Ok(Vec::new())
        }
    }
}

pub struct FailingRowSource;

#[async_trait::async_trait]
impl RowSource for FailingRowSource {
    async fn answer_rows(&self, _event_id: i64) -> Result<Vec<AnswerRow>, SurveyError> {
        Err(SurveyError::Source("connection refused".to_string()))
    }

    async fn question_columns(&self, _event_id: i64) -> Result<Vec<QuestionColumn>, SurveyError> {
        Err(SurveyError::Source("connection refused".to_string()))
    }
}
