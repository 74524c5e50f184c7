use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SurveyError;
use crate::models::{AnswerKind, AnswerRow, QuestionColumn, RespondentType};
use crate::source::RowSource;

#[derive(Deserialize)]
struct CsvAnswer {
    event_id: i64,
    submission_id: i64,
    submitted_at: DateTime<Utc>,
    surveyor_name: String,
    respondent_type: String,
    question_text: String,
    #[serde(default)]
    position: i32,
    answer_kind: AnswerKind,
    #[serde(default)]
    answer_value: String,
}

#[derive(Deserialize)]
struct CsvQuestion {
    event_id: i64,
    respondent_type: String,
    question_text: String,
    #[serde(default)]
    position: i32,
}

// Answers CSV: event_id,submission_id,submitted_at,surveyor_name,respondent_type,
// question_text,position,answer_kind,answer_value. Questions CSV: event_id,
// respondent_type,question_text,position. Without a questions file the columns
// come from the answers.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    answers: PathBuf,
    questions: Option<PathBuf>,
}

impl CsvRowSource {
    pub fn new(answers: impl Into<PathBuf>, questions: Option<PathBuf>) -> Self {
        Self {
            answers: answers.into(),
            questions,
        }
    }

    fn read_answers(path: &Path, event_id: i64) -> Result<Vec<AnswerRow>, SurveyError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| SurveyError::Source(format!("{}: {err}", path.display())))?;
        let mut rows = Vec::new();

        for result in reader.deserialize::<CsvAnswer>() {
            let record = result?;
            if record.event_id != event_id {
                continue;
            }
            rows.push(AnswerRow {
                submission_id: record.submission_id,
                submitted_at: record.submitted_at,
                surveyor_name: record.surveyor_name,
                respondent_type: RespondentType::new(record.respondent_type),
                question_text: record.question_text,
                question_position: record.position,
                answer_kind: record.answer_kind,
                answer_value: record.answer_value,
            });
        }

        Ok(rows)
    }

    fn read_questions(path: &Path, event_id: i64) -> Result<Vec<QuestionColumn>, SurveyError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| SurveyError::Source(format!("{}: {err}", path.display())))?;
        let mut columns = Vec::new();

        for result in reader.deserialize::<CsvQuestion>() {
            let record = result?;
            if record.event_id != event_id {
                continue;
            }
            columns.push(QuestionColumn {
                respondent_type: RespondentType::new(record.respondent_type),
                question_text: record.question_text,
                position: record.position,
            });
        }

        Ok(columns)
    }
}

#[async_trait]
impl RowSource for CsvRowSource {
    async fn answer_rows(&self, event_id: i64) -> Result<Vec<AnswerRow>, SurveyError> {
        Self::read_answers(&self.answers, event_id)
    }

    async fn question_columns(&self, event_id: i64) -> Result<Vec<QuestionColumn>, SurveyError> {
        match &self.questions {
            Some(path) => Self::read_questions(path, event_id),
            None => {
                let columns = Self::read_answers(&self.answers, event_id)?
                    .into_iter()
                    .map(|row| QuestionColumn {
                        respondent_type: row.respondent_type,
                        question_text: row.question_text,
                        position: row.question_position,
                    })
                    .collect();
                Ok(columns)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ANSWERS: &str = "\
event_id,submission_id,submitted_at,surveyor_name,respondent_type,question_text,position,answer_kind,answer_value
1,10,2025-08-17T09:30:00Z,Sari,Vendor,Business type,1,teks,Food
1,10,2025-08-17T09:30:00Z,Sari,Vendor,Revenue,2,nominal,500000
1,11,2025-08-17T10:00:00Z,Budi,Vendor,Revenue,2,nominal,
2,12,2025-08-18T08:00:00Z,Budi,Penonton,Puas?,1,ya_tidak,Ya
";

    const QUESTIONS: &str = "\
event_id,respondent_type,question_text,position
1,Vendor,Revenue,2
1,Vendor,Business type,1
1,Vendor,Jumlah karyawan,3
2,Penonton,Puas?,1
";

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn reads_only_the_requested_event() {
        let answers = write_temp(ANSWERS);
        let source = CsvRowSource::new(answers.path(), None);

        let rows = source.answer_rows(1).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.respondent_type.as_str() == "Vendor"));
        assert_eq!(rows[1].answer_kind, AnswerKind::Currency);
        assert_eq!(rows[2].answer_value, "");

        assert!(source.answer_rows(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn questions_file_supplies_unanswered_columns() {
        let answers = write_temp(ANSWERS);
        let questions = write_temp(QUESTIONS);
        let source = CsvRowSource::new(answers.path(), Some(questions.path().to_path_buf()));

        let columns = source.question_columns(1).await.unwrap();
        let texts: Vec<&str> = columns.iter().map(|c| c.question_text.as_str()).collect();
        assert_eq!(texts, vec!["Revenue", "Business type", "Jumlah karyawan"]);
    }

    #[tokio::test]
    async fn columns_fall_back_to_answered_questions() {
        let answers = write_temp(ANSWERS);
        let source = CsvRowSource::new(answers.path(), None);

        let columns = source.question_columns(2).await.unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].question_text, "Puas?");
    }

    #[tokio::test]
    async fn unknown_answer_kind_is_a_source_error() {
        let answers = write_temp(
            "event_id,submission_id,submitted_at,surveyor_name,respondent_type,question_text,position,answer_kind,answer_value\n\
             1,1,2025-08-17T09:30:00Z,Sari,Vendor,Rating,1,bintang,5\n",
        );
        let source = CsvRowSource::new(answers.path(), None);

        let err = source.answer_rows(1).await.unwrap_err();
        assert!(matches!(err, SurveyError::Source(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let source = CsvRowSource::new("/nonexistent/answers.csv", None);
        let err = source.answer_rows(1).await.unwrap_err();
        assert!(matches!(err, SurveyError::Source(_)));
    }
}
