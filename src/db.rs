use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::error::SurveyError;
use crate::models::{AnswerKind, AnswerRow, QuestionColumn, RespondentType};
use crate::source::RowSource;

const ANSWER_ROWS_QUERY: &str = r#"
    SELECT
        s.id::bigint AS submission_id,
        s.created_at::timestamptz AS submitted_at,
        COALESCE(u.nama, '') AS surveyor_name,
        k.tipe_responden,
        p.teks_pertanyaan,
        COALESCE(p.urutan, 0)::int AS urutan,
        p.tipe_jawaban,
        COALESCE(j.isi_jawaban, '') AS isi_jawaban
    FROM jawaban j
    JOIN pertanyaan p ON j.pertanyaan_id = p.id
    JOIN survey_sessions s ON j.session_id = s.id
    JOIN kuesioner k ON s.kuesioner_id = k.id
    LEFT JOIN users u ON s.surveyor_id = u.id
    WHERE k.event_id = $1
"#;

const QUESTION_COLUMNS_QUERY: &str = r#"
    SELECT k.tipe_responden, p.teks_pertanyaan, COALESCE(p.urutan, 0)::int AS urutan
    FROM pertanyaan p
    JOIN kuesioner k ON p.kuesioner_id = k.id
    WHERE k.event_id = $1
    ORDER BY k.tipe_responden, p.urutan, p.id
"#;

#[derive(Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn answer_kind(row: &PgRow) -> Result<AnswerKind, sqlx::Error> {
    let tag: String = row.try_get("tipe_jawaban")?;
    Ok(tag.parse().unwrap_or_else(|err| {
        tracing::warn!(%err, "treating question as free text");
        AnswerKind::Text
    }))
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn answer_rows(&self, event_id: i64) -> Result<Vec<AnswerRow>, SurveyError> {
        let records = sqlx::query(ANSWER_ROWS_QUERY)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(records.len());
        for row in records {
            let respondent_type: String = row.try_get("tipe_responden")?;
            let submitted_at: DateTime<Utc> = row.try_get("submitted_at")?;
            rows.push(AnswerRow {
                submission_id: row.try_get("submission_id")?,
                submitted_at,
                surveyor_name: row.try_get("surveyor_name")?,
                respondent_type: RespondentType::new(respondent_type),
                question_text: row.try_get("teks_pertanyaan")?,
                question_position: row.try_get("urutan")?,
                answer_kind: answer_kind(&row)?,
                answer_value: row.try_get("isi_jawaban")?,
            });
        }

        tracing::debug!(event_id, rows = rows.len(), "fetched answer rows");
        Ok(rows)
    }

    async fn question_columns(&self, event_id: i64) -> Result<Vec<QuestionColumn>, SurveyError> {
        let records = sqlx::query(QUESTION_COLUMNS_QUERY)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        let mut columns = Vec::with_capacity(records.len());
        for row in records {
            let respondent_type: String = row.try_get("tipe_responden")?;
            columns.push(QuestionColumn {
                respondent_type: RespondentType::new(respondent_type),
                question_text: row.try_get("teks_pertanyaan")?,
                position: row.try_get("urutan")?,
            });
        }

        Ok(columns)
    }
}
