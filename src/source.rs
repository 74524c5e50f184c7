use async_trait::async_trait;

use crate::error::SurveyError;
use crate::models::{AnswerRow, QuestionColumn};

#[async_trait]
pub trait RowSource: Send + Sync {
    async fn answer_rows(&self, event_id: i64) -> Result<Vec<AnswerRow>, SurveyError>;

    async fn question_columns(&self, event_id: i64) -> Result<Vec<QuestionColumn>, SurveyError>;
}
