use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerKind {
    #[serde(rename = "teks")]
    Text,
    #[serde(rename = "angka")]
    Number,
    #[serde(rename = "nominal")]
    Currency,
    #[serde(rename = "ya_tidak")]
    YesNo,
}

impl AnswerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerKind::Text => "teks",
            AnswerKind::Number => "angka",
            AnswerKind::Currency => "nominal",
            AnswerKind::YesNo => "ya_tidak",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, AnswerKind::Number | AnswerKind::Currency)
    }
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAnswerKind(pub String);

impl fmt::Display for UnknownAnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown answer kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownAnswerKind {}

impl FromStr for AnswerKind {
    type Err = UnknownAnswerKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "teks" => Ok(AnswerKind::Text),
            "angka" => Ok(AnswerKind::Number),
            "nominal" => Ok(AnswerKind::Currency),
            "ya_tidak" => Ok(AnswerKind::YesNo),
            other => Err(UnknownAnswerKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RespondentType(String);

impl RespondentType {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RespondentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub submission_id: i64,
    pub submitted_at: DateTime<Utc>,
    pub surveyor_name: String,
    pub respondent_type: RespondentType,
    pub question_text: String,
    pub question_position: i32,
    pub answer_kind: AnswerKind,
    pub answer_value: String,
}

#[derive(Debug, Clone)]
pub struct QuestionColumn {
    pub respondent_type: RespondentType,
    pub question_text: String,
    pub position: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_kind_tags_round_trip_through_from_str() {
        for kind in [
            AnswerKind::Text,
            AnswerKind::Number,
            AnswerKind::Currency,
            AnswerKind::YesNo,
        ] {
            assert_eq!(kind.as_str().parse::<AnswerKind>(), Ok(kind));
        }
        assert!("pilihan_ganda".parse::<AnswerKind>().is_err());
    }

    #[test]
    fn only_number_and_currency_are_numeric() {
        assert!(AnswerKind::Number.is_numeric());
        assert!(AnswerKind::Currency.is_numeric());
        assert!(!AnswerKind::Text.is_numeric());
        assert!(!AnswerKind::YesNo.is_numeric());
    }

    #[test]
    fn respondent_type_is_trimmed_and_serialized_as_plain_string() {
        let label = RespondentType::new("  Vendor ");
        assert_eq!(label.as_str(), "Vendor");
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"Vendor\"");
    }
}
