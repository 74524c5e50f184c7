use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::SurveyError;
use crate::models::{AnswerKind, AnswerRow, RespondentType};

pub type EventAnalysis = BTreeMap<RespondentType, TypeAnalysis>;

#[derive(Debug, Clone, Serialize)]
pub struct TypeAnalysis {
    pub total_responden: usize,
    pub pertanyaan: IndexMap<String, QuestionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSummary {
    pub tipe_jawaban: AnswerKind,
    pub jawaban: BTreeMap<String, u64>,
    pub total: u64,
    pub sum: f64,
    pub persentase: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rata_rata: Option<f64>,
    pub jawaban_tidak_valid: u64,
}

#[derive(Debug)]
struct QuestionTally {
    kind: AnswerKind,
    position: i32,
    jawaban: BTreeMap<String, u64>,
    total: u64,
    sum: f64,
    parsed: u64,
    invalid: u64,
}

impl QuestionTally {
    fn new(kind: AnswerKind, position: i32) -> Self {
        Self {
            kind,
            position,
            jawaban: BTreeMap::new(),
            total: 0,
            sum: 0.0,
            parsed: 0,
            invalid: 0,
        }
    }

    fn record(&mut self, row: &AnswerRow) {
        *self.jawaban.entry(row.answer_value.clone()).or_insert(0) += 1;
        self.total += 1;
        self.position = self.position.min(row.question_position);

        if !self.kind.is_numeric() {
            return;
        }

        match parse_numeric(&row.answer_value) {
            Some(value) => {
                self.sum += value;
                self.parsed += 1;
            }
            None => {
                self.invalid += 1;
                tracing::debug!(
                    submission_id = row.submission_id,
                    kind = %self.kind,
                    question = %row.question_text,
                    value = %row.answer_value,
                    "numeric answer did not parse"
                );
            }
        }
    }

    fn finish(self, respondent_type: &RespondentType, question: &str) -> QuestionSummary {
        if self.invalid > 0 {
            tracing::warn!(
                respondent_type = %respondent_type,
                question,
                count = self.invalid,
                "unparseable numeric answers counted as zero"
            );
        }

        let persentase = self
            .jawaban
            .iter()
            .map(|(answer, count)| (answer.clone(), percentage(*count, self.total)))
            .collect();

        let rata_rata = if self.kind.is_numeric() && self.parsed > 0 {
            Some(self.sum / self.parsed as f64)
        } else {
            None
        };

        QuestionSummary {
            tipe_jawaban: self.kind,
            jawaban: self.jawaban,
            total: self.total,
            sum: self.sum,
            persentase,
            rata_rata,
            jawaban_tidak_valid: self.invalid,
        }
    }
}

#[derive(Debug, Default)]
struct TypeTally {
    submissions: HashSet<i64>,
    questions: HashMap<String, QuestionTally>,
}

// Leading-prefix parse: "150000 rupiah" reads as 150000. No numeric prefix, or a
// non-finite result, is None and contributes 0 to the sum.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let text = value.trim_start();
    let bytes = text.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end]
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

pub fn analyze(event_id: i64, rows: &[AnswerRow]) -> Result<EventAnalysis, SurveyError> {
    if rows.is_empty() {
        return Err(SurveyError::NoAnalysisData { event_id });
    }

    let mut types: BTreeMap<RespondentType, TypeTally> = BTreeMap::new();

    for row in rows {
        let bucket = types.entry(row.respondent_type.clone()).or_default();
        bucket.submissions.insert(row.submission_id);
        bucket
            .questions
            .entry(row.question_text.clone())
            .or_insert_with(|| QuestionTally::new(row.answer_kind, row.question_position))
            .record(row);
    }

    let analysis = types
        .into_iter()
        .map(|(respondent_type, tally)| {
            let mut questions: Vec<(String, QuestionTally)> = tally.questions.into_iter().collect();
            questions.sort_by(|a, b| a.1.position.cmp(&b.1.position).then_with(|| a.0.cmp(&b.0)));

            let pertanyaan = questions
                .into_iter()
                .map(|(text, question)| {
                    let summary = question.finish(&respondent_type, &text);
                    (text, summary)
                })
                .collect();

            let analysis = TypeAnalysis {
                total_responden: tally.submissions.len(),
                pertanyaan,
            };
            (respondent_type, analysis)
        })
        .collect();

    tracing::debug!(event_id, rows = rows.len(), "analysis computed");
    Ok(analysis)
}
