//! Study features backed by a text generator.
//!
//! # Responsibility
//! - Turn typed study data into prompts for evaluation, planning,
//!   translation, quiz generation, forecast commentary and period reviews.
//! - Route every call through effort selection, retry and finish-reason
//!   interpretation.
//!
//! # Invariants
//! - Each feature emits one start and one ok/error log event with sizes only.
//! - Quiz output is parsed strictly; unusable structure is `MalformedOutput`.

use crate::ai::client::{interpret_response, AiError, GeneratedText, GenerationRequest, TextGenerator};
use crate::ai::effort::{determine_effort, TaskComplexity};
use crate::ai::retry::{call_with_retry, thread_sleep};
use crate::config::AiConfig;
use crate::ml::pipeline::GradeForecast;
use crate::model::grade::GradeRecord;
use crate::model::profile::UserProfile;
use crate::service::report_service::PeriodReport;
use crate::stats::aggregate::{summarize, LetterGrade};
use crate::stats::trend::{index_fit, TrendDirection};
use backon::BlockingSleeper;
use chrono::NaiveDate;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::{Duration, Instant};

static FENCED_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fenced json regex"));

const TUTOR_SYSTEM: &str =
    "You are a supportive study coach. Answer concisely and base advice on the data given.";
const TRANSLATOR_SYSTEM: &str =
    "You are a precise translator. Return only the translation without commentary.";
const QUIZ_SYSTEM: &str =
    "You write multiple-choice review questions. Reply with JSON only, no prose.";

#[derive(Debug, Clone, PartialEq)]
pub struct StudyPlanRequest {
    pub subject: String,
    pub current_level: String,
    pub target_level: String,
    pub target_date: Option<NaiveDate>,
    pub weekly_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl QuizDifficulty {
    fn guidance(self) -> &'static str {
        match self {
            Self::Beginner => "definitions of key terms and basic fact checks",
            Self::Intermediate => "applying concepts, cause and effect, comparison",
            Self::Advanced => "analysis, evaluation and multi-step reasoning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Parses model output, accepting an optional ```json fence.
    pub fn parse(output: &str) -> Result<Self, AiError> {
        let body = FENCED_JSON_RE
            .captures(output)
            .and_then(|captures| captures.get(1))
            .map_or(output, |body| body.as_str())
            .trim();
        let quiz: Quiz = serde_json::from_str(body)
            .map_err(|err| AiError::MalformedOutput(format!("quiz json: {err}")))?;
        if quiz.questions.is_empty() {
            return Err(AiError::MalformedOutput("quiz has no questions".to_string()));
        }
        for (index, question) in quiz.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(AiError::MalformedOutput(format!(
                    "question {} has fewer than two options",
                    index + 1
                )));
            }
            if question.correct_answer >= question.options.len() {
                return Err(AiError::MalformedOutput(format!(
                    "question {} answer index {} is out of range",
                    index + 1,
                    question.correct_answer
                )));
            }
        }
        Ok(quiz)
    }

    /// Number of answers matching the key; extra or missing answers count as wrong.
    pub fn score(&self, answers: &[usize]) -> usize {
        self.questions
            .iter()
            .zip(answers)
            .filter(|(question, answer)| question.correct_answer == **answer)
            .count()
    }
}

pub struct StudyAssistant<G, S = fn(Duration)> {
    generator: G,
    config: AiConfig,
    sleeper: S,
}

impl<G: TextGenerator> StudyAssistant<G> {
    pub fn new(generator: G, config: AiConfig) -> Self {
        Self {
            generator,
            config,
            sleeper: thread_sleep,
        }
    }
}

impl<G: TextGenerator, S: BlockingSleeper + Clone> StudyAssistant<G, S> {
    pub fn with_sleeper(generator: G, config: AiConfig, sleeper: S) -> Self {
        Self {
            generator,
            config,
            sleeper,
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Feedback on a subject's grade history.
    ///
    /// # Errors
    /// - `BadRequest` when `records` is empty.
    pub fn evaluate_grades(
        &self,
        subject: &str,
        records: &[GradeRecord],
        profile: Option<&UserProfile>,
    ) -> Result<GeneratedText, AiError> {
        let Some(summary) = summarize(records) else {
            return Err(AiError::BadRequest(format!(
                "no grades recorded for {subject}"
            )));
        };
        let scores: Vec<f64> = records.iter().map(|record| record.score).collect();
        let slope = index_fit(&scores).map_or(0.0, |fit| fit.slope);
        let letter = LetterGrade::from_score(summary.weighted_mean);

        let mut prompt = String::new();
        let _ = writeln!(prompt, "Subject: {subject}");
        if let Some(profile) = profile {
            push_profile(&mut prompt, profile);
        }
        let _ = writeln!(
            prompt,
            "Records: {} | mean {:.1} | weighted mean {:.1} | median {:.1} | std {:.1} | range {:.0}-{:.0}",
            summary.count,
            summary.mean,
            summary.weighted_mean,
            summary.median,
            summary.std_dev,
            summary.min,
            summary.max
        );
        let _ = writeln!(
            prompt,
            "Trend: {:?} ({:+.2} points per record) | band {:?} ({})",
            TrendDirection::from_slope(slope),
            slope,
            letter,
            letter.description()
        );
        let _ = writeln!(prompt, "History (date, type, score, weight):");
        for record in records {
            let _ = writeln!(
                prompt,
                "- {} {} {:.1} x{}",
                record.date,
                record.kind.as_str(),
                record.score,
                record.weight
            );
        }
        prompt.push_str(
            "Evaluate strengths and weaknesses, then give three concrete next steps.",
        );
        self.complete("grade_evaluation", TUTOR_SYSTEM, prompt, TaskComplexity::Medium)
    }

    pub fn study_plan(&self, request: &StudyPlanRequest) -> Result<GeneratedText, AiError> {
        if request.subject.trim().is_empty() {
            return Err(AiError::BadRequest("study plan needs a subject".to_string()));
        }
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Subject: {}", request.subject.trim());
        let _ = writeln!(prompt, "Current level: {}", request.current_level);
        let _ = writeln!(prompt, "Target level: {}", request.target_level);
        match request.target_date {
            Some(date) => {
                let _ = writeln!(prompt, "Target date: {date}");
            }
            None => prompt.push_str("Target date: open\n"),
        }
        let _ = writeln!(prompt, "Available time: {:.1} hours per week", request.weekly_hours);
        prompt.push_str("Draft a week-by-week plan with milestones and review sessions.");
        self.complete("study_plan", TUTOR_SYSTEM, prompt, TaskComplexity::Complex)
    }

    pub fn translate(&self, text: &str, target_language: &str) -> Result<GeneratedText, AiError> {
        if text.trim().is_empty() {
            return Err(AiError::BadRequest("nothing to translate".to_string()));
        }
        let prompt = format!("Translate into {target_language}:\n\n{text}");
        self.complete("translation", TRANSLATOR_SYSTEM, prompt, TaskComplexity::Simple)
    }

    /// Multiple-choice questions about `source_text`.
    pub fn generate_quiz(
        &self,
        source_text: &str,
        count: usize,
        difficulty: QuizDifficulty,
    ) -> Result<Quiz, AiError> {
        if source_text.trim().is_empty() || count == 0 {
            return Err(AiError::BadRequest(
                "quiz needs source text and at least one question".to_string(),
            ));
        }
        let prompt = format!(
            "Write {count} questions focusing on {}.\n\
             Source text (may contain transcription errors):\n{source_text}\n\n\
             Reply as {{\"questions\": [{{\"question\": str, \"options\": [str, str, str, str], \
             \"correct_answer\": zero-based index, \"explanation\": str}}]}}",
            difficulty.guidance()
        );
        let output = self.complete("quiz", QUIZ_SYSTEM, prompt, TaskComplexity::Medium)?;
        if output.truncated {
            return Err(AiError::MalformedOutput(
                "quiz output was cut off by the token limit".to_string(),
            ));
        }
        Quiz::parse(&output.text)
    }

    pub fn forecast_commentary(&self, forecast: &GradeForecast) -> Result<GeneratedText, AiError> {
        if forecast.points.is_empty() {
            return Err(AiError::BadRequest("forecast has no points".to_string()));
        }
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Subject: {} | model {} | held-out R2 {:.2}",
            forecast.subject,
            forecast.model_kind.as_str(),
            forecast.test_r2
        );
        for point in &forecast.points {
            let _ = writeln!(
                prompt,
                "- step {} on {}: {:.1} (95% range {:.1}-{:.1})",
                point.step, point.date, point.score, point.lower, point.upper
            );
        }
        prompt.push_str("Explain what these predictions mean and how reliable they are.");
        self.complete("forecast_commentary", TUTOR_SYSTEM, prompt, TaskComplexity::Simple)
    }

    /// Narrative review of a weekly or monthly report.
    ///
    /// # Errors
    /// - `BadRequest` when the period has neither grades nor study time.
    pub fn learning_report(
        &self,
        report: &PeriodReport,
        profile: Option<&UserProfile>,
    ) -> Result<GeneratedText, AiError> {
        if !report.has_activity() {
            return Err(AiError::BadRequest(format!(
                "no grades or study time between {} and {}",
                report.start, report.end
            )));
        }
        let mut prompt = String::new();
        if let Some(profile) = profile {
            push_profile(&mut prompt, profile);
        }
        let _ = writeln!(
            prompt,
            "Period: {} ({} to {})",
            report.period.as_str(),
            report.start,
            report.end
        );
        prompt.push_str("Grades:\n");
        if report.subject_grades.is_empty() {
            prompt.push_str("- none\n");
        }
        for subject in &report.subject_grades {
            let _ = writeln!(
                prompt,
                "- {}: mean {:.1} over {} records",
                subject.subject, subject.mean, subject.count
            );
        }
        let _ = writeln!(prompt, "Study time: {:.1} h total", report.total_hours);
        for subject in &report.subject_time {
            let _ = writeln!(
                prompt,
                "- {}: {:.1} h in {} sessions ({:.0}%)",
                subject.subject, subject.hours, subject.sessions, subject.percentage
            );
        }
        let _ = writeln!(
            prompt,
            "Active goals: {} | overdue reminders: {}",
            report.active_goals.len(),
            report.overdue_reminders.len()
        );
        prompt.push_str(
            "Summarize the period, name strengths and weak spots, and suggest a focus for the next one.",
        );
        self.complete("learning_report", TUTOR_SYSTEM, prompt, TaskComplexity::Complex)
    }

    fn complete(
        &self,
        feature: &'static str,
        system: &str,
        prompt: String,
        complexity: TaskComplexity,
    ) -> Result<GeneratedText, AiError> {
        let started_at = Instant::now();
        let effort = determine_effort(prompt.chars().count(), complexity);
        let request = GenerationRequest {
            system: system.to_string(),
            prompt,
            max_tokens: self.config.max_tokens,
            effort,
        };
        info!(
            "event=ai_generate module=ai status=start feature={} prompt_chars={} effort={}",
            feature,
            request.prompt.chars().count(),
            effort.as_str()
        );

        let mut attempts = 0;
        let result = call_with_retry(&self.config.retry_policy(), self.sleeper.clone(), |attempt| {
            attempts = attempt + 1;
            self.generator.generate(&request)
        })
        .and_then(interpret_response);

        match &result {
            Ok(output) => info!(
                "event=ai_generate module=ai status=ok feature={} attempts={} output_chars={} truncated={} duration_ms={}",
                feature,
                attempts,
                output.text.chars().count(),
                output.truncated,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=ai_generate module=ai status=error feature={} attempts={} error_code={} duration_ms={}",
                feature,
                attempts,
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }
}

fn push_profile(prompt: &mut String, profile: &UserProfile) {
    if let Some(level) = profile.education_level {
        let _ = writeln!(prompt, "Learner: {} student", level.as_str());
    }
    if let Some(age) = profile.age {
        let _ = writeln!(prompt, "Age: {age}");
    }
}

#[cfg(test)]
mod tests {
    use super::Quiz;
    use crate::ai::client::AiError;

    #[test]
    fn parse_accepts_fenced_json() {
        let output = "Here you go:\n```json\n{\"questions\": [{\"question\": \"2+2?\", \"options\": [\"3\", \"4\"], \"correct_answer\": 1}]}\n```";
        let quiz = Quiz::parse(output).expect("parsable input");
        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.score(&[1]), 1);
        assert_eq!(quiz.score(&[0]), 0);
    }

    #[test]
    fn parse_rejects_out_of_range_answer() {
        let output = r#"{"questions": [{"question": "q", "options": ["a", "b"], "correct_answer": 2}]}"#;
        assert!(matches!(
            Quiz::parse(output).expect_err("parse must fail"),
            AiError::MalformedOutput(_)
        ));
    }
}
