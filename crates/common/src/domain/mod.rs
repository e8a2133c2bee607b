//! Domain records shared by both persistence arms
//!
//! These are the canonical in-memory and wire representations of every
//! entity. The guest-mode local store persists them verbatim as JSON; the
//! remote store maps them to and from SeaORM models at the repository
//! boundary. Nested collections (tags, options, panels, topics) are stored
//! as JSON columns remotely and validated on every read, so malformed
//! persisted data fails loudly at the boundary instead of propagating
//! untyped.

use crate::errors::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Number of options every quiz question carries
pub const QUIZ_OPTION_COUNT: usize = 4;

// ============================================================================
// Note
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub subject: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// True when this note was produced by the synthesis generator
    #[serde(default)]
    pub is_synthesis: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_synthesis: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subject: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_synthesis: Option<bool>,
}

impl NotePatch {
    /// Shallow-merge the patch into an existing record
    pub fn apply(&self, note: &mut Note) {
        if let Some(ref title) = self.title {
            note.title = title.clone();
        }
        if let Some(ref content) = self.content {
            note.content = content.clone();
        }
        if let Some(ref subject) = self.subject {
            note.subject = Some(subject.clone());
        }
        if let Some(ref tags) = self.tags {
            note.tags = tags.clone();
        }
        if let Some(is_synthesis) = self.is_synthesis {
            note.is_synthesis = is_synthesis;
        }
    }
}

// ============================================================================
// Flashcard
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub deck_name: String,
    pub front: String,
    pub back: String,
    /// Flipped by the review UI once the learner marks the card as mastered
    #[serde(default)]
    pub is_known: bool,
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardDraft {
    pub deck_name: String,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub is_known: bool,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashcardPatch {
    pub deck_name: Option<String>,
    pub front: Option<String>,
    pub back: Option<String>,
    pub is_known: Option<bool>,
    pub subject: Option<String>,
}

impl FlashcardPatch {
    pub fn apply(&self, card: &mut Flashcard) {
        if let Some(ref deck_name) = self.deck_name {
            card.deck_name = deck_name.clone();
        }
        if let Some(ref front) = self.front {
            card.front = front.clone();
        }
        if let Some(ref back) = self.back {
            card.back = back.clone();
        }
        if let Some(is_known) = self.is_known {
            card.is_known = is_known;
        }
        if let Some(ref subject) = self.subject {
            card.subject = Some(subject.clone());
        }
    }
}

// ============================================================================
// Quiz question
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub quiz_name: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizQuestionDraft {
    pub quiz_name: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizQuestionPatch {
    pub quiz_name: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_index: Option<u8>,
}

impl QuizQuestionPatch {
    pub fn apply(&self, q: &mut QuizQuestion) {
        if let Some(ref quiz_name) = self.quiz_name {
            q.quiz_name = quiz_name.clone();
        }
        if let Some(ref question) = self.question {
            q.question = question.clone();
        }
        if let Some(ref options) = self.options {
            q.options = options.clone();
        }
        if let Some(correct_index) = self.correct_index {
            q.correct_index = correct_index;
        }
    }
}

/// Check the structural invariant: exactly four options, index in range
pub fn validate_quiz_shape(options: &[String], correct_index: u8) -> Result<()> {
    if options.len() != QUIZ_OPTION_COUNT {
        return Err(AppError::Validation {
            message: format!(
                "quiz question must have exactly {} options, got {}",
                QUIZ_OPTION_COUNT,
                options.len()
            ),
            field: Some("options".into()),
        });
    }
    if usize::from(correct_index) >= options.len() {
        return Err(AppError::Validation {
            message: format!("correct_index {} out of range", correct_index),
            field: Some("correct_index".into()),
        });
    }
    Ok(())
}

// ============================================================================
// Comic
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: u32,
    pub content: String,
    pub has_dialog: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comic {
    pub id: String,
    pub title: String,
    pub subject: Option<String>,
    /// Emoji glyph shown on the library card
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub panels: Vec<Panel>,
    pub duration: Option<String>,
    /// Read progress, 0-100
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComicDraft {
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComicPatch {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub thumbnail: Option<String>,
    pub panels: Option<Vec<Panel>>,
    pub duration: Option<String>,
    pub progress: Option<u8>,
}

impl ComicPatch {
    pub fn apply(&self, comic: &mut Comic) {
        if let Some(ref title) = self.title {
            comic.title = title.clone();
        }
        if let Some(ref subject) = self.subject {
            comic.subject = Some(subject.clone());
        }
        if let Some(ref thumbnail) = self.thumbnail {
            comic.thumbnail = Some(thumbnail.clone());
        }
        if let Some(ref panels) = self.panels {
            comic.panels = panels.clone();
        }
        if let Some(ref duration) = self.duration {
            comic.duration = Some(duration.clone());
        }
        if let Some(progress) = self.progress {
            comic.progress = progress.min(100);
        }
    }
}

// ============================================================================
// Exam
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamTopic {
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub subject: Option<String>,
    pub exam_date: NaiveDate,
    #[serde(default)]
    pub topics: Vec<ExamTopic>,
    /// Derived: round(100 * completed topics / total topics)
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamDraft {
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub exam_date: NaiveDate,
    #[serde(default)]
    pub topics: Vec<ExamTopic>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub topics: Option<Vec<ExamTopic>>,
}

impl ExamPatch {
    /// Shallow-merge, recomputing progress whenever the topic list changes
    pub fn apply(&self, exam: &mut Exam) {
        if let Some(ref title) = self.title {
            exam.title = title.clone();
        }
        if let Some(ref subject) = self.subject {
            exam.subject = Some(subject.clone());
        }
        if let Some(exam_date) = self.exam_date {
            exam.exam_date = exam_date;
        }
        if let Some(ref topics) = self.topics {
            exam.topics = topics.clone();
            exam.progress = exam_progress(&exam.topics);
        }
    }
}

/// Percentage of completed topics, rounded; 0 for an empty topic list
pub fn exam_progress(topics: &[ExamTopic]) -> u8 {
    if topics.is_empty() {
        return 0;
    }
    let done = topics.iter().filter(|t| t.completed).count();
    ((100.0 * done as f64 / topics.len() as f64).round()) as u8
}

// ============================================================================
// Study session
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    /// Back-reference to the exam this session prepares for
    pub exam_id: Option<String>,
    pub session_date: NaiveDate,
    /// "HH:MM", 24-hour clock
    pub start_time: String,
    pub end_time: String,
    pub subject: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudySessionDraft {
    #[serde(default)]
    pub exam_id: Option<String>,
    pub session_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudySessionPatch {
    pub exam_id: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub completed: Option<bool>,
}

impl StudySessionPatch {
    pub fn apply(&self, session: &mut StudySession) {
        if let Some(ref exam_id) = self.exam_id {
            session.exam_id = Some(exam_id.clone());
        }
        if let Some(session_date) = self.session_date {
            session.session_date = session_date;
        }
        if let Some(ref start_time) = self.start_time {
            session.start_time = start_time.clone();
        }
        if let Some(ref end_time) = self.end_time {
            session.end_time = end_time.clone();
        }
        if let Some(ref subject) = self.subject {
            session.subject = Some(subject.clone());
        }
        if let Some(ref topic) = self.topic {
            session.topic = Some(topic.clone());
        }
        if let Some(completed) = self.completed {
            session.completed = completed;
        }
    }
}

/// Validate a 24-hour "HH:MM" clock string
pub fn is_valid_clock_time(value: &str) -> bool {
    let re = regex_lite::Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid regex");
    re.is_match(value)
}

/// Validate the session window: both times well-formed, end not before start.
/// Zero-padded "HH:MM" strings order lexicographically, so a plain string
/// comparison is sufficient once the format is checked.
pub fn validate_session_window(start: &str, end: &str) -> Result<()> {
    if !is_valid_clock_time(start) {
        return Err(AppError::Validation {
            message: format!("invalid start_time {:?}", start),
            field: Some("start_time".into()),
        });
    }
    if !is_valid_clock_time(end) {
        return Err(AppError::Validation {
            message: format!("invalid end_time {:?}", end),
            field: Some("end_time".into()),
        });
    }
    if end < start {
        return Err(AppError::Validation {
            message: format!("end_time {} is before start_time {}", end, start),
            field: Some("end_time".into()),
        });
    }
    Ok(())
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub subscription_cancel_at_period_end: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(ref first_name) = self.first_name {
            profile.first_name = Some(first_name.clone());
        }
        if let Some(ref last_name) = self.last_name {
            profile.last_name = Some(last_name.clone());
        }
        if let Some(ref avatar_url) = self.avatar_url {
            profile.avatar_url = Some(avatar_url.clone());
        }
        if let Some(ref bio) = self.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(ref school) = self.school {
            profile.school = Some(school.clone());
        }
        if let Some(ref grade) = self.grade {
            profile.grade = Some(grade.clone());
        }
    }
}

// ============================================================================
// JSON column boundary
// ============================================================================

/// Parse a JSON column read from the remote store, failing loudly on
/// malformed persisted data
pub fn parse_json_column<T: DeserializeOwned>(value: serde_json::Value, column: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| AppError::InvalidFormat {
        message: format!("malformed {} column: {}", column, e),
    })
}

/// Serialize a nested collection for a JSON column write
pub fn to_json_column<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(done: usize, total: usize) -> Vec<ExamTopic> {
        (0..total)
            .map(|i| ExamTopic {
                name: format!("topic {}", i),
                completed: i < done,
            })
            .collect()
    }

    #[test]
    fn test_progress_empty_topics_is_zero() {
        assert_eq!(exam_progress(&[]), 0);
    }

    #[test]
    fn test_progress_half_done() {
        assert_eq!(exam_progress(&topics(1, 2)), 50);
    }

    #[test]
    fn test_progress_rounds() {
        assert_eq!(exam_progress(&topics(1, 3)), 33);
        assert_eq!(exam_progress(&topics(2, 3)), 67);
        assert_eq!(exam_progress(&topics(3, 3)), 100);
    }

    #[test]
    fn test_exam_patch_recomputes_progress() {
        let mut exam = Exam {
            id: "e1".into(),
            title: "Math Final".into(),
            subject: Some("Math".into()),
            exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            topics: topics(0, 2),
            progress: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut new_topics = exam.topics.clone();
        new_topics[0].completed = true;
        let patch = ExamPatch {
            topics: Some(new_topics),
            ..Default::default()
        };
        patch.apply(&mut exam);

        assert_eq!(exam.progress, 50);
    }

    #[test]
    fn test_exam_patch_without_topics_keeps_progress() {
        let mut exam = Exam {
            id: "e1".into(),
            title: "Math Final".into(),
            subject: None,
            exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            topics: topics(1, 2),
            progress: 50,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let patch = ExamPatch {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        patch.apply(&mut exam);

        assert_eq!(exam.title, "Renamed");
        assert_eq!(exam.progress, 50);
    }

    #[test]
    fn test_quiz_shape_validation() {
        let four: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert!(validate_quiz_shape(&four, 0).is_ok());
        assert!(validate_quiz_shape(&four, 3).is_ok());
        assert!(validate_quiz_shape(&four, 4).is_err());
        assert!(validate_quiz_shape(&four[..3].to_vec(), 0).is_err());
    }

    #[test]
    fn test_note_patch_merges_only_present_fields() {
        let mut note = Note {
            id: "n1".into(),
            title: "Original".into(),
            content: "Body".into(),
            subject: Some("History".into()),
            tags: vec!["a".into()],
            is_synthesis: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let patch = NotePatch {
            content: Some("Edited".into()),
            ..Default::default()
        };
        patch.apply(&mut note);

        assert_eq!(note.title, "Original");
        assert_eq!(note.content, "Edited");
        assert_eq!(note.subject.as_deref(), Some("History"));
    }

    #[test]
    fn test_clock_time_validation() {
        assert!(is_valid_clock_time("09:30"));
        assert!(is_valid_clock_time("23:59"));
        assert!(!is_valid_clock_time("24:00"));
        assert!(!is_valid_clock_time("9:30"));
        assert!(!is_valid_clock_time("09:60"));
    }

    #[test]
    fn test_session_window_ordering() {
        assert!(validate_session_window("09:00", "10:30").is_ok());
        assert!(validate_session_window("09:00", "09:00").is_ok());
        assert!(validate_session_window("10:30", "09:00").is_err());
        assert!(validate_session_window("late", "09:00").is_err());
    }

    #[test]
    fn test_json_column_round_trip() {
        let panels = vec![Panel {
            id: 1,
            content: "A wizard explains fractions".into(),
            has_dialog: true,
            dialog: Some("Half of a half is a quarter!".into()),
        }];
        let value = to_json_column(&panels).unwrap();
        let back: Vec<Panel> = parse_json_column(value, "panels").unwrap();
        assert_eq!(back, panels);
    }

    #[test]
    fn test_json_column_malformed_fails_loudly() {
        let bad = serde_json::json!([{ "id": "not-a-number" }]);
        let parsed: Result<Vec<Panel>> = parse_json_column(bad, "panels");
        assert!(matches!(parsed, Err(AppError::InvalidFormat { .. })));
    }

    #[test]
    fn test_panel_wire_shape_is_camel_case() {
        let panel = Panel {
            id: 2,
            content: "x".into(),
            has_dialog: false,
            dialog: None,
        };
        let value = serde_json::to_value(&panel).unwrap();
        assert!(value.get("hasDialog").is_some());
        assert!(value.get("dialog").is_none());
    }
}
