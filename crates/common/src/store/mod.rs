//! Dual-mode persistence facade
//!
//! One read/write interface per entity regardless of whether the caller is
//! authenticated. The [`PersistenceContext`] decides the arm explicitly:
//! it is resolved at the auth boundary and passed into every call, never
//! read from ambient state, so a login transition switches the target on
//! the very next request and tests can inject either arm directly.
//!
//! Remote records are owned by the user id baked into the context; local
//! records are owned implicitly by the guest's namespaced collection files.
//! Ids are opaque strings: the remote arm assigns them at the store layer,
//! the local arm generates a random UUID at creation.

use crate::db::Repository;
use crate::domain::{
    self, Comic, ComicDraft, ComicPatch, Exam, ExamDraft, ExamPatch, Flashcard, FlashcardDraft,
    FlashcardPatch, Note, NoteDraft, NotePatch, QuizQuestion, QuizQuestionDraft, QuizQuestionPatch,
    StudySession, StudySessionDraft, StudySessionPatch,
};
use crate::errors::Result;
use crate::local::{
    LocalStore, COMICS_KEY, EXAMS_KEY, FLASHCARDS_KEY, NOTES_KEY, QUIZ_QUESTIONS_KEY,
    STUDY_SESSIONS_KEY,
};
use chrono::Utc;
use uuid::Uuid;

/// Which persistence arm a request operates against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceContext {
    /// Authenticated: rows in the remote store, scoped by owner
    Remote { user_id: Uuid },

    /// Guest: JSON collections in the local store, scoped by context id
    Local { guest_id: String },
}

impl PersistenceContext {
    /// Label used in logs and metrics
    pub fn mode(&self) -> &'static str {
        match self {
            PersistenceContext::Remote { .. } => "remote",
            PersistenceContext::Local { .. } => "local",
        }
    }
}

/// Parse an opaque id for the remote arm. Ids the remote store never
/// issued cannot match any row, so they resolve to "not found" rather
/// than an error.
fn remote_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

/// Dual-mode store facade
#[derive(Clone)]
pub struct StudyStore {
    repo: Repository,
    local: LocalStore,
}

impl StudyStore {
    pub fn new(repo: Repository, local: LocalStore) -> Self {
        Self { repo, local }
    }

    // ========================================================================
    // Notes
    // ========================================================================

    pub async fn list_notes(&self, ctx: &PersistenceContext) -> Result<Vec<Note>> {
        crate::metrics::record_store_op("note", ctx.mode(), "list");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.list_notes(*user_id).await,
            PersistenceContext::Local { guest_id } => Ok(self.local.read(guest_id, NOTES_KEY)),
        }
    }

    pub async fn create_note(&self, ctx: &PersistenceContext, draft: NoteDraft) -> Result<Note> {
        crate::metrics::record_store_op("note", ctx.mode(), "create");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.create_note(*user_id, draft).await,
            PersistenceContext::Local { guest_id } => {
                let now = Utc::now();
                let note = Note {
                    id: Uuid::new_v4().to_string(),
                    title: draft.title,
                    content: draft.content,
                    subject: draft.subject,
                    tags: draft.tags,
                    is_synthesis: draft.is_synthesis,
                    created_at: now,
                    updated_at: now,
                };

                let mut items: Vec<Note> = self.local.read(guest_id, NOTES_KEY);
                items.insert(0, note.clone()); // newest first
                self.local.write(guest_id, NOTES_KEY, &items)?;
                Ok(note)
            }
        }
    }

    pub async fn update_note(
        &self,
        ctx: &PersistenceContext,
        id: &str,
        patch: &NotePatch,
    ) -> Result<Option<Note>> {
        crate::metrics::record_store_op("note", ctx.mode(), "update");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.update_note(*user_id, id, patch).await,
                None => Ok(None),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Note> = self.local.read(guest_id, NOTES_KEY);
                let Some(note) = items.iter_mut().find(|n| n.id == id) else {
                    // Idempotent no-op for unknown ids
                    return Ok(None);
                };
                patch.apply(note);
                note.updated_at = Utc::now();
                let updated = note.clone();
                self.local.write(guest_id, NOTES_KEY, &items)?;
                Ok(Some(updated))
            }
        }
    }

    pub async fn delete_note(&self, ctx: &PersistenceContext, id: &str) -> Result<bool> {
        crate::metrics::record_store_op("note", ctx.mode(), "delete");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.delete_note(*user_id, id).await,
                None => Ok(false),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Note> = self.local.read(guest_id, NOTES_KEY);
                let before = items.len();
                items.retain(|n| n.id != id);
                let removed = items.len() != before;
                if removed {
                    self.local.write(guest_id, NOTES_KEY, &items)?;
                }
                Ok(removed)
            }
        }
    }

    // ========================================================================
    // Flashcards
    // ========================================================================

    pub async fn list_flashcards(&self, ctx: &PersistenceContext) -> Result<Vec<Flashcard>> {
        crate::metrics::record_store_op("flashcard", ctx.mode(), "list");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.list_flashcards(*user_id).await,
            PersistenceContext::Local { guest_id } => Ok(self.local.read(guest_id, FLASHCARDS_KEY)),
        }
    }

    pub async fn create_flashcard(
        &self,
        ctx: &PersistenceContext,
        draft: FlashcardDraft,
    ) -> Result<Flashcard> {
        crate::metrics::record_store_op("flashcard", ctx.mode(), "create");
        match ctx {
            PersistenceContext::Remote { user_id } => {
                self.repo.create_flashcard(*user_id, draft).await
            }
            PersistenceContext::Local { guest_id } => {
                let now = Utc::now();
                let card = Flashcard {
                    id: Uuid::new_v4().to_string(),
                    deck_name: draft.deck_name,
                    front: draft.front,
                    back: draft.back,
                    is_known: draft.is_known,
                    subject: draft.subject,
                    created_at: now,
                    updated_at: now,
                };

                let mut items: Vec<Flashcard> = self.local.read(guest_id, FLASHCARDS_KEY);
                items.push(card.clone()); // deck order
                self.local.write(guest_id, FLASHCARDS_KEY, &items)?;
                Ok(card)
            }
        }
    }

    pub async fn update_flashcard(
        &self,
        ctx: &PersistenceContext,
        id: &str,
        patch: &FlashcardPatch,
    ) -> Result<Option<Flashcard>> {
        crate::metrics::record_store_op("flashcard", ctx.mode(), "update");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.update_flashcard(*user_id, id, patch).await,
                None => Ok(None),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Flashcard> = self.local.read(guest_id, FLASHCARDS_KEY);
                let Some(card) = items.iter_mut().find(|c| c.id == id) else {
                    return Ok(None);
                };
                patch.apply(card);
                card.updated_at = Utc::now();
                let updated = card.clone();
                self.local.write(guest_id, FLASHCARDS_KEY, &items)?;
                Ok(Some(updated))
            }
        }
    }

    pub async fn delete_flashcard(&self, ctx: &PersistenceContext, id: &str) -> Result<bool> {
        crate::metrics::record_store_op("flashcard", ctx.mode(), "delete");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.delete_flashcard(*user_id, id).await,
                None => Ok(false),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Flashcard> = self.local.read(guest_id, FLASHCARDS_KEY);
                let before = items.len();
                items.retain(|c| c.id != id);
                let removed = items.len() != before;
                if removed {
                    self.local.write(guest_id, FLASHCARDS_KEY, &items)?;
                }
                Ok(removed)
            }
        }
    }

    // ========================================================================
    // Quiz questions
    // ========================================================================

    pub async fn list_quiz_questions(&self, ctx: &PersistenceContext) -> Result<Vec<QuizQuestion>> {
        crate::metrics::record_store_op("quiz_question", ctx.mode(), "list");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.list_quiz_questions(*user_id).await,
            PersistenceContext::Local { guest_id } => {
                Ok(self.local.read(guest_id, QUIZ_QUESTIONS_KEY))
            }
        }
    }

    pub async fn create_quiz_question(
        &self,
        ctx: &PersistenceContext,
        draft: QuizQuestionDraft,
    ) -> Result<QuizQuestion> {
        crate::metrics::record_store_op("quiz_question", ctx.mode(), "create");
        match ctx {
            PersistenceContext::Remote { user_id } => {
                self.repo.create_quiz_question(*user_id, draft).await
            }
            PersistenceContext::Local { guest_id } => {
                domain::validate_quiz_shape(&draft.options, draft.correct_index)?;
                let now = Utc::now();
                let question = QuizQuestion {
                    id: Uuid::new_v4().to_string(),
                    quiz_name: draft.quiz_name,
                    question: draft.question,
                    options: draft.options,
                    correct_index: draft.correct_index,
                    created_at: now,
                    updated_at: now,
                };

                let mut items: Vec<QuizQuestion> = self.local.read(guest_id, QUIZ_QUESTIONS_KEY);
                items.push(question.clone());
                self.local.write(guest_id, QUIZ_QUESTIONS_KEY, &items)?;
                Ok(question)
            }
        }
    }

    pub async fn update_quiz_question(
        &self,
        ctx: &PersistenceContext,
        id: &str,
        patch: &QuizQuestionPatch,
    ) -> Result<Option<QuizQuestion>> {
        crate::metrics::record_store_op("quiz_question", ctx.mode(), "update");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.update_quiz_question(*user_id, id, patch).await,
                None => Ok(None),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<QuizQuestion> = self.local.read(guest_id, QUIZ_QUESTIONS_KEY);
                let Some(question) = items.iter_mut().find(|q| q.id == id) else {
                    return Ok(None);
                };

                let merged_options = patch.options.as_ref().unwrap_or(&question.options);
                let merged_index = patch.correct_index.unwrap_or(question.correct_index);
                domain::validate_quiz_shape(merged_options, merged_index)?;

                patch.apply(question);
                question.updated_at = Utc::now();
                let updated = question.clone();
                self.local.write(guest_id, QUIZ_QUESTIONS_KEY, &items)?;
                Ok(Some(updated))
            }
        }
    }

    pub async fn delete_quiz_question(&self, ctx: &PersistenceContext, id: &str) -> Result<bool> {
        crate::metrics::record_store_op("quiz_question", ctx.mode(), "delete");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.delete_quiz_question(*user_id, id).await,
                None => Ok(false),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<QuizQuestion> = self.local.read(guest_id, QUIZ_QUESTIONS_KEY);
                let before = items.len();
                items.retain(|q| q.id != id);
                let removed = items.len() != before;
                if removed {
                    self.local.write(guest_id, QUIZ_QUESTIONS_KEY, &items)?;
                }
                Ok(removed)
            }
        }
    }

    // ========================================================================
    // Comics
    // ========================================================================

    pub async fn list_comics(&self, ctx: &PersistenceContext) -> Result<Vec<Comic>> {
        crate::metrics::record_store_op("comic", ctx.mode(), "list");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.list_comics(*user_id).await,
            PersistenceContext::Local { guest_id } => Ok(self.local.read(guest_id, COMICS_KEY)),
        }
    }

    pub async fn create_comic(&self, ctx: &PersistenceContext, draft: ComicDraft) -> Result<Comic> {
        crate::metrics::record_store_op("comic", ctx.mode(), "create");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.create_comic(*user_id, draft).await,
            PersistenceContext::Local { guest_id } => {
                let now = Utc::now();
                let comic = Comic {
                    id: Uuid::new_v4().to_string(),
                    title: draft.title,
                    subject: draft.subject,
                    thumbnail: draft.thumbnail,
                    panels: draft.panels,
                    duration: draft.duration,
                    progress: 0,
                    created_at: now,
                    updated_at: now,
                };

                let mut items: Vec<Comic> = self.local.read(guest_id, COMICS_KEY);
                items.insert(0, comic.clone()); // newest first
                self.local.write(guest_id, COMICS_KEY, &items)?;
                Ok(comic)
            }
        }
    }

    pub async fn update_comic(
        &self,
        ctx: &PersistenceContext,
        id: &str,
        patch: &ComicPatch,
    ) -> Result<Option<Comic>> {
        crate::metrics::record_store_op("comic", ctx.mode(), "update");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.update_comic(*user_id, id, patch).await,
                None => Ok(None),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Comic> = self.local.read(guest_id, COMICS_KEY);
                let Some(comic) = items.iter_mut().find(|c| c.id == id) else {
                    return Ok(None);
                };
                patch.apply(comic);
                comic.updated_at = Utc::now();
                let updated = comic.clone();
                self.local.write(guest_id, COMICS_KEY, &items)?;
                Ok(Some(updated))
            }
        }
    }

    pub async fn delete_comic(&self, ctx: &PersistenceContext, id: &str) -> Result<bool> {
        crate::metrics::record_store_op("comic", ctx.mode(), "delete");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.delete_comic(*user_id, id).await,
                None => Ok(false),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Comic> = self.local.read(guest_id, COMICS_KEY);
                let before = items.len();
                items.retain(|c| c.id != id);
                let removed = items.len() != before;
                if removed {
                    self.local.write(guest_id, COMICS_KEY, &items)?;
                }
                Ok(removed)
            }
        }
    }

    // ========================================================================
    // Exams
    // ========================================================================

    pub async fn list_exams(&self, ctx: &PersistenceContext) -> Result<Vec<Exam>> {
        crate::metrics::record_store_op("exam", ctx.mode(), "list");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.list_exams(*user_id).await,
            PersistenceContext::Local { guest_id } => Ok(self.local.read(guest_id, EXAMS_KEY)),
        }
    }

    pub async fn create_exam(&self, ctx: &PersistenceContext, draft: ExamDraft) -> Result<Exam> {
        crate::metrics::record_store_op("exam", ctx.mode(), "create");
        match ctx {
            PersistenceContext::Remote { user_id } => self.repo.create_exam(*user_id, draft).await,
            PersistenceContext::Local { guest_id } => {
                let now = Utc::now();
                let progress = domain::exam_progress(&draft.topics);
                let exam = Exam {
                    id: Uuid::new_v4().to_string(),
                    title: draft.title,
                    subject: draft.subject,
                    exam_date: draft.exam_date,
                    topics: draft.topics,
                    progress,
                    created_at: now,
                    updated_at: now,
                };

                let mut items: Vec<Exam> = self.local.read(guest_id, EXAMS_KEY);
                items.push(exam.clone());
                items.sort_by_key(|e| e.exam_date); // date order
                self.local.write(guest_id, EXAMS_KEY, &items)?;
                Ok(exam)
            }
        }
    }

    pub async fn update_exam(
        &self,
        ctx: &PersistenceContext,
        id: &str,
        patch: &ExamPatch,
    ) -> Result<Option<Exam>> {
        crate::metrics::record_store_op("exam", ctx.mode(), "update");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.update_exam(*user_id, id, patch).await,
                None => Ok(None),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<Exam> = self.local.read(guest_id, EXAMS_KEY);
                let Some(exam) = items.iter_mut().find(|e| e.id == id) else {
                    return Ok(None);
                };
                patch.apply(exam); // recomputes progress on topic changes
                exam.updated_at = Utc::now();
                let updated = exam.clone();
                if patch.exam_date.is_some() {
                    items.sort_by_key(|e| e.exam_date);
                }
                self.local.write(guest_id, EXAMS_KEY, &items)?;
                Ok(Some(updated))
            }
        }
    }

    /// Delete an exam and cascade to its study sessions, in both arms
    pub async fn delete_exam(&self, ctx: &PersistenceContext, id: &str) -> Result<bool> {
        crate::metrics::record_store_op("exam", ctx.mode(), "delete");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.delete_exam(*user_id, id).await,
                None => Ok(false),
            },
            PersistenceContext::Local { guest_id } => {
                let mut exams: Vec<Exam> = self.local.read(guest_id, EXAMS_KEY);
                let before = exams.len();
                exams.retain(|e| e.id != id);
                if exams.len() == before {
                    return Ok(false);
                }
                self.local.write(guest_id, EXAMS_KEY, &exams)?;

                // Application-layer cascade for the local arm
                let mut sessions: Vec<StudySession> =
                    self.local.read(guest_id, STUDY_SESSIONS_KEY);
                let orphaned = sessions.len();
                sessions.retain(|s| s.exam_id.as_deref() != Some(id));
                if sessions.len() != orphaned {
                    self.local.write(guest_id, STUDY_SESSIONS_KEY, &sessions)?;
                }
                Ok(true)
            }
        }
    }

    // ========================================================================
    // Study sessions
    // ========================================================================

    pub async fn list_study_sessions(
        &self,
        ctx: &PersistenceContext,
    ) -> Result<Vec<StudySession>> {
        crate::metrics::record_store_op("study_session", ctx.mode(), "list");
        match ctx {
            PersistenceContext::Remote { user_id } => {
                self.repo.list_study_sessions(*user_id).await
            }
            PersistenceContext::Local { guest_id } => {
                Ok(self.local.read(guest_id, STUDY_SESSIONS_KEY))
            }
        }
    }

    pub async fn create_study_session(
        &self,
        ctx: &PersistenceContext,
        draft: StudySessionDraft,
    ) -> Result<StudySession> {
        crate::metrics::record_store_op("study_session", ctx.mode(), "create");
        match ctx {
            PersistenceContext::Remote { user_id } => {
                let exam_id = draft.exam_id.as_deref().and_then(remote_id);
                self.repo.create_study_session(*user_id, draft, exam_id).await
            }
            PersistenceContext::Local { guest_id } => {
                domain::validate_session_window(&draft.start_time, &draft.end_time)?;
                let now = Utc::now();
                let session = StudySession {
                    id: Uuid::new_v4().to_string(),
                    exam_id: draft.exam_id,
                    session_date: draft.session_date,
                    start_time: draft.start_time,
                    end_time: draft.end_time,
                    subject: draft.subject,
                    topic: draft.topic,
                    completed: draft.completed,
                    created_at: now,
                    updated_at: now,
                };

                let mut items: Vec<StudySession> = self.local.read(guest_id, STUDY_SESSIONS_KEY);
                items.push(session.clone());
                items.sort_by(|a, b| {
                    (a.session_date, a.start_time.as_str())
                        .cmp(&(b.session_date, b.start_time.as_str()))
                });
                self.local.write(guest_id, STUDY_SESSIONS_KEY, &items)?;
                Ok(session)
            }
        }
    }

    pub async fn update_study_session(
        &self,
        ctx: &PersistenceContext,
        id: &str,
        patch: &StudySessionPatch,
    ) -> Result<Option<StudySession>> {
        crate::metrics::record_store_op("study_session", ctx.mode(), "update");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => {
                    let exam_id = patch.exam_id.as_deref().and_then(remote_id);
                    self.repo
                        .update_study_session(*user_id, id, patch, exam_id)
                        .await
                }
                None => Ok(None),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<StudySession> = self.local.read(guest_id, STUDY_SESSIONS_KEY);
                let Some(session) = items.iter_mut().find(|s| s.id == id) else {
                    return Ok(None);
                };

                let merged_start = patch.start_time.as_deref().unwrap_or(&session.start_time);
                let merged_end = patch.end_time.as_deref().unwrap_or(&session.end_time);
                domain::validate_session_window(merged_start, merged_end)?;

                patch.apply(session);
                session.updated_at = Utc::now();
                let updated = session.clone();
                self.local.write(guest_id, STUDY_SESSIONS_KEY, &items)?;
                Ok(Some(updated))
            }
        }
    }

    pub async fn delete_study_session(&self, ctx: &PersistenceContext, id: &str) -> Result<bool> {
        crate::metrics::record_store_op("study_session", ctx.mode(), "delete");
        match ctx {
            PersistenceContext::Remote { user_id } => match remote_id(id) {
                Some(id) => self.repo.delete_study_session(*user_id, id).await,
                None => Ok(false),
            },
            PersistenceContext::Local { guest_id } => {
                let mut items: Vec<StudySession> = self.local.read(guest_id, STUDY_SESSIONS_KEY);
                let before = items.len();
                items.retain(|s| s.id != id);
                let removed = items.len() != before;
                if removed {
                    self.local.write(guest_id, STUDY_SESSIONS_KEY, &items)?;
                }
                Ok(removed)
            }
        }
    }

    /// Drop every collection for a guest context, used when a guest
    /// upgrades to an account or explicitly resets
    pub fn clear_guest(&self, guest_id: &str) -> Result<()> {
        self.local.clear(guest_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use crate::domain::ExamTopic;
    use chrono::NaiveDate;

    /// A store whose remote arm is disconnected: any accidental remote
    /// call from a guest-context operation fails the test
    fn guest_store(dir: &tempfile::TempDir) -> (StudyStore, PersistenceContext) {
        let store = StudyStore::new(
            Repository::new(DbPool::disconnected()),
            LocalStore::new(dir.path()),
        );
        let ctx = PersistenceContext::Local {
            guest_id: "guest-1".to_string(),
        };
        (store, ctx)
    }

    fn note_draft(title: &str) -> NoteDraft {
        NoteDraft {
            title: title.into(),
            content: "content".into(),
            subject: Some("History".into()),
            tags: vec!["wwii".into()],
            is_synthesis: false,
        }
    }

    fn exam_draft(topics: Vec<ExamTopic>) -> ExamDraft {
        ExamDraft {
            title: "Math Final".into(),
            subject: Some("Math".into()),
            exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            topics,
        }
    }

    #[tokio::test]
    async fn test_guest_create_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let created = store.create_note(&ctx, note_draft("Revolution")).await.unwrap();
        let listed = store.list_notes(&ctx).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
    }

    #[tokio::test]
    async fn test_guest_notes_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        store.create_note(&ctx, note_draft("first")).await.unwrap();
        store.create_note(&ctx, note_draft("second")).await.unwrap();

        let listed = store.list_notes(&ctx).await.unwrap();
        assert_eq!(listed[0].title, "second");
        assert_eq!(listed[1].title, "first");
    }

    #[tokio::test]
    async fn test_guest_update_merges_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let created = store.create_note(&ctx, note_draft("Draft")).await.unwrap();
        let patch = NotePatch {
            content: Some("Edited".into()),
            ..Default::default()
        };

        let updated = store
            .update_note(&ctx, &created.id, &patch)
            .await
            .unwrap()
            .expect("record exists");

        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.content, "Edited");
        assert!(updated.updated_at >= created.updated_at);

        let listed = store.list_notes(&ctx).await.unwrap();
        assert_eq!(listed[0].content, "Edited");
        assert_eq!(listed[0].tags, vec!["wwii".to_string()]);
    }

    #[tokio::test]
    async fn test_guest_update_missing_id_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let patch = NotePatch {
            title: Some("ghost".into()),
            ..Default::default()
        };
        let updated = store.update_note(&ctx, "no-such-id", &patch).await.unwrap();

        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_guest_delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let created = store.create_note(&ctx, note_draft("gone soon")).await.unwrap();
        assert!(store.delete_note(&ctx, &created.id).await.unwrap());
        assert!(!store.delete_note(&ctx, &created.id).await.unwrap());

        let listed = store.list_notes(&ctx).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_exam_create_derives_progress() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let exam = store
            .create_exam(
                &ctx,
                exam_draft(vec![
                    ExamTopic { name: "Algebra".into(), completed: false },
                    ExamTopic { name: "Geometry".into(), completed: false },
                ]),
            )
            .await
            .unwrap();

        assert_eq!(exam.progress, 0);
    }

    #[tokio::test]
    async fn test_exam_topic_toggle_recomputes_progress() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let exam = store
            .create_exam(
                &ctx,
                exam_draft(vec![
                    ExamTopic { name: "Algebra".into(), completed: false },
                    ExamTopic { name: "Geometry".into(), completed: false },
                ]),
            )
            .await
            .unwrap();

        let mut topics = exam.topics.clone();
        topics[0].completed = true;
        let patch = ExamPatch {
            topics: Some(topics),
            ..Default::default()
        };

        let updated = store
            .update_exam(&ctx, &exam.id, &patch)
            .await
            .unwrap()
            .expect("record exists");

        assert_eq!(updated.progress, 50);
    }

    #[tokio::test]
    async fn test_exam_delete_cascades_to_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let exam = store.create_exam(&ctx, exam_draft(vec![])).await.unwrap();

        let session = StudySessionDraft {
            exam_id: Some(exam.id.clone()),
            session_date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
            start_time: "09:00".into(),
            end_time: "10:30".into(),
            subject: Some("Math".into()),
            topic: Some("Algebra".into()),
            completed: false,
        };
        store.create_study_session(&ctx, session.clone()).await.unwrap();

        let unrelated = StudySessionDraft {
            exam_id: None,
            ..session
        };
        store.create_study_session(&ctx, unrelated).await.unwrap();

        assert!(store.delete_exam(&ctx, &exam.id).await.unwrap());

        let remaining = store.list_study_sessions(&ctx).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].exam_id.is_none());
    }

    #[tokio::test]
    async fn test_guest_quiz_shape_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let bad = QuizQuestionDraft {
            quiz_name: "Bio".into(),
            question: "What does chlorophyll absorb?".into(),
            options: vec!["light".into(), "water".into()],
            correct_index: 0,
        };
        assert!(store.create_quiz_question(&ctx, bad).await.is_err());
    }

    #[tokio::test]
    async fn test_guest_session_window_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        let backwards = StudySessionDraft {
            exam_id: None,
            session_date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
            start_time: "11:00".into(),
            end_time: "09:00".into(),
            subject: None,
            topic: None,
            completed: false,
        };
        assert!(store.create_study_session(&ctx, backwards).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_guest_drops_all_collections() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        store.create_note(&ctx, note_draft("temp")).await.unwrap();
        store.create_exam(&ctx, exam_draft(vec![])).await.unwrap();

        store.clear_guest("guest-1").unwrap();

        assert!(store.list_notes(&ctx).await.unwrap().is_empty());
        assert!(store.list_exams(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_contexts_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ctx) = guest_store(&dir);

        store.create_note(&ctx, note_draft("mine")).await.unwrap();

        let other = PersistenceContext::Local {
            guest_id: "guest-2".to_string(),
        };
        let listed = store.list_notes(&other).await.unwrap();
        assert!(listed.is_empty());
    }
}
