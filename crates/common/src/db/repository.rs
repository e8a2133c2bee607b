//! Repository pattern for the remote persistence arm
//!
//! Every query, update, and delete is scoped by owner id in the same call;
//! ownership is never checked as a separate step that could race with the
//! mutation. Records cross this boundary as domain types, with JSON columns
//! validated on every read.

use crate::db::DbPool;
use crate::db::models::*;
use crate::domain::{
    self, Comic, ComicDraft, ComicPatch, Exam, ExamDraft, ExamPatch, Flashcard, FlashcardDraft,
    FlashcardPatch, Note, NoteDraft, NotePatch, Profile, ProfilePatch, QuizQuestion,
    QuizQuestionDraft, QuizQuestionPatch, StudySession, StudySessionDraft, StudySessionPatch,
};
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Repository for owner-scoped data access
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Note Operations
    // ========================================================================

    pub async fn create_note(&self, user_id: Uuid, draft: NoteDraft) -> Result<Note> {
        let now = chrono::Utc::now();

        let note = NoteActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(draft.title),
            content: Set(draft.content),
            subject: Set(draft.subject),
            tags: Set(domain::to_json_column(&draft.tags)?),
            is_synthesis: Set(draft.is_synthesis),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        note.insert(self.conn()).await?.into_domain()
    }

    /// Notes for an owner, newest first
    pub async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>> {
        NoteEntity::find()
            .filter(NoteColumn::UserId.eq(user_id))
            .order_by_desc(NoteColumn::CreatedAt)
            .all(self.conn())
            .await?
            .into_iter()
            .map(NoteModel::into_domain)
            .collect()
    }

    /// Scoped update; `None` when no row matches id and owner
    pub async fn update_note(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &NotePatch,
    ) -> Result<Option<Note>> {
        let Some(existing) = NoteEntity::find_by_id(id)
            .filter(NoteColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let mut active: NoteActiveModel = existing.into();
        if let Some(ref title) = patch.title {
            active.title = Set(title.clone());
        }
        if let Some(ref content) = patch.content {
            active.content = Set(content.clone());
        }
        if let Some(ref subject) = patch.subject {
            active.subject = Set(Some(subject.clone()));
        }
        if let Some(ref tags) = patch.tags {
            active.tags = Set(domain::to_json_column(tags)?);
        }
        if let Some(is_synthesis) = patch.is_synthesis {
            active.is_synthesis = Set(is_synthesis);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await?.into_domain().map(Some)
    }

    pub async fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = NoteEntity::delete_many()
            .filter(NoteColumn::Id.eq(id))
            .filter(NoteColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Flashcard Operations
    // ========================================================================

    pub async fn create_flashcard(&self, user_id: Uuid, draft: FlashcardDraft) -> Result<Flashcard> {
        let now = chrono::Utc::now();

        let card = FlashcardActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            deck_name: Set(draft.deck_name),
            front: Set(draft.front),
            back: Set(draft.back),
            is_known: Set(draft.is_known),
            subject: Set(draft.subject),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(card.insert(self.conn()).await?.into_domain())
    }

    /// Flashcards for an owner in deck order (oldest first)
    pub async fn list_flashcards(&self, user_id: Uuid) -> Result<Vec<Flashcard>> {
        Ok(FlashcardEntity::find()
            .filter(FlashcardColumn::UserId.eq(user_id))
            .order_by_asc(FlashcardColumn::CreatedAt)
            .all(self.conn())
            .await?
            .into_iter()
            .map(FlashcardModel::into_domain)
            .collect())
    }

    pub async fn update_flashcard(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &FlashcardPatch,
    ) -> Result<Option<Flashcard>> {
        let Some(existing) = FlashcardEntity::find_by_id(id)
            .filter(FlashcardColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let mut active: FlashcardActiveModel = existing.into();
        if let Some(ref deck_name) = patch.deck_name {
            active.deck_name = Set(deck_name.clone());
        }
        if let Some(ref front) = patch.front {
            active.front = Set(front.clone());
        }
        if let Some(ref back) = patch.back {
            active.back = Set(back.clone());
        }
        if let Some(is_known) = patch.is_known {
            active.is_known = Set(is_known);
        }
        if let Some(ref subject) = patch.subject {
            active.subject = Set(Some(subject.clone()));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(Some(active.update(self.conn()).await?.into_domain()))
    }

    pub async fn delete_flashcard(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = FlashcardEntity::delete_many()
            .filter(FlashcardColumn::Id.eq(id))
            .filter(FlashcardColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Quiz Question Operations
    // ========================================================================

    pub async fn create_quiz_question(
        &self,
        user_id: Uuid,
        draft: QuizQuestionDraft,
    ) -> Result<QuizQuestion> {
        domain::validate_quiz_shape(&draft.options, draft.correct_index)?;
        let now = chrono::Utc::now();

        let question = QuizQuestionActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            quiz_name: Set(draft.quiz_name),
            question: Set(draft.question),
            options: Set(domain::to_json_column(&draft.options)?),
            correct_index: Set(i16::from(draft.correct_index)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        question.insert(self.conn()).await?.into_domain()
    }

    pub async fn list_quiz_questions(&self, user_id: Uuid) -> Result<Vec<QuizQuestion>> {
        QuizQuestionEntity::find()
            .filter(QuizQuestionColumn::UserId.eq(user_id))
            .order_by_asc(QuizQuestionColumn::CreatedAt)
            .all(self.conn())
            .await?
            .into_iter()
            .map(QuizQuestionModel::into_domain)
            .collect()
    }

    pub async fn update_quiz_question(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &QuizQuestionPatch,
    ) -> Result<Option<QuizQuestion>> {
        let Some(existing) = QuizQuestionEntity::find_by_id(id)
            .filter(QuizQuestionColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        // Validate the post-merge shape before touching the row
        let merged_options = patch
            .options
            .clone()
            .map(Ok)
            .unwrap_or_else(|| domain::parse_json_column(existing.options.clone(), "options"))?;
        let merged_index = patch.correct_index.unwrap_or(existing.correct_index as u8);
        domain::validate_quiz_shape(&merged_options, merged_index)?;

        let mut active: QuizQuestionActiveModel = existing.into();
        if let Some(ref quiz_name) = patch.quiz_name {
            active.quiz_name = Set(quiz_name.clone());
        }
        if let Some(ref question) = patch.question {
            active.question = Set(question.clone());
        }
        if let Some(ref options) = patch.options {
            active.options = Set(domain::to_json_column(options)?);
        }
        if let Some(correct_index) = patch.correct_index {
            active.correct_index = Set(i16::from(correct_index));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await?.into_domain().map(Some)
    }

    pub async fn delete_quiz_question(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = QuizQuestionEntity::delete_many()
            .filter(QuizQuestionColumn::Id.eq(id))
            .filter(QuizQuestionColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Comic Operations
    // ========================================================================

    pub async fn create_comic(&self, user_id: Uuid, draft: ComicDraft) -> Result<Comic> {
        let now = chrono::Utc::now();

        let comic = ComicActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(draft.title),
            subject: Set(draft.subject),
            thumbnail: Set(draft.thumbnail),
            panels: Set(domain::to_json_column(&draft.panels)?),
            duration: Set(draft.duration),
            progress: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        comic.insert(self.conn()).await?.into_domain()
    }

    /// Comics for an owner, newest first
    pub async fn list_comics(&self, user_id: Uuid) -> Result<Vec<Comic>> {
        ComicEntity::find()
            .filter(ComicColumn::UserId.eq(user_id))
            .order_by_desc(ComicColumn::CreatedAt)
            .all(self.conn())
            .await?
            .into_iter()
            .map(ComicModel::into_domain)
            .collect()
    }

    pub async fn update_comic(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &ComicPatch,
    ) -> Result<Option<Comic>> {
        let Some(existing) = ComicEntity::find_by_id(id)
            .filter(ComicColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let mut active: ComicActiveModel = existing.into();
        if let Some(ref title) = patch.title {
            active.title = Set(title.clone());
        }
        if let Some(ref subject) = patch.subject {
            active.subject = Set(Some(subject.clone()));
        }
        if let Some(ref thumbnail) = patch.thumbnail {
            active.thumbnail = Set(Some(thumbnail.clone()));
        }
        if let Some(ref panels) = patch.panels {
            active.panels = Set(domain::to_json_column(panels)?);
        }
        if let Some(ref duration) = patch.duration {
            active.duration = Set(Some(duration.clone()));
        }
        if let Some(progress) = patch.progress {
            active.progress = Set(i16::from(progress.min(100)));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await?.into_domain().map(Some)
    }

    pub async fn delete_comic(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ComicEntity::delete_many()
            .filter(ComicColumn::Id.eq(id))
            .filter(ComicColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Exam Operations
    // ========================================================================

    pub async fn create_exam(&self, user_id: Uuid, draft: ExamDraft) -> Result<Exam> {
        let now = chrono::Utc::now();
        let progress = domain::exam_progress(&draft.topics);

        let exam = ExamActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(draft.title),
            subject: Set(draft.subject),
            exam_date: Set(draft.exam_date),
            topics: Set(domain::to_json_column(&draft.topics)?),
            progress: Set(i16::from(progress)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        exam.insert(self.conn()).await?.into_domain()
    }

    /// Exams for an owner in date order
    pub async fn list_exams(&self, user_id: Uuid) -> Result<Vec<Exam>> {
        ExamEntity::find()
            .filter(ExamColumn::UserId.eq(user_id))
            .order_by_asc(ExamColumn::ExamDate)
            .all(self.conn())
            .await?
            .into_iter()
            .map(ExamModel::into_domain)
            .collect()
    }

    /// Scoped update; progress is recomputed whenever the topic list changes
    pub async fn update_exam(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &ExamPatch,
    ) -> Result<Option<Exam>> {
        let Some(existing) = ExamEntity::find_by_id(id)
            .filter(ExamColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let mut active: ExamActiveModel = existing.into();
        if let Some(ref title) = patch.title {
            active.title = Set(title.clone());
        }
        if let Some(ref subject) = patch.subject {
            active.subject = Set(Some(subject.clone()));
        }
        if let Some(exam_date) = patch.exam_date {
            active.exam_date = Set(exam_date);
        }
        if let Some(ref topics) = patch.topics {
            active.topics = Set(domain::to_json_column(topics)?);
            active.progress = Set(i16::from(domain::exam_progress(topics)));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await?.into_domain().map(Some)
    }

    /// Delete an exam and every study session that references it. The FK
    /// cascades as well; the explicit delete keeps the behavior identical
    /// for stores provisioned without the constraint.
    pub async fn delete_exam(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        StudySessionEntity::delete_many()
            .filter(StudySessionColumn::ExamId.eq(id))
            .filter(StudySessionColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        let result = ExamEntity::delete_many()
            .filter(ExamColumn::Id.eq(id))
            .filter(ExamColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Study Session Operations
    // ========================================================================

    pub async fn create_study_session(
        &self,
        user_id: Uuid,
        draft: StudySessionDraft,
        exam_id: Option<Uuid>,
    ) -> Result<StudySession> {
        domain::validate_session_window(&draft.start_time, &draft.end_time)?;
        let now = chrono::Utc::now();

        let session = StudySessionActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            exam_id: Set(exam_id),
            session_date: Set(draft.session_date),
            start_time: Set(draft.start_time),
            end_time: Set(draft.end_time),
            subject: Set(draft.subject),
            topic: Set(draft.topic),
            completed: Set(draft.completed),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(session.insert(self.conn()).await?.into_domain())
    }

    /// Sessions for an owner, chronological
    pub async fn list_study_sessions(&self, user_id: Uuid) -> Result<Vec<StudySession>> {
        Ok(StudySessionEntity::find()
            .filter(StudySessionColumn::UserId.eq(user_id))
            .order_by_asc(StudySessionColumn::SessionDate)
            .order_by_asc(StudySessionColumn::StartTime)
            .all(self.conn())
            .await?
            .into_iter()
            .map(StudySessionModel::into_domain)
            .collect())
    }

    pub async fn update_study_session(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &StudySessionPatch,
        exam_id: Option<Uuid>,
    ) -> Result<Option<StudySession>> {
        let Some(existing) = StudySessionEntity::find_by_id(id)
            .filter(StudySessionColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let merged_start = patch.start_time.as_deref().unwrap_or(&existing.start_time);
        let merged_end = patch.end_time.as_deref().unwrap_or(&existing.end_time);
        domain::validate_session_window(merged_start, merged_end)?;

        let mut active: StudySessionActiveModel = existing.into();
        if patch.exam_id.is_some() {
            active.exam_id = Set(exam_id);
        }
        if let Some(session_date) = patch.session_date {
            active.session_date = Set(session_date);
        }
        if let Some(ref start_time) = patch.start_time {
            active.start_time = Set(start_time.clone());
        }
        if let Some(ref end_time) = patch.end_time {
            active.end_time = Set(end_time.clone());
        }
        if let Some(ref subject) = patch.subject {
            active.subject = Set(Some(subject.clone()));
        }
        if let Some(ref topic) = patch.topic {
            active.topic = Set(Some(topic.clone()));
        }
        if let Some(completed) = patch.completed {
            active.completed = Set(completed);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(Some(active.update(self.conn()).await?.into_domain()))
    }

    pub async fn delete_study_session(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = StudySessionEntity::delete_many()
            .filter(StudySessionColumn::Id.eq(id))
            .filter(StudySessionColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Profile Operations
    // ========================================================================

    /// Fetch the profile, creating an empty one on first access
    pub async fn get_or_create_profile(&self, user_id: Uuid) -> Result<Profile> {
        if let Some(existing) = ProfileEntity::find_by_id(user_id).one(self.conn()).await? {
            return Ok(existing.into_domain());
        }

        let now = chrono::Utc::now();
        let profile = ProfileActiveModel {
            user_id: Set(user_id),
            first_name: Set(None),
            last_name: Set(None),
            avatar_url: Set(None),
            bio: Set(None),
            school: Set(None),
            grade: Set(None),
            stripe_customer_id: Set(None),
            subscription_id: Set(None),
            subscription_status: Set(None),
            subscription_cancel_at_period_end: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(profile.insert(self.conn()).await?.into_domain())
    }

    pub async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> Result<Profile> {
        // Ensure the row exists before patching
        self.get_or_create_profile(user_id).await?;

        let existing = ProfileEntity::find_by_id(user_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| crate::errors::AppError::ProfileNotFound {
                user_id: user_id.to_string(),
            })?;

        let mut active: ProfileActiveModel = existing.into();
        if let Some(ref first_name) = patch.first_name {
            active.first_name = Set(Some(first_name.clone()));
        }
        if let Some(ref last_name) = patch.last_name {
            active.last_name = Set(Some(last_name.clone()));
        }
        if let Some(ref avatar_url) = patch.avatar_url {
            active.avatar_url = Set(Some(avatar_url.clone()));
        }
        if let Some(ref bio) = patch.bio {
            active.bio = Set(Some(bio.clone()));
        }
        if let Some(ref school) = patch.school {
            active.school = Set(Some(school.clone()));
        }
        if let Some(ref grade) = patch.grade {
            active.grade = Set(Some(grade.clone()));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(self.conn()).await?.into_domain())
    }

    /// Persist billing identifiers after checkout completes
    pub async fn set_profile_billing(
        &self,
        user_id: Uuid,
        customer_id: &str,
        subscription_id: Option<&str>,
        status: &str,
    ) -> Result<Profile> {
        self.get_or_create_profile(user_id).await?;

        let existing = ProfileEntity::find_by_id(user_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| crate::errors::AppError::ProfileNotFound {
                user_id: user_id.to_string(),
            })?;

        let mut active: ProfileActiveModel = existing.into();
        active.stripe_customer_id = Set(Some(customer_id.to_string()));
        active.subscription_id = Set(subscription_id.map(String::from));
        active.subscription_status = Set(Some(status.to_string()));
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(self.conn()).await?.into_domain())
    }

    /// Update subscription state from a webhook event, located by the
    /// provider's customer id
    pub async fn update_subscription_by_customer(
        &self,
        customer_id: &str,
        subscription_id: Option<&str>,
        status: &str,
        cancel_at_period_end: bool,
    ) -> Result<Option<Profile>> {
        let Some(existing) = ProfileEntity::find()
            .filter(ProfileColumn::StripeCustomerId.eq(customer_id))
            .one(self.conn())
            .await?
        else {
            return Ok(None);
        };

        let mut active: ProfileActiveModel = existing.into();
        if let Some(sub) = subscription_id {
            active.subscription_id = Set(Some(sub.to_string()));
        }
        active.subscription_status = Set(Some(status.to_string()));
        active.subscription_cancel_at_period_end = Set(cancel_at_period_end);
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(Some(active.update(self.conn()).await?.into_domain()))
    }
}
