//! SeaORM entity models
//!
//! Database entities for the remote (authenticated) persistence arm

mod comic;
mod exam;
mod flashcard;
mod note;
mod profile;
mod quiz_question;
mod study_session;

pub use note::{
    ActiveModel as NoteActiveModel, Column as NoteColumn, Entity as NoteEntity, Model as NoteModel,
};

pub use flashcard::{
    ActiveModel as FlashcardActiveModel, Column as FlashcardColumn, Entity as FlashcardEntity,
    Model as FlashcardModel,
};

pub use quiz_question::{
    ActiveModel as QuizQuestionActiveModel, Column as QuizQuestionColumn,
    Entity as QuizQuestionEntity, Model as QuizQuestionModel,
};

pub use comic::{
    ActiveModel as ComicActiveModel, Column as ComicColumn, Entity as ComicEntity,
    Model as ComicModel,
};

pub use exam::{
    ActiveModel as ExamActiveModel, Column as ExamColumn, Entity as ExamEntity, Model as ExamModel,
};

pub use study_session::{
    ActiveModel as StudySessionActiveModel, Column as StudySessionColumn,
    Entity as StudySessionEntity, Model as StudySessionModel,
};

pub use profile::{
    ActiveModel as ProfileActiveModel, Column as ProfileColumn, Entity as ProfileEntity,
    Model as ProfileModel,
};
