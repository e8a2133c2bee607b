//! Study session entity

use crate::domain;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Cascades with the referenced exam at the store layer
    pub exam_id: Option<Uuid>,

    pub session_date: Date,

    /// "HH:MM", 24-hour clock
    #[sea_orm(column_type = "Text")]
    pub start_time: String,

    #[sea_orm(column_type = "Text")]
    pub end_time: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub topic: Option<String>,

    pub completed: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_domain(self) -> domain::StudySession {
        domain::StudySession {
            id: self.id.to_string(),
            exam_id: self.exam_id.map(|id| id.to_string()),
            session_date: self.session_date,
            start_time: self.start_time,
            end_time: self.end_time,
            subject: self.subject,
            topic: self.topic,
            completed: self.completed,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::exam::Entity",
        from = "Column::ExamId",
        to = "super::exam::Column::Id",
        on_delete = "Cascade"
    )]
    Exam,
}

impl Related<super::exam::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exam.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
