//! Exam entity

use crate::domain;
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exams")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    pub exam_date: Date,

    /// Ordered topic checklist as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub topics: Json,

    /// Derived from the topic checklist, persisted for list views
    pub progress: i16,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_domain(self) -> errors::Result<domain::Exam> {
        Ok(domain::Exam {
            id: self.id.to_string(),
            title: self.title,
            subject: self.subject,
            exam_date: self.exam_date,
            topics: domain::parse_json_column(self.topics, "topics")?,
            progress: self.progress.clamp(0, 100) as u8,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::study_session::Entity")]
    StudySessions,
}

impl Related<super::study_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudySessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
