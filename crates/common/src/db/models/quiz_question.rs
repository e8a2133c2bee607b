//! Quiz question entity

use crate::domain;
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_questions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub quiz_name: String,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    /// Fixed list of four option strings as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub options: Json,

    pub correct_index: i16,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_domain(self) -> errors::Result<domain::QuizQuestion> {
        Ok(domain::QuizQuestion {
            id: self.id.to_string(),
            quiz_name: self.quiz_name,
            question: self.question,
            options: domain::parse_json_column(self.options, "options")?,
            correct_index: self.correct_index as u8,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
