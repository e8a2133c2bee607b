//! Note entity

use crate::domain;
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    /// Ordered tag list as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    pub is_synthesis: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Convert into the owner-agnostic domain record, validating the JSON
    /// tag column at the boundary
    pub fn into_domain(self) -> errors::Result<domain::Note> {
        Ok(domain::Note {
            id: self.id.to_string(),
            title: self.title,
            content: self.content,
            subject: self.subject,
            tags: domain::parse_json_column(self.tags, "tags")?,
            is_synthesis: self.is_synthesis,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
