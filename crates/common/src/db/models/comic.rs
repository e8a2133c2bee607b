//! Comic entity

use crate::domain;
use crate::errors;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    /// Emoji glyph shown on the library card
    #[sea_orm(column_type = "Text", nullable)]
    pub thumbnail: Option<String>,

    /// Ordered panel list as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub panels: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub duration: Option<String>,

    pub progress: i16,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_domain(self) -> errors::Result<domain::Comic> {
        Ok(domain::Comic {
            id: self.id.to_string(),
            title: self.title,
            subject: self.subject,
            thumbnail: self.thumbnail,
            panels: domain::parse_json_column(self.panels, "panels")?,
            duration: self.duration,
            progress: self.progress.clamp(0, 100) as u8,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
