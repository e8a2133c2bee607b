//! Flashcard entity

use crate::domain;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flashcards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub deck_name: String,

    #[sea_orm(column_type = "Text")]
    pub front: String,

    #[sea_orm(column_type = "Text")]
    pub back: String,

    pub is_known: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_domain(self) -> domain::Flashcard {
        domain::Flashcard {
            id: self.id.to_string(),
            deck_name: self.deck_name,
            front: self.front,
            back: self.back,
            is_known: self.is_known,
            subject: self.subject,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
