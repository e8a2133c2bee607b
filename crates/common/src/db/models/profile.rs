//! Profile entity, one-to-one with the authenticated user

use crate::domain;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,

    #[sea_orm(column_type = "Text", nullable)]
    pub first_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub school: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub grade: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub stripe_customer_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub subscription_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub subscription_status: Option<String>,

    pub subscription_cancel_at_period_end: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_domain(self) -> domain::Profile {
        domain::Profile {
            user_id: self.user_id.to_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            avatar_url: self.avatar_url,
            bio: self.bio,
            school: self.school,
            grade: self.grade,
            stripe_customer_id: self.stripe_customer_id,
            subscription_id: self.subscription_id,
            subscription_status: self.subscription_status,
            subscription_cancel_at_period_end: self.subscription_cancel_at_period_end,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
