//! `SeaORM` Entity for notifications table.

use poolbank_core::ledger::{LedgerError, Notification};
use poolbank_shared::types::{NotificationId, UserId};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use super::{parse_text, to_utc};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_number: Option<String>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub metadata: Json,
    pub is_read: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::UserId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Notification {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NotificationId::from_uuid(model.id),
            user_id: UserId::from_uuid(model.user_id),
            account_number: model.account_number,
            kind: parse_text(&model.kind)?,
            title: model.title,
            message: model.message,
            metadata: model.metadata,
            is_read: model.is_read,
            created_at: to_utc(model.created_at),
        })
    }
}

impl From<&Notification> for ActiveModel {
    fn from(n: &Notification) -> Self {
        Self {
            id: Set(n.id.into_inner()),
            user_id: Set(n.user_id.into_inner()),
            account_number: Set(n.account_number.clone()),
            kind: Set(n.kind.as_str().to_string()),
            title: Set(n.title.clone()),
            message: Set(n.message.clone()),
            metadata: Set(n.metadata.clone()),
            is_read: Set(n.is_read),
            created_at: Set(n.created_at.into()),
        }
    }
}
