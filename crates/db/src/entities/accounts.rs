//! `SeaORM` Entity for accounts table.

use poolbank_core::ledger::{Account, LedgerError};
use poolbank_shared::types::UserId;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{Set, Unchanged};
use serde::{Deserialize, Serialize};

use super::{parse_text, to_utc};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub account_number: String,
    pub full_name: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub held_amount: Decimal,
    pub is_frozen: bool,
    pub freeze_reason: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub daily_limit: Option<Decimal>,
    pub kyc_status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(model.id),
            account_number: model.account_number,
            full_name: model.full_name,
            balance: model.balance,
            held_amount: model.held_amount,
            is_frozen: model.is_frozen,
            freeze_reason: model.freeze_reason,
            daily_limit: model.daily_limit,
            kyc_status: parse_text(&model.kyc_status)?,
            created_at: to_utc(model.created_at),
            updated_at: to_utc(model.updated_at),
        })
    }
}

impl ActiveModel {
    /// Builds an insert model for a new account.
    #[must_use]
    pub fn for_insert(account: &Account) -> Self {
        Self {
            id: Set(account.id.into_inner()),
            account_number: Set(account.account_number.clone()),
            created_at: Set(account.created_at.into()),
            ..Self::for_update(account)
        }
    }

    /// Builds an update model writing every mutable column.
    ///
    /// The account number and creation time are immutable.
    #[must_use]
    pub fn for_update(account: &Account) -> Self {
        Self {
            id: Unchanged(account.id.into_inner()),
            account_number: Unchanged(account.account_number.clone()),
            full_name: Set(account.full_name.clone()),
            balance: Set(account.balance),
            held_amount: Set(account.held_amount),
            is_frozen: Set(account.is_frozen),
            freeze_reason: Set(account.freeze_reason.clone()),
            daily_limit: Set(account.daily_limit),
            kyc_status: Set(account.kyc_status.as_str().to_string()),
            created_at: Unchanged(account.created_at.into()),
            updated_at: Set(account.updated_at.into()),
        }
    }
}
