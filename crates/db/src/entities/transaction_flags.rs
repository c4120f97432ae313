//! `SeaORM` Entity for transaction_flags table.

use poolbank_core::ledger::{Flag, LedgerError};
use poolbank_shared::types::{FlagId, TransactionId};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use super::{parse_text, to_utc};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_flags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub reason: Option<String>,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Flag {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FlagId::from_uuid(model.id),
            transaction_id: TransactionId::from_uuid(model.transaction_id),
            reason: model.reason,
            status: parse_text(&model.status)?,
            created_at: to_utc(model.created_at),
        })
    }
}

impl From<&Flag> for ActiveModel {
    fn from(flag: &Flag) -> Self {
        Self {
            id: Set(flag.id.into_inner()),
            transaction_id: Set(flag.transaction_id.into_inner()),
            reason: Set(flag.reason.clone()),
            status: Set(flag.status.as_str().to_string()),
            created_at: Set(flag.created_at.into()),
        }
    }
}
