//! `SeaORM` Entity for transactions table.

use poolbank_core::ledger::{LedgerError, Transaction};
use poolbank_shared::types::{TransactionId, UserId};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use super::{parse_text, to_utc};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub from_user: Option<Uuid>,
    pub to_user: Option<Uuid>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub pool_delta: Decimal,
    pub status: String,
    pub reference: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_flags::Entity")]
    TransactionFlags,
}

impl Related<super::transaction_flags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionFlags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TransactionId::from_uuid(model.id),
            kind: parse_text(&model.kind)?,
            from_account: model.from_account,
            to_account: model.to_account,
            from_user: model.from_user.map(UserId::from_uuid),
            to_user: model.to_user.map(UserId::from_uuid),
            from_name: model.from_name,
            to_name: model.to_name,
            amount: model.amount,
            pool_delta: model.pool_delta,
            status: parse_text(&model.status)?,
            reference: model.reference,
            created_at: to_utc(model.created_at),
        })
    }
}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: Set(tx.id.into_inner()),
            kind: Set(tx.kind.as_str().to_string()),
            from_account: Set(tx.from_account.clone()),
            to_account: Set(tx.to_account.clone()),
            from_user: Set(tx.from_user.map(UserId::into_inner)),
            to_user: Set(tx.to_user.map(UserId::into_inner)),
            from_name: Set(tx.from_name.clone()),
            to_name: Set(tx.to_name.clone()),
            amount: Set(tx.amount),
            pool_delta: Set(tx.pool_delta),
            status: Set(tx.status.as_str().to_string()),
            reference: Set(tx.reference.clone()),
            created_at: Set(tx.created_at.into()),
        }
    }
}
