//! `SeaORM` Entity for audit_log table.

use poolbank_core::ledger::{AuditEntry, LedgerError};
use poolbank_shared::types::{AuditEntryId, UserId};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use super::{parse_text, to_utc};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_role: String,
    pub action: String,
    pub target_account: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    pub metadata: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AuditEntry {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AuditEntryId::from_uuid(model.id),
            actor_id: model.actor_id.map(UserId::from_uuid),
            actor_role: parse_text(&model.actor_role)?,
            action: parse_text(&model.action)?,
            target_account: model.target_account,
            amount: model.amount,
            reason: model.reason,
            metadata: model.metadata,
            created_at: to_utc(model.created_at),
        })
    }
}

impl From<&AuditEntry> for ActiveModel {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: Set(entry.id.into_inner()),
            actor_id: Set(entry.actor_id.map(UserId::into_inner)),
            actor_role: Set(entry.actor_role.as_str().to_string()),
            action: Set(entry.action.as_str().to_string()),
            target_account: Set(entry.target_account.clone()),
            amount: Set(entry.amount),
            reason: Set(entry.reason.clone()),
            metadata: Set(entry.metadata.clone()),
            created_at: Set(entry.created_at.into()),
        }
    }
}
