//! `SeaORM` Entity for the bank pool singleton.

use poolbank_core::ledger::Pool;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{Set, Unchanged};
use serde::{Deserialize, Serialize};

use super::to_utc;

/// Primary key of the only pool row.
pub const POOL_ID: i16 = 1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_pool")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i16,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub reserve_amount: Decimal,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Pool {
    fn from(model: Model) -> Self {
        Self {
            total_amount: model.total_amount,
            reserve_amount: model.reserve_amount,
            updated_at: to_utc(model.updated_at),
        }
    }
}

impl From<&Pool> for ActiveModel {
    fn from(pool: &Pool) -> Self {
        Self {
            id: Unchanged(POOL_ID),
            total_amount: Set(pool.total_amount),
            reserve_amount: Set(pool.reserve_amount),
            updated_at: Set(pool.updated_at.into()),
        }
    }
}
