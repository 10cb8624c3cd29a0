use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stocked lot of one chemical at one location.
///
/// `quantity` is never written directly by handlers; the ledger service is
/// the only code path that mutates it, and every mutation is paired with an
/// `inventory_change` row and an `inventory_audit` row in one transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub chemical_id: i32,
    pub location_id: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    pub unit: String,
    pub batch_number: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chemical::Entity",
        from = "Column::ChemicalId",
        to = "super::chemical::Column::Id"
    )]
    Chemical,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    #[sea_orm(has_many = "super::inventory_change::Entity")]
    InventoryChange,
}

impl Related<super::chemical::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chemical.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::inventory_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryChange.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
