use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_chemicals_table::Migration),
            Box::new(m20240301_000003_create_locations_table::Migration),
            Box::new(m20240301_000004_create_experiments_table::Migration),
            Box::new(m20240301_000005_create_inventory_items_table::Migration),
            Box::new(m20240301_000006_create_inventory_changes_table::Migration),
            Box::new(m20240301_000007_create_audit_tables::Migration),
            Box::new(m20240301_000008_add_ledger_indexes::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::HashedPassword).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::IsAdmin)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Email,
        FullName,
        HashedPassword,
        IsActive,
        IsAdmin,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_chemicals_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_chemicals_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Chemicals::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Chemicals::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Chemicals::Name).string().not_null())
                        .col(
                            ColumnDef::new(Chemicals::CasNumber)
                                .string()
                                .null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Chemicals::Formula).string().null())
                        .col(ColumnDef::new(Chemicals::MolecularWeight).double().null())
                        .col(ColumnDef::new(Chemicals::Description).text().null())
                        .col(ColumnDef::new(Chemicals::HazardInformation).text().null())
                        .col(ColumnDef::new(Chemicals::StorageConditions).string().null())
                        .col(ColumnDef::new(Chemicals::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Chemicals::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Chemicals::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Chemicals {
        Table,
        Id,
        Name,
        CasNumber,
        Formula,
        MolecularWeight,
        Description,
        HazardInformation,
        StorageConditions,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_locations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Locations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Locations::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Locations::Description).text().null())
                        .col(ColumnDef::new(Locations::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Locations::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Locations {
        Table,
        Id,
        Name,
        Description,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_experiments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_experiments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Experiments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Experiments::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Experiments::Title).string().not_null())
                        .col(ColumnDef::new(Experiments::Description).text().null())
                        .col(ColumnDef::new(Experiments::Status).string().not_null())
                        .col(ColumnDef::new(Experiments::UserId).integer().not_null())
                        .col(ColumnDef::new(Experiments::StartDate).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Experiments::EndDate).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Experiments::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Experiments::UpdatedAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_experiments_user_id")
                                .from(Experiments::Table, Experiments::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Experiments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Experiments {
        Table,
        Id,
        Title,
        Description,
        Status,
        UserId,
        StartDate,
        EndDate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }
}

mod m20240301_000005_create_inventory_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ChemicalId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::LocationId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Unit).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::BatchNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ExpirationDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Supplier).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::AcquisitionDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::UpdatedAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_items_chemical_id")
                                .from(InventoryItems::Table, InventoryItems::ChemicalId)
                                .to(Chemicals::Table, Chemicals::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_items_location_id")
                                .from(InventoryItems::Table, InventoryItems::LocationId)
                                .to(Locations::Table, Locations::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        ChemicalId,
        LocationId,
        Quantity,
        Unit,
        BatchNumber,
        ExpirationDate,
        Supplier,
        AcquisitionDate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Chemicals {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Locations {
        Table,
        Id,
    }
}

mod m20240301_000006_create_inventory_changes_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_inventory_changes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryChanges::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryChanges::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryChanges::InventoryItemId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryChanges::UserId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryChanges::Delta)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryChanges::Reason).string().not_null())
                        .col(
                            ColumnDef::new(InventoryChanges::ExperimentId)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryChanges::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_changes_item_id")
                                .from(InventoryChanges::Table, InventoryChanges::InventoryItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_changes_user_id")
                                .from(InventoryChanges::Table, InventoryChanges::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_changes_experiment_id")
                                .from(InventoryChanges::Table, InventoryChanges::ExperimentId)
                                .to(Experiments::Table, Experiments::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryChanges::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryChanges {
        Table,
        Id,
        InventoryItemId,
        UserId,
        Delta,
        Reason,
        ExperimentId,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Experiments {
        Table,
        Id,
    }
}

mod m20240301_000007_create_audit_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000007_create_audit_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryAudits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryAudits::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryAudits::InventoryItemId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryAudits::UserId).integer().not_null())
                        .col(
                            ColumnDef::new(InventoryAudits::FieldName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryAudits::OldValue).text().not_null())
                        .col(ColumnDef::new(InventoryAudits::NewValue).text().not_null())
                        .col(ColumnDef::new(InventoryAudits::Action).string().not_null())
                        .col(
                            ColumnDef::new(InventoryAudits::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_audits_item_id")
                                .from(InventoryAudits::Table, InventoryAudits::InventoryItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ChemicalAudits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ChemicalAudits::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ChemicalAudits::ChemicalId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ChemicalAudits::UserId).integer().not_null())
                        .col(ColumnDef::new(ChemicalAudits::FieldName).string().not_null())
                        .col(ColumnDef::new(ChemicalAudits::OldValue).text().not_null())
                        .col(ColumnDef::new(ChemicalAudits::NewValue).text().not_null())
                        .col(ColumnDef::new(ChemicalAudits::Action).string().not_null())
                        .col(
                            ColumnDef::new(ChemicalAudits::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LocationAudits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LocationAudits::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(LocationAudits::LocationId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LocationAudits::UserId).integer().not_null())
                        .col(ColumnDef::new(LocationAudits::FieldName).string().not_null())
                        .col(ColumnDef::new(LocationAudits::OldValue).text().not_null())
                        .col(ColumnDef::new(LocationAudits::NewValue).text().not_null())
                        .col(ColumnDef::new(LocationAudits::Action).string().not_null())
                        .col(
                            ColumnDef::new(LocationAudits::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LocationAudits::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ChemicalAudits::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryAudits::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryAudits {
        Table,
        Id,
        InventoryItemId,
        UserId,
        FieldName,
        OldValue,
        NewValue,
        Action,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum ChemicalAudits {
        Table,
        Id,
        ChemicalId,
        UserId,
        FieldName,
        OldValue,
        NewValue,
        Action,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum LocationAudits {
        Table,
        Id,
        LocationId,
        UserId,
        FieldName,
        OldValue,
        NewValue,
        Action,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
    }
}

mod m20240301_000008_add_ledger_indexes {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000008_add_ledger_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_batch_number")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::BatchNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_changes_item_timestamp")
                        .table(InventoryChanges::Table)
                        .col(InventoryChanges::InventoryItemId)
                        .col(InventoryChanges::Timestamp)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_audits_item_timestamp")
                        .table(InventoryAudits::Table)
                        .col(InventoryAudits::InventoryItemId)
                        .col(InventoryAudits::Timestamp)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_audits_field_name")
                        .table(InventoryAudits::Table)
                        .col(InventoryAudits::FieldName)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_inventory_audits_field_name")
                        .table(InventoryAudits::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_inventory_audits_item_timestamp")
                        .table(InventoryAudits::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_inventory_changes_item_timestamp")
                        .table(InventoryChanges::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_inventory_items_batch_number")
                        .table(InventoryItems::Table)
                        .to_owned(),
                )
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        BatchNumber,
    }

    #[derive(DeriveIden)]
    enum InventoryChanges {
        Table,
        InventoryItemId,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum InventoryAudits {
        Table,
        InventoryItemId,
        FieldName,
        Timestamp,
    }
}
