use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250101_000001_initial_schema::{Parties, Resources};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create grants table
        manager
            .create_table(
                Table::create()
                    .table(Grants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Grants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(integer(Grants::PartyId))
                    .col(integer(Grants::ResourceId))
                    .col(string(Grants::Privilege))
                    .col(big_integer(Grants::GrantedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grants_party")
                            .from(Grants::Table, Grants::PartyId)
                            .to(Parties::Table, Parties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grants_resource")
                            .from(Grants::Table, Grants::ResourceId)
                            .to(Resources::Table, Resources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_grants_party_resource_privilege")
                    .table(Grants::Table)
                    .col(Grants::PartyId)
                    .col(Grants::ResourceId)
                    .col(Grants::Privilege)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create closure_edges table: (child, ancestor), reflexive
        manager
            .create_table(
                Table::create()
                    .table(ClosureEdges::Table)
                    .if_not_exists()
                    .col(integer(ClosureEdges::ChildId))
                    .col(integer(ClosureEdges::AncestorId))
                    .primary_key(
                        Index::create()
                            .col(ClosureEdges::ChildId)
                            .col(ClosureEdges::AncestorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_closure_edges_child")
                            .from(ClosureEdges::Table, ClosureEdges::ChildId)
                            .to(Resources::Table, Resources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_closure_edges_ancestor")
                            .from(ClosureEdges::Table, ClosureEdges::AncestorId)
                            .to(Resources::Table, Resources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Descendant lookups during cascade and authorization queries
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_closure_edges_ancestor")
                    .table(ClosureEdges::Table)
                    .col(ClosureEdges::AncestorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClosureEdges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Grants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Grants {
    Table,
    Id,
    PartyId,
    ResourceId,
    Privilege,
    GrantedAt,
}

#[derive(DeriveIden)]
enum ClosureEdges {
    Table,
    ChildId,
    AncestorId,
}
