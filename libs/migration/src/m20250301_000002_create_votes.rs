use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(pk_uuid(Votes::Id))
                    .col(uuid(Votes::VoterId))
                    .col(uuid(Votes::TargetId))
                    .col(small_integer(Votes::Value))
                    .col(
                        timestamp_with_time_zone(Votes::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_voter_id")
                            .from(Votes::Table, Votes::VoterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_target_id")
                            .from(Votes::Table, Votes::TargetId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One vote per (voter, target); the ledger upserts against this
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_voter_target")
                    .table(Votes::Table)
                    .col(Votes::VoterId)
                    .col(Votes::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_votes_target_id")
                    .table(Votes::Table)
                    .col(Votes::TargetId)
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "ALTER TABLE votes ADD CONSTRAINT chk_votes_value CHECK (value IN (-1, 1))",
        )
        .await?;

        db.execute_unprepared(
            "ALTER TABLE votes ADD CONSTRAINT chk_votes_not_self CHECK (voter_id <> target_id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Votes {
    Table,
    Id,
    VoterId,
    TargetId,
    Value,
    CreatedAt,
}
