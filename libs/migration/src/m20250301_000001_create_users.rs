use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(Users::FirstName))
                    .col(string(Users::LastName))
                    .col(string(Users::PasswordHash))
                    .col(
                        ColumnDef::new(Users::Role)
                            .text()
                            .not_null()
                            .default(Expr::cust("'user'")),
                    )
                    // Written only by the rating aggregator
                    .col(big_integer(Users::Rating).default(0))
                    .col(timestamp_with_time_zone_null(Users::RatingUpdatedAt))
                    .col(
                        timestamp_with_time_zone(Users::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Users::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Users::DeletedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE users ADD CONSTRAINT chk_users_role \
                 CHECK (role IN ('user', 'moderator', 'admin'))",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_created_at")
                    .table(Users::Table)
                    .col(Users::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Listing skips soft-deleted rows
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_users_active ON users (created_at) \
                 WHERE deleted_at IS NULL",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER users_touch_updated_at
                    BEFORE UPDATE ON users
                    FOR EACH ROW
                    WHEN (
                        (OLD.email, OLD.first_name, OLD.last_name, OLD.password_hash, OLD.role, OLD.deleted_at)
                        IS DISTINCT FROM
                        (NEW.email, NEW.first_name, NEW.last_name, NEW.password_hash, NEW.role, NEW.deleted_at)
                    )
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS users_touch_updated_at ON users")
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    PasswordHash,
    Role,
    Rating,
    RatingUpdatedAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
