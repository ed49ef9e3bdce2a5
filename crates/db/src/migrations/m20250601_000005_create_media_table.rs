//! Create `media` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Media::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Media::ReportId).string_len(32).not_null())
                    .col(ColumnDef::new(Media::FileName).string_len(256).not_null())
                    .col(ColumnDef::new(Media::FilePath).string_len(512).not_null())
                    .col(ColumnDef::new(Media::FileSize).big_integer().not_null())
                    .col(
                        ColumnDef::new(Media::ContentType)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Media::MediaType)
                            .string_len(10)
                            .not_null()
                            .default("IMAGE"),
                    )
                    .col(
                        ColumnDef::new(Media::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_media_report")
                            .from(Media::Table, Media::ReportId)
                            .to(Report::Table, Report::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_report_id")
                    .table(Media::Table)
                    .col(Media::ReportId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Media::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Media {
    Table,
    Id,
    ReportId,
    FileName,
    FilePath,
    FileSize,
    ContentType,
    MediaType,
    UploadedAt,
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
}
