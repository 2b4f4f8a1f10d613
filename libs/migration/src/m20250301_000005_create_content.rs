use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

use crate::common::{add_touch_trigger, created_at, drop_touch_trigger, text_array};

#[derive(DeriveMigrationName)]
pub struct Migration;

const TABLES: [&str; 3] = ["blog_posts", "faqs", "media_assets"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let statuses = [PostStatus::Draft, PostStatus::Published, PostStatus::Archived];
        manager
            .create_type(
                Type::create()
                    .as_enum(PostStatus::Enum)
                    .values(statuses)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BlogPosts::Table)
                    .if_not_exists()
                    .col(pk_uuid(BlogPosts::Id))
                    .col(string(BlogPosts::Title))
                    .col(string(BlogPosts::Slug).unique_key())
                    .col(text_null(BlogPosts::Excerpt))
                    .col(text(BlogPosts::Body))
                    .col(string_null(BlogPosts::CoverImageUrl))
                    .col(string_null(BlogPosts::AuthorName))
                    .col(text_array(BlogPosts::Tags))
                    .col(
                        ColumnDef::new(BlogPosts::Status)
                            .enumeration(PostStatus::Enum, statuses)
                            .not_null()
                            .default("draft"),
                    )
                    .col(timestamp_with_time_zone_null(BlogPosts::PublishedAt))
                    .col(created_at(BlogPosts::CreatedAt))
                    .col(created_at(BlogPosts::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_status_published_at")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::Status)
                    .col(BlogPosts::PublishedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Faqs::Table)
                    .if_not_exists()
                    .col(pk_uuid(Faqs::Id))
                    .col(text(Faqs::Question))
                    .col(text(Faqs::Answer))
                    .col(string_null(Faqs::Category))
                    .col(integer(Faqs::Position).default(0))
                    .col(boolean(Faqs::IsPublished).default(true))
                    .col(created_at(Faqs::CreatedAt))
                    .col(created_at(Faqs::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MediaAssets::Table)
                    .if_not_exists()
                    .col(pk_uuid(MediaAssets::Id))
                    .col(string(MediaAssets::FileName))
                    .col(string(MediaAssets::Url))
                    .col(string(MediaAssets::MimeType))
                    .col(big_integer(MediaAssets::SizeBytes))
                    .col(integer_null(MediaAssets::Width))
                    .col(integer_null(MediaAssets::Height))
                    .col(string_null(MediaAssets::AltText))
                    .col(string(MediaAssets::Folder).default("/"))
                    .col(created_at(MediaAssets::CreatedAt))
                    .col(created_at(MediaAssets::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_assets_folder")
                    .table(MediaAssets::Table)
                    .col(MediaAssets::Folder)
                    .to_owned(),
            )
            .await?;

        for table in TABLES {
            add_touch_trigger(manager, table).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in TABLES {
            drop_touch_trigger(manager, table).await?;
        }

        manager
            .drop_table(Table::drop().table(MediaAssets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Faqs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BlogPosts::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(PostStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum PostStatus {
    #[sea_orm(iden = "post_status")]
    Enum,
    Draft,
    Published,
    Archived,
}

#[derive(DeriveIden)]
enum BlogPosts {
    Table,
    Id,
    Title,
    Slug,
    Excerpt,
    Body,
    CoverImageUrl,
    AuthorName,
    Tags,
    Status,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Faqs {
    Table,
    Id,
    Question,
    Answer,
    Category,
    Position,
    IsPublished,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MediaAssets {
    Table,
    Id,
    FileName,
    Url,
    MimeType,
    SizeBytes,
    Width,
    Height,
    AltText,
    Folder,
    CreatedAt,
    UpdatedAt,
}
