use async_trait::async_trait;
use chrono::Utc;
use database::BaseRepository;
use database::text::contains_pattern;
use sea_orm::sea_query::{Expr, NullOrdering};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{blog_post, faq, media_asset};
use crate::error::{ContentError, ContentResult};
use crate::models::{
    BlogPost, Faq, FaqFilter, MediaAsset, MediaFilter, MediaKind, PostFilter, normalise_folder,
};
use crate::repository::{FaqRepository, MediaRepository, PostRepository};

fn limit_of(limit: usize) -> u64 {
    u64::try_from(limit).unwrap_or(u64::MAX)
}

/// Content storage over `blog_posts`, `faqs` and `media_assets`
pub struct PgContentRepository {
    posts: BaseRepository<blog_post::Entity>,
    faqs: BaseRepository<faq::Entity>,
    media: BaseRepository<media_asset::Entity>,
}

impl PgContentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            posts: BaseRepository::new(db.clone()),
            faqs: BaseRepository::new(db.clone()),
            media: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.posts.db()
    }
}

#[async_trait]
impl PostRepository for PgContentRepository {
    async fn create_post(&self, post: BlogPost) -> ContentResult<BlogPost> {
        let model = self.posts.insert(blog_post::ActiveModel::from(&post)).await?;
        tracing::info!(post_id = %model.id, slug = %model.slug, "Created post");
        Ok(model.into())
    }

    async fn get_post(&self, id: Uuid) -> ContentResult<Option<BlogPost>> {
        Ok(self.posts.find_by_id(id).await?.map(Into::into))
    }

    async fn get_post_by_slug(&self, slug: &str) -> ContentResult<Option<BlogPost>> {
        Ok(blog_post::Entity::find()
            .filter(blog_post::Column::Slug.eq(slug))
            .one(self.db())
            .await?
            .map(Into::into))
    }

    async fn list_posts(&self, filter: PostFilter) -> ContentResult<Vec<BlogPost>> {
        let mut query = blog_post::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(blog_post::Column::Status.eq(status));
        }
        if let Some(ref tag) = filter.tag {
            query = query.filter(Expr::cust_with_values(
                "? = ANY(tags)",
                [tag.trim().to_lowercase()],
            ));
        }
        if let Some(ref search) = filter.search {
            let pattern = contains_pattern(search.trim());
            query = query.filter(
                Condition::any()
                    .add(Expr::cust_with_values("title ILIKE ?", [pattern.clone()]))
                    .add(Expr::cust_with_values("excerpt ILIKE ?", [pattern])),
            );
        }

        let models = query
            .order_by_with_nulls(blog_post::Column::PublishedAt, Order::Desc, NullOrdering::Last)
            .order_by_desc(blog_post::Column::CreatedAt)
            .limit(limit_of(filter.limit))
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_post(&self, post: BlogPost) -> ContentResult<BlogPost> {
        let model = self.posts.update(blog_post::ActiveModel::from(&post)).await?;
        tracing::info!(post_id = %post.id, status = %post.status, "Updated post");
        Ok(model.into())
    }

    async fn delete_post(&self, id: Uuid) -> ContentResult<bool> {
        let rows = self.posts.delete_by_id(id).await?;
        if rows > 0 {
            tracing::info!(post_id = %id, "Deleted post");
        }
        Ok(rows > 0)
    }

    async fn post_slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> ContentResult<bool> {
        let mut query = blog_post::Entity::find().filter(blog_post::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(blog_post::Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }
}

#[async_trait]
impl FaqRepository for PgContentRepository {
    async fn create_faq(&self, faq: Faq) -> ContentResult<Faq> {
        let model = self.faqs.insert(faq::ActiveModel::from(&faq)).await?;
        tracing::info!(faq_id = %model.id, position = model.position, "Created FAQ");
        Ok(model.into())
    }

    async fn get_faq(&self, id: Uuid) -> ContentResult<Option<Faq>> {
        Ok(self.faqs.find_by_id(id).await?.map(Into::into))
    }

    async fn list_faqs(&self, filter: FaqFilter) -> ContentResult<Vec<Faq>> {
        let mut query = faq::Entity::find();

        if let Some(ref category) = filter.category {
            query = query.filter(Expr::cust_with_values(
                "LOWER(category) = ?",
                [category.trim().to_lowercase()],
            ));
        }
        if let Some(published) = filter.published {
            query = query.filter(faq::Column::IsPublished.eq(published));
        }

        let models = query
            .order_by_asc(faq::Column::Position)
            .order_by_asc(faq::Column::CreatedAt)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_faq(&self, faq: Faq) -> ContentResult<Faq> {
        Ok(self.faqs.update(faq::ActiveModel::from(&faq)).await?.into())
    }

    async fn delete_faq(&self, id: Uuid) -> ContentResult<bool> {
        Ok(self.faqs.delete_by_id(id).await? > 0)
    }

    async fn next_faq_position(&self) -> ContentResult<i32> {
        let max: Option<Option<i32>> = faq::Entity::find()
            .select_only()
            .column_as(faq::Column::Position.max(), "max_position")
            .into_tuple()
            .one(self.db())
            .await?;
        Ok(max.flatten().map_or(0, |p| p + 1))
    }

    async fn reorder_faqs(&self, ids: Vec<Uuid>) -> ContentResult<()> {
        let txn = self.db().begin().await?;
        let now = Utc::now();

        let mut missing = Vec::new();
        for (position, id) in ids.iter().enumerate() {
            let result = faq::Entity::update_many()
                .col_expr(faq::Column::Position, Expr::value(position as i32))
                .col_expr(faq::Column::UpdatedAt, Expr::value(now))
                .filter(faq::Column::Id.eq(*id))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                missing.push(*id);
            }
        }

        if !missing.is_empty() {
            txn.rollback().await?;
            return Err(ContentError::UnknownFaqs(missing));
        }

        txn.commit().await?;
        tracing::info!(count = ids.len(), "Reordered FAQs");
        Ok(())
    }
}

#[async_trait]
impl MediaRepository for PgContentRepository {
    async fn create_media(&self, asset: MediaAsset) -> ContentResult<MediaAsset> {
        let model = self.media.insert(media_asset::ActiveModel::from(&asset)).await?;
        tracing::info!(media_id = %model.id, folder = %model.folder, "Registered media asset");
        Ok(model.into())
    }

    async fn get_media(&self, id: Uuid) -> ContentResult<Option<MediaAsset>> {
        Ok(self.media.find_by_id(id).await?.map(Into::into))
    }

    async fn list_media(&self, filter: MediaFilter) -> ContentResult<Vec<MediaAsset>> {
        let mut query = media_asset::Entity::find();

        if let Some(ref folder) = filter.folder {
            query = query.filter(media_asset::Column::Folder.eq(normalise_folder(folder)));
        }
        match filter.kind {
            Some(MediaKind::Image) => {
                query = query.filter(media_asset::Column::MimeType.starts_with("image/"));
            }
            Some(MediaKind::Video) => {
                query = query.filter(media_asset::Column::MimeType.starts_with("video/"));
            }
            Some(MediaKind::Document) => {
                query = query.filter(
                    Condition::all()
                        .add(media_asset::Column::MimeType.not_like("image/%"))
                        .add(media_asset::Column::MimeType.not_like("video/%")),
                );
            }
            None => {}
        }
        if let Some(ref search) = filter.search {
            query = query.filter(Expr::cust_with_values(
                "file_name ILIKE ?",
                [contains_pattern(search.trim())],
            ));
        }

        let models = query
            .order_by_desc(media_asset::Column::CreatedAt)
            .order_by_desc(media_asset::Column::Id)
            .limit(limit_of(filter.limit))
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_media(&self, asset: MediaAsset) -> ContentResult<MediaAsset> {
        let mut active = media_asset::ActiveModel::from(&asset);
        // url, mime type and size describe the stored file and never change
        active.url = sea_orm::ActiveValue::NotSet;
        active.mime_type = sea_orm::ActiveValue::NotSet;
        active.size_bytes = sea_orm::ActiveValue::NotSet;
        active.updated_at = Set(Utc::now().into());
        Ok(self.media.update(active).await?.into())
    }

    async fn delete_media(&self, id: Uuid) -> ContentResult<bool> {
        let rows = self.media.delete_by_id(id).await?;
        if rows > 0 {
            tracing::info!(media_id = %id, "Deleted media asset");
        }
        Ok(rows > 0)
    }
}
