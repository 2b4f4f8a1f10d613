use chrono::Utc;
use database::text::{slug_candidate, slugify};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ContentError, ContentResult};
use crate::models::{
    BlogPost, CreateFaq, CreatePost, Faq, FaqFilter, MAX_PAGE_SIZE, MediaAsset, MediaFilter,
    PostFilter, PostStatus, RegisterMedia, ReorderFaqs, UpdateFaq, UpdateMedia, UpdatePost,
};
use crate::repository::{ContentRepository, PostRepository, duplicate_ids};

const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Blog posts, FAQs and the media library
pub struct ContentService<R: ContentRepository> {
    repository: Arc<R>,
}

impl<R: ContentRepository> Clone for ContentService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ContentRepository> ContentService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    // Posts

    pub async fn create_post(&self, input: CreatePost) -> ContentResult<BlogPost> {
        let source = input.slug.clone().unwrap_or_else(|| input.title.clone());
        let slug = unique_post_slug(self.repository.as_ref(), &source, None).await?;
        self.repository.create_post(BlogPost::new(input, slug)).await
    }

    pub async fn get_post(&self, id: Uuid) -> ContentResult<BlogPost> {
        self.repository
            .get_post(id)
            .await?
            .ok_or(ContentError::PostNotFound(id))
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> ContentResult<BlogPost> {
        self.repository
            .get_post_by_slug(slug)
            .await?
            .ok_or_else(|| ContentError::PostSlugNotFound(slug.to_string()))
    }

    pub async fn list_posts(&self, mut filter: PostFilter) -> ContentResult<Vec<BlogPost>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list_posts(filter).await
    }

    /// A new title keeps the existing slug; only an explicit slug changes it
    pub async fn update_post(&self, id: Uuid, input: UpdatePost) -> ContentResult<BlogPost> {
        let mut post = self.get_post(id).await?;

        let slug = match input.slug {
            Some(ref requested) if slugify(requested) != post.slug => {
                Some(unique_post_slug(self.repository.as_ref(), requested, Some(id)).await?)
            }
            _ => None,
        };

        post.apply_update(input, slug);
        self.repository.update_post(post).await
    }

    pub async fn delete_post(&self, id: Uuid) -> ContentResult<()> {
        if !self.repository.delete_post(id).await? {
            return Err(ContentError::PostNotFound(id));
        }
        Ok(())
    }

    pub async fn publish_post(&self, id: Uuid) -> ContentResult<BlogPost> {
        let mut post = self.get_post(id).await?;
        if post.status == PostStatus::Published {
            return Ok(post);
        }
        post.publish(Utc::now());
        self.repository.update_post(post).await
    }

    pub async fn unpublish_post(&self, id: Uuid) -> ContentResult<BlogPost> {
        let mut post = self.get_post(id).await?;
        if post.status == PostStatus::Draft {
            return Ok(post);
        }
        post.unpublish();
        self.repository.update_post(post).await
    }

    pub async fn archive_post(&self, id: Uuid) -> ContentResult<BlogPost> {
        let mut post = self.get_post(id).await?;
        if post.status == PostStatus::Archived {
            return Ok(post);
        }
        post.archive();
        self.repository.update_post(post).await
    }

    // FAQs

    pub async fn create_faq(&self, input: CreateFaq) -> ContentResult<Faq> {
        let position = match input.position {
            Some(position) => position,
            None => self.repository.next_faq_position().await?,
        };
        self.repository.create_faq(Faq::new(input, position)).await
    }

    pub async fn get_faq(&self, id: Uuid) -> ContentResult<Faq> {
        self.repository
            .get_faq(id)
            .await?
            .ok_or(ContentError::FaqNotFound(id))
    }

    pub async fn list_faqs(&self, filter: FaqFilter) -> ContentResult<Vec<Faq>> {
        self.repository.list_faqs(filter).await
    }

    pub async fn update_faq(&self, id: Uuid, input: UpdateFaq) -> ContentResult<Faq> {
        let mut faq = self.get_faq(id).await?;
        faq.apply_update(input);
        self.repository.update_faq(faq).await
    }

    pub async fn delete_faq(&self, id: Uuid) -> ContentResult<()> {
        if !self.repository.delete_faq(id).await? {
            return Err(ContentError::FaqNotFound(id));
        }
        Ok(())
    }

    /// FAQs not listed keep their positions
    pub async fn reorder_faqs(&self, input: ReorderFaqs) -> ContentResult<Vec<Faq>> {
        let dupes = duplicate_ids(&input.ids);
        if !dupes.is_empty() {
            return Err(ContentError::Validation(format!(
                "ids listed more than once: {}",
                dupes
                    .iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        self.repository.reorder_faqs(input.ids).await?;
        self.repository.list_faqs(FaqFilter::default()).await
    }

    // Media

    pub async fn register_media(&self, input: RegisterMedia) -> ContentResult<MediaAsset> {
        self.repository.create_media(MediaAsset::new(input)).await
    }

    pub async fn get_media(&self, id: Uuid) -> ContentResult<MediaAsset> {
        self.repository
            .get_media(id)
            .await?
            .ok_or(ContentError::MediaNotFound(id))
    }

    pub async fn list_media(&self, mut filter: MediaFilter) -> ContentResult<Vec<MediaAsset>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list_media(filter).await
    }

    pub async fn update_media(&self, id: Uuid, input: UpdateMedia) -> ContentResult<MediaAsset> {
        let mut asset = self.get_media(id).await?;
        asset.apply_update(input);
        self.repository.update_media(asset).await
    }

    pub async fn delete_media(&self, id: Uuid) -> ContentResult<()> {
        if !self.repository.delete_media(id).await? {
            return Err(ContentError::MediaNotFound(id));
        }
        Ok(())
    }
}

/// First free `base`, `base-2`, `base-3`, ... for the slugified `source`
pub(crate) async fn unique_post_slug<R: PostRepository + ?Sized>(
    repository: &R,
    source: &str,
    exclude: Option<Uuid>,
) -> ContentResult<String> {
    let base = slugify(source);
    if base.is_empty() {
        return Err(ContentError::Validation(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }

    for n in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = slug_candidate(&base, n);
        if !repository.post_slug_exists(&candidate, exclude).await? {
            return Ok(candidate);
        }
    }
    Err(ContentError::Validation(format!("no free slug left for '{base}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::repository::{InMemoryContent, MockPostRepository};
    use sea_orm::DbErr;

    fn service() -> ContentService<InMemoryContent> {
        ContentService::new(InMemoryContent::new())
    }

    fn post(title: &str) -> CreatePost {
        CreatePost {
            title: title.into(),
            slug: None,
            excerpt: None,
            body: "Body".into(),
            cover_image_url: None,
            author_name: None,
            tags: vec![],
            status: PostStatus::Draft,
        }
    }

    fn faq(question: &str) -> CreateFaq {
        CreateFaq {
            question: question.into(),
            answer: "Answer".into(),
            category: None,
            position: None,
            is_published: true,
        }
    }

    fn media(file_name: &str, mime_type: &str, folder: &str) -> RegisterMedia {
        RegisterMedia {
            file_name: file_name.into(),
            url: format!("https://cdn.shop.test/{file_name}"),
            mime_type: mime_type.into(),
            size_bytes: 2048,
            width: None,
            height: None,
            alt_text: None,
            folder: Some(folder.into()),
        }
    }

    #[tokio::test]
    async fn test_slugs_are_unique() {
        let service = service();
        let a = service.create_post(post("Summer Sale!")).await.unwrap();
        let b = service.create_post(post("Summer sale")).await.unwrap();
        assert_eq!(a.slug, "summer-sale");
        assert_eq!(b.slug, "summer-sale-2");

        let err = service.create_post(post("!!!")).await.unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rename_keeps_slug_unless_requested() {
        let service = service();
        let p = service.create_post(post("Launch")).await.unwrap();

        let renamed = service
            .update_post(
                p.id,
                UpdatePost {
                    title: Some("Launch day".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.slug, "launch");

        let reslugged = service
            .update_post(
                p.id,
                UpdatePost {
                    slug: Some("Launch Day".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(reslugged.slug, "launch-day");
    }

    #[tokio::test]
    async fn test_publish_lifecycle() {
        let service = service();
        let p = service.create_post(post("News")).await.unwrap();

        let published = service.publish_post(p.id).await.unwrap();
        assert_eq!(published.status, PostStatus::Published);
        let first = published.published_at.unwrap();

        let draft = service.unpublish_post(p.id).await.unwrap();
        assert_eq!(draft.status, PostStatus::Draft);
        assert_eq!(draft.published_at, Some(first));

        let again = service.publish_post(p.id).await.unwrap();
        assert_eq!(again.published_at, Some(first));

        let archived = service.archive_post(p.id).await.unwrap();
        assert_eq!(archived.status, PostStatus::Archived);

        let err = service.publish_post(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, ContentError::PostNotFound(_)));
    }

    #[tokio::test]
    async fn test_faqs_append_and_reorder() {
        let service = service();
        let a = service.create_faq(faq("A?")).await.unwrap();
        let b = service.create_faq(faq("B?")).await.unwrap();
        let c = service.create_faq(faq("C?")).await.unwrap();
        assert_eq!((a.position, b.position, c.position), (0, 1, 2));

        let ordered = service
            .reorder_faqs(ReorderFaqs {
                ids: vec![c.id, a.id, b.id],
            })
            .await
            .unwrap();
        let ids: Vec<Uuid> = ordered.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);

        let err = service
            .reorder_faqs(ReorderFaqs {
                ids: vec![a.id, a.id],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));

        let err = service
            .reorder_faqs(ReorderFaqs {
                ids: vec![a.id, Uuid::now_v7()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::UnknownFaqs(_)));
    }

    #[tokio::test]
    async fn test_media_filters() {
        let service = service();
        service
            .register_media(media("hero.png", "image/png", "banners"))
            .await
            .unwrap();
        service
            .register_media(media("promo.mp4", "video/mp4", "/banners/"))
            .await
            .unwrap();
        service
            .register_media(media("size-guide.pdf", "application/pdf", "/"))
            .await
            .unwrap();

        let banners = service
            .list_media(MediaFilter {
                folder: Some("/banners".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(banners.len(), 2);

        let docs = service
            .list_media(MediaFilter {
                kind: Some(MediaKind::Document),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "size-guide.pdf");

        let found = service
            .list_media(MediaFilter {
                search: Some("HERO".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found[0].kind, MediaKind::Image);
    }

    #[tokio::test]
    async fn test_update_media_moves_folder() {
        let service = service();
        let asset = service
            .register_media(media("hero.png", "image/png", "/"))
            .await
            .unwrap();

        let moved = service
            .update_media(
                asset.id,
                UpdateMedia {
                    folder: Some("archive//2024".into()),
                    alt_text: Some(Some("Hero banner".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.folder, "/archive/2024");
        assert_eq!(moved.alt_text.as_deref(), Some("Hero banner"));
        assert_eq!(moved.url, asset.url);
    }

    #[tokio::test]
    async fn test_slug_lookup_propagates_db_errors() {
        let mut mock = MockPostRepository::new();
        mock.expect_post_slug_exists()
            .returning(|_, _| Err(ContentError::Database(DbErr::Custom("connection reset".into()))));

        let err = unique_post_slug(&mock, "Hello", None).await.unwrap_err();
        assert!(matches!(err, ContentError::Database(_)));
    }
}
