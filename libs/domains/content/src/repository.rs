use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ContentError, ContentResult};
use crate::models::{BlogPost, Faq, FaqFilter, MediaAsset, MediaFilter, PostFilter};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: BlogPost) -> ContentResult<BlogPost>;

    async fn get_post(&self, id: Uuid) -> ContentResult<Option<BlogPost>>;

    async fn get_post_by_slug(&self, slug: &str) -> ContentResult<Option<BlogPost>>;

    /// Latest published first, then newest drafts
    async fn list_posts(&self, filter: PostFilter) -> ContentResult<Vec<BlogPost>>;

    async fn update_post(&self, post: BlogPost) -> ContentResult<BlogPost>;

    async fn delete_post(&self, id: Uuid) -> ContentResult<bool>;

    async fn post_slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> ContentResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FaqRepository: Send + Sync {
    async fn create_faq(&self, faq: Faq) -> ContentResult<Faq>;

    async fn get_faq(&self, id: Uuid) -> ContentResult<Option<Faq>>;

    /// Ordered by position, then creation
    async fn list_faqs(&self, filter: FaqFilter) -> ContentResult<Vec<Faq>>;

    async fn update_faq(&self, faq: Faq) -> ContentResult<Faq>;

    async fn delete_faq(&self, id: Uuid) -> ContentResult<bool>;

    /// One past the highest position in use
    async fn next_faq_position(&self) -> ContentResult<i32>;

    /// All-or-nothing: unknown ids leave every position untouched
    async fn reorder_faqs(&self, ids: Vec<Uuid>) -> ContentResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create_media(&self, asset: MediaAsset) -> ContentResult<MediaAsset>;

    async fn get_media(&self, id: Uuid) -> ContentResult<Option<MediaAsset>>;

    /// Newest first
    async fn list_media(&self, filter: MediaFilter) -> ContentResult<Vec<MediaAsset>>;

    async fn update_media(&self, asset: MediaAsset) -> ContentResult<MediaAsset>;

    async fn delete_media(&self, id: Uuid) -> ContentResult<bool>;
}

pub trait ContentRepository: PostRepository + FaqRepository + MediaRepository {}

impl<T> ContentRepository for T where T: PostRepository + FaqRepository + MediaRepository {}

#[derive(Debug, Default)]
struct ContentState {
    posts: HashMap<Uuid, BlogPost>,
    faqs: HashMap<Uuid, Faq>,
    media: HashMap<Uuid, MediaAsset>,
}

/// In-memory implementation (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryContent {
    state: Arc<RwLock<ContentState>>,
}

impl InMemoryContent {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl PostRepository for InMemoryContent {
    async fn create_post(&self, post: BlogPost) -> ContentResult<BlogPost> {
        let mut state = self.state.write().await;
        state.posts.insert(post.id, post.clone());
        tracing::info!(post_id = %post.id, slug = %post.slug, "Created post");
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> ContentResult<Option<BlogPost>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn get_post_by_slug(&self, slug: &str) -> ContentResult<Option<BlogPost>> {
        let state = self.state.read().await;
        Ok(state.posts.values().find(|p| p.slug == slug).cloned())
    }

    async fn list_posts(&self, filter: PostFilter) -> ContentResult<Vec<BlogPost>> {
        let state = self.state.read().await;
        let mut result: Vec<BlogPost> = state
            .posts
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        // None sorts first in Option's Ord, so reverse puts it last
        result.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(page(result, filter.offset, filter.limit))
    }

    async fn update_post(&self, post: BlogPost) -> ContentResult<BlogPost> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post.id) {
            return Err(ContentError::PostNotFound(post.id));
        }
        state.posts.insert(post.id, post.clone());
        tracing::info!(post_id = %post.id, status = %post.status, "Updated post");
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> ContentResult<bool> {
        let removed = self.state.write().await.posts.remove(&id).is_some();
        if removed {
            tracing::info!(post_id = %id, "Deleted post");
        }
        Ok(removed)
    }

    async fn post_slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> ContentResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }
}

#[async_trait]
impl FaqRepository for InMemoryContent {
    async fn create_faq(&self, faq: Faq) -> ContentResult<Faq> {
        self.state.write().await.faqs.insert(faq.id, faq.clone());
        tracing::info!(faq_id = %faq.id, position = faq.position, "Created FAQ");
        Ok(faq)
    }

    async fn get_faq(&self, id: Uuid) -> ContentResult<Option<Faq>> {
        Ok(self.state.read().await.faqs.get(&id).cloned())
    }

    async fn list_faqs(&self, filter: FaqFilter) -> ContentResult<Vec<Faq>> {
        let state = self.state.read().await;
        let mut result: Vec<Faq> = state
            .faqs
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(result)
    }

    async fn update_faq(&self, faq: Faq) -> ContentResult<Faq> {
        let mut state = self.state.write().await;
        if !state.faqs.contains_key(&faq.id) {
            return Err(ContentError::FaqNotFound(faq.id));
        }
        state.faqs.insert(faq.id, faq.clone());
        Ok(faq)
    }

    async fn delete_faq(&self, id: Uuid) -> ContentResult<bool> {
        Ok(self.state.write().await.faqs.remove(&id).is_some())
    }

    async fn next_faq_position(&self) -> ContentResult<i32> {
        let state = self.state.read().await;
        Ok(state
            .faqs
            .values()
            .map(|f| f.position + 1)
            .max()
            .unwrap_or(0))
    }

    async fn reorder_faqs(&self, ids: Vec<Uuid>) -> ContentResult<()> {
        let mut state = self.state.write().await;

        let missing: Vec<Uuid> = ids
            .iter()
            .copied()
            .filter(|id| !state.faqs.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(ContentError::UnknownFaqs(missing));
        }

        let now = chrono::Utc::now();
        for (position, id) in ids.iter().enumerate() {
            if let Some(faq) = state.faqs.get_mut(id) {
                faq.position = position as i32;
                faq.updated_at = now;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MediaRepository for InMemoryContent {
    async fn create_media(&self, asset: MediaAsset) -> ContentResult<MediaAsset> {
        self.state.write().await.media.insert(asset.id, asset.clone());
        tracing::info!(media_id = %asset.id, folder = %asset.folder, "Registered media asset");
        Ok(asset)
    }

    async fn get_media(&self, id: Uuid) -> ContentResult<Option<MediaAsset>> {
        Ok(self.state.read().await.media.get(&id).cloned())
    }

    async fn list_media(&self, filter: MediaFilter) -> ContentResult<Vec<MediaAsset>> {
        let state = self.state.read().await;
        let mut result: Vec<MediaAsset> = state
            .media
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(result, filter.offset, filter.limit))
    }

    async fn update_media(&self, asset: MediaAsset) -> ContentResult<MediaAsset> {
        let mut state = self.state.write().await;
        if !state.media.contains_key(&asset.id) {
            return Err(ContentError::MediaNotFound(asset.id));
        }
        state.media.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn delete_media(&self, id: Uuid) -> ContentResult<bool> {
        let removed = self.state.write().await.media.remove(&id).is_some();
        if removed {
            tracing::info!(media_id = %id, "Deleted media asset");
        }
        Ok(removed)
    }
}

/// Ids listed more than once, in first-seen order
pub(crate) fn duplicate_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for id in ids {
        if !seen.insert(*id) && !dupes.contains(id) {
            dupes.push(*id);
        }
    }
    dupes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateFaq;

    fn faq(question: &str, position: i32) -> Faq {
        Faq::new(
            CreateFaq {
                question: question.into(),
                answer: "Answer".into(),
                category: None,
                position: None,
                is_published: true,
            },
            position,
        )
    }

    #[tokio::test]
    async fn test_reorder_is_all_or_nothing() {
        let repo = InMemoryContent::new();
        let a = repo.create_faq(faq("A", 0)).await.unwrap();
        let b = repo.create_faq(faq("B", 1)).await.unwrap();

        let ghost = Uuid::now_v7();
        let err = repo.reorder_faqs(vec![b.id, ghost, a.id]).await.unwrap_err();
        assert!(matches!(err, ContentError::UnknownFaqs(ref ids) if ids == &vec![ghost]));
        assert_eq!(repo.get_faq(a.id).await.unwrap().unwrap().position, 0);

        repo.reorder_faqs(vec![b.id, a.id]).await.unwrap();
        let listed = repo.list_faqs(FaqFilter::default()).await.unwrap();
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].position, 1);
    }

    #[tokio::test]
    async fn test_next_position_follows_highest() {
        let repo = InMemoryContent::new();
        assert_eq!(repo.next_faq_position().await.unwrap(), 0);
        repo.create_faq(faq("A", 7)).await.unwrap();
        assert_eq!(repo.next_faq_position().await.unwrap(), 8);
    }

    #[test]
    fn test_duplicate_ids() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(duplicate_ids(&[a, b, a, a]), vec![a]);
        assert!(duplicate_ids(&[a, b]).is_empty());
    }
}
