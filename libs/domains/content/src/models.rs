use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static MIME_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9!#$&^_.+-]{0,63}/[a-z0-9][a-z0-9!#$&^_.+-]{0,126}$").unwrap()
});

/// Upper bound for any page size
pub const MAX_PAGE_SIZE: usize = 200;

fn default_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trimmed, lowercased, de-duplicated, blanks dropped
pub fn normalise_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

// Blog posts

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "post_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PostStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    /// Unique, URL-safe
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub author_name: Option<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    /// Set on first publish and kept through unpublish/republish
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// `slug` must already be unique
    pub fn new(input: CreatePost, slug: String) -> Self {
        let now = Utc::now();
        let mut post = Self {
            id: Uuid::now_v7(),
            title: input.title.trim().to_string(),
            slug,
            excerpt: trimmed(input.excerpt),
            body: input.body,
            cover_image_url: trimmed(input.cover_image_url),
            author_name: trimmed(input.author_name),
            tags: normalise_tags(input.tags),
            status: PostStatus::Draft,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        match input.status {
            PostStatus::Draft => {}
            PostStatus::Published => post.publish(now),
            PostStatus::Archived => post.status = PostStatus::Archived,
        }
        post
    }

    pub fn apply_update(&mut self, update: UpdatePost, slug: Option<String>) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(slug) = slug {
            self.slug = slug;
        }
        if let Some(excerpt) = update.excerpt {
            self.excerpt = trimmed(excerpt);
        }
        if let Some(body) = update.body {
            self.body = body;
        }
        if let Some(cover) = update.cover_image_url {
            self.cover_image_url = trimmed(cover);
        }
        if let Some(author) = update.author_name {
            self.author_name = trimmed(author);
        }
        if let Some(tags) = update.tags {
            self.tags = normalise_tags(tags);
        }
        self.updated_at = Utc::now();
    }

    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.status = PostStatus::Published;
        self.published_at.get_or_insert(now);
        self.updated_at = now;
    }

    pub fn unpublish(&mut self) {
        self.status = PostStatus::Draft;
        self.updated_at = Utc::now();
    }

    pub fn archive(&mut self) {
        self.status = PostStatus::Archived;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePost {
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub title: String,
    /// Derived from the title when omitted
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(length(max = 1000))]
    pub excerpt: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200000))]
    pub body: String,
    #[validate(url, length(max = 2048))]
    pub cover_image_url: Option<String>,
    #[validate(length(max = 200))]
    pub author_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tags: Vec<String>,
    /// `published` publishes immediately
    #[serde(default)]
    pub status: PostStatus,
}

/// Status changes go through publish/unpublish/archive
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePost {
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub excerpt: Option<Option<String>>,
    #[validate(length(max = 200000))]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub cover_image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub author_name: Option<Option<String>>,
    #[validate(length(max = 50))]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub tag: Option<String>,
    /// Substring of title or excerpt
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            status: None,
            tag: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PostFilter {
    pub fn matches(&self, post: &BlogPost) -> bool {
        if let Some(status) = self.status
            && post.status != status
        {
            return false;
        }
        if let Some(ref tag) = self.tag
            && !post.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim()))
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            let in_excerpt = post
                .excerpt
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&needle));
            if !post.title.to_lowercase().contains(&needle) && !in_excerpt {
                return false;
            }
        }
        true
    }
}

// FAQs

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    /// Ascending display order
    pub position: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Faq {
    pub fn new(input: CreateFaq, position: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            question: input.question.trim().to_string(),
            answer: input.answer.trim().to_string(),
            category: trimmed(input.category),
            position,
            is_published: input.is_published,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateFaq) {
        if let Some(question) = update.question {
            self.question = question.trim().to_string();
        }
        if let Some(answer) = update.answer {
            self.answer = answer.trim().to_string();
        }
        if let Some(category) = update.category {
            self.category = trimmed(category);
        }
        if let Some(position) = update.position {
            self.position = position;
        }
        if let Some(is_published) = update.is_published {
            self.is_published = is_published;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFaq {
    #[validate(length(min = 1, max = 500), custom(function = "validate_not_blank"))]
    pub question: String,
    #[validate(length(min = 1, max = 10000), custom(function = "validate_not_blank"))]
    pub answer: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    /// Appended after the last FAQ when omitted
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFaq {
    #[validate(length(min = 1, max = 500), custom(function = "validate_not_blank"))]
    pub question: Option<String>,
    #[validate(length(min = 1, max = 10000), custom(function = "validate_not_blank"))]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct FaqFilter {
    /// Exact match, case-insensitive
    pub category: Option<String>,
    pub published: Option<bool>,
}

impl FaqFilter {
    pub fn matches(&self, faq: &Faq) -> bool {
        if let Some(ref category) = self.category
            && !faq
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category.trim()))
        {
            return false;
        }
        if let Some(published) = self.published
            && faq.is_published != published
        {
            return false;
        }
        true
    }
}

/// The listed FAQs get positions `0..n` in this order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReorderFaqs {
    #[validate(length(min = 1, max = 1000))]
    pub ids: Vec<Uuid>,
}

// Media library

/// Derived from the MIME type prefix
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    pub fn of(mime_type: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }
}

/// `/`-rooted, no trailing or doubled slashes: `a//b/` -> `/a/b`
pub fn normalise_folder(folder: &str) -> String {
    let parts: Vec<&str> = folder
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    format!("/{}", parts.join("/"))
}

fn validate_mime_type(mime: &str) -> Result<(), ValidationError> {
    if !MIME_TYPE.is_match(&mime.trim().to_ascii_lowercase()) {
        return Err(ValidationError::new("invalid_mime_type")
            .with_message("mime_type must look like 'type/subtype'".into()));
    }
    Ok(())
}

fn validate_folder(folder: &str) -> Result<(), ValidationError> {
    if folder.split('/').any(|p| p.trim() == "..") {
        return Err(ValidationError::new("invalid_folder")
            .with_message("folder must not contain '..'".into()));
    }
    Ok(())
}

/// Metadata for a file already uploaded to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaAsset {
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
    pub mime_type: String,
    pub kind: MediaKind,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub alt_text: Option<String>,
    pub folder: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaAsset {
    pub fn new(input: RegisterMedia) -> Self {
        let now = Utc::now();
        let mime_type = input.mime_type.trim().to_ascii_lowercase();
        Self {
            id: Uuid::now_v7(),
            file_name: input.file_name.trim().to_string(),
            url: input.url.trim().to_string(),
            kind: MediaKind::of(&mime_type),
            mime_type,
            size_bytes: input.size_bytes,
            width: input.width,
            height: input.height,
            alt_text: trimmed(input.alt_text),
            folder: input
                .folder
                .as_deref()
                .map(normalise_folder)
                .unwrap_or_else(|| "/".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateMedia) {
        if let Some(file_name) = update.file_name {
            self.file_name = file_name.trim().to_string();
        }
        if let Some(alt_text) = update.alt_text {
            self.alt_text = trimmed(alt_text);
        }
        if let Some(folder) = update.folder {
            self.folder = normalise_folder(&folder);
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterMedia {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub file_name: String,
    #[validate(url, length(max = 2048))]
    pub url: String,
    #[validate(custom(function = "validate_mime_type"))]
    pub mime_type: String,
    #[validate(range(min = 0))]
    pub size_bytes: i64,
    #[validate(range(min = 1, max = 100000))]
    pub width: Option<i32>,
    #[validate(range(min = 1, max = 100000))]
    pub height: Option<i32>,
    #[validate(length(max = 500))]
    pub alt_text: Option<String>,
    /// Defaults to `/`
    #[validate(length(max = 255), custom(function = "validate_folder"))]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMedia {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 500))]
    pub alt_text: Option<Option<String>>,
    #[validate(length(max = 255), custom(function = "validate_folder"))]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct MediaFilter {
    /// Exact folder; subfolders are not included
    pub folder: Option<String>,
    pub kind: Option<MediaKind>,
    /// Substring of the file name
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self {
            folder: None,
            kind: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl MediaFilter {
    pub fn matches(&self, asset: &MediaAsset) -> bool {
        if let Some(ref folder) = self.folder
            && asset.folder != normalise_folder(folder)
        {
            return false;
        }
        if let Some(kind) = self.kind
            && asset.kind != kind
        {
            return false;
        }
        if let Some(ref search) = self.search
            && !asset
                .file_name
                .to_lowercase()
                .contains(&search.trim().to_lowercase())
        {
            return false;
        }
        true
    }
}
