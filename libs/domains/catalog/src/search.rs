//! Keyword search over products, categories and collections.
//!
//! Candidates come from a cheap substring match in storage; ranking happens
//! here with a fixed scoring table.

use std::cmp::Ordering;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{ProductStatus, SearchHit, SearchKind, SearchQuery, SearchResults};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

pub const MAX_TOKENS: usize = 8;
pub const MAX_LIMIT: usize = 50;
const SNIPPET_CHARS: usize = 160;

const EXACT_TITLE: f64 = 100.0;
const TITLE_PREFIX: f64 = 50.0;
const WORD_EXACT: f64 = 20.0;
const WORD_PREFIX: f64 = 12.0;
const TITLE_SUBSTRING: f64 = 8.0;
const SKU_EXACT: f64 = 40.0;
const TAG_EXACT: f64 = 10.0;
const DESCRIPTION_MATCH: f64 = 3.0;
const ALL_TOKENS_BONUS: f64 = 1.25;
const ARCHIVED_FACTOR: f64 = 0.5;
const DRAFT_FACTOR: f64 = 0.8;

/// A query after trimming and tokenising
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub query: String,
    /// Lowercased whole query
    pub normalised: String,
    /// Lowercased, deduplicated, at most [`MAX_TOKENS`]
    pub tokens: Vec<String>,
}

pub fn parse_query(raw: &str) -> CatalogResult<ParsedQuery> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(CatalogError::InvalidQuery("q must not be empty".to_string()));
    }

    let mut tokens: Vec<String> = Vec::new();
    for token in query.split_whitespace().map(str::to_lowercase) {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
        if tokens.len() == MAX_TOKENS {
            break;
        }
    }

    Ok(ParsedQuery {
        query: query.to_string(),
        normalised: query.to_lowercase(),
        tokens,
    })
}

/// Comma separated kinds; `None` or blank means every kind
pub fn parse_kinds(raw: Option<&str>) -> CatalogResult<Vec<SearchKind>> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(vec![
            SearchKind::Product,
            SearchKind::Category,
            SearchKind::Collection,
        ]);
    };

    let mut kinds = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = part
            .parse::<SearchKind>()
            .map_err(|_| CatalogError::InvalidQuery(format!("unknown kind '{part}'")))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// The text of one candidate that takes part in scoring
#[derive(Debug, Default)]
pub struct Scored<'a> {
    pub title: &'a str,
    pub sku: Option<&'a str>,
    pub tags: &'a [String],
    pub description: &'a str,
    pub status: Option<ProductStatus>,
}

pub fn score(query: &ParsedQuery, candidate: &Scored<'_>) -> f64 {
    let title = candidate.title.to_lowercase();
    let words: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let description = candidate.description.to_lowercase();

    let mut total = 0.0;
    if title == query.normalised {
        total += EXACT_TITLE;
    } else if title.starts_with(&query.normalised) {
        total += TITLE_PREFIX;
    }

    let mut matched = 0;
    for token in &query.tokens {
        let mut token_score = 0.0;

        if words.iter().any(|w| w == token) {
            token_score += WORD_EXACT;
        } else if words.iter().any(|w| w.starts_with(token.as_str())) {
            token_score += WORD_PREFIX;
        } else if title.contains(token.as_str()) {
            token_score += TITLE_SUBSTRING;
        }

        if candidate
            .sku
            .is_some_and(|sku| sku.eq_ignore_ascii_case(token))
        {
            token_score += SKU_EXACT;
        }
        if candidate.tags.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            token_score += TAG_EXACT;
        }
        if description.contains(token.as_str()) {
            token_score += DESCRIPTION_MATCH;
        }

        if token_score > 0.0 {
            matched += 1;
        }
        total += token_score;
    }

    if total > 0.0 && matched == query.tokens.len() {
        total *= ALL_TOKENS_BONUS;
    }

    match candidate.status {
        Some(ProductStatus::Archived) => total * ARCHIVED_FACTOR,
        Some(ProductStatus::Draft) => total * DRAFT_FACTOR,
        _ => total,
    }
}

/// Score desc, then title asc
fn rank(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
}

fn snippet(description: &str) -> Option<String> {
    let description = description.trim();
    if description.is_empty() {
        return None;
    }
    let mut chars = description.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        Some(format!("{}…", head.trim_end()))
    } else {
        Some(head)
    }
}

impl<R: CatalogRepository> CatalogService<R> {
    pub async fn search(&self, params: SearchQuery) -> CatalogResult<SearchResults> {
        let query = parse_query(&params.q)?;
        let kinds = parse_kinds(params.kinds.as_deref())?;
        if !(1..=MAX_LIMIT).contains(&params.limit) {
            return Err(CatalogError::InvalidQuery(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }

        let mut hits = Vec::new();

        if kinds.contains(&SearchKind::Product) {
            for product in self.repository.search_products(query.tokens.clone()).await? {
                let score = score(
                    &query,
                    &Scored {
                        title: &product.title,
                        sku: Some(&product.sku),
                        tags: &product.tags,
                        description: &product.description,
                        status: Some(product.status),
                    },
                );
                hits.push(SearchHit {
                    kind: SearchKind::Product,
                    id: product.id,
                    snippet: snippet(&product.description),
                    title: product.title,
                    slug: product.slug,
                    score,
                });
            }
        }

        if kinds.contains(&SearchKind::Category) {
            for category in self
                .repository
                .search_categories(query.tokens.clone())
                .await?
            {
                let score = score(
                    &query,
                    &Scored {
                        title: &category.name,
                        description: &category.description,
                        ..Default::default()
                    },
                );
                hits.push(SearchHit {
                    kind: SearchKind::Category,
                    id: category.id,
                    snippet: snippet(&category.description),
                    title: category.name,
                    slug: category.slug,
                    score,
                });
            }
        }

        if kinds.contains(&SearchKind::Collection) {
            for collection in self
                .repository
                .search_collections(query.tokens.clone())
                .await?
            {
                let score = score(
                    &query,
                    &Scored {
                        title: &collection.title,
                        description: &collection.description,
                        ..Default::default()
                    },
                );
                hits.push(SearchHit {
                    kind: SearchKind::Collection,
                    id: collection.id,
                    snippet: snippet(&collection.description),
                    title: collection.title,
                    slug: collection.slug,
                    score,
                });
            }
        }

        hits.retain(|h| h.score > 0.0);
        hits.sort_by(rank);
        let total = hits.len();
        hits.truncate(params.limit);

        tracing::debug!(query = %query.query, total, "Catalog search");

        Ok(SearchResults {
            query: query.query,
            total,
            hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateCategory, CreateProduct};
    use crate::repository::InMemoryCatalog;

    fn parsed(q: &str) -> ParsedQuery {
        parse_query(q).unwrap()
    }

    #[test]
    fn test_parse_query_tokenises() {
        let q = parsed("  Blue  blue SHIRT a b c d e f g h ");
        assert_eq!(q.query, "Blue  blue SHIRT a b c d e f g h");
        assert_eq!(q.tokens, vec!["blue", "shirt", "a", "b", "c", "d", "e", "f"]);
        assert!(matches!(parse_query("   "), Err(CatalogError::InvalidQuery(_))));
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(parse_kinds(None).unwrap().len(), 3);
        assert_eq!(
            parse_kinds(Some("product, Category,product")).unwrap(),
            vec![SearchKind::Product, SearchKind::Category]
        );
        assert!(parse_kinds(Some("orders")).is_err());
    }

    #[test]
    fn test_exact_title_outranks_prefix_and_substring() {
        let q = parsed("linen shirt");
        let exact = score(
            &q,
            &Scored {
                title: "Linen Shirt",
                ..Default::default()
            },
        );
        // 100 + 20 + 20, all tokens matched
        assert_eq!(exact, 140.0 * 1.25);

        let prefix = score(
            &q,
            &Scored {
                title: "Linen Shirts Pack",
                ..Default::default()
            },
        );
        // 50 + 20 + 12
        assert_eq!(prefix, 82.0 * 1.25);

        let partial = score(
            &q,
            &Scored {
                title: "Cotton Shirt",
                ..Default::default()
            },
        );
        // only "shirt" matched, no bonus
        assert_eq!(partial, 20.0);
    }

    #[test]
    fn test_sku_tag_and_description_signals() {
        let tags = vec!["summer".to_string()];
        let q = parsed("tee-01 summer");
        let s = score(
            &q,
            &Scored {
                title: "Plain",
                sku: Some("TEE-01"),
                tags: &tags,
                description: "A light summer tee",
                status: Some(ProductStatus::Active),
            },
        );
        // tee-01: sku 40; summer: tag 10 + description 3
        assert_eq!(s, 53.0 * 1.25);
    }

    #[test]
    fn test_status_penalties() {
        let q = parsed("mug");
        let base = Scored {
            title: "Mug",
            ..Default::default()
        };
        let active = score(&q, &base);
        let draft = score(
            &q,
            &Scored {
                status: Some(ProductStatus::Draft),
                ..base
            },
        );
        assert_eq!(draft, active * 0.8);
    }

    #[test]
    fn test_snippet_truncates_on_chars() {
        assert_eq!(snippet("  "), None);
        let long = "é".repeat(200);
        let s = snippet(&long).unwrap();
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 1);
    }

    #[tokio::test]
    async fn test_search_ranks_across_kinds() {
        let service = CatalogService::new(InMemoryCatalog::new());
        service
            .create_category(CreateCategory {
                name: "Mugs".into(),
                slug: None,
                description: String::new(),
                parent_id: None,
                position: 0,
            })
            .await
            .unwrap();
        for (title, sku, status) in [
            ("Mug", "MUG-1", ProductStatus::Active),
            ("Travel Mug", "MUG-2", ProductStatus::Archived),
            ("Teapot", "POT-1", ProductStatus::Active),
        ] {
            service
                .create_product(CreateProduct {
                    title: title.into(),
                    slug: None,
                    sku: sku.into(),
                    description: String::new(),
                    price_cents: 1000,
                    compare_at_price_cents: None,
                    currency: None,
                    stock: 1,
                    status,
                    category_id: None,
                    tags: vec![],
                    images: vec![],
                })
                .await
                .unwrap();
        }

        let results = service
            .search(SearchQuery {
                q: " mug ".into(),
                kinds: None,
                limit: 20,
            })
            .await
            .unwrap();

        assert_eq!(results.query, "mug");
        let titles: Vec<&str> = results.hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Mug", "Mugs", "Travel Mug"]);
        assert_eq!(results.total, 3);

        let err = service
            .search(SearchQuery {
                q: "mug".into(),
                kinds: None,
                limit: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQuery(_)));
    }
}
