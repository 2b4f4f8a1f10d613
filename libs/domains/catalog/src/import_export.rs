//! Product CSV export and import.

use axum_helpers::AppError;
use axum_helpers::csv_io::{
    ColumnMap, ImportMode, ImportReport, format_cents, join_list, parse_cents, split_list,
};
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CategoryFilter, CreateProduct, Product, ProductFilter, ProductImage, ProductStatus,
    UpdateProduct, is_valid_sku,
};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

/// Export column order
pub const PRODUCT_COLUMNS: [&str; 12] = [
    "sku",
    "title",
    "slug",
    "description",
    "price",
    "compare_at_price",
    "currency",
    "stock",
    "status",
    "category_slug",
    "tags",
    "image_urls",
];

const REQUIRED_COLUMNS: [&str; 3] = ["sku", "title", "price"];

/// Alternative header spellings, lowercase
const ALIASES: [(&str, &str); 8] = [
    ("name", "title"),
    ("product_name", "title"),
    ("price_usd", "price"),
    ("amount", "price"),
    ("qty", "stock"),
    ("quantity", "stock"),
    ("inventory", "stock"),
    ("category", "category_slug"),
];

const IMAGE_ALIASES: [(&str, &str); 1] = [("images", "image_urls")];

/// A row that passed the per-cell checks
struct ParsedRow {
    sku: String,
    title: String,
    price_cents: i64,
    slug: Option<String>,
    description: Option<String>,
    compare_at_price_cents: Option<i64>,
    currency: Option<String>,
    stock: Option<i32>,
    status: Option<ProductStatus>,
    category_id: Option<Uuid>,
    tags: Option<Vec<String>>,
    images: Option<Vec<ProductImage>>,
}

/// A rejected cell: (field, message)
type CellError = (Option<&'static str>, String);

impl<R: CatalogRepository> CatalogService<R> {
    /// Products matching `filter` as CSV, all pages
    pub async fn export_products(&self, mut filter: ProductFilter) -> CatalogResult<String> {
        filter.limit = usize::MAX;
        filter.offset = 0;
        let products = self.repository.list_products(filter).await?;
        let slugs = self.category_slugs().await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(PRODUCT_COLUMNS).map_err(csv_error)?;

        for product in &products {
            let category_slug = product
                .category_id
                .and_then(|id| slugs.get(&id))
                .map(String::as_str)
                .unwrap_or_default();
            let image_urls: Vec<&str> = product.images.iter().map(|i| i.url.as_str()).collect();
            let price = format_cents(product.price_cents);
            let compare_at = product
                .compare_at_price_cents
                .map(format_cents)
                .unwrap_or_default();
            let stock = product.stock.to_string();
            let status = product.status.to_string();
            let tags = join_list(&product.tags);
            let images = join_list(&image_urls);

            writer
                .write_record([
                    product.sku.as_str(),
                    product.title.as_str(),
                    product.slug.as_str(),
                    product.description.as_str(),
                    price.as_str(),
                    compare_at.as_str(),
                    product.currency.as_str(),
                    stock.as_str(),
                    status.as_str(),
                    category_slug,
                    tags.as_str(),
                    images.as_str(),
                ])
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| CatalogError::InvalidCsv(e.to_string()))?;
        tracing::info!(rows = products.len(), "Exported products");
        String::from_utf8(bytes).map_err(|e| CatalogError::InvalidCsv(e.to_string()))
    }

    /// Rows are validated independently; failures land in the report and
    /// the rest of the file is still imported
    pub async fn import_products(&self, data: &[u8], mode: ImportMode) -> CatalogResult<ImportReport> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let header = reader.headers().map_err(csv_error)?.clone();
        let aliases: Vec<(&str, &'static str)> =
            ALIASES.iter().chain(IMAGE_ALIASES.iter()).copied().collect();
        let columns = ColumnMap::resolve(&header, &PRODUCT_COLUMNS, &aliases, &REQUIRED_COLUMNS)
            .map_err(|e| match e {
                AppError::BadRequest(msg) => CatalogError::InvalidCsv(msg),
                other => CatalogError::InvalidCsv(other.to_string()),
            })?;

        let categories: HashMap<String, Uuid> = self
            .category_slugs()
            .await?
            .into_iter()
            .map(|(id, slug)| (slug, id))
            .collect();

        let mut report = ImportReport::default();

        for (index, record) in reader.records().enumerate() {
            let row = index + 1;
            report.total_rows += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    report.reject(row, None, e.to_string());
                    continue;
                }
            };

            let parsed = match parse_row(&columns, &record, &categories) {
                Ok(parsed) => parsed,
                Err((field, message)) => {
                    report.reject(row, field, message);
                    continue;
                }
            };

            let existing = self.repository.get_product_by_sku(&parsed.sku).await?;
            let outcome = match (existing, mode) {
                (Some(_), ImportMode::CreateOnly) => Err((
                    Some("sku"),
                    format!("product with SKU '{}' already exists", parsed.sku),
                )),
                (Some(product), ImportMode::Upsert) => {
                    self.upsert_row(product, parsed).await.map(|_| false)
                }
                (None, _) => self.create_row(parsed).await.map(|_| true),
            };

            match outcome {
                Ok(true) => report.created += 1,
                Ok(false) => report.updated += 1,
                Err((field, message)) => report.reject(row, field, message),
            }
        }

        tracing::info!(
            total = report.total_rows,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Imported products"
        );
        Ok(report)
    }

    async fn create_row(&self, row: ParsedRow) -> Result<Product, CellError> {
        let input = CreateProduct {
            title: row.title,
            slug: row.slug,
            sku: row.sku,
            description: row.description.unwrap_or_default(),
            price_cents: row.price_cents,
            compare_at_price_cents: row.compare_at_price_cents,
            currency: row.currency,
            stock: row.stock.unwrap_or(0),
            status: row.status.unwrap_or_default(),
            category_id: row.category_id,
            tags: row.tags.unwrap_or_default(),
            images: row.images.unwrap_or_default(),
        };
        input.validate().map_err(first_validation_error)?;

        self.create_product(input).await.map_err(row_error)
    }

    async fn upsert_row(&self, existing: Product, row: ParsedRow) -> Result<Product, CellError> {
        let update = UpdateProduct {
            title: Some(row.title),
            slug: row.slug,
            sku: None,
            description: row.description,
            price_cents: Some(row.price_cents),
            compare_at_price_cents: row.compare_at_price_cents.map(Some),
            currency: row.currency,
            stock: row.stock,
            status: row.status,
            category_id: row.category_id.map(Some),
            tags: row.tags,
            images: row.images,
        };
        update.validate().map_err(first_validation_error)?;

        self.update_product(existing.id, update)
            .await
            .map_err(row_error)
    }

    async fn category_slugs(&self) -> CatalogResult<HashMap<Uuid, String>> {
        Ok(self
            .repository
            .list_categories(CategoryFilter::default())
            .await?
            .into_iter()
            .map(|c| (c.id, c.slug))
            .collect())
    }
}

fn csv_error(e: csv::Error) -> CatalogError {
    CatalogError::InvalidCsv(e.to_string())
}

fn parse_row(
    columns: &ColumnMap,
    record: &csv::StringRecord,
    categories: &HashMap<String, Uuid>,
) -> Result<ParsedRow, CellError> {
    let required = |field: &'static str| {
        columns
            .get(record, field)
            .map(str::to_string)
            .ok_or((Some(field), format!("{field} is required")))
    };

    let sku = required("sku")?;
    if !is_valid_sku(&sku) {
        return Err((
            Some("sku"),
            "SKU must be 1-64 characters of letters, digits, '-' or '_'".to_string(),
        ));
    }
    let title = required("title")?;
    let price_cents = parse_cents(&required("price")?).map_err(|e| (Some("price"), e))?;

    let compare_at_price_cents = columns
        .get(record, "compare_at_price")
        .map(parse_cents)
        .transpose()
        .map_err(|e| (Some("compare_at_price"), e))?;

    let stock = columns
        .get(record, "stock")
        .map(|raw| {
            raw.parse::<i32>()
                .ok()
                .filter(|s| *s >= 0)
                .ok_or_else(|| format!("'{raw}' is not a valid stock level"))
        })
        .transpose()
        .map_err(|e| (Some("stock"), e))?;

    let status = columns
        .get(record, "status")
        .map(|raw| {
            raw.parse::<ProductStatus>()
                .map_err(|_| format!("unknown status '{raw}'"))
        })
        .transpose()
        .map_err(|e| (Some("status"), e))?;

    let category_id = columns
        .get(record, "category_slug")
        .map(|slug| {
            categories
                .get(&slug.to_lowercase())
                .copied()
                .ok_or_else(|| format!("unknown category '{slug}'"))
        })
        .transpose()
        .map_err(|e| (Some("category_slug"), e))?;

    let images = columns.get(record, "image_urls").map(|cell| {
        split_list(cell)
            .into_iter()
            .enumerate()
            .map(|(position, url)| ProductImage {
                url,
                alt: None,
                position: position as i32,
            })
            .collect()
    });

    Ok(ParsedRow {
        sku,
        title,
        price_cents,
        slug: columns.get(record, "slug").map(str::to_string),
        description: columns.get(record, "description").map(str::to_string),
        compare_at_price_cents,
        currency: columns.get(record, "currency").map(str::to_uppercase),
        stock,
        status,
        category_id,
        tags: columns.get(record, "tags").map(split_list),
        images,
    })
}

fn first_validation_error(errors: ValidationErrors) -> CellError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{field} is invalid"));
            (column_for(field), message)
        }
        // Struct-level rule (compare_at vs price)
        None => (
            Some("compare_at_price"),
            "compare_at_price must be at least price".to_string(),
        ),
    }
}

/// CSV column reported for a model field
fn column_for(field: &str) -> Option<&'static str> {
    match field {
        "sku" => Some("sku"),
        "title" => Some("title"),
        "slug" => Some("slug"),
        "description" => Some("description"),
        "price_cents" => Some("price"),
        "compare_at_price_cents" => Some("compare_at_price"),
        "currency" => Some("currency"),
        "stock" => Some("stock"),
        "tags" => Some("tags"),
        "images" => Some("image_urls"),
        "__all__" => Some("compare_at_price"),
        _ => None,
    }
}

fn row_error(err: CatalogError) -> CellError {
    match err {
        CatalogError::DuplicateSku(sku) => {
            (Some("sku"), format!("product with SKU '{sku}' already exists"))
        }
        CatalogError::CategoryNotFound(_) => (Some("category_slug"), "unknown category".to_string()),
        other => (None, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateCategory;
    use crate::repository::InMemoryCatalog;

    fn service() -> CatalogService<InMemoryCatalog> {
        CatalogService::new(InMemoryCatalog::new())
    }

    #[tokio::test]
    async fn test_import_reports_bad_rows_and_keeps_good_ones() {
        let service = service();
        let csv = "\
SKU,Product_Name,Price_USD,Qty,Tags
TEE-1,Basic Tee,19.99,12,cotton|basics
TEE-2,,9.99,1,
TEE-3,Odd Tee,abc,1,
TEE 4,Spaced,1.00,1,
TEE-5,Negative,5.00,-3,
";
        let report = service
            .import_products(csv.as_bytes(), ImportMode::CreateOnly)
            .await
            .unwrap();

        assert_eq!(report.total_rows, 5);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 4);
        let fields: Vec<(usize, Option<&str>)> = report
            .errors
            .iter()
            .map(|e| (e.row, e.field.as_deref()))
            .collect();
        assert_eq!(
            fields,
            vec![
                (2, Some("title")),
                (3, Some("price")),
                (4, Some("sku")),
                (5, Some("stock"))
            ]
        );

        let tee = service.repository.get_product_by_sku("TEE-1").await.unwrap().unwrap();
        assert_eq!(tee.price_cents, 1999);
        assert_eq!(tee.stock, 12);
        assert_eq!(tee.tags, vec!["cotton", "basics"]);
    }

    #[tokio::test]
    async fn test_missing_required_column_rejects_whole_file() {
        let err = service()
            .import_products(b"sku,title\nA-1,Thing\n", ImportMode::Upsert)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCsv(ref m) if m.contains("price")));
    }

    #[tokio::test]
    async fn test_create_only_vs_upsert() {
        let service = service();
        let first = "sku,title,price\nMUG-1,Mug,8.00\n";
        service
            .import_products(first.as_bytes(), ImportMode::CreateOnly)
            .await
            .unwrap();

        let again = "sku,title,price,stock\nMUG-1,Big Mug,9.50,4\n";
        let report = service
            .import_products(again.as_bytes(), ImportMode::CreateOnly)
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors[0].field.as_deref(), Some("sku"));

        let report = service
            .import_products(again.as_bytes(), ImportMode::Upsert)
            .await
            .unwrap();
        assert_eq!(report.updated, 1);

        let mug = service.repository.get_product_by_sku("MUG-1").await.unwrap().unwrap();
        assert_eq!(mug.title, "Big Mug");
        assert_eq!(mug.price_cents, 950);
        assert_eq!(mug.stock, 4);
        // Title change on upsert keeps the slug
        assert_eq!(mug.slug, "mug");
    }

    #[tokio::test]
    async fn test_unknown_category_slug_is_a_row_error() {
        let service = service();
        service
            .create_category(CreateCategory {
                name: "Kitchen".into(),
                slug: None,
                description: String::new(),
                parent_id: None,
                position: 0,
            })
            .await
            .unwrap();

        let csv = "sku,title,price,category\nMUG-1,Mug,8,kitchen\nMUG-2,Mug 2,8,garden\n";
        let report = service
            .import_products(csv.as_bytes(), ImportMode::CreateOnly)
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.errors[0].row, 2);
        assert_eq!(report.errors[0].field.as_deref(), Some("category_slug"));
    }

    #[tokio::test]
    async fn test_export_renders_decimal_prices_and_lists() {
        let service = service();
        let csv = "sku,title,price,compare_at_price,tags,images\n\
                   TEE-1,Tee,19.99,25,a|b,https://cdn.test/1.jpg|https://cdn.test/2.jpg\n";
        service
            .import_products(csv.as_bytes(), ImportMode::CreateOnly)
            .await
            .unwrap();

        let exported = service.export_products(ProductFilter::default()).await.unwrap();
        let mut lines = exported.lines();
        assert_eq!(lines.next().unwrap(), PRODUCT_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "TEE-1,Tee,tee,,19.99,25.00,USD,0,draft,,a|b,https://cdn.test/1.jpg|https://cdn.test/2.jpg"
        );
    }
}
