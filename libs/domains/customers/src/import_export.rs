//! Customer CSV export and import, keyed by email.

use axum_helpers::AppError;
use axum_helpers::csv_io::{ColumnMap, ImportMode, ImportReport, join_list, parse_bool, split_list};
use validator::{Validate, ValidationErrors};

use crate::error::{CustomerError, CustomerResult};
use crate::models::{CreateCustomer, Customer, CustomerFilter, UpdateCustomer, normalise_email};
use crate::repository::CustomerRepository;
use crate::service::CustomerService;

pub const CUSTOMER_COLUMNS: [&str; 6] = [
    "email",
    "first_name",
    "last_name",
    "phone",
    "accepts_marketing",
    "tags",
];

const REQUIRED_COLUMNS: [&str; 1] = ["email"];

const ALIASES: [(&str, &str); 11] = [
    ("e-mail", "email"),
    ("email_address", "email"),
    ("firstname", "first_name"),
    ("given_name", "first_name"),
    ("lastname", "last_name"),
    ("surname", "last_name"),
    ("family_name", "last_name"),
    ("phone_number", "phone"),
    ("mobile", "phone"),
    ("newsletter", "accepts_marketing"),
    ("subscribed", "accepts_marketing"),
];

struct ParsedRow {
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    accepts_marketing: Option<bool>,
    tags: Option<Vec<String>>,
}

type CellError = (Option<&'static str>, String);

impl<R: CustomerRepository> CustomerService<R> {
    pub async fn export_customers(&self, filter: CustomerFilter) -> CustomerResult<String> {
        let customers = self.repository.list(filter.unbounded()).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CUSTOMER_COLUMNS).map_err(csv_error)?;

        for customer in &customers {
            let accepts = customer.accepts_marketing.to_string();
            let tags = join_list(&customer.tags);
            writer
                .write_record([
                    customer.email.as_str(),
                    customer.first_name.as_str(),
                    customer.last_name.as_str(),
                    customer.phone.as_deref().unwrap_or_default(),
                    accepts.as_str(),
                    tags.as_str(),
                ])
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| CustomerError::InvalidCsv(e.to_string()))?;
        tracing::info!(rows = customers.len(), "Exported customers");
        String::from_utf8(bytes).map_err(|e| CustomerError::InvalidCsv(e.to_string()))
    }

    /// Blank cells leave existing values untouched on upsert
    pub async fn import_customers(
        &self,
        data: &[u8],
        mode: ImportMode,
    ) -> CustomerResult<ImportReport> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let header = reader.headers().map_err(csv_error)?.clone();
        let columns = ColumnMap::resolve(&header, &CUSTOMER_COLUMNS, &ALIASES, &REQUIRED_COLUMNS)
            .map_err(|e| match e {
                AppError::BadRequest(msg) => CustomerError::InvalidCsv(msg),
                other => CustomerError::InvalidCsv(other.to_string()),
            })?;

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

            let parsed = match parse_row(&columns, &record) {
                Ok(parsed) => parsed,
                Err((field, message)) => {
                    report.reject(row, field, message);
                    continue;
                }
            };

            let existing = self.repository.get_by_email(&parsed.email).await?;
            let outcome = match (existing, mode) {
                (Some(_), ImportMode::CreateOnly) => Err((
                    Some("email"),
                    format!("customer '{}' already exists", parsed.email),
                )),
                (Some(customer), ImportMode::Upsert) => {
                    self.upsert_row(customer, parsed).await.map(|_| false)
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
            "Imported customers"
        );
        Ok(report)
    }

    async fn create_row(&self, row: ParsedRow) -> Result<Customer, CellError> {
        let input = CreateCustomer {
            email: row.email,
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            phone: row.phone,
            accepts_marketing: row.accepts_marketing.unwrap_or(false),
            tags: row.tags.unwrap_or_default(),
            note: None,
        };
        input.validate().map_err(first_validation_error)?;
        self.create_customer(input).await.map_err(row_error)
    }

    async fn upsert_row(&self, existing: Customer, row: ParsedRow) -> Result<Customer, CellError> {
        let update = UpdateCustomer {
            email: None,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone.map(Some),
            accepts_marketing: row.accepts_marketing,
            tags: row.tags,
            note: None,
        };
        update.validate().map_err(first_validation_error)?;
        self.update_customer(existing.id, update)
            .await
            .map_err(row_error)
    }
}

fn csv_error(e: csv::Error) -> CustomerError {
    CustomerError::InvalidCsv(e.to_string())
}

fn parse_row(columns: &ColumnMap, record: &csv::StringRecord) -> Result<ParsedRow, CellError> {
    let email = columns
        .get(record, "email")
        .map(normalise_email)
        .ok_or((Some("email"), "email is required".to_string()))?;

    let accepts_marketing = columns
        .get(record, "accepts_marketing")
        .map(parse_bool)
        .transpose()
        .map_err(|e| (Some("accepts_marketing"), e))?;

    Ok(ParsedRow {
        email,
        first_name: columns.get(record, "first_name").map(str::to_string),
        last_name: columns.get(record, "last_name").map(str::to_string),
        phone: columns.get(record, "phone").map(str::to_string),
        accepts_marketing,
        tags: columns.get(record, "tags").map(split_list),
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
            let name: &str = field;
            let column = CUSTOMER_COLUMNS.iter().find(|c| **c == name).copied();
            (column, message)
        }
        None => (None, errors.to_string()),
    }
}

fn row_error(err: CustomerError) -> CellError {
    match err {
        CustomerError::DuplicateEmail(email) => {
            (Some("email"), format!("customer '{email}' already exists"))
        }
        other => (None, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryCustomers;

    fn service() -> CustomerService<InMemoryCustomers> {
        CustomerService::new(InMemoryCustomers::new())
    }

    #[tokio::test]
    async fn test_import_upserts_by_email() {
        let service = service();
        let first = "\
E-mail,FirstName,Surname,Newsletter,Tags
ana@shop.test,Ana,Lima,yes,vip|wholesale
not-an-email,Bo,,no,
,Cy,Dee,no,
dee@shop.test,Dee,,maybe,
";
        let report = service
            .import_customers(first.as_bytes(), ImportMode::Upsert)
            .await
            .unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 3);
        let fields: Vec<Option<&str>> = report.errors.iter().map(|e| e.field.as_deref()).collect();
        assert_eq!(
            fields,
            vec![Some("email"), Some("email"), Some("accepts_marketing")]
        );

        let second = "email,first_name,accepts_marketing\nANA@shop.test,Ana Maria,false\n";
        let report = service
            .import_customers(second.as_bytes(), ImportMode::Upsert)
            .await
            .unwrap();
        assert_eq!(report.updated, 1);

        let ana = service.find_by_email("ana@shop.test").await.unwrap().unwrap();
        assert_eq!(ana.first_name, "Ana Maria");
        assert_eq!(ana.last_name, "Lima");
        assert!(!ana.accepts_marketing);
        assert_eq!(ana.tags, vec!["vip", "wholesale"]);
    }

    #[tokio::test]
    async fn test_create_only_reports_existing_email() {
        let service = service();
        let csv = "email\nana@shop.test\nana@shop.test\n";
        let report = service
            .import_customers(csv.as_bytes(), ImportMode::CreateOnly)
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors[0].row, 2);
    }

    #[tokio::test]
    async fn test_missing_email_column_is_rejected() {
        let err = service()
            .import_customers(b"name,phone\nAna,123\n", ImportMode::Upsert)
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::InvalidCsv(_)));
    }

    #[tokio::test]
    async fn test_export_has_fixed_header() {
        let service = service();
        service
            .import_customers(b"email,tags\nana@shop.test,vip|gift\n", ImportMode::Upsert)
            .await
            .unwrap();

        let csv = service.export_customers(CustomerFilter::default()).await.unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("email,first_name,last_name,phone,accepts_marketing,tags")
        );
        assert_eq!(lines.next(), Some("ana@shop.test,,,,false,vip|gift"));
    }
}
