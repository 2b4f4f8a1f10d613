pub use sea_orm_migration::prelude::*;

mod common;
mod m20250301_000000_bootstrap;
mod m20250301_000001_create_users;
mod m20250301_000002_create_catalog;
mod m20250301_000003_create_customers;
mod m20250301_000004_create_orders;
mod m20250301_000005_create_content;
mod m20250301_000006_create_discounts;
mod m20250301_000007_create_messaging;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000000_bootstrap::Migration),
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_catalog::Migration),
            Box::new(m20250301_000003_create_customers::Migration),
            Box::new(m20250301_000004_create_orders::Migration),
            Box::new(m20250301_000005_create_content::Migration),
            Box::new(m20250301_000006_create_discounts::Migration),
            Box::new(m20250301_000007_create_messaging::Migration),
        ]
    }
}
