use sea_orm_migration::prelude::*;

/// Keeps `updated_at` current on every UPDATE of `table`
pub async fn add_touch_trigger(manager: &SchemaManager<'_>, table: &str) -> Result<(), DbErr> {
    manager
        .get_connection()
        .execute_unprepared(&format!(
            "CREATE TRIGGER {table}_touch_updated_at
                BEFORE UPDATE ON {table}
                FOR EACH ROW
                EXECUTE FUNCTION util.touch_updated_at()"
        ))
        .await?;
    Ok(())
}

pub async fn drop_touch_trigger(manager: &SchemaManager<'_>, table: &str) -> Result<(), DbErr> {
    manager
        .get_connection()
        .execute_unprepared(&format!(
            "DROP TRIGGER IF EXISTS {table}_touch_updated_at ON {table}"
        ))
        .await?;
    Ok(())
}

/// `TEXT[] NOT NULL DEFAULT '{}'`
pub fn text_array<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .array(ColumnType::Text)
        .not_null()
        .default(Expr::cust("'{}'::TEXT[]"))
        .to_owned()
}

pub fn created_at<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}
