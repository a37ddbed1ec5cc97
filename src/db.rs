use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Connection, Executor, SqliteConnection, SqlitePool,
};
use tracing::info;

use crate::include_res;

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.foreign_keys(true);

    // in-memory databases live only as long as their connection
    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(db_pool)
}

/// Creates any missing table. Existing data is left alone.
pub async fn create_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut conn = db_pool.acquire().await?;
    run_script(&mut conn, include_res!(str, "/data/schema.sql")).await
}

/// Drops every table, recreates the schema and loads the seed data.
pub async fn reset(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut conn = db_pool.acquire().await?;

    // sqlite has no droppable constraints, so enforcement is switched off instead
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *conn).await?;
    let dropped = drop_all_tables(&mut conn).await;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
    dropped?;

    let mut tx = conn.begin().await?;
    run_script(&mut tx, include_res!(str, "/data/schema.sql")).await?;
    run_script(&mut tx, include_res!(str, "/data/data_init.sql")).await?;
    tx.commit().await?;

    info!("database reset and seeded");
    Ok(())
}

async fn drop_all_tables(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(&mut *conn)
    .await?;

    for (table,) in tables {
        info!("dropping table {table}");
        sqlx::query(&format!(r#"DROP TABLE IF EXISTS "{}""#, table.replace('"', "\"\"")))
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

async fn run_script(conn: &mut SqliteConnection, script: &'static str) -> Result<(), sqlx::Error> {
    conn.execute(sqlx::raw_sql(script)).await?;
    Ok(())
}
