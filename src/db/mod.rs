pub mod repository;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::info;

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// A private in-memory database with the schema applied.
///
/// Each SQLite connection to `:memory:` opens its own database, so the pool
/// holds exactly one connection and never recycles it.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Runs a SQL script in one transaction with foreign keys disabled. The
/// pragma is switched back on whatever the outcome; a connection that cannot
/// be restored is closed instead of returning to the pool.
pub async fn prepare(db: &SqlitePool, script: &str) -> Result<(), sqlx::Error> {
    let mut conn = db.acquire().await?;

    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await?;

    let result = run_script(&mut *conn, script).await;

    if let Err(e) = sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await
    {
        conn.close_on_drop();
        return Err(result.err().unwrap_or(e));
    }

    let rows = result?;
    info!("seed script applied ({} rows affected)", rows);
    Ok(())
}

async fn run_script(conn: &mut SqliteConnection, script: &str) -> Result<u64, sqlx::Error> {
    let mut tx = conn.begin().await?;
    match sqlx::raw_sql(script).execute(&mut *tx).await {
        Ok(done) => {
            tx.commit().await?;
            Ok(done.rows_affected())
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}
