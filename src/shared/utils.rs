use crate::config::AppConfig;
use crate::shared::error::ApiError;
use anyhow::{Context, Result};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_conn(config: &AppConfig) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(config.database_url());
    Pool::builder()
        .max_size(config.database.pool_size)
        .build(manager)
        .context("failed to create database pool")
}

/// Checkout wrapper so handlers can use `?` without naming the pool error type.
pub fn db_conn(pool: &DbPool) -> Result<DbConn, ApiError> {
    pool.get()
        .map_err(|e| ApiError::Failed(anyhow::anyhow!("connection pool: {e}")))
}

/// Run database migrations
pub fn run_migrations(conn: &mut PgConnection) -> Result<()> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("migration error: {e}"))?;
    Ok(())
}

/// Clamped page/limit pair with the offset math in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(20).clamp(1, Self::MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total == 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp_and_default() {
        let p = PageParams::new(None, None);
        assert_eq!((p.page, p.limit), (1, 20));
        let p = PageParams::new(Some(0), Some(1000));
        assert_eq!((p.page, p.limit), (1, 100));
        let p = PageParams::new(Some(3), Some(25));
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = PageParams::new(Some(1), Some(20));
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(20), 1);
        assert_eq!(p.total_pages(21), 2);
    }
}
