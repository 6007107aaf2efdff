// SQLite ORM context
//
// Reads go through the pool. Each unit of work gets its own connection,
// opened outside the pool and closed explicitly by `close_connection`.

use crate::binding::{bind_value, decode_rows};
use crate::catalog::ProcedureCatalog;
use crate::connection::{connect_options, create_pool, open_connection, PoolSettings};
use crate::error::map_sqlx_error;
use crate::sql;
use crate::unit_of_work::{Parked, SqliteUnitOfWork};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Connection;
use std::sync::Arc;
use stinger_core::domain::{Filter, RowSet};
use stinger_core::error::Result;
use stinger_core::port::{IsolationLevel, OrmContext, UnitOfWork};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct SqliteOrmContext {
    pool: SqlitePool,
    options: SqliteConnectOptions,
    catalog: Arc<ProcedureCatalog>,
    parked: Parked,
}

impl SqliteOrmContext {
    pub fn new(pool: SqlitePool, options: SqliteConnectOptions, catalog: ProcedureCatalog) -> Self {
        Self {
            pool,
            options,
            catalog: Arc::new(catalog),
            parked: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the pool for `database_url` and build a context over it
    pub async fn connect(
        database_url: &str,
        settings: &PoolSettings,
        catalog: ProcedureCatalog,
    ) -> Result<Self> {
        let options = connect_options(database_url, settings)?;
        let pool = create_pool(database_url, settings).await?;
        info!(procedures = catalog.len(), "SQLite context ready");
        Ok(Self::new(pool, options, catalog))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn catalog(&self) -> &ProcedureCatalog {
        &self.catalog
    }

    async fn close_parked(&self) -> Result<()> {
        let parked = self.parked.lock().await.take();
        if let Some(conn) = parked {
            conn.close().await.map_err(map_sqlx_error)?;
            debug!("Closed transaction connection");
        }
        Ok(())
    }
}

#[async_trait]
impl OrmContext for SqliteOrmContext {
    fn store_kind(&self) -> &'static str {
        "sqlite"
    }

    async fn begin_transaction(&self, isolation: IsolationLevel) -> Result<Box<dyn UnitOfWork>> {
        // A leftover connection means the last unit of work was never closed
        self.close_parked().await?;

        // SQLite transactions are serializable and begin IMMEDIATE; the requested level is a floor
        debug!(isolation = %isolation, "Beginning transaction");
        let conn = open_connection(&self.options).await?;
        let unit = SqliteUnitOfWork::begin(conn, self.catalog.clone(), self.parked.clone()).await?;
        Ok(Box::new(unit))
    }

    async fn select(&self, table: &str, filter: Option<&Filter>) -> Result<RowSet> {
        let statement = sql::select(table, filter);
        debug!(sql = %statement.sql, "Selecting");
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.binds {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        decode_rows(&rows)
    }

    async fn close_connection(&self) -> Result<()> {
        self.close_parked().await
    }
}
