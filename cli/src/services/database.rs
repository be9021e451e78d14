use crate::{
    error::{AppError, Result},
    models::{TradeSignal, Transaction},
};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// SQLite trade diary holding one table of recorded signals and orders
#[derive(Debug, Clone)]
pub struct TradeDiary {
    pool: SqlitePool,
    table: String,
    database_path: PathBuf,
}

impl TradeDiary {
    /// Open (or create) the diary at `database_path` and ensure `table` exists
    pub async fn open(database_path: &Path, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        info!("Opening trade diary at {:?} (table {})", database_path, table);

        if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));

        // Single writer; the bot never needs more than one connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await?;

        let diary = Self {
            pool,
            table: table.to_string(),
            database_path: database_path.to_path_buf(),
        };
        diary.initialize().await?;
        Ok(diary)
    }

    async fn initialize(&self) -> Result<()> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at DATETIME NOT NULL,
                coin TEXT NOT NULL,
                stable_coin TEXT NOT NULL,
                signal TEXT NOT NULL,
                close_price REAL NOT NULL,
                quantity REAL NOT NULL,
                quote_amount REAL NOT NULL,
                order_id TEXT,
                dry_run INTEGER NOT NULL DEFAULT 0
            )
            "#,
            table = self.table
        );
        sqlx::query(&create_table).execute(&self.pool).await?;

        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_market_time ON {table}(coin, stable_coin, recorded_at DESC)",
            table = self.table
        );
        sqlx::query(&create_index).execute(&self.pool).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.database_path
    }

    /// Insert `transaction` and return its row id
    pub async fn record(&self, transaction: &Transaction) -> Result<i64> {
        let insert = format!(
            "INSERT INTO {} (recorded_at, coin, stable_coin, signal, close_price, quantity, quote_amount, order_id, dry_run) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        );
        let result = sqlx::query(&insert)
            .bind(transaction.recorded_at)
            .bind(&transaction.coin)
            .bind(&transaction.stable_coin)
            .bind(transaction.signal.as_str())
            .bind(transaction.close_price)
            .bind(transaction.quantity)
            .bind(transaction.quote_amount)
            .bind(transaction.order_id.as_deref())
            .bind(transaction.dry_run)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Most recent transaction for the `coin`/`stable_coin` market
    pub async fn last_transaction(&self, coin: &str, stable_coin: &str) -> Result<Option<Transaction>> {
        let select = format!(
            "SELECT id, recorded_at, coin, stable_coin, signal, close_price, quantity, quote_amount, order_id, dry_run \
             FROM {} WHERE coin = ? AND stable_coin = ? ORDER BY recorded_at DESC, id DESC LIMIT 1",
            self.table
        );
        let row = sqlx::query(&select)
            .bind(coin)
            .bind(stable_coin)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_transaction(&r)).transpose()
    }

    pub async fn count(&self) -> Result<i64> {
        let select = format!("SELECT COUNT(*) AS total FROM {}", self.table);
        let row = sqlx::query(&select).fetch_one(&self.pool).await?;
        Ok(row.try_get("total")?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let signal: String = row.try_get("signal")?;
    let recorded_at: DateTime<Utc> = row.try_get("recorded_at")?;
    Ok(Transaction {
        id: Some(row.try_get("id")?),
        recorded_at,
        coin: row.try_get("coin")?,
        stable_coin: row.try_get("stable_coin")?,
        signal: signal.parse::<TradeSignal>()?,
        close_price: row.try_get("close_price")?,
        quantity: row.try_get("quantity")?,
        quote_amount: row.try_get("quote_amount")?,
        order_id: row.try_get("order_id")?,
        dry_run: row.try_get("dry_run")?,
    })
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` is allowed
pub fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("Invalid table name '{}'", table)))
    }
}
