use crate::error::DbError;
use crate::store::{check_guards, LedgerStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Account, AccountStatement, Execution, LedgerEntry, PendingEntry};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Row, Transaction};
use uuid::Uuid;

/// The `PgLedgerStore` keeps accounts and the ledger in PostgreSQL.
/// It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Creates a new `PgLedgerStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks the account row for the rest of the transaction and returns its cash.
    async fn lock_account(tx: &mut Transaction<'_, Postgres>, account_id: Uuid) -> Result<Decimal, DbError> {
        let row = sqlx::query("SELECT cash FROM accounts WHERE account_id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(DbError::AccountNotFound(account_id))?;
        Ok(row.try_get("cash")?)
    }

    async fn sum_shares(
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<i64, DbError> {
        // SUM(BIGINT) is NUMERIC in PostgreSQL, hence the cast.
        let held: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(shares), 0)::BIGINT FROM ledger_entries WHERE account_id = $1 AND symbol = $2",
        )
        .bind(account_id)
        .bind(symbol)
        .fetch_one(&mut **tx)
        .await?;
        Ok(held)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn open_account(&self, initial_cash: Decimal) -> Result<Account, DbError> {
        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (account_id, cash, created_at) VALUES ($1, $2, NOW()) RETURNING account_id, cash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(initial_cash)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn account(&self, account_id: Uuid) -> Result<Account, DbError> {
        sqlx::query_as::<_, Account>("SELECT account_id, cash, created_at FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::AccountNotFound(account_id))
    }

    async fn net_shares(&self, account_id: Uuid, symbol: &str) -> Result<i64, DbError> {
        // Selecting from `accounts` lets an unknown account surface as `AccountNotFound`.
        let held: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(
                (SELECT SUM(shares) FROM ledger_entries WHERE account_id = $1 AND symbol = $2),
                0
            )::BIGINT
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        held.ok_or(DbError::AccountNotFound(account_id))
    }

    async fn statement(&self, account_id: Uuid) -> Result<AccountStatement, DbError> {
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;
        // Both reads must observe the same snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let account = sqlx::query_as::<_, Account>(
            "SELECT account_id, cash, created_at FROM accounts WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::AccountNotFound(account_id))?;

        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT entry_id, account_id, symbol, shares, price, executed_at
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY executed_at ASC, entry_id ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AccountStatement { account, entries })
    }

    async fn append(&self, entry: PendingEntry) -> Result<Execution, DbError> {
        // Dropping `tx` on any early return rolls the whole unit back.
        let mut tx = self.pool.begin().await?;

        let cash = Self::lock_account(&mut tx, entry.account_id()).await?;
        let held = if entry.shares() < 0 {
            Self::sum_shares(&mut tx, entry.account_id(), entry.symbol()).await?
        } else {
            0
        };
        check_guards(&entry, cash, held)?;

        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries (account_id, symbol, shares, price, executed_at)
            VALUES ($1, $2, $3, $4, clock_timestamp())
            RETURNING entry_id, executed_at
            "#,
        )
        .bind(entry.account_id())
        .bind(entry.symbol())
        .bind(entry.shares())
        .bind(entry.price())
        .fetch_one(&mut *tx)
        .await?;
        let entry_id: i64 = row.try_get("entry_id")?;
        let executed_at: DateTime<Utc> = row.try_get("executed_at")?;

        let cash_after: Decimal = sqlx::query_scalar(
            "UPDATE accounts SET cash = cash + $1 WHERE account_id = $2 RETURNING cash",
        )
        .bind(entry.cash_delta())
        .bind(entry.account_id())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Execution {
            entry: entry.into_entry(entry_id, executed_at),
            cash_after,
        })
    }
}
