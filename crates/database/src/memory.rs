use crate::error::DbError;
use crate::store::{check_guards, LedgerStore};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Account, AccountStatement, Execution, LedgerEntry, PendingEntry};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug)]
struct Book {
    account: Account,
    entries: Vec<LedgerEntry>,
}

impl Book {
    fn held(&self, symbol: &str) -> Result<i64, DbError> {
        self.entries
            .iter()
            .filter(|e| e.symbol == symbol)
            .try_fold(0i64, |acc, e| acc.checked_add(e.shares))
            .ok_or_else(|| {
                DbError::IntegrityViolation(format!("net position in {} overflows i64", symbol))
            })
    }
}

/// An in-process [`LedgerStore`].
///
/// Each account lives behind its own mutex, so writes to one account
/// serialize while different accounts proceed independently. Used for paper
/// trading and tests.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    books: RwLock<HashMap<Uuid, Arc<Mutex<Book>>>>,
    next_entry_id: AtomicI64,
    offline: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while offline every call fails with
    /// [`DbError::Unavailable`] and nothing is written.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), DbError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn book(&self, account_id: Uuid) -> Result<Arc<Mutex<Book>>, DbError> {
        self.ensure_online()?;
        self.books
            .read()
            .await
            .get(&account_id)
            .cloned()
            .ok_or(DbError::AccountNotFound(account_id))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn open_account(&self, initial_cash: Decimal) -> Result<Account, DbError> {
        self.ensure_online()?;
        if initial_cash.is_sign_negative() {
            return Err(DbError::IntegrityViolation(format!(
                "account cash must not be negative, got {}",
                initial_cash
            )));
        }
        let account = Account {
            account_id: Uuid::new_v4(),
            cash: initial_cash,
            created_at: Utc::now(),
        };
        let book = Book {
            account: account.clone(),
            entries: Vec::new(),
        };
        self.books
            .write()
            .await
            .insert(account.account_id, Arc::new(Mutex::new(book)));
        Ok(account)
    }

    async fn account(&self, account_id: Uuid) -> Result<Account, DbError> {
        let book = self.book(account_id).await?;
        let guard = book.lock().await;
        Ok(guard.account.clone())
    }

    async fn net_shares(&self, account_id: Uuid, symbol: &str) -> Result<i64, DbError> {
        let book = self.book(account_id).await?;
        let guard = book.lock().await;
        guard.held(symbol)
    }

    async fn statement(&self, account_id: Uuid) -> Result<AccountStatement, DbError> {
        let book = self.book(account_id).await?;
        let guard = book.lock().await;
        let mut entries = guard.entries.clone();
        entries.sort_by(|a, b| {
            a.executed_at
                .cmp(&b.executed_at)
                .then(a.entry_id.cmp(&b.entry_id))
        });
        Ok(AccountStatement {
            account: guard.account.clone(),
            entries,
        })
    }

    async fn append(&self, entry: PendingEntry) -> Result<Execution, DbError> {
        let book = self.book(entry.account_id()).await?;
        let mut guard = book.lock().await;

        let held = guard.held(entry.symbol())?;
        check_guards(&entry, guard.account.cash, held)?;

        let entry_id = self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1;
        guard.account.cash += entry.cash_delta();
        let cash_after = guard.account.cash;
        let committed = entry.into_entry(entry_id, Utc::now());
        guard.entries.push(committed.clone());

        Ok(Execution {
            entry: committed,
            cash_after,
        })
    }
}
