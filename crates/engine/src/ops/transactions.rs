//! Transaction reads, writes, and composite operations.

mod calibrate;
mod list;
mod merge;
mod transfer;
mod write;

pub use list::TransactionListFilter;
pub use write::{NewTransaction, TransactionUpdate};

use uuid::Uuid;

use sea_orm::TransactionTrait;

use crate::{ResultEngine, Transaction};

use super::{Engine, with_tx};

impl Engine {
    /// Return a transaction from DB.
    pub async fn transaction(&self, tx_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| self.require_transaction(&db_tx, tx_id).await)
    }
}
