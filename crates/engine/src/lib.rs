//! Personal ledger engine.
//!
//! Tracks money movement across wallets while separating true economic
//! effect (spending, earning) from mere cash movement (lending, borrowing,
//! bill splits, transfers between own wallets, credit card installments).
//! Wallet balances are served from cached end-of-day snapshots with
//! cascading invalidation; settlement state lives in `LinkedEntry` rows;
//! every multi-row operation runs inside one store transaction.

pub use budgets::Budget;
pub use categories::Category;
pub use classify::{Classification, Contribution, Direction, TransitionOp};
pub use error::EngineError;
pub use linked_entries::{LinkStatus, LinkType, LinkedEntry};
pub use linked_transactions::LinkedTransaction;
pub use ops::{
    BudgetStatus, CategoryTotal, Engine, EngineBuilder, LinkedEntryFilter, MonthlySummary,
    NetPosition, NewTransaction, SnapshotPolicy, SubcategoryTotal, TransactionListFilter,
    TransactionUpdate,
};
pub use snapshots::WalletSnapshot;
pub use subcategories::Subcategory;
pub use transactions::Transaction;
pub use wallets::{Wallet, WalletKind};

mod budgets;
mod categories;
pub mod classify;
mod error;
mod linked_entries;
mod linked_transactions;
mod ops;
mod snapshots;
mod subcategories;
mod transactions;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
