//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for Saldo:
//!
//! - `wallets`: money locations (cash, bank, credit card)
//! - `categories` / `subcategories`: reporting reference data
//! - `budgets`: monthly per-category spending limits
//! - `transactions`: dated money movements with classification
//! - `linked_entries`: settlement state for splits, loans, debts, installments
//! - `linked_transactions`: join rows settling an entry
//! - `wallet_snapshots`: cached end-of-day balances

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Wallets {
    Table,
    Id,
    Name,
    Kind,
    CreditLimitMinor,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Subcategories {
    Table,
    Id,
    CategoryId,
    Name,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    CategoryId,
    Year,
    Month,
    AmountMinor,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    WalletId,
    Date,
    Time,
    Direction,
    AmountMinor,
    Classification,
    Description,
    CategoryId,
    SubcategoryId,
    PairedTransactionId,
    IsIgnored,
    IsCalibration,
}

#[derive(Iden)]
enum LinkedEntries {
    Table,
    Id,
    LinkType,
    PrimaryTransactionId,
    CounterpartyName,
    TotalAmountMinor,
    UserAmountMinor,
    PendingAmountMinor,
    Status,
    Notes,
}

#[derive(Iden)]
enum LinkedTransactions {
    Table,
    Id,
    LinkedEntryId,
    TransactionId,
}

#[derive(Iden)]
enum WalletSnapshots {
    Table,
    Id,
    WalletId,
    SnapshotDate,
    BalanceMinor,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Wallets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Wallets::Name).string().not_null())
                    .col(ColumnDef::new(Wallets::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Wallets::CreditLimitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallets-name-unique")
                    .table(Wallets::Table)
                    .col(Wallets::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-name-unique")
                    .table(Categories::Table)
                    .col(Categories::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Subcategories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Subcategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subcategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subcategories::CategoryId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subcategories::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subcategories-category_id")
                            .from(Subcategories::Table, Subcategories::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-subcategories-category_id-name-unique")
                    .table(Subcategories::Table)
                    .col(Subcategories::CategoryId)
                    .col(Subcategories::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Budgets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Budgets::CategoryId).string().not_null())
                    .col(ColumnDef::new(Budgets::Year).integer().not_null())
                    .col(ColumnDef::new(Budgets::Month).integer().not_null())
                    .col(ColumnDef::new(Budgets::AmountMinor).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-category_id")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-category_id-year-month-unique")
                    .table(Budgets::Table)
                    .col(Budgets::CategoryId)
                    .col(Budgets::Year)
                    .col(Budgets::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::WalletId).string().not_null())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(ColumnDef::new(Transactions::Time).time())
                    .col(ColumnDef::new(Transactions::Direction).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Classification)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CategoryId).string())
                    .col(ColumnDef::new(Transactions::SubcategoryId).string())
                    .col(ColumnDef::new(Transactions::PairedTransactionId).string())
                    .col(ColumnDef::new(Transactions::IsIgnored).boolean().not_null())
                    .col(
                        ColumnDef::new(Transactions::IsCalibration)
                            .boolean()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-wallet_id")
                            .from(Transactions::Table, Transactions::WalletId)
                            .to(Wallets::Table, Wallets::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-subcategory_id")
                            .from(Transactions::Table, Transactions::SubcategoryId)
                            .to(Subcategories::Table, Subcategories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-wallet_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::WalletId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Linked entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LinkedEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinkedEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LinkedEntries::LinkType).string().not_null())
                    .col(
                        ColumnDef::new(LinkedEntries::PrimaryTransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinkedEntries::CounterpartyName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinkedEntries::TotalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinkedEntries::UserAmountMinor).big_integer())
                    .col(
                        ColumnDef::new(LinkedEntries::PendingAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinkedEntries::Status).string().not_null())
                    .col(ColumnDef::new(LinkedEntries::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-linked_entries-primary_transaction_id")
                            .from(LinkedEntries::Table, LinkedEntries::PrimaryTransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One entry per primary transaction.
        manager
            .create_index(
                Index::create()
                    .name("idx-linked_entries-primary_transaction_id-unique")
                    .table(LinkedEntries::Table)
                    .col(LinkedEntries::PrimaryTransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Linked transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LinkedTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinkedTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinkedTransactions::LinkedEntryId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinkedTransactions::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-linked_transactions-linked_entry_id")
                            .from(LinkedTransactions::Table, LinkedTransactions::LinkedEntryId)
                            .to(LinkedEntries::Table, LinkedEntries::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-linked_transactions-transaction_id")
                            .from(LinkedTransactions::Table, LinkedTransactions::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // A transaction settles at most one entry.
        manager
            .create_index(
                Index::create()
                    .name("idx-linked_transactions-transaction_id-unique")
                    .table(LinkedTransactions::Table)
                    .col(LinkedTransactions::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Wallet snapshots
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(WalletSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletSnapshots::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WalletSnapshots::WalletId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletSnapshots::SnapshotDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletSnapshots::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-wallet_snapshots-wallet_id")
                            .from(WalletSnapshots::Table, WalletSnapshots::WalletId)
                            .to(Wallets::Table, Wallets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Concurrent lazy reads must not create duplicate snapshots.
        manager
            .create_index(
                Index::create()
                    .name("idx-wallet_snapshots-wallet_id-snapshot_date-unique")
                    .table(WalletSnapshots::Table)
                    .col(WalletSnapshots::WalletId)
                    .col(WalletSnapshots::SnapshotDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WalletSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LinkedTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LinkedEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subcategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        Ok(())
    }
}
