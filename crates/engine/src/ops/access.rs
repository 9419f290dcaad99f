//! Shared row lookups used by the operation modules.

use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};

use crate::{
    Category, EngineError, LinkedEntry, LinkedTransaction, ResultEngine, Subcategory, Transaction,
    Wallet, categories, linked_entries, linked_transactions, subcategories, transactions, wallets,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
    ) -> ResultEngine<Wallet> {
        let model = wallets::Entity::find_by_id(wallet_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))?;
        Wallet::try_from(model)
    }

    pub(super) async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(tx_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    pub(super) async fn require_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry_id: Uuid,
    ) -> ResultEngine<LinkedEntry> {
        let model = linked_entries::Entity::find_by_id(entry_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("linked entry not exists".to_string()))?;
        LinkedEntry::try_from(model)
    }

    pub(super) async fn require_category(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
    ) -> ResultEngine<Category> {
        let model = categories::Entity::find_by_id(category_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
        Category::try_from(model)
    }

    pub(super) async fn require_subcategory(
        &self,
        db_tx: &DatabaseTransaction,
        subcategory_id: Uuid,
    ) -> ResultEngine<Subcategory> {
        let model = subcategories::Entity::find_by_id(subcategory_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("subcategory not exists".to_string()))?;
        Subcategory::try_from(model)
    }

    /// The entry owned by a primary transaction, if any.
    pub(super) async fn entry_for_primary(
        &self,
        db_tx: &DatabaseTransaction,
        tx_id: Uuid,
    ) -> ResultEngine<Option<LinkedEntry>> {
        let model = linked_entries::Entity::find()
            .filter(linked_entries::Column::PrimaryTransactionId.eq(tx_id.to_string()))
            .one(db_tx)
            .await?;
        model.map(LinkedEntry::try_from).transpose()
    }

    /// The join row through which a transaction settles an entry, if any.
    pub(super) async fn link_for_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx_id: Uuid,
    ) -> ResultEngine<Option<LinkedTransaction>> {
        let model = linked_transactions::Entity::find()
            .filter(linked_transactions::Column::TransactionId.eq(tx_id.to_string()))
            .one(db_tx)
            .await?;
        model.map(LinkedTransaction::try_from).transpose()
    }

    /// Whether a transaction participates in any entry, as primary or as a
    /// settling row.
    pub(super) async fn is_entry_involved(
        &self,
        db_tx: &DatabaseTransaction,
        tx_id: Uuid,
    ) -> ResultEngine<bool> {
        if self.entry_for_primary(db_tx, tx_id).await?.is_some() {
            return Ok(true);
        }
        Ok(self.link_for_transaction(db_tx, tx_id).await?.is_some())
    }
}
