//! Wallet lifecycle and calibration.

use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

use crate::{
    EngineError, ResultEngine, Transaction, Wallet,
    classify::{Classification, Direction},
    snapshots, transactions, wallets,
    wallets::WalletKind,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Return a wallet from DB.
    pub async fn wallet(&self, wallet_id: Uuid) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| self.require_wallet(&db_tx, wallet_id).await)
    }

    /// List every wallet.
    pub async fn list_wallets(&self) -> ResultEngine<Vec<Wallet>> {
        with_tx!(self, |db_tx| {
            let mut out = Vec::new();
            for model in wallets::Entity::find().all(&db_tx).await? {
                out.push(Wallet::try_from(model)?);
            }
            Ok(out)
        })
    }

    /// Add a new wallet.
    ///
    /// `initial_balance_minor` is modeled as an opening transaction dated
    /// `today`, flagged ignored so it moves the balance without counting
    /// as income or spending in reports.
    pub async fn new_wallet(
        &self,
        name: &str,
        kind: WalletKind,
        credit_limit_minor: i64,
        initial_balance_minor: i64,
        today: NaiveDate,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "wallet")?;
        with_tx!(self, |db_tx| {
            let exists = wallets::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name.to_string()));
            }

            let wallet = Wallet::new(name, kind, credit_limit_minor)?;
            let wallet_id = wallet.id;
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;

            if initial_balance_minor != 0 {
                let (direction, classification) = if initial_balance_minor > 0 {
                    (Direction::Inflow, Classification::Income)
                } else {
                    (Direction::Outflow, Classification::Expense)
                };
                let mut opening = Transaction::new(
                    wallet_id,
                    today,
                    None,
                    direction,
                    initial_balance_minor.abs(),
                    classification,
                    "Opening balance".to_string(),
                )?;
                opening.is_ignored = true;
                transactions::ActiveModel::from(&opening)
                    .insert(&db_tx)
                    .await?;
            }

            Ok(wallet_id)
        })
    }

    /// Renames an existing wallet.
    pub async fn rename_wallet(&self, wallet_id: Uuid, new_name: &str) -> ResultEngine<()> {
        let new_name = normalize_required_name(new_name, "wallet")?;
        with_tx!(self, |db_tx| {
            self.require_wallet(&db_tx, wallet_id).await?;

            let exists = wallets::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(new_name.to_lowercase()))
                .filter(wallets::Column::Id.ne(wallet_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(new_name));
            }

            let active = wallets::ActiveModel {
                id: ActiveValue::Set(wallet_id.to_string()),
                name: ActiveValue::Set(new_name),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete an empty wallet and its snapshots. Wallets with transactions
    /// are rejected; delete or move the history first.
    pub async fn delete_wallet(&self, wallet_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet(&db_tx, wallet_id).await?;

            let used = transactions::Entity::find()
                .filter(transactions::Column::WalletId.eq(wallet_id.to_string()))
                .count(&db_tx)
                .await?;
            if used > 0 {
                return Err(EngineError::InvalidAmount(format!(
                    "wallet '{}' still has {used} transactions",
                    wallet.name
                )));
            }

            snapshots::Entity::delete_many()
                .filter(snapshots::Column::WalletId.eq(wallet_id.to_string()))
                .exec(&db_tx)
                .await?;
            wallets::Entity::delete_by_id(wallet_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Reconcile a declared real balance against the computed one by
    /// creating a calibration transaction covering the difference.
    pub async fn calibrate_wallet(
        &self,
        wallet_id: Uuid,
        actual_balance_minor: i64,
        today: NaiveDate,
    ) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet(&db_tx, wallet_id).await?;
            let computed = self.balance_in_tx(&db_tx, &wallet, today, today).await?;
            let difference = actual_balance_minor - computed;
            if difference == 0 {
                return Err(EngineError::InvalidAmount(
                    "wallet already balanced".to_string(),
                ));
            }

            // Raising a normal wallet's balance takes an inflow; raising a
            // credit wallet's (its debt) takes an outflow.
            let raises = difference > 0;
            let direction = match (wallet.kind, raises) {
                (WalletKind::Normal, true) | (WalletKind::Credit, false) => Direction::Inflow,
                (WalletKind::Normal, false) | (WalletKind::Credit, true) => Direction::Outflow,
            };
            let classification = match direction {
                Direction::Inflow => Classification::Income,
                _ => Classification::Expense,
            };

            let mut calibration = Transaction::new(
                wallet.id,
                today,
                None,
                direction,
                difference.abs(),
                classification,
                "CALIBRATION".to_string(),
            )?;
            calibration.is_calibration = true;
            transactions::ActiveModel::from(&calibration)
                .insert(&db_tx)
                .await?;
            self.invalidate_snapshots(&db_tx, wallet.id, today).await?;

            info!(
                wallet = %wallet.id,
                difference,
                "created calibration transaction"
            );
            Ok(calibration.id)
        })
    }
}
