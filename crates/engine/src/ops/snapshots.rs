//! Snapshot cache plumbing.
//!
//! Balances are served as `snapshot + delta`: the newest snapshot at or
//! before the requested date plus a scan of the transactions after it.
//! Reads for today may lazily persist a snapshot at `today - 1` when the
//! newest one is stale, which bounds full rescans to the freshness window.
//! Mutations call [`Engine::invalidate_guarded`] so no snapshot ever
//! covers an edited date.

use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use tracing::{debug, warn};

use crate::{
    EngineError, ResultEngine, Wallet, WalletSnapshot,
    classify::{Classification, Direction},
    snapshots, transactions,
    wallets::WalletKind,
};

use super::Engine;

/// Freshness and rebuild-guard thresholds for the snapshot cache.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotPolicy {
    /// A snapshot older than this many days triggers a lazy refresh.
    pub freshness_days: i64,
    /// Invalidation discarding more than this many transactions is guarded.
    pub rebuild_rows: u64,
    /// The guard only applies to edits older than this many days.
    pub rebuild_age_days: i64,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            freshness_days: 7,
            rebuild_rows: 5_000,
            rebuild_age_days: 90,
        }
    }
}

impl Engine {
    pub(super) async fn latest_snapshot(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        on_or_before: NaiveDate,
    ) -> ResultEngine<Option<WalletSnapshot>> {
        let model = snapshots::Entity::find()
            .filter(snapshots::Column::WalletId.eq(wallet_id.to_string()))
            .filter(snapshots::Column::SnapshotDate.lte(on_or_before))
            .order_by_desc(snapshots::Column::SnapshotDate)
            .one(db_tx)
            .await?;
        model.map(WalletSnapshot::try_from).transpose()
    }

    /// Inclusive balance at end of `as_of`, starting from the newest
    /// snapshot at or before it.
    ///
    /// Ignored rows count (real money moved); Installment rows do not
    /// (reserved, not yet consummated). Credit wallets report debt as a
    /// positive number.
    pub(super) async fn scan_balance(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &Wallet,
        as_of: NaiveDate,
    ) -> ResultEngine<i64> {
        let snapshot = self.latest_snapshot(db_tx, wallet.id, as_of).await?;
        let mut balance = snapshot.as_ref().map_or(0, |s| s.balance_minor);

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet.id.to_string()))
            .filter(transactions::Column::Date.lte(as_of))
            .filter(transactions::Column::Classification.ne(Classification::Installment.as_str()));
        if let Some(snapshot) = &snapshot {
            query = query.filter(transactions::Column::Date.gt(snapshot.snapshot_date));
        }

        for model in query.all(db_tx).await? {
            let direction = Direction::try_from(model.direction.as_str())?;
            let signed = match (wallet.kind, direction) {
                (WalletKind::Normal, Direction::Inflow) => model.amount_minor,
                (WalletKind::Normal, Direction::Outflow) => -model.amount_minor,
                (WalletKind::Credit, Direction::Outflow) => model.amount_minor,
                (WalletKind::Credit, Direction::Inflow) => -model.amount_minor,
                (_, Direction::Reserved) => 0,
            };
            balance += signed;
        }

        Ok(balance)
    }

    /// Balance at end of `as_of`, refreshing the cache first when the read
    /// is for today. Historical reads never write.
    pub(super) async fn balance_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &Wallet,
        as_of: NaiveDate,
        today: NaiveDate,
    ) -> ResultEngine<i64> {
        if as_of == today {
            self.refresh_snapshot(db_tx, wallet, today).await?;
        }
        self.scan_balance(db_tx, wallet, as_of).await
    }

    /// Persist a snapshot at `today - 1` when the newest one is absent or
    /// older than the freshness window.
    async fn refresh_snapshot(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &Wallet,
        today: NaiveDate,
    ) -> ResultEngine<()> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(());
        };

        if let Some(latest) = self.latest_snapshot(db_tx, wallet.id, today).await? {
            let age_days = (today - latest.snapshot_date).num_days();
            if age_days <= self.snapshot_policy.freshness_days {
                return Ok(());
            }
        }

        let balance = self.scan_balance(db_tx, wallet, yesterday).await?;
        let snapshot = WalletSnapshot::new(wallet.id, yesterday, balance);
        debug!(
            wallet = %wallet.id,
            date = %yesterday,
            balance,
            "persisting lazy snapshot"
        );
        snapshots::ActiveModel::from(&snapshot).insert(db_tx).await?;
        Ok(())
    }

    /// Delete every snapshot at or after `from_date` for a wallet.
    pub(super) async fn invalidate_snapshots(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        from_date: NaiveDate,
    ) -> ResultEngine<u64> {
        let result = snapshots::Entity::delete_many()
            .filter(snapshots::Column::WalletId.eq(wallet_id.to_string()))
            .filter(snapshots::Column::SnapshotDate.gte(from_date))
            .exec(db_tx)
            .await?;
        if result.rows_affected > 0 {
            debug!(
                wallet = %wallet_id,
                from = %from_date,
                deleted = result.rows_affected,
                "invalidated snapshots"
            );
        }
        Ok(result.rows_affected)
    }

    /// Reject historical edits that would force an oversized rescan,
    /// unless the caller explicitly confirmed the rebuild.
    pub(super) async fn rebuild_guard(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        from_date: NaiveDate,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<()> {
        if allow_rebuild {
            return Ok(());
        }
        let age_days = (today - from_date).num_days();
        if age_days <= self.snapshot_policy.rebuild_age_days {
            return Ok(());
        }
        let affected = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet_id.to_string()))
            .filter(transactions::Column::Date.gte(from_date))
            .count(db_tx)
            .await?;
        if affected > self.snapshot_policy.rebuild_rows {
            warn!(
                wallet = %wallet_id,
                from = %from_date,
                affected,
                "rejected unconfirmed large snapshot rebuild"
            );
            return Err(EngineError::RebuildTooLarge(format!(
                "editing {from_date} would rescan {affected} transactions"
            )));
        }
        Ok(())
    }

    /// Guard, then invalidate. The shared path for every mutation that
    /// touches dated history.
    pub(super) async fn invalidate_guarded(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        from_date: NaiveDate,
        today: NaiveDate,
        allow_rebuild: bool,
    ) -> ResultEngine<()> {
        self.rebuild_guard(db_tx, wallet_id, from_date, today, allow_rebuild)
            .await?;
        self.invalidate_snapshots(db_tx, wallet_id, from_date)
            .await?;
        Ok(())
    }
}
