use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, Transaction,
    classify::{Classification, Direction},
    transactions,
};

use super::super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` and `to` are inclusive ledger dates.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub wallet_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub direction: Option<Direction>,
    pub classification: Option<Classification>,
    pub category_id: Option<Uuid>,
    /// If true, excludes ignored rows (default: include them).
    pub exclude_ignored: bool,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(wallet_id) = filter.wallet_id {
            self = self.filter(transactions::Column::WalletId.eq(wallet_id.to_string()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::Date.lte(to));
        }
        if let Some(direction) = filter.direction {
            self = self.filter(transactions::Column::Direction.eq(direction.as_str()));
        }
        if let Some(classification) = filter.classification {
            self = self.filter(transactions::Column::Classification.eq(classification.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id.to_string()));
        }
        if filter.exclude_ignored {
            self = self.filter(transactions::Column::IsIgnored.eq(false));
        }
        self
    }
}

impl Engine {
    /// Lists transactions, newest first by `(date, time, id)`.
    pub async fn list_transactions(
        &self,
        filter: &TransactionListFilter,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;
        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find()
                .apply_tx_filters(filter)
                .order_by_desc(transactions::Column::Date)
                .order_by_desc(transactions::Column::Time)
                .order_by_desc(transactions::Column::Id);
            if let Some(limit) = limit {
                query = query.limit(limit);
            }

            let mut out = Vec::new();
            for model in query.all(&db_tx).await? {
                out.push(Transaction::try_from(model)?);
            }
            Ok(out)
        })
    }
}
