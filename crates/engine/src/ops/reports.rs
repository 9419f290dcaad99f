//! Spending and earning reports.
//!
//! Everything here rides on [`classify::contribution`]: balances answer
//! "where is the money", these answer "what did it actually cost". Cash
//! movement (transfers, lending, repayments) contributes zero.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Category, EngineError, ResultEngine, Transaction,
    classify::{self, Classification, Contribution},
    linked_entries, transactions,
    util::month_bounds,
};

use super::{Engine, with_tx};

/// Total economic effect over one calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub expense_minor: i64,
    pub income_minor: i64,
}

/// Per-category totals; `None` collects uncategorized transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub expense_minor: i64,
    pub income_minor: i64,
}

/// Per-subcategory totals within one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryTotal {
    pub subcategory_id: Option<Uuid>,
    pub name: Option<String>,
    pub expense_minor: i64,
    pub income_minor: i64,
}

/// One month's budget against what was actually spent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub category_id: Uuid,
    pub name: String,
    pub budget_minor: i64,
    pub spent_minor: i64,
    /// Negative when the budget is exceeded.
    pub remaining_minor: i64,
}

impl Engine {
    /// Total expense and income for one calendar month.
    pub async fn monthly_summary(&self, year: i32, month: u32) -> ResultEngine<MonthlySummary> {
        let (first, last) = month_bounds(year, month)?;
        with_tx!(self, |db_tx| {
            let mut expense = 0;
            let mut income = 0;
            for (_, c) in self.contributions_in_range(&db_tx, first, last).await? {
                expense += c.expense_minor;
                income += c.income_minor;
            }
            Ok(MonthlySummary {
                year,
                month,
                expense_minor: expense,
                income_minor: income,
            })
        })
    }

    /// Month-bucketed totals over an inclusive date range.
    pub async fn period_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<MonthlySummary>> {
        if from > to {
            return Err(EngineError::InvalidAmount(
                "invalid range: from must be <= to".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let mut buckets: BTreeMap<(i32, u32), (i64, i64)> = BTreeMap::new();
            for (tx, c) in self.contributions_in_range(&db_tx, from, to).await? {
                let bucket = buckets
                    .entry((tx.date.year(), tx.date.month()))
                    .or_default();
                bucket.0 += c.expense_minor;
                bucket.1 += c.income_minor;
            }
            Ok(buckets
                .into_iter()
                .map(|((year, month), (expense, income))| MonthlySummary {
                    year,
                    month,
                    expense_minor: expense,
                    income_minor: income,
                })
                .collect())
        })
    }

    /// Per-category totals for one calendar month. Uncategorized
    /// transactions land in a `None` bucket.
    pub async fn category_breakdown(
        &self,
        year: i32,
        month: u32,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let (first, last) = month_bounds(year, month)?;
        with_tx!(self, |db_tx| {
            let mut buckets: BTreeMap<Option<Uuid>, (i64, i64)> = BTreeMap::new();
            for (tx, c) in self.contributions_in_range(&db_tx, first, last).await? {
                let bucket = buckets.entry(tx.category_id).or_default();
                bucket.0 += c.expense_minor;
                bucket.1 += c.income_minor;
            }

            let names = self.category_names(&db_tx, buckets.keys().copied()).await?;
            Ok(buckets
                .into_iter()
                .map(|(category_id, (expense, income))| CategoryTotal {
                    category_id,
                    name: category_id.and_then(|id| names.get(&id).cloned()),
                    expense_minor: expense,
                    income_minor: income,
                })
                .collect())
        })
    }

    /// Per-subcategory totals within one category for one calendar month.
    pub async fn subcategory_breakdown(
        &self,
        category_id: Uuid,
        year: i32,
        month: u32,
    ) -> ResultEngine<Vec<SubcategoryTotal>> {
        let (first, last) = month_bounds(year, month)?;
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;

            let mut buckets: BTreeMap<Option<Uuid>, (i64, i64)> = BTreeMap::new();
            for (tx, c) in self.contributions_in_range(&db_tx, first, last).await? {
                if tx.category_id != Some(category_id) {
                    continue;
                }
                let bucket = buckets.entry(tx.subcategory_id).or_default();
                bucket.0 += c.expense_minor;
                bucket.1 += c.income_minor;
            }

            let mut names = HashMap::new();
            for model in crate::subcategories::Entity::find()
                .filter(crate::subcategories::Column::CategoryId.eq(category_id.to_string()))
                .all(&db_tx)
                .await?
            {
                let subcategory = crate::Subcategory::try_from(model)?;
                names.insert(subcategory.id, subcategory.name);
            }

            Ok(buckets
                .into_iter()
                .map(|(subcategory_id, (expense, income))| SubcategoryTotal {
                    subcategory_id,
                    name: subcategory_id.and_then(|id| names.get(&id).cloned()),
                    expense_minor: expense,
                    income_minor: income,
                })
                .collect())
        })
    }

    /// Every budget defined for a month, with the spend recorded so far.
    pub async fn budget_status(&self, year: i32, month: u32) -> ResultEngine<Vec<BudgetStatus>> {
        let (first, last) = month_bounds(year, month)?;
        with_tx!(self, |db_tx| {
            let budgets = crate::budgets::Entity::find()
                .filter(crate::budgets::Column::Year.eq(year))
                .filter(crate::budgets::Column::Month.eq(month as i32))
                .all(&db_tx)
                .await?;
            if budgets.is_empty() {
                return Ok(Vec::new());
            }

            let mut spent: HashMap<Uuid, i64> = HashMap::new();
            for (tx, c) in self.contributions_in_range(&db_tx, first, last).await? {
                if let Some(category_id) = tx.category_id {
                    *spent.entry(category_id).or_default() += c.expense_minor;
                }
            }

            let mut out = Vec::with_capacity(budgets.len());
            for model in budgets {
                let budget = crate::Budget::try_from(model)?;
                let category = self.require_category(&db_tx, budget.category_id).await?;
                let spent_minor = spent.get(&budget.category_id).copied().unwrap_or(0);
                out.push(BudgetStatus {
                    category_id: budget.category_id,
                    name: category.name,
                    budget_minor: budget.amount_minor,
                    spent_minor,
                    remaining_minor: budget.amount_minor - spent_minor,
                });
            }
            Ok(out)
        })
    }

    /// Load every transaction in an inclusive range together with its
    /// economic contribution. Split primaries need their entry's
    /// user-share, fetched in one batch.
    async fn contributions_in_range(
        &self,
        db_tx: &DatabaseTransaction,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<(Transaction, Contribution)>> {
        let mut txs = Vec::new();
        for model in transactions::Entity::find()
            .filter(transactions::Column::Date.gte(from))
            .filter(transactions::Column::Date.lte(to))
            .all(db_tx)
            .await?
        {
            txs.push(Transaction::try_from(model)?);
        }

        let split_ids: Vec<String> = txs
            .iter()
            .filter(|tx| tx.classification == Classification::SplitPayment)
            .map(|tx| tx.id.to_string())
            .collect();
        let mut user_amounts: HashMap<Uuid, i64> = HashMap::new();
        if !split_ids.is_empty() {
            for model in linked_entries::Entity::find()
                .filter(linked_entries::Column::PrimaryTransactionId.is_in(split_ids))
                .all(db_tx)
                .await?
            {
                let entry = crate::LinkedEntry::try_from(model)?;
                if let Some(user_amount) = entry.user_amount_minor {
                    user_amounts.insert(entry.primary_transaction_id, user_amount);
                }
            }
        }

        Ok(txs
            .into_iter()
            .map(|tx| {
                let c = classify::contribution(
                    tx.direction,
                    tx.classification,
                    tx.is_ignored,
                    tx.amount_minor,
                    user_amounts.get(&tx.id).copied(),
                );
                (tx, c)
            })
            .collect())
    }

    async fn category_names(
        &self,
        db_tx: &DatabaseTransaction,
        ids: impl Iterator<Item = Option<Uuid>>,
    ) -> ResultEngine<HashMap<Uuid, String>> {
        let wanted: Vec<String> = ids.flatten().map(|id| id.to_string()).collect();
        let mut names = HashMap::new();
        if wanted.is_empty() {
            return Ok(names);
        }
        for model in crate::categories::Entity::find()
            .filter(crate::categories::Column::Id.is_in(wanted))
            .all(db_tx)
            .await?
        {
            let category = Category::try_from(model)?;
            names.insert(category.id, category.name);
        }
        Ok(names)
    }
}
