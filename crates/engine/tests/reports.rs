use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{Direction, Engine, NewTransaction, WalletKind};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn day(year: i32, month: u32, dom: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dom).unwrap()
}

fn expense(wallet_id: Uuid, date: NaiveDate, amount_minor: i64) -> NewTransaction {
    NewTransaction {
        wallet_id,
        date,
        time: None,
        direction: Direction::Outflow,
        amount_minor,
        description: "expense".to_string(),
        category_id: None,
        subcategory_id: None,
        is_ignored: false,
    }
}

fn income(wallet_id: Uuid, date: NaiveDate, amount_minor: i64) -> NewTransaction {
    NewTransaction {
        direction: Direction::Inflow,
        description: "income".to_string(),
        ..expense(wallet_id, date, amount_minor)
    }
}

#[tokio::test]
async fn monthly_summary_counts_only_economic_effect() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();

    engine
        .create_transaction(&income(bank, day(2026, 8, 1), 10_000), today, false)
        .await
        .unwrap();
    engine
        .create_transaction(&expense(bank, day(2026, 8, 10), 3_000), today, false)
        .await
        .unwrap();
    engine
        .transfer(bank, cash, 2_000, day(2026, 8, 15), "atm", today, false)
        .await
        .unwrap();

    let summary = engine.monthly_summary(2026, 8).await.unwrap();
    assert_eq!(summary.income_minor, 10_000);
    assert_eq!(summary.expense_minor, 3_000);
}

#[tokio::test]
async fn split_expense_reports_user_share_only() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let dinner = engine
        .create_transaction(&expense(bank, day(2026, 8, 12), 6_000), today, false)
        .await
        .unwrap();
    engine.mark_as_split(dinner, 2_000, "Bob", None).await.unwrap();

    let summary = engine.monthly_summary(2026, 8).await.unwrap();
    assert_eq!(summary.expense_minor, 2_000);
}

#[tokio::test]
async fn period_summary_buckets_by_month() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, day(2026, 7, 1))
        .await
        .unwrap();

    engine
        .create_transaction(&expense(bank, day(2026, 7, 10), 1_000), today, false)
        .await
        .unwrap();
    engine
        .create_transaction(&expense(bank, day(2026, 8, 10), 2_000), today, false)
        .await
        .unwrap();
    engine
        .create_transaction(&income(bank, day(2026, 8, 11), 500), today, false)
        .await
        .unwrap();

    let summaries = engine
        .period_summary(day(2026, 7, 1), day(2026, 8, 31))
        .await
        .unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!((summaries[0].year, summaries[0].month), (2026, 7));
    assert_eq!(summaries[0].expense_minor, 1_000);
    assert_eq!((summaries[1].year, summaries[1].month), (2026, 8));
    assert_eq!(summaries[1].expense_minor, 2_000);
    assert_eq!(summaries[1].income_minor, 500);

    assert!(
        engine
            .period_summary(day(2026, 8, 31), day(2026, 7, 1))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn category_breakdown_includes_uncategorized_bucket() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let food = engine.new_category("Food").await.unwrap();

    let mut groceries = expense(bank, day(2026, 8, 5), 4_000);
    groceries.category_id = Some(food);
    engine.create_transaction(&groceries, today, false).await.unwrap();
    engine
        .create_transaction(&expense(bank, day(2026, 8, 6), 1_000), today, false)
        .await
        .unwrap();

    let breakdown = engine.category_breakdown(2026, 8).await.unwrap();
    assert_eq!(breakdown.len(), 2);

    let uncategorized = breakdown.iter().find(|b| b.category_id.is_none()).unwrap();
    assert_eq!(uncategorized.expense_minor, 1_000);

    let food_total = breakdown
        .iter()
        .find(|b| b.category_id == Some(food))
        .unwrap();
    assert_eq!(food_total.expense_minor, 4_000);
    assert_eq!(food_total.name.as_deref(), Some("Food"));
}

#[tokio::test]
async fn subcategory_breakdown_scopes_to_category() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let food = engine.new_category("Food").await.unwrap();
    let lunch = engine.new_subcategory(food, "Lunch").await.unwrap();
    let other = engine.new_category("Other").await.unwrap();

    let mut tx = expense(bank, day(2026, 8, 5), 1_200);
    tx.category_id = Some(food);
    tx.subcategory_id = Some(lunch);
    engine.create_transaction(&tx, today, false).await.unwrap();

    let mut tx = expense(bank, day(2026, 8, 6), 800);
    tx.category_id = Some(food);
    engine.create_transaction(&tx, today, false).await.unwrap();

    let mut tx = expense(bank, day(2026, 8, 7), 999);
    tx.category_id = Some(other);
    engine.create_transaction(&tx, today, false).await.unwrap();

    let breakdown = engine.subcategory_breakdown(food, 2026, 8).await.unwrap();
    assert_eq!(breakdown.len(), 2);
    let lunch_total = breakdown
        .iter()
        .find(|b| b.subcategory_id == Some(lunch))
        .unwrap();
    assert_eq!(lunch_total.expense_minor, 1_200);
    assert_eq!(lunch_total.name.as_deref(), Some("Lunch"));
    let rest = breakdown.iter().find(|b| b.subcategory_id.is_none()).unwrap();
    assert_eq!(rest.expense_minor, 800);
}

#[tokio::test]
async fn budget_status_tracks_spend_and_overspend() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let food = engine.new_category("Food").await.unwrap();
    engine.set_budget(food, 2026, 8, 5_000).await.unwrap();

    let mut tx = expense(bank, day(2026, 8, 5), 3_000);
    tx.category_id = Some(food);
    engine.create_transaction(&tx, today, false).await.unwrap();

    let statuses = engine.budget_status(2026, 8).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].budget_minor, 5_000);
    assert_eq!(statuses[0].spent_minor, 3_000);
    assert_eq!(statuses[0].remaining_minor, 2_000);

    let mut tx = expense(bank, day(2026, 8, 20), 4_000);
    tx.category_id = Some(food);
    engine.create_transaction(&tx, today, false).await.unwrap();

    let statuses = engine.budget_status(2026, 8).await.unwrap();
    assert_eq!(statuses[0].remaining_minor, -2_000);

    // Upsert replaces the amount for the same month.
    engine.set_budget(food, 2026, 8, 10_000).await.unwrap();
    let statuses = engine.budget_status(2026, 8).await.unwrap();
    assert_eq!(statuses[0].budget_minor, 10_000);
    assert_eq!(statuses[0].remaining_minor, 3_000);
}

#[tokio::test]
async fn transaction_rejects_unknown_references() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();

    let mut tx = expense(bank, today, 1_000);
    tx.category_id = Some(Uuid::new_v4());
    assert!(engine.create_transaction(&tx, today, false).await.is_err());

    let food = engine.new_category("Food").await.unwrap();
    let other = engine.new_category("Other").await.unwrap();
    let lunch = engine.new_subcategory(food, "Lunch").await.unwrap();

    let mut tx = expense(bank, today, 1_000);
    tx.category_id = Some(other);
    tx.subcategory_id = Some(lunch);
    assert!(engine.create_transaction(&tx, today, false).await.is_err());
}
