use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Classification, Direction, Engine, EngineError, NewTransaction, TransactionListFilter,
    TransactionUpdate, WalletKind,
};
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

#[tokio::test]
async fn create_assigns_plain_classification_by_direction() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();

    let tx_id = engine
        .create_transaction(&expense(wallet_id, today, 3_000), today, false)
        .await
        .unwrap();
    let tx = engine.transaction(tx_id).await.unwrap();
    assert_eq!(tx.classification, Classification::Expense);
    assert_eq!(tx.amount_minor, 3_000);
    assert_eq!(tx.direction, Direction::Outflow);
}

#[tokio::test]
async fn opening_balance_moves_wallet_but_not_reports() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();

    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 10_000);
    let summary = engine.monthly_summary(2026, 8).await.unwrap();
    assert_eq!(summary.income_minor, 0);
    assert_eq!(summary.expense_minor, 0);
}

#[tokio::test]
async fn wallet_names_unique_case_insensitive() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();

    let err = engine
        .new_wallet("  cash ", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn transfer_moves_money_without_economic_effect() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();

    let (out_id, in_id) = engine
        .transfer(bank, cash, 4_000, today, "atm withdrawal", today, false)
        .await
        .unwrap();

    assert_eq!(engine.balance(bank, None, today).await.unwrap(), 6_000);
    assert_eq!(engine.balance(cash, None, today).await.unwrap(), 4_000);

    let outgoing = engine.transaction(out_id).await.unwrap();
    assert_eq!(outgoing.classification, Classification::Transfer);
    assert_eq!(outgoing.paired_transaction_id, Some(in_id));

    let summary = engine.monthly_summary(2026, 8).await.unwrap();
    assert_eq!(summary.expense_minor, 0);
    assert_eq!(summary.income_minor, 0);
}

#[tokio::test]
async fn transfer_to_same_wallet_rejected() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    assert!(
        engine
            .transfer(bank, bank, 1_000, today, "noop", today, false)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn updating_one_transfer_leg_mirrors_the_other() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let (out_id, in_id) = engine
        .transfer(bank, cash, 4_000, today, "atm", today, false)
        .await
        .unwrap();

    let update = TransactionUpdate {
        amount_minor: Some(2_500),
        ..Default::default()
    };
    engine
        .update_transaction(out_id, &update, today, false)
        .await
        .unwrap();

    assert_eq!(engine.transaction(in_id).await.unwrap().amount_minor, 2_500);
    assert_eq!(engine.balance(bank, None, today).await.unwrap(), 7_500);
    assert_eq!(engine.balance(cash, None, today).await.unwrap(), 2_500);
}

#[tokio::test]
async fn deleting_a_transfer_leg_deletes_its_pair() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let (out_id, in_id) = engine
        .transfer(bank, cash, 4_000, today, "atm", today, false)
        .await
        .unwrap();

    engine.delete_transaction(in_id, today, false).await.unwrap();

    assert!(matches!(
        engine.transaction(out_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert_eq!(engine.balance(bank, None, today).await.unwrap(), 10_000);
    assert_eq!(engine.balance(cash, None, today).await.unwrap(), 0);
}

#[tokio::test]
async fn merge_sums_amounts_and_preserves_balance() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let a = engine
        .create_transaction(&expense(wallet_id, day(2026, 8, 20), 1_000), today, false)
        .await
        .unwrap();
    let b = engine
        .create_transaction(&expense(wallet_id, day(2026, 8, 21), 2_000), today, false)
        .await
        .unwrap();

    let merged_id = engine
        .merge_transactions(&[a, b], today, "groceries", None, None, today, false)
        .await
        .unwrap();

    let merged = engine.transaction(merged_id).await.unwrap();
    assert_eq!(merged.amount_minor, 3_000);
    assert_eq!(merged.classification, Classification::Expense);
    assert!(engine.transaction(a).await.is_err());
    assert!(engine.transaction(b).await.is_err());
    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 7_000);
}

#[tokio::test]
async fn merge_rejects_mixed_wallets_and_calibrations() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();

    let a = engine
        .create_transaction(&expense(bank, today, 1_000), today, false)
        .await
        .unwrap();
    let b = engine
        .create_transaction(&expense(cash, today, 1_000), today, false)
        .await
        .unwrap();
    assert!(
        engine
            .merge_transactions(&[a, b], today, "dupe", None, None, today, false)
            .await
            .is_err()
    );

    let calibration = engine.calibrate_wallet(bank, 8_000, today).await.unwrap();
    let err = engine
        .merge_transactions(&[a, calibration], today, "dupe", None, None, today, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidClassification(_)));
}

#[tokio::test]
async fn ignore_flag_hides_from_reports_but_not_balance() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let tx_id = engine
        .create_transaction(&expense(wallet_id, today, 3_000), today, false)
        .await
        .unwrap();

    engine.set_ignored(&[tx_id], true).await.unwrap();

    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 7_000);
    let summary = engine.monthly_summary(2026, 8).await.unwrap();
    assert_eq!(summary.expense_minor, 0);

    engine.set_ignored(&[tx_id], false).await.unwrap();
    let summary = engine.monthly_summary(2026, 8).await.unwrap();
    assert_eq!(summary.expense_minor, 3_000);
}

#[tokio::test]
async fn reclassify_flips_direction_with_classification() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let tx_id = engine
        .create_transaction(&expense(wallet_id, today, 2_000), today, false)
        .await
        .unwrap();
    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), -2_000);

    engine
        .reclassify_transaction(tx_id, Classification::Income, today, false)
        .await
        .unwrap();

    let tx = engine.transaction(tx_id).await.unwrap();
    assert_eq!(tx.direction, Direction::Inflow);
    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 2_000);

    let err = engine
        .reclassify_transaction(tx_id, Classification::Lend, today, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidClassification(_)));
}

#[tokio::test]
async fn list_filters_by_wallet_and_orders_newest_first() {
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
        .create_transaction(&expense(bank, day(2026, 8, 10), 100), today, false)
        .await
        .unwrap();
    engine
        .create_transaction(&expense(bank, day(2026, 8, 20), 200), today, false)
        .await
        .unwrap();
    engine
        .create_transaction(&expense(cash, day(2026, 8, 15), 300), today, false)
        .await
        .unwrap();

    let filter = TransactionListFilter {
        wallet_id: Some(bank),
        ..Default::default()
    };
    let txs = engine.list_transactions(&filter, None).await.unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].amount_minor, 200);
    assert_eq!(txs[1].amount_minor, 100);

    let filter = TransactionListFilter {
        from: Some(day(2026, 8, 14)),
        to: Some(day(2026, 8, 16)),
        ..Default::default()
    };
    let txs = engine.list_transactions(&filter, None).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].amount_minor, 300);
}

#[tokio::test]
async fn bulk_delete_is_atomic_and_handles_pairs() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let (out_id, in_id) = engine
        .transfer(bank, cash, 4_000, today, "atm", today, false)
        .await
        .unwrap();
    let tx_id = engine
        .create_transaction(&expense(bank, today, 500), today, false)
        .await
        .unwrap();

    // Both transfer legs in the same batch must not double-delete.
    engine
        .delete_transactions(&[out_id, in_id, tx_id], today, false)
        .await
        .unwrap();

    assert_eq!(engine.balance(bank, None, today).await.unwrap(), 10_000);
    assert_eq!(engine.balance(cash, None, today).await.unwrap(), 0);

    let missing = Uuid::new_v4();
    let err = engine
        .delete_transactions(&[missing], today, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn calibration_fully_explained_stays_at_zero_ignored() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();

    // The wallet actually holds 9,500: a 500 expense was never recorded.
    let calibration_id = engine.calibrate_wallet(wallet_id, 9_500, today).await.unwrap();
    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 9_500);

    let late = engine
        .create_transaction(&expense(wallet_id, today, 500), today, false)
        .await
        .unwrap();
    let resolved = engine
        .resolve_calibration(calibration_id, late)
        .await
        .unwrap();

    assert_eq!(resolved.amount_minor, 0);
    assert!(resolved.is_ignored);
    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 9_500);
}

#[tokio::test]
async fn calibration_overshoot_flips_direction() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let calibration_id = engine.calibrate_wallet(wallet_id, 9_500, today).await.unwrap();

    let late = engine
        .create_transaction(&expense(wallet_id, today, 800), today, false)
        .await
        .unwrap();
    let resolved = engine
        .resolve_calibration(calibration_id, late)
        .await
        .unwrap();

    assert_eq!(resolved.direction, Direction::Inflow);
    assert_eq!(resolved.classification, Classification::Income);
    assert_eq!(resolved.amount_minor, 300);
    assert!(!resolved.is_ignored);
    assert_eq!(engine.balance(wallet_id, None, today).await.unwrap(), 9_500);
}

#[tokio::test]
async fn calibration_resolution_requires_same_wallet() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let bank = engine
        .new_wallet("Bank", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let cash = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let calibration_id = engine.calibrate_wallet(bank, 9_500, today).await.unwrap();
    let other = engine
        .create_transaction(&expense(cash, today, 500), today, false)
        .await
        .unwrap();

    assert!(engine.resolve_calibration(calibration_id, other).await.is_err());
}

#[tokio::test]
async fn calibration_resolution_rejects_unsuitable_rows() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    let calibration_id = engine.calibrate_wallet(wallet_id, 9_000, today).await.unwrap();

    // Another calibration is not a real transaction.
    let expense_id = engine
        .create_transaction(&expense(wallet_id, today, 400), today, false)
        .await
        .unwrap();
    let other_calibration = engine.calibrate_wallet(wallet_id, 8_500, today).await.unwrap();
    let err = engine
        .resolve_calibration(calibration_id, other_calibration)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Neither is a row already carrying settlement semantics.
    engine.mark_as_loan(expense_id, "Bob", None).await.unwrap();
    let err = engine
        .resolve_calibration(calibration_id, expense_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidClassification(_)));
}

#[tokio::test]
async fn calibrate_rejects_balanced_wallet() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 10_000, today)
        .await
        .unwrap();
    assert!(engine.calibrate_wallet(wallet_id, 10_000, today).await.is_err());
}

#[tokio::test]
async fn amount_edit_rejected_while_entry_involved() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let tx_id = engine
        .create_transaction(&expense(wallet_id, today, 3_000), today, false)
        .await
        .unwrap();
    engine
        .mark_as_loan(tx_id, "Bob", None)
        .await
        .unwrap();

    let update = TransactionUpdate {
        amount_minor: Some(2_000),
        ..Default::default()
    };
    let err = engine
        .update_transaction(tx_id, &update, today, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidLink(_)));

    // Description edits stay allowed.
    let update = TransactionUpdate {
        description: Some("lunch for two".to_string()),
        ..Default::default()
    };
    engine
        .update_transaction(tx_id, &update, today, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_can_clear_nullable_fields() {
    let (engine, _db) = engine_with_db().await;
    let today = day(2026, 8, 30);
    let wallet_id = engine
        .new_wallet("Cash", WalletKind::Normal, 0, 0, today)
        .await
        .unwrap();
    let category_id = engine.new_category("Food").await.unwrap();
    let tx_id = engine
        .create_transaction(
            &NewTransaction {
                category_id: Some(category_id),
                ..expense(wallet_id, today, 1_000)
            },
            today,
            false,
        )
        .await
        .unwrap();
    assert_eq!(
        engine.transaction(tx_id).await.unwrap().category_id,
        Some(category_id)
    );

    // Outer None leaves the field alone.
    let update = TransactionUpdate {
        description: Some("lunch".to_string()),
        ..Default::default()
    };
    engine
        .update_transaction(tx_id, &update, today, false)
        .await
        .unwrap();
    assert_eq!(
        engine.transaction(tx_id).await.unwrap().category_id,
        Some(category_id)
    );

    // Some(None) clears it.
    let update = TransactionUpdate {
        category_id: Some(None),
        ..Default::default()
    };
    engine
        .update_transaction(tx_id, &update, today, false)
        .await
        .unwrap();
    assert_eq!(engine.transaction(tx_id).await.unwrap().category_id, None);
}
