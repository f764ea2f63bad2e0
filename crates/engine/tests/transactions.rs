use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Engine, EngineError, MoneyCents, NewCategoryCmd, NewTransactionCmd, NewUserCmd, Recurrence,
    RecurrenceType, Transaction, TransactionFilter, TransactionKind, TransactionStore,
    TransactionUpdateCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn new_user(engine: &Engine, email: &str) -> Uuid {
    engine
        .register(NewUserCmd {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap()
        .id
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn euros(value: &str) -> MoneyCents {
    value.parse().unwrap()
}

#[tokio::test]
async fn monthly_series_is_clamped_to_month_end() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    let cmd = NewTransactionCmd::new(user_id, TransactionKind::Expense, euros("100.00"), date(2024, 1, 31))
        .description("rent")
        .recurrence(Recurrence::new(RecurrenceType::Monthly, 3).unwrap());
    let created = engine.create_transaction(cmd).await.unwrap();

    let generated_dates: Vec<_> = created.generated.iter().map(|t| t.date).collect();
    assert_eq!(generated_dates, vec![date(2024, 2, 29), date(2024, 3, 31)]);

    let stored = engine
        .list_transactions(user_id, TransactionKind::Expense, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].date, date(2024, 3, 31));
    assert_eq!(stored[2].id, created.transaction.id);
    for tx in &stored {
        assert_eq!(tx.amount, euros("100.00"));
        assert_eq!(tx.description, "rent");
        let recurrence = tx.recurrence.unwrap();
        assert_eq!(recurrence.recurrence_type, RecurrenceType::Monthly);
        assert_eq!(recurrence.count(), 3);
    }
}

#[tokio::test]
async fn weekly_series_steps_seven_days() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    let cmd = NewTransactionCmd::new(user_id, TransactionKind::Income, euros("50"), date(2024, 1, 1))
        .recurrence(Recurrence::new(RecurrenceType::Weekly, 4).unwrap());
    let created = engine.create_transaction(cmd).await.unwrap();

    let dates: Vec<_> = created.generated.iter().map(|t| t.date).collect();
    assert_eq!(
        dates,
        vec![date(2024, 1, 8), date(2024, 1, 15), date(2024, 1, 22)]
    );
}

#[tokio::test]
async fn one_off_record_generates_nothing() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    let created = engine
        .create_transaction(NewTransactionCmd::new(
            user_id,
            TransactionKind::Expense,
            euros("12.50"),
            date(2024, 5, 1),
        ))
        .await
        .unwrap();
    assert!(created.generated.is_empty());
    assert!(!created.transaction.is_recurring());
}

#[tokio::test]
async fn non_positive_amount_is_rejected_before_storage() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    let err = engine
        .create_transaction(NewTransactionCmd::new(
            user_id,
            TransactionKind::Expense,
            MoneyCents::ZERO,
            date(2024, 5, 1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let stored = engine
        .list_transactions(user_id, TransactionKind::Expense, &TransactionFilter::default())
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn failed_batch_stores_nothing() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    let existing = engine
        .create_transaction(NewTransactionCmd::new(
            user_id,
            TransactionKind::Expense,
            euros("10"),
            date(2024, 1, 1),
        ))
        .await
        .unwrap()
        .transaction;

    let fresh = Transaction::new(
        user_id,
        TransactionKind::Expense,
        None,
        euros("20"),
        String::new(),
        date(2024, 1, 8),
        None,
    )
    .unwrap();
    // The second record collides with the primary key of `existing`.
    let err = engine.save_batch(&[fresh.clone(), existing.clone()]).await;
    assert!(matches!(err, Err(EngineError::Database(_))));

    let stored = engine
        .list_transactions(user_id, TransactionKind::Expense, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, existing.id);
}

#[tokio::test]
async fn category_of_another_user_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let alice = new_user(&engine, "alice@example.com").await;
    let bob = new_user(&engine, "bob@example.com").await;

    let bobs = engine
        .create_category(
            bob,
            NewCategoryCmd {
                name: "Food".to_string(),
                kind: TransactionKind::Expense,
                description: None,
            },
        )
        .await
        .unwrap();

    let err = engine
        .create_transaction(
            NewTransactionCmd::new(alice, TransactionKind::Expense, euros("5"), date(2024, 1, 1))
                .category_id(bobs.id),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("category not exists".to_string())
    );
}

#[tokio::test]
async fn records_of_another_user_are_invisible() {
    let (engine, _db) = engine_with_db().await;
    let alice = new_user(&engine, "alice@example.com").await;
    let bob = new_user(&engine, "bob@example.com").await;

    let tx = engine
        .create_transaction(NewTransactionCmd::new(
            alice,
            TransactionKind::Income,
            euros("1000"),
            date(2024, 1, 1),
        ))
        .await
        .unwrap()
        .transaction;

    assert!(matches!(
        engine.transaction(bob, TransactionKind::Income, tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_transaction(bob, TransactionKind::Income, tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    // Same id under the other kind is not found either.
    assert!(matches!(
        engine.transaction(alice, TransactionKind::Expense, tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(engine
        .list_transactions(bob, TransactionKind::Income, &TransactionFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn filters_by_month_and_year() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    for on in [date(2023, 3, 10), date(2024, 3, 5), date(2024, 4, 1)] {
        engine
            .create_transaction(NewTransactionCmd::new(
                user_id,
                TransactionKind::Expense,
                euros("1"),
                on,
            ))
            .await
            .unwrap();
    }

    let list = |filter: TransactionFilter| {
        let engine = &engine;
        async move {
            engine
                .list_transactions(user_id, TransactionKind::Expense, &filter)
                .await
                .unwrap()
                .into_iter()
                .map(|t| t.date)
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(
        list(TransactionFilter {
            month: Some(3),
            ..Default::default()
        })
        .await,
        vec![date(2024, 3, 5), date(2023, 3, 10)]
    );
    assert_eq!(
        list(TransactionFilter {
            month: Some(3),
            year: Some(2024),
            ..Default::default()
        })
        .await,
        vec![date(2024, 3, 5)]
    );
    assert_eq!(
        list(TransactionFilter {
            year: Some(2024),
            ..Default::default()
        })
        .await,
        vec![date(2024, 4, 1), date(2024, 3, 5)]
    );
    assert_eq!(
        list(TransactionFilter {
            date: Some(date(2024, 4, 1)),
            ..Default::default()
        })
        .await,
        vec![date(2024, 4, 1)]
    );

    let err = engine
        .list_transactions(
            user_id,
            TransactionKind::Expense,
            &TransactionFilter {
                month: Some(13),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));
}

#[tokio::test]
async fn update_touches_only_one_record_of_a_series() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;

    let created = engine
        .create_transaction(
            NewTransactionCmd::new(user_id, TransactionKind::Expense, euros("30"), date(2024, 1, 1))
                .recurrence(Recurrence::new(RecurrenceType::Weekly, 2).unwrap()),
        )
        .await
        .unwrap();

    let updated = engine
        .update_transaction(
            user_id,
            TransactionKind::Expense,
            created.transaction.id,
            TransactionUpdateCmd {
                amount: Some(euros("35.5")),
                description: Some(" gym ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, euros("35.50"));
    assert_eq!(updated.description, "gym");
    assert!(updated.is_recurring());

    let sibling = engine
        .transaction(user_id, TransactionKind::Expense, created.generated[0].id)
        .await
        .unwrap();
    assert_eq!(sibling.amount, euros("30"));

    let err = engine
        .update_transaction(
            user_id,
            TransactionKind::Expense,
            created.transaction.id,
            TransactionUpdateCmd {
                amount: Some(MoneyCents::new(-1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn balance_sums_income_and_expense() {
    let (engine, _db) = engine_with_db().await;
    let user_id = new_user(&engine, "alice@example.com").await;
    let other = new_user(&engine, "bob@example.com").await;

    let empty = engine.balance(user_id).await.unwrap();
    assert_eq!(empty.balance, MoneyCents::ZERO);

    for (owner, kind, amount) in [
        (user_id, TransactionKind::Income, "1000.00"),
        (user_id, TransactionKind::Expense, "250.25"),
        (user_id, TransactionKind::Expense, "800"),
        (other, TransactionKind::Income, "99"),
    ] {
        engine
            .create_transaction(NewTransactionCmd::new(owner, kind, euros(amount), date(2024, 2, 1)))
            .await
            .unwrap();
    }

    let balance = engine.balance(user_id).await.unwrap();
    assert_eq!(balance.total_income, euros("1000"));
    assert_eq!(balance.total_expense, euros("1050.25"));
    assert_eq!(balance.balance, euros("-50.25"));
    assert_eq!(balance.balance.to_string(), "-50.25");
}
