use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{AuthConfig, ServerState, router};

async fn app() -> Router {
    app_with_db().await.0
}

async fn app_with_db() -> (Router, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    let app = router(ServerState {
        engine: Arc::new(engine),
        auth: Arc::new(AuthConfig::new(
            "test-secret",
            Duration::minutes(15),
            Duration::days(1),
        )),
    });
    (app, db)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register `email` and return its (access, refresh) tokens.
async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"email": email, "full_name": "Test", "password": "correct horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["tokens"]["access"].as_str().unwrap().to_string(),
        body["tokens"]["refresh"].as_str().unwrap().to_string(),
    )
}

async fn new_category(app: &Router, token: &str, name: &str, kind: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/categories",
        Some(token),
        Some(json!({"name": name, "kind": kind})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn protected_routes_require_a_valid_access_token() {
    let app = app().await;
    let (access, refresh) = register(&app, "alice@example.com").await;

    let (status, _) = send(&app, Method::GET, "/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (unsigned, signature) = access.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('a') { 'b' } else { 'a' };
    let tampered = format!("{unsigned}.{flipped}{}", &signature[1..]);
    let (status, _) = send(&app, Method::GET, "/profile", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/profile", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["currency"], "USD");
}

#[tokio::test]
async fn login_refresh_and_logout() {
    let app = app().await;
    register(&app, "alice@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "wrong horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "correct horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["tokens"]["access"].as_str().unwrap().to_string();
    let refresh = body["tokens"]["refresh"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({"refresh": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/logout",
        Some(&access),
        Some(json!({"refresh": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::RESET_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({"refresh": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app().await;
    register(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"email": "alice@example.com", "password": "correct horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn recurring_income_creates_the_whole_series() {
    let app = app().await;
    let (token, _) = register(&app, "alice@example.com").await;
    let salary = new_category(&app, &token, "Salary", "income").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions/income",
        Some(&token),
        Some(json!({
            "amount": "100.00",
            "date": "2024-01-31",
            "category": salary,
            "description": "pay",
            "is_recurring": true,
            "recurrence_type": "monthly",
            "recurrence_count": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["transaction"]["date"], "2024-01-31");
    assert_eq!(body["transaction"]["amount"], "100.00");
    let generated = body["generated"].as_array().unwrap();
    assert_eq!(generated.len(), 2);
    assert_eq!(generated[0]["date"], "2024-02-29");
    assert_eq!(generated[1]["date"], "2024-03-31");
    assert_eq!(generated[1]["recurrence_count"], 3);
    assert_eq!(generated[1]["category"], salary.as_str());

    let (status, body) = send(&app, Method::GET, "/transactions/income?month=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::GET, "/transactions/income", Some(&token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
    let (_, body) = send(&app, Method::GET, "/transactions/expense", Some(&token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_recurrence_is_unprocessable() {
    let app = app().await;
    let (token, _) = register(&app, "alice@example.com").await;

    for body in [
        json!({"amount": "10", "date": "2024-01-01", "is_recurring": true, "recurrence_count": 2}),
        json!({"amount": "10", "date": "2024-01-01", "is_recurring": true, "recurrence_type": "weekly", "recurrence_count": 0}),
        json!({"amount": "10", "date": "2024-01-01", "recurrence_type": "weekly", "recurrence_count": 2}),
        json!({"amount": "0", "date": "2024-01-01"}),
        json!({"amount": "1.234", "date": "2024-01-01"}),
    ] {
        let (status, response) = send(
            &app,
            Method::POST,
            "/transactions/expense",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{response}");
    }

    let (_, body) = send(&app, Method::GET, "/transactions/expense", Some(&token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn budget_warnings_and_balance() {
    let app = app().await;
    let (token, _) = register(&app, "alice@example.com").await;
    let food = new_category(&app, &token, "Food", "expense").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/budgets",
        Some(&token),
        Some(json!({
            "category": food,
            "name": "Groceries",
            "amount": "500.00",
            "start_date": "2024-01-01",
            "end_date": "2024-01-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["exceeded"], false);
    let budget_id = body["id"].as_str().unwrap().to_string();

    for (amount, date) in [("250.00", "2024-01-05"), ("300.00", "2024-01-31"), ("999", "2024-02-01")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/transactions/expense",
            Some(&token),
            Some(json!({"amount": amount, "date": date, "category": food})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, &format!("/budgets/{budget_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_spent"], "550.00");
    assert_eq!(body["exceeded"], true);
    assert_eq!(body["exceeded_amount"], "50.00");

    let (status, body) = send(&app, Method::GET, "/budgets/warnings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "budget_id": budget_id,
            "budget_name": "Groceries",
            "budget_amount": "500.00",
            "total_expense": "550.00",
            "exceeded_by": "50.00",
            "category": "Food"
        }])
    );

    let (_, body) = send(&app, Method::GET, "/budgets?exceeded=true", Some(&token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (status, _) = send(&app, Method::GET, "/budgets?ordering=amount", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/transactions/balance", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"total_income": "0.00", "total_expense": "1549.00", "balance": "-1549.00"})
    );
}

#[tokio::test]
async fn inverted_budget_period_is_unprocessable() {
    let app = app().await;
    let (token, _) = register(&app, "alice@example.com").await;
    let food = new_category(&app, &token, "Food", "expense").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/budgets",
        Some(&token),
        Some(json!({
            "category": food,
            "amount": "10",
            "start_date": "2024-02-01",
            "end_date": "2024-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn other_users_resources_are_not_found() {
    let app = app().await;
    let (alice, _) = register(&app, "alice@example.com").await;
    let (bob, _) = register(&app, "bob@example.com").await;
    let food = new_category(&app, &alice, "Food", "expense").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/transactions/expense",
        Some(&alice),
        Some(json!({"amount": "5", "date": "2024-01-01", "category": food})),
    )
    .await;
    let tx_id = body["transaction"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::GET, &format!("/categories/{food}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/transactions/expense/{tx_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        Method::POST,
        "/transactions/expense",
        Some(&bob),
        Some(json!({"amount": "5", "date": "2024-01-01", "category": food})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/transactions/expense/{tx_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn duplicate_category_conflicts_and_delete_unlinks_records() {
    let app = app().await;
    let (token, _) = register(&app, "alice@example.com").await;
    let food = new_category(&app, &token, "Food", "expense").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/categories",
        Some(&token),
        Some(json!({"name": " Food ", "kind": "expense"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(
        &app,
        Method::POST,
        "/transactions/expense",
        Some(&token),
        Some(json!({"amount": "5", "date": "2024-01-01", "category": food})),
    )
    .await;
    let tx_id = body["transaction"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::DELETE, &format!("/categories/{food}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/transactions/expense/{tx_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], Value::Null);
}

#[tokio::test]
async fn password_reset_rejects_a_wrong_code() {
    let app = app().await;
    register(&app, "alice@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/request-reset",
        None,
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/confirm-reset",
        None,
        Some(json!({"email": "alice@example.com", "otp": "not-a-code", "new_password": "new password"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("OTP"));
}

#[tokio::test]
async fn profile_update_is_partial() {
    let app = app().await;
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/profile",
        Some(&token),
        Some(json!({"currency": "eur", "notify_on_budget_exceed": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], "EUR");
    assert_eq!(body["notify_on_budget_exceed"], false);
    assert_eq!(body["full_name"], "Test");
}

#[tokio::test]
async fn disabled_or_deleted_users_lose_access() {
    let (app, db) = app_with_db().await;
    let (access, refresh) = register(&app, "alice@example.com").await;

    db.execute_unprepared("UPDATE users SET is_active = 0")
        .await
        .unwrap();
    let (status, _) = send(&app, Method::GET, "/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({"refresh": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    db.execute_unprepared("DELETE FROM users").await.unwrap();
    let (status, _) = send(&app, Method::GET, "/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        None,
        Some(json!({"refresh": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn amounts_above_twelve_digits_are_unprocessable() {
    let app = app().await;
    let (access, _) = register(&app, "alice@example.com").await;
    let food = new_category(&app, &access, "Food", "expense").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions/expense",
        Some(&access),
        Some(json!({"amount": "90000000000000000.00", "date": "2024-01-10", "category": food})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions/expense",
        Some(&access),
        Some(json!({"amount": "9999999999.99", "date": "2024-01-10", "category": food})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["transaction"]["amount"], "9999999999.99");
}
