use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use court_pricing::cache::CatalogCache;
use court_pricing::pricing::{BaseRates, QuoteSettings};
use court_pricing::{app, AppState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let settings = QuoteSettings::default().with_base_rates(BaseRates::new(dec!(2000)).with_sport("Padel", dec!(2000)));
    app(AppState::new(CatalogCache::default(), settings))
}

async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Money is serialised as a decimal string; compare by value.
fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, parse_body(response).await)
}

fn candidate(date: &str, start: &str) -> Value {
    json!({
        "courtId": 5,
        "sport": "Padel",
        "date": date,
        "startTime": start,
        "duration": "1h"
    })
}

fn club_catalog() -> Value {
    json!({
        "rules": [
            {
                "id": "global-week",
                "scope": { "type": "global" },
                "days": ["monday", "tuesday", "wednesday", "thursday", "friday"],
                "durations": ["1h", "1.5h"],
                "timeBlocks": [
                    { "id": "day", "start": "08:00", "end": "18:00", "priceType": "normal", "price": 1800 },
                    { "id": "night", "start": "18:00", "end": "23:00", "priceType": "night", "price": "2400" }
                ]
            },
            {
                "id": "legacy-weekend",
                "dias": ["Sábado", "Domingo"],
                "desde": "09:00",
                "hasta": "21:00",
                "precio": 2600,
                "tipo": "fin_semana"
            }
        ],
        "specialDates": [
            {
                "id": "navidad",
                "date": "2025-12-25",
                "name": "Navidad",
                "strategy": "multiplier",
                "value": 2,
                "startTime": "08:00",
                "endTime": "23:00",
                "courtIds": [],
                "priority": "high"
            }
        ],
        "paymentMethods": [
            { "id": "credit_card", "name": "Tarjeta de Crédito", "enabled": true, "adjustment": 10 },
            { "id": "transfer", "name": "Transferencia", "enabled": false, "adjustment": -5 }
        ]
    })
}

// ==================== health ====================

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["catalogs"], 0);
}

// ==================== inline quotes ====================

#[tokio::test]
async fn test_inline_quote_empty_catalog() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/quote",
        Some(json!({ "catalog": {}, "candidate": candidate("2025-06-10", "10:00") })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["finalPrice"]), dec!(2000));
    assert_eq!(body["matchedSource"]["type"], "noMatch");
}

#[tokio::test]
async fn test_inline_quote_weekend_night_surcharges() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/quote",
        Some(json!({ "candidate": candidate("2025-06-14", "19:00") })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["finalPrice"]), dec!(3100));
    let kinds: Vec<&str> = body["adjustments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["night_surcharge", "weekend_surcharge"]);
}

#[tokio::test]
async fn test_inline_quote_with_payment_method() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/quote",
        Some(json!({
            "catalog": club_catalog(),
            "candidate": candidate("2025-06-10", "19:00"),
            "paymentMethodId": "credit_card"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedSource"]["type"], "pricingRule");
    assert_eq!(body["matchedSource"]["block"]["id"], "night");
    assert_eq!(money(&body["finalPrice"]), dec!(2640));
}

#[tokio::test]
async fn test_invalid_candidate_is_422() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/quote",
        Some(json!({ "candidate": { "courtId": 1, "sport": "Padel", "date": "2025-06-10", "duration": "1h" } })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("startTime"));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/pricing/quote")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert!(body["error"].is_string());
}

// ==================== institution catalogs ====================

#[tokio::test]
async fn test_catalog_lifecycle() {
    let app = test_app();

    let (status, body) = send(&app, "PUT", "/api/pricing/catalogs/club-1", Some(club_catalog())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rules"], 2);
    assert_eq!(body["legacyRules"], 1);
    assert_eq!(body["specialDates"], 1);

    let (status, body) = send(&app, "GET", "/api/pricing/catalogs/club-1", None).await;
    assert_eq!(status, StatusCode::OK);
    let legacy = &body["rules"][1];
    assert_eq!(legacy["id"], "legacy-weekend");
    assert_eq!(legacy["days"], json!(["saturday", "sunday"]));
    assert_eq!(legacy["timeBlocks"][0]["priceType"], "weekend");
    assert!(legacy["timeBlocks"][0]["id"].as_str().unwrap().starts_with("block-"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/catalogs/club-1/quote",
        Some(json!({ "candidate": candidate("2025-06-14", "10:00") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["finalPrice"]), dec!(2600));

    let (status, body) = send(&app, "DELETE", "/api/pricing/catalogs/club-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evicted"], true);

    let (status, _) = send(&app, "GET", "/api/pricing/catalogs/club-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_special_date_wins_over_rule() {
    let app = test_app();
    send(&app, "PUT", "/api/pricing/catalogs/club-1", Some(club_catalog())).await;

    // 2025-12-25 is a Thursday, covered by global-week at 1800.
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/catalogs/club-1/quote",
        Some(json!({ "candidate": candidate("2025-12-25", "10:00") })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedSource"]["type"], "specialDate");
    assert_eq!(money(&body["finalPrice"]), dec!(4000));
}

#[tokio::test]
async fn test_institution_quote_errors() {
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/pricing/catalogs/unknown/quote",
        Some(json!({ "candidate": candidate("2025-06-10", "10:00") })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "PUT", "/api/pricing/catalogs/club-1", Some(club_catalog())).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/catalogs/club-1/quote",
        Some(json!({ "candidate": candidate("2025-06-10", "10:00"), "paymentMethodId": "transfer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("disabled"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/pricing/catalogs/club-1/quote",
        Some(json!({ "candidate": candidate("2025-06-10", "10:00"), "paymentMethodId": "bitcoin" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_audit() {
    let app = test_app();
    send(&app, "PUT", "/api/pricing/catalogs/club-1", Some(club_catalog())).await;

    let (status, body) = send(&app, "GET", "/api/pricing/catalogs/club-1/audit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"], 0);
    assert_eq!(body["warnings"], 0);

    let messy = json!({
        "rules": [{
            "id": "weekdays",
            "days": ["monday", "tuesday", "wednesday", "thursday", "friday"],
            "timeBlocks": [
                { "id": "a", "start": "09:00", "end": "12:00", "price": 1800 },
                { "id": "b", "start": "11:00", "end": "13:00", "price": 1800 },
                { "id": "c", "start": "15:00", "end": "14:00", "price": 1800 }
            ]
        }]
    });
    let (_, load) = send(&app, "PUT", "/api/pricing/catalogs/club-2", Some(messy)).await;
    assert_eq!(load["issues"].as_array().unwrap().len(), 3);

    let (_, body) = send(&app, "GET", "/api/pricing/catalogs/club-2/audit", None).await;
    assert_eq!(body["errors"], 1);
    assert_eq!(body["warnings"], 2);
    let messages: Vec<&str> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["message"].as_str().unwrap())
        .collect();
    assert!(messages.iter().any(|m| m.contains("saturday, sunday")));
    assert!(messages.iter().any(|m| m.contains("09:00-12:00 and 11:00-13:00")));
    assert!(messages.iter().any(|m| m.contains("block c ignored")));
}

#[tokio::test]
async fn test_broken_rules_are_skipped_not_fatal() {
    let app = test_app();
    let catalog = json!({
        "rules": [
            {
                "id": "good",
                "days": ["tuesday"],
                "timeBlocks": [{ "id": "day", "start": "08:00", "end": "23:00", "price": 1800 }]
            },
            { "id": "vip", "days": ["tuesday"], "timeBlocks": [{ "id": "v", "start": "08:00", "end": "23:00", "priceType": "vip", "price": 900 }] },
            { "id": "blank", "days": ["tuesday"], "start": "", "end": "23:00", "price": 900 },
            { "id": "typo", "days": ["tuesday"], "timeBlocks": [{ "id": "t", "start": "8am", "end": "23:00", "price": 900 }] },
            { "id": "words", "days": ["tuesday"], "timeBlocks": [{ "id": "w", "start": "08:00", "end": "23:00", "price": "abc" }] },
            { "id": "open", "days": ["tuesday"], "timeBlocks": [{ "id": "o", "start": "08:00", "price": 900 }] },
            { "id": "odd", "days": ["someday"] }
        ]
    });

    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/quote",
        Some(json!({ "catalog": catalog.clone(), "candidate": candidate("2025-06-10", "10:00") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedSource"]["rule"]["id"], "good");
    assert_eq!(money(&body["finalPrice"]), dec!(1800));

    let (status, load) = send(&app, "PUT", "/api/pricing/catalogs/club-3", Some(catalog)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(load["rules"], 6);
    let errors = load["issues"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|i| i["severity"] == "error")
        .count();
    assert_eq!(errors, 5);

    let (_, body) = send(
        &app,
        "POST",
        "/api/pricing/catalogs/club-3/quote",
        Some(json!({ "candidate": candidate("2025-06-10", "10:00") })),
    )
    .await;
    assert_eq!(money(&body["finalPrice"]), dec!(1800));
}

#[tokio::test]
async fn test_huge_duration_is_422() {
    let app = test_app();
    let mut bad = candidate("2025-06-10", "10:00");
    bad["duration"] = json!("79228162514264337593543950335h");

    let (status, body) = send(&app, "POST", "/api/pricing/quote", Some(json!({ "candidate": bad }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("duration"));
}

// ==================== time blocks ====================

#[tokio::test]
async fn test_validate_block() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/time-blocks/validate",
        Some(json!({ "start": "08:00", "end": "12:00", "price": "1800", "priceType": "normal" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["errors"], json!([]));

    let (_, body) = send(
        &app,
        "POST",
        "/api/pricing/time-blocks/validate",
        Some(json!({ "start": "12:00", "end": "08:00", "price": -5, "priceType": "vip" })),
    )
    .await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_conflict_report() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/time-blocks/conflicts",
        Some(json!({
            "timeBlocks": [
                { "id": "c", "start": "14:00", "end": "16:00", "price": 1000 },
                { "id": "a", "start": "09:00", "end": "10:00", "price": 1000 },
                { "id": "b", "start": "09:30", "end": "10:30", "price": 1000 }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasConflicts"], true);
    assert_eq!(body["conflicts"].as_array().unwrap().len(), 1);
    assert_eq!(body["conflicts"][0]["blockIndexA"], 1);
    assert_eq!(body["conflicts"][0]["blockIndexB"], 2);

    let sorted: Vec<&str> = body["sortedBlocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(sorted, vec!["a", "b", "c"]);

    assert_eq!(body["gaps"], json!([{ "start": "10:30", "end": "14:00", "durationMinutes": 210 }]));
    assert_eq!(body["range"], json!({ "start": "09:00", "end": "16:00", "durationMinutes": 420 }));
}

#[tokio::test]
async fn test_touching_blocks_do_not_conflict() {
    let app = test_app();
    let (_, body) = send(
        &app,
        "POST",
        "/api/pricing/time-blocks/conflicts",
        Some(json!({
            "blocks": [
                { "id": "a", "start": "09:00", "end": "10:00", "price": 1000 },
                { "id": "b", "start": "10:00", "end": "11:00", "price": 1000 }
            ]
        })),
    )
    .await;

    assert_eq!(body["hasConflicts"], false);
    assert_eq!(body["gaps"], json!([]));
}

#[tokio::test]
async fn test_templates() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/pricing/time-blocks/templates", None).await;

    assert_eq!(status, StatusCode::OK);
    let templates = body["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 4);
    assert_eq!(templates[2]["name"], "night");
    assert_eq!(templates[2]["block"]["priceType"], "night");
    assert_eq!(body["emptyBlock"]["start"], "08:00");
    assert_eq!(body["emptyBlock"]["end"], "09:00");
}

// ==================== rule migration ====================

#[tokio::test]
async fn test_migrate_rules() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/pricing/rules/migrate",
        Some(json!({
            "rules": [
                { "id": "old", "days": ["lunes"], "start": "08:00", "end": "12:00", "price": 1500 },
                { "id": "bare" },
                { "id": "new", "days": ["friday"], "durations": ["1.5h"], "timeBlocks": [] }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["migratedFromLegacy"], 2);

    let rules = body["rules"].as_array().unwrap();
    assert_eq!(rules[0]["timeBlocks"].as_array().unwrap().len(), 1);
    assert_eq!(money(&rules[0]["timeBlocks"][0]["price"]), dec!(1500));
    assert_eq!(rules[0]["durations"], json!(["1h"]));
    assert_eq!(rules[0]["scope"], json!({ "type": "global" }));

    assert_eq!(rules[1]["timeBlocks"], json!([]));
    assert_eq!(rules[1]["days"], json!([]));

    assert_eq!(rules[2]["durations"], json!(["1.5h"]));
}
