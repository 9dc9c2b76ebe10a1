//! Stock ledger endpoints over HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_integration_tests::{TestContext, error_kind};

#[tokio::test]
async fn test_ledger_requires_authentication() {
    let ctx = TestContext::spawn().await;

    for path in ["/transactions", "/transactions/1", "/products/1/transactions"] {
        let resp = ctx.client.get(ctx.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "path: {path}");
    }

    let resp = ctx
        .client
        .post(ctx.url("/transactions"))
        .bearer_auth("not-a-token")
        .json(&json!({ "product_id": 1, "quantity": 1, "transaction_type": "IN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_receive_and_ship_stock() {
    let ctx = TestContext::spawn().await;
    let (_, token) = ctx.user("clerk").await;
    let product = ctx.product(&token, "WIDGET-1", "9.99", 10).await;
    let id = product["id"].as_i64().unwrap();

    let resp = ctx
        .client
        .post(ctx.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({
            "product_id": id,
            "quantity": 5,
            "transaction_type": "IN",
            "notes": "  restock from supplier  ",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let receipt: Value = resp.json().await.unwrap();
    assert_eq!(receipt["transaction_type"], "IN");
    assert_eq!(receipt["quantity"], 5);
    assert_eq!(receipt["notes"], "restock from supplier");
    assert_eq!(receipt["product_id"], id);
    assert_eq!(receipt["product"]["quantity"], 15);

    let resp = ctx.adjust(&token, id, "OUT", 12).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let shipment: Value = resp.json().await.unwrap();
    assert_eq!(shipment["product"]["quantity"], 3);

    let (_, product) = ctx.get_json(&token, &format!("/products/{id}")).await;
    assert_eq!(product["quantity"], 3);
}

#[tokio::test]
async fn test_overdraw_is_rejected_without_side_effects() {
    let ctx = TestContext::spawn().await;
    let (_, token) = ctx.user("clerk").await;
    let product = ctx.product(&token, "WIDGET-1", "9.99", 3).await;
    let id = product["id"].as_i64().unwrap();

    let resp = ctx.adjust(&token, id, "OUT", 4).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_kind(&body), "insufficient_stock");

    let (_, product) = ctx.get_json(&token, &format!("/products/{id}")).await;
    assert_eq!(product["quantity"], 3);
    assert_eq!(ctx.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_adjustment_validation() {
    let ctx = TestContext::spawn().await;
    let (_, token) = ctx.user("clerk").await;
    let product = ctx.product(&token, "WIDGET-1", "9.99", 3).await;
    let id = product["id"].as_i64().unwrap();

    let resp = ctx.adjust(&token, id, "IN", 0).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_kind(&body), "invalid_argument");

    let resp = ctx.adjust(&token, id, "OUT", -2).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx.adjust(&token, id, "SIDEWAYS", 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_kind(&body), "invalid_argument");

    let resp = ctx
        .client
        .post(ctx.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({
            "product_id": id,
            "quantity": 1,
            "transaction_type": "IN",
            "notes": "x".repeat(1001),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx.adjust(&token, 4242, "IN", 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(ctx.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_history_is_newest_first_and_paginated() {
    let ctx = TestContext::spawn().await;
    let (_, token) = ctx.user("clerk").await;
    let product = ctx.product(&token, "WIDGET-1", "9.99", 0).await;
    let id = product["id"].as_i64().unwrap();

    for quantity in 1..=4 {
        let resp = ctx.adjust(&token, id, "IN", quantity).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let (status, body) = ctx
        .get_json(&token, &format!("/products/{id}/transactions?limit=3"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let quantities: Vec<i64> = body["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, [4, 3, 2]);

    let (_, body) = ctx
        .get_json(&token, &format!("/products/{id}/transactions?limit=3&offset=3"))
        .await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);

    let (_, body) = ctx.get_json(&token, "/transactions").await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 4);
    assert_eq!(body["transactions"][0]["product"]["quantity"], 10);

    let first_id = body["transactions"][3]["id"].as_i64().unwrap();
    let (status, detail) = ctx
        .get_json(&token, &format!("/transactions/{first_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["quantity"], 1);

    let (status, body) = ctx.get_json(&token, "/transactions/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Transaction not found");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shipments_never_oversell() {
    let ctx = Arc::new(TestContext::spawn().await);
    let (_, token) = ctx.user("clerk").await;
    let product = ctx.product(&token, "HOT-1", "5.00", 10).await;
    let id = product["id"].as_i64().unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ctx = Arc::clone(&ctx);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            ctx.adjust(&token, id, "OUT", 1).await.status()
        }));
    }

    let mut shipped = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => shipped += 1,
            StatusCode::BAD_REQUEST => rejected += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(shipped, 10);
    assert_eq!(rejected, 10);

    let (_, product) = ctx.get_json(&token, &format!("/products/{id}")).await;
    assert_eq!(product["quantity"], 0);

    let (_, history) = ctx
        .get_json(&token, &format!("/products/{id}/transactions?limit=100"))
        .await;
    assert_eq!(history["transactions"].as_array().unwrap().len(), 10);
}
