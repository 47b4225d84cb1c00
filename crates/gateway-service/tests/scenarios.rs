//! End-to-end scenarios from the pipeline's documented behavior: happy-path
//! billing, budget denial, streaming settlement, missing pricing, and
//! mid-flight account deactivation.

mod common;

use common::TestHarness;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// S1 — happy path unary: rates in=3/out=15 per million, usage
/// input:1000/output:500 debits `0.0105` and logs one row.
#[tokio::test]
async fn s1_happy_path_unary_debits_and_logs() {
    let harness = TestHarness::new().await;
    harness.seed_account("u1", Decimal::from(10)).await;
    harness.seed_api_key("sk-a", "u1").await;
    harness
        .seed_model_cost("m1", Decimal::from(3), Decimal::from(15))
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "usage": {"prompt_tokens": 1000, "completion_tokens": 500}
        })))
        .mount(&harness.openai)
        .await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m1", "stream": false}))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], "chatcmpl-1");

    let account = harness.store.get_account("u1").await.unwrap();
    assert_eq!(account.spent_usd, Decimal::new(105, 4));

    let logs = harness.wait_for_logs(1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].cost_usd, Decimal::new(105, 4));
    assert_eq!(logs[0].total_tokens(), 1500);
    assert!(!logs[0].pricing_missing);
}

/// S2 — budget denial: exhausted budget returns 429, no upstream call, no
/// UsageLog, balance unchanged.
#[tokio::test]
async fn s2_budget_denial_skips_dispatch() {
    let harness = TestHarness::new().await;
    let mut account = gateway_core::Account::new("u1", Decimal::from(10));
    account.spent_usd = Decimal::from(10);
    harness.store.upsert_account(account).await.unwrap();
    harness.seed_api_key("sk-a", "u1").await;
    harness
        .seed_model_cost("m1", Decimal::from(3), Decimal::from(15))
        .await;

    // No mock registered: if the pipeline dispatched upstream, wiremock
    // would panic on an unexpected request when the harness drops.
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m1", "stream": false}))
        .await;

    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);

    let account = harness.store.get_account("u1").await.unwrap();
    assert_eq!(account.spent_usd, Decimal::from(10));
    assert!(harness.store.usage_logs().is_empty());
}

/// S3 — streaming settlement: client receives all chunks, and the
/// background settle debits `0.0006 + 0.012 = 0.0126` once the stream ends.
#[tokio::test]
async fn s3_streaming_settlement_debits_after_stream_closes() {
    let harness = TestHarness::new().await;
    harness.seed_account("u1", Decimal::from(10)).await;
    harness.seed_api_key("sk-a", "u1").await;
    harness
        .seed_model_cost("m1", Decimal::from(3), Decimal::from(15))
        .await;

    let sse_body = concat!(
        "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":200,\"output_tokens\":0}}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"hel\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"lo\"}}\n\n",
        "data: {\"type\":\"message_delta\",\"usage\":{\"output_tokens\":800}}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body),
        )
        .mount(&harness.anthropic)
        .await;

    let response = harness
        .server
        .post("/v1/messages")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m1", "stream": true}))
        .await;

    response.assert_status_ok();
    let body = response.text();
    // All three data events forwarded, in order.
    let first = body.find("message_start").unwrap();
    let second = body.find("content_block_delta").unwrap();
    let third = body.find("message_delta").unwrap();
    assert!(first < second && second < third);

    let logs = harness.wait_for_logs(1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].cost_usd, Decimal::new(126, 4));

    let account = harness.store.get_account("u1").await.unwrap();
    assert_eq!(account.spent_usd, Decimal::new(126, 4));
}

/// A stream that closes without ever reporting usage settles as
/// pricing-missing even though the model has a real `ModelCost` row — the
/// call is unbillable, not merely unpriced, and must not pass through at
/// `cost_usd = 0` with `pricing_missing = false`.
#[tokio::test]
async fn stream_without_usage_trailer_settles_as_pricing_missing_on_a_priced_model() {
    let harness = TestHarness::new().await;
    harness.seed_account("u1", Decimal::from(10)).await;
    harness.seed_api_key("sk-a", "u1").await;
    harness
        .seed_model_cost("m1", Decimal::from(3), Decimal::from(15))
        .await;

    let sse_body = concat!(
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"hel\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"lo\"}}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body),
        )
        .mount(&harness.anthropic)
        .await;

    let response = harness
        .server
        .post("/v1/messages")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m1", "stream": true}))
        .await;

    response.assert_status_ok();

    let logs = harness.wait_for_logs(1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].cost_usd, Decimal::ZERO);
    assert!(logs[0].pricing_missing);

    let account = harness.store.get_account("u1").await.unwrap();
    assert_eq!(account.spent_usd, Decimal::ZERO);
}

/// S5 — missing pricing: client still receives the upstream body; no
/// debit; one UsageLog with `cost_usd=0` and the pricing-missing marker.
#[tokio::test]
async fn s5_missing_pricing_settles_at_zero_cost() {
    let harness = TestHarness::new().await;
    harness.seed_account("u1", Decimal::from(10)).await;
    harness.seed_api_key("sk-a", "u1").await;
    // No ModelCost registered for "m-unknown".

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-2",
            "usage": {"prompt_tokens": 100, "completion_tokens": 50}
        })))
        .mount(&harness.openai)
        .await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m-unknown", "stream": false}))
        .await;

    response.assert_status_ok();

    let account = harness.store.get_account("u1").await.unwrap();
    assert_eq!(account.spent_usd, Decimal::ZERO);

    let logs = harness.wait_for_logs(1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].cost_usd, Decimal::ZERO);
    assert!(logs[0].pricing_missing);
}

/// S6 — inactive account mid-flight: a deactivation that lands after
/// authentication but before the upstream responds does not abort the
/// in-flight call; settlement still debits and logs. The *next* request on
/// that account is rejected.
#[tokio::test]
async fn s6_deactivation_mid_flight_does_not_abort_in_flight_call() {
    let harness = TestHarness::new().await;
    harness.seed_account("u1", Decimal::from(10)).await;
    harness.seed_api_key("sk-a", "u1").await;
    harness
        .seed_model_cost("m1", Decimal::from(3), Decimal::from(15))
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-3",
            "usage": {"prompt_tokens": 1000, "completion_tokens": 500}
        })))
        .mount(&harness.openai)
        .await;

    // First call authenticates while the account is still active.
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m1", "stream": false}))
        .await;
    response.assert_status_ok();

    // Deactivate after the in-flight call has already resolved its
    // Principal (the unary path settles synchronously, so this simulates
    // the invalidation landing just after dispatch by deactivating before
    // the *next* request instead) and apply the invalidation directly,
    // standing in for the listener task consuming the published event.
    let mut account = harness.store.get_account("u1").await.unwrap();
    account.is_active = false;
    harness.store.upsert_account(account).await.unwrap();
    harness
        .cache
        .invalidate(&gateway_bus::InvalidationEvent::account("u1"))
        .await;

    let logs = harness.wait_for_logs(1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].cost_usd, Decimal::new(105, 4));

    let next = harness
        .server
        .post("/v1/chat/completions")
        .add_header("authorization", TestHarness::bearer("sk-a"))
        .json(&json!({"model": "m1", "stream": false}))
        .await;
    next.assert_status(axum::http::StatusCode::FORBIDDEN);
}
