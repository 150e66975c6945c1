//! Integration tests for the mimic server.
//!
//! Each test starts a server in-process on an ephemeral port and drives it
//! over HTTP, through both the admin API and mocked traffic.

use mimic_server::config::ListenConfig;
use mimic_server::expectation::{Backup, Expectation, ExpectationLoader, StaticResponse};
use mimic_server::predicate::MatchCondition;
use mimic_server::response::ResponseStrategyLocator;
use mimic_server::tls::create_tls_acceptor;
use mimic_server::{Dispatcher, MockServer, MockState, ServerHandle};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Start a mimic server seeded with `backup`
async fn start_mimic(backup: Backup) -> (ServerHandle, String) {
    let state = Arc::new(MockState::with_backup(&backup));
    let locator = Arc::new(ResponseStrategyLocator::new().expect("Failed to build locator"));
    let dispatcher = Dispatcher::new(state, locator);
    let listen = ListenConfig::new("127.0.0.1".parse().unwrap(), 0);
    let server = MockServer::bind(&listen, dispatcher, backup, None)
        .await
        .expect("Failed to bind mimic");
    let base = format!("http://{}", server.local_addr());
    (server.spawn(), base)
}

fn client() -> Client {
    Client::builder().timeout(TEST_TIMEOUT).build().unwrap()
}

/// Register an expectation via the admin API, returning its id
async fn add_expectation(client: &Client, base: &str, expectation: Value) -> String {
    let response = client
        .post(format!("{base}/__mimic/expectations"))
        .json(&expectation)
        .send()
        .await
        .expect("Failed to add expectation");

    assert_eq!(
        response.status(),
        StatusCode::CREATED,
        "Failed to add expectation: {}",
        response.text().await.unwrap_or_default()
    );
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_str().expect("Missing id in response").to_string()
}

async fn list_expectations(client: &Client, base: &str) -> Vec<Value> {
    client
        .get(format!("{base}/__mimic/expectations"))
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap()
}

async fn get_text(client: &Client, url: String) -> (StatusCode, String) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

fn on_url(url: &str, priority: i32, body: &str) -> Value {
    json!({
        "priority": priority,
        "request": {"method": "GET", "url": {"isEqualTo": url}},
        "response": {"statusCode": 200, "body": body}
    })
}

#[tokio::test]
async fn test_highest_priority_wins() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    add_expectation(&client, &base, on_url("/x", 1, "A")).await;
    add_expectation(&client, &base, on_url("/x", 5, "B")).await;
    add_expectation(&client, &base, on_url("/x", 5, "C")).await;

    let (status, body) = get_text(&client, format!("{base}/x")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "B");

    server.stop().await;
}

#[tokio::test]
async fn test_unmatched_request_is_404_and_recorded() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    let (status, body) = get_text(&client, format!("{base}/nothing/here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Not Found");

    let count: Value = client
        .post(format!("{base}/__mimic/executions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({"count": 1}));

    server.stop().await;
}

#[tokio::test]
async fn test_history_keeps_arrival_order_and_skips_admin_calls() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    client.get(format!("{base}/first")).send().await.unwrap();
    client
        .post(format!("{base}/second"))
        .header("Content-Type", "application/json")
        .body(r#"{"n": 2}"#)
        .send()
        .await
        .unwrap();
    client.get(format!("{base}/third?x=1")).send().await.unwrap();
    list_expectations(&client, &base).await;

    let recorded: Vec<Value> = client
        .put(format!("{base}/__mimic/executions"))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let paths: Vec<&str> = recorded
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/first", "/second", "/third"]);
    assert_eq!(recorded[1]["body"], r#"{"n": 2}"#);
    assert_eq!(recorded[1]["headers"]["content-type"], "application/json");
    assert_eq!(recorded[2]["query"], "x=1");

    let posts: Vec<Value> = client
        .put(format!("{base}/__mimic/executions"))
        .json(&json!({"request": {"method": "post"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_reset_restores_backup() {
    let seeded = Expectation::builder()
        .url(MatchCondition::is_equal_to("/seeded"))
        .response(StaticResponse::new(200).with_body("seeded"))
        .build()
        .unwrap();
    let backup = Backup::from_expectations(vec![seeded]);
    let seeded_id = backup.ids()[0].to_string();
    let (server, base) = start_mimic(backup).await;
    let client = client();

    add_expectation(&client, &base, on_url("/extra", 0, "extra")).await;
    client
        .put(format!("{base}/__mimic/scenarios"))
        .json(&json!({"scenarioName": "s", "scenarioState": "X"}))
        .send()
        .await
        .unwrap();
    client.get(format!("{base}/extra")).send().await.unwrap();
    assert_eq!(list_expectations(&client, &base).await.len(), 2);

    let response = client
        .post(format!("{base}/__mimic/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = list_expectations(&client, &base).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], seeded_id.as_str());

    let scenarios: Value = client
        .get(format!("{base}/__mimic/scenarios"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scenarios, json!({}));

    let count: Value = client
        .post(format!("{base}/__mimic/executions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({"count": 0}));

    let (status, body) = get_text(&client, format!("{base}/seeded")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "seeded");

    server.stop().await;
}

#[tokio::test]
async fn test_scenario_states_gate_and_advance() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    add_expectation(
        &client,
        &base,
        json!({
            "scenarioName": "checkout",
            "scenarioStateIs": "Start",
            "newScenarioState": "Paid",
            "request": {"url": {"isEqualTo": "/pay"}},
            "response": {"body": "paying"}
        }),
    )
    .await;
    add_expectation(
        &client,
        &base,
        json!({
            "scenarioName": "checkout",
            "scenarioStateIs": "Paid",
            "request": {"url": {"isEqualTo": "/pay"}},
            "response": {"statusCode": 409, "body": "already paid"}
        }),
    )
    .await;

    assert_eq!(
        get_text(&client, format!("{base}/pay")).await,
        (StatusCode::OK, "paying".to_string())
    );
    assert_eq!(
        get_text(&client, format!("{base}/pay")).await,
        (StatusCode::CONFLICT, "already paid".to_string())
    );

    let scenarios: Value = client
        .get(format!("{base}/__mimic/scenarios"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scenarios, json!({"checkout": "Paid"}));

    // Forcing the state back re-enables the first expectation.
    client
        .put(format!("{base}/__mimic/scenarios"))
        .json(&json!({"scenarioName": "checkout", "scenarioState": "Start"}))
        .send()
        .await
        .unwrap();
    assert_eq!(
        get_text(&client, format!("{base}/pay")).await,
        (StatusCode::OK, "paying".to_string())
    );

    server.stop().await;
}

#[tokio::test]
async fn test_list_is_idempotent_and_ordered() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    let first = add_expectation(&client, &base, on_url("/a", 0, "a")).await;
    let second = add_expectation(&client, &base, on_url("/b", 0, "b")).await;

    let listed = list_expectations(&client, &base).await;
    assert_eq!(listed, list_expectations(&client, &base).await);
    assert_eq!(listed[0]["id"], first.as_str());
    assert_eq!(listed[1]["id"], second.as_str());

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_adds_are_all_kept() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let client = client.clone();
        let base = base.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..10 {
                add_expectation(&client, &base, on_url(&format!("/w{worker}/{n}"), 0, "ok"))
                    .await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let listed = list_expectations(&client, &base).await;
    assert_eq!(listed.len(), 80);
    let mut ids: Vec<&str> = listed.iter().map(|e| e["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 80);

    server.stop().await;
}

#[tokio::test]
async fn test_proxy_forwards_to_upstream() {
    let (upstream, upstream_base) = start_mimic(Backup::default()).await;
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    add_expectation(
        &client,
        &upstream_base,
        json!({
            "request": {"method": "POST", "url": {"isEqualTo": "/upstream"}},
            "response": {
                "statusCode": 202,
                "headers": {"X-Upstream": "yes"},
                "body": "from upstream: ${request.body}"
            }
        }),
    )
    .await;
    add_expectation(
        &client,
        &base,
        json!({
            "request": {"url": {"isEqualTo": "/proxied"}},
            "proxyTo": format!("{upstream_base}/upstream")
        }),
    )
    .await;

    let response = client
        .post(format!("{base}/proxied"))
        .body("ping")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers()["x-upstream"], "yes");
    assert_eq!(response.text().await.unwrap(), "from upstream: ping");

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn test_unreachable_proxy_target_is_502() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    // Bind and drop a listener to get a port nobody listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    add_expectation(
        &client,
        &base,
        json!({
            "request": {"url": {"isEqualTo": "/down"}},
            "proxyTo": format!("http://127.0.0.1:{port}/gone")
        }),
    )
    .await;

    let (status, _) = get_text(&client, format!("{base}/down")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    server.stop().await;
}

#[tokio::test]
async fn test_connection_reset_fault() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    add_expectation(
        &client,
        &base,
        json!({
            "request": {"url": {"isEqualTo": "/broken"}},
            "fault": "connectionReset"
        }),
    )
    .await;

    assert!(client.get(format!("{base}/broken")).send().await.is_err());

    // The request was still recorded and the server keeps serving.
    let count: Value = client
        .post(format!("{base}/__mimic/executions"))
        .json(&json!({"request": {"url": {"isEqualTo": "/broken"}}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({"count": 1}));

    server.stop().await;
}

#[tokio::test]
async fn test_delayed_response() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    add_expectation(
        &client,
        &base,
        json!({
            "request": {"url": {"isEqualTo": "/slow"}},
            "response": {"body": "finally", "delayMillis": 300}
        }),
    )
    .await;

    let started = Instant::now();
    let (status, body) = get_text(&client, format!("{base}/slow")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "finally");
    assert!(started.elapsed() >= Duration::from_millis(300));

    server.stop().await;
}

#[tokio::test]
async fn test_templated_response_and_usage_limit() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    add_expectation(
        &client,
        &base,
        json!({
            "usageLimit": 1,
            "request": {"url": {"matches": "^/orders/(\\d+)$"}},
            "response": {
                "headers": {"X-Order": "${url.1}"},
                "body": "{\"id\": \"${url.1}\", \"method\": \"${request.method}\"}"
            }
        }),
    )
    .await;

    let response = client
        .get(format!("{base}/orders/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-order"], "42");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"id": "42", "method": "GET"}));

    let (status, _) = get_text(&client, format!("{base}/orders/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_expectation_is_rejected() {
    let (server, base) = start_mimic(Backup::default()).await;
    let client = client();

    let response = client
        .post(format!("{base}/__mimic/expectations"))
        .json(&json!({
            "response": {"body": "x"},
            "fault": "timeout"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(list_expectations(&client, &base).await.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_expectations_loaded_from_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("01-hello.json"),
        r#"{"request": {"url": {"isEqualTo": "/hello"}}, "response": {"body": "hello"}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("02-bye.yaml"),
        "request:\n  url:\n    isEqualTo: /bye\nresponse:\n  statusCode: 410\n",
    )
    .unwrap();

    let backup = ExpectationLoader::load_dir(dir.path()).unwrap();
    assert_eq!(backup.len(), 2);
    let (server, base) = start_mimic(backup).await;
    let client = client();

    assert_eq!(
        get_text(&client, format!("{base}/hello")).await,
        (StatusCode::OK, "hello".to_string())
    );
    let (status, _) = get_text(&client, format!("{base}/bye")).await;
    assert_eq!(status, StatusCode::GONE);

    server.stop().await;
}

#[tokio::test]
async fn test_https_with_encrypted_key() {
    let fixtures = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let acceptor = create_tls_acceptor(
        &fixtures.join("cert.pem"),
        &fixtures.join("encrypted-key.pem"),
        Some("mimic-secret"),
    )
    .expect("Failed to build TLS acceptor");

    let backup = Backup::default();
    let state = Arc::new(MockState::with_backup(&backup));
    let locator = Arc::new(ResponseStrategyLocator::new().unwrap());
    let listen = ListenConfig::new("127.0.0.1".parse().unwrap(), 0);
    let server = MockServer::bind(
        &listen,
        Dispatcher::new(state, locator),
        backup,
        Some(acceptor),
    )
    .await
    .expect("Failed to bind mimic");
    let base = format!("https://{}", server.local_addr());
    let server = server.spawn();

    let client = Client::builder()
        .timeout(TEST_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();
    add_expectation(
        &client,
        &base,
        json!({"request": {"url": {"isEqualTo": "/secure"}}, "response": {"body": "over tls"}}),
    )
    .await;

    assert_eq!(
        get_text(&client, format!("{base}/secure")).await,
        (StatusCode::OK, "over tls".to_string())
    );

    server.stop().await;
}
