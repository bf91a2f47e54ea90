use std::env;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

async fn wait_for_server(client: &Client, base_url: &str) {
    let health_url = format!("{base_url}/api/v1/health");
    for _ in 0..60 {
        if let Ok(resp) = client.get(&health_url).send().await {
            if resp.status() == StatusCode::OK {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("server did not become healthy in time");
}

fn assert_no_wildcard_cors(headers: &HeaderMap) {
    let allow_origin = headers
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok());
    assert_ne!(
        allow_origin,
        Some("*"),
        "CORS must not use wildcard access-control-allow-origin"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running txgraph process; set TXGRAPH_TEST_SERVER_BASE_URL, TXGRAPH_TEST_SERVER_API_TOKEN and TXGRAPH_TEST_TX_HASH"]
async fn live_server_adds_and_moves_a_transaction() {
    let base_url = env::var("TXGRAPH_TEST_SERVER_BASE_URL")
        .expect("TXGRAPH_TEST_SERVER_BASE_URL must be set");
    let api_token = env::var("TXGRAPH_TEST_SERVER_API_TOKEN")
        .expect("TXGRAPH_TEST_SERVER_API_TOKEN must be set");
    let tx_hash = env::var("TXGRAPH_TEST_TX_HASH").expect("TXGRAPH_TEST_TX_HASH must be set");

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("reqwest client must build");

    wait_for_server(&client, &base_url).await;

    // =========================================================================
    // Health and auth
    // =========================================================================

    let health: Value = client
        .get(format!("{base_url}/api/v1/health"))
        .send()
        .await
        .expect("health request must succeed")
        .json()
        .await
        .expect("health response must be valid JSON");
    assert_eq!(health.get("status"), Some(&Value::String("ok".into())));

    let graph_url = format!("{base_url}/api/v1/graph");
    let unauthorized = client
        .get(&graph_url)
        .send()
        .await
        .expect("graph request must succeed");
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let preflight = client
        .request(Method::OPTIONS, &graph_url)
        .header(ORIGIN, HeaderValue::from_static("https://evil.example"))
        .header("access-control-request-method", "GET")
        .send()
        .await
        .expect("preflight request must succeed");
    assert_no_wildcard_cors(preflight.headers());
    assert!(preflight
        .headers()
        .get("access-control-allow-origin")
        .is_none());

    // =========================================================================
    // Graph
    // =========================================================================

    let reset = client
        .delete(&graph_url)
        .header("x-api-token", &api_token)
        .send()
        .await
        .expect("reset request must succeed");
    assert_eq!(reset.status(), StatusCode::OK);

    let added = client
        .post(format!("{base_url}/api/v1/graph/tx"))
        .header("x-api-token", &api_token)
        .json(&serde_json::json!({ "hash": tx_hash }))
        .send()
        .await
        .expect("add request must succeed");
    assert_eq!(added.status(), StatusCode::OK);
    let added: Value = added.json().await.expect("add response must be valid JSON");
    assert_eq!(added["outcome"], "inserted");
    assert!(added["transaction"]["block"]["block_height"].as_u64().is_some());

    let moved: Value = client
        .post(format!("{base_url}/api/v1/graph/tx/{tx_hash}/position"))
        .header("x-api-token", &api_token)
        .json(&serde_json::json!({ "x": 10.0, "y": 20.0 }))
        .send()
        .await
        .expect("drag request must succeed")
        .json()
        .await
        .expect("drag response must be valid JSON");
    assert!(!moved["moved"].as_array().map(Vec::is_empty).unwrap_or(true));

    let graph: Value = client
        .get(&graph_url)
        .header("x-api-token", &api_token)
        .send()
        .await
        .expect("graph request must succeed")
        .json()
        .await
        .expect("graph response must be valid JSON");
    assert_eq!(graph["transactions"].as_array().map(Vec::len), Some(1));
}
