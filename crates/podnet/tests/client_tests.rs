// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use podnet::{ClientConfig, NodeDataClient, PodNetError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(endpoints: Vec<String>, credits_endpoint: String) -> ClientConfig {
    ClientConfig {
        endpoints,
        credits_endpoint,
        timeout_ms: 2_000,
        cache_ttl_ms: 30_000,
    }
}

fn pod_json(pubkey: &str) -> Value {
    json!({
        "pubkey": pubkey,
        "address": "1.2.3.4:6000",
        "rpc_port": 6000,
        "uptime": 86_400,
        "storage_committed": 1_000_000_000_000u64,
        "storage_used": 500_000_000_000u64,
        "version": "1.0",
        "is_public": true,
        "last_seen_timestamp": chrono::Utc::now().timestamp() - 30,
    })
}

fn rpc_result(pods: Vec<Value>) -> Value {
    json!({ "jsonrpc": "2.0", "id": "1", "result": { "pods": pods } })
}

fn credits_body(entries: Vec<(&str, u64)>) -> Value {
    let pods_credits: Vec<Value> = entries
        .into_iter()
        .map(|(pod_id, credits)| json!({ "pod_id": pod_id, "credits": credits }))
        .collect();
    json!({ "status": "success", "pods_credits": pods_credits })
}

async fn mount_pods(server: &MockServer, pods: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(pods)))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> NodeDataClient {
    let config = test_config(
        vec![server.uri()],
        format!("{}/credits", server.uri()),
    );
    NodeDataClient::new(config).expect("client")
}

#[tokio::test]
async fn sends_a_well_formed_rpc_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({
            "jsonrpc": "2.0",
            "method": "get-pods-with-stats",
            "params": {},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![pod_json("X1")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let snapshot = client.fetch_pods().await.expect("fetch");
    assert_eq!(snapshot.pods.len(), 1);
    assert_eq!(snapshot.pods[0].pubkey, "X1");
    assert!(!snapshot.stale);
}

#[tokio::test]
async fn second_fetch_within_ttl_issues_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![pod_json("X1")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.fetch_pods().await.expect("first fetch");
    let second = client.fetch_pods().await.expect("second fetch");
    assert_eq!(first, second);
}

#[tokio::test]
async fn fetch_after_ttl_expiry_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![pod_json("X1")])))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = test_config(vec![server.uri()], format!("{}/credits", server.uri()));
    config.cache_ttl_ms = 50;
    let client = NodeDataClient::new(config).expect("client");

    client.fetch_pods().await.expect("first fetch");
    sleep(Duration::from_millis(120)).await;
    client.fetch_pods().await.expect("second fetch");
}

#[tokio::test]
async fn selection_follows_priority_order_not_arrival_order() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;
    let server_c = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server_a)
        .await;
    // B answers last but is configured before C, so B's list must win.
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rpc_result(vec![
                    pod_json("B1"),
                    pod_json("B2"),
                    pod_json("B3"),
                ]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server_b)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![
            pod_json("C1"),
            pod_json("C2"),
            pod_json("C3"),
            pod_json("C4"),
            pod_json("C5"),
        ])))
        .mount(&server_c)
        .await;

    let config = test_config(
        vec![server_a.uri(), server_b.uri(), server_c.uri()],
        format!("{}/credits", server_a.uri()),
    );
    let client = NodeDataClient::new(config).expect("client");

    let snapshot = client.fetch_pods().await.expect("fetch");
    assert_eq!(snapshot.pods.len(), 3);
    assert_eq!(snapshot.pods[0].pubkey, "B1");
}

#[tokio::test]
async fn empty_endpoint_is_passed_over_for_one_with_data() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    mount_pods(&server_a, vec![]).await;
    mount_pods(&server_b, vec![pod_json("B1"), pod_json("B2")]).await;

    let config = test_config(
        vec![server_a.uri(), server_b.uri()],
        format!("{}/credits", server_a.uri()),
    );
    let client = NodeDataClient::new(config).expect("client");

    let snapshot = client.fetch_pods().await.expect("fetch");
    assert_eq!(snapshot.pods.len(), 2);
}

#[tokio::test]
async fn bare_array_result_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": [pod_json("X1"), pod_json("X2")],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let snapshot = client.fetch_pods().await.expect("fetch");
    assert_eq!(snapshot.pods.len(), 2);
}

#[tokio::test]
async fn stale_cache_is_served_when_every_endpoint_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![pod_json("X1")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = test_config(vec![server.uri()], format!("{}/credits", server.uri()));
    config.cache_ttl_ms = 50;
    let client = NodeDataClient::new(config).expect("client");

    let fresh = client.fetch_pods().await.expect("first fetch");
    assert!(!fresh.stale);

    sleep(Duration::from_millis(120)).await;

    let fallback = client.fetch_pods().await.expect("fallback fetch");
    assert!(fallback.stale);
    assert_eq!(fallback.pods, fresh.pods);
    assert!(client.pods_cache_age().await.is_some());
}

#[tokio::test]
async fn total_failure_without_cache_reports_endpoint_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch_pods().await.expect_err("must fail");
    match err {
        PodNetError::DataUnavailable { detail } => {
            assert!(detail.contains("500"), "detail was: {detail}");
            assert!(detail.contains(&server.uri()), "detail was: {detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn rpc_level_error_counts_as_endpoint_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": { "message": "node overloaded" },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch_pods().await.expect_err("must fail");
    assert!(err.to_string().contains("node overloaded"));
}

#[tokio::test]
async fn slow_endpoint_times_out_and_the_next_one_serves() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rpc_result(vec![pod_json("A1")]))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server_a)
        .await;
    mount_pods(&server_b, vec![pod_json("B1")]).await;

    let mut config = test_config(
        vec![server_a.uri(), server_b.uri()],
        format!("{}/credits", server_b.uri()),
    );
    config.timeout_ms = 200;
    let client = NodeDataClient::new(config).expect("client");

    let snapshot = client.fetch_pods().await.expect("fetch");
    assert_eq!(snapshot.pods[0].pubkey, "B1");
}

#[tokio::test]
async fn overlapping_fetches_share_one_upstream_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rpc_result(vec![pod_json("X1")]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (first, second) = tokio::join!(client.fetch_pods(), client.fetch_pods());
    assert_eq!(first.expect("first"), second.expect("second"));
}

#[tokio::test]
async fn clear_cache_forces_a_network_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![pod_json("X1")])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.fetch_pods().await.expect("first fetch");
    client.clear_cache().await;
    assert!(client.pods_cache_age().await.is_none());
    client.fetch_pods().await.expect("second fetch");
}

#[tokio::test]
async fn credits_outage_yields_an_empty_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let credits = client.fetch_pod_credits().await;
    assert!(credits.is_empty());
}

#[tokio::test]
async fn credits_failure_after_success_returns_last_known_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(credits_body(vec![("X1", 40_000)])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = test_config(vec![server.uri()], format!("{}/credits", server.uri()));
    config.cache_ttl_ms = 50;
    let client = NodeDataClient::new(config).expect("client");

    let first = client.fetch_pod_credits().await;
    assert_eq!(first.get("X1"), Some(&40_000));

    sleep(Duration::from_millis(120)).await;

    let second = client.fetch_pod_credits().await;
    assert_eq!(second, first);
}

#[tokio::test]
async fn non_success_credits_status_is_treated_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "degraded",
            "pods_credits": [{ "pod_id": "X1", "credits": 1 }],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.fetch_pod_credits().await.is_empty());
}

#[tokio::test]
async fn combined_fetch_survives_a_credits_outage() {
    let server = MockServer::start().await;
    mount_pods(&server, vec![pod_json("X1")]).await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = client.fetch_pods_with_credits().await.expect("combined");
    assert_eq!(data.snapshot.pods.len(), 1);
    assert!(data.credits.is_empty());
}

#[tokio::test]
async fn combined_fetch_merges_both_feeds() {
    let server = MockServer::start().await;
    mount_pods(&server, vec![pod_json("X1")]).await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(credits_body(vec![("X1", 40_000)])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = client.fetch_pods_with_credits().await.expect("combined");
    assert_eq!(data.snapshot.pods[0].pubkey, "X1");
    assert_eq!(data.credits.get("X1"), Some(&40_000));
}

#[tokio::test]
async fn lookup_by_pubkey_finds_and_misses_without_error() {
    let server = MockServer::start().await;
    mount_pods(&server, vec![pod_json("X1"), pod_json("X2")]).await;

    let client = client_for(&server);
    let found = client.fetch_pod_by_pubkey("X2").await.expect("lookup");
    assert_eq!(found.map(|p| p.pubkey), Some("X2".to_string()));

    let missing = client.fetch_pod_by_pubkey("nope").await.expect("lookup");
    assert!(missing.is_none());
}

#[tokio::test]
async fn two_clients_keep_independent_caches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(vec![pod_json("X1")])))
        .expect(2)
        .mount(&server)
        .await;

    let first = client_for(&server);
    let second = client_for(&server);
    first.fetch_pods().await.expect("first client");
    second.fetch_pods().await.expect("second client");
}
