//! HTTP API tests against an in-memory engine.
//!
//! Each test starts the real router on an ephemeral port and talks to it with
//! `reqwest`, so routing, parameter parsing, and error bodies are exercised
//! end to end.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use trial_search::engine::InMemoryEngine;
use trial_search::server::{router, AppState};
use trial_search::SearchGateway;

struct TestServer {
    base: String,
    engine: Arc<InMemoryEngine>,
    data_dir: TempDir,
}

fn trial(id: &str, title: &str, conditions: &[&str], status: &str) -> Value {
    json!({
        "protocolSection": {
            "identificationModule": {
                "nctId": id,
                "briefTitle": title,
                "officialTitle": format!("Official: {}", title)
            },
            "statusModule": {
                "overallStatus": status,
                "startDateStruct": {"date": "2022-01-15"}
            },
            "conditionsModule": {"conditions": conditions},
            "eligibilityModule": {"minimumAge": "18 Years", "sex": "ALL"}
        }
    })
}

fn sample_trials() -> Vec<Value> {
    vec![
        trial("NCT0001", "Immunotherapy for Lung Cancer", &["Lung Cancer"], "RECRUITING"),
        trial("NCT0002", "Breast Cancer Screening Program", &["Breast Cancer"], "COMPLETED"),
        trial("NCT0003", "Asthma Inhaler Comparison", &["Asthma"], "RECRUITING"),
        json!({"protocolSection": {"identificationModule": {"nctId": "NCT0004"}}}),
        bad_date_trial(),
    ]
}

/// A record whose start date the engine's date mapping rejects.
fn bad_date_trial() -> Value {
    let mut record = trial("NCT0005", "Bad date study", &["Asthma"], "WITHDRAWN");
    record["protocolSection"]["statusModule"]["startDateStruct"]["date"] = json!("TBD");
    record
}

async fn start_server(records: &[Value]) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let data_path: PathBuf = tmp.path().join("ctg-studies.json");
    fs::write(&data_path, serde_json::to_string(&records).unwrap()).unwrap();

    let engine = Arc::new(InMemoryEngine::new());
    let gateway = Arc::new(SearchGateway::new(engine.clone(), "clinical_trials"));
    let app = router(AppState::new(gateway, data_path));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        engine,
        data_dir: tmp,
    }
}

async fn reindex(server: &TestServer) -> Value {
    let resp = reqwest::Client::new()
        .post(format!("{}/reindex", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

async fn get(server: &TestServer, path: &str) -> reqwest::Response {
    reqwest::get(format!("{}{}", server.base, path)).await.unwrap()
}

#[tokio::test]
async fn test_version_and_health() {
    let server = start_server(&[]).await;

    let body: Value = get(&server, "/version").await.json().await.unwrap();
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let body: Value = get(&server, "/health").await.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_reindex_reports_counts() {
    let server = start_server(&sample_trials()).await;

    let body = reindex(&server).await;
    assert_eq!(body["message"], "Reindexing completed");
    assert_eq!(body["indexed"], 4);
    assert_eq!(body["failed"], 1);
}

#[tokio::test]
async fn test_reindex_twice_keeps_single_mapping_and_zero_failures() {
    let clean: Vec<Value> = sample_trials().into_iter().take(3).collect();
    let server = start_server(&clean).await;

    let first = reindex(&server).await;
    assert_eq!(first["failed"], 0);
    let mapping = server.engine.mapping("clinical_trials").unwrap();

    let second = reindex(&server).await;
    assert_eq!(second["indexed"], 3);
    assert_eq!(second["failed"], 0);
    assert_eq!(server.engine.mapping("clinical_trials").unwrap(), mapping);

    let info: Value = get(&server, "/index-info").await.json().await.unwrap();
    assert_eq!(info["doc_count"], 3);
}

#[tokio::test]
async fn test_reindex_with_missing_data_file_is_not_http_failure() {
    let server = start_server(&[]).await;
    fs::remove_file(server.data_dir.path().join("ctg-studies.json")).unwrap();

    let body = reindex(&server).await;
    assert!(body["message"].as_str().unwrap().starts_with("Reindexing failed"));
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn test_search_default_fields() {
    let server = start_server(&sample_trials()).await;
    reindex(&server).await;

    let resp = get(&server, "/search?q=cancer").await;
    assert_eq!(resp.status(), 200);
    let results: Vec<Value> = resp.json().await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r["nctId"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"NCT0001"));
    assert!(ids.contains(&"NCT0002"));

    let lung = results.iter().find(|r| r["nctId"] == "NCT0001").unwrap();
    assert_eq!(lung["briefTitle"], "Immunotherapy for Lung Cancer");
    assert_eq!(lung["officialTitle"], "Official: Immunotherapy for Lung Cancer");
    assert_eq!(lung["conditions"], json!(["Lung Cancer"]));
    assert_eq!(lung["overallStatus"], "RECRUITING");
}

#[tokio::test]
async fn test_search_round_trip_by_nct_id() {
    let server = start_server(&sample_trials()).await;
    reindex(&server).await;

    let results: Vec<Value> = get(&server, "/search?q=NCT0003&fields=nctId")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["briefTitle"], "Asthma Inhaler Comparison");
    assert_eq!(results[0]["conditions"], json!(["Asthma"]));
    assert_eq!(results[0]["overallStatus"], "RECRUITING");
}

#[tokio::test]
async fn test_search_pagination() {
    let records: Vec<Value> = (0..15)
        .map(|i| {
            trial(
                &format!("NCT{:04}", i),
                &format!("Diabetes trial {}", i),
                &["Diabetes"],
                "RECRUITING",
            )
        })
        .collect();
    let server = start_server(&records).await;
    reindex(&server).await;

    let page1: Vec<Value> = get(&server, "/search?q=diabetes&fields=briefTitle&size=10")
        .await
        .json()
        .await
        .unwrap();
    let page2: Vec<Value> = get(&server, "/search?q=diabetes&fields=briefTitle&page=2&size=10")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page1.len(), 10);
    assert_eq!(page2.len(), 5);
    assert_eq!(page2[0]["nctId"], "NCT0010");
}

#[tokio::test]
async fn test_search_rejects_invalid_params() {
    let server = start_server(&[]).await;

    for path in [
        "/search?q=cancer&size=150",
        "/search?q=cancer&size=0",
        "/search?q=cancer&page=0",
        "/search?q=cancer&page=18446744073709551615&size=100",
        "/search?q=",
        "/search",
    ] {
        let resp = get(&server, path).await;
        assert_eq!(resp.status(), 400, "expected 400 for {}", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn test_search_on_absent_index_is_server_error() {
    let server = start_server(&[]).await;

    let resp = get(&server, "/search?q=cancer").await;
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "engine_error");
}

#[tokio::test]
async fn test_index_info() {
    let server = start_server(&[]).await;

    let resp = get(&server, "/index-info").await;
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("index stats"));

    let server = start_server(&sample_trials()).await;
    reindex(&server).await;
    let resp = get(&server, "/index-info").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["doc_count"], 4);
    assert!(body["size_in_bytes"].as_u64().unwrap() > 0);
}
