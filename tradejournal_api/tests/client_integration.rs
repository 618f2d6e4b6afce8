use std::time::Duration;

use tradejournal_api::types::RecordId;
use tradejournal_api::{Client, Error, FEE_IDS_PER_REQUEST};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[tokio::test]
async fn list_trades_success() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("trades.json");

    Mock::given(method("GET"))
        .and(path("/rest/v1/trades"))
        .and(query_param("user_id", "eq.user-1"))
        .and(query_param("order", "entry_date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let rows = client.list_trades("user-1").await.unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].id, Some(RecordId::Int(101)));
}

#[tokio::test]
async fn api_key_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/trades"))
        .and(header("apikey", "secret"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri()).with_api_key("secret");
    let rows = client.list_trades("user-1").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn list_trades_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/trades"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let result = client.list_trades("user-1").await;
    match result {
        Err(Error::HttpStatus { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("expected HttpStatus error, got {:?}", other.map(|r| r.len())),
    }
}

#[tokio::test]
async fn list_trades_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/trades"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let result = client.list_trades("user-1").await;
    assert!(matches!(result, Err(Error::RequestFailed)));
}

#[tokio::test]
async fn missing_swap_table_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/solana_trades"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"code":"42P01","message":"relation \"public.solana_trades\" does not exist"}"#,
        ))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let result = client.list_swap_trades("user-1").await;
    match result {
        Err(Error::TableMissing { table }) => assert_eq!(table, "solana_trades"),
        other => panic!("expected TableMissing, got {:?}", other.map(|r| r.len())),
    }
}

#[tokio::test]
async fn list_swap_trades_success() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("solana_trades.json");

    Mock::given(method("GET"))
        .and(path("/rest/v1/solana_trades"))
        .and(query_param("order", "timestamp.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let rows = client.list_swap_trades("user-1").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].token_out.as_deref(), Some("BONK"));
}

#[tokio::test]
async fn sum_fees_adds_amounts() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("trade_fees.json");

    Mock::given(method("GET"))
        .and(path("/rest/v1/trade_fees"))
        .and(query_param("trade_id", "in.(101,102)"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let total = client.sum_fees(&["101", "102"]).await.unwrap();
    assert!((total - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn sum_fees_splits_large_id_sets() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/trade_fees"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"[{ "trade_id": 1, "amount": 1.5 }]"#),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let ids: Vec<String> = (0..(FEE_IDS_PER_REQUEST * 2 + 1))
        .map(|i| format!("{:08x}-0000-4000-8000-000000000000", i))
        .collect();
    let client = Client::new(&mock_server.uri());
    let total = client.sum_fees(&ids).await.unwrap();
    assert!((total - 4.5).abs() < 1e-9);

    for request in mock_server.received_requests().await.unwrap() {
        assert!(request.url.as_str().len() < 8 * 1024);
    }
}

#[tokio::test]
async fn sum_fees_without_ids_skips_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri());
    let ids: [&str; 0] = [];
    let total = client.sum_fees(&ids).await.unwrap();
    assert_eq!(total, 0.0);
}

#[tokio::test]
async fn slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/trades"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::new(&mock_server.uri()).with_timeout(Duration::from_millis(50));
    let result = client.list_trades("user-1").await;
    assert!(matches!(result, Err(Error::Timeout)));
}

#[test]
fn transient_errors() {
    assert!(Error::Timeout.is_transient());
    assert!(Error::RequestFailed.is_transient());
    assert!(Error::HttpStatus { status: 503, body: String::new() }.is_transient());
    assert!(!Error::HttpStatus { status: 401, body: String::new() }.is_transient());
    assert!(!Error::TableMissing { table: "x".to_string() }.is_transient());
}
