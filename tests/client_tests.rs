use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use bamctl::api::{BamApiExt, BamClient};
use bamctl::config::BamConfig;
use bamctl::entity::Properties;
use bamctl::error::BamError;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;

const TOKEN: &str = "aGVsbG8gd29ybGQ=";

type QueryMap = Query<HashMap<String, String>>;

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("BAMAuthToken: {}", TOKEN);
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

async fn login(Query(q): QueryMap) -> Response {
    let user = q.get("username").map(String::as_str);
    let password = q.get("password").map(String::as_str);
    if user == Some("api") && password == Some("s3cret") {
        format!("\"Session Token-> BAMAuthToken: {} <- for User : api\"", TOKEN).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "\"Invalid username or password\"").into_response()
    }
}

async fn logout(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    "\"User api logged out\"".into_response()
}

async fn get_entity_by_id(headers: HeaderMap, Query(q): QueryMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "\"Unauthorized\"").into_response();
    }
    match q.get("id").map(String::as_str) {
        Some("12") => Json(json!({
            "id": 12,
            "name": "office",
            "type": "IP4Network",
            "properties": "CIDR=10.2.1.0/24|gateway=10.2.1.1|",
        }))
        .into_response(),
        Some("999") => {
            (StatusCode::INTERNAL_SERVER_ERROR, "\"Object was not found\"").into_response()
        }
        _ => Json(json!({ "id": 0, "name": null, "type": null, "properties": null }))
            .into_response(),
    }
}

async fn delete_object(headers: HeaderMap, Query(q): QueryMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match q.get("objectId").map(String::as_str) {
        Some("21") => StatusCode::OK.into_response(),
        _ => (StatusCode::BAD_REQUEST, "\"Object is in use\"").into_response(),
    }
}

async fn add_dhcp_deployment_role(headers: HeaderMap, Query(q): QueryMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let properties = q.get("properties").map(String::as_str);
    if properties != Some("secondaryServerInterfaceId=11|") {
        return (StatusCode::BAD_REQUEST, "\"bad properties\"").into_response();
    }
    "41".into_response()
}

/// Serve a minimal Address Manager REST API on an ephemeral port
async fn start_mock_bam() -> SocketAddr {
    let app = Router::new()
        .route("/Services/REST/v1/login", get(login))
        .route("/Services/REST/v1/logout", get(logout))
        .route("/Services/REST/v1/getEntityById", get(get_entity_by_id))
        .route("/Services/REST/v1/delete", delete(delete_object))
        .route(
            "/Services/REST/v1/addDHCPDeploymentRole",
            post(add_dhcp_deployment_role),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr, password: &str) -> BamConfig {
    BamConfig {
        server: Some(addr.to_string()),
        username: Some("api".to_string()),
        password: Some(password.to_string()),
        configuration: Some("Prod".to_string()),
        use_https: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_session_sends_auth_header() {
    let addr = start_mock_bam().await;
    let client = BamClient::login(&config(addr, "s3cret")).await.unwrap();

    let network = client.get_entity_by_id(12).await.unwrap().unwrap();
    assert_eq!(network.id, 12);
    assert_eq!(network.kind, "IP4Network");
    assert_eq!(network.cidr(), Some("10.2.1.0/24"));

    client.logout().await.unwrap();
}

#[tokio::test]
async fn test_sentinel_becomes_none() {
    let addr = start_mock_bam().await;
    let client = BamClient::login(&config(addr, "s3cret")).await.unwrap();

    assert!(client.get_entity_by_id(5).await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_operations() {
    let addr = start_mock_bam().await;
    let client = BamClient::login(&config(addr, "s3cret")).await.unwrap();

    // Empty 200 body
    assert_eq!(client.delete(21).await.unwrap(), None);

    let properties = Properties::new().with("secondaryServerInterfaceId", "11");
    let role_id = client
        .add_dhcp_deployment_role(12, 10, "MASTER", &properties)
        .await
        .unwrap();
    assert_eq!(role_id, 41);
}

#[tokio::test]
async fn test_api_error_carries_body() {
    let addr = start_mock_bam().await;
    let client = BamClient::login(&config(addr, "s3cret")).await.unwrap();

    let err = client.get_entity_by_id(999).await.unwrap_err();
    match &err {
        BamError::Api { operation, message } => {
            assert_eq!(operation, "getEntityById");
            assert_eq!(message, "500 Internal Server Error: Object was not found");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_refused_delete_returns_message() {
    let addr = start_mock_bam().await;
    let client = BamClient::login(&config(addr, "s3cret")).await.unwrap();

    assert_eq!(
        client.delete(22).await.unwrap().as_deref(),
        Some("400 Bad Request: Object is in use")
    );
}

#[tokio::test]
async fn test_bad_credentials() {
    let addr = start_mock_bam().await;

    let err = BamClient::login(&config(addr, "wrong")).await.err().unwrap();
    match &err {
        BamError::Auth(message) => assert!(message.contains("Invalid username or password")),
        other => panic!("expected an auth error, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_unreachable_server() {
    // Grab a free port, then close it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = BamClient::login(&config(addr, "s3cret")).await.err().unwrap();
    assert!(matches!(err, BamError::Transport(_)));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_connecting() {
    let config = BamConfig {
        server: Some("https://bam.example.com".to_string()),
        ..config("127.0.0.1:1".parse().unwrap(), "s3cret")
    };

    let err = BamClient::login(&config).await.err().unwrap();
    assert!(matches!(err, BamError::Config(_)));
}
