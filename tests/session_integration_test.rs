//! Integration tests for the broker login handshake.
//!
//! These run the real reqwest adapter against a wiremock broker and verify:
//! - the form login, the 302 redirect, and the two-fragment cookie join
//! - session verification against the authorization endpoint
//! - that every authenticated call carries the joined cookie
//! - that each deviation from the handshake fails with an auth error

use topictail::adapters::ReqwestHttpClient;
use topictail::{BrokerEnv, EngineConfig, EngineError, Region, TopicSearchClient};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> EngineConfig {
    EngineConfig::new(server.uri(), Region::Emea, BrokerEnv::Qa).with_cluster("test-cluster")
}

/// Mount a well-behaved login flow: 302 with two cookie fragments, then a
/// JSON authorization check.
async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .append_header("set-cookie", "SESSION=abc123; Path=/; HttpOnly")
                .append_header("set-cookie", "XSRF-TOKEN=xyz789; Path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"userInfo":{}}"#, "application/json"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_connect_joins_both_cookie_fragments() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let client = TopicSearchClient::connect(ReqwestHttpClient::new(), test_config(&server))
        .await
        .expect("handshake should succeed");

    let cookie = client.credential().cookie();
    assert!(cookie.contains("SESSION=abc123"));
    assert!(cookie.contains("XSRF-TOKEN=xyz789"));
    // Fragments are joined in server order with "; ".
    let session_pos = cookie.find("SESSION").unwrap();
    let xsrf_pos = cookie.find("XSRF-TOKEN").unwrap();
    assert!(session_pos < xsrf_pos);
}

#[tokio::test]
async fn test_login_form_is_url_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("username=guest%20user"))
        .and(body_string_contains("password=p%40ss"))
        .respond_with(
            ResponseTemplate::new(302)
                .append_header("set-cookie", "SESSION=s1")
                .append_header("set-cookie", "XSRF-TOKEN=t1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let config = test_config(&server).with_login("guest user", "p@ss");
    TopicSearchClient::connect(ReqwestHttpClient::new(), config)
        .await
        .expect("handshake should succeed");
}

#[tokio::test]
async fn test_login_rejects_non_redirect_status() {
    let server = MockServer::start().await;

    // A 200 means the form was re-rendered, i.e. the login failed.
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = TopicSearchClient::connect(ReqwestHttpClient::new(), test_config(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth { .. }));
    assert!(err.to_string().contains("302"));
}

#[tokio::test]
async fn test_login_rejects_missing_cookie_fragment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(302).append_header("set-cookie", "SESSION=only-one"))
        .mount(&server)
        .await;

    let err = TopicSearchClient::connect(ReqwestHttpClient::new(), test_config(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth { .. }));
    assert!(err.to_string().contains("set-cookie"));
}

#[tokio::test]
async fn test_verification_rejects_non_200() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .append_header("set-cookie", "SESSION=s1")
                .append_header("set-cookie", "XSRF-TOKEN=t1"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/authorization"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = TopicSearchClient::connect(ReqwestHttpClient::new(), test_config(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth { .. }));
}

#[tokio::test]
async fn test_verification_rejects_non_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .append_header("set-cookie", "SESSION=s1")
                .append_header("set-cookie", "XSRF-TOKEN=t1"),
        )
        .mount(&server)
        .await;

    // A 200 HTML page here is the login form again: the session is not live.
    Mock::given(method("GET"))
        .and(path("/api/authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let err = TopicSearchClient::connect(ReqwestHttpClient::new(), test_config(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth { .. }));
    assert!(err.to_string().contains("content type"));
}

#[tokio::test]
async fn test_authenticated_calls_carry_joined_cookie() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/clusters/test-cluster/topics"))
        .and(header(
            "cookie",
            "SESSION=abc123; Path=/; HttpOnly; XSRF-TOKEN=xyz789; Path=/",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"pageCount":1,"topics":[{"name":"orchestration","partitionCount":4,"internal":false}]}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = TopicSearchClient::connect(ReqwestHttpClient::new(), test_config(&server))
        .await
        .expect("handshake should succeed");

    let page = client.list_topics("orchestration").await.expect("topics");
    assert_eq!(page.topics.len(), 1);
    assert_eq!(page.topics[0].name, "orchestration");
    assert_eq!(page.topics[0].partition_count, 4);
}
