use campaign_monitor::{
    error::{Error, TransportError},
    models::{ConsentToTrack, SmartEmailRequest, SubscriberRequest},
    transport::{HttpRequest, HttpResponse},
    Client, Config, PageSize, Payload, Transport,
};
use futures_util::StreamExt;
use serde_json::json;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing_test::traced_test;
use wiremock::{
    matchers::{body_json, body_string, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const LIST_ID: &str = "list-1";
const TOKEN: &str = "YXBpa2V5Ong=";

fn client_for(server: &MockServer) -> Client {
    let config = Config::new(LIST_ID, TOKEN)
        .unwrap()
        .with_base_url(server.uri())
        .unwrap();
    Client::new(config).unwrap()
}

#[tokio::test]
async fn add_subscriber_returns_response_as_string() {
    let server = MockServer::start().await;
    let payload = r#"{"EmailAddress":"jane@example.com","Resubscribe":true}"#;

    Mock::given(method("POST"))
        .and(path("/api/v3.1/subscribers/list-1.json"))
        .and(header("Authorization", "Basic YXBpa2V5Ong="))
        .and(header("Content-Type", "application/json"))
        .and(body_string(payload))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Status":"ok"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client_for(&server).add_subscriber(payload).await.unwrap();

    assert_eq!(resp.to_string(), r#"{"Status":"ok"}"#);
    assert_eq!(resp.as_value()["Status"], "ok");
}

#[tokio::test]
async fn add_subscriber_accepts_typed_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v3.1/subscribers/list-1.json"))
        .and(body_json(json!({
            "EmailAddress": "jane@example.com",
            "Name": "Jane",
            "Resubscribe": false,
            "ConsentToTrack": "No"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#""jane@example.com""#))
        .expect(1)
        .mount(&server)
        .await;

    let req = SubscriberRequest {
        email_address: "jane@example.com".into(),
        name: Some("Jane".into()),
        consent_to_track: ConsentToTrack::No,
        ..Default::default()
    };
    let resp = client_for(&server)
        .add_subscriber(Payload::json(&req).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.as_value(), &json!("jane@example.com"));
}

#[tokio::test]
async fn update_subscriber_puts_with_email_query() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v3.1/subscribers/list-1.json"))
        .and(query_param("email", "old+tag@example.com"))
        .and(header("Authorization", "Basic YXBpa2V5Ong="))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .update_subscriber(
            r#"{"EmailAddress":"new@example.com"}"#,
            "old+tag@example.com",
        )
        .await
        .unwrap();

    assert!(resp.as_value().is_null());
}

#[tokio::test]
async fn send_transactional_email_posts_to_template() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v3.1/transactional/smartemail/tpl-9/send"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!([
            {"Status": "Accepted", "MessageID": "m-1", "Recipient": "jane@example.com"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let req = SmartEmailRequest {
        to: vec!["jane@example.com".into()],
        data: [("firstname".to_string(), "Jane".to_string())].into(),
        ..Default::default()
    };
    let resp = client_for(&server)
        .send_transactional_email("tpl-9", Payload::json(&req).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.as_value()[0]["Status"], "Accepted");
}

#[tokio::test]
async fn non_json_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_subscriber("{}")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResponseParse(_)));
}

#[tokio::test]
async fn api_errors_are_surfaced_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"Code": 1, "Message": "Invalid Email Address"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_subscriber("{}")
        .await
        .unwrap_err();

    match err {
        Error::CampaignMonitor { status, error } => {
            assert_eq!(status, 400);
            assert_eq!(error.code, 1);
            assert_eq!(error.message, "Invalid Email Address");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn json_error_body_of_another_shape_keeps_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_subscriber("{}")
        .await
        .unwrap_err();

    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, json!({"error": "not found"}));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_error_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_subscriber("{}")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResponseParse(_)));
}

#[tokio::test]
async fn blank_body_is_only_accepted_for_subscriber_updates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.add_subscriber("{}").await.unwrap_err();
    assert!(matches!(err, Error::ResponseParse(_)));

    let err = client
        .send_transactional_email("tpl", "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResponseParse(_)));

    let resp = client
        .update_subscriber("{}", "jane@example.com")
        .await
        .unwrap();
    assert!(resp.as_value().is_null());
}

#[tokio::test]
async fn get_subscriber_returns_typed_details() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3.1/subscribers/list-1.json"))
        .and(query_param("email", "jane@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "EmailAddress": "jane@example.com",
            "Name": "Jane",
            "Date": "2024-01-01 10:00:00",
            "State": "Active",
            "CustomFields": [{"Key": "Plan", "Value": "pro"}],
            "ConsentToTrack": "Yes"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let subscriber = client_for(&server)
        .get_subscriber("jane@example.com")
        .await
        .unwrap();

    assert_eq!(subscriber.name, "Jane");
    assert_eq!(subscriber.state, "Active");
    assert_eq!(subscriber.custom_fields[0].value, "pro");
}

fn page(number: usize, of: usize, emails: &[&str]) -> serde_json::Value {
    json!({
        "Results": emails
            .iter()
            .map(|e| json!({"EmailAddress": e, "Name": "", "State": "Active"}))
            .collect::<Vec<_>>(),
        "ResultsOrderedBy": "email",
        "OrderDirection": "asc",
        "PageNumber": number,
        "PageSize": 10,
        "RecordsOnThisPage": emails.len(),
        "TotalNumberOfRecords": 3,
        "NumberOfPages": of
    })
}

#[tokio::test]
async fn active_subscribers_walks_every_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3.1/lists/list-1/active.json"))
        .and(query_param("page", "1"))
        .and(query_param("pagesize", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(1, 2, &["a@example.com", "b@example.com"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3.1/lists/list-1/active.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(2, 2, &["c@example.com"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_page_size(PageSize::new(10));
    let emails: Vec<String> = client
        .active_subscribers()
        .map(|res| res.unwrap().email_address)
        .collect()
        .await;

    assert_eq!(emails, ["a@example.com", "b@example.com", "c@example.com"]);
}

#[tokio::test]
async fn active_subscribers_stops_after_first_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"Code": 50, "Message": "Must supply a valid HTTP Basic Authorization header"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let results: Vec<_> = client_for(&server).active_subscribers().collect().await;

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(Error::CampaignMonitor { status: 401, .. })
    ));
}

#[tokio::test]
#[traced_test]
async fn active_subscribers_failures_are_logged_inside_a_span() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3.1/lists/list-1/active.json"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"Code": 500, "Message": "Boom"})),
        )
        .mount(&server)
        .await;

    let results: Vec<_> = client_for(&server).active_subscribers().collect().await;

    assert_eq!(results.len(), 1);
    assert!(logs_contain("active_subscribers{list_id=list-1}"));
    assert!(logs_contain("Campaign Monitor rejected the request"));
}

#[derive(Default)]
struct RefusingTransport {
    attempts: AtomicUsize,
}

#[async_trait::async_trait]
impl Transport for RefusingTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Request("connection refused".into()))
    }
}

#[tokio::test]
async fn connection_failure_is_not_retried() {
    let transport = Arc::new(RefusingTransport::default());
    let client =
        Client::with_transport(Config::new(LIST_ID, TOKEN).unwrap(), transport.clone()).unwrap();

    let err = client.add_subscriber("{}").await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
}

struct UnreadableBody;

#[async_trait::async_trait]
impl Transport for UnreadableBody {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::ReadBody("connection reset".into()))
    }
}

#[tokio::test]
async fn body_read_failure_is_reported_separately() {
    let client = Client::with_transport(Config::new(LIST_ID, TOKEN).unwrap(), UnreadableBody).unwrap();

    let err = client
        .send_transactional_email("tpl", "{}")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResponseRead(_)));
}

#[tokio::test]
async fn unreachable_host_fails_without_value() {
    // Bind and drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = Config::new(LIST_ID, TOKEN)
        .unwrap()
        .with_base_url(format!("http://127.0.0.1:{port}"))
        .unwrap();

    let err = Client::new(config)
        .unwrap()
        .add_subscriber("{}")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config: Config =
        serde_json::from_str(r#"{"list_id":"","auth_token":"tok"}"#).unwrap();
    assert!(matches!(Client::new(config), Err(Error::Config(_))));
}
