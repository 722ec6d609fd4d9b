/// Integration tests with a mocked upstream API
/// Tests pagination, failure handling, and report assembly without hitting
/// real external services
use prospect_health_api::config::Config;
use prospect_health_api::health::HealthAnalyzer;
use prospect_health_api::models::{Prospect, ReportQueryParams};
use prospect_health_api::pardot_client::{PardotClient, PROSPECT_HEALTH_FIELDS, REPORT_FIELDS};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config pointing at the mock server
fn create_test_config(api_base_url: String) -> Config {
    Config {
        port: 8080,
        api_base_url,
        business_unit_id: "0Uv000000000001EAA".to_string(),
        page_limit: 2,
        max_pages: 5,
        activity_max_pages: 2,
        prospect_record_cap: 100,
        sample_size: 10,
        request_timeout_secs: 5,
    }
}

fn client_for(mock_server: &MockServer) -> PardotClient {
    let config = create_test_config(mock_server.uri());
    PardotClient::new(&config, "test_token").expect("client construction")
}

#[tokio::test]
async fn test_fetch_all_follows_next_page_token() {
    let mock_server = MockServer::start().await;

    // First page carries limit and returns a continuation token
    Mock::given(method("GET"))
        .and(path("/prospects"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 1, "email": "a@x.com"},
                {"id": 2, "email": "b@x.com"}
            ],
            "nextPageToken": "tok-2"
        })))
        .mount(&mock_server)
        .await;

    // Second page is requested with the token only
    Mock::given(method("GET"))
        .and(path("/prospects"))
        .and(query_param("nextPageToken", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 3, "email": "c@x.com"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let prospects: Vec<Prospect> = client
        .fetch_all("prospects", REPORT_FIELDS, &[], 5)
        .await
        .unwrap();

    assert_eq!(prospects.len(), 3);
    assert_eq!(prospects[2].id, 3);
}

#[tokio::test]
async fn test_fetch_all_mid_stream_failure_returns_partial() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 1, "email": "a@x.com"},
                {"id": 2, "email": "b@x.com"}
            ],
            "nextPageToken": "tok-err"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .and(query_param("nextPageToken", "tok-err"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let prospects: Vec<Prospect> = client
        .fetch_all("prospects", REPORT_FIELDS, &[], 5)
        .await
        .unwrap();

    // The first page's records survive a mid-stream failure
    assert_eq!(prospects.len(), 2);
}

#[tokio::test]
async fn test_fetch_all_first_page_failure_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result: Result<Vec<Prospect>, _> =
        client.fetch_all("prospects", REPORT_FIELDS, &[], 5).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_fetch_prospects_by_url_follows_links() {
    let mock_server = MockServer::start().await;

    let next_url = format!(
        "{}/prospects?fields=id,email&nextPageToken=url-tok",
        mock_server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 1, "email": "a@x.com"},
                {"id": 2, "email": "b@x.com"}
            ],
            "nextPageUrl": next_url
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .and(query_param("nextPageToken", "url-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 3, "email": "c@x.com"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let prospects = client
        .fetch_prospects_by_url(PROSPECT_HEALTH_FIELDS, 100)
        .await
        .unwrap();

    assert_eq!(prospects.len(), 3);
}

#[tokio::test]
async fn test_fetch_prospects_by_url_respects_record_cap() {
    let mock_server = MockServer::start().await;

    // Every page advertises a next link; the cap must stop the walk
    let next_url = format!(
        "{}/prospects?fields=id,email&nextPageToken=loop",
        mock_server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 1, "email": "a@x.com"},
                {"id": 2, "email": "b@x.com"}
            ],
            "nextPageUrl": next_url
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let prospects = client
        .fetch_prospects_by_url(PROSPECT_HEALTH_FIELDS, 4)
        .await
        .unwrap();

    assert_eq!(prospects.len(), 4);
}

#[tokio::test]
async fn test_count_activities_applies_type_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/visitor-activities"))
        .and(query_param("type", "click"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {"id": 10}, {"id": 11}, {"id": 12}
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let count = client.count_activities(Some("click"), None).await.unwrap();

    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_health_report_from_live_data() {
    let mock_server = MockServer::start().await;

    // One catch-all page serves the count, report, and sample reads; with
    // no continuation token each fetch stops after a single page
    Mock::given(method("GET"))
        .and(path("/prospects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [
                {
                    "id": 1,
                    "email": "a@x.com",
                    "firstName": "Ada",
                    "createdAt": "2025-08-01T10:00:00Z",
                    "updatedAt": "2025-08-20T10:00:00Z"
                },
                {
                    "id": 2,
                    "email": "b@x.com",
                    "createdAt": "2020-01-01T10:00:00Z",
                    "updatedAt": "2020-01-01T10:00:00Z",
                    "optedOut": true
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let client = PardotClient::new(&config, "test_token").unwrap();
    let analyzer = HealthAnalyzer::new(&client, &config);

    let report = analyzer
        .get_comprehensive_stats(&ReportQueryParams::default())
        .await;

    assert_eq!(report.summary.total_database, 2);
    assert_eq!(report.summary.marketable_leads, 1);
    assert_eq!(report.chart_data.len(), 6);
    assert!(!report.active_contacts.table_data.is_empty());
    assert!(!report.empty_details.table_data.is_empty());
    // Grand-total rows never carry a ratio
    assert_eq!(report.active_contacts.table_data[0].percentage, "–");
}

#[tokio::test]
async fn test_health_report_falls_back_on_api_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let client = PardotClient::new(&config, "test_token").unwrap();
    let analyzer = HealthAnalyzer::new(&client, &config);

    let report = analyzer
        .get_comprehensive_stats(&ReportQueryParams::default())
        .await;

    // Placeholder numbers, but a structurally complete document
    assert_eq!(report.summary.total_database, 1000);
    assert!(!report.chart_data.is_empty());
    assert!(!report.scoring_issues.table_data.is_empty());
    assert_eq!(report.recommendations.active_contacts[0].title, "API Connection Issue");
}

#[tokio::test]
async fn test_concurrent_sample_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [{"id": 1, "email": "a@x.com"}]
        })))
        .expect(10)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());

    let mut handles = vec![];
    for _ in 0..10 {
        let config_clone = config.clone();
        let handle = tokio::spawn(async move {
            let client = PardotClient::new(&config_clone, "test_token").unwrap();
            client.fetch_sample(5).await
        });
        handles.push(handle);
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }
}
