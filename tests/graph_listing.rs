//! Listing traversal against a mock Graph server: pagination, retry, and
//! the truncation report when retries are exhausted.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use graph_notes::graph::GraphClient;

const USER: &str = "test@outlook.com";

fn client(server: &MockServer) -> GraphClient {
    GraphClient::new(&server.uri(), USER, "test-token".to_string())
}

fn section_json(id: &str, name: &str, modified: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "displayName": name,
        "lastModifiedDateTime": modified,
    })
}

#[tokio::test]
async fn sections_listing_follows_next_links() {
    let server = MockServer::start().await;
    let sections_path = format!("/users/{USER}/onenote/sections");

    let page2_url = format!("{}{}?page=2", server.uri(), sections_path);
    Mock::given(method("GET"))
        .and(path(sections_path.clone()))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                section_json("s3", "Archive", "2024-03-01T00:00:00Z"),
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(sections_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                section_json("s1", "Work", "2024-01-01T00:00:00Z"),
                section_json("s2", "Home", "2024-02-01T00:00:00Z"),
            ],
            "@odata.nextLink": page2_url,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listing = client(&server).list_sections().await.unwrap();

    assert_eq!(listing.pages_fetched, 2);
    assert!(!listing.truncated);
    let names: Vec<&String> = listing.items.keys().collect();
    assert_eq!(names, ["Work", "Home", "Archive"]);
}

#[tokio::test]
async fn duplicate_section_across_pages_keeps_later_modified() {
    let server = MockServer::start().await;
    let sections_path = format!("/users/{USER}/onenote/sections");

    let page2_url = format!("{}{}?page=2", server.uri(), sections_path);
    Mock::given(method("GET"))
        .and(path(sections_path.clone()))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                // same display name, older timestamp: must be discarded
                section_json("old", "Work", "2023-01-01T00:00:00Z"),
            ],
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(sections_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [section_json("new", "Work", "2024-01-01T00:00:00Z")],
            "@odata.nextLink": page2_url,
        })))
        .mount(&server)
        .await;

    let listing = client(&server).list_sections().await.unwrap();

    assert_eq!(listing.items.len(), 1);
    assert_eq!(listing.items["Work"].id, "new");
}

#[tokio::test]
async fn transient_failure_then_success_yields_the_same_result() {
    let server = MockServer::start().await;
    let pages_path = format!("/users/{USER}/onenote/sections/sec-1/pages");

    // First attempt fails, the retry succeeds.
    Mock::given(method("GET"))
        .and(path(pages_path.clone()))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(pages_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {"id": "p1", "title": "title1"},
                {"id": "p2", "title": "title2"},
            ],
        })))
        .mount(&server)
        .await;

    let listing = client(&server).list_pages("sec-1").await.unwrap();

    assert!(!listing.truncated);
    assert_eq!(listing.items.len(), 2);
    assert_eq!(listing.items["title1"], "p1");
    assert_eq!(listing.items["title2"], "p2");
}

#[tokio::test]
async fn exhausted_retries_report_truncation() {
    let server = MockServer::start().await;
    let pages_path = format!("/users/{USER}/onenote/sections/sec-1/pages");

    Mock::given(method("GET"))
        .and(path(pages_path))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let listing = client(&server).list_pages("sec-1").await.unwrap();

    assert!(listing.truncated);
    assert_eq!(listing.pages_fetched, 0);
    assert!(listing.items.is_empty());
}

#[tokio::test]
async fn page_content_is_returned_raw() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/users/{USER}/onenote/pages/p1/content")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>alpha</body></html>"),
        )
        .mount(&server)
        .await;

    let html = client(&server).page_content("p1").await.unwrap();
    assert_eq!(html, "<html><body>alpha</body></html>");
}

#[tokio::test]
async fn page_content_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/users/{USER}/onenote/pages/p1/content")))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).page_content("p1").await;
    assert!(result.is_err());
}
