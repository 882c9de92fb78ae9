//! Integration tests for the production gateways
//!
//! The HTTP fetcher and the chat-completion gateway are exercised against
//! a wiremock server standing in for real sites and the model API.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use sumi_roster::config::UserAgentConfig;
use sumi_roster::crawler::handlers;
use sumi_roster::gateway::{
    build_http_client, Gateways, HtmlFetcher, HtmlLinkExtractor, HttpFetcher, LinkClassifier,
    LlmGateway, MemberExtractor, PageClassifier,
};
use sumi_roster::model::{ClassificationContext, Link, LinkType};
use sumi_roster::testing::MockSite;
use sumi_roster::{normalize, GatewayError, PageType, RosterDiscoverySession};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestCrawler".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
        contact_email: "admin@example.com".to_string(),
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::from_config(&user_agent(), Duration::from_secs(5)).unwrap()
}

fn gateway(server: &MockServer) -> LlmGateway {
    let client = build_http_client(&user_agent(), Duration::from_secs(5)).unwrap();
    LlmGateway::new(client, "test-key", "test-model").with_base_url(server.uri())
}

fn context() -> ClassificationContext {
    ClassificationContext {
        party_name: "Example Party".to_string(),
        party_id: 1,
        depth: 0,
        max_depth: 2,
    }
}

fn page_url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

/// Wraps model output the way the chat completions API does
fn completion(content: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [
            { "message": { "role": "assistant", "content": content.to_string() } }
        ]
    }))
}

async fn mount_completion(server: &MockServer, content: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(content))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_html_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body><p>Roster</p></body></html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch_html(&page_url(&server, "/members"))
        .await
        .unwrap();

    assert!(page.html.contains("Roster"));
    assert_eq!(page.final_url, page_url(&server, "/members"));
}

#[tokio::test]
async fn test_fetch_reports_redirect_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/members/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/members/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch_html(&page_url(&server, "/members"))
        .await
        .unwrap();

    assert_eq!(page.final_url, page_url(&server, "/members/"));
}

#[tokio::test]
async fn test_explore_resolves_links_against_redirect_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/members/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/members/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><a href=\"tokyo\">Tokyo</a></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    let tokyo = format!("{}/members/tokyo", server.uri());
    let scripted = Arc::new(MockSite::new().member_list(&tokyo, &["Hanako Yamada"]));
    let gateways = Gateways {
        fetcher: Arc::new(fetcher()),
        page_classifier: scripted.clone(),
        link_extractor: Arc::new(HtmlLinkExtractor::new()),
        link_classifier: scripted.clone(),
        member_extractor: scripted,
    };

    let requested = page_url(&server, "/members");
    let mut session = RosterDiscoverySession::new("Example Party", 1, 3);
    session.enqueue(normalize(requested.as_str()).unwrap(), 0);
    session.pop_next();
    let context = handlers::context_for(&session);

    let enqueued =
        handlers::explore_children(&gateways, &mut session, &requested, &context, 0.7).await;

    assert_eq!(enqueued, 1);
    let pending: Vec<_> = session.pending().map(|p| p.url.clone()).collect();
    assert_eq!(pending, vec![normalize(&tokyo).unwrap()]);
}

#[tokio::test]
async fn test_fetch_sends_identifying_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert!(fetcher().fetch_html(&page_url(&server, "/")).await.is_ok());
}

#[tokio::test]
async fn test_fetch_failures_are_described() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roster.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let cases = [
        ("/missing", "not found"),
        ("/busy", "rate limited"),
        ("/broken", "HTTP 503"),
        ("/roster.pdf", "expected HTML, got application/pdf"),
    ];

    for (p, expected) in cases {
        match fetcher.fetch_html(&page_url(&server, p)).await {
            Err(GatewayError::Fetch { message, .. }) => assert_eq!(message, expected, "{}", p),
            other => panic!("expected fetch error for {}, got {:?}", p, other),
        }
    }
}

#[tokio::test]
async fn test_classify_page_parses_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("test-model"))
        .respond_with(completion(json!({
            "page_type": "index_page",
            "confidence": 0.9,
            "reason": "lists prefecture chapters",
            "has_child_links": true,
            "has_member_info": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let classification = gateway(&server)
        .classify_page(
            "<html><body><a href=\"/tokyo\">Tokyo</a></body></html>",
            &Url::parse("https://example.org/").unwrap(),
            &context(),
        )
        .await
        .unwrap();

    assert_eq!(classification.page_type(), PageType::IndexPage);
    assert_eq!(classification.confidence(), 0.9);
    assert!(classification.has_child_links());
    assert!(!classification.has_member_info());
}

#[tokio::test]
async fn test_classify_page_fails_soft() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "content": "this is not json" } } ]
        })))
        .mount(&server)
        .await;

    let classification = gateway(&server)
        .classify_page(
            "<html><body>Hello</body></html>",
            &Url::parse("https://example.org/").unwrap(),
            &context(),
        )
        .await
        .unwrap();

    assert_eq!(classification.page_type(), PageType::Other);
    assert_eq!(classification.confidence(), 0.0);
}

#[tokio::test]
async fn test_classify_page_out_of_range_confidence_fails_soft() {
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({ "page_type": "member_list_page", "confidence": 1.7, "reason": "sure" }),
    )
    .await;

    let classification = gateway(&server)
        .classify_page(
            "<html><body>Hello</body></html>",
            &Url::parse("https://example.org/").unwrap(),
            &context(),
        )
        .await
        .unwrap();

    assert_eq!(classification.page_type(), PageType::Other);
    assert_eq!(classification.confidence(), 0.0);
}

#[tokio::test]
async fn test_classify_links_matches_verdicts_to_input() {
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({
            "links": [
                { "url": "https://example.org/tokyo/", "link_type": "city_list", "confidence": 0.8, "reason": "wards" },
                { "url": "https://example.org/news", "link_type": "other", "confidence": 0.9, "reason": "news" },
                { "url": "https://invented.example.com/", "link_type": "member_list", "confidence": 0.9, "reason": "?" }
            ]
        }),
    )
    .await;

    let links = vec![
        Link::new(Url::parse("https://example.org/tokyo").unwrap()).with_text("Tokyo"),
        Link::new(Url::parse("https://example.org/news").unwrap()).with_text("News"),
    ];
    let verdicts = gateway(&server)
        .classify_links(&links, &context())
        .await
        .unwrap();

    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].url().as_str(), "https://example.org/tokyo");
    assert_eq!(verdicts[0].link_type(), LinkType::CityList);
    assert!(verdicts[0].is_followable(0.7));
    assert_eq!(verdicts[1].link_type(), LinkType::Other);
    assert!(!verdicts[1].is_followable(0.7));
}

#[tokio::test]
async fn test_classify_links_empty_input_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(json!({ "links": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let verdicts = gateway(&server)
        .classify_links(&[], &context())
        .await
        .unwrap();

    assert!(verdicts.is_empty());
}

#[tokio::test]
async fn test_extract_members() {
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({
            "members": [
                { "name": "Hanako Yamada", "position": "Councillor", "prefecture": "Tokyo" },
                { "name": "Taro Sato" }
            ]
        }),
    )
    .await;

    let extraction = gateway(&server)
        .extract_members(
            "<html><body><ul><li>Hanako Yamada</li><li>Taro Sato</li></ul></body></html>",
            &Url::parse("https://example.org/tokyo").unwrap(),
            &context(),
        )
        .await
        .unwrap();

    assert!(extraction.success);
    assert_eq!(extraction.members.len(), 2);
    assert_eq!(extraction.members[0].name.as_deref(), Some("Hanako Yamada"));
    assert_eq!(extraction.members[0].prefecture.as_deref(), Some("Tokyo"));
    assert_eq!(extraction.members[1].position, None);
}

#[tokio::test]
async fn test_extract_members_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let extraction = gateway(&server)
        .extract_members(
            "<html><body>Hello</body></html>",
            &Url::parse("https://example.org/").unwrap(),
            &context(),
        )
        .await
        .unwrap();

    assert!(!extraction.success);
    assert!(extraction.members.is_empty());
    assert!(extraction
        .error
        .as_deref()
        .is_some_and(|e| e.contains("HTTP 500")));
}
