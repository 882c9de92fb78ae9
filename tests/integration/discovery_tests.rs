//! Integration tests for roster discovery
//!
//! These tests drive whole sessions against the scripted `MockSite` and
//! check traversal, termination and failure behaviour end to end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_roster::crawler::{discover, handlers, Coordinator, DriveLimits, SessionJob};
use sumi_roster::gateway::Gateways;
use sumi_roster::model::{ExtractedMember, PageClassification, PageType};
use sumi_roster::output::{OutputHandler, OutputResult};
use sumi_roster::state::Termination;
use sumi_roster::testing::{confident, FetchBehavior, MockCall, MockPage, MockSite};
use sumi_roster::{
    normalize, DiscoveryRequest, RosterDiscoverySession, RosterError, RosterMember,
    SessionDriver, UrlError,
};
use url::Url;

fn driver_for(site: MockSite) -> (Arc<MockSite>, SessionDriver) {
    let site = Arc::new(site);
    let driver = SessionDriver::new(Gateways::from_single(site.clone()));
    (site, driver)
}

fn request(seed: &str, max_depth: u32) -> DiscoveryRequest {
    DiscoveryRequest::new(seed, "Example Party", 1, max_depth)
}

fn visited(session: &RosterDiscoverySession, url: &str) -> bool {
    session.is_visited(&normalize(url).unwrap())
}

fn names(session: &RosterDiscoverySession) -> Vec<&str> {
    session.results().iter().map(|m| m.name()).collect()
}

fn classify_calls(site: &MockSite, url: &str) -> usize {
    let target = Url::parse(url).unwrap().to_string();
    site.calls()
        .iter()
        .filter(|c| matches!(c, MockCall::ClassifyPage { url } if *url == target))
        .count()
}

#[tokio::test]
async fn test_end_to_end_prefecture_city_hierarchy() {
    let site = MockSite::new()
        .index_page(
            "https://example.org/top",
            &["https://example.org/pref1", "https://example.org/pref2"],
        )
        .index_page("https://example.org/pref1", &["https://example.org/city1"])
        .index_page("https://example.org/pref2", &["https://example.org/city2"])
        .member_list("https://example.org/city1", &["Hanako Yamada"])
        .member_list("https://example.org/city2", &["Taro Sato"]);
    let (_site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/top", 2)).await.unwrap();

    assert_eq!(session.visited_count(), 5);
    for url in [
        "https://example.org/top",
        "https://example.org/pref1",
        "https://example.org/pref2",
        "https://example.org/city1",
        "https://example.org/city2",
    ] {
        assert!(visited(&session, url), "{} not visited", url);
    }
    assert_eq!(names(&session), vec!["Hanako Yamada", "Taro Sato"]);
    assert_eq!(session.pending_count(), 0);
    assert_eq!(session.error(), None);
    assert_eq!(session.termination(), Some(Termination::Exhausted));
    assert_eq!(session.steps_taken(), 5);
}

#[tokio::test]
async fn test_cycle_visits_each_page_once() {
    let site = MockSite::new()
        .index_page("https://example.org/a", &["https://example.org/b"])
        .index_page("https://example.org/b", &["https://example.org/a"]);
    let (site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/a", 5)).await.unwrap();

    assert_eq!(session.visited_count(), 2);
    assert_eq!(classify_calls(&site, "https://example.org/a"), 1);
    assert_eq!(classify_calls(&site, "https://example.org/b"), 1);
    assert_eq!(session.termination(), Some(Termination::Exhausted));
}

#[tokio::test]
async fn test_depth_limit_stops_at_max_depth() {
    let site = MockSite::new()
        .index_page("https://example.org/l0", &["https://example.org/l1"])
        .index_page("https://example.org/l1", &["https://example.org/l2"])
        .index_page("https://example.org/l2", &["https://example.org/l3"])
        .member_list("https://example.org/l3", &["Too Deep"]);
    let (site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/l0", 2)).await.unwrap();

    assert_eq!(session.visited_count(), 3);
    assert!(visited(&session, "https://example.org/l2"));
    assert!(!visited(&session, "https://example.org/l3"));
    assert!(session.results().is_empty());
    assert_eq!(site.fetch_count("https://example.org/l3"), 0);
}

#[tokio::test]
async fn test_pending_entries_never_exceed_max_depth() {
    let site = MockSite::new()
        .index_page(
            "https://example.org/",
            &["https://example.org/a", "https://example.org/b"],
        )
        .index_page("https://example.org/a", &["https://example.org/a/deeper"])
        .index_page("https://example.org/b", &["https://example.org/b/deeper"])
        .index_page("https://example.org/a/deeper", &[])
        .index_page("https://example.org/b/deeper", &[]);
    let (_site, driver) = driver_for(site);

    let limited = request("https://example.org/", 1).with_step_budget(2);
    let session = driver.run(&limited).await.unwrap();

    assert_eq!(session.termination(), Some(Termination::StepBudget));
    assert!(session.pending().all(|p| p.depth <= 1));
    assert!(!session
        .pending()
        .any(|p| p.url.as_str().ends_with("/deeper")));
}

#[tokio::test]
async fn test_explore_fetch_failure_leaves_session_unchanged() {
    let page = MockPage::new(confident(PageType::IndexPage))
        .with_links(&["https://example.org/next"])
        .with_fetch(FetchBehavior::FailAfter(0));
    let site = Arc::new(
        MockSite::new()
            .page("https://example.org/", page)
            .member_list("https://example.org/next", &["A"]),
    );
    let gateways = Gateways::from_single(site.clone());

    let mut session = RosterDiscoverySession::new("Example Party", 1, 3);
    session.enqueue(normalize("https://example.org/").unwrap(), 0);
    session.enqueue(normalize("https://example.org/other").unwrap(), 0);
    session.add_member(RosterMember::new("Existing").unwrap());
    session.pop_next();

    let before_pending: Vec<_> = session.pending().cloned().collect();
    let url = Url::parse("https://example.org/").unwrap();
    let context = handlers::context_for(&session);

    let enqueued = handlers::explore_children(&gateways, &mut session, &url, &context, 0.7).await;

    assert_eq!(enqueued, 0);
    assert_eq!(session.pending().cloned().collect::<Vec<_>>(), before_pending);
    assert_eq!(names(&session), vec!["Existing"]);
    assert_eq!(session.visited_count(), 1);
    assert_eq!(site.classify_links_calls(), 0);
}

#[tokio::test]
async fn test_fetch_failure_mid_session_is_not_fatal() {
    let explore_fails = MockPage::new(confident(PageType::IndexPage))
        .with_links(&["https://example.org/never"])
        .with_fetch(FetchBehavior::FailAfter(1));
    let site = MockSite::new()
        .index_page(
            "https://example.org/",
            &[
                "https://example.org/broken",
                "https://example.org/flaky",
                "https://example.org/members",
            ],
        )
        .failing_fetch("https://example.org/broken")
        .page("https://example.org/flaky", explore_fails)
        .member_list("https://example.org/never", &["Never Reached"])
        .member_list("https://example.org/members", &["Hanako Yamada"]);
    let (_site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/", 3)).await.unwrap();

    assert_eq!(session.error(), None);
    assert_eq!(session.termination(), Some(Termination::Exhausted));
    assert_eq!(session.visited_count(), 4);
    assert!(!visited(&session, "https://example.org/never"));
    assert_eq!(names(&session), vec!["Hanako Yamada"]);
}

#[tokio::test]
async fn test_duplicate_members_across_pages_dropped() {
    let site = MockSite::new()
        .index_page(
            "https://example.org/",
            &["https://example.org/east", "https://example.org/west"],
        )
        .member_list("https://example.org/east", &["Hanako Yamada", "Taro Sato"])
        .member_list("https://example.org/west", &["Hanako Yamada", "Jiro Suzuki"]);
    let (_site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/", 2)).await.unwrap();

    assert_eq!(names(&session), vec!["Hanako Yamada", "Taro Sato", "Jiro Suzuki"]);
    assert_eq!(session.duplicates_dropped(), 1);
}

#[tokio::test]
async fn test_nameless_members_skipped() {
    let page = MockPage::new(confident(PageType::MemberListPage)).with_extracted(vec![
        ExtractedMember::named("Hanako Yamada"),
        ExtractedMember::named("   "),
        ExtractedMember {
            position: Some("Secretary".to_string()),
            ..Default::default()
        },
    ]);
    let (_site, driver) = driver_for(MockSite::new().page("https://example.org/", page));

    let session = driver.run(&request("https://example.org/", 1)).await.unwrap();

    assert_eq!(names(&session), vec!["Hanako Yamada"]);
}

#[tokio::test]
async fn test_extraction_failure_adds_nothing() {
    let page = MockPage::new(confident(PageType::MemberListPage))
        .with_members(&["Hanako Yamada"])
        .with_extraction_error("model unavailable");
    let (_site, driver) = driver_for(MockSite::new().page("https://example.org/", page));

    let session = driver.run(&request("https://example.org/", 1)).await.unwrap();

    assert!(session.results().is_empty());
    assert_eq!(session.error(), None);
    assert_eq!(session.termination(), Some(Termination::Exhausted));
}

#[tokio::test]
async fn test_low_confidence_seed_ends_without_exploring() {
    let unsure = PageClassification::new(PageType::IndexPage, 0.5, "unsure").unwrap();
    let page = MockPage::new(unsure).with_links(&["https://example.org/a"]);
    let site = MockSite::new()
        .page("https://example.org/", page)
        .member_list("https://example.org/a", &["A"]);
    let (site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/", 2)).await.unwrap();

    assert_eq!(session.visited_count(), 1);
    assert_eq!(site.fetch_count("https://example.org/"), 1);
    assert_eq!(site.classify_links_calls(), 0);
}

#[tokio::test]
async fn test_per_request_threshold() {
    let unsure = PageClassification::new(PageType::IndexPage, 0.5, "unsure").unwrap();
    let page = MockPage::new(unsure).with_links(&["https://example.org/a"]);
    let site = MockSite::new()
        .page("https://example.org/", page)
        .member_list("https://example.org/a", &["A"]);
    let (_site, driver) = driver_for(site);

    let lenient = request("https://example.org/", 2).with_confidence_threshold(0.4);
    let session = driver.run(&lenient).await.unwrap();

    assert_eq!(names(&session), vec!["A"]);
}

#[tokio::test]
async fn test_member_list_with_children_explores_first() {
    let hub = confident(PageType::MemberListPage)
        .with_child_links(true)
        .with_member_info(true);
    let page = MockPage::new(hub)
        .with_links(&["https://example.org/list/north"])
        .with_members(&["Listed On Hub"]);
    let site = MockSite::new()
        .page("https://example.org/list", page)
        .member_list("https://example.org/list/north", &["Hanako Yamada"]);
    let (_site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/list", 2)).await.unwrap();

    assert_eq!(names(&session), vec!["Hanako Yamada"]);
    assert!(visited(&session, "https://example.org/list/north"));
}

#[tokio::test]
async fn test_offsite_links_never_classified() {
    let site = MockSite::new().index_page(
        "https://example.org/",
        &["https://elsewhere.com/members", "mailto:office@example.org"],
    );
    let (site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/", 2)).await.unwrap();

    assert_eq!(session.visited_count(), 1);
    assert_eq!(site.classify_links_calls(), 0);
}

#[tokio::test]
async fn test_invalid_seed_rejected() {
    let (_site, driver) = driver_for(MockSite::new());

    let empty = driver.run(&request("   ", 2)).await;
    assert!(matches!(empty, Err(RosterError::InvalidUrl(UrlError::Empty))));

    let malformed = driver.run(&request("not a url", 2)).await;
    assert!(matches!(malformed, Err(RosterError::InvalidUrl(_))));

    let bad_scheme = driver.run(&request("ftp://example.org/", 2)).await;
    assert!(matches!(
        bad_scheme,
        Err(RosterError::InvalidUrl(UrlError::InvalidScheme(_)))
    ));
}

#[tokio::test]
async fn test_unreachable_seed_is_not_an_error() {
    let (_site, driver) = driver_for(MockSite::new());

    let session = driver.run(&request("https://example.org/", 2)).await.unwrap();

    assert_eq!(session.visited_count(), 1);
    assert!(session.results().is_empty());
    assert_eq!(session.error(), None);
}

#[tokio::test]
async fn test_step_budget_then_resume() {
    let site = MockSite::new()
        .index_page(
            "https://example.org/",
            &[
                "https://example.org/a",
                "https://example.org/b",
                "https://example.org/c",
            ],
        )
        .member_list("https://example.org/a", &["A"])
        .member_list("https://example.org/b", &["B"])
        .member_list("https://example.org/c", &["C"]);
    let (_site, driver) = driver_for(site);

    let budgeted = request("https://example.org/", 2).with_step_budget(2);
    let partial = driver.run(&budgeted).await.unwrap();

    assert_eq!(partial.termination(), Some(Termination::StepBudget));
    assert_eq!(partial.steps_taken(), 2);
    assert_eq!(partial.visited_count(), 2);
    assert_eq!(partial.pending_count(), 2);
    assert_eq!(names(&partial), vec!["A"]);
    assert_eq!(partial.error(), None);

    // Snapshots survive serialization and resume where they stopped
    let json = serde_json::to_string(&partial).unwrap();
    let restored: RosterDiscoverySession = serde_json::from_str(&json).unwrap();

    let limits = DriveLimits {
        step_budget: 10,
        ..DriveLimits::default()
    };
    let finished = driver.resume(restored, limits).await;

    assert_eq!(finished.termination(), Some(Termination::Exhausted));
    assert_eq!(finished.steps_taken(), 4);
    assert_eq!(finished.visited_count(), 4);
    assert_eq!(names(&finished), vec!["A", "B", "C"]);

    assert_eq!(partial.pending_count(), 2);
}

#[tokio::test]
async fn test_deadline_returns_consistent_partial_session() {
    let children: Vec<String> = (0..5).map(|i| format!("https://example.org/m{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

    let mut site = MockSite::new()
        .index_page("https://example.org/", &child_refs)
        .with_latency(Duration::from_millis(50));
    for child in &child_refs {
        site = site.member_list(child, &["Someone"]);
    }
    let (_site, driver) = driver_for(site);

    let hurried = request("https://example.org/", 2).with_deadline(Duration::from_millis(150));
    let session = driver.run(&hurried).await.unwrap();

    assert_eq!(session.termination(), Some(Termination::Deadline));
    assert!(session.error().is_none());
    assert!(session.steps_taken() < 6);
    assert!(session.has_pending());
    assert!(session.pending().all(|p| !session.is_visited(&p.url)));
    assert_eq!(session.visited_count(), session.steps_taken() as usize);
}

#[tokio::test]
async fn test_panicking_step_returns_last_good_session() {
    let site = MockSite::new()
        .index_page(
            "https://example.org/",
            &["https://example.org/boom", "https://example.org/fine"],
        )
        .panicking_page("https://example.org/boom")
        .member_list("https://example.org/fine", &["Hanako Yamada"]);
    let (_site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/", 2)).await.unwrap();

    assert_eq!(session.termination(), Some(Termination::Failed));
    assert!(session.error().is_some_and(|e| e.contains("panicked")));

    // The failed step's dequeue is discarded with it
    assert_eq!(session.visited_count(), 1);
    assert!(!visited(&session, "https://example.org/boom"));
    assert_eq!(session.pending_count(), 2);
    assert_eq!(session.steps_taken(), 1);
}

#[tokio::test]
async fn test_discover_helper() {
    let site = MockSite::new().member_list("https://example.org/", &["Hanako Yamada"]);
    let request = request("https://example.org/", 2);

    let session = discover(Gateways::from_single(Arc::new(site)), &request)
        .await
        .unwrap();

    assert_eq!(names(&session), vec!["Hanako Yamada"]);
}

/// Sink recording the party ids it was handed
struct RecordingSink {
    seen: Arc<Mutex<Vec<i64>>>,
    finalized: Arc<AtomicBool>,
}

impl OutputHandler for RecordingSink {
    fn record_session(&mut self, session: &RosterDiscoverySession) -> OutputResult<()> {
        self.seen.lock().unwrap().push(session.party_id());
        Ok(())
    }

    fn finalize(&mut self) -> OutputResult<()> {
        self.finalized.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_coordinator_runs_sessions_independently() {
    let site = MockSite::new()
        .index_page("https://alpha.example.org/", &["https://alpha.example.org/members"])
        .member_list("https://alpha.example.org/members", &["Hanako Yamada"])
        .member_list("https://beta.example.net/", &["Taro Sato"])
        .with_latency(Duration::from_millis(5));
    let coordinator = Coordinator::new(Gateways::from_single(Arc::new(site)), 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let finalized = Arc::new(AtomicBool::new(false));
    let mut sinks: Vec<Box<dyn OutputHandler>> = vec![Box::new(RecordingSink {
        seen: seen.clone(),
        finalized: finalized.clone(),
    })];

    let jobs = vec![
        SessionJob::Start(DiscoveryRequest::new("https://beta.example.net/", "Beta", 2, 2)),
        SessionJob::Start(DiscoveryRequest::new("", "Broken", 3, 2)),
        SessionJob::Start(DiscoveryRequest::new("https://alpha.example.org/", "Alpha", 1, 2)),
    ];

    let report = coordinator.run_all(jobs, &mut sinks).await.unwrap();

    let ids: Vec<_> = report.sessions.iter().map(|s| s.party_id()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(names(&report.sessions[0]), vec!["Hanako Yamada"]);
    assert_eq!(names(&report.sessions[1]), vec!["Taro Sato"]);

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].party_id, 3);

    let mut recorded = seen.lock().unwrap().clone();
    recorded.sort();
    assert_eq!(recorded, vec![1, 2]);
    assert!(finalized.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_coordinator_survives_unrepresentable_deadline() {
    let site = MockSite::new().member_list("https://example.org/", &["Hanako Yamada"]);
    let coordinator = Coordinator::new(Gateways::from_single(Arc::new(site)), 1);
    let mut sinks: Vec<Box<dyn OutputHandler>> = Vec::new();

    let request = DiscoveryRequest::new("https://example.org/", "Example Party", 7, 2)
        .with_deadline(Duration::from_secs(u64::MAX));
    let report = coordinator
        .run_all(vec![SessionJob::Start(request)], &mut sinks)
        .await
        .unwrap();

    assert!(report.rejected.is_empty());
    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].party_id(), 7);
    assert_eq!(report.sessions[0].termination(), Some(Termination::Exhausted));
    assert_eq!(names(&report.sessions[0]), vec!["Hanako Yamada"]);
}

#[tokio::test]
async fn test_relative_links_resolve_against_redirect_target() {
    let site = MockSite::new()
        .redirect("https://example.org/old", "https://example.org/pref/")
        .index_page("https://example.org/pref/", &["tokyo"])
        .member_list("https://example.org/pref/tokyo", &["Hanako Yamada"])
        .member_list("https://example.org/tokyo", &["Wrong Page"]);
    let (site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/old", 2)).await.unwrap();

    assert_eq!(names(&session), vec!["Hanako Yamada"]);
    assert!(visited(&session, "https://example.org/pref/tokyo"));
    assert_eq!(site.fetch_count("https://example.org/tokyo"), 0);
}

#[tokio::test]
async fn test_offsite_redirect_is_not_classified() {
    let site = MockSite::new()
        .redirect("https://example.org/moved", "https://elsewhere.com/")
        .member_list("https://elsewhere.com/", &["Someone Else"]);
    let (site, driver) = driver_for(site);

    let session = driver.run(&request("https://example.org/moved", 2)).await.unwrap();

    assert!(session.results().is_empty());
    assert_eq!(session.visited_count(), 1);
    assert_eq!(session.error(), None);
    assert!(!site
        .calls()
        .iter()
        .any(|c| matches!(c, MockCall::ClassifyPage { .. } | MockCall::ExtractMembers { .. })));
}
