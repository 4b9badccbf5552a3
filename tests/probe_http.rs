//! HTTP probe integration tests against a mock DoH server.

use dohspeed::dns::{ProbeTarget, ResultCache};
use dohspeed::{
    rank, BatchScheduler, ErrorKind, GetFormat, HttpMethod, HttpProber, NoopObserver, Prober,
    ServerConfig, ServerTester, TestSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target(server: &MockServer, route: &str, method: HttpMethod, allow_cors: bool) -> ProbeTarget {
    let config = ServerConfig::new("Mock", Some(format!("{}{route}", server.uri()).as_str()))
        .with_method(method)
        .with_cors(allow_cors);
    ProbeTarget::from_server(&config).unwrap()
}

async fn mount(server: &MockServer, http_method: &str, route: &str, template: ResponseTemplate) {
    Mock::given(method(http_method))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_post_probe_sends_dns_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dns-query"))
        .and(header("content-type", "application/dns-message"))
        .and(header("cache-control", "no-store"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
    let t = target(&server, "/dns-query", HttpMethod::Post, true);
    let ms = prober
        .probe(&t, "example.com", &CancellationToken::new())
        .await
        .unwrap();
    assert!(ms >= 0.0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert!(body.len() > 12);
    assert_eq!(&body[2..4], &[0x01, 0x00]);
    assert_eq!(&body[body.len() - 4..], &[0, 1, 0, 1]);
}

#[tokio::test]
async fn test_error_status_with_cors_is_network_error() {
    let server = MockServer::start().await;
    mount(&server, "POST", "/dns-query", ResponseTemplate::new(500)).await;

    let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
    let t = target(&server, "/dns-query", HttpMethod::Post, true);
    let err = prober
        .probe(&t, "example.com", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
    assert!(err.detail.contains("500"));
}

#[tokio::test]
async fn test_error_status_opaque_counts_as_success() {
    let server = MockServer::start().await;
    mount(&server, "POST", "/dns-query", ResponseTemplate::new(500)).await;

    let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
    let t = target(&server, "/dns-query", HttpMethod::Post, false);
    assert!(prober
        .probe(&t, "example.com", &CancellationToken::new())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_get_json_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .and(query_param("name", "example.com"))
        .and(query_param("type", "A"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
    let t = target(&server, "/resolve", HttpMethod::Get, true);
    prober
        .probe(&t, "Example.COM", &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().any(|(k, _)| k == "nocache"));
}

#[tokio::test]
async fn test_get_wire_format_sends_dns_param() {
    let server = MockServer::start().await;
    mount(&server, "GET", "/dns-query", ResponseTemplate::new(200)).await;

    let config = ServerConfig::new("Wire", Some(format!("{}/dns-query", server.uri()).as_str()))
        .with_method(HttpMethod::Get)
        .with_format(GetFormat::Wire);
    let t = ProbeTarget::from_server(&config).unwrap();

    let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
    prober
        .probe(&t, "example.com", &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let dns = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "dns")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(!dns.contains('='));
    assert!(!dns.contains('+'));
    assert!(!dns.contains('/'));
}

#[tokio::test]
async fn test_invalid_hostname_sends_nothing() {
    let server = MockServer::start().await;
    mount(&server, "POST", "/dns-query", ResponseTemplate::new(200)).await;

    let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
    let t = target(&server, "/dns-query", HttpMethod::Post, true);
    let err = prober
        .probe(&t, "not a host", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    mount(
        &server,
        "POST",
        "/dns-query",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;

    let prober = HttpProber::with_timeout(Duration::from_millis(100)).unwrap();
    let t = target(&server, "/dns-query", HttpMethod::Post, true);
    let err = prober
        .probe(&t, "example.com", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_probe() {
    let server = MockServer::start().await;
    mount(
        &server,
        "POST",
        "/dns-query",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;

    let prober = HttpProber::with_timeout(Duration::from_secs(10)).unwrap();
    let t = target(&server, "/dns-query", HttpMethod::Post, true);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = std::time::Instant::now();
    let err = prober.probe(&t, "example.com", &cancel).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_success_is_cached() {
    let server = MockServer::start().await;
    mount(&server, "POST", "/dns-query", ResponseTemplate::new(200)).await;

    let cache = Arc::new(ResultCache::new());
    let prober = HttpProber::with_timeout(Duration::from_secs(2))
        .unwrap()
        .with_cache(cache.clone());
    let t = target(&server, "/dns-query", HttpMethod::Post, true);
    let ms = prober
        .probe(&t, "example.com", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(cache.get(t.cache_key(), "example.com"), Some(ms));
    assert!(cache.get(t.cache_key(), "github.com").is_none());
}

#[tokio::test]
async fn test_timeout_is_retried_once_by_default() {
    let server = MockServer::start().await;
    mount(
        &server,
        "POST",
        "/dns-query",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
    )
    .await;

    let prober = HttpProber::with_timeout(Duration::from_millis(100)).unwrap();
    let tester = ServerTester::new(Arc::new(prober));
    let config = ServerConfig::new("Slow", Some(format!("{}/dns-query", server.uri()).as_str()))
        .with_cors(true);

    let stats = tester
        .test(
            &config,
            &["example.com".to_string()],
            &CancellationToken::new(),
            &NoopObserver,
        )
        .await
        .unwrap();

    let outcome = &stats.outcomes[0];
    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(ErrorKind::Timeout));
    assert!(outcome.retried);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_full_run_against_mock_servers() {
    let server = MockServer::start().await;
    mount(&server, "POST", "/fast", ResponseTemplate::new(200)).await;
    mount(&server, "POST", "/broken", ResponseTemplate::new(503)).await;

    let servers = vec![
        ServerConfig::new("Fast", Some(format!("{}/fast", server.uri()).as_str())).with_cors(true),
        ServerConfig::new("Broken", Some(format!("{}/broken", server.uri()).as_str()))
            .with_cors(true),
        ServerConfig::new("Nowhere", None),
    ];
    let hostnames = vec!["example.com".to_string(), "github.com".to_string()];

    let settings = TestSettings {
        timeout: Duration::from_secs(2),
        batch_delay: Duration::from_millis(10),
        concurrency: 2,
        ..TestSettings::default()
    };
    let scheduler = BatchScheduler::from_settings(&settings).unwrap();
    let outcome = scheduler
        .run_all(&servers, &hostnames, &NoopObserver)
        .await
        .unwrap();

    assert!(!outcome.is_cancelled());
    let report = outcome.report();
    let names: Vec<_> = report.results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Fast", "Broken", "Nowhere"]);

    let fast = &report.results[0];
    assert!((fast.success_rate - 1.0).abs() < f64::EPSILON);
    assert!(fast.avg.is_some());

    let broken = &report.results[1];
    assert!(broken.avg.is_none());
    assert!(broken
        .outcomes
        .iter()
        .all(|o| o.error == Some(ErrorKind::NetworkError) && !o.retried));

    let nowhere = &report.results[2];
    assert!(nowhere
        .outcomes
        .iter()
        .all(|o| o.error == Some(ErrorKind::Unavailable)));

    let ranking = rank(&report.results, 3);
    assert!(ranking.is_reliable());
    assert_eq!(ranking.best().unwrap().name, "Fast");

    // A second run answers from the shared cache.
    let again = scheduler
        .run_all(&servers[..1], &hostnames, &NoopObserver)
        .await
        .unwrap();
    assert!(again.report().results[0].outcomes.iter().all(|o| o.cached));
}
