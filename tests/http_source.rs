/// Integration tests for the reqwest-backed `HttpStatsSource`
///
/// Tests verify:
/// 1. Request URLs carry the variable in the path and one `dcid` per place
/// 2. Flat JSON bodies are decoded into series
/// 3. Non-2xx responses surface as `StatsError::HttpError`
/// 4. The full fetch runs over real sockets, concurrently
///
/// The local tests talk to a loopback server started by the test itself.
/// The `#[ignore]` test talks to a live backend configured through `.env`:
///
///   STATS_API_BASE_URL=https://your-stats-host
///
/// Run with: cargo test --test http_source -- --include-ignored

use stats_aggregator::config::ApiConfig;
use stats_aggregator::fetch::{FetchOptions, fetch_stats_data};
use stats_aggregator::ingest::{HttpStatsSource, StatsSource};
use stats_aggregator::labels::VariableLabels;
use stats_aggregator::model::{DataPoint, StatsError};

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Minimal HTTP/1.1 responder: path -> (status, body). Records every
/// request target it sees.
struct LoopbackServer {
    base_url: String,
    targets: Arc<Mutex<Vec<String>>>,
}

impl LoopbackServer {
    fn start(routes: HashMap<&'static str, (u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let targets = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&targets);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let text = String::from_utf8_lossy(&request);
                let target = text.split_whitespace().nth(1).unwrap_or("").to_string();
                seen.lock().unwrap().push(target.clone());

                let path = target.split('?').next().unwrap_or("");
                let (status, body) = routes.get(path).copied().unwrap_or((404, "{}"));
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            targets,
        }
    }

    fn source(&self) -> HttpStatsSource {
        HttpStatsSource::new(&ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
        })
        .expect("client should build")
    }

    fn targets(&self) -> Vec<String> {
        let mut targets = self.targets.lock().unwrap().clone();
        targets.sort();
        targets
    }
}

const COUNT_PERSON: &str = r#"{
    "geoId/05": {"data": {"2011": 21000, "2012": 22000}, "place_name": "Arkansas"},
    "geoId/06": {"data": {"2011": 31000, "2012": 32000}, "place_name": "California"}
}"#;

const COUNT_PERSON_MALE: &str = r#"{
    "geoId/05": {"data": {"2011": 11000, "2012": 13000}, "place_name": "Arkansas"},
    "geoId/06": {"data": {"2011": 15000, "2012": 16000}, "place_name": "California"}
}"#;

fn places() -> Vec<String> {
    vec!["geoId/05".to_string(), "geoId/06".to_string()]
}

// ---------------------------------------------------------------------------
// Loopback Tests
// ---------------------------------------------------------------------------

#[test]
fn test_fetch_variable_sends_repeated_dcid_params() {
    let server = LoopbackServer::start(HashMap::from([(
        "/api/stats/Count_Person",
        (200, COUNT_PERSON),
    )]));

    let response = server
        .source()
        .fetch_variable("Count_Person", &places())
        .expect("loopback fetch should succeed");

    let arkansas = response["geoId/05"].as_ref().expect("Arkansas series");
    assert_eq!(arkansas.place_name, "Arkansas");
    assert_eq!(arkansas.data["2012"], 22000.0);

    let targets = server.targets();
    assert_eq!(targets.len(), 1);
    assert!(
        targets[0].contains("dcid=geoId/05") && targets[0].contains("dcid=geoId/06"),
        "request target should list both places, got {}",
        targets[0]
    );
}

#[test]
fn test_non_success_status_is_http_error() {
    let server = LoopbackServer::start(HashMap::from([(
        "/api/stats/Count_Person",
        (500, "{}"),
    )]));
    let err = server
        .source()
        .fetch_variable("Count_Person", &places())
        .unwrap_err();
    assert_eq!(err, StatsError::HttpError(500));
}

#[test]
fn test_malformed_body_is_parse_error() {
    let server = LoopbackServer::start(HashMap::from([(
        "/api/stats/Count_Person",
        (200, "not json"),
    )]));
    let err = server
        .source()
        .fetch_variable("Count_Person", &places())
        .unwrap_err();
    assert!(matches!(err, StatsError::ParseError(_)), "got {:?}", err);
}

#[test]
fn test_unreachable_backend_is_request_failure() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let source = HttpStatsSource::new(&ApiConfig {
        base_url: format!("http://127.0.0.1:{}", port),
        timeout_secs: 2,
    })
    .unwrap();
    let err = source.fetch_variable("Count_Person", &places()).unwrap_err();
    assert!(matches!(err, StatsError::RequestFailed(_)), "got {:?}", err);
}

#[test]
fn test_full_fetch_over_http_with_display_names() {
    let server = LoopbackServer::start(HashMap::from([
        ("/api/stats/Count_Person", (200, COUNT_PERSON)),
        ("/api/stats/Count_Person_Male", (200, COUNT_PERSON_MALE)),
        (
            "/api/place/displayname",
            (200, r#"{"geoId/05": "Arkansas, USA", "geoId/06": "California, USA"}"#),
        ),
    ]));
    let options = FetchOptions {
        resolve_display_names: true,
        ..FetchOptions::default()
    };

    let stats = fetch_stats_data(
        &server.source(),
        Arc::new(VariableLabels::default()),
        &places(),
        &["Count_Person".to_string(), "Count_Person_Male".to_string()],
        &options,
    )
    .expect("loopback fetch should succeed");

    let groups = stats.place_groups(None);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].label, "Arkansas, USA");
    assert_eq!(
        groups[1].points,
        vec![DataPoint::new("Total", Some(32000.0)), DataPoint::new("Male", Some(16000.0))]
    );
    assert_eq!(server.targets().len(), 3, "one request per variable plus display names");
}

// ---------------------------------------------------------------------------
// Live Backend
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_backend_returns_population_for_two_states() {
    dotenv::dotenv().ok();
    let base_url = std::env::var("STATS_API_BASE_URL").expect("STATS_API_BASE_URL must be set");
    let source = HttpStatsSource::new(&ApiConfig {
        base_url,
        timeout_secs: 30,
    })
    .expect("client should build");

    let stats = fetch_stats_data(
        &source,
        Arc::new(VariableLabels::default()),
        &places(),
        &["Count_Person".to_string()],
        &FetchOptions::default(),
    )
    .unwrap_or_else(|e| panic!("live fetch failed: {}", e));

    println!("✓ {} dates, latest common {:?}", stats.dates.len(), stats.latest_common_date);
    assert!(!stats.dates.is_empty(), "live backend should return at least one date");
    for point in stats.stats_point(None, None) {
        assert!(point.value.is_some_and(|v| v > 0.0), "population should be positive");
    }
}
