/// Integration tests for the `stats_aggregator` binary
///
/// Runs the compiled CLI against a loopback stats backend and checks that
/// stdout carries only the JSON document while log lines go to stderr.
///
/// Run with: cargo test --test cli_output

use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const COUNT_PERSON: &str = r#"{
    "geoId/05": {"data": {"2011": 21000, "2012": 22000}, "place_name": "Arkansas"},
    "geoId/06": {"data": {"2011": 31000, "2012": 32000}, "place_name": "California"}
}"#;

/// Serves `COUNT_PERSON` for every request and returns the base URL.
fn start_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
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
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                COUNT_PERSON.len(),
                COUNT_PERSON
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}", addr)
}

/// Scratch directory unique to this test process and `name`.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stats_cli_{}_{}", std::process::id(), name));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn run_cli(dir: &PathBuf, base_url: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stats_aggregator"))
        .current_dir(dir)
        .env("STATS_API_BASE_URL", base_url)
        .args(args)
        .output()
        .expect("binary should start")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not a single JSON document ({}):\n{}", e, stdout))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_stdout_is_only_json_with_compact_logging() {
    let dir = scratch_dir("compact");
    let output = run_cli(
        &dir,
        &start_backend(),
        &["--places", "geoId/05,geoId/06", "--vars", "Count_Person"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json[0]["label"], "Arkansas");
    assert_eq!(json[1]["points"][0]["value"], 32000.0);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Using stats API at"), "info lines belong on stderr: {}", stderr);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_stdout_is_only_json_with_timestamped_debug_logging() {
    let dir = scratch_dir("timestamped");
    let config = dir.join("cli.toml");
    fs::write(&config, "[logging]\nlevel = \"debug\"\ntimestamps = true\n").unwrap();

    let output = run_cli(
        &dir,
        &start_backend(),
        &[
            "--config", config.to_str().unwrap(),
            "--places", "geoId/05",
            "--vars", "Count_Person",
            "--shape", "point",
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json, serde_json::json!([{"label": "Total", "value": 22000.0}]));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("INFO FETCH: Fetch complete"), "got stderr: {}", stderr);
    assert!(stderr.contains("DEBUG"), "debug lines expected in timestamp mode: {}", stderr);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_labels_file_renames_variables() {
    let dir = scratch_dir("labels");
    let labels = dir.join("labels.toml");
    fs::write(&labels, "Count_Person = \"Residents\"\n").unwrap();

    let output = run_cli(
        &dir,
        &start_backend(),
        &[
            "--labels", labels.to_str().unwrap(),
            "--places", "geoId/06",
            "--vars", "Count_Person",
            "--shape", "point",
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output)[0]["label"], "Residents");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_labels_file_exits_with_runtime_error() {
    let dir = scratch_dir("missing_labels");
    let output = run_cli(
        &dir,
        &start_backend(),
        &["--labels", "absent.toml", "--places", "geoId/05", "--vars", "Count_Person"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "nothing should be printed to stdout on failure");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"), "got stderr: {}", stderr);
    let _ = fs::remove_dir_all(&dir);
}
