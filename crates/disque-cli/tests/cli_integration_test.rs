//! CLI Integration Tests
//!
//! Runs the `disque` binary against a fake node listening on an ephemeral
//! port. The fake node keeps one in-memory queue map shared by every
//! connection, so separate invocations see each other's jobs.

use std::collections::{HashMap, VecDeque};
use std::io::{BufReader, Write};
use std::net::TcpListener;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

use disque_common::transport::{RespCodec, RespFrame};
use serde_json::{json, Value};

const NODE_ID: &str = "c0ffee00d6d2ab2f0d8bd8a0b4f9b5c2e51e3fb2";

// ============================================================================
// Test Helpers
// ============================================================================

type Queues = Arc<Mutex<HashMap<String, VecDeque<(String, String)>>>>;

fn request_strings(frame: RespFrame) -> Vec<String> {
    match frame {
        RespFrame::Array(Some(items)) => items
            .into_iter()
            .map(|item| match item {
                RespFrame::Bulk(Some(bytes)) => String::from_utf8(bytes).unwrap(),
                other => panic!("unexpected request item {:?}", other),
            })
            .collect(),
        other => panic!("unexpected request {:?}", other),
    }
}

fn handle(port: u16, queues: &Queues, request: &[String]) -> RespFrame {
    let (command, args) = request.split_first().unwrap();
    let mut queues = queues.lock().unwrap();
    match command.as_str() {
        "AUTH" if args[0] == "secret" => RespFrame::Status("OK".to_string()),
        "AUTH" => RespFrame::Error("ERR invalid password".to_string()),
        "HELLO" => RespFrame::array(vec![
            RespFrame::Integer(1),
            RespFrame::bulk(NODE_ID),
            RespFrame::array(vec![
                RespFrame::bulk(NODE_ID),
                RespFrame::bulk("127.0.0.1"),
                RespFrame::bulk(port.to_string()),
                RespFrame::bulk("1"),
            ]),
        ]),
        "ADDJOB" => {
            let queue = queues.entry(args[0].clone()).or_default();
            let id = format!("D-{}-{:08}-05a1", &NODE_ID[..8], queue.len() + 1);
            queue.push_back((id.clone(), args[1].clone()));
            RespFrame::bulk(id)
        }
        "GETJOB" => {
            let from = args.iter().position(|a| a == "FROM").unwrap();
            let jobs: Vec<RespFrame> = args[from + 1..]
                .iter()
                .filter_map(|name| {
                    let (id, body) = queues.get_mut(name)?.pop_front()?;
                    Some(RespFrame::array(vec![RespFrame::bulk(name.clone()), RespFrame::bulk(id), RespFrame::bulk(body)]))
                })
                .collect();
            if jobs.is_empty() {
                RespFrame::Array(None)
            } else {
                RespFrame::array(jobs)
            }
        }
        "QLEN" => RespFrame::Integer(queues.get(&args[0]).map_or(0, VecDeque::len) as i64),
        "QSCAN" => {
            let mut names: Vec<String> = queues.keys().cloned().collect();
            names.sort();
            RespFrame::array(vec![
                RespFrame::bulk("0"),
                RespFrame::array(names.into_iter().map(RespFrame::bulk).collect()),
            ])
        }
        other => RespFrame::Error(format!("ERR unknown command '{}'", other)),
    }
}

/// Starts a fake node accepting any number of sequential connections.
fn start_fake_node() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let queues: Queues = Arc::default();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            while let Ok(frame) = RespCodec::decode_frame(&mut reader) {
                let reply = handle(port, &queues, &request_strings(frame));
                if writer.write_all(&RespCodec::encode_frame(&reply)).is_err() {
                    break;
                }
            }
        }
    });

    port
}

/// Runs the binary with a clean environment for the server settings.
fn disque(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_disque"))
        .args(args)
        .env_remove("DISQUE_SERVERS")
        .env_remove("DISQUE_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run disque")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "disque failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Argument Errors
// ============================================================================

#[test]
fn test_help_flag() {
    let output = disque(&["--help"]);

    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["push", "pull", "ack", "qlen", "qscan", "show", "hello", "info", "call"] {
        assert!(help.contains(subcommand), "help does not mention {}", subcommand);
    }
}

#[test]
fn test_missing_subcommand_fails() {
    let output = disque(&["-s", "127.0.0.1:7711"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_server_list_fails() {
    let output = disque(&["-s", ":7711", "qlen", "jobs"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No valid server address"));
}

#[test]
fn test_connection_refused_fails() {
    // Bind then drop to get a port nobody listens on
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let server = format!("127.0.0.1:{}", port);

    let output = disque(&["-s", &server, "--connect-timeout", "500", "qlen", "jobs"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

// ============================================================================
// Commands Against a Fake Node
// ============================================================================

#[test]
fn test_push_then_pull() {
    let server = format!("127.0.0.1:{}", start_fake_node());

    let pushed = stdout_json(&disque(&["-s", &server, "push", "emails", r#"{"to":"a@b.c"}"#, "--ttl", "60"]));
    let id = pushed.as_str().unwrap().to_string();
    assert!(id.starts_with("D-c0ffee00-"));

    assert_eq!(stdout_json(&disque(&["-s", &server, "qlen", "emails"])), json!(1));

    let pulled = stdout_json(&disque(&["-s", &server, "pull", "emails"]));
    assert_eq!(pulled, json!([{"queue": "emails", "id": id, "body": r#"{"to":"a@b.c"}"#}]));

    assert_eq!(stdout_json(&disque(&["-s", &server, "pull", "emails"])), json!([]));
}

#[test]
fn test_hello_prints_node_layout() {
    let port = start_fake_node();
    let server = format!("127.0.0.1:{}", port);

    let hello = stdout_json(&disque(&["-s", &server, "hello"]));

    assert_eq!(hello["id"], json!(NODE_ID));
    assert_eq!(hello["nodes"][0]["port"], json!(port));
}

#[test]
fn test_call_passes_json_arguments() {
    let server = format!("127.0.0.1:{}", start_fake_node());
    stdout_json(&disque(&["-s", &server, "push", "b", "x"]));
    stdout_json(&disque(&["-s", &server, "push", "a", "y"]));

    let page = stdout_json(&disque(&["-s", &server, "call", "qscan", "0", r#"{"count":10}"#]));

    assert_eq!(page, json!({"finished": true, "next_cursor": 0, "queues": ["a", "b"]}));
}

#[test]
fn test_password_from_environment() {
    let server = format!("127.0.0.1:{}", start_fake_node());

    let output = Command::new(env!("CARGO_BIN_EXE_disque"))
        .args(["qlen", "jobs"])
        .env("DISQUE_SERVERS", &server)
        .env("DISQUE_PASSWORD", "wrong")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid password"));
}

#[test]
fn test_broker_error_is_reported() {
    let server = format!("127.0.0.1:{}", start_fake_node());

    let output = disque(&["-s", &server, "info"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR unknown command 'INFO'"));
}
