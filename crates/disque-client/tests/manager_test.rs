//! Connection Manager Integration Tests
//!
//! These tests drive the manager against a scripted in-memory cluster and
//! verify:
//! - connection order, handshake caching and authentication
//! - failover to the remaining servers on transport errors
//! - that broker error replies are surfaced without failover
//! - node switching driven by GETJOB job counts

mod common;

use common::{job_frame, job_id_from, manager, Cluster, HOST};
use disque_client::{ManagerConfig, Server};
use disque_common::commands::{Command, GetJob, QLen};
use disque_common::transport::RespFrame;
use disque_common::{DisqueError, Reply};
use serde_json::json;

fn qlen(queue: &str) -> QLen {
    let mut command = QLen::new();
    command.set_arguments(vec![json!(queue)]).unwrap();
    command
}

fn get_job(queue: &str) -> GetJob {
    let mut command = GetJob::new();
    command.set_arguments(vec![json!(queue), json!({"nohang": true})]).unwrap();
    command
}

fn rebalancing(threshold: u64) -> ManagerConfig {
    ManagerConfig::default().with_minimum_jobs_to_change_node(threshold)
}

// ============================================================================
// Connecting
// ============================================================================

#[test]
fn test_connect_skips_unreachable_servers() {
    let cluster = Cluster::with_nodes(2);
    cluster.borrow_mut().node_mut(7001).reachable = false;
    let mut manager = manager(&cluster, &[7001, 7002], ManagerConfig::default());

    let info = manager.connect().unwrap();

    assert_eq!(info.id, cluster.borrow().node_id(7002));
    assert_eq!(info.nodes.len(), 2);
    assert!(manager.is_connected());
    assert_eq!(manager.current_server().map(|s| s.port), Some(7002));
    assert!(cluster.borrow().commands_on(7001).is_empty());
}

#[test]
fn test_connect_is_cached() {
    let cluster = Cluster::with_nodes(1);
    let mut manager = manager(&cluster, &[7001], ManagerConfig::default());

    let first = manager.connect().unwrap();
    let second = manager.connect().unwrap();

    assert_eq!(first, second);
    assert_eq!(cluster.borrow().commands_on(7001), vec!["HELLO"]);
}

#[test]
fn test_connect_fails_when_no_server_reachable() {
    let cluster = Cluster::with_nodes(2);
    for port in [7001, 7002] {
        cluster.borrow_mut().node_mut(port).reachable = false;
    }
    let mut manager = manager(&cluster, &[7001, 7002], ManagerConfig::default());

    let err = manager.connect().unwrap_err();

    assert!(matches!(err, DisqueError::Connection(_)), "unexpected error: {}", err);
    assert!(!manager.is_connected());
}

#[test]
fn test_connect_authenticates_before_handshake() {
    let cluster = Cluster::with_nodes(1);
    cluster.borrow_mut().node_mut(7001).password = Some("secret".to_string());
    let mut manager = manager(&cluster, &[], ManagerConfig::default());
    manager.add_server(Server::new(HOST, 7001).with_password("secret")).unwrap();

    manager.connect().unwrap();

    assert_eq!(cluster.borrow().commands_on(7001), vec!["AUTH", "HELLO"]);
    assert_eq!(cluster.borrow().last_args("AUTH"), Some(vec!["secret".to_string()]));
}

#[test]
fn test_wrong_password_is_authentication_error_and_stops() {
    let cluster = Cluster::with_nodes(2);
    cluster.borrow_mut().node_mut(7001).password = Some("secret".to_string());
    let mut manager = manager(&cluster, &[], ManagerConfig::default());
    manager.add_server(Server::new(HOST, 7001).with_password("wrong")).unwrap();
    manager.add_server(Server::new(HOST, 7002)).unwrap();

    let err = manager.connect().unwrap_err();

    assert!(matches!(err, DisqueError::Authentication(_)), "unexpected error: {}", err);
    assert!(cluster.borrow().commands_on(7002).is_empty());
    assert!(!manager.is_connected());
}

#[test]
fn test_missing_password_is_authentication_error() {
    let cluster = Cluster::with_nodes(1);
    cluster.borrow_mut().node_mut(7001).password = Some("secret".to_string());
    let mut manager = manager(&cluster, &[7001], ManagerConfig::default());

    let err = manager.connect().unwrap_err();

    assert!(matches!(err, DisqueError::Authentication(ref m) if m.starts_with("NOAUTH")));
}

#[test]
fn test_disconnect_forgets_active_node() {
    let cluster = Cluster::with_nodes(1);
    let mut manager = manager(&cluster, &[7001], ManagerConfig::default());
    manager.connect().unwrap();

    manager.disconnect();

    assert!(!manager.is_connected());
    assert!(manager.current_node().is_none());
}

// ============================================================================
// Executing and Failover
// ============================================================================

#[test]
fn test_execute_connects_lazily() {
    let cluster = Cluster::with_nodes(1);
    cluster.borrow_mut().queue_reply(7001, RespFrame::Integer(4));
    let mut manager = manager(&cluster, &[7001], ManagerConfig::default());

    let reply = manager.execute(&qlen("jobs")).unwrap();

    assert_eq!(reply, Reply::Integer(4));
    assert_eq!(cluster.borrow().commands_on(7001), vec!["HELLO", "QLEN"]);
    assert_eq!(cluster.borrow().last_args("QLEN"), Some(vec!["jobs".to_string()]));
}

#[test]
fn test_execute_fails_over_to_next_server() {
    let cluster = Cluster::with_nodes(2);
    cluster.borrow_mut().node_mut(7001).broken = true;
    cluster.borrow_mut().queue_reply(7002, RespFrame::Integer(3));
    let mut manager = manager(&cluster, &[7001, 7002], ManagerConfig::default());

    let reply = manager.execute(&qlen("jobs")).unwrap();

    assert_eq!(reply, Reply::Integer(3));
    assert_eq!(manager.current_server().map(|s| s.port), Some(7002));
    assert_eq!(cluster.borrow().commands_on(7001), vec!["HELLO", "QLEN"]);
    assert_eq!(cluster.borrow().commands_on(7002), vec!["HELLO", "QLEN"]);
}

#[test]
fn test_failover_wraps_around_to_earlier_servers() {
    let cluster = Cluster::with_nodes(3);
    cluster.borrow_mut().node_mut(7001).reachable = false;
    let mut manager = manager(&cluster, &[7001, 7002, 7003], ManagerConfig::default());
    manager.connect().unwrap();

    // 7002 breaks, 7003 is down too, 7001 came back
    {
        let mut cluster = cluster.borrow_mut();
        cluster.node_mut(7002).broken = true;
        cluster.node_mut(7003).reachable = false;
        cluster.node_mut(7001).reachable = true;
        cluster.queue_reply(7001, RespFrame::Integer(9));
    }

    let reply = manager.execute(&qlen("jobs")).unwrap();

    assert_eq!(reply, Reply::Integer(9));
    assert_eq!(manager.current_server().map(|s| s.port), Some(7001));
}

#[test]
fn test_execute_fails_after_trying_every_server_once() {
    let cluster = Cluster::with_nodes(2);
    for port in [7001, 7002] {
        cluster.borrow_mut().node_mut(port).broken = true;
    }
    let mut manager = manager(&cluster, &[7001, 7002], ManagerConfig::default());

    let err = manager.execute(&qlen("jobs")).unwrap_err();

    assert!(matches!(err, DisqueError::Connection(_)), "unexpected error: {}", err);
    let attempts = cluster.borrow().log.iter().filter(|(_, c, _)| c == "QLEN").count();
    assert_eq!(attempts, 2);
}

#[test]
fn test_server_error_reply_does_not_fail_over() {
    let cluster = Cluster::with_nodes(2);
    cluster
        .borrow_mut()
        .queue_reply(7001, RespFrame::Error("ERR wrong type".to_string()));
    let mut manager = manager(&cluster, &[7001, 7002], ManagerConfig::default());

    let err = manager.execute(&qlen("jobs")).unwrap_err();

    assert!(matches!(err, DisqueError::Server(ref m) if m == "ERR wrong type"));
    assert!(cluster.borrow().commands_on(7002).is_empty());
    assert!(manager.is_connected());
}

// ============================================================================
// Node Switching
// ============================================================================

/// Queues a GETJOB reply on `port` holding `count` jobs produced by `producer`.
fn queue_jobs(cluster: &common::SharedCluster, port: u16, producer: u16, count: u32) {
    let mut cluster = cluster.borrow_mut();
    let producer_id = cluster.node_id(producer);
    let jobs = (0..count)
        .map(|n| job_frame("jobs", &job_id_from(&producer_id, n), "{}"))
        .collect();
    cluster.queue_reply(port, RespFrame::array(jobs));
}

#[test]
fn test_switches_to_node_producing_most_jobs() {
    let cluster = Cluster::with_nodes(2);
    queue_jobs(&cluster, 7001, 7002, 1);
    queue_jobs(&cluster, 7001, 7002, 1);
    let mut manager = manager(&cluster, &[7001, 7002], rebalancing(2));

    manager.execute(&get_job("jobs")).unwrap();
    assert_eq!(manager.current_server().map(|s| s.port), Some(7001));
    let node_b = cluster.borrow().node_id(7002);
    assert!(manager.job_counts().contains(&(node_b.clone(), 1)));

    manager.execute(&get_job("jobs")).unwrap();
    assert_eq!(manager.current_server().map(|s| s.port), Some(7002));
    assert_eq!(manager.current_node().map(|n| n.id.clone()), Some(node_b));
    assert!(manager.job_counts().iter().all(|(_, jobs)| *jobs == 0));
}

#[test]
fn test_switches_to_unregistered_cluster_member() {
    let cluster = Cluster::with_nodes(2);
    queue_jobs(&cluster, 7001, 7002, 3);
    let mut manager = manager(&cluster, &[7001], rebalancing(3));

    manager.execute(&get_job("jobs")).unwrap();

    assert_eq!(manager.current_server().map(|s| s.port), Some(7002));
    assert_eq!(manager.servers().len(), 1);
}

#[test]
fn test_zero_threshold_never_switches() {
    let cluster = Cluster::with_nodes(2);
    queue_jobs(&cluster, 7001, 7002, 50);
    let mut manager = manager(&cluster, &[7001, 7002], rebalancing(0));

    manager.execute(&get_job("jobs")).unwrap();

    assert_eq!(manager.current_server().map(|s| s.port), Some(7001));
    assert!(manager.job_counts().iter().all(|(_, jobs)| *jobs == 0));
}

#[test]
fn test_jobs_from_current_node_reset_counters_without_switching() {
    let cluster = Cluster::with_nodes(2);
    queue_jobs(&cluster, 7001, 7001, 2);
    let mut manager = manager(&cluster, &[7001, 7002], rebalancing(2));

    manager.execute(&get_job("jobs")).unwrap();

    assert_eq!(manager.current_server().map(|s| s.port), Some(7001));
    assert!(manager.job_counts().iter().all(|(_, jobs)| *jobs == 0));
    assert!(cluster.borrow().commands_on(7002).is_empty());
}

#[test]
fn test_failed_switch_keeps_current_connection() {
    let cluster = Cluster::with_nodes(2);
    queue_jobs(&cluster, 7001, 7002, 2);
    cluster.borrow_mut().queue_reply(7001, RespFrame::Integer(1));
    let mut manager = manager(&cluster, &[7001, 7002], rebalancing(2));
    manager.connect().unwrap();
    cluster.borrow_mut().node_mut(7002).reachable = false;

    manager.execute(&get_job("jobs")).unwrap();

    assert_eq!(manager.current_server().map(|s| s.port), Some(7001));
    assert_eq!(manager.execute(&qlen("jobs")).unwrap(), Reply::Integer(1));
}

#[test]
fn test_empty_getjob_reply_counts_nothing() {
    let cluster = Cluster::with_nodes(2);
    cluster.borrow_mut().queue_reply(7001, RespFrame::Array(None));
    let mut manager = manager(&cluster, &[7001, 7002], rebalancing(1));

    assert_eq!(manager.execute(&get_job("jobs")).unwrap(), Reply::Nil);
    assert_eq!(manager.current_server().map(|s| s.port), Some(7001));
}
