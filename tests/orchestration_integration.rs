//! Integration tests for the orchestration topologies
//!
//! Each topology is exercised end to end with small closure-built agents.

use agent_primitives::agents::{AgentError, AgentHandle, FnAgent, Payload};
use agent_primitives::orchestration::{
    CentralizedOrchestrator, DecentralizedOrchestrator, HierarchicalOrchestrator, HierarchicalOutput,
    HierarchyLevel, SwarmOrchestrator,
};
use serde_json::json;

fn echo(name: &str) -> AgentHandle {
    FnAgent::new(name).into_handle()
}

fn uppercase(name: &str) -> AgentHandle {
    FnAgent::new(name)
        .on_act(|v| Ok(json!(v.as_str().unwrap_or_default().to_uppercase())))
        .into_handle()
}

#[tokio::test]
async fn hierarchical_subordinate_receives_root_output() {
    let mut hierarchy = HierarchicalOrchestrator::new(echo("R"));
    hierarchy.add_subordinate("R", uppercase("S"));

    let out = hierarchy.execute(json!("go")).await.unwrap();

    assert_eq!(
        out.clone().into_payload(),
        json!({"root_result": "go", "subordinate_results": ["GO"]})
    );
    assert!(matches!(out, HierarchicalOutput::Delegated { .. }));

    let trace = hierarchy.get_trace();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0].level, HierarchyLevel::Root);
    assert_eq!(trace[0].agent, "R");
    assert_eq!(trace[1].agent, "S");
    assert_eq!(trace[1].task, json!("go"));
}

#[tokio::test]
async fn hierarchical_subordinate_failure_aborts() {
    let failing = FnAgent::new("S2")
        .on_act(|_| Err(AgentError::TaskExecutionFailed("subtask failed".to_string())))
        .into_handle();
    let mut hierarchy = HierarchicalOrchestrator::new(echo("R"));
    hierarchy.add_subordinate("R", uppercase("S1"));
    hierarchy.add_subordinate("R", failing);

    let err = hierarchy.execute(json!("go")).await.unwrap_err();

    assert!(matches!(err, AgentError::TaskExecutionFailed(_)));
    assert_eq!(hierarchy.get_trace().len(), 3);
}

#[tokio::test]
async fn decentralized_connections_are_symmetric() {
    let mut net = DecentralizedOrchestrator::new();
    for name in ["A", "B", "C"] {
        net.register_agent(name, echo(name));
    }
    net.connect("A", "B");

    let reply = net.send_message("B", "A", json!("ping")).await.unwrap();
    assert_eq!(reply, json!("ping"));

    let err = net.send_message("A", "C", json!("x")).await.unwrap_err();
    assert!(err.is_topology_error());
    assert!(matches!(err, AgentError::NotConnected { .. }));

    let metrics = net.get_network_metrics();
    assert_eq!(metrics.total_messages, 1);
    assert_eq!(metrics.total_connections, 1);
    assert_eq!(metrics.network_topology["A"], vec!["B"]);
    assert_eq!(metrics.network_topology["C"], Vec::<String>::new());
}

#[tokio::test]
async fn decentralized_broadcast_reaches_every_peer() {
    let mut net = DecentralizedOrchestrator::new();
    let hub = echo("hub");
    let left = uppercase("left");
    let right = uppercase("right");
    net.register_agent("hub", hub);
    net.register_agent("left", left.clone());
    net.register_agent("right", right.clone());
    net.connect("hub", "left");
    net.connect("hub", "right");

    let results = net.broadcast("hub", json!("news")).await.unwrap();

    assert_eq!(results, vec![json!("NEWS"), json!("NEWS")]);
    assert_eq!(left.get_metrics().await.total_requests, 1);
    assert_eq!(right.get_metrics().await.total_requests, 1);
    let log = net.get_message_log();
    assert_eq!(log.iter().map(|m| m.to.as_str()).collect::<Vec<_>>(), vec!["left", "right"]);
}

#[tokio::test]
async fn centralized_routes_by_rule() {
    let mut central = CentralizedOrchestrator::new("support");
    central.register_agent("frontdesk", echo("frontdesk"));
    central.register_agent("escalations", uppercase("EscalationAgent"));
    central.register_routing_rule("urgency", |task: &Payload| {
        if task.as_str().is_some_and(|t| t.starts_with("urgent")) {
            "escalations".to_string()
        } else {
            "frontdesk".to_string()
        }
    });

    let urgent = central.execute(json!("urgent: outage"), Some("urgency")).await.unwrap();
    let routine = central.execute(json!("password reset"), Some("urgency")).await.unwrap();
    let fallback = central.execute(json!("hi"), None).await.unwrap();

    assert_eq!(urgent, json!("URGENT: OUTAGE"));
    assert_eq!(routine, json!("password reset"));
    assert_eq!(fallback, json!("hi"));

    let metrics = central.get_metrics();
    assert_eq!(metrics.total_executions, 3);
    assert_eq!(metrics.agents, vec!["frontdesk", "escalations"]);
    let assigned: Vec<String> = central
        .get_execution_log()
        .into_iter()
        .map(|r| r.assigned_to)
        .collect();
    assert_eq!(assigned, vec!["escalations", "frontdesk", "frontdesk"]);
}

#[tokio::test]
async fn swarm_converges_on_shared_target() {
    let voter = |name: &str, vote: i64| {
        FnAgent::new(name)
            .on_act(move |envelope| {
                let target = envelope["shared_state"]["target"].as_i64().unwrap_or_default();
                Ok(json!(vote == target))
            })
            .into_handle()
    };
    let mut swarm = SwarmOrchestrator::new("voters");
    swarm.add_agent(voter("a", 3));
    swarm.add_agent(voter("b", 3));
    swarm.add_agent(
        FnAgent::new("flaky")
            .on_act(|_| Err(AgentError::TaskExecutionFailed("no vote".to_string())))
            .into_handle(),
    );
    swarm.update_shared_state("target", json!(3));

    let all_agree = |results: &[Option<Payload>]| {
        results
            .iter()
            .flatten()
            .all(|r| r == &json!(true))
    };
    let rounds = swarm.execute_swarm(json!("vote"), Some(5), Some(&all_agree)).await;

    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0], vec![Some(json!(true)), Some(json!(true)), None]);

    let metrics = swarm.get_swarm_metrics();
    assert_eq!(metrics.swarm_size, 3);
    assert_eq!(metrics.rounds_executed, 1);
    assert_eq!(metrics.shared_state_size, 1);
}

#[tokio::test]
async fn agents_can_join_several_topologies() {
    let worker = uppercase("worker");
    let mut central = CentralizedOrchestrator::default();
    central.register_agent("worker", worker.clone());
    let mut swarm = SwarmOrchestrator::default();
    swarm.add_agent(worker.clone());

    central.execute(json!("a"), None).await.unwrap();
    swarm.execute_round(json!("b")).await;

    let metrics = worker.get_metrics().await;
    assert_eq!(metrics.total_requests, 2);
    assert_eq!(metrics.successful_requests, 2);
}
