//! Both node transports against real local servers.

mod common;

use common::{FAST_POLL, FILE_CONTENTS, NodeState, TestServer, start_http_node, start_relay};
use hub_client::{
    ConsumerKey, Dispatcher, ErrorKind, NodeClient, PollPolicy, RunRequest, StorageProvider,
    SubNodes,
};
use hub_proto::{
    AgentDeployment, ChatCompletionRequest, Deployment, ModuleDeployment, ModuleKind, NodeAddress, RunInput,
    RunStatus, StorageOptions, StorageRequest, StorageType, UserInput,
};
use serde_json::json;

const NODE_ID: &str = "node-1";

struct Pair {
    _http: TestServer,
    _relay: TestServer,
    http: NodeClient,
    relay: NodeClient,
}

async fn pair() -> Pair {
    let http_server = start_http_node(NodeState::default()).await;
    let relay_server = start_relay(NodeState::default(), NODE_ID).await;

    let http = NodeClient::from_parts(Some(&http_server.http_url()), None, None).unwrap();
    let relay = NodeClient::from_parts(None, Some(NODE_ID), Some(&relay_server.ws_url())).unwrap();
    assert!(http.address().is_direct());
    assert!(!relay.address().is_direct());

    Pair {
        _http: http_server,
        _relay: relay_server,
        http,
        relay,
    }
}

fn policy() -> PollPolicy {
    PollPolicy {
        interval: FAST_POLL,
        timeout: Some(std::time::Duration::from_secs(10)),
    }
}

#[tokio::test]
async fn user_registration_matches_across_transports() {
    let pair = pair().await;
    let input = UserInput {
        public_key: "abcd".into(),
    };

    for client in [&pair.http, &pair.relay] {
        let before = client.check_user(&input).await.unwrap();
        assert!(!before.is_registered);

        let registered = client.register_user(&input).await.unwrap();
        assert_eq!(registered.consumer_id(), Some("user:abcd"));

        let after = client.check_user(&input).await.unwrap();
        assert!(after.is_registered);
    }

    assert_eq!(
        pair.http.check_user(&input).await.unwrap(),
        pair.relay.check_user(&input).await.unwrap()
    );
}

#[tokio::test]
async fn run_and_poll_matches_across_transports() {
    let pair = pair().await;
    let mut runs = Vec::new();

    for client in [&pair.http, &pair.relay] {
        let deployment = ModuleDeployment::Tool(Deployment::named("summarizer", client.address().clone()));
        let input = RunInput::new("user:abcd", Some(json!({"text": "hi"})), deployment, "sig");
        let run = client.run_and_poll(&input, policy()).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.results, vec![json!("done: summarizer")]);
        runs.push((run.id, run.status, run.results));
    }

    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn create_and_update_run_match_across_transports() {
    let pair = pair().await;
    let mut runs = Vec::new();

    for client in [&pair.http, &pair.relay] {
        let deployment = ModuleDeployment::Agent(AgentDeployment::new(Deployment::named(
            "hello_world",
            client.address().clone(),
        )));
        let input = RunInput::new("user:abcd", Some(json!({"name": "bob"})), deployment, "sig");

        let mut run = client.create_run(&input).await.unwrap();
        assert_eq!(run.status, RunStatus::Created);
        assert_eq!(run.id.as_deref(), Some("agent_run:1"));

        run.status = RunStatus::Completed;
        run.results = vec![json!("hello bob")];
        let updated = client.update_run(ModuleKind::Agent, &run).await.unwrap();
        assert_eq!(updated.status, RunStatus::Completed);
        assert_eq!(updated.results, run.results);

        runs.push((updated.id, updated.consumer_id, updated.inputs, updated.status, updated.results));
    }

    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn update_of_unknown_run_is_not_found() {
    let pair = pair().await;
    let deployment = ModuleDeployment::Tool(Deployment::named("summarizer", pair.http.address().clone()));
    let input = RunInput::new("user:abcd", None, deployment, "sig");
    let mut run = pair.http.create_run(&input).await.unwrap();
    run.id = Some("tool_run:999".into());

    for client in [&pair.http, &pair.relay] {
        let err = client.update_run(ModuleKind::Tool, &run).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn dispatcher_runs_over_the_relay() {
    let pair = pair().await;
    let key = ConsumerKey::from_bytes(&[3u8; 32]);
    let dispatcher = Dispatcher::new(&pair.relay, &key).with_policy(policy());

    let run = dispatcher
        .run(&RunRequest {
            module: "orchestrator:debate".into(),
            inputs: Some(json!({"topic": "tabs"})),
            sub_nodes: SubNodes {
                agents: vec![
                    NodeAddress::from_url("localhost:7002").unwrap(),
                    NodeAddress::from_url("localhost:7003").unwrap(),
                ],
                ..SubNodes::default()
            },
            personas: Vec::new(),
        })
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let agents = run.deployment["agent_deployments"].as_array().unwrap();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[1]["node"]["url"], "http://localhost:7003");
    assert_eq!(run.consumer_id, format!("user:{}", key.public_key_hex()));
}

#[tokio::test]
async fn access_token_reaches_the_node() {
    let state = NodeState::default();
    let server = start_http_node(state.clone()).await;
    let mut client = NodeClient::from_parts(Some(&server.http_url()), None, None).unwrap();
    client.set_access_token("session-token");

    let deployment = ModuleDeployment::Memory(Deployment::named("notes", client.address().clone()));
    let input = RunInput::new("user:abcd", None, deployment, "sig");
    client.run(&input).await.unwrap();

    assert_eq!(state.run_tokens(), vec![Some("session-token".to_string())]);
}

#[tokio::test]
async fn unknown_run_is_not_found_on_both_transports() {
    let pair = pair().await;
    let stale = serde_json::from_value(json!({"id": "tool_run:99", "status": "running"})).unwrap();

    for client in [&pair.http, &pair.relay] {
        let err = client.check_run(ModuleKind::Tool, &stale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn unreachable_node_is_a_transport_error() {
    let port = common::closed_port().await;
    let input = UserInput {
        public_key: "abcd".into(),
    };

    let http = NodeClient::from_parts(Some(&format!("127.0.0.1:{port}")), None, None).unwrap();
    let err = http.check_user(&input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("check-user"));

    let relay = NodeClient::from_parts(None, Some(NODE_ID), Some(&format!("ws://127.0.0.1:{port}"))).unwrap();
    let err = relay.check_user(&input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn relay_reports_unknown_target_node() {
    let server = start_relay(NodeState::default(), NODE_ID).await;
    let client = NodeClient::from_parts(None, Some("other-node"), Some(&server.ws_url())).unwrap();

    let err = client
        .check_user(&UserInput {
            public_key: "abcd".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("unknown node"));
}

#[tokio::test]
async fn file_reads_are_saved_identically() {
    let pair = pair().await;
    let request = StorageRequest::Read {
        storage_type: StorageType::Filesystem,
        path: "runs/1/output.bin".into(),
        options: StorageOptions::new(),
    };

    for client in [&pair.http, &pair.relay] {
        let dir = tempfile::tempdir().unwrap();
        let provider = StorageProvider::with_output_dir(client, dir.path());
        let outcome = provider.execute(&request).await.unwrap();

        assert_eq!(outcome.result.bytes(), Some(FILE_CONTENTS));
        let saved = outcome.saved_to.unwrap();
        assert_eq!(saved, dir.path().join("output.bin"));
        assert_eq!(std::fs::read(saved).unwrap(), FILE_CONTENTS);
    }
}

#[tokio::test]
async fn database_create_round_trips_envelope() {
    let pair = pair().await;
    let request = StorageRequest::Create {
        storage_type: StorageType::Database,
        path: "notes".into(),
        content: hub_proto::CreateContent::Data(json!({"title": "a"})),
        options: StorageOptions::new(),
    };

    let via_http = pair.http.storage(&request).await.unwrap();
    let via_relay = pair.relay.storage(&request).await.unwrap();

    assert!(via_http.success);
    assert_eq!(via_http.message.as_deref(), Some("create ok"));
    assert_eq!(via_http, via_relay);
}

#[tokio::test]
async fn inference_matches_across_transports() {
    let pair = pair().await;
    let request = ChatCompletionRequest::prompt("phi3:mini", "hello");

    let via_http = pair.http.inference(&request).await.unwrap();
    let via_relay = pair.relay.inference(&request).await.unwrap();

    assert_eq!(
        hub_proto::inference::first_choice_content(&via_http),
        Some("echo: hello")
    );
    assert_eq!(via_http, via_relay);
}
