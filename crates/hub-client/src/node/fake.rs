//! In-memory node used by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use hub_proto::{
    ChatCompletionRequest, ModuleDeployment, ModuleKind, NodeAddress, NodeUser, Run, RunInput,
    RunStatus, StorageRequest, StorageResult, UserInput,
};
use serde::Serialize;
use serde_json::{Value, json};

use super::{NodeTransport, route};
use crate::error::{ClientError, Result};

#[derive(Default)]
struct State {
    registered: bool,
    statuses: VecDeque<RunStatus>,
    last_status: Option<RunStatus>,
    calls: Vec<(String, Value)>,
    failing: Vec<String>,
    last_token: Option<String>,
    storage_reply: Option<StorageResult>,
}

/// Scripted node. Clones share state so tests can inspect calls afterwards.
#[derive(Clone)]
pub(crate) struct FakeTransport {
    address: NodeAddress,
    state: Arc<Mutex<State>>,
}

impl FakeTransport {
    pub(crate) fn new(address: NodeAddress) -> Self {
        Self {
            address,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub(crate) fn run_with(status: RunStatus) -> Run {
        serde_json::from_value(json!({
            "id": "run:1",
            "consumer_id": "user:abc",
            "status": status,
        }))
        .unwrap()
    }

    /// Status returned by the next run or check call.
    pub(crate) fn push_status(&self, status: RunStatus) {
        self.state.lock().unwrap().statuses.push_back(status);
    }

    pub(crate) fn set_registered(&self, registered: bool) {
        self.state.lock().unwrap().registered = registered;
    }

    pub(crate) fn set_storage_reply(&self, reply: StorageResult) {
        self.state.lock().unwrap().storage_reply = Some(reply);
    }

    /// Make every later call to `route` fail.
    pub(crate) fn fail_from(&self, route: &str) {
        self.state.lock().unwrap().failing.push(route.to_string());
    }

    pub(crate) fn calls_to(&self, route: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.iter().filter(|(r, _)| r == route).count()
    }

    pub(crate) fn routes(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.calls.iter().map(|(r, _)| r.clone()).collect()
    }

    pub(crate) fn last_body(&self, route: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .map(|(_, body)| body.clone())
    }

    pub(crate) fn last_token(&self) -> Option<String> {
        self.state.lock().unwrap().last_token.clone()
    }

    fn record(&self, route: &str, body: &impl Serialize, token: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push((route.to_string(), serde_json::to_value(body).unwrap()));
        state.last_token = token.map(str::to_string);
        if state.failing.iter().any(|r| r == route) {
            return Err(ClientError::transport(
                route,
                self.address.to_string(),
                "connection refused",
            ));
        }
        Ok(())
    }

    fn next_run(&self) -> Run {
        let mut state = self.state.lock().unwrap();
        let status = state
            .statuses
            .pop_front()
            .or(state.last_status)
            .unwrap_or(RunStatus::Created);
        state.last_status = Some(status);
        Self::run_with(status)
    }

    fn user(&self, public_key: &str) -> NodeUser {
        let registered = self.state.lock().unwrap().registered;
        NodeUser {
            id: registered.then(|| format!("user:{public_key}")),
            public_key: public_key.to_string(),
            is_registered: registered,
        }
    }
}

impl NodeTransport for FakeTransport {
    fn address(&self) -> &NodeAddress {
        &self.address
    }

    fn check_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>> {
        async move {
            self.record(route::CHECK_USER, input, token)?;
            Ok(self.user(&input.public_key))
        }
        .boxed()
    }

    fn register_user<'a>(
        &'a self,
        input: &'a UserInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NodeUser>> {
        async move {
            self.record(route::REGISTER_USER, input, token)?;
            self.set_registered(true);
            Ok(self.user(&input.public_key))
        }
        .boxed()
    }

    fn run<'a>(&'a self, input: &'a RunInput, token: Option<&'a str>) -> BoxFuture<'a, Result<Run>> {
        async move {
            self.record(&route::run(input.kind()), input, token)?;
            Ok(self.next_run())
        }
        .boxed()
    }

    fn check_run<'a>(
        &'a self,
        kind: ModuleKind,
        run: &'a Run,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>> {
        async move {
            self.record(&route::check_run(kind), run, token)?;
            Ok(self.next_run())
        }
        .boxed()
    }

    fn create_run<'a>(
        &'a self,
        input: &'a RunInput,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>> {
        async move {
            self.record(&route::create_run(input.kind()), input, token)?;
            Ok(Self::run_with(RunStatus::Created))
        }
        .boxed()
    }

    fn update_run<'a>(
        &'a self,
        kind: ModuleKind,
        run: &'a Run,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Run>> {
        async move {
            self.record(&route::update_run(kind), run, token)?;
            Ok(run.clone())
        }
        .boxed()
    }

    fn create_module<'a>(
        &'a self,
        deployment: &'a ModuleDeployment,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            self.record(&route::create_module(deployment.kind()), deployment, token)?;
            Ok(json!({"success": true}))
        }
        .boxed()
    }

    fn storage<'a>(
        &'a self,
        request: &'a StorageRequest,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StorageResult>> {
        async move {
            let body = request.body().cloned().unwrap_or(Value::Null);
            self.record(&route::storage(request), &body, token)?;
            let reply = self.state.lock().unwrap().storage_reply.clone();
            Ok(reply.unwrap_or_else(|| StorageResult::from_json(json!({"success": true}))))
        }
        .boxed()
    }

    fn inference<'a>(
        &'a self,
        request: &'a ChatCompletionRequest,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            self.record(route::INFERENCE, request, token)?;
            Ok(json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]}))
        }
        .boxed()
    }
}
