//! In-memory pipeline API used by the unit tests
//!
//! Holds a single pipeline, records every call, and lets a test script how
//! the remote side reacts to start/stop commands and which calls fail.

use async_trait::async_trait;
use conduit_client::{ClientError, PipelineApi, PipelineSnapshot, PipelineSpec, Result};
use conduit_core::dto::pipeline::ServiceAccountRef;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::connect::{ConnectError, Connector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create,
    Get(String),
    Update(String),
    Delete(String),
    Start(String),
    Stop(String),
}

/// How the remote side reacts once a start or stop is accepted
#[derive(Debug, Clone)]
pub enum Transition {
    /// Serve `via` states on successive polls, then settle on the last one
    Settle(Vec<&'static str>),
    /// The state never changes
    Stuck,
}

#[derive(Debug)]
struct FakeState {
    pipeline: Option<PipelineSnapshot>,
    pending: VecDeque<&'static str>,
    create_state: &'static str,
    on_start: Transition,
    on_stop: Transition,
    create_status: Option<u16>,
    get_status: Option<u16>,
    /// Fail only gets issued after this many successful ones
    get_fails_after: usize,
    gets_served: usize,
    update_status: Option<u16>,
    delete_status: Option<u16>,
    start_status: Option<u16>,
    stop_status: Option<u16>,
    calls: Vec<Call>,
}

#[derive(Debug)]
pub struct FakePipelineApi {
    state: Mutex<FakeState>,
}

impl FakePipelineApi {
    /// A remote side with no pipeline yet; creation yields `create_state`
    pub fn new(create_state: &'static str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                pipeline: None,
                pending: VecDeque::new(),
                create_state,
                on_start: Transition::Settle(vec!["STATE_STARTING", "STATE_RUNNING"]),
                on_stop: Transition::Settle(vec!["STATE_STOPPING", "STATE_STOPPED"]),
                create_status: None,
                get_status: None,
                get_fails_after: 0,
                gets_served: 0,
                update_status: None,
                delete_status: None,
                start_status: None,
                stop_status: None,
                calls: Vec::new(),
            }),
        }
    }

    /// A remote side already holding pipeline `p-1` in `state`
    pub fn existing(state: &'static str) -> Self {
        let api = Self::new(state);
        api.with(|s| {
            s.pipeline = Some(snapshot("p-1", state));
        });
        api
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn on_start(self, transition: Transition) -> Self {
        self.with(|s| s.on_start = transition);
        self
    }

    pub fn on_stop(self, transition: Transition) -> Self {
        self.with(|s| s.on_stop = transition);
        self
    }

    pub fn fail_create(self, status: u16) -> Self {
        self.with(|s| s.create_status = Some(status));
        self
    }

    pub fn fail_get(self, status: u16) -> Self {
        self.with(|s| s.get_status = Some(status));
        self
    }

    /// Let `successes` gets through before every further get fails
    pub fn fail_get_after(self, successes: usize, status: u16) -> Self {
        self.with(|s| {
            s.get_status = Some(status);
            s.get_fails_after = successes;
        });
        self
    }

    pub fn fail_update(self, status: u16) -> Self {
        self.with(|s| s.update_status = Some(status));
        self
    }

    pub fn fail_delete(self, status: u16) -> Self {
        self.with(|s| s.delete_status = Some(status));
        self
    }

    pub fn fail_start(self, status: u16) -> Self {
        self.with(|s| s.start_status = Some(status));
        self
    }

    pub fn fail_stop(self, status: u16) -> Self {
        self.with(|s| s.stop_status = Some(status));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.with(|s| s.calls.iter().filter(|c| matcher(c)).count())
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.with(|s| s.calls.iter().position(|c| c == call))
    }

    pub fn current_state(&self) -> Option<String> {
        self.with(|s| s.pipeline.as_ref().map(|p| p.state.clone()))
    }
}

pub fn snapshot(id: &str, state: &str) -> PipelineSnapshot {
    PipelineSnapshot {
        id: id.to_string(),
        display_name: "ingest".to_string(),
        description: "ingest events".to_string(),
        config_yaml: "input: {}".to_string(),
        state: state.to_string(),
        url: format!("https://{}.example.com", id),
        ..Default::default()
    }
}

fn error(status: u16) -> ClientError {
    ClientError::api_error(status, format!("injected failure ({})", status))
}

fn not_found(id: &str) -> ClientError {
    ClientError::NotFound(format!("pipeline {}", id))
}

impl FakeState {
    fn begin(&mut self, transition: Transition) {
        match transition {
            Transition::Settle(states) => self.pending = states.into_iter().collect(),
            Transition::Stuck => self.pending.clear(),
        }
    }
}

#[async_trait]
impl PipelineApi for FakePipelineApi {
    async fn create_pipeline(&self, spec: PipelineSpec) -> Result<PipelineSnapshot> {
        self.with(|s| {
            s.calls.push(Call::Create);
            if let Some(status) = s.create_status {
                return Err(error(status));
            }
            let mut created = snapshot("p-1", s.create_state);
            created.display_name = spec.display_name;
            created.description = spec.description;
            created.config_yaml = spec.config_yaml;
            created.resources = spec.resources;
            created.service_account = spec.service_account.map(|sa| ServiceAccountRef {
                client_id: sa.client_id,
            });
            created.tags = spec.tags;
            s.pipeline = Some(created.clone());
            Ok(created)
        })
    }

    async fn get_pipeline(&self, id: &str) -> Result<PipelineSnapshot> {
        self.with(|s| {
            s.calls.push(Call::Get(id.to_string()));
            if let Some(status) = s.get_status {
                if s.gets_served >= s.get_fails_after {
                    return Err(error(status));
                }
            }
            s.gets_served += 1;
            let next = s.pending.pop_front();
            match s.pipeline.as_mut() {
                Some(pipeline) if pipeline.id == id => {
                    if let Some(state) = next {
                        pipeline.state = state.to_string();
                    }
                    Ok(pipeline.clone())
                }
                _ => Err(not_found(id)),
            }
        })
    }

    async fn update_pipeline(&self, id: &str, spec: PipelineSpec) -> Result<PipelineSnapshot> {
        self.with(|s| {
            s.calls.push(Call::Update(id.to_string()));
            if let Some(status) = s.update_status {
                return Err(error(status));
            }
            match s.pipeline.as_mut() {
                Some(pipeline) if pipeline.id == id => {
                    pipeline.display_name = spec.display_name;
                    pipeline.description = spec.description;
                    pipeline.config_yaml = spec.config_yaml;
                    pipeline.tags = spec.tags;
                    Ok(pipeline.clone())
                }
                _ => Err(not_found(id)),
            }
        })
    }

    async fn delete_pipeline(&self, id: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::Delete(id.to_string()));
            if let Some(status) = s.delete_status {
                return Err(error(status));
            }
            match s.pipeline.take() {
                Some(pipeline) if pipeline.id == id => Ok(()),
                other => {
                    s.pipeline = other;
                    Err(not_found(id))
                }
            }
        })
    }

    async fn start_pipeline(&self, id: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::Start(id.to_string()));
            if let Some(status) = s.start_status {
                return Err(error(status));
            }
            let transition = s.on_start.clone();
            s.begin(transition);
            Ok(())
        })
    }

    async fn stop_pipeline(&self, id: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::Stop(id.to_string()));
            if let Some(status) = s.stop_status {
                return Err(error(status));
            }
            let transition = s.on_stop.clone();
            s.begin(transition);
            Ok(())
        })
    }
}

/// Hands out handles to one shared [`FakePipelineApi`] and tracks how many
/// are still open
#[derive(Clone)]
pub struct FakeConnector {
    pub api: Arc<FakePipelineApi>,
    pub endpoints: Arc<Mutex<Vec<String>>>,
    open: Arc<AtomicUsize>,
    refuse: bool,
}

impl FakeConnector {
    pub fn new(api: FakePipelineApi) -> Self {
        Self {
            api: Arc::new(api),
            endpoints: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicUsize::new(0)),
            refuse: false,
        }
    }

    /// A connector whose every connection attempt fails
    pub fn refusing(api: FakePipelineApi) -> Self {
        Self {
            refuse: true,
            ..Self::new(api)
        }
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn connections_made(&self) -> usize {
        self.endpoints.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, endpoint: &str) -> std::result::Result<Box<dyn PipelineApi>, ConnectError> {
        self.endpoints.lock().unwrap().push(endpoint.to_string());
        if self.refuse {
            return Err(ConnectError::InvalidEndpoint(endpoint.to_string()));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            api: Arc::clone(&self.api),
            open: Arc::clone(&self.open),
        }))
    }
}

struct FakeHandle {
    api: Arc<FakePipelineApi>,
    open: Arc<AtomicUsize>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PipelineApi for FakeHandle {
    async fn create_pipeline(&self, spec: PipelineSpec) -> Result<PipelineSnapshot> {
        self.api.create_pipeline(spec).await
    }

    async fn get_pipeline(&self, id: &str) -> Result<PipelineSnapshot> {
        self.api.get_pipeline(id).await
    }

    async fn update_pipeline(&self, id: &str, spec: PipelineSpec) -> Result<PipelineSnapshot> {
        self.api.update_pipeline(id, spec).await
    }

    async fn delete_pipeline(&self, id: &str) -> Result<()> {
        self.api.delete_pipeline(id).await
    }

    async fn start_pipeline(&self, id: &str) -> Result<()> {
        self.api.start_pipeline(id).await
    }

    async fn stop_pipeline(&self, id: &str) -> Result<()> {
        self.api.stop_pipeline(id).await
    }
}
