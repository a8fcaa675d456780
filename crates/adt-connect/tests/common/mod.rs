//! In-process stand-in for the language server
//!
//! Speaks the real framing and keeps logon sessions across sockets the way
//! the server does, so parking and restoring can be exercised end to end.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adt_connect::{ConnectionManager, MemoryWorkspace, SocketEstablisher, StaticCredentials};
use adt_core::process::BackendProcess;
use adt_core::store::MemoryStore;
use adt_core::{ConnectionData, TransportError};
use adt_protocol::{
    Authentication, Connect, ConnectParams, ConnectResult, ConnectionParams, Expand, ExpandParams,
    ExpandResult, FilesystemNode, FrameCodec, Message, Method, NodeId, ReadSource,
    ReadSourceParams, ReadSourceResult, Request, Response, ResponseError,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

#[derive(Default)]
pub struct ServerState {
    sessions: Mutex<HashSet<String>>,
    refused: Mutex<HashSet<String>>,
    tree: Mutex<HashMap<NodeId, Vec<FilesystemNode>>>,
    sources: Mutex<HashMap<NodeId, String>>,
    connect_delay: Mutex<Duration>,
    pub connect_calls: AtomicUsize,
    pub expand_calls: AtomicUsize,
    pub source_calls: AtomicUsize,
}

pub struct FakeServer {
    pub address: String,
    pub state: Arc<ServerState>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let state = Arc::new(ServerState::default());
        let tasks = Arc::new(Mutex::new(Vec::new()));

        let accept_state = Arc::clone(&state);
        let accept_tasks = Arc::clone(&tasks);
        let accept = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handle = tokio::spawn(serve(stream, Arc::clone(&accept_state)));
                accept_tasks.lock().unwrap().push(handle);
            }
        });
        tasks.lock().unwrap().push(accept);

        Self {
            address,
            state,
            tasks,
        }
    }

    /// Stop listening and drop every client socket
    pub async fn shutdown(&self) {
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Forget all logon sessions, as if they timed out
    pub fn expire_sessions(&self) {
        self.state.sessions.lock().unwrap().clear();
    }

    pub fn has_session(&self, system_id: &str) -> bool {
        self.state.sessions.lock().unwrap().contains(system_id)
    }

    pub fn refuse_logon(&self, system_id: &str) {
        self.state
            .refused
            .lock()
            .unwrap()
            .insert(system_id.to_string());
    }

    pub fn accept_logon(&self, system_id: &str) {
        self.state.refused.lock().unwrap().remove(system_id);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock().unwrap() = delay;
    }

    pub fn set_children(&self, id: NodeId, children: Vec<FilesystemNode>) {
        self.state.tree.lock().unwrap().insert(id, children);
    }

    pub fn set_source(&self, id: NodeId, content: &str) {
        self.state
            .sources
            .lock()
            .unwrap()
            .insert(id, content.to_string());
    }

    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn expand_calls(&self) -> usize {
        self.state.expand_calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

async fn serve(stream: TcpStream, state: Arc<ServerState>) {
    let mut framed = Framed::new(stream, FrameCodec::new());
    while let Some(Ok(frame)) = framed.next().await {
        let Ok(Message::Request(request)) = frame.parse() else {
            continue;
        };
        let response = answer(&state, request).await;
        if framed.send(Message::from(response)).await.is_err() {
            break;
        }
    }
}

async fn answer(state: &ServerState, request: Request) -> Response {
    let id = request.id.clone();
    let result = match request.method.as_str() {
        Connect::NAME => connect(state, request.params).await,
        Expand::NAME => expand(state, request.params),
        ReadSource::NAME => source(state, request.params),
        other => Err(ResponseError::method_not_found(other)),
    };
    match result {
        Ok(value) => Response::success(id, value),
        Err(error) => Response::failure(Some(id), error),
    }
}

fn invalid(e: serde_json::Error) -> ResponseError {
    ResponseError::new(ResponseError::INVALID_PARAMS, e.to_string())
}

async fn connect(state: &ServerState, params: Value) -> Result<Value, ResponseError> {
    let params: ConnectParams = serde_json::from_value(params).map_err(invalid)?;
    state.connect_calls.fetch_add(1, Ordering::SeqCst);

    let delay = *state.connect_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let system = params.system_id.clone();
    if state.refused.lock().unwrap().contains(&system) {
        return Err(ResponseError::new(
            ResponseError::INTERNAL_ERROR,
            format!("Logon to {} failed: Name or password is incorrect", system),
        ));
    }

    let mut sessions = state.sessions.lock().unwrap();
    let result = if params.restore {
        if !sessions.contains(&system) {
            return Err(ResponseError::new(
                ResponseError::INTERNAL_ERROR,
                format!("No session for {} to restore", system),
            ));
        }
        ConnectResult::Restored
    } else if sessions.insert(system) {
        ConnectResult::Created
    } else {
        ConnectResult::AlreadyConnected
    };
    Ok(serde_json::to_value(result).unwrap())
}

fn expand(state: &ServerState, params: Value) -> Result<Value, ResponseError> {
    let params: ExpandParams = serde_json::from_value(params).map_err(invalid)?;
    state.expand_calls.fetch_add(1, Ordering::SeqCst);
    let children = state
        .tree
        .lock()
        .unwrap()
        .get(&params.id)
        .cloned()
        .unwrap_or_default();
    Ok(serde_json::to_value(ExpandResult { children }).unwrap())
}

fn source(state: &ServerState, params: Value) -> Result<Value, ResponseError> {
    let params: ReadSourceParams = serde_json::from_value(params).map_err(invalid)?;
    state.source_calls.fetch_add(1, Ordering::SeqCst);
    match state.sources.lock().unwrap().get(&params.id) {
        Some(content) => Ok(serde_json::to_value(ReadSourceResult {
            content: content.clone(),
        })
        .unwrap()),
        None => Err(ResponseError::new(
            ResponseError::INTERNAL_ERROR,
            format!("Node {} has no source", params.id),
        )),
    }
}

/// Backend whose process liveness is scripted
pub struct StubBackend {
    pub running: AtomicBool,
    pub spawns: AtomicUsize,
}

impl StubBackend {
    pub fn new(running: bool) -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(running),
            spawns: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl BackendProcess for StubBackend {
    fn executable(&self) -> &Path {
        Path::new("abap-ls")
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_detached(&self) -> Result<(), TransportError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub server: FakeServer,
    pub backend: Arc<StubBackend>,
    pub store: Arc<MemoryStore>,
    pub workspace: Arc<MemoryWorkspace>,
    pub manager: Arc<ConnectionManager>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::with_workspace(MemoryWorkspace::new()).await
    }

    pub async fn with_workspace(workspace: MemoryWorkspace) -> Self {
        let server = FakeServer::start().await;
        let backend = StubBackend::new(true);
        let store = Arc::new(MemoryStore::new());
        let workspace = Arc::new(workspace);
        let manager = Arc::new(build_manager(&server, &backend, &store, &workspace));

        Self {
            server,
            backend,
            store,
            workspace,
            manager,
        }
    }

    /// A fresh manager over the same server and state, like a host restart
    pub fn restart(&self) -> Arc<ConnectionManager> {
        Arc::new(build_manager(
            &self.server,
            &self.backend,
            &self.store,
            &self.workspace,
        ))
    }
}

fn build_manager(
    server: &FakeServer,
    backend: &Arc<StubBackend>,
    store: &Arc<MemoryStore>,
    workspace: &Arc<MemoryWorkspace>,
) -> ConnectionManager {
    let establisher = SocketEstablisher::new(server.address.clone(), backend.clone())
        .with_settle_interval(Duration::from_millis(10));
    ConnectionManager::new(
        establisher,
        store.clone(),
        workspace.clone(),
        Arc::new(StaticCredentials(Authentication::password(
            "DEVELOPER",
            "Down1oad",
        ))),
    )
    .unwrap()
    .with_test_timeout(Duration::from_millis(500))
}

pub fn http_connection(name: &str, system_id: &str) -> ConnectionData {
    ConnectionData::new(name, system_id, ConnectionParams::default_http())
        .with_description(format!("{} test system", system_id))
}
