//! Connection manager
//!
//! Owns the catalog of declared systems and the set of active connections.
//!
//! # Exclusivity
//!
//! Each system has at most one slot in the active set. A slot is reserved
//! (`Slot::Connecting`) before any I/O happens and replaced by the
//! connection once the logon succeeded, so a second `connect` or `restore`
//! for the same system is rejected instead of racing the first. Different
//! systems never wait on each other.
//!
//! # Hangups
//!
//! Every active connection is watched. When the language server closes the
//! socket the slot is released, the parked set rewritten and `Disconnected`
//! published, exactly as for an explicit `disconnect`.
//!
//! # Parking
//!
//! When the host shuts down it parks its connections: the ids of all
//! active systems are written to the parked set and the sockets are closed
//! without logging off, leaving the sessions alive inside the language
//! server. On the next start `restore_workspace_connections` reattaches to
//! whatever sessions survived. While parking, new reservations are refused
//! and the ones already taken are waited for.

use std::sync::Arc;
use std::time::Duration;

use adt_core::store::StateStore;
use adt_core::{
    ConnectionData, ConnectionError, ConnectionTestResult, LinkState, StoreError, SystemId,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::{broadcast, watch, RwLock};

use crate::connection::{Connection, ConnectionState};
use crate::credentials::CredentialProvider;
use crate::event::{ConnectionEvent, ConnectionEventKind};
use crate::transport::SocketEstablisher;
use crate::workspace::{Workspace, WorkspaceFolder};

/// Result of restoring parked connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreReport {
    /// Nothing was parked
    NothingParked,
    /// The language server process is gone, and with it every session
    ServerNotRunning { parked: Vec<SystemId> },
    Completed {
        restored: Vec<SystemId>,
        failed: Vec<SystemId>,
    },
}

enum Slot {
    Connecting,
    Active(Arc<Connection>),
}

#[derive(Debug, Default)]
struct Gate {
    parking: bool,
    in_flight: usize,
}

/// Catalog, active set and event channel, shared with the hangup watchers
struct Shared {
    catalog: RwLock<Vec<ConnectionData>>,
    slots: DashMap<SystemId, Slot>,
    gate: watch::Sender<Gate>,
    store: Arc<dyn StateStore>,
    events: broadcast::Sender<ConnectionEvent>,
}

/// Holds a `Connecting` slot until it is fulfilled or dropped
///
/// `park` waits for every live reservation, so one is kept until the
/// connect it belongs to has persisted and published.
struct Reservation<'a> {
    shared: &'a Shared,
    system_id: SystemId,
    reserved: bool,
    fulfilled: bool,
}

impl<'a> Reservation<'a> {
    fn acquire(shared: &'a Shared, system_id: &SystemId) -> Result<Self, ConnectionError> {
        let admitted = shared.gate.send_if_modified(|gate| {
            if gate.parking {
                return false;
            }
            gate.in_flight += 1;
            true
        });
        if !admitted {
            return Err(ConnectionError::Parking(system_id.clone()));
        }

        let mut reservation = Self {
            shared,
            system_id: system_id.clone(),
            reserved: false,
            fulfilled: false,
        };
        reservation.reserved = match shared.slots.entry(system_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Connecting);
                true
            }
        };
        if !reservation.reserved {
            return Err(ConnectionError::AlreadyConnected(system_id.clone()));
        }
        Ok(reservation)
    }

    fn fulfil(&mut self, connection: Arc<Connection>) {
        self.shared
            .slots
            .insert(self.system_id.clone(), Slot::Active(connection));
        self.fulfilled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.reserved && !self.fulfilled {
            self.shared
                .slots
                .remove_if(&self.system_id, |_, slot| matches!(slot, Slot::Connecting));
        }
        self.shared
            .gate
            .send_modify(|gate| gate.in_flight = gate.in_flight.saturating_sub(1));
    }
}

/// Reopens the gate when parking ends, however it ends
struct ParkingGuard<'a>(&'a watch::Sender<Gate>);

impl Drop for ParkingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|gate| gate.parking = false);
    }
}

impl Shared {
    fn is_system_active(&self, system_id: &SystemId) -> bool {
        matches!(
            self.slots.get(system_id).as_deref(),
            Some(Slot::Active(_))
        )
    }

    fn active_ids(&self) -> Vec<SystemId> {
        let mut ids: Vec<SystemId> = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Active(_)))
            .map(|slot| slot.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Write the catalog from a blocking thread
    async fn save_catalog(&self, catalog: &[ConnectionData]) -> Result<(), ConnectionError> {
        let store = Arc::clone(&self.store);
        let snapshot = catalog.to_vec();
        tokio::task::spawn_blocking(move || store.save_catalog(&snapshot))
            .await
            .map_err(|e| StoreError::Interrupted(e.to_string()))??;
        Ok(())
    }

    /// Best effort, a failed write only costs the next restore
    fn persist_parked(&self) {
        if let Err(e) = self.store.save_parked(&self.active_ids()) {
            tracing::error!("Failed to persist parked connections: {}", e);
        }
    }

    /// Set the link state of every catalog entry for the system, returning
    /// the first one
    async fn set_link_state(&self, system_id: &SystemId, state: LinkState) -> Option<ConnectionData> {
        let mut catalog = self.catalog.write().await;
        let mut first = None;
        for entry in catalog.iter_mut().filter(|c| &c.system_id == system_id) {
            entry.state = state;
            if first.is_none() {
                first = Some(entry.clone());
            }
        }
        first
    }

    async fn mark_disconnected(&self, data: &ConnectionData) {
        let disconnected = self
            .set_link_state(&data.system_id, LinkState::Disconnected)
            .await
            .unwrap_or_else(|| ConnectionData {
                state: LinkState::Disconnected,
                ..data.clone()
            });
        self.publish(ConnectionEventKind::Disconnected, disconnected);
    }

    /// Drop a connection the server hung up on, unless it was already
    /// replaced or disconnected
    async fn evict(&self, connection: &Arc<Connection>) {
        let system_id = connection.system_id();
        let evicted = self
            .slots
            .remove_if(system_id, |_, slot| {
                matches!(slot, Slot::Active(active) if Arc::ptr_eq(active, connection))
            })
            .is_some();
        if !evicted {
            return;
        }

        tracing::warn!("Lost connection to {}", system_id);
        connection.disconnect().await;
        self.persist_parked();
        self.mark_disconnected(connection.data()).await;
    }

    fn publish(&self, kind: ConnectionEventKind, connection: ConnectionData) {
        // No subscribers is fine.
        let _ = self.events.send(ConnectionEvent::new(kind, connection));
    }
}

pub struct ConnectionManager {
    shared: Arc<Shared>,
    workspace: Arc<dyn Workspace>,
    credentials: Arc<dyn CredentialProvider>,
    establisher: SocketEstablisher,
    test_timeout: Duration,
}

impl ConnectionManager {
    /// Create a manager over the persisted catalog
    pub fn new(
        establisher: SocketEstablisher,
        store: Arc<dyn StateStore>,
        workspace: Arc<dyn Workspace>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ConnectionError> {
        let catalog = store.load_catalog()?;
        let (events, _) = broadcast::channel(256);

        Ok(Self {
            shared: Arc::new(Shared {
                catalog: RwLock::new(catalog),
                slots: DashMap::new(),
                gate: watch::Sender::new(Gate::default()),
                store,
                events,
            }),
            workspace,
            credentials,
            establisher,
            test_timeout: Duration::from_secs(10),
        })
    }

    /// Upper bound for `test_connect`
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    // ---- catalog ----

    pub async fn add_connection(&self, data: ConnectionData) -> Result<(), ConnectionError> {
        let mut catalog = self.shared.catalog.write().await;
        if catalog.iter().any(|c| c.name == data.name) {
            return Err(ConnectionError::DuplicateName(data.name));
        }

        let mut entry = data;
        entry.state = self.link_state_of(&entry.system_id);
        catalog.push(entry.clone());
        if let Err(e) = self.shared.save_catalog(&catalog).await {
            catalog.pop();
            return Err(e);
        }
        drop(catalog);

        tracing::info!("Added connection {} ({})", entry.name, entry.system_id);
        self.shared.publish(ConnectionEventKind::Added, entry);
        Ok(())
    }

    /// Remove a connection by name. Active connections are refused.
    pub async fn remove_connection(&self, name: &str) -> Result<ConnectionData, ConnectionError> {
        let mut catalog = self.shared.catalog.write().await;
        let index = catalog
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ConnectionError::NotFound(name.to_string()))?;
        if self.shared.is_system_active(&catalog[index].system_id) {
            return Err(ConnectionError::StillConnected(name.to_string()));
        }

        let removed = catalog.remove(index);
        if let Err(e) = self.shared.save_catalog(&catalog).await {
            catalog.insert(index, removed);
            return Err(e);
        }
        drop(catalog);

        tracing::info!("Removed connection {} ({})", removed.name, removed.system_id);
        self.shared
            .publish(ConnectionEventKind::Deleted, removed.clone());
        Ok(removed)
    }

    /// Replace a connection's definition, keeping its position
    pub async fn update_connection(
        &self,
        name: &str,
        data: ConnectionData,
    ) -> Result<(), ConnectionError> {
        let mut catalog = self.shared.catalog.write().await;
        let index = catalog
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ConnectionError::NotFound(name.to_string()))?;
        if self.shared.is_system_active(&catalog[index].system_id) {
            return Err(ConnectionError::StillConnected(name.to_string()));
        }
        if data.name != name && catalog.iter().any(|c| c.name == data.name) {
            return Err(ConnectionError::DuplicateName(data.name));
        }

        let mut entry = data;
        entry.state = self.link_state_of(&entry.system_id);
        let previous = std::mem::replace(&mut catalog[index], entry.clone());
        if let Err(e) = self.shared.save_catalog(&catalog).await {
            catalog[index] = previous;
            return Err(e);
        }
        drop(catalog);

        tracing::info!("Updated connection {}", name);
        self.shared.publish(ConnectionEventKind::Deleted, previous);
        self.shared.publish(ConnectionEventKind::Added, entry);
        Ok(())
    }

    /// All declared connections with their current link state
    pub async fn connections(&self) -> Vec<ConnectionData> {
        self.shared.catalog.read().await.clone()
    }

    pub async fn get_data(&self, system_id: &SystemId) -> Option<ConnectionData> {
        self.shared
            .catalog
            .read()
            .await
            .iter()
            .find(|c| &c.system_id == system_id)
            .cloned()
    }

    pub async fn get_by_name(&self, name: &str) -> Option<ConnectionData> {
        self.shared
            .catalog
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Declared connections mounted as workspace folders
    pub async fn workspace_connections(&self) -> Vec<ConnectionData> {
        let folders = self.workspace.folders().await;
        let catalog = self.shared.catalog.read().await;
        folders
            .iter()
            .filter_map(WorkspaceFolder::system_id)
            .filter_map(|id| catalog.iter().find(|c| c.system_id == id).cloned())
            .collect()
    }

    // ---- active set ----

    pub fn get_active(&self, system_id: &SystemId) -> Option<Arc<Connection>> {
        match self.shared.slots.get(system_id)?.value() {
            Slot::Active(connection) => Some(Arc::clone(connection)),
            Slot::Connecting => None,
        }
    }

    pub fn active_connections(&self) -> Vec<Arc<Connection>> {
        self.shared
            .slots
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Active(connection) => Some(Arc::clone(connection)),
                Slot::Connecting => None,
            })
            .collect()
    }

    /// Ids of the active systems, sorted
    pub fn active_ids(&self) -> Vec<SystemId> {
        self.shared.active_ids()
    }

    /// Whether `connection` is still the active one for its system
    ///
    /// Callers holding a connection across an await re-check with this
    /// before trusting what they got back.
    pub fn is_current(&self, connection: &Arc<Connection>) -> bool {
        self.get_active(connection.system_id())
            .is_some_and(|active| Arc::ptr_eq(&active, connection))
    }

    fn link_state_of(&self, system_id: &SystemId) -> LinkState {
        if self.shared.is_system_active(system_id) {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    // ---- lifecycle ----

    /// Connect to a system and mount it in the workspace
    pub async fn connect(&self, data: &ConnectionData) -> Result<Arc<Connection>, ConnectionError> {
        let system_id = data.system_id.clone();
        let mut reservation = Reservation::acquire(&self.shared, &system_id)?;

        let authentication = self.credentials.credentials(data)?;
        self.ensure_workspace_folder(&system_id).await?;

        let connection =
            Arc::new(Connection::connect(data.clone(), authentication, &self.establisher).await?);
        reservation.fulfil(Arc::clone(&connection));
        self.watch_hangup(&connection);

        self.shared.persist_parked();
        let connected = self
            .shared
            .set_link_state(&system_id, LinkState::Connected)
            .await
            .unwrap_or_else(|| ConnectionData {
                state: LinkState::Connected,
                ..data.clone()
            });
        self.shared
            .publish(ConnectionEventKind::Connected, connected);

        Ok(connection)
    }

    pub async fn disconnect(&self, data: &ConnectionData) -> Result<(), ConnectionError> {
        let system_id = &data.system_id;
        let connection = match self
            .shared
            .slots
            .remove_if(system_id, |_, slot| matches!(slot, Slot::Active(_)))
        {
            Some((_, Slot::Active(connection))) => connection,
            _ => return Err(ConnectionError::NotConnected(system_id.clone())),
        };

        connection.disconnect().await;
        self.shared.persist_parked();
        self.shared.mark_disconnected(connection.data()).await;
        Ok(())
    }

    /// Try a logon without touching the catalog, the workspace or the
    /// active set
    pub async fn test_connect(&self, data: &ConnectionData) -> ConnectionTestResult {
        if self.shared.slots.contains_key(&data.system_id) {
            return ConnectionTestResult::failed(
                ConnectionError::AlreadyConnected(data.system_id.clone()).to_string(),
            );
        }

        let authentication = match self.credentials.credentials(data) {
            Ok(authentication) => authentication,
            Err(e) => return ConnectionTestResult::failed(e.to_string()),
        };

        let attempt = Connection::connect(data.clone(), authentication, &self.establisher);
        match tokio::time::timeout(self.test_timeout, attempt).await {
            Ok(Ok(connection)) => {
                connection.disconnect().await;
                ConnectionTestResult::succeeded(format!(
                    "Connected to {} at {}",
                    data.system_id,
                    data.params.endpoint()
                ))
            }
            Ok(Err(e)) => ConnectionTestResult::failed(e.to_string()),
            Err(_) => ConnectionTestResult::failed(format!(
                "No answer from {} within {}s",
                data.system_id,
                self.test_timeout.as_secs_f32()
            )),
        }
    }

    /// Close every active connection, remembering them for the next start
    ///
    /// Connects already under way are waited for and parked with the rest.
    /// Connections the server already hung up on are not remembered.
    pub async fn park(&self) -> Result<Vec<SystemId>, ConnectionError> {
        self.shared.gate.send_modify(|gate| gate.parking = true);
        let _reopen = ParkingGuard(&self.shared.gate);
        let mut gate = self.shared.gate.subscribe();
        // The sender lives as long as `self`.
        let _ = gate.wait_for(|gate| gate.in_flight == 0).await;

        let mut parked: Vec<SystemId> = self
            .active_connections()
            .iter()
            .filter(|connection| connection.is_connected())
            .map(|connection| connection.system_id().clone())
            .collect();
        parked.sort();
        self.shared.store.save_parked(&parked)?;

        let mut drained = Vec::new();
        for system_id in self.active_ids() {
            if let Some((_, Slot::Active(connection))) = self
                .shared
                .slots
                .remove_if(&system_id, |_, slot| matches!(slot, Slot::Active(_)))
            {
                drained.push(connection);
            }
        }

        for connection in drained {
            connection.disconnect().await;
            self.shared.mark_disconnected(connection.data()).await;
        }

        if !parked.is_empty() {
            tracing::info!("Parked {} connection(s)", parked.len());
        }
        Ok(parked)
    }

    /// Reattach to the sessions parked by the previous run
    ///
    /// Individual failures are logged and skipped. The parked set is
    /// rewritten from the active set afterwards in every case.
    pub async fn restore_workspace_connections(&self) -> Result<RestoreReport, ConnectionError> {
        let parked = self.shared.store.load_parked()?;
        if parked.is_empty() {
            return Ok(RestoreReport::NothingParked);
        }

        if !self.establisher.backend().is_running().await {
            tracing::warn!(
                "Language server is not running, {} parked connection(s) cannot be restored",
                parked.len()
            );
            self.shared.store.save_parked(&self.active_ids())?;
            return Ok(RestoreReport::ServerNotRunning { parked });
        }

        let outcomes = join_all(parked.iter().map(|id| self.restore_one(id))).await;

        let mut restored = Vec::new();
        let mut failed = Vec::new();
        for (system_id, ok) in parked.into_iter().zip(outcomes) {
            if ok {
                restored.push(system_id);
            } else {
                failed.push(system_id);
            }
        }

        self.shared.store.save_parked(&self.active_ids())?;
        tracing::info!(
            "Restored {} connection(s), {} expired",
            restored.len(),
            failed.len()
        );
        Ok(RestoreReport::Completed { restored, failed })
    }

    /// `true` once the system has an active connection
    async fn restore_one(&self, system_id: &SystemId) -> bool {
        let Some(data) = self.get_data(system_id).await else {
            tracing::warn!("Parked system {} is no longer declared", system_id);
            return false;
        };

        let mut reservation = match Reservation::acquire(&self.shared, system_id) {
            Ok(reservation) => reservation,
            Err(e) => {
                // A connect still under way may yet fail.
                let active = self.shared.is_system_active(system_id);
                tracing::debug!("Not restoring {}: {}", system_id, e);
                return active;
            }
        };

        let authentication = match self.credentials.credentials(&data) {
            Ok(authentication) => authentication,
            Err(e) => {
                tracing::warn!("Cannot restore {}: {}", system_id, e);
                return false;
            }
        };

        let Some(connection) = Connection::restore(data, authentication, &self.establisher).await
        else {
            tracing::warn!("Session for {} could not be restored", system_id);
            return false;
        };

        let connection = Arc::new(connection);
        reservation.fulfil(Arc::clone(&connection));
        self.watch_hangup(&connection);

        self.shared.persist_parked();
        if let Some(connected) = self
            .shared
            .set_link_state(system_id, LinkState::Connected)
            .await
        {
            self.shared
                .publish(ConnectionEventKind::Connected, connected);
        }
        true
    }

    /// Evict `connection` once the server closes its socket
    fn watch_hangup(&self, connection: &Arc<Connection>) {
        let mut state = connection.subscribe_state();
        let shared = Arc::downgrade(&self.shared);
        let connection = Arc::downgrade(connection);

        tokio::spawn(async move {
            // Err means the connection itself is gone.
            let closed = state
                .wait_for(|state| *state == ConnectionState::Disconnected)
                .await
                .is_ok();
            if !closed {
                return;
            }
            if let (Some(shared), Some(connection)) = (shared.upgrade(), connection.upgrade()) {
                shared.evict(&connection).await;
            }
        });
    }

    async fn ensure_workspace_folder(&self, system_id: &SystemId) -> Result<(), ConnectionError> {
        let folder = WorkspaceFolder::for_system(system_id);
        let present = self.workspace.folders().await.iter().any(|existing| {
            existing.name == folder.name || existing.system_id().as_ref() == Some(system_id)
        });
        if !present {
            tracing::debug!("Mounting {} as workspace folder", folder.uri);
            self.workspace.append_folder(folder).await?;
        }
        Ok(())
    }
}
