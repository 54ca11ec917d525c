//! Per-replica synchronization bookkeeping.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of a synchronization id token.
const SYNCHRONIZATION_ID_LENGTH: usize = 32;

/// Generate an opaque synchronization id from a uniform alphanumeric source.
pub(crate) fn random_synchronization_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SYNCHRONIZATION_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Synchronization progress of one terminal replica.
#[derive(Debug, Default)]
pub(crate) struct InstanceSyncState {
    /// Id of the most recent synchronize request sent for this replica.
    pub last_synchronization_id: Option<String>,
    /// Id that was current when the replica last disconnected, kept for
    /// diagnostics.
    pub last_disconnected_synchronization_id: Option<String>,
    /// Token of the currently authoritative synchronization attempt. A retry
    /// holding a stale token must abandon itself without touching the state.
    pub should_synchronize: Option<String>,
    pub orders_synchronized: HashSet<String>,
    pub deals_synchronized: HashSet<String>,
    /// Current retry delay of the synchronize loop, in seconds.
    pub retry_interval_in_seconds: u64,
    pub synchronized: bool,
    pub disconnected: bool,
}

impl InstanceSyncState {
    /// True when both history kinds finished for the id (defaulting to the
    /// replica's latest synchronization id).
    fn is_synchronized(&self, synchronization_id: Option<&str>) -> bool {
        let id = synchronization_id.or(self.last_synchronization_id.as_deref());
        match id {
            Some(id) => {
                self.orders_synchronized.contains(id) && self.deals_synchronized.contains(id)
            }
            None => false,
        }
    }

    /// Fold the replica's ids over to their disconnected slots.
    pub fn record_disconnect(&mut self) {
        self.last_disconnected_synchronization_id = self.last_synchronization_id.take();
        self.should_synchronize = None;
        self.synchronized = false;
        self.disconnected = true;
    }
}

/// All replica states of one connection, keyed by instance index.
#[derive(Default)]
pub(crate) struct SyncStateMap {
    states: RwLock<HashMap<u32, InstanceSyncState>>,
}

impl SyncStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the replica's state, creating it on first touch.
    pub fn with_state<R>(
        &self,
        instance_index: u32,
        f: impl FnOnce(&mut InstanceSyncState) -> R,
    ) -> R {
        let mut states = self.states.write();
        f(states.entry(instance_index).or_default())
    }

    /// Run `f` against the replica's state if it exists.
    pub fn read_state<R>(
        &self,
        instance_index: u32,
        f: impl FnOnce(&InstanceSyncState) -> R,
    ) -> Option<R> {
        self.states.read().get(&instance_index).map(f)
    }

    /// True when any considered replica completed both history kinds.
    pub fn is_synchronized(
        &self,
        instance_index: Option<u32>,
        synchronization_id: Option<&str>,
    ) -> bool {
        let states = self.states.read();
        match instance_index {
            Some(instance_index) => states
                .get(&instance_index)
                .is_some_and(|state| state.is_synchronized(synchronization_id)),
            None => states
                .values()
                .any(|state| state.is_synchronized(synchronization_id)),
        }
    }

    /// True when any replica reached a synchronized state.
    pub fn any_synchronized(&self) -> bool {
        self.states.read().values().any(|state| state.synchronized)
    }

    /// Drop states of replicas that no longer exist server-side.
    pub fn retain_below(&self, replicas: u32) {
        self.states
            .write()
            .retain(|instance_index, _| *instance_index < replicas);
    }

    /// The synchronization id most relevant for diagnostics: the current one
    /// if any replica has it, the disconnected one otherwise.
    pub fn relevant_synchronization_id(&self, instance_index: Option<u32>) -> Option<String> {
        let states = self.states.read();
        let considered: Vec<&InstanceSyncState> = match instance_index {
            Some(instance_index) => states.get(&instance_index).into_iter().collect(),
            None => states.values().collect(),
        };
        considered
            .iter()
            .find_map(|state| state.last_synchronization_id.clone())
            .or_else(|| {
                considered
                    .iter()
                    .find_map(|state| state.last_disconnected_synchronization_id.clone())
            })
    }
}
