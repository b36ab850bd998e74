//! Reactive preference store
//!
//! `PreferenceStore` is the single source of truth for `PreferenceState`. It
//! persists through an injected `PreferenceBackend` and pushes every committed
//! state to its subscribers.
//!
//! Commits on one store are serialized by an internal write lock, and the
//! functional form of `set` runs inside that lock against the freshest stored
//! record, so racing writers never lose updates. Notifications go through a
//! queue drained outside the write lock: subscribers see states in commit
//! order, and a subscriber may itself call `set` without deadlocking.
//!
//! `PreferenceStore::open_shared` hands every surface of the process that
//! opens the same directory and key the same store, so a commit from one
//! surface reaches the subscribers of all of them.

use std::{
    collections::{HashMap, VecDeque},
    fmt, fs,
    panic::{AssertUnwindSafe, catch_unwind},
    path::{Path, PathBuf},
    sync::{
        Arc, LazyLock, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::{debug, error, info};

use crate::{
    backend::{FileBackend, MemoryBackend, PreferenceBackend},
    error::{StoreError, StoreResult},
    migration,
    models::{FormatKind, PreferenceState},
};

/// Key the preference record is stored under
pub const DEFAULT_STORAGE_KEY: &str = "copy-format-storage-key";

type Callback = dyn Fn(&PreferenceState) + Send + Sync;

/// Live file-backed stores, by canonical directory and storage key
static SHARED_STORES: LazyLock<Mutex<HashMap<(PathBuf, String), Weak<Inner>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// New value for `PreferenceStore::set`
pub enum Update<'a> {
    /// Store this state as-is
    Replace(PreferenceState),
    /// Derive the new state from the currently stored one
    Transform(Box<dyn FnOnce(PreferenceState) -> PreferenceState + 'a>),
}

impl<'a> Update<'a> {
    pub fn transform(f: impl FnOnce(PreferenceState) -> PreferenceState + 'a) -> Self {
        Self::Transform(Box::new(f))
    }
}

impl From<PreferenceState> for Update<'_> {
    fn from(state: PreferenceState) -> Self {
        Self::Replace(state)
    }
}

impl fmt::Debug for Update<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(state) => f.debug_tuple("Replace").field(state).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub storage_key: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Handle over shared, persisted preference state.
///
/// Clones share the same backend, write lock and subscriber list.
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn PreferenceBackend>,
    key: String,
    write_lock: Mutex<()>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscriber_id: AtomicU64,
    delivery: Mutex<Delivery>,
}

struct Subscriber {
    id: u64,
    callback: Arc<Callback>,
}

#[derive(Default)]
struct Delivery {
    pending: VecDeque<PreferenceState>,
    draining: bool,
}

/// Registration returned by `PreferenceStore::subscribe`.
///
/// Dropping the handle does not unsubscribe; call `unsubscribe`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    store: Weak<Inner>,
}

impl Subscription {
    /// Stop receiving notifications. Returns `false` if already unsubscribed
    /// or the store is gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(inner) = self.store.upgrade() else {
            return false;
        };
        let mut subscribers = lock(&inner.subscribers);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != self.id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscriber = self.id, "Unsubscribed from preference changes");
        }
        removed
    }
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn PreferenceBackend>) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: Arc<dyn PreferenceBackend>, options: StoreOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                key: options.storage_key,
                write_lock: Mutex::new(()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
                delivery: Mutex::new(Delivery::default()),
            }),
        }
    }

    /// Store over a fresh `MemoryBackend`
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// File-backed store shared with every other live caller in this process
    /// that opened the same directory with the same storage key.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the directory cannot be created
    pub fn open_shared(dir: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let backend = FileBackend::open(dir)?;
        let dir = fs::canonicalize(backend.dir()).unwrap_or_else(|_| backend.dir().to_path_buf());
        let registry_key = (dir, options.storage_key.clone());

        let mut registry = lock(&SHARED_STORES);
        registry.retain(|_, inner| inner.strong_count() > 0);
        if let Some(inner) = registry.get(&registry_key).and_then(Weak::upgrade) {
            debug!(dir = %registry_key.0.display(), key = %registry_key.1, "Joined shared preference store");
            return Ok(Self { inner });
        }

        let store = Self::with_options(Arc::new(backend), options);
        registry.insert(registry_key, Arc::downgrade(&store.inner));
        Ok(store)
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    /// Current state. The first call on empty storage writes and returns the
    /// default state; an outdated record is migrated and written back.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the backend fails and `CorruptRecord`
    /// if the stored record cannot be decoded.
    pub fn get(&self) -> StoreResult<PreferenceState> {
        let _guard = lock(&self.inner.write_lock);
        self.inner.load()
    }

    /// Commit a new state, then notify every subscriber.
    ///
    /// The stored record is fully replaced; partial changes are expressed as
    /// an `Update::Transform`. A transform must not call back into this store.
    ///
    /// Without contention, every subscriber has seen the new state when this
    /// returns. If another thread is already delivering notifications, the
    /// state is queued behind it and delivered by that thread, so this call
    /// may return before its own notification has run. A `set` made from
    /// inside a subscriber is always delivered after the current round.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the backend fails, `CorruptRecord` if a
    /// transform needs a stored record that cannot be decoded. Nothing is
    /// committed or notified on error.
    pub fn set<'a>(&self, update: impl Into<Update<'a>>) -> StoreResult<PreferenceState> {
        let committed = {
            let _guard = lock(&self.inner.write_lock);
            let next = match update.into() {
                Update::Replace(state) => state,
                Update::Transform(transform) => transform(self.inner.load()?),
            };
            self.inner.save(&next)?;
            debug!(key = %self.inner.key, format = %next.selected_format, "Committed preference state");
            lock(&self.inner.delivery).pending.push_back(next.clone());
            next
        };
        self.inner.deliver_pending();
        Ok(committed)
    }

    /// Replace the whole state
    ///
    /// # Errors
    ///
    /// See `set`
    pub fn replace(&self, state: PreferenceState) -> StoreResult<PreferenceState> {
        self.set(state)
    }

    /// Read-modify-write against the current state
    ///
    /// # Errors
    ///
    /// See `set`
    pub fn update<F>(&self, f: F) -> StoreResult<PreferenceState>
    where
        F: FnOnce(PreferenceState) -> PreferenceState,
    {
        self.set(Update::transform(f))
    }

    /// # Errors
    ///
    /// See `set`
    pub fn select_format(&self, kind: FormatKind) -> StoreResult<PreferenceState> {
        self.update(|state| state.with_format(kind))
    }

    /// # Errors
    ///
    /// See `set`
    pub fn set_plain_text_separator(
        &self,
        separator: impl Into<String>,
    ) -> StoreResult<PreferenceState> {
        let separator = separator.into();
        self.update(move |state| state.with_separator(separator))
    }

    /// # Errors
    ///
    /// See `set`
    pub fn set_template(
        &self,
        kind: FormatKind,
        template: impl Into<String>,
    ) -> StoreResult<PreferenceState> {
        let template = template.into();
        self.update(move |state| state.with_template(kind, template))
    }

    /// Restore the built-in defaults
    ///
    /// # Errors
    ///
    /// See `set`
    pub fn reset(&self) -> StoreResult<PreferenceState> {
        self.set(PreferenceState::default())
    }

    /// Call `callback` with the new state after every committed `set`.
    ///
    /// No call is made for the current state; use `get` for that.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PreferenceState) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.subscribers).push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        debug!(subscriber = id, "Subscribed to preference changes");
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("backend", &self.inner.backend)
            .field("key", &self.inner.key)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Inner {
    /// Caller holds `write_lock`
    fn load(&self) -> StoreResult<PreferenceState> {
        let Some(raw) = self.backend.read(&self.key)? else {
            let state = PreferenceState::default();
            self.save(&state)?;
            info!(key = %self.key, "Initialized preference storage with defaults");
            return Ok(state);
        };

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::corrupt_record(&self.key, e))?;
        let migrated = migration::migrate(value)
            .map_err(|reason| StoreError::corrupt_record(&self.key, reason))?;
        let changed = migrated.changed();
        let steps = migrated.steps;
        let state: PreferenceState = serde_json::from_value(migrated.record)
            .map_err(|e| StoreError::corrupt_record(&self.key, e))?;

        if changed {
            self.save(&state)?;
            info!(key = %self.key, ?steps, "Migrated stored preference record");
        }
        Ok(state)
    }

    fn save(&self, state: &PreferenceState) -> StoreResult<()> {
        let raw = serde_json::to_string(state).map_err(StoreError::serialization)?;
        self.backend.write(&self.key, &raw)?;
        Ok(())
    }

    /// Deliver queued states unless another call is already doing so
    fn deliver_pending(&self) {
        {
            let mut delivery = lock(&self.delivery);
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }

        loop {
            let next = {
                let mut delivery = lock(&self.delivery);
                let next = delivery.pending.pop_front();
                if next.is_none() {
                    delivery.draining = false;
                }
                next
            };
            let Some(state) = next else {
                return;
            };
            self.notify(&state);
        }
    }

    fn notify(&self, state: &PreferenceState) {
        let callbacks: Vec<(u64, Arc<Callback>)> = lock(&self.subscribers)
            .iter()
            .map(|s| (s.id, Arc::clone(&s.callback)))
            .collect();

        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(state))).is_err() {
                error!(subscriber = id, "Preference subscriber panicked");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
