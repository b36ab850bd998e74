//! `UniFFI` bindings for the preference store and renderer
//!
//! This module lets the extension shell (or any other foreign host) share one
//! store across its surfaces and render copy text without reimplementing the
//! format rules.

use std::sync::Arc;

use crate::{
    backend::{FileBackend, MemoryBackend},
    error::CopyFormatError,
    models::{CopyRequest, FormatKind, PreferenceState},
    render,
    store::{PreferenceStore, StoreOptions, Subscription},
    template::{self, Placeholders},
};

/// Receives every committed state
#[uniffi::export(with_foreign)]
pub trait PreferenceObserver: Send + Sync {
    fn on_change(&self, state: PreferenceState);
}

/// Derives a new state from the current one, inside the store's write lock
#[uniffi::export(with_foreign)]
pub trait PreferenceTransform: Send + Sync {
    fn apply(&self, state: PreferenceState) -> PreferenceState;
}

#[derive(uniffi::Object)]
pub struct PreferenceStoreHandle {
    store: PreferenceStore,
}

#[uniffi::export]
impl PreferenceStoreHandle {
    /// Store that lives only as long as this handle
    #[uniffi::constructor]
    #[must_use]
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            store: PreferenceStore::new(Arc::new(MemoryBackend::new())),
        })
    }

    /// Store persisted under `dir`. Handles opened on the same directory
    /// share one store, so each sees the others' commits.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    #[uniffi::constructor]
    pub fn open(dir: String) -> Result<Arc<Self>, CopyFormatError> {
        let store = PreferenceStore::open_shared(dir, StoreOptions::default())?;
        Ok(Arc::new(Self { store }))
    }

    /// Store persisted in the platform config directory, shared like `open`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    #[uniffi::constructor]
    pub fn open_default() -> Result<Arc<Self>, CopyFormatError> {
        let store = PreferenceStore::open_shared(FileBackend::default_dir(), StoreOptions::default())?;
        Ok(Arc::new(Self { store }))
    }

    /// # Errors
    ///
    /// Returns an error if storage is unavailable or the record is corrupt
    pub fn get(&self) -> Result<PreferenceState, CopyFormatError> {
        Ok(self.store.get()?)
    }

    /// # Errors
    ///
    /// Returns an error if storage is unavailable
    pub fn replace(&self, state: PreferenceState) -> Result<(), CopyFormatError> {
        self.store.replace(state)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if storage is unavailable or the record is corrupt
    pub fn update(
        &self,
        transform: Arc<dyn PreferenceTransform>,
    ) -> Result<PreferenceState, CopyFormatError> {
        Ok(self.store.update(|state| transform.apply(state))?)
    }

    /// # Errors
    ///
    /// Returns an error if storage is unavailable or the record is corrupt
    pub fn select_format(&self, kind: FormatKind) -> Result<(), CopyFormatError> {
        self.store.select_format(kind)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if storage is unavailable or the record is corrupt
    pub fn set_plain_text_separator(&self, separator: String) -> Result<(), CopyFormatError> {
        self.store.set_plain_text_separator(separator)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if storage is unavailable or the record is corrupt
    pub fn set_template(&self, kind: FormatKind, template: String) -> Result<(), CopyFormatError> {
        self.store.set_template(kind, template)?;
        Ok(())
    }

    pub fn subscribe(&self, observer: Arc<dyn PreferenceObserver>) -> Arc<SubscriptionHandle> {
        let subscription = self
            .store
            .subscribe(move |state| observer.on_change(state.clone()));
        Arc::new(SubscriptionHandle { subscription })
    }
}

/// Live registration of a foreign observer; released when the handle is
/// dropped by the foreign side
#[derive(uniffi::Object)]
pub struct SubscriptionHandle {
    subscription: Subscription,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[uniffi::export]
impl SubscriptionHandle {
    /// Returns `false` if already unsubscribed
    pub fn unsubscribe(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

#[uniffi::export]
#[must_use]
pub fn render_copy_text(request: CopyRequest, state: PreferenceState) -> String {
    render::render(&request, &state)
}

#[uniffi::export]
#[must_use]
pub fn preview_format(kind: FormatKind, state: PreferenceState) -> String {
    render::preview(kind, &state)
}

#[uniffi::export]
#[must_use]
pub fn expand_template(template: String, title: String, url: String, separator: String) -> String {
    template::expand(
        &template,
        &Placeholders {
            title: &title,
            url: &url,
            separator: &separator,
        },
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<PreferenceState>>,
    }

    impl PreferenceObserver for RecordingObserver {
        fn on_change(&self, state: PreferenceState) {
            self.seen.lock().unwrap().push(state);
        }
    }

    struct UseCsv;

    impl PreferenceTransform for UseCsv {
        fn apply(&self, state: PreferenceState) -> PreferenceState {
            state.with_format(FormatKind::Csv)
        }
    }

    #[test]
    fn handle_round_trip_and_notify() {
        let handle = PreferenceStoreHandle::in_memory();
        let observer = Arc::new(RecordingObserver::default());
        let subscription = handle.subscribe(observer.clone());

        handle.set_plain_text_separator(" - ".into()).unwrap();
        let state = handle.update(Arc::new(UseCsv)).unwrap();

        assert_eq!(state.plain_text_separator, " - ");
        assert_eq!(handle.get().unwrap(), state);
        assert_eq!(observer.seen.lock().unwrap().len(), 2);

        assert!(subscription.unsubscribe());
        handle.select_format(FormatKind::Html).unwrap();
        assert_eq!(observer.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn open_persists_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();

        PreferenceStoreHandle::open(path.clone())
            .unwrap()
            .set_template(FormatKind::Plain, "{url}".into())
            .unwrap();

        let state = PreferenceStoreHandle::open(path).unwrap().get().unwrap();
        assert_eq!(state.templates.plain, "{url}");
    }

    #[test]
    fn handles_on_one_directory_see_each_others_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        let popup = PreferenceStoreHandle::open(path.clone()).unwrap();
        let background = PreferenceStoreHandle::open(path).unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let _subscription = background.subscribe(observer.clone());

        popup.select_format(FormatKind::Html).unwrap();

        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].selected_format.kind(), Some(FormatKind::Html));
    }

    #[test]
    fn dropped_subscription_handle_stops_notifications() {
        let handle = PreferenceStoreHandle::in_memory();
        let observer = Arc::new(RecordingObserver::default());
        let subscription = handle.subscribe(observer.clone());

        handle.select_format(FormatKind::Csv).unwrap();
        drop(subscription);
        handle.select_format(FormatKind::Html).unwrap();

        assert_eq!(observer.seen.lock().unwrap().len(), 1);
        assert_eq!(handle.store.subscriber_count(), 0);
    }

    #[test]
    fn free_functions() {
        let state = PreferenceState::default().with_format(FormatKind::Markdown);
        let request = CopyRequest::new("A", "http://b");

        assert_eq!(render_copy_text(request, state.clone()), "[A](http://b)");
        assert_eq!(
            preview_format(FormatKind::Csv, state),
            "\"Title\",\"https://example.com\""
        );
        assert_eq!(
            expand_template("{title}{separator}{url} {x}".into(), "A".into(), "http://b".into(), "\t".into()),
            "A\thttp://b {x}"
        );
    }
}
