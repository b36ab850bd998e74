//! Action boundary driven by shortcuts and buttons
//!
//! Tab lookup, clipboard writes, notifications and the in-page search
//! overlay belong to the host; they are reached through the collaborator
//! traits below. `ActionRunner` ties them to the preference store and
//! renderer, and turns every failure into a notification instead of an
//! error escaping to the host.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::{ActionError, ActionResult},
    models::{CopyRequest, PreferenceState},
    render::{render, render_url_only},
    store::PreferenceStore,
};

pub mod bindings;

pub use bindings::CommandBindings;

pub type TabId = i32;

/// What a command asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    CopyUrl,
    CopyTitleAndUrl,
    ToggleSearch,
}

/// The active tab as reported by the host; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabInfo {
    pub id: Option<TabId>,
    pub title: Option<String>,
    pub url: Option<String>,
}

impl TabInfo {
    /// Id plus title and url, all present and non-empty
    ///
    /// # Errors
    ///
    /// Returns `IncompleteTabData` naming the first missing field
    pub fn into_copy_request(self) -> ActionResult<(TabId, CopyRequest)> {
        let id = self.id.ok_or(ActionError::incomplete("id"))?;
        let title = non_empty(self.title).ok_or(ActionError::incomplete("title"))?;
        let url = non_empty(self.url).ok_or(ActionError::incomplete("url"))?;
        Ok((id, CopyRequest { title, url }))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub trait TabInspector: Send + Sync {
    /// The active tab of the current window, `None` if there is none
    ///
    /// # Errors
    ///
    /// Returns a description of why the host could not be queried
    fn active_tab(&self) -> Result<Option<TabInfo>, String>;
}

pub trait ClipboardWriter: Send + Sync {
    /// # Errors
    ///
    /// Returns a description of why the write failed
    fn write_text(&self, text: &str, tab: TabId) -> Result<(), String>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

pub trait SearchOverlay: Send + Sync {
    /// # Errors
    ///
    /// Returns a description of why the tab could not be reached
    fn toggle(&self, tab: TabId) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// What running an intent did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Copied { tab: TabId, text: String },
    SearchToggled { tab: TabId },
    Failed(ActionError),
}

/// Host-provided collaborators
#[derive(Clone)]
pub struct Collaborators {
    pub tabs: Arc<dyn TabInspector>,
    pub clipboard: Arc<dyn ClipboardWriter>,
    pub notifier: Arc<dyn Notifier>,
    pub overlay: Arc<dyn SearchOverlay>,
}

pub struct ActionRunner {
    store: PreferenceStore,
    bindings: CommandBindings,
    host: Collaborators,
}

impl ActionRunner {
    #[must_use]
    pub fn new(store: PreferenceStore, host: Collaborators) -> Self {
        Self {
            store,
            bindings: CommandBindings::default(),
            host,
        }
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: CommandBindings) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &PreferenceStore {
        &self.store
    }

    #[must_use]
    pub const fn bindings(&self) -> &CommandBindings {
        &self.bindings
    }

    /// Run the intent bound to a platform command; unbound commands are ignored
    pub fn dispatch(&self, command: &str) -> Option<Outcome> {
        let intent = self.bindings.resolve(command)?;
        info!(command, ?intent, "Dispatching command");
        Some(self.run(intent))
    }

    pub fn run(&self, intent: Intent) -> Outcome {
        let result = match intent {
            Intent::CopyUrl => self.try_copy(false),
            Intent::CopyTitleAndUrl => self.try_copy(true),
            Intent::ToggleSearch => self.try_toggle_search(),
        };
        result.unwrap_or_else(|err| self.fail(intent, err))
    }

    pub fn copy_url(&self) -> Outcome {
        self.run(Intent::CopyUrl)
    }

    pub fn copy_title_and_url(&self) -> Outcome {
        self.run(Intent::CopyTitleAndUrl)
    }

    pub fn toggle_search(&self) -> Outcome {
        self.run(Intent::ToggleSearch)
    }

    fn try_copy(&self, with_title: bool) -> ActionResult<Outcome> {
        let (tab, request) = self.active_tab()?.into_copy_request()?;

        let text = if with_title {
            render(&request, &self.current_state())
        } else {
            render_url_only(&request)
        };

        self.host
            .clipboard
            .write_text(&text, tab)
            .map_err(ActionError::ClipboardWriteFailed)?;

        info!(tab, chars = text.chars().count(), "Copied to clipboard");
        let message = if with_title {
            "Page title and link copied to clipboard"
        } else {
            "Link copied to clipboard"
        };
        self.host
            .notifier
            .notify(&Notification::info("Copied", message));
        Ok(Outcome::Copied { tab, text })
    }

    fn try_toggle_search(&self) -> ActionResult<Outcome> {
        let tab = self
            .active_tab()?
            .id
            .ok_or(ActionError::incomplete("id"))?;
        self.host
            .overlay
            .toggle(tab)
            .map_err(ActionError::OverlayToggleFailed)?;
        info!(tab, "Toggled search overlay");
        Ok(Outcome::SearchToggled { tab })
    }

    fn active_tab(&self) -> ActionResult<TabInfo> {
        match self.host.tabs.active_tab() {
            Ok(Some(tab)) => Ok(tab),
            Ok(None) => Err(ActionError::NoActiveTab),
            Err(reason) => {
                warn!(%reason, "Tab query failed");
                Err(ActionError::NoActiveTab)
            }
        }
    }

    /// Freshly fetched state, or the built-in defaults if storage is unusable
    fn current_state(&self) -> PreferenceState {
        let state = self.store.get().unwrap_or_else(|err| {
            warn!(error = %err, "Preference store unavailable, using built-in defaults");
            PreferenceState::default()
        });
        if state.selected_format.kind().is_none() {
            warn!(format = %state.selected_format, "Unknown format kind, falling back to plain text");
        }
        state
    }

    fn fail(&self, intent: Intent, err: ActionError) -> Outcome {
        warn!(?intent, error = %err, "Action failed");
        let title = match intent {
            Intent::CopyUrl | Intent::CopyTitleAndUrl => "Copy failed",
            Intent::ToggleSearch => "Search unavailable",
        };
        self.host
            .notifier
            .notify(&Notification::error(title, err.to_string()));
        Outcome::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        backend::{MemoryBackend, PreferenceBackend},
        error::{StorageError, StorageResult},
        models::{FormatKind, SelectedFormat},
        store::DEFAULT_STORAGE_KEY,
    };

    #[derive(Default)]
    struct MockHost {
        tab: Mutex<Option<TabInfo>>,
        tab_error: Mutex<Option<String>>,
        clipboard: Mutex<Vec<(String, TabId)>>,
        clipboard_error: Mutex<Option<String>>,
        notifications: Mutex<Vec<Notification>>,
        toggled: Mutex<Vec<TabId>>,
    }

    impl MockHost {
        fn with_tab(tab: TabInfo) -> Arc<Self> {
            let host = Self::default();
            *host.tab.lock().unwrap() = Some(tab);
            Arc::new(host)
        }

        fn last_notification(&self) -> Notification {
            self.notifications.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl TabInspector for MockHost {
        fn active_tab(&self) -> Result<Option<TabInfo>, String> {
            if let Some(reason) = self.tab_error.lock().unwrap().clone() {
                return Err(reason);
            }
            Ok(self.tab.lock().unwrap().clone())
        }
    }

    impl ClipboardWriter for MockHost {
        fn write_text(&self, text: &str, tab: TabId) -> Result<(), String> {
            if let Some(reason) = self.clipboard_error.lock().unwrap().clone() {
                return Err(reason);
            }
            self.clipboard.lock().unwrap().push((text.to_string(), tab));
            Ok(())
        }
    }

    impl Notifier for MockHost {
        fn notify(&self, notification: &Notification) {
            self.notifications.lock().unwrap().push(notification.clone());
        }
    }

    impl SearchOverlay for MockHost {
        fn toggle(&self, tab: TabId) -> Result<(), String> {
            self.toggled.lock().unwrap().push(tab);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct UnavailableBackend;

    impl PreferenceBackend for UnavailableBackend {
        fn read(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::unavailable("storage locked"))
        }

        fn write(&self, _key: &str, _record: &str) -> StorageResult<()> {
            Err(StorageError::unavailable("storage locked"))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::unavailable("storage locked"))
        }
    }

    fn example_tab() -> TabInfo {
        TabInfo {
            id: Some(7),
            title: Some("Example".into()),
            url: Some("https://example.com".into()),
        }
    }

    fn runner(store: PreferenceStore, host: &Arc<MockHost>) -> ActionRunner {
        ActionRunner::new(
            store,
            Collaborators {
                tabs: host.clone(),
                clipboard: host.clone(),
                notifier: host.clone(),
                overlay: host.clone(),
            },
        )
    }

    #[test]
    fn copy_title_and_url_uses_selected_format() {
        let host = MockHost::with_tab(example_tab());
        let store = PreferenceStore::in_memory();
        store.select_format(FormatKind::Html).unwrap();
        let runner = runner(store, &host);

        let outcome = runner.copy_title_and_url();

        let expected = "<a href=\"https://example.com\">Example</a>";
        assert_eq!(
            outcome,
            Outcome::Copied {
                tab: 7,
                text: expected.into()
            }
        );
        assert_eq!(*host.clipboard.lock().unwrap(), vec![(expected.to_string(), 7)]);
        assert_eq!(host.last_notification().level, NotificationLevel::Info);
    }

    #[test]
    fn copy_sees_format_changed_by_another_surface() {
        let host = MockHost::with_tab(example_tab());
        let store = PreferenceStore::in_memory();
        let popup = store.clone();
        let runner = runner(store, &host);

        assert_eq!(
            runner.copy_title_and_url(),
            Outcome::Copied {
                tab: 7,
                text: "[Example](https://example.com)".into()
            }
        );

        popup.select_format(FormatKind::Plain).unwrap();
        popup.set_plain_text_separator("\n").unwrap();

        assert_eq!(
            runner.copy_title_and_url(),
            Outcome::Copied {
                tab: 7,
                text: "Example\nhttps://example.com".into()
            }
        );
    }

    #[test]
    fn copy_url_ignores_format() {
        let host = MockHost::with_tab(example_tab());
        let store = PreferenceStore::in_memory();
        store.select_format(FormatKind::Csv).unwrap();

        let outcome = runner(store, &host).dispatch("copy-url");

        assert_eq!(
            outcome,
            Some(Outcome::Copied {
                tab: 7,
                text: "https://example.com".into()
            })
        );
    }

    #[test]
    fn no_active_tab_aborts_with_notification() {
        let host = Arc::new(MockHost::default());

        let outcome = runner(PreferenceStore::in_memory(), &host).copy_title_and_url();

        assert_eq!(outcome, Outcome::Failed(ActionError::NoActiveTab));
        assert!(host.clipboard.lock().unwrap().is_empty());
        let notification = host.last_notification();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.message, "No active tab");
    }

    #[test]
    fn tab_query_error_is_no_active_tab() {
        let host = Arc::new(MockHost::default());
        *host.tab_error.lock().unwrap() = Some("tabs permission missing".into());

        let outcome = runner(PreferenceStore::in_memory(), &host).copy_url();
        assert_eq!(outcome, Outcome::Failed(ActionError::NoActiveTab));
    }

    #[test]
    fn incomplete_tab_data_aborts() {
        for (tab, field) in [
            (
                TabInfo {
                    id: None,
                    ..example_tab()
                },
                "id",
            ),
            (
                TabInfo {
                    title: Some(String::new()),
                    ..example_tab()
                },
                "title",
            ),
            (
                TabInfo {
                    url: None,
                    ..example_tab()
                },
                "url",
            ),
        ] {
            let host = MockHost::with_tab(tab);
            let outcome = runner(PreferenceStore::in_memory(), &host).copy_title_and_url();
            assert_eq!(outcome, Outcome::Failed(ActionError::incomplete(field)));
            assert!(host.clipboard.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn storage_failure_falls_back_to_defaults() {
        let host = MockHost::with_tab(example_tab());
        let store = PreferenceStore::new(Arc::new(UnavailableBackend));

        let outcome = runner(store, &host).copy_title_and_url();

        assert_eq!(
            outcome,
            Outcome::Copied {
                tab: 7,
                text: "[Example](https://example.com)".into()
            }
        );
    }

    #[test]
    fn unknown_format_copies_fallback_text() {
        let host = MockHost::with_tab(example_tab());
        let state = PreferenceState::default().with_format(SelectedFormat::from("bogus".to_string()));
        let backend = MemoryBackend::with_record(
            DEFAULT_STORAGE_KEY,
            serde_json::to_string(&state).unwrap(),
        );
        let store = PreferenceStore::new(Arc::new(backend));

        let outcome = runner(store, &host).copy_title_and_url();

        assert_eq!(
            outcome,
            Outcome::Copied {
                tab: 7,
                text: "Example https://example.com".into()
            }
        );
    }

    #[test]
    fn clipboard_failure_is_notified() {
        let host = MockHost::with_tab(example_tab());
        *host.clipboard_error.lock().unwrap() = Some("document not focused".into());

        let outcome = runner(PreferenceStore::in_memory(), &host).copy_title_and_url();

        assert_eq!(
            outcome,
            Outcome::Failed(ActionError::ClipboardWriteFailed("document not focused".into()))
        );
        let notification = host.last_notification();
        assert_eq!(notification.title, "Copy failed");
        assert!(notification.message.contains("document not focused"));
    }

    #[test]
    fn toggle_search_only_needs_tab_id() {
        let host = MockHost::with_tab(TabInfo {
            id: Some(3),
            title: None,
            url: None,
        });

        let outcome = runner(PreferenceStore::in_memory(), &host).dispatch("toggle-portable-search");

        assert_eq!(outcome, Some(Outcome::SearchToggled { tab: 3 }));
        assert_eq!(*host.toggled.lock().unwrap(), vec![3]);
        assert!(host.notifications.lock().unwrap().is_empty());
    }

    #[test]
    fn unbound_command_is_ignored() {
        let host = MockHost::with_tab(example_tab());
        let runner = runner(PreferenceStore::in_memory(), &host)
            .with_bindings(CommandBindings::empty().with("copy", Intent::CopyUrl));

        assert_eq!(runner.dispatch("copy-url"), None);
        assert!(matches!(runner.dispatch("copy"), Some(Outcome::Copied { .. })));
    }
}
