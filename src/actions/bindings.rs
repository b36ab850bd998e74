use std::collections::BTreeMap;

use tracing::warn;

use crate::actions::Intent;

pub const COPY_URL_COMMAND: &str = "copy-url";
pub const COPY_TITLE_AND_URL_COMMAND: &str = "copy-url-title";
pub const TOGGLE_SEARCH_COMMAND: &str = "toggle-portable-search";

/// Maps platform command names (as declared in the host's shortcut
/// configuration) to intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBindings {
    bindings: BTreeMap<String, Intent>,
}

impl CommandBindings {
    /// No bindings at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, command: impl Into<String>, intent: Intent) -> Self {
        self.bind(command, intent);
        self
    }

    /// Bind `command`, returning the intent it was bound to before
    pub fn bind(&mut self, command: impl Into<String>, intent: Intent) -> Option<Intent> {
        self.bindings.insert(command.into(), intent)
    }

    pub fn unbind(&mut self, command: &str) -> Option<Intent> {
        self.bindings.remove(command)
    }

    #[must_use]
    pub fn resolve(&self, command: &str) -> Option<Intent> {
        let intent = self.bindings.get(command).copied();
        if intent.is_none() {
            warn!(command, "No intent bound to command");
        }
        intent
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Intent)> {
        self.bindings.iter().map(|(command, intent)| (command.as_str(), *intent))
    }
}

impl Default for CommandBindings {
    fn default() -> Self {
        Self::empty()
            .with(COPY_URL_COMMAND, Intent::CopyUrl)
            .with(COPY_TITLE_AND_URL_COMMAND, Intent::CopyTitleAndUrl)
            .with(TOGGLE_SEARCH_COMMAND, Intent::ToggleSearch)
    }
}
