use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use copyfmt::{
    FormatKind, PreferenceStore,
    actions::{
        ActionRunner, ClipboardWriter, Collaborators, Notification, NotificationLevel, Notifier,
        Outcome, SearchOverlay, TabId, TabInfo, TabInspector,
    },
    backend::FileBackend,
    render::preview,
    template::{Placeholders, expand},
};
use tracing_subscriber::EnvFilter;

/// Copy a page's title and url the way the browser extension would
#[derive(Debug, Parser)]
#[command(name = "copy_tab")]
struct Cli {
    /// Preference directory (defaults to $COPYFMT_STORAGE_DIR or the config dir)
    #[arg(long, global = true)]
    storage_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a shortcut command against a pretend tab
    Dispatch {
        /// copy-url, copy-url-title or toggle-portable-search
        command: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, default_value_t = 1)]
        tab_id: TabId,
    },
    /// Select the output format
    SetFormat { format: FormatKind },
    /// Set the plain text separator (use $'\n' for a line break)
    SetSeparator { separator: String },
    /// Set the stored template for a format
    SetTemplate { format: FormatKind, template: String },
    /// Print the stored preferences with a preview of every format
    Show,
}

/// Tab described on the command line
struct ArgTab(TabInfo);

impl TabInspector for ArgTab {
    fn active_tab(&self) -> Result<Option<TabInfo>, String> {
        Ok(Some(self.0.clone()))
    }
}

/// Prints to stdout instead of touching the system clipboard
struct StdoutClipboard;

impl ClipboardWriter for StdoutClipboard {
    fn write_text(&self, text: &str, _tab: TabId) -> Result<(), String> {
        println!("{text}");
        Ok(())
    }
}

struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: &Notification) {
        let marker = match notification.level {
            NotificationLevel::Info => "ok",
            NotificationLevel::Error => "error",
        };
        eprintln!("[{marker}] {}: {}", notification.title, notification.message);
    }
}

struct NoOverlay;

impl SearchOverlay for NoOverlay {
    fn toggle(&self, tab: TabId) -> Result<(), String> {
        Err(format!("tab {tab} has no content script in this demo"))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let backend = match &cli.storage_dir {
        Some(dir) => FileBackend::open(dir),
        None => FileBackend::open_default(),
    }
    .context("Failed to open preference storage")?;
    let store = PreferenceStore::new(Arc::new(backend));

    let _echo = store.subscribe(|state| {
        tracing::info!(format = %state.selected_format, "Preferences changed");
    });

    match cli.command {
        Command::Dispatch {
            command,
            title,
            url,
            tab_id,
        } => {
            let host = Collaborators {
                tabs: Arc::new(ArgTab(TabInfo {
                    id: Some(tab_id),
                    title,
                    url,
                })),
                clipboard: Arc::new(StdoutClipboard),
                notifier: Arc::new(StderrNotifier),
                overlay: Arc::new(NoOverlay),
            };
            let runner = ActionRunner::new(store, host);
            match runner.dispatch(&command) {
                Some(Outcome::Failed(err)) => anyhow::bail!(err),
                Some(_) => {}
                None => anyhow::bail!("unknown command '{command}'"),
            }
        }
        Command::SetFormat { format } => {
            store.select_format(format)?;
        }
        Command::SetSeparator { separator } => {
            store.set_plain_text_separator(separator)?;
        }
        Command::SetTemplate { format, template } => {
            store.set_template(format, template)?;
        }
        Command::Show => {
            let state = store.get()?;
            println!("selected:  {}", state.selected_format);
            println!("separator: {:?}", state.plain_text_separator);
            for kind in FormatKind::ALL {
                let template = state.templates.get(kind);
                let expanded = expand(
                    template,
                    &Placeholders {
                        title: "Title",
                        url: "https://example.com",
                        separator: &state.plain_text_separator,
                    },
                );
                println!(
                    "{:<10} copies {:?} (template {template:?} -> {expanded:?})",
                    kind.display_name(),
                    preview(kind, &state),
                );
            }
        }
    }
    Ok(())
}
