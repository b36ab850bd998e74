//! Copy formats and the persisted preference record

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownFormatKind;

/// Separator placed between title and url in plain text
pub const DEFAULT_SEPARATOR: &str = " ";

/// The output shapes a copy can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Plain,
    Markdown,
    Html,
    Csv,
}

impl FormatKind {
    /// Every kind, in the order settings UIs list them
    pub const ALL: [Self; 4] = [Self::Plain, Self::Markdown, Self::Html, Self::Csv];

    /// Name used in storage and on the command line
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Csv => "csv",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Plain => "Plain text",
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::Csv => "CSV",
        }
    }

    /// Built-in template for this kind
    #[must_use]
    pub const fn default_template(self) -> &'static str {
        match self {
            Self::Plain => "{title}{separator}{url}",
            Self::Markdown => "[{title}]({url})",
            Self::Html => "<a href=\"{url}\">{title}</a>",
            Self::Csv => "\"{title}\",\"{url}\"",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKind {
    type Err = UnknownFormatKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFormatKind(s.to_string()))
    }
}

/// The stored format selection.
///
/// Records written by newer or broken clients may name a format this build
/// does not know. The name is kept verbatim so it survives a round trip, and
/// the renderer falls back to a plain `title url` line for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(from = "String", into = "String")]
pub enum SelectedFormat {
    Known { kind: FormatKind },
    Unrecognized { name: String },
}

impl SelectedFormat {
    /// The known kind, if any
    #[must_use]
    pub const fn kind(&self) -> Option<FormatKind> {
        match self {
            Self::Known { kind } => Some(*kind),
            Self::Unrecognized { .. } => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known { kind } => kind.as_str(),
            Self::Unrecognized { name } => name,
        }
    }
}

impl Default for SelectedFormat {
    fn default() -> Self {
        FormatKind::Markdown.into()
    }
}

impl From<FormatKind> for SelectedFormat {
    fn from(kind: FormatKind) -> Self {
        Self::Known { kind }
    }
}

impl From<String> for SelectedFormat {
    fn from(name: String) -> Self {
        match name.parse::<FormatKind>() {
            Ok(kind) => Self::Known { kind },
            Err(_) => Self::Unrecognized { name },
        }
    }
}

impl From<SelectedFormat> for String {
    fn from(selected: SelectedFormat) -> Self {
        match selected {
            SelectedFormat::Known { kind } => kind.as_str().to_string(),
            SelectedFormat::Unrecognized { name } => name,
        }
    }
}

impl fmt::Display for SelectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One editable template per format kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Templates {
    pub plain: String,
    pub markdown: String,
    pub html: String,
    pub csv: String,
}

impl Templates {
    #[must_use]
    pub fn get(&self, kind: FormatKind) -> &str {
        match kind {
            FormatKind::Plain => &self.plain,
            FormatKind::Markdown => &self.markdown,
            FormatKind::Html => &self.html,
            FormatKind::Csv => &self.csv,
        }
    }

    pub fn set(&mut self, kind: FormatKind, template: impl Into<String>) {
        let slot = match kind {
            FormatKind::Plain => &mut self.plain,
            FormatKind::Markdown => &mut self.markdown,
            FormatKind::Html => &mut self.html,
            FormatKind::Csv => &mut self.csv,
        };
        *slot = template.into();
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            plain: FormatKind::Plain.default_template().to_string(),
            markdown: FormatKind::Markdown.default_template().to_string(),
            html: FormatKind::Html.default_template().to_string(),
            csv: FormatKind::Csv.default_template().to_string(),
        }
    }
}

/// The single persisted record governing copy behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceState {
    pub selected_format: SelectedFormat,
    pub templates: Templates,
    /// Only used when `selected_format` is plain; may be empty or multi-line
    pub plain_text_separator: String,
}

impl PreferenceState {
    #[must_use]
    pub fn with_format(mut self, selected: impl Into<SelectedFormat>) -> Self {
        self.selected_format = selected.into();
        self
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.plain_text_separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_template(mut self, kind: FormatKind, template: impl Into<String>) -> Self {
        self.templates.set(kind, template);
        self
    }
}

impl Default for PreferenceState {
    fn default() -> Self {
        Self {
            selected_format: SelectedFormat::default(),
            templates: Templates::default(),
            plain_text_separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Title and url captured from a tab at the moment of a copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct CopyRequest {
    pub title: String,
    pub url: String,
}

impl CopyRequest {
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}
