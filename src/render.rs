//! Turns a captured title/url pair into the text placed on the clipboard
//!
//! Markdown, HTML and CSV have a fixed shape instead of going through the
//! stored templates; only plain text is user-tunable, through the separator.
//! Title and url are inserted verbatim without escaping.

use crate::models::{CopyRequest, FormatKind, PreferenceState};

pub const SAMPLE_TITLE: &str = "Title";
pub const SAMPLE_URL: &str = "https://example.com";

/// Render `request` with the format selected in `state`
#[must_use]
pub fn render(request: &CopyRequest, state: &PreferenceState) -> String {
    render_kind(
        state.selected_format.kind(),
        request,
        &state.plain_text_separator,
    )
}

/// The url on its own
#[must_use]
pub fn render_url_only(request: &CopyRequest) -> String {
    request.url.clone()
}

/// What `kind` produces for a sample page, for settings previews
#[must_use]
pub fn preview(kind: FormatKind, state: &PreferenceState) -> String {
    let sample = CopyRequest::new(SAMPLE_TITLE, SAMPLE_URL);
    render_kind(Some(kind), &sample, &state.plain_text_separator)
}

fn render_kind(kind: Option<FormatKind>, request: &CopyRequest, separator: &str) -> String {
    let CopyRequest { title, url } = request;
    match kind {
        Some(FormatKind::Plain) => format!("{title}{separator}{url}"),
        Some(FormatKind::Markdown) => format!("[{title}]({url})"),
        Some(FormatKind::Html) => format!("<a href=\"{url}\">{title}</a>"),
        Some(FormatKind::Csv) => format!("\"{title}\",\"{url}\""),
        None => format!("{title} {url}"),
    }
}
