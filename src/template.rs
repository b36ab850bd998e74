//! Placeholder substitution for user-edited templates
//!
//! Only `{title}`, `{url}` and `{separator}` are recognized. Any other
//! `{name}` token is copied to the output untouched. Substituted values are
//! never scanned again, so a title containing `{url}` stays literal.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::CopyRequest;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Title,
    Url,
    Separator,
}

impl Placeholder {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Url => "url",
            Self::Separator => "separator",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "url" => Some(Self::Url),
            "separator" => Some(Self::Separator),
            _ => None,
        }
    }
}

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub separator: &'a str,
}

impl<'a> Placeholders<'a> {
    #[must_use]
    pub fn from_request(request: &'a CopyRequest, separator: &'a str) -> Self {
        Self {
            title: &request.title,
            url: &request.url,
            separator,
        }
    }

    const fn value(&self, placeholder: Placeholder) -> &'a str {
        match placeholder {
            Placeholder::Title => self.title,
            Placeholder::Url => self.url,
            Placeholder::Separator => self.separator,
        }
    }
}

/// Expand the recognized placeholders in `template`
#[must_use]
pub fn expand(template: &str, values: &Placeholders<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            Placeholder::from_name(&caps[1])
                .map_or_else(|| caps[0].to_string(), |p| values.value(p).to_string())
        })
        .into_owned()
}

/// Recognized placeholders used by `template`, in order of first use
#[must_use]
pub fn placeholders_in(template: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        if let Some(placeholder) = Placeholder::from_name(&caps[1])
            && !found.contains(&placeholder)
        {
            found.push(placeholder);
        }
    }
    found
}
