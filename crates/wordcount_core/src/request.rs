use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Message used whenever an input source is rejected.
///
/// It never says why, so callers cannot probe which paths exist on the host.
pub const INCORRECT_INPUT: &str = "Incorrect input.";

/// Where the text to count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    String,
    File,
    Url,
}

impl FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(InputKind::String),
            "file" => Ok(InputKind::File),
            "url" => Ok(InputKind::Url),
            other => Err(format!("Unsupported input type: {other}.")),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::String => write!(f, "string"),
            InputKind::File => write!(f, "file"),
            InputKind::Url => write!(f, "url"),
        }
    }
}

/// A validated request to count the words of one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountRequest {
    Text(String),
    File(PathBuf),
    Url(Url),
}

impl CountRequest {
    pub fn kind(&self) -> InputKind {
        match self {
            CountRequest::Text(_) => InputKind::String,
            CountRequest::File(_) => InputKind::File,
            CountRequest::Url(_) => InputKind::Url,
        }
    }

    /// Short description for logs. Text inputs are reported by length only.
    pub fn describe(&self) -> String {
        match self {
            CountRequest::Text(text) => format!("string ({} bytes)", text.len()),
            CountRequest::File(path) => format!("file {}", path.display()),
            CountRequest::Url(url) => format!("url {url}"),
        }
    }
}

/// Every problem found with a request, in the order they were detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid request: {}", .messages.join(" "))]
pub struct ValidationErrors {
    pub messages: Vec<String>,
}

impl ValidationErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

/// Checks a raw `(input, kind)` pair before any I/O happens.
///
/// Whether a file actually exists is checked later by the engine, since that
/// needs the file system.
pub fn validate_request(
    input: Option<&str>,
    kind: Option<&str>,
) -> Result<CountRequest, ValidationErrors> {
    let mut messages = Vec::new();

    let input = input.filter(|value| !value.trim().is_empty());
    if input.is_none() {
        messages.push("Input is missing.".to_string());
    }

    let kind = match kind.map(str::trim).filter(|value| !value.is_empty()) {
        None => {
            messages.push("Input type is missing.".to_string());
            None
        }
        Some(raw) => match raw.parse::<InputKind>() {
            Ok(kind) => Some(kind),
            Err(message) => {
                messages.push(message);
                None
            }
        },
    };

    let (Some(input), Some(kind)) = (input, kind) else {
        return Err(ValidationErrors { messages });
    };

    match kind {
        InputKind::String => Ok(CountRequest::Text(input.to_string())),
        InputKind::File => Ok(CountRequest::File(PathBuf::from(input.trim()))),
        InputKind::Url => parse_http_url(input.trim())
            .map(CountRequest::Url)
            .ok_or_else(|| ValidationErrors::single(INCORRECT_INPUT)),
    }
}

fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("URL".parse::<InputKind>(), Ok(InputKind::Url));
        assert_eq!(" file ".parse::<InputKind>(), Ok(InputKind::File));
        assert!("ftp".parse::<InputKind>().is_err());
    }

    #[test]
    fn kind_display_round_trips() {
        for kind in [InputKind::String, InputKind::File, InputKind::Url] {
            assert_eq!(kind.to_string().parse::<InputKind>(), Ok(kind));
        }
    }

    #[test]
    fn describe_hides_text_content() {
        let request = CountRequest::Text("secret words".to_string());
        assert_eq!(request.describe(), "string (12 bytes)");
    }
}
