use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use counter_logging::engine_debug;
use encoding_rs::{Encoding, UTF_8};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::source::ByteStream;
use crate::{FailureKind, FetchMetadata, SourceError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted media types; an empty list accepts anything.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 64 * 1024 * 1024,
            allowed_content_types: vec![
                "text/plain".to_string(),
                "text/html".to_string(),
                "text/markdown".to_string(),
                "text/csv".to_string(),
            ],
        }
    }
}

/// A response whose headers were accepted and whose body is still streaming.
pub struct FetchedBody {
    pub metadata: FetchMetadata,
    /// Charset declared by the response, UTF-8 when absent or unknown.
    pub encoding: &'static Encoding,
    pub body: ByteStream,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn open(&self, url: &Url) -> Result<FetchedBody, SourceError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, SourceError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| SourceError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        if self.settings.allowed_content_types.is_empty() {
            return true;
        }
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn open(&self, url: &Url) -> Result<FetchedBody, SourceError> {
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        let content_length = response.content_length();
        if let Some(content_len) = content_length {
            if content_len > max_bytes {
                return Err(SourceError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(SourceError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url: response.url().to_string(),
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            content_length,
        };
        let encoding = encoding_for_content_type(metadata.content_type.as_deref());
        engine_debug!(
            "Streaming {} ({:?}, decoding as {})",
            metadata.final_url,
            metadata.content_type,
            encoding.name()
        );

        let mut received: u64 = 0;
        let body = response.bytes_stream().map(move |chunk| {
            let chunk = chunk.map_err(map_reqwest_error)?;
            received += chunk.len() as u64;
            if received > max_bytes {
                return Err(SourceError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(received),
                    },
                    "response too large",
                ));
            }
            Ok(chunk)
        });

        Ok(FetchedBody {
            metadata,
            encoding,
            body: body.boxed(),
        })
    }
}

/// Resolves the `charset` parameter of a Content-Type header, falling back to UTF-8.
pub fn encoding_for_content_type(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(extract_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

fn extract_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
    })
}

fn map_reqwest_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        return SourceError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return SourceError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    SourceError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parameter_selects_encoding() {
        let enc = encoding_for_content_type(Some("text/plain; charset=UTF-16LE"));
        assert_eq!(enc, encoding_rs::UTF_16LE);
        let enc = encoding_for_content_type(Some("text/html;Charset=\"iso-8859-1\""));
        assert_eq!(enc, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn missing_or_unknown_charset_is_utf8() {
        assert_eq!(encoding_for_content_type(None), UTF_8);
        assert_eq!(encoding_for_content_type(Some("text/plain")), UTF_8);
        assert_eq!(encoding_for_content_type(Some("text/plain; charset=klingon")), UTF_8);
    }
}
