// Fetch request/response model shared by the dispatcher, strategies and storage
// Author: storecache contributors

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request headers that make the origin answer `304 Not Modified`.
const CONDITIONAL_HEADERS: &[&str] = &[
    "if-none-match",
    "if-modified-since",
    "if-match",
    "if-unmodified-since",
    "if-range",
];

/// Request mode, as reported by `Sec-Fetch-Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
    Websocket,
}

impl RequestMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => Some(Self::Navigate),
            "same-origin" => Some(Self::SameOrigin),
            "no-cors" => Some(Self::NoCors),
            "cors" => Some(Self::Cors),
            "websocket" => Some(Self::Websocket),
            _ => None,
        }
    }
}

/// Request destination, as reported by `Sec-Fetch-Dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Style,
    Script,
    Worker,
    Image,
    Font,
    Manifest,
    Video,
    Audio,
    /// `empty` or anything we do not classify.
    Other,
}

impl Destination {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Self::Document,
            "style" => Self::Style,
            "script" => Self::Script,
            "worker" | "sharedworker" | "serviceworker" => Self::Worker,
            "image" => Self::Image,
            "font" => Self::Font,
            "manifest" => Self::Manifest,
            "video" => Self::Video,
            "audio" => Self::Audio,
            _ => Self::Other,
        }
    }

    /// Guess the destination from the extension of a URL path.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        let Some((_, ext)) = file.rsplit_once('.') else {
            return Self::Other;
        };

        match ext.to_ascii_lowercase().as_str() {
            "css" => Self::Style,
            "js" | "mjs" => Self::Script,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif" | "ico" | "bmp" => Self::Image,
            "woff" | "woff2" | "ttf" | "otf" => Self::Font,
            "webmanifest" => Self::Manifest,
            "mp4" | "webm" => Self::Video,
            "mp3" | "ogg" | "wav" => Self::Audio,
            "html" | "htm" => Self::Document,
            _ => Self::Other,
        }
    }
}

/// A request as seen by the cache manager.
///
/// `url` is origin-relative: path plus query, never a fragment.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    pub mode: Option<RequestMode>,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchRequest {
    /// A plain GET with no mode and a destination inferred from the path.
    pub fn get(url: impl Into<String>) -> Self {
        let url = normalize_url(&url.into());
        Self {
            method: "GET".to_string(),
            destination: Destination::from_path(&url),
            url,
            mode: None,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Build a request from what arrived on the wire.
    ///
    /// Mode and destination come from `Sec-Fetch-Mode` / `Sec-Fetch-Dest`.
    /// Browsers omit those on plain-HTTP origins, so a missing mode is
    /// inferred as navigation for a GET accepting HTML, and a missing
    /// destination is inferred from the path extension.
    pub fn from_http(method: &str, url: &str, headers: Vec<(String, String)>, body: Bytes) -> Self {
        let url = normalize_url(url);
        let method = method.to_ascii_uppercase();
        let find = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        };

        let mode = match find("sec-fetch-mode") {
            Some(value) => RequestMode::parse(value),
            None if method == "GET" && find("accept").is_some_and(|a| a.contains("text/html")) => {
                Some(RequestMode::Navigate)
            }
            None => None,
        };
        let destination = match find("sec-fetch-dest") {
            Some(value) => Destination::parse(value),
            None if mode == Some(RequestMode::Navigate) => Destination::Document,
            None => Destination::from_path(&url),
        };

        Self {
            method,
            url,
            mode,
            destination,
            headers,
            body,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: Some(RequestMode::Navigate),
            destination: Destination::Document,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The same request made unconditional, so the origin returns a full
    /// response instead of `304 Not Modified`.
    pub fn without_conditionals(mut self) -> Self {
        self.headers
            .retain(|(k, _)| !CONDITIONAL_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(k)));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == Some(RequestMode::Navigate)
    }

    /// The path component of the URL, without the query string.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or("/")
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.method, &self.url)
    }
}

/// Identity of a cached request: method plus origin-relative URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: normalize_url(url),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response as seen by the cache manager.
///
/// `status == 0` is the network-error indicator: the response a strategy
/// returns when it has nothing to serve but must not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Minimal response synthesized when navigation has no network and no
    /// cached fallback document.
    pub fn offline() -> Self {
        Self::new(503, "You are offline").with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn network_error() -> Self {
        Self::new(0, Bytes::new())
    }

    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Only these responses may be written into a cache store.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Strip the fragment and make sure the URL is rooted.
pub fn normalize_url(url: &str) -> String {
    let url = url.split('#').next().unwrap_or_default();
    if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{}", url)
    }
}
