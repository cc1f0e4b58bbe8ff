//! Intercepted request descriptor.

pub use reqwest::Method;
use std::fmt;
use std::str::FromStr;
use swcache_core::{Error, RequestKey};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// What the requested resource will be used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Image,
    Audio,
    Video,
    Script,
    Style,
    Font,
    Manifest,
    /// Empty destination: fetch(), XHR, beacons.
    #[default]
    Other,
}

impl Destination {
    /// Media destinations are always served cache-first.
    pub fn is_media(&self) -> bool {
        matches!(self, Destination::Image | Destination::Audio | Destination::Video)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Audio => "audio",
            Destination::Video => "video",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Other => "",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "audio" => Ok(Destination::Audio),
            "video" => Ok(Destination::Video),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "other" => Ok(Destination::Other),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// An outgoing fetch seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl Request {
    /// Plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, mode: RequestMode::default(), destination: Destination::default() }
    }

    /// Top-level page load.
    pub fn navigate(url: Url) -> Self {
        Self { method: Method::GET, url, mode: RequestMode::Navigate, destination: Destination::Document }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Only GET requests are looked up in or written to a generation.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }

    /// Request identity used as the store key. Fragments never reach the
    /// server, so they are not part of the identity.
    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey::new(self.method.as_str(), url.as_str())
    }
}
