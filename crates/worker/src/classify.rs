//! Request classification.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. non-GET or cross-origin -> passthrough
//! 2. `/api/` prefix -> [`RequestClass::Api`]
//! 3. static prefix (`/fonts/`, `/optimized/`) -> [`RequestClass::StaticAsset`]
//! 4. image extension -> [`RequestClass::Image`]
//! 5. no extension or `.html` -> [`RequestClass::HtmlNavigation`]
//! 6. anything else -> [`RequestClass::Other`]

use serde::{Deserialize, Serialize};
use sp1sh_core::Request;
use url::Url;

const API_PREFIX: &str = "/api/";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp", "avif"];

/// Resource class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Api,
    StaticAsset,
    Image,
    HtmlNavigation,
    Other,
}

/// What the dispatcher does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", tag = "route", content = "class")]
pub enum Route {
    /// Not ours to cache: forwarded to the network untouched.
    Passthrough,
    Intercept(RequestClass),
}

impl Route {
    pub fn class(&self) -> Option<RequestClass> {
        match self {
            Route::Passthrough => None,
            Route::Intercept(class) => Some(*class),
        }
    }
}

/// Maps requests to routes for one origin.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    static_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(origin: Url, static_prefixes: Vec<String>) -> Self {
        Self { origin, static_prefixes }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Classify a request. Pure and total.
    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_get() || request.url.origin() != self.origin.origin() {
            return Route::Passthrough;
        }
        Route::Intercept(self.classify_path(request.url.path()))
    }

    fn classify_path(&self, path: &str) -> RequestClass {
        if path.starts_with(API_PREFIX) {
            return RequestClass::Api;
        }

        if self.static_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return RequestClass::StaticAsset;
        }

        match extension(path) {
            Some(ext) if IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)) => RequestClass::Image,
            None => RequestClass::HtmlNavigation,
            Some(ext) if ext.eq_ignore_ascii_case("html") => RequestClass::HtmlNavigation,
            Some(_) => RequestClass::Other,
        }
    }
}

/// Extension of the last path segment, if it has one.
fn extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}
