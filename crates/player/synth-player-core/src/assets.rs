//! Asset sources: resolve a locator to text without blocking the host tick.
//!
//! A request either completes immediately (local files, in-memory assets) or
//! hands back a [`PendingFetch`] that the channel driver polls once per tick.

use std::fs;
use std::path::{Path, PathBuf};
use std::task::Poll;

use hashbrown::HashMap;
use log::debug;

use crate::error::FetchError;

/// An in-flight fetch, polled cooperatively from `Engine::update`.
pub trait PendingFetch {
    fn poll_fetch(&mut self) -> Poll<Result<String, FetchError>>;
}

/// Result of asking an [`AssetSource`] for a locator.
pub enum FetchRequest {
    Ready(Result<String, FetchError>),
    Pending(Box<dyn PendingFetch>),
}

impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchRequest::Ready(r) => f.debug_tuple("Ready").field(r).finish(),
            FetchRequest::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Anything that can turn a locator (path or URL) into text.
pub trait AssetSource {
    fn request(&mut self, locator: &str) -> FetchRequest;
}

/// `http://` and `https://` locators are fetched over the network.
pub fn is_network_locator(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Synchronous reads relative to a root directory.
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read(&self, locator: &str) -> Result<String, FetchError> {
        if locator.is_empty() {
            return Err(FetchError::EmptyLocator);
        }
        let path = self.root.join(locator);
        if !path.is_file() {
            return Err(FetchError::NotFound {
                locator: locator.to_string(),
            });
        }
        debug!("reading asset {}", path.display());
        fs::read_to_string(&path).map_err(|source| FetchError::Io {
            locator: locator.to_string(),
            source,
        })
    }
}

impl AssetSource for FileSource {
    fn request(&mut self, locator: &str) -> FetchRequest {
        FetchRequest::Ready(self.read(locator))
    }
}

/// In-memory assets, optionally answering only after a number of polls.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    assets: HashMap<String, String>,
    latency_ticks: u32,
    requests: usize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request stay pending for `ticks` polls before resolving.
    pub fn with_latency(mut self, ticks: u32) -> Self {
        self.latency_ticks = ticks;
        self
    }

    pub fn with_asset(mut self, locator: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(locator, text);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, text: impl Into<String>) {
        self.assets.insert(locator.into(), text.into());
    }

    pub fn remove(&mut self, locator: &str) -> Option<String> {
        self.assets.remove(locator)
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests
    }

    fn lookup(&self, locator: &str) -> Result<String, FetchError> {
        if locator.is_empty() {
            return Err(FetchError::EmptyLocator);
        }
        self.assets
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                locator: locator.to_string(),
            })
    }
}

impl AssetSource for MemorySource {
    fn request(&mut self, locator: &str) -> FetchRequest {
        self.requests += 1;
        let result = self.lookup(locator);
        if self.latency_ticks == 0 {
            return FetchRequest::Ready(result);
        }
        FetchRequest::Pending(Box::new(Deferred {
            locator: locator.to_string(),
            remaining: self.latency_ticks,
            result: Some(result),
        }))
    }
}

/// A result held back for a fixed number of polls.
struct Deferred {
    locator: String,
    remaining: u32,
    result: Option<Result<String, FetchError>>,
}

impl PendingFetch for Deferred {
    fn poll_fetch(&mut self) -> Poll<Result<String, FetchError>> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Poll::Pending;
        }
        Poll::Ready(self.result.take().unwrap_or_else(|| {
            Err(FetchError::Disconnected {
                locator: self.locator.clone(),
            })
        }))
    }
}

/// Local files under a root, network locators over HTTP when the `http`
/// feature is enabled.
#[derive(Debug)]
pub struct StreamingAssets {
    files: FileSource,
    #[cfg(feature = "http")]
    http: HttpSource,
}

impl StreamingAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            files: FileSource::new(root),
            #[cfg(feature = "http")]
            http: HttpSource::new(),
        }
    }

    #[cfg(feature = "http")]
    fn request_network(&mut self, locator: &str) -> FetchRequest {
        self.http.request(locator)
    }

    #[cfg(not(feature = "http"))]
    fn request_network(&mut self, locator: &str) -> FetchRequest {
        FetchRequest::Ready(Err(FetchError::UnsupportedScheme {
            locator: locator.to_string(),
        }))
    }
}

impl AssetSource for StreamingAssets {
    fn request(&mut self, locator: &str) -> FetchRequest {
        if is_network_locator(locator) {
            self.request_network(locator)
        } else {
            self.files.request(locator)
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use std::sync::mpsc::{self, Receiver, TryRecvError};
    use std::task::Poll;
    use std::thread;

    use log::debug;

    use super::{AssetSource, FetchRequest, PendingFetch};
    use crate::error::FetchError;

    /// GET requests on a worker thread; the tick only polls a channel.
    #[derive(Clone, Debug, Default)]
    pub struct HttpSource {
        client: reqwest::blocking::Client,
    }

    impl HttpSource {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn get(client: &reqwest::blocking::Client, url: &str) -> Result<String, FetchError> {
        let http_err = |reason: String| FetchError::Http {
            locator: url.to_string(),
            reason,
        };
        let response = client.get(url).send().map_err(|e| http_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(http_err(format!("HTTP {}", response.status())));
        }
        response.text().map_err(|e| http_err(e.to_string()))
    }

    impl AssetSource for HttpSource {
        fn request(&mut self, locator: &str) -> FetchRequest {
            let (tx, rx) = mpsc::channel();
            let client = self.client.clone();
            let url = locator.to_string();
            debug!("fetching {url}");
            thread::spawn(move || {
                let _ = tx.send(get(&client, &url));
            });
            FetchRequest::Pending(Box::new(HttpFetch {
                locator: locator.to_string(),
                rx,
            }))
        }
    }

    struct HttpFetch {
        locator: String,
        rx: Receiver<Result<String, FetchError>>,
    }

    impl PendingFetch for HttpFetch {
        fn poll_fetch(&mut self) -> Poll<Result<String, FetchError>> {
            match self.rx.try_recv() {
                Ok(result) => Poll::Ready(result),
                Err(TryRecvError::Empty) => Poll::Pending,
                Err(TryRecvError::Disconnected) => Poll::Ready(Err(FetchError::Disconnected {
                    locator: self.locator.clone(),
                })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_resolves_immediately_without_latency() {
        let mut src = MemorySource::new().with_asset("a.txt", "0_1");
        match src.request("a.txt") {
            FetchRequest::Ready(Ok(text)) => assert_eq!(text, "0_1"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            src.request("missing.txt"),
            FetchRequest::Ready(Err(FetchError::NotFound { .. }))
        ));
        assert!(matches!(
            src.request(""),
            FetchRequest::Ready(Err(FetchError::EmptyLocator))
        ));
        assert_eq!(src.request_count(), 3);
    }

    #[test]
    fn latency_defers_the_result() {
        let mut src = MemorySource::new().with_latency(2).with_asset("a", "x");
        let FetchRequest::Pending(mut pending) = src.request("a") else {
            panic!("expected a pending fetch");
        };
        assert!(pending.poll_fetch().is_pending());
        assert!(pending.poll_fetch().is_pending());
        match pending.poll_fetch() {
            Poll::Ready(Ok(text)) => assert_eq!(text, "x"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            pending.poll_fetch(),
            Poll::Ready(Err(FetchError::Disconnected { .. }))
        ));
    }

    #[test]
    fn network_locators_are_detected() {
        assert!(is_network_locator("https://example.com/a.txt"));
        assert!(is_network_locator("http://example.com/a.txt"));
        assert!(!is_network_locator("Audio/a.txt"));
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn network_locators_need_the_http_feature() {
        let mut src = StreamingAssets::new(".");
        assert!(matches!(
            src.request("https://example.com/curve.txt"),
            FetchRequest::Ready(Err(FetchError::UnsupportedScheme { .. }))
        ));
    }
}
