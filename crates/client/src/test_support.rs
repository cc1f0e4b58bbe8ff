//! Scripted network used by the strategy and worker tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use swcache_core::Error;

use crate::fetch::Network;
use crate::request::Request;
use crate::response::Response;

pub(crate) const ORIGIN: &str = "https://site.test";

pub(crate) fn url(path: &str) -> url::Url {
    url::Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Serves scripted responses by full URL; anything unscripted is rejected
/// as if the device were offline. Fragments are dropped before matching,
/// as they are on the wire.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(url(path).to_string(), response);
    }

    pub(crate) fn respond_ok(&self, path: &str, body: &str) {
        self.respond(path, Response::basic(url(path).as_str(), 200, body.to_string()));
    }

    /// Drop a scripted route so later fetches of it are rejected.
    pub(crate) fn go_offline(&self, path: &str) {
        self.routes.lock().unwrap().remove(url(path).as_str());
    }

    pub(crate) fn calls_for(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|c| **c == target).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let mut wire_url = request.url.clone();
        wire_url.set_fragment(None);
        let target = wire_url.to_string();
        self.calls.lock().unwrap().push(target.clone());
        tokio::task::yield_now().await;

        let scripted = self.routes.lock().unwrap().get(&target).cloned();
        scripted.ok_or_else(|| Error::Network(format!("offline: {target}")))
    }
}
