//! Shared helpers for tests: a scriptable HTTP transport and a small site.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::fetch::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::store::{MemoryStore, Post};
use crate::types::PostId;

/// One canned response.
#[derive(Clone)]
pub struct Page {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Page {
    pub fn html(body: impl Into<String>) -> Self {
        Page {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.into(),
        }
    }

    pub fn status_only(status: u16) -> Self {
        Page {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

/// Serves scripted pages; unknown URLs answer 404. Callback POSTs are
/// recorded.
#[derive(Default)]
pub struct PageTransport {
    pages: Mutex<HashMap<String, Page>>,
    callbacks: Mutex<Vec<(Url, serde_json::Value)>>,
}

impl PageTransport {
    pub fn serve(&self, url: &str, page: Page) {
        self.pages.lock().unwrap().insert(url.to_string(), page);
    }

    pub fn recorded_callbacks(&self) -> Vec<(Url, serde_json::Value)> {
        self.callbacks.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for PageTransport {
    async fn get(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let page = self.pages.lock().unwrap().get(req.url.as_str()).cloned();
        match page {
            Some(page) => Ok(HttpResponse {
                status: page.status,
                headers: page.headers,
                body: page.body.into_bytes(),
                final_url: req.url,
            }),
            None => Ok(HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: Vec::new(),
                final_url: req.url,
            }),
        }
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        _user_agent: &str,
    ) -> Result<u16, TransportError> {
        self.callbacks
            .lock()
            .unwrap()
            .push((url.clone(), body.clone()));
        Ok(200)
    }
}

/// A store with one post under its usual aliases.
pub fn site_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_post(
        Post::new(PostId(1), "/note/2020/01/05/a1")
            .with_short_path("/n/Ab3x")
            .with_historic_path("/2020/01/05/a1"),
    );
    store
}
