use crate::config::{DocumentLocation, HttpConfig, StoreBackend, StoreConfig};
use crate::dataset::Dataset;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Whole-document blob store keyed by collection and key.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// `Ok(None)` when no document has been written yet.
    async fn get(&self, location: &DocumentLocation) -> Result<Option<String>>;

    /// Replace the document. On error the previous document must be intact.
    async fn put(&self, location: &DocumentLocation, document: String) -> Result<()>;
}

/// Read a dataset; a document that does not exist yet is an empty dataset.
pub async fn load_dataset(store: &dyn DatasetStore, location: &DocumentLocation) -> Result<Dataset> {
    match store.get(location).await? {
        Some(text) => {
            let dataset = Dataset::from_json(&text).map_err(|e| {
                ScraperError::store(&location.collection, &location.key, format!("unreadable document: {}", e))
            })?;
            debug!(collection = %location.collection, key = %location.key, observations = dataset.len(), "loaded dataset");
            Ok(dataset)
        }
        None => {
            info!(collection = %location.collection, key = %location.key, "no stored dataset yet, starting empty");
            Ok(Dataset::new())
        }
    }
}

pub async fn save_dataset(
    store: &dyn DatasetStore,
    location: &DocumentLocation,
    dataset: &Dataset,
) -> Result<()> {
    let text = dataset.to_json()?;
    store.put(location, text).await
}

/// Build the configured backend. Network backends share the `[http]` timeouts.
pub fn build_store(config: &StoreConfig, http: &HttpConfig) -> Result<Arc<dyn DatasetStore>> {
    match config.backend {
        StoreBackend::Fs => Ok(Arc::new(FsDatasetStore::new(config.root.clone()))),
        StoreBackend::Memory => Ok(Arc::new(InMemoryDatasetStore::new())),
        StoreBackend::Http => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                ScraperError::Config("store.base_url is required for the http backend".into())
            })?;
            let token = std::env::var(&config.token_env).ok();
            Ok(Arc::new(HttpObjectStore::new(base_url, token, http)?))
        }
    }
}

/// Documents as files under `<root>/<collection>/<key>`.
pub struct FsDatasetStore {
    root: PathBuf,
}

impl FsDatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, location: &DocumentLocation) -> PathBuf {
        self.root.join(&location.collection).join(&location.key)
    }
}

#[async_trait]
impl DatasetStore for FsDatasetStore {
    async fn get(&self, location: &DocumentLocation) -> Result<Option<String>> {
        let path = self.path_for(location);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScraperError::store(&location.collection, &location.key, e.to_string())),
        }
    }

    async fn put(&self, location: &DocumentLocation, document: String) -> Result<()> {
        let path = self.path_for(location);
        write_atomically(&path, document.as_bytes())
            .await
            .map_err(|e| ScraperError::store(&location.collection, &location.key, e.to_string()))?;
        debug!(path = %path.display(), bytes = document.len(), "wrote dataset");
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    tokio::fs::rename(&tmp, path).await
}

/// Process-local store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryDatasetStore {
    documents: Mutex<HashMap<(String, String), String>>,
    puts: Mutex<usize>,
}

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(location: &DocumentLocation, document: &str) -> Self {
        let store = Self::new();
        store.insert(location, document);
        store
    }

    pub fn insert(&self, location: &DocumentLocation, document: &str) {
        if let Ok(mut docs) = self.documents.lock() {
            docs.insert(
                (location.collection.clone(), location.key.clone()),
                document.to_string(),
            );
        }
    }

    pub fn document(&self, location: &DocumentLocation) -> Option<String> {
        self.documents
            .lock()
            .ok()?
            .get(&(location.collection.clone(), location.key.clone()))
            .cloned()
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.lock().map(|p| *p).unwrap_or_default()
    }
}

#[async_trait]
impl DatasetStore for InMemoryDatasetStore {
    async fn get(&self, location: &DocumentLocation) -> Result<Option<String>> {
        Ok(self.document(location))
    }

    async fn put(&self, location: &DocumentLocation, document: String) -> Result<()> {
        let mut docs = self
            .documents
            .lock()
            .map_err(|_| ScraperError::store(&location.collection, &location.key, "store lock poisoned"))?;
        docs.insert((location.collection.clone(), location.key.clone()), document);
        if let Ok(mut puts) = self.puts.lock() {
            *puts += 1;
        }
        Ok(())
    }
}

/// Object storage over plain HTTP: `GET`/`PUT <base_url>/<collection>/<key>`.
///
/// Works with S3-compatible gateways and Supabase storage when given a
/// bearer token.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(base_url: String, token: Option<String>, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout())
            .timeout(http.read_timeout())
            .user_agent(http.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn object_url(&self, location: &DocumentLocation) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            location.collection.trim_matches('/'),
            location.key.trim_start_matches('/')
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req
                .header("Authorization", format!("Bearer {}", token))
                .header("apikey", token.clone()),
            None => req,
        }
    }
}

#[async_trait]
impl DatasetStore for HttpObjectStore {
    async fn get(&self, location: &DocumentLocation) -> Result<Option<String>> {
        let fail = |msg: String| ScraperError::store(&location.collection, &location.key, msg);
        let resp = self
            .authorize(self.client.get(self.object_url(location)))
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(fail(format!("object get failed: {}", status)));
        }
        let text = resp.text().await.map_err(|e| fail(e.to_string()))?;
        Ok(Some(text))
    }

    async fn put(&self, location: &DocumentLocation, document: String) -> Result<()> {
        let fail = |msg: String| ScraperError::store(&location.collection, &location.key, msg);
        let resp = self
            .authorize(self.client.put(self.object_url(location)))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("x-upsert", "true")
            .body(document)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(fail(format!("object put failed: {} - {}", status, body)));
        }
        Ok(())
    }
}
