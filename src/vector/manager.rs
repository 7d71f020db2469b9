use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{BackendInfo, BackendKind, Capability, ConfigItem, VectorBackend};
use crate::embedding::Embedder;
use crate::error::VectorError;

/// Live backend handle shared by callers / 共享的后端句柄
pub type BackendHandle = Arc<dyn VectorBackend>;

/// Everything a factory needs to build a backend / 创建后端所需的上下文
#[derive(Clone)]
pub struct BackendContext {
    /// Backend section of the app config / 后端配置
    pub config: Value,
    /// Shared embedding model (used for dimensions, or by backends that embed internally)
    pub embedder: Arc<dyn Embedder>,
}

/// Backend factory trait / 后端工厂 trait
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Backend identifier / 后端标识
    fn kind(&self) -> BackendKind;

    /// Short description / 描述
    fn description(&self) -> &'static str;

    /// Declared capabilities, known before connecting / 能力声明
    fn capabilities(&self, config: &Value) -> Capability;

    /// Backend specific config items / 后端特有配置项
    fn config_items(&self) -> Vec<ConfigItem>;

    /// Build the client handle (no setup side effects) / 创建客户端
    async fn create_backend(&self, ctx: BackendContext) -> Result<Box<dyn VectorBackend>>;

    /// Generate complete backend info / 生成完整的后端信息
    fn backend_info(&self, config: &Value) -> BackendInfo {
        let kind = self.kind();
        BackendInfo {
            id: kind,
            name: kind.display_name().to_string(),
            description: self.description().to_string(),
            capabilities: self.capabilities(config),
            config_items: self.config_items(),
        }
    }
}

/// Connection registry (one live handle per backend) / 连接注册表
///
/// Constructed once at startup and passed to whoever needs a connection.
/// Cached handles are read without waiting. Creating a handle takes that
/// backend's setup lock across lookup, creation, setup and insertion, so
/// concurrent callers never build two handles for one backend, while other
/// backends stay usable during a slow setup.
#[derive(Clone)]
pub struct ConnectionRegistry {
    factories: Arc<RwLock<HashMap<BackendKind, Arc<dyn BackendFactory>>>>,
    connections: Arc<parking_lot::RwLock<HashMap<BackendKind, BackendHandle>>>,
    setup_locks: Arc<HashMap<BackendKind, Arc<Mutex<()>>>>,
    configs: Arc<HashMap<BackendKind, Value>>,
    embedder: Arc<dyn Embedder>,
}

impl ConnectionRegistry {
    pub fn new(configs: HashMap<BackendKind, Value>, embedder: Arc<dyn Embedder>) -> Self {
        let setup_locks = BackendKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(parking_lot::RwLock::new(HashMap::new())),
            setup_locks: Arc::new(setup_locks),
            configs: Arc::new(configs),
            embedder,
        }
    }

    /// Shared embedder / 共享的向量模型
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Register backend factory / 注册后端工厂
    pub async fn register_factory(&self, factory: Box<dyn BackendFactory>) -> Result<()> {
        let kind = factory.kind();
        let mut factories = self.factories.write().await;
        factories.insert(kind, Arc::from(factory));

        tracing::info!("Backend factory registered: {}", kind.as_str());
        Ok(())
    }

    fn config_for(&self, kind: BackendKind) -> Value {
        self.configs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    fn cached(&self, kind: BackendKind) -> Option<BackendHandle> {
        self.connections.read().get(&kind).cloned()
    }

    fn setup_lock(&self, kind: BackendKind) -> Arc<Mutex<()>> {
        self.setup_locks
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())))
    }

    /// Get or create the handle for a backend / 获取或创建连接
    pub async fn get_connection(&self, kind: BackendKind) -> Result<BackendHandle> {
        if let Some(handle) = self.cached(kind) {
            return Ok(handle);
        }

        let lock = self.setup_lock(kind);
        let _setup = lock.lock().await;
        // Another caller may have finished setup while we waited
        if let Some(handle) = self.cached(kind) {
            return Ok(handle);
        }

        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(&kind)
                .cloned()
                .ok_or_else(|| VectorError::UnknownBackend(kind.as_str().to_string()))?
        };

        let ctx = BackendContext {
            config: self.config_for(kind),
            embedder: self.embedder.clone(),
        };

        let backend = match factory.create_backend(ctx).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!("Backend creation failed: {} - {:#}", kind.as_str(), e);
                return Err(e);
            }
        };

        if let Err(e) = backend.ensure_ready().await {
            tracing::error!("Backend setup failed: {} - {:#}", kind.as_str(), e);
            return Err(e).with_context(|| format!("setting up {}", kind.display_name()));
        }

        let handle: BackendHandle = Arc::from(backend);
        self.connections.write().insert(kind, handle.clone());
        tracing::info!("Backend connected: {}", kind.as_str());
        Ok(handle)
    }

    /// Whether a handle is live / 是否已连接
    pub async fn is_connected(&self, kind: BackendKind) -> bool {
        self.connections.read().contains_key(&kind)
    }

    /// List live handles / 列出已连接后端
    pub async fn connected(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<BackendKind> = self.connections.read().keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Drop a handle and run its close hook / 关闭连接
    ///
    /// Waits for a setup of the same backend in progress. Returns false when
    /// nothing was connected.
    pub async fn close(&self, kind: BackendKind) -> Result<bool> {
        let lock = self.setup_lock(kind);
        let _setup = lock.lock().await;

        let handle = self.connections.write().remove(&kind);
        match handle {
            Some(handle) => {
                handle.close().await?;
                tracing::info!("Backend closed: {}", kind.as_str());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every live handle, logging failures / 关闭全部连接
    pub async fn close_all(&self) {
        let handles: Vec<(BackendKind, BackendHandle)> =
            self.connections.write().drain().collect();
        for (kind, handle) in handles {
            if let Err(e) = handle.close().await {
                tracing::warn!("Failed to close backend {}: {:#}", kind.as_str(), e);
            }
        }
    }

    /// Information for every registered backend / 所有已注册后端的信息
    pub async fn backend_infos(&self) -> Vec<BackendInfo> {
        let factories = self.factories.read().await;
        let mut infos: Vec<BackendInfo> = factories
            .values()
            .map(|factory| factory.backend_info(&self.config_for(factory.kind())))
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// List registered backend kinds / 列出已注册类型
    pub async fn list_backend_kinds(&self) -> Vec<BackendKind> {
        let factories = self.factories.read().await;
        let mut kinds: Vec<BackendKind> = factories.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::{ScoreKind, SearchResult};
    use crate::vector::{Record, VectorQuery};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        setups: AtomicUsize,
        closed: AtomicUsize,
    }

    struct CountingBackend {
        kind: BackendKind,
        counters: Arc<Counters>,
        fail_setup: bool,
        setup_delay: Duration,
    }

    #[async_trait]
    impl VectorBackend for CountingBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn capabilities(&self) -> Capability {
            Capability { embeds_text: false, score_kind: ScoreKind::Distance }
        }

        async fn ensure_ready(&self) -> Result<()> {
            self.counters.setups.fetch_add(1, Ordering::SeqCst);
            // Give concurrent callers a chance to race
            tokio::time::sleep(self.setup_delay).await;
            if self.fail_setup {
                return Err(VectorError::ConnectionFailed("unreachable".to_string()).into());
            }
            Ok(())
        }

        async fn write_batch(&self, _records: Vec<Record>) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _query: VectorQuery, _top_k: usize) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingFactory {
        kind: BackendKind,
        counters: Arc<Counters>,
        fail_setup: bool,
        setup_delay: Duration,
    }

    impl CountingFactory {
        fn new(kind: BackendKind, counters: Arc<Counters>) -> Self {
            Self {
                kind,
                counters,
                fail_setup: false,
                setup_delay: Duration::from_millis(10),
            }
        }
    }

    #[async_trait]
    impl BackendFactory for CountingFactory {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn description(&self) -> &'static str {
            "counting test backend"
        }

        fn capabilities(&self, _config: &Value) -> Capability {
            Capability { embeds_text: false, score_kind: ScoreKind::Distance }
        }

        fn config_items(&self) -> Vec<ConfigItem> {
            vec![ConfigItem::new("uri", "string").required()]
        }

        async fn create_backend(&self, _ctx: BackendContext) -> Result<Box<dyn VectorBackend>> {
            self.counters.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingBackend {
                kind: self.kind,
                counters: self.counters.clone(),
                fail_setup: self.fail_setup,
                setup_delay: self.setup_delay,
            }))
        }
    }

    async fn registry_with(fail_setup: bool) -> (ConnectionRegistry, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let registry = ConnectionRegistry::new(HashMap::new(), Arc::new(HashEmbedder::new(16)));
        registry
            .register_factory(Box::new(CountingFactory {
                fail_setup,
                ..CountingFactory::new(BackendKind::Milvus, counters.clone())
            }))
            .await
            .unwrap();
        (registry, counters)
    }

    #[tokio::test]
    async fn test_get_connection_is_cached() {
        let (registry, counters) = registry_with(false).await;

        let first = registry.get_connection(BackendKind::Milvus).await.unwrap();
        let second = registry.get_connection(BackendKind::Milvus).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        assert_eq!(counters.setups.load(Ordering::SeqCst), 1);
        assert!(registry.is_connected(BackendKind::Milvus).await);
    }

    #[tokio::test]
    async fn test_concurrent_get_connection_creates_once() {
        let (registry, counters) = registry_with(false).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_connection(BackendKind::Milvus).await.unwrap() })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(counters.setups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_is_not_cached() {
        let (registry, counters) = registry_with(true).await;

        let err = registry.get_connection(BackendKind::Milvus).await.err().unwrap();
        assert!(matches!(VectorError::find(&err), Some(VectorError::ConnectionFailed(_))));
        assert!(!registry.is_connected(BackendKind::Milvus).await);

        // No retry inside the registry; a new request tries again
        assert!(registry.get_connection(BackendKind::Milvus).await.is_err());
        assert_eq!(counters.setups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let (registry, _) = registry_with(false).await;
        let err = registry.get_connection(BackendKind::Pinecone).await.err().unwrap();
        assert!(matches!(VectorError::find(&err), Some(VectorError::UnknownBackend(_))));
    }

    #[tokio::test]
    async fn test_close_then_reconnect() {
        let (registry, counters) = registry_with(false).await;

        let first = registry.get_connection(BackendKind::Milvus).await.unwrap();
        assert!(registry.close(BackendKind::Milvus).await.unwrap());
        assert!(!registry.close(BackendKind::Milvus).await.unwrap());
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);

        let second = registry.get_connection(BackendKind::Milvus).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(counters.setups.load(Ordering::SeqCst), 2);

        registry.close_all().await;
        assert!(registry.connected().await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_infos() {
        let (registry, _) = registry_with(false).await;
        let infos = registry.backend_infos().await;
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "Milvus");
        assert!(infos[0].config_items[0].required);
        assert_eq!(registry.list_backend_kinds().await, vec![BackendKind::Milvus]);
    }

    #[tokio::test]
    async fn test_slow_setup_does_not_block_other_backends() {
        let registry = ConnectionRegistry::new(HashMap::new(), Arc::new(HashEmbedder::new(16)));
        let fast = Arc::new(Counters::default());
        let slow = Arc::new(Counters::default());
        registry
            .register_factory(Box::new(CountingFactory::new(BackendKind::Qdrant, fast.clone())))
            .await
            .unwrap();
        registry
            .register_factory(Box::new(CountingFactory {
                setup_delay: Duration::from_secs(1),
                ..CountingFactory::new(BackendKind::Pinecone, slow.clone())
            }))
            .await
            .unwrap();

        let cached = registry.get_connection(BackendKind::Qdrant).await.unwrap();

        let pending = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_connection(BackendKind::Pinecone).await })
        };
        // Let the slow setup start
        while slow.setups.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let started = Instant::now();
        let again = registry.get_connection(BackendKind::Qdrant).await.unwrap();
        assert!(Arc::ptr_eq(&cached, &again));
        assert!(registry.is_connected(BackendKind::Qdrant).await);
        assert_eq!(registry.connected().await, vec![BackendKind::Qdrant]);
        assert!(started.elapsed() < Duration::from_millis(200));

        let slow_handle = pending.await.unwrap().unwrap();
        assert_eq!(slow_handle.kind(), BackendKind::Pinecone);
        assert_eq!(slow.setups.load(Ordering::SeqCst), 1);
        assert_eq!(fast.setups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_waits_for_setup_in_progress() {
        let registry = ConnectionRegistry::new(HashMap::new(), Arc::new(HashEmbedder::new(16)));
        let counters = Arc::new(Counters::default());
        registry
            .register_factory(Box::new(CountingFactory {
                setup_delay: Duration::from_millis(100),
                ..CountingFactory::new(BackendKind::Milvus, counters.clone())
            }))
            .await
            .unwrap();

        let pending = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_connection(BackendKind::Milvus).await })
        };
        while counters.setups.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // The handle being set up is closed, not leaked
        assert!(registry.close(BackendKind::Milvus).await.unwrap());
        assert!(pending.await.unwrap().is_ok());
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert!(!registry.is_connected(BackendKind::Milvus).await);
    }
}
