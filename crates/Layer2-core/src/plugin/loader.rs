//! Module Loader - 플러그인 모듈 로드
//!
//! 모듈은 플러그인 팩토리와 함수 정의 목록을 묶은 단위다.
//! 로더는 항상 새로 읽은 모듈을 돌려주고, 읽은 결과를 `plugins.*` 키로 캐시한다.
//! 리로드 시 `drop_cached("plugins")`로 캐시를 비운다.

use super::discovery::{module_key, resolve_plugin_path};
use super::traits::Plugin;
use crate::meta::FunctionDef;
use cheatdeck_foundation::{ConfigMap, Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// PluginModule
// ============================================================================

/// 플러그인 팩토리 (초기 설정 -> 인스턴스)
pub trait PluginFactory: Send + Sync {
    fn create(&self, config: ConfigMap) -> Result<Arc<dyn Plugin>>;
}

impl<F> PluginFactory for F
where
    F: Fn(ConfigMap) -> Result<Arc<dyn Plugin>> + Send + Sync,
{
    fn create(&self, config: ConfigMap) -> Result<Arc<dyn Plugin>> {
        self(config)
    }
}

/// 로드된 플러그인 모듈
#[derive(Clone)]
pub struct PluginModule {
    /// 모듈 키 (`plugins.<load_key>`)
    pub key: String,

    /// 메타데이터 레지스트리 키
    pub class: String,

    /// 원본 파일
    pub source: PathBuf,

    factory: Arc<dyn PluginFactory>,
    functions: Vec<FunctionDef>,
}

impl PluginModule {
    pub fn new(class: impl Into<String>, factory: impl PluginFactory + 'static) -> Self {
        Self {
            key: String::new(),
            class: class.into(),
            source: PathBuf::new(),
            factory: Arc::new(factory),
            functions: Vec::new(),
        }
    }

    /// 타입이 정해진 네이티브 플러그인 모듈 (클래스 키는 타입 이름)
    pub fn native<P, F>(factory: F) -> Self
    where
        P: Plugin,
        F: Fn(ConfigMap) -> Result<P> + Send + Sync + 'static,
    {
        Self::new(
            std::any::type_name::<P>(),
            move |config: ConfigMap| -> Result<Arc<dyn Plugin>> {
                let plugin: Arc<dyn Plugin> = Arc::new(factory(config)?);
                Ok(plugin)
            },
        )
    }

    /// 빌더 패턴: 함수 정의 추가
    pub fn function(mut self, def: FunctionDef) -> Self {
        self.functions.push(def);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// 인스턴스 생성
    pub fn instantiate(&self, config: ConfigMap) -> Result<Arc<dyn Plugin>> {
        self.factory.create(config)
    }
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("key", &self.key)
            .field("class", &self.class)
            .field("source", &self.source)
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ModuleCache
// ============================================================================

/// 모듈 키 -> 모듈 캐시
#[derive(Default)]
pub struct ModuleCache {
    entries: RwLock<HashMap<String, Arc<PluginModule>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, module: Arc<PluginModule>) {
        self.entries.write().insert(module.key.clone(), module);
    }

    pub fn get(&self, key: &str) -> Option<Arc<PluginModule>> {
        self.entries.read().get(key).cloned()
    }

    /// `prefix` 자체 또는 `prefix.`로 시작하는 키 제거
    pub fn drop_prefix(&self, prefix: &str) -> usize {
        let dotted = format!("{}.", prefix);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key != prefix && !key.starts_with(&dotted));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// ============================================================================
// ModuleLoader Trait
// ============================================================================

/// 모듈 로더
pub trait ModuleLoader: Send + Sync {
    /// 로더 이름 (로그용)
    fn name(&self) -> &str;

    /// 처리하는 파일 확장자
    fn extension(&self) -> &str;

    /// 로드 키에 해당하는 소스 위치 (없으면 None)
    fn locate(&self, plugin_dir: &Path, load_key: &str) -> Option<PathBuf> {
        let path = resolve_plugin_path(plugin_dir, load_key, self.extension());
        path.is_file().then_some(path)
    }

    /// 캐시를 무시하고 새로 읽는다
    fn load_fresh(&self, load_key: &str, path: &Path) -> Result<Arc<PluginModule>>;

    /// 캐시 비우기 (제거된 수)
    fn drop_cached(&self, prefix: &str) -> usize;
}

// ============================================================================
// StaticLoader - 컴파일된 플러그인 카탈로그
// ============================================================================

/// 모듈 정의 함수
pub type ModuleDefinition = Arc<dyn Fn() -> PluginModule + Send + Sync>;

/// 바이너리에 링크된 플러그인 카탈로그
///
/// 디스크 파일 없이 로드 키로 찾는다. `locate`는 규칙상의 경로를 돌려준다.
#[derive(Default)]
pub struct StaticLoader {
    catalog: HashMap<String, ModuleDefinition>,
    cache: ModuleCache,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌더 패턴: 모듈 정의 추가
    pub fn with_module<F>(mut self, load_key: impl Into<String>, define: F) -> Self
    where
        F: Fn() -> PluginModule + Send + Sync + 'static,
    {
        self.register(load_key, define);
        self
    }

    pub fn register<F>(&mut self, load_key: impl Into<String>, define: F)
    where
        F: Fn() -> PluginModule + Send + Sync + 'static,
    {
        self.catalog.insert(load_key.into(), Arc::new(define));
    }

    /// 카탈로그에 있는 로드 키 (정렬)
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.catalog.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl ModuleLoader for StaticLoader {
    fn name(&self) -> &str {
        "static"
    }

    fn extension(&self) -> &str {
        "rs"
    }

    fn locate(&self, plugin_dir: &Path, load_key: &str) -> Option<PathBuf> {
        self.catalog
            .contains_key(load_key)
            .then(|| resolve_plugin_path(plugin_dir, load_key, self.extension()))
    }

    fn load_fresh(&self, load_key: &str, path: &Path) -> Result<Arc<PluginModule>> {
        let define = self
            .catalog
            .get(load_key)
            .ok_or_else(|| Error::Discovery(format!("Plugin '{}' is not compiled in", load_key)))?;

        let module = Arc::new(define().with_key(module_key(load_key)).with_source(path));
        self.cache.insert(Arc::clone(&module));
        debug!("Loaded static module {}", module.key);
        Ok(module)
    }

    fn drop_cached(&self, prefix: &str) -> usize {
        self.cache.drop_prefix(prefix)
    }
}
