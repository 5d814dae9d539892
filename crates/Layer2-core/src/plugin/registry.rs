//! Plugin Registry - 활성/실패 플러그인 저장소

use super::context::PluginContext;
use super::loader::PluginModule;
use super::manifest::PluginManifest;
use super::traits::{Plugin, PluginStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 로드된 플러그인 핸들
#[derive(Clone)]
pub struct PluginHandle {
    /// 플러그인 이름 (매니페스트 이름)
    pub name: String,

    /// 설정 목록에 적힌 로드 키 (`world1.anvil` 같은 점 경로 포함)
    pub load_key: String,

    /// 인스턴스
    pub plugin: Arc<dyn Plugin>,

    /// 설정 브리지
    pub ctx: Arc<PluginContext>,

    /// 출처 모듈
    pub module: Arc<PluginModule>,
}

impl PluginHandle {
    pub fn manifest(&self) -> PluginManifest {
        self.plugin.manifest()
    }

    /// 메타데이터 레지스트리 키
    pub fn class(&self) -> &str {
        self.ctx.class()
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("name", &self.name)
            .field("load_key", &self.load_key)
            .field("class", &self.class())
            .finish_non_exhaustive()
    }
}

/// 활성 플러그인 정보
struct PluginInfo {
    handle: PluginHandle,
    status: PluginStatus,
    load_order: usize,
}

/// 실패한 플러그인
#[derive(Debug, Clone, Serialize)]
pub struct FailedPlugin {
    pub name: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// 레지스트리 상태 (하나의 락으로 보호)
#[derive(Default)]
struct RegistryState {
    /// 활성 플러그인 (이름 -> 정보)
    plugins: HashMap<String, PluginInfo>,

    /// 실패 플러그인 (이름 -> 에러)
    failed: HashMap<String, FailedPlugin>,

    /// 로드 카운터
    load_counter: usize,
}

/// 플러그인 레지스트리
///
/// 같은 이름이 활성 목록과 실패 목록에 동시에 있을 수 없다.
/// 두 목록과 카운터는 한 락 아래에서 함께 바뀐다.
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// 플러그인 등록 (실패 목록에서는 제거)
    pub async fn register(&self, handle: PluginHandle) -> bool {
        let name = handle.name.clone();
        let version = handle.manifest().version;

        {
            let mut state = self.state.write().await;
            if state.plugins.contains_key(&name) {
                warn!("Plugin {} is already registered", name);
                return false;
            }

            state.load_counter += 1;
            let load_order = state.load_counter;
            state.plugins.insert(
                name.clone(),
                PluginInfo {
                    handle,
                    status: PluginStatus::Active,
                    load_order,
                },
            );
            state.failed.remove(&name);
        }

        info!("Registered plugin: {} (v{})", name, version);
        true
    }

    /// 등록 해제
    pub async fn unregister(&self, name: &str) -> Option<PluginHandle> {
        let removed = self.state.write().await.plugins.remove(name);
        if removed.is_some() {
            info!("Unregistered plugin: {}", name);
        }
        removed.map(|info| info.handle)
    }

    /// 실패 처리 (활성 목록에서 빼고 실패 목록에 기록)
    pub async fn mark_failed(&self, name: &str, error: impl Into<String>) -> Option<PluginHandle> {
        let error = error.into();
        warn!("Plugin {} failed: {}", name, error);

        let mut state = self.state.write().await;
        let removed = state.plugins.remove(name);
        state.failed.insert(
            name.to_string(),
            FailedPlugin {
                name: name.to_string(),
                error,
                failed_at: Utc::now(),
            },
        );
        removed.map(|info| info.handle)
    }

    pub async fn get(&self, name: &str) -> Option<PluginHandle> {
        self.state
            .read()
            .await
            .plugins
            .get(name)
            .map(|info| info.handle.clone())
    }

    /// 로드 키로 조회 (`world1.anvil` -> anvil)
    pub async fn find_by_key(&self, load_key: &str) -> Option<PluginHandle> {
        self.state
            .read()
            .await
            .plugins
            .values()
            .find(|info| info.handle.load_key == load_key || info.handle.name == load_key)
            .map(|info| info.handle.clone())
    }

    /// 상태 조회 (활성, 실패 순)
    pub async fn status(&self, name: &str) -> Option<PluginStatus> {
        let state = self.state.read().await;
        if let Some(info) = state.plugins.get(name) {
            return Some(info.status);
        }
        state
            .failed
            .contains_key(name)
            .then_some(PluginStatus::Failed)
    }

    pub async fn set_status(&self, name: &str, status: PluginStatus) -> bool {
        match self.state.write().await.plugins.get_mut(name) {
            Some(info) => {
                info.status = status;
                debug!("Set plugin {} status to {}", name, status);
                true
            }
            None => false,
        }
    }

    /// 활성 플러그인 (로드 순서)
    pub async fn list(&self) -> Vec<PluginHandle> {
        let state = self.state.read().await;
        let mut infos: Vec<_> = state.plugins.values().collect();
        infos.sort_by_key(|info| info.load_order);
        infos.into_iter().map(|info| info.handle.clone()).collect()
    }

    /// 활성 플러그인 이름 (로드 순서)
    pub async fn names(&self) -> Vec<String> {
        self.list().await.into_iter().map(|h| h.name).collect()
    }

    /// 실패 목록 (이름 순)
    pub async fn failed(&self) -> Vec<FailedPlugin> {
        let mut failed: Vec<_> = self.state.read().await.failed.values().cloned().collect();
        failed.sort_by(|a, b| a.name.cmp(&b.name));
        failed
    }

    pub async fn is_failed(&self, name: &str) -> bool {
        self.state.read().await.failed.contains_key(name)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.state.read().await.plugins.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.plugins.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.plugins.is_empty()
    }

    /// 의존성 중 활성 목록에 없는 것
    pub async fn missing_dependencies(&self, manifest: &PluginManifest) -> Vec<String> {
        let state = self.state.read().await;
        manifest
            .dependencies
            .iter()
            .filter(|dep| !state.plugins.contains_key(dep.as_str()))
            .cloned()
            .collect()
    }

    /// 활성/실패 목록 모두 비우기
    pub async fn clear(&self) {
        *self.state.write().await = RegistryState::default();
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::echo_handle;

    #[tokio::test]
    async fn test_register_and_order() {
        let registry = PluginRegistry::new();
        assert!(registry.register(echo_handle("b")).await);
        assert!(registry.register(echo_handle("a")).await);
        assert!(!registry.register(echo_handle("a")).await);

        assert_eq!(registry.names().await, vec!["b", "a"]);
        assert_eq!(registry.status("a").await, Some(PluginStatus::Active));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_active_and_failed_are_disjoint() {
        let registry = PluginRegistry::new();
        registry.register(echo_handle("anvil")).await;

        let removed = registry.mark_failed("anvil", "boom").await;
        assert!(removed.is_some());
        assert!(!registry.contains("anvil").await);
        assert_eq!(registry.status("anvil").await, Some(PluginStatus::Failed));
        assert_eq!(registry.failed().await[0].error, "boom");

        registry.register(echo_handle("anvil")).await;
        assert!(!registry.is_failed("anvil").await);
        assert_eq!(registry.status("anvil").await, Some(PluginStatus::Active));
    }

    #[tokio::test]
    async fn test_find_by_key_and_clear() {
        let registry = PluginRegistry::new();
        let mut handle = echo_handle("anvil");
        handle.load_key = "world1.anvil".to_string();
        registry.register(handle).await;
        registry.mark_failed("broken", "bad").await;

        assert!(registry.find_by_key("world1.anvil").await.is_some());
        assert!(registry.find_by_key("anvil").await.is_some());
        assert!(registry.find_by_key("world2.anvil").await.is_none());

        registry.clear().await;
        assert!(registry.is_empty().await);
        assert!(registry.failed().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_register_and_fail_keep_lists_disjoint() {
        let registry = Arc::new(PluginRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let name = format!("p{}", i % 4);
                if i % 2 == 0 {
                    registry.register(echo_handle(&name)).await;
                } else {
                    registry.mark_failed(&name, "boom").await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        for name in registry.names().await {
            assert!(!registry.is_failed(&name).await);
        }
        for failed in registry.failed().await {
            assert!(!registry.contains(&failed.name).await);
        }
    }
}
