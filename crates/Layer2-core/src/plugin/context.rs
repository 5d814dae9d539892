//! Plugin Context - 플러그인 인스턴스별 설정 브리지
//!
//! 세 군데에 같은 설정이 존재한다:
//! - 메모리 (`PluginContext::config`)
//! - 영속 저장소 (`plugin_configs.<name>`)
//! - 브라우저 미러 (`window.pluginConfigs[name]`)
//!
//! 쓰기는 항상 저장소를 거친 뒤 저장소 값을 다시 읽어 메모리를 맞춘다.

use super::bridge;
use super::manager::{ManagerHandle, PluginManager};
use crate::meta::MetadataRegistry;
use cheatdeck_foundation::{ConfigMap, ConfigStore, Error, Injector, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// 플러그인 컨텍스트
pub struct PluginContext {
    /// 플러그인 이름 (매니페스트 이름)
    name: String,

    /// 메타데이터 레지스트리 키
    class: String,

    /// 메모리 설정
    config: RwLock<ConfigMap>,

    /// 연결된 injector
    injector: RwLock<Option<Arc<dyn Injector>>>,

    /// 영속 저장소
    store: Arc<dyn ConfigStore>,

    /// 함수 메타데이터
    metadata: Arc<MetadataRegistry>,

    /// 소유 매니저 (약한 참조)
    manager: RwLock<Option<ManagerHandle>>,
}

impl PluginContext {
    pub fn new(
        name: impl Into<String>,
        class: impl Into<String>,
        config: ConfigMap,
        store: Arc<dyn ConfigStore>,
        metadata: Arc<MetadataRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            config: RwLock::new(config),
            injector: RwLock::new(None),
            store,
            metadata,
            manager: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub fn metadata(&self) -> &Arc<MetadataRegistry> {
        &self.metadata
    }

    // ========================================================================
    // 메모리 설정
    // ========================================================================

    /// 현재 설정 스냅샷
    pub fn config(&self) -> ConfigMap {
        self.config.read().clone()
    }

    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.config.read().get(key).cloned()
    }

    /// 메모리에만 값 설정 (저장은 `save_to_global_config`)
    pub fn set_config_value(&self, key: impl Into<String>, value: Value) {
        self.config.write().insert(key.into(), value);
    }

    /// 메모리 설정 통째로 교체
    pub fn replace_config(&self, config: ConfigMap) {
        *self.config.write() = config;
    }

    /// 저장소 값으로 메모리 설정 맞추기
    pub fn reload_from_store(&self) -> ConfigMap {
        let canonical = self.store.get_plugin_config(&self.name);
        self.replace_config(canonical.clone());
        canonical
    }

    // ========================================================================
    // Injector / Manager
    // ========================================================================

    pub fn attach_injector(&self, injector: Option<Arc<dyn Injector>>) {
        *self.injector.write() = injector;
    }

    pub fn injector(&self) -> Option<Arc<dyn Injector>> {
        self.injector.read().clone()
    }

    pub fn has_injector(&self) -> bool {
        self.injector.read().is_some()
    }

    pub(crate) fn attach_manager(&self, handle: ManagerHandle) {
        *self.manager.write() = Some(handle);
    }

    /// 소유 매니저 (이미 해제됐으면 None)
    pub fn plugin_manager(&self) -> Option<PluginManager> {
        self.manager.read().as_ref().and_then(ManagerHandle::upgrade)
    }

    // ========================================================================
    // 브라우저 미러
    // ========================================================================

    /// 주어진 설정을 브라우저에 반영 (injector 없으면 아무것도 안 함)
    pub async fn push_config(&self, config: &ConfigMap) -> Result<()> {
        match self.injector() {
            Some(injector) => bridge::push_config(injector.as_ref(), &self.name, config).await,
            None => Ok(()),
        }
    }

    /// 현재 설정을 브라우저에 반영 (실패는 로그만)
    pub async fn init_config_in_browser(&self) {
        let config = self.config();
        if let Err(e) = self.push_config(&config).await {
            debug!("Failed to init config in browser for {}: {}", self.name, e);
        }
    }

    /// 설정 저장
    ///
    /// 저장소에 병합 후 저장소 값을 다시 읽어 메모리를 맞추고, 브라우저에 반영한 뒤
    /// 이 플러그인에게만 변경 알림을 예약한다.
    pub async fn save_to_global_config(&self, new_config: Option<ConfigMap>) -> Result<()> {
        let partial = new_config.unwrap_or_else(|| self.config());
        self.store.update_plugin_config(&self.name, partial)?;
        let canonical = self.reload_from_store();

        if let Err(e) = self.push_config(&canonical).await {
            warn!("Failed to push saved config for {}: {}", self.name, e);
        }

        if let Some(manager) = self.plugin_manager() {
            manager.schedule_config_notification(canonical, Some(self.name.clone()));
        }
        Ok(())
    }

    // ========================================================================
    // Export 호출
    // ========================================================================

    /// 이 플러그인의 브라우저 export 함수 호출
    ///
    /// `export`는 `_js` 접미사가 붙은 정의 이름 또는 브라우저 쪽 이름 모두 받는다.
    /// 인자는 export 파라미터 순서대로 넘기고 빠진 값은 빈 문자열.
    pub async fn run_js_export(&self, export: &str, args: &ConfigMap) -> Result<Value> {
        let injector = self.injector().ok_or(Error::NoInjector)?;

        let def = self
            .metadata
            .function(&self.class, export)
            .or_else(|| {
                self.metadata
                    .js_exports(&self.class)
                    .into_iter()
                    .find(|d| d.js_name() == export)
            })
            .ok_or_else(|| Error::function_not_found(&self.name, export))?;

        let values: Vec<Value> = def
            .js_params()
            .iter()
            .map(|p| {
                args.get(p)
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new()))
            })
            .collect();

        bridge::call_function(injector.as_ref(), &self.name, def.js_name(), &values).await
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("has_injector", &self.has_injector())
            .finish_non_exhaustive()
    }
}
