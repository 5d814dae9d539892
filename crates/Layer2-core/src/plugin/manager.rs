//! Plugin Manager - 플러그인 라이프사이클 관리
//!
//! - 설정 목록 순서대로 로드 (삽입 순서 = on_game_ready / update / payload 순서)
//! - 활성 목록과 실패 목록을 따로 유지
//! - 명령어 테이블, UI 스키마, JS payload의 진입점
//!
//! 플러그인 하나의 에러는 다른 플러그인에 영향을 주지 않는다.
//! 배치 진입점(`load_plugins`, `update_all` 등)은 에러를 기록만 하고 반환하지 않는다.

use super::discovery::{self, DiscoveredPlugin, PluginDiscovery, MODULE_PREFIX};
use super::events::{self, EventBus, EventType, HostEvent};
use super::loader::ModuleLoader;
use super::registry::{FailedPlugin, PluginHandle, PluginRegistry};
use super::script::ScriptLoader;
use super::traits::{PluginStatus, WebRoute};
use super::PluginContext;
use crate::command::{self, CommandEntry};
use crate::js::{self, AcceptAll, JsComposer, JsSyntaxChecker, NodeSyntaxChecker};
use crate::meta::MetadataRegistry;
use crate::ui::{self, UiActionResult, UiElementView, UiSchema};
use cheatdeck_foundation::runtime::{self, Scheduled};
use cheatdeck_foundation::{
    ConfigMap, ConfigStore, ConsoleSink, Error, HostSettings, Injector, Result, TracingConsole,
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// 플러그인별 초기 설정 덮어쓰기 (로드 키 -> 설정)
pub type ConfigOverrides = HashMap<String, ConfigMap>;

// ============================================================================
// 결과 타입
// ============================================================================

/// 배치 로드 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl LoadSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 호스트 요약
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostSummary {
    pub active: usize,
    pub failed: usize,
    pub commands: usize,
    pub ui_elements: usize,
    pub js_exports: usize,
}

// ============================================================================
// PluginManager
// ============================================================================

pub(crate) struct ManagerInner {
    plugin_dir: PathBuf,
    plugin_names: RwLock<Vec<String>>,
    store: Arc<dyn ConfigStore>,
    metadata: Arc<MetadataRegistry>,
    registry: PluginRegistry,
    loaders: Vec<Arc<dyn ModuleLoader>>,
    composer: JsComposer,
    console: Arc<dyn ConsoleSink>,
    event_bus: Arc<EventBus>,
    injector: RwLock<Option<Arc<dyn Injector>>>,
}

/// 플러그인 매니저 (복제해도 같은 상태를 공유)
#[derive(Clone)]
pub struct PluginManager {
    inner: Arc<ManagerInner>,
}

/// 매니저 약한 참조 (플러그인 컨텍스트가 보관)
#[derive(Clone)]
pub struct ManagerHandle(Weak<ManagerInner>);

impl ManagerHandle {
    pub fn upgrade(&self) -> Option<PluginManager> {
        self.0.upgrade().map(|inner| PluginManager { inner })
    }
}

impl PluginManager {
    pub fn builder(store: Arc<dyn ConfigStore>) -> PluginManagerBuilder {
        PluginManagerBuilder::new(store)
    }

    /// 호스트 설정으로 빌더 준비
    pub fn from_settings(settings: &HostSettings, store: Arc<dyn ConfigStore>) -> PluginManagerBuilder {
        let checker: Arc<dyn JsSyntaxChecker> = if settings.js_syntax_check {
            NodeSyntaxChecker::detect()
        } else {
            Arc::new(AcceptAll)
        };
        PluginManagerBuilder::new(store)
            .plugin_dir(settings.plugin_dir.clone())
            .plugin_names(settings.plugins.clone())
            .checker(checker)
            .dump_dir(settings.effective_dump_dir())
    }

    pub(crate) fn handle(&self) -> ManagerHandle {
        ManagerHandle(Arc::downgrade(&self.inner))
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    pub fn plugin_dir(&self) -> &Path {
        &self.inner.plugin_dir
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.inner.plugin_names.read().clone()
    }

    pub fn set_plugin_names(&self, names: Vec<String>) {
        *self.inner.plugin_names.write() = names;
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.inner.store
    }

    pub fn metadata(&self) -> &Arc<MetadataRegistry> {
        &self.inner.metadata
    }

    pub fn console(&self) -> &Arc<dyn ConsoleSink> {
        &self.inner.console
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.event_bus
    }

    /// 마지막으로 연결된 injector
    pub fn injector(&self) -> Option<Arc<dyn Injector>> {
        self.inner.injector.read().clone()
    }

    fn set_injector(&self, injector: Option<Arc<dyn Injector>>) {
        *self.inner.injector.write() = injector;
    }

    pub async fn get_plugin(&self, name: &str) -> Option<PluginHandle> {
        self.inner.registry.get(name).await
    }

    /// 활성 플러그인 (삽입 순서)
    pub async fn plugins(&self) -> Vec<PluginHandle> {
        self.inner.registry.list().await
    }

    pub async fn failed_plugins(&self) -> Vec<FailedPlugin> {
        self.inner.registry.failed().await
    }

    pub async fn is_failed(&self, name: &str) -> bool {
        self.inner.registry.is_failed(name).await
    }

    pub async fn status(&self, name: &str) -> Option<PluginStatus> {
        self.inner.registry.status(name).await
    }

    async fn publish(&self, event: HostEvent) {
        self.inner.event_bus.publish(event).await;
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// 설정 목록의 모든 플러그인 로드
    ///
    /// injector가 있으면 배치가 끝난 뒤 삽입 순서대로 `on_game_ready`를 호출한다.
    pub async fn load_plugins(
        &self,
        injector: Option<Arc<dyn Injector>>,
        overrides: Option<ConfigOverrides>,
    ) -> LoadSummary {
        self.set_injector(injector.clone());
        let overrides = overrides.unwrap_or_default();
        let mut summary = LoadSummary::default();

        for load_key in self.plugin_names() {
            self.inner
                .console
                .print(&format!("Loading plugin: {}...", load_key));
            let override_config = overrides.get(&load_key).cloned();
            match self.load_plugin(&load_key, injector.clone(), override_config).await {
                Ok(handle) => {
                    self.inner
                        .console
                        .print(&format!("Loaded plugin: {}", load_key));
                    summary.loaded.push(handle.name);
                }
                Err(e) => {
                    self.inner
                        .console
                        .print(&format!("Failed to load plugin '{}': {}", load_key, e));
                    summary.failed.push((load_key, e.to_string()));
                }
            }
        }

        if injector.is_some() {
            self.fire_game_ready().await;
        }
        info!(
            "Loaded {} plugins ({} failed)",
            summary.loaded.len(),
            summary.failed.len()
        );
        summary
    }

    /// 플러그인 하나 로드
    ///
    /// 실패하면 실패 목록에 기록된다. 이미 로드된 이름이면 기존 플러그인은 그대로 둔다.
    pub async fn load_plugin(
        &self,
        load_key: &str,
        injector: Option<Arc<dyn Injector>>,
        override_config: Option<ConfigMap>,
    ) -> Result<PluginHandle> {
        let fallback_name = load_key.rsplit('.').next().unwrap_or(load_key).to_string();
        match self.try_load(load_key, injector, override_config).await {
            Ok(handle) => {
                let version = handle.manifest().version;
                self.publish(events::plugin_loaded_event(&handle.name, &version))
                    .await;
                Ok(handle)
            }
            Err(LoadError::Duplicate(name)) => {
                warn!("Plugin {} is already loaded", name);
                Err(Error::plugin_load(name, "already loaded"))
            }
            Err(LoadError::Failed { name, error }) => {
                let name = name.unwrap_or(fallback_name);
                let message = error.to_string();
                error!("Failed to load plugin '{}': {}", name, message);
                self.inner.registry.mark_failed(&name, message.clone()).await;
                self.publish(events::plugin_failed_event(&name, &message)).await;
                Err(error)
            }
        }
    }

    async fn try_load(
        &self,
        load_key: &str,
        injector: Option<Arc<dyn Injector>>,
        override_config: Option<ConfigMap>,
    ) -> std::result::Result<PluginHandle, LoadError> {
        discovery::validate_load_key(load_key).map_err(LoadError::anonymous)?;

        let (loader, path) = self
            .inner
            .loaders
            .iter()
            .find_map(|loader| {
                loader
                    .locate(&self.inner.plugin_dir, load_key)
                    .map(|path| (loader, path))
            })
            .ok_or_else(|| {
                LoadError::anonymous(Error::Discovery(format!(
                    "Plugin '{}' not found in {}",
                    load_key,
                    self.inner.plugin_dir.display()
                )))
            })?;
        debug!("Loading {} via {} loader from {:?}", load_key, loader.name(), path);

        let module = loader.load_fresh(load_key, &path).map_err(LoadError::anonymous)?;
        self.inner
            .metadata
            .register_class(&module.class, module.functions().iter().cloned());

        // 초기 설정: 저장소 값 + 호출자 덮어쓰기
        let seed_name = load_key.rsplit('.').next().unwrap_or(load_key);
        let mut seed = self.inner.store.get_plugin_config(seed_name);
        if let Some(override_config) = override_config {
            seed.extend(override_config);
        }

        let plugin = module.instantiate(seed).map_err(LoadError::anonymous)?;
        let manifest = plugin.manifest();
        let name = manifest.name.clone();
        let failed = |error: Error| LoadError::Failed {
            name: Some(name.clone()),
            error,
        };

        if !js::is_js_identifier(&name) {
            return Err(failed(Error::plugin_load(
                &name,
                "plugin name must be a valid JavaScript identifier",
            )));
        }
        if self.inner.registry.contains(&name).await {
            return Err(LoadError::Duplicate(name.clone()));
        }

        let canonical = self.inner.store.get_plugin_config(&name);
        let ctx = Arc::new(PluginContext::new(
            name.clone(),
            module.class.clone(),
            canonical,
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.metadata),
        ));
        ctx.attach_manager(self.handle());

        for dep in self.inner.registry.missing_dependencies(&manifest).await {
            warn!("Plugin '{}' requires '{}' which is not loaded", name, dep);
            self.inner.console.print(&format!(
                "Plugin '{}' requires '{}' which is not loaded",
                name, dep
            ));
        }

        ctx.attach_injector(injector);
        match plugin.initialize(&ctx).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(failed(Error::plugin_load(
                    &name,
                    format!("Failed to initialize plugin: {}", name),
                )))
            }
            Err(e) => return Err(failed(e)),
        }

        let handle = PluginHandle {
            name: name.clone(),
            load_key: load_key.to_string(),
            plugin,
            ctx,
            module,
        };
        if !self.inner.registry.register(handle.clone()).await {
            return Err(LoadError::Duplicate(name));
        }
        info!("Loaded plugin: {}", name);
        Ok(handle)
    }

    /// injector 재연결
    ///
    /// 이미 로드된 플러그인은 다시 `initialize`하고, 없는 플러그인은 새로 로드한다.
    pub async fn initialize_all(
        &self,
        injector: Option<Arc<dyn Injector>>,
        overrides: Option<ConfigOverrides>,
    ) -> LoadSummary {
        self.set_injector(injector.clone());
        let overrides = overrides.unwrap_or_default();
        let mut summary = LoadSummary::default();

        for load_key in self.plugin_names() {
            match self.inner.registry.find_by_key(&load_key).await {
                Some(handle) => {
                    handle.ctx.attach_injector(injector.clone());
                    let outcome = match handle.plugin.initialize(&handle.ctx).await {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(format!("Failed to initialize plugin: {}", handle.name)),
                        Err(e) => Err(e.to_string()),
                    };
                    match outcome {
                        Ok(()) => {
                            debug!("Re-initialized plugin: {}", handle.name);
                            summary.loaded.push(handle.name);
                        }
                        Err(message) => {
                            self.inner.console.print(&format!(
                                "Failed to initialize plugin '{}': {}",
                                load_key, message
                            ));
                            self.inner.registry.mark_failed(&handle.name, message.clone()).await;
                            self.publish(events::plugin_failed_event(&handle.name, &message))
                                .await;
                            summary.failed.push((load_key, message));
                        }
                    }
                }
                None => {
                    let override_config = overrides.get(&load_key).cloned();
                    match self.load_plugin(&load_key, injector.clone(), override_config).await {
                        Ok(handle) => summary.loaded.push(handle.name),
                        Err(e) => {
                            self.inner.console.print(&format!(
                                "Failed to initialize plugin '{}': {}",
                                load_key, e
                            ));
                            summary.failed.push((load_key, e.to_string()));
                        }
                    }
                }
            }
        }

        if injector.is_some() {
            self.fire_game_ready().await;
        }
        summary
    }

    async fn fire_game_ready(&self) {
        for handle in self.plugins().await {
            match handle.plugin.on_game_ready(&handle.ctx).await {
                Ok(()) => debug!("Executed on_game_ready for plugin: {}", handle.name),
                Err(e) => error!(
                    "Error executing on_game_ready for plugin '{}': {}",
                    handle.name, e
                ),
            }
        }
    }

    /// 모든 활성 플러그인 `update` (삽입 순서)
    pub async fn update_all(&self) {
        for handle in self.plugins().await {
            if let Err(e) = handle.plugin.update(&handle.ctx).await {
                error!("Error updating plugin '{}': {}", handle.name, e);
            }
        }
    }

    /// 모든 활성 플러그인 `cleanup`
    pub async fn cleanup_all(&self) {
        for handle in self.plugins().await {
            match handle.plugin.cleanup(&handle.ctx).await {
                Ok(()) => info!("Cleaned up plugin: {}", handle.name),
                Err(e) => error!("Error cleaning up plugin '{}': {}", handle.name, e),
            }
        }
    }

    /// 플러그인 하나 언로드 (없으면 false)
    pub async fn unload_plugin(&self, name: &str) -> bool {
        let handle = match self.inner.registry.get(name).await {
            Some(handle) => handle,
            None => {
                warn!("Plugin '{}' not loaded.", name);
                return false;
            }
        };

        self.inner
            .registry
            .set_status(name, PluginStatus::Unloading)
            .await;
        if let Err(e) = handle.plugin.cleanup(&handle.ctx).await {
            error!("Error unloading plugin '{}': {}", name, e);
        }
        self.inner.registry.unregister(name).await;
        self.publish(HostEvent::new(EventType::PluginUnloaded, Value::Null, name))
            .await;
        info!("Unloaded plugin: {}", name);
        true
    }

    /// 소스에서 다시 로드
    ///
    /// cleanup -> 활성/실패 목록 비우기 -> 모듈 캐시 제거 -> 설정 리로드 -> injector 없이 로드.
    /// 이후 `initialize_all`로 injector를 다시 연결한다.
    pub async fn reload_plugins(&self) -> LoadSummary {
        self.cleanup_all().await;
        self.inner.registry.clear().await;

        let dropped: usize = self
            .inner
            .loaders
            .iter()
            .map(|loader| loader.drop_cached(MODULE_PREFIX))
            .sum();
        self.inner.metadata.clear();
        debug!("Dropped {} cached plugin modules", dropped);

        if let Err(e) = self.inner.store.reload() {
            warn!("Failed to reload configuration: {}", e);
        }
        let configured = self.inner.store.plugins();
        if !configured.is_empty() {
            self.set_plugin_names(configured);
        }

        let summary = self.load_plugins(None, None).await;
        self.publish(HostEvent::new(
            EventType::PluginsReloaded,
            serde_json::json!({ "loaded": summary.loaded, "failed": summary.failed.len() }),
            "host",
        ))
        .await;
        summary
    }

    /// 설정 목록에 없는 플러그인 파일
    pub async fn discover_unused(&self) -> Result<Vec<DiscoveredPlugin>> {
        let extensions = self
            .inner
            .loaders
            .iter()
            .map(|loader| loader.extension().to_string())
            .collect();
        PluginDiscovery::new(&self.inner.plugin_dir, extensions)
            .unused(&self.plugin_names())
            .await
    }

    // ========================================================================
    // 설정 브리지 / 알림
    // ========================================================================

    /// 설정 변경 알림
    ///
    /// 활성 플러그인 이름이면 그 플러그인만 받은 설정으로 받는다.
    /// 이름이 없거나 모르는 이름이면 모든 플러그인이 각자 설정으로 받는다.
    /// 핸들러 에러는 로그만 남긴다.
    pub async fn notify_config_changed(&self, config: ConfigMap, plugin: Option<&str>) {
        if let Some(name) = plugin {
            if let Some(handle) = self.inner.registry.get(name).await {
                self.deliver_config(&handle, &config).await;
                return;
            }
            debug!("Config change for unknown plugin '{}', notifying all", name);
        }
        for handle in self.plugins().await {
            let own = handle.ctx.config();
            self.deliver_config(&handle, &own).await;
        }
    }

    async fn deliver_config(&self, handle: &PluginHandle, config: &ConfigMap) {
        if let Err(e) = handle.plugin.on_config_changed(&handle.ctx, config).await {
            error!("Error notifying plugin '{}' of config change: {}", handle.name, e);
            return;
        }
        self.publish(events::config_changed_event(
            &handle.name,
            &Value::Object(config.clone()),
        ))
        .await;
    }

    /// 설정 변경 알림 예약
    ///
    /// 런타임 안이면 백그라운드 태스크, 아니면 one-shot 런타임에서 완료까지 실행.
    pub fn schedule_config_notification(&self, config: ConfigMap, plugin: Option<String>) -> Scheduled {
        let manager = self.clone();
        runtime::spawn_or_block(async move {
            manager.notify_config_changed(config, plugin.as_deref()).await;
        })
    }

    /// 저장소를 다시 읽고 각 플러그인 설정에 병합
    pub async fn reload_configs_from_store(&self) -> Result<()> {
        self.inner.store.reload()?;
        let all = self.inner.store.get_all_plugin_configs();

        for handle in self.plugins().await {
            let stored = match all.get(&handle.name).and_then(Value::as_object) {
                Some(stored) => stored.clone(),
                None => {
                    self.inner
                        .console
                        .print(&format!("No config found for plugin: {}", handle.name));
                    continue;
                }
            };

            let mut merged = handle.ctx.config();
            merged.extend(stored);
            handle.ctx.replace_config(merged.clone());

            if let Err(e) = handle.ctx.push_config(&merged).await {
                warn!("Failed to push config for {}: {}", handle.name, e);
            }
            self.deliver_config(&handle, &merged).await;
            self.inner
                .console
                .print(&format!("Reloaded config for plugin: {}", handle.name));
        }
        Ok(())
    }

    pub async fn notify_page_load(&self) {
        for handle in self.plugins().await {
            if let Err(e) = handle.plugin.on_page_load(&handle.ctx).await {
                error!("Error notifying plugin '{}' of page load: {}", handle.name, e);
            }
        }
    }

    pub async fn notify_cheat_executed(&self, command: &str, result: &Value) {
        for handle in self.plugins().await {
            if let Err(e) = handle
                .plugin
                .on_cheat_executed(&handle.ctx, command, result)
                .await
            {
                error!(
                    "Error notifying plugin '{}' of cheat execution: {}",
                    handle.name, e
                );
            }
        }
    }

    // ========================================================================
    // 명령어
    // ========================================================================

    /// 명령어 테이블 (`plugins.<plugin>.<function>`)
    pub async fn get_all_commands(&self) -> BTreeMap<String, CommandEntry> {
        let mut commands = BTreeMap::new();
        for handle in self.plugins().await {
            for def in self.inner.metadata.commands(handle.class()) {
                let entry = CommandEntry::new(&handle.name, def);
                commands.insert(entry.id.clone(), entry);
            }
        }
        commands
    }

    pub async fn get_command(&self, id: &str) -> Option<CommandEntry> {
        let (plugin, function) = command::split_command_id(id)?;
        let handle = self.inner.registry.get(plugin).await?;
        let def = self.inner.metadata.function(handle.class(), function)?;
        def.command.is_some().then(|| CommandEntry::new(&handle.name, def))
    }

    pub async fn get_command_help(&self, id: &str) -> String {
        self.get_command(id)
            .await
            .map(|entry| entry.help)
            .unwrap_or_else(|| "No help available.".to_string())
    }

    /// 인자 문자열 목록으로 명령어 실행
    pub async fn execute_command(&self, id: &str, argv: &[String]) -> Result<Value> {
        let prepared = match self.get_command(id).await {
            Some(entry) => command::parse_args(&entry.params, argv)
                .map(|args| (entry, args))
                .map_err(Error::from),
            None => Err(Error::NotFound(format!("Unknown command: {}", id))),
        };
        let (entry, args) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                if e.is_user_facing() {
                    self.inner.console.print(&e.to_string());
                }
                return Err(e);
            }
        };
        let outcome = command::invoke_command(self, &entry, args).await;
        self.publish(events::command_executed_event(id, outcome.is_ok()))
            .await;
        outcome
    }

    /// 한 줄 명령 실행 (`plugins.anvil.set true`)
    pub async fn execute_command_line(&self, line: &str) -> Result<Value> {
        let mut words = shlex::split(line)
            .ok_or_else(|| Error::InvalidInput(format!("Unbalanced quotes in: {}", line)))?
            .into_iter();
        let id = words
            .next()
            .ok_or_else(|| Error::InvalidInput("Empty command".to_string()))?;
        let argv: Vec<String> = words.collect();
        self.execute_command(&id, &argv).await
    }

    pub async fn get_web_routes(&self) -> Vec<WebRoute> {
        self.plugins()
            .await
            .iter()
            .flat_map(|handle| handle.plugin.web_routes())
            .collect()
    }

    // ========================================================================
    // UI
    // ========================================================================

    /// 플러그인 UI element (카테고리별, order 순)
    pub async fn get_ui_elements(&self, plugin: &str) -> BTreeMap<String, Vec<UiElementView>> {
        match self.inner.registry.get(plugin).await {
            Some(handle) => ui::categorize(ui::element_views(&handle)),
            None => BTreeMap::new(),
        }
    }

    pub async fn get_ui_schema(&self, plugin: &str) -> Option<UiSchema> {
        self.inner
            .registry
            .get(plugin)
            .await
            .map(|handle| ui::plugin_schema(&handle))
    }

    /// 모든 활성 플러그인의 UI 스키마 (실패 목록은 제외)
    pub async fn get_all_ui_schemas(&self) -> BTreeMap<String, UiSchema> {
        self.plugins()
            .await
            .iter()
            .map(|handle| (handle.name.clone(), ui::plugin_schema(handle)))
            .collect()
    }

    /// UI 이벤트 처리
    pub async fn execute_ui_action(
        &self,
        plugin: &str,
        element: &str,
        value: Option<Value>,
    ) -> UiActionResult {
        let result = match self.inner.registry.get(plugin).await {
            Some(handle) => ui::dispatch(self, &handle, element, value).await,
            None => UiActionResult::failure(format!("Plugin '{}' not found", plugin)),
        };
        self.publish(events::ui_action_event(plugin, element, result.is_success()))
            .await;
        result
    }

    /// 자동완성 후보 (모르는 플러그인이나 에러면 빈 목록)
    pub async fn autocomplete(&self, plugin: &str, element: &str, query: &str) -> Vec<Value> {
        let handle = match self.inner.registry.get(plugin).await {
            Some(handle) => handle,
            None => return Vec::new(),
        };
        match handle.plugin.autocomplete(&handle.ctx, element, query).await {
            Ok(items) => items,
            Err(e) => {
                error!("Autocomplete failed for {}.{}: {}", plugin, element, e);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // JS payload
    // ========================================================================

    /// 모든 플러그인의 브라우저 export를 한 스크립트로
    ///
    /// export가 하나라도 실패한 플러그인은 반환 전에 실패 목록으로 옮긴다.
    pub async fn collect_all_plugin_js_with_sizes(&self) -> (String, Vec<(String, usize)>) {
        let handles = self.plugins().await;
        let payload = self.inner.composer.compose(&handles).await;

        for (name, message) in payload.failed_plugins() {
            self.inner.registry.mark_failed(&name, message.clone()).await;
            self.publish(events::plugin_failed_event(&name, &message)).await;
        }
        self.publish(HostEvent::new(
            EventType::PayloadComposed,
            serde_json::json!({
                "bytes": payload.script.len(),
                "plugins": payload.sizes.len(),
                "failures": payload.failures.len(),
            }),
            "host",
        ))
        .await;

        (payload.script, payload.sizes)
    }

    pub async fn collect_all_plugin_js(&self) -> String {
        self.collect_all_plugin_js_with_sizes().await.0
    }

    // ========================================================================
    // 백그라운드 / 요약
    // ========================================================================

    /// 주기적 `update_all` 루프
    ///
    /// shutdown 신호(true) 또는 송신자 해제 시 `cleanup_all` 후 종료.
    pub fn spawn_update_loop(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => manager.update_all().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Update loop stopping");
            manager.cleanup_all().await;
        })
    }

    pub async fn summary(&self) -> HostSummary {
        let handles = self.plugins().await;
        let metadata = &self.inner.metadata;
        HostSummary {
            active: handles.len(),
            failed: self.inner.registry.failed().await.len(),
            commands: handles.iter().map(|h| metadata.commands(h.class()).len()).sum(),
            ui_elements: handles.iter().map(|h| metadata.ui_elements(h.class()).len()).sum(),
            js_exports: handles.iter().map(|h| metadata.js_exports(h.class()).len()).sum(),
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugin_dir", &self.inner.plugin_dir)
            .field("plugin_names", &self.plugin_names())
            .finish_non_exhaustive()
    }
}

enum LoadError {
    /// 같은 이름이 이미 활성 상태
    Duplicate(String),

    /// 실패 목록으로 갈 에러 (이름을 알기 전이면 None)
    Failed { name: Option<String>, error: Error },
}

impl LoadError {
    fn anonymous(error: Error) -> Self {
        Self::Failed { name: None, error }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// 매니저 빌더
pub struct PluginManagerBuilder {
    plugin_dir: PathBuf,
    plugin_names: Option<Vec<String>>,
    store: Arc<dyn ConfigStore>,
    console: Arc<dyn ConsoleSink>,
    loaders: Vec<Arc<dyn ModuleLoader>>,
    checker: Arc<dyn JsSyntaxChecker>,
    dump_dir: Option<PathBuf>,
    metadata: Option<Arc<MetadataRegistry>>,
    event_bus: Option<Arc<EventBus>>,
}

impl PluginManagerBuilder {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            plugin_names: None,
            store,
            console: Arc::new(TracingConsole),
            loaders: Vec::new(),
            checker: Arc::new(AcceptAll),
            dump_dir: None,
            metadata: None,
            event_bus: None,
        }
    }

    pub fn plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    /// 로드할 플러그인 목록 (없으면 저장소의 `plugins`)
    pub fn plugin_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugin_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    /// 모듈 로더 추가 (추가한 순서대로 시도, 스크립트 로더는 항상 마지막)
    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn checker(mut self, checker: Arc<dyn JsSyntaxChecker>) -> Self {
        self.checker = checker;
        self
    }

    pub fn dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    pub fn metadata(mut self, metadata: Arc<MetadataRegistry>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> PluginManager {
        let plugin_names = self.plugin_names.unwrap_or_else(|| self.store.plugins());
        let mut loaders = self.loaders;
        loaders.push(Arc::new(ScriptLoader::new()));

        let composer = JsComposer::new(self.checker, Arc::clone(&self.console))
            .with_dump_dir(self.dump_dir);

        PluginManager {
            inner: Arc::new(ManagerInner {
                plugin_dir: self.plugin_dir,
                plugin_names: RwLock::new(plugin_names),
                store: self.store,
                metadata: self.metadata.unwrap_or_default(),
                registry: PluginRegistry::new(),
                loaders,
                composer,
                console: self.console,
                event_bus: self.event_bus.unwrap_or_default(),
                injector: RwLock::new(None),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{native_loader, CountingPlugin, RecordingInjector};
    use cheatdeck_foundation::config::CONFIG_FILE;
    use cheatdeck_foundation::{JsonConfigStore, JsonStore, MemoryConsole};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn manager(names: &[&str], store: Arc<dyn ConfigStore>) -> PluginManager {
        PluginManager::builder(store)
            .plugin_dir("/nonexistent/plugins")
            .plugin_names(names.iter().copied())
            .console(Arc::new(MemoryConsole::new()))
            .loader(Arc::new(native_loader()))
            .build()
    }

    fn memory_store(value: Value) -> Arc<dyn ConfigStore> {
        Arc::new(JsonConfigStore::in_memory(value))
    }

    #[tokio::test]
    async fn test_load_order_and_failures() {
        let manager = manager(&["counter", "missing", "refuser"], memory_store(json!({})));
        let summary = manager.load_plugins(None, None).await;

        assert_eq!(summary.loaded, vec!["counter"]);
        assert_eq!(summary.failed.len(), 2);
        assert!(manager.is_failed("missing").await);
        assert!(manager.is_failed("refuser").await);
        assert_eq!(manager.status("counter").await, Some(PluginStatus::Active));
    }

    #[tokio::test]
    async fn test_load_uses_canonical_store_config() {
        let store = memory_store(json!({ "plugin_configs": { "counter": { "level": 3 } } }));
        let manager = manager(&["counter"], Arc::clone(&store));
        let mut overrides = ConfigOverrides::new();
        let mut override_config = ConfigMap::new();
        override_config.insert("level".into(), json!(9));
        overrides.insert("counter".into(), override_config);

        manager.load_plugins(None, Some(overrides)).await;
        let handle = manager.get_plugin("counter").await.unwrap();
        assert_eq!(handle.ctx.config(), store.get_plugin_config("counter"));
    }

    #[tokio::test]
    async fn test_game_ready_only_with_injector() {
        let manager = manager(&["counter"], memory_store(json!({})));
        manager.load_plugins(None, None).await;
        let counter = CountingPlugin::from_handle(&manager.get_plugin("counter").await.unwrap());
        assert_eq!(counter.game_ready.load(Ordering::SeqCst), 0);

        manager
            .initialize_all(Some(Arc::new(RecordingInjector::new())), None)
            .await;
        assert_eq!(counter.initialized.load(Ordering::SeqCst), 2);
        assert_eq!(counter.game_ready.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_and_unload() {
        let manager = manager(&["counter"], memory_store(json!({})));
        manager.load_plugins(None, None).await;
        let counter = CountingPlugin::from_handle(&manager.get_plugin("counter").await.unwrap());

        manager.update_all().await;
        manager.update_all().await;
        assert_eq!(counter.updates.load(Ordering::SeqCst), 2);

        assert!(manager.unload_plugin("counter").await);
        assert_eq!(counter.cleanups.load(Ordering::SeqCst), 1);
        assert!(manager.get_plugin("counter").await.is_none());
        assert!(!manager.unload_plugin("counter").await);
    }

    #[tokio::test]
    async fn test_targeted_and_broadcast_notifications() {
        let manager = manager(&["counter", "echo_plugin"], memory_store(json!({})));
        manager.load_plugins(None, None).await;
        let counter = CountingPlugin::from_handle(&manager.get_plugin("counter").await.unwrap());

        manager.notify_config_changed(ConfigMap::new(), Some("counter")).await;
        assert_eq!(counter.config_changes.load(Ordering::SeqCst), 1);

        manager.notify_config_changed(ConfigMap::new(), None).await;
        assert_eq!(counter.config_changes.load(Ordering::SeqCst), 2);

        // 모르는 이름은 전체 알림으로 넘어간다
        manager.notify_config_changed(ConfigMap::new(), Some("nobody")).await;
        assert_eq!(counter.config_changes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reload_configs_from_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let json_store = JsonStore::new(dir.path());
        json_store
            .save(
                CONFIG_FILE,
                &json!({ "plugin_configs": { "counter": { "level": 1, "debug": false } } }),
            )
            .unwrap();
        let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::open(json_store.clone()));

        let console = Arc::new(MemoryConsole::new());
        let manager = PluginManager::builder(Arc::clone(&store))
            .plugin_dir("/nonexistent/plugins")
            .plugin_names(["counter", "echo_plugin"])
            .console(console.clone())
            .loader(Arc::new(native_loader()))
            .build();
        manager.load_plugins(None, None).await;
        let injector = Arc::new(RecordingInjector::new());
        manager.initialize_all(Some(injector.clone()), None).await;

        let handle = manager.get_plugin("counter").await.unwrap();
        let counter = CountingPlugin::from_handle(&handle);
        let changes_before = counter.config_changes.load(Ordering::SeqCst);
        let mut local = ConfigMap::new();
        local.insert("local_only".into(), json!(true));
        local.insert("level".into(), json!(1));
        handle.ctx.replace_config(local);

        json_store
            .save(
                CONFIG_FILE,
                &json!({ "plugin_configs": { "counter": { "level": 5 } } }),
            )
            .unwrap();
        manager.reload_configs_from_store().await.unwrap();

        let config = handle.ctx.config();
        assert_eq!(config.get("level"), Some(&json!(5)));
        assert_eq!(config.get("local_only"), Some(&json!(true)));
        assert_eq!(
            counter.config_changes.load(Ordering::SeqCst),
            changes_before + 1
        );

        let pushed = format!(
            "window.pluginConfigs[\"counter\"] = {};",
            serde_json::to_string(&config).unwrap()
        );
        assert!(injector.expressions().iter().any(|e| e.ends_with(&pushed)));
        assert!(console.contains("Reloaded config for plugin: counter"));
        assert!(console.contains("No config found for plugin: echo_plugin"));
    }

    #[tokio::test]
    async fn test_page_load_and_cheat_notifications_isolate_errors() {
        let manager = manager(&["faulty", "counter"], memory_store(json!({})));
        manager.load_plugins(None, None).await;
        let counter = CountingPlugin::from_handle(&manager.get_plugin("counter").await.unwrap());

        manager.notify_page_load().await;
        manager
            .notify_cheat_executed("gems 100", &json!({ "ok": true }))
            .await;
        manager.notify_config_changed(ConfigMap::new(), None).await;

        assert_eq!(counter.page_loads.load(Ordering::SeqCst), 1);
        assert_eq!(counter.cheats.load(Ordering::SeqCst), 1);
        assert_eq!(counter.config_changes.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status("faulty").await, Some(PluginStatus::Active));
    }

    #[tokio::test]
    async fn test_web_routes_aggregate_in_load_order() {
        let manager = manager(&["counter", "echo_plugin", "faulty"], memory_store(json!({})));
        manager.load_plugins(None, None).await;

        let routes = manager.get_web_routes().await;
        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/counter/level", "/faulty/status", "/faulty/reset"]);
        assert_eq!(routes[2].method, "POST");
    }

    #[tokio::test]
    async fn test_autocomplete_unknown_and_failing_plugins() {
        let manager = manager(&["counter", "faulty"], memory_store(json!({})));
        manager.load_plugins(None, None).await;

        assert_eq!(
            manager.autocomplete("counter", "item", "level").await,
            vec![json!("level_1"), json!("level_2")]
        );
        assert!(manager.autocomplete("ghost", "item", "level").await.is_empty());
        assert!(manager.autocomplete("faulty", "item", "level").await.is_empty());
        assert!(manager.autocomplete("echo_plugin", "item", "").await.is_empty());
    }

    #[tokio::test]
    async fn test_command_table_and_help() {
        let manager = manager(&["counter"], memory_store(json!({})));
        manager.load_plugins(None, None).await;

        let commands = manager.get_all_commands().await;
        assert!(commands.contains_key("plugins.counter.set_level"));
        assert_eq!(
            manager.get_command_help("plugins.counter.set_level").await,
            "Set the counter level"
        );
        assert_eq!(
            manager.get_command_help("plugins.counter.nope").await,
            "No help available."
        );
    }

    #[tokio::test]
    async fn test_execute_command_line() {
        let store = memory_store(json!({}));
        let manager = manager(&["counter"], Arc::clone(&store));
        manager.load_plugins(None, None).await;

        let result = manager
            .execute_command_line("plugins.counter.set_level 4")
            .await
            .unwrap();
        assert_eq!(result, json!(4));
        assert_eq!(store.get_path("plugin_configs.counter.level"), Some(json!(4)));

        let err = manager
            .execute_command_line("plugins.counter.set_level 1 2")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Too many arguments: 2");

        assert!(manager.execute_command_line("plugins.ghost.run").await.is_err());
    }

    #[tokio::test]
    async fn test_summary_and_unused_discovery() {
        let manager = manager(&["counter"], memory_store(json!({})));
        manager.load_plugins(None, None).await;

        let summary = manager.summary().await;
        assert_eq!(summary.active, 1);
        assert_eq!(summary.commands, 1);
        assert_eq!(summary.ui_elements, 1);
        assert!(manager.discover_unused().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_loop_stops_with_cleanup() {
        let manager = manager(&["counter"], memory_store(json!({})));
        manager.load_plugins(None, None).await;
        let counter = CountingPlugin::from_handle(&manager.get_plugin("counter").await.unwrap());

        let (tx, rx) = watch::channel(false);
        let task = manager.spawn_update_loop(Duration::from_millis(5), rx);
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        assert!(counter.updates.load(Ordering::SeqCst) >= 1);
        assert_eq!(counter.cleanups.load(Ordering::SeqCst), 1);
    }
}
