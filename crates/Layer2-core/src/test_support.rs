//! 단위 테스트 공용 픽스처

use crate::meta::{Call, CommandSpec, FunctionDef, MetadataRegistry, ParamSpec, UiElementSpec};
use crate::plugin::{
    AsAny, Plugin, PluginContext, PluginHandle, PluginManifest, PluginModule, StaticLoader,
    WebRoute,
};
use async_trait::async_trait;
use cheatdeck_foundation::{
    ConfigMap, ConfigStore, Error, EvaluateResponse, Injector, JsonConfigStore, Result,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Plugins
// ============================================================================

/// 기본 콜백만 쓰는 플러그인
#[derive(Debug, Default)]
pub struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("echo_plugin").with_description("Echoes its arguments")
    }
}

/// 다운캐스트 실패 확인용
#[derive(Debug)]
pub struct OtherPlugin;

#[async_trait]
impl Plugin for OtherPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("other")
    }
}

/// 콜백 호출 횟수를 센다
#[derive(Debug, Default)]
pub struct CountingPlugin {
    pub initialized: AtomicUsize,
    pub game_ready: AtomicUsize,
    pub updates: AtomicUsize,
    pub cleanups: AtomicUsize,
    pub config_changes: AtomicUsize,
    pub page_loads: AtomicUsize,
    pub cheats: AtomicUsize,
}

impl CountingPlugin {
    pub fn from_handle(handle: &PluginHandle) -> Arc<CountingPlugin> {
        Arc::clone(&handle.plugin)
            .into_any()
            .downcast::<CountingPlugin>()
            .expect("handle holds a CountingPlugin")
    }
}

#[async_trait]
impl Plugin for CountingPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("counter").with_category("Testing")
    }

    async fn initialize(&self, ctx: &PluginContext) -> Result<bool> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        ctx.init_config_in_browser().await;
        Ok(true)
    }

    async fn on_game_ready(&self, _ctx: &PluginContext) -> Result<()> {
        self.game_ready.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, _ctx: &PluginContext) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup(&self, _ctx: &PluginContext) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_config_changed(&self, ctx: &PluginContext, config: &ConfigMap) -> Result<()> {
        self.config_changes.fetch_add(1, Ordering::SeqCst);
        ctx.push_config(config).await
    }

    async fn on_page_load(&self, _ctx: &PluginContext) -> Result<()> {
        self.page_loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_cheat_executed(
        &self,
        _ctx: &PluginContext,
        _command: &str,
        _result: &Value,
    ) -> Result<()> {
        self.cheats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn autocomplete(
        &self,
        _ctx: &PluginContext,
        _element: &str,
        query: &str,
    ) -> Result<Vec<Value>> {
        Ok(["level_1", "level_2", "boost"]
            .iter()
            .filter(|item| item.starts_with(query))
            .map(|item| json!(item))
            .collect())
    }

    fn web_routes(&self) -> Vec<WebRoute> {
        vec![WebRoute::new("GET", "/counter/level", "get_level")]
    }
}

/// 알림 콜백마다 에러를 돌려준다
#[derive(Debug, Default)]
pub struct FaultyPlugin;

impl FaultyPlugin {
    fn fail(what: &str) -> Error {
        Error::Plugin(format!("faulty {} handler", what))
    }
}

#[async_trait]
impl Plugin for FaultyPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("faulty")
    }

    async fn on_config_changed(&self, _ctx: &PluginContext, _config: &ConfigMap) -> Result<()> {
        Err(Self::fail("config"))
    }

    async fn on_page_load(&self, _ctx: &PluginContext) -> Result<()> {
        Err(Self::fail("page load"))
    }

    async fn on_cheat_executed(
        &self,
        _ctx: &PluginContext,
        _command: &str,
        _result: &Value,
    ) -> Result<()> {
        Err(Self::fail("cheat"))
    }

    async fn autocomplete(
        &self,
        _ctx: &PluginContext,
        _element: &str,
        _query: &str,
    ) -> Result<Vec<Value>> {
        Err(Self::fail("autocomplete"))
    }

    fn web_routes(&self) -> Vec<WebRoute> {
        vec![
            WebRoute::new("GET", "/faulty/status", "status"),
            WebRoute::new("POST", "/faulty/reset", "reset"),
        ]
    }
}

/// initialize가 false를 돌려준다
#[derive(Debug, Default)]
pub struct RefusingPlugin;

#[async_trait]
impl Plugin for RefusingPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("refuser")
    }

    async fn initialize(&self, _ctx: &PluginContext) -> Result<bool> {
        Ok(false)
    }
}

// ============================================================================
// Modules
// ============================================================================

fn counter_module() -> PluginModule {
    PluginModule::native(|_config| Ok(CountingPlugin::default()))
        .function(
            FunctionDef::new("set_level", |_p: Arc<CountingPlugin>, call: Call| async move {
                let level = call.i64_arg("level").unwrap_or_default();
                let mut partial = ConfigMap::new();
                partial.insert("level".into(), json!(level));
                call.ctx.save_to_global_config(Some(partial)).await?;
                Ok(json!(level))
            })
            .command(CommandSpec::new("Set the counter level").param(ParamSpec::int("level"))),
        )
        .function(
            FunctionDef::new("enabled", |_p: Arc<CountingPlugin>, call: Call| async move {
                Ok(json!(call.bool_arg("value").unwrap_or_default()))
            })
            .param_default("value", false)
            .ui(UiElementSpec::toggle("Enabled")),
        )
}

/// counter / echo_plugin / refuser / faulty가 들어 있는 로더
pub fn native_loader() -> StaticLoader {
    StaticLoader::new()
        .with_module("counter", counter_module)
        .with_module("echo_plugin", || {
            PluginModule::native(|_config| Ok(EchoPlugin::default()))
        })
        .with_module("refuser", || {
            PluginModule::native(|_config| Ok(RefusingPlugin::default()))
        })
        .with_module("faulty", || {
            PluginModule::native(|_config| Ok(FaultyPlugin::default()))
        })
}

// ============================================================================
// Contexts / Handles
// ============================================================================

fn empty_store() -> Arc<dyn ConfigStore> {
    Arc::new(JsonConfigStore::in_memory(json!({})))
}

pub fn context_for(name: &str) -> Arc<PluginContext> {
    Arc::new(PluginContext::new(
        name,
        std::any::type_name::<EchoPlugin>(),
        ConfigMap::new(),
        empty_store(),
        Arc::new(MetadataRegistry::new()),
    ))
}

/// EchoPlugin 핸들 (함수 정의는 자체 레지스트리에 등록)
pub fn handle_with(
    name: &str,
    store: Arc<dyn ConfigStore>,
    functions: Vec<FunctionDef>,
) -> PluginHandle {
    let class = std::any::type_name::<EchoPlugin>();
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register_class(class, functions);

    let config = store.get_plugin_config(name);
    let ctx = Arc::new(PluginContext::new(name, class, config, store, metadata));
    PluginHandle {
        name: name.to_string(),
        load_key: name.to_string(),
        plugin: Arc::new(EchoPlugin),
        ctx,
        module: Arc::new(PluginModule::native(|_config| Ok(EchoPlugin::default()))),
    }
}

pub fn echo_handle(name: &str) -> PluginHandle {
    handle_with(name, empty_store(), Vec::new())
}

// ============================================================================
// Injector
// ============================================================================

/// 표현식을 기록하는 injector
///
/// 함수 존재 확인 표현식에는 `probe_result`, 나머지에는 `call_result`를 돌려준다.
pub struct RecordingInjector {
    expressions: Mutex<Vec<String>>,
    probe_result: bool,
    call_result: Value,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self {
            expressions: Mutex::new(Vec::new()),
            probe_result: true,
            call_result: Value::Null,
        }
    }

    pub fn with_probe_result(mut self, result: bool) -> Self {
        self.probe_result = result;
        self
    }

    pub fn with_call_result(mut self, result: Value) -> Self {
        self.call_result = result;
        self
    }

    pub fn expressions(&self) -> Vec<String> {
        self.expressions.lock().clone()
    }
}

#[async_trait]
impl Injector for RecordingInjector {
    async fn evaluate(&self, expression: &str, _await_promise: bool) -> Result<EvaluateResponse> {
        self.expressions.lock().push(expression.to_string());
        let is_probe =
            expression.starts_with("typeof window.") && expression.contains("=== 'function'");
        let value = if is_probe {
            Value::Bool(self.probe_result)
        } else {
            self.call_result.clone()
        };
        Ok(EvaluateResponse::from_value(value))
    }
}
