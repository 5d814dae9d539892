//! # Plugin System
//!
//! 게임 치트 플러그인의 로드, 초기화, 설정 동기화, 종료를 담당한다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PluginManager                           │
//! │  ┌───────────────────────────────────────────────────────┐ │
//! │  │       PluginRegistry (active set | failed set)        │ │
//! │  │  ┌────────────┬────────────┬────────────────────┐     │ │
//! │  │  │ Plugin A   │ Plugin B   │ Plugin C           │     │ │
//! │  │  │ (native)   │ (script)   │ (script)           │     │ │
//! │  │  └────────────┴────────────┴────────────────────┘     │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! │                          │                                  │
//! │  ┌───────────────────────┼───────────────────────────────┐ │
//! │  │     PluginContext     │                               │ │
//! │  │  - config (memory)    ─── ConfigStore (conf.json)     │ │
//! │  │  - injector           ─── window.pluginConfigs[name]  │ │
//! │  │  - MetadataRegistry                                   │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 플러그인 타입
//!
//! 1. **Native Plugin**: 바이너리에 링크된 Rust 플러그인 (`StaticLoader`)
//! 2. **Script Plugin**: `plugins/*.json` 선언형 플러그인 (`ScriptLoader`)
//!
//! ## 예시
//!
//! ```ignore
//! struct Anvil;
//!
//! #[async_trait]
//! impl Plugin for Anvil {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::new("anvil").with_category("World 1")
//!     }
//! }
//!
//! let loader = StaticLoader::new().with_module("anvil", || {
//!     PluginModule::native(|_config| Ok(Anvil)).function(
//!         FunctionDef::new("speed", |_p: Arc<Anvil>, call: Call| async move {
//!             Ok(json!(call.f64_arg("value")))
//!         })
//!         .param("value")
//!         .ui(UiElementSpec::slider("Speed", 1.0, 10.0)),
//!     )
//! });
//!
//! let manager = PluginManager::builder(store).loader(Arc::new(loader)).build();
//! manager.load_plugins(Some(injector), None).await;
//! ```

mod bridge;
mod context;
mod discovery;
mod events;
mod loader;
mod manager;
mod manifest;
mod registry;
mod script;
mod traits;

pub use bridge::{call_function, config_assignment, function_call, function_probe, push_config};
pub use context::PluginContext;
pub use discovery::{
    module_key, resolve_plugin_path, validate_load_key, DiscoveredPlugin, PluginDiscovery,
    MODULE_PREFIX,
};
pub use events::{EventBus, EventType, HostEvent, HostEventHandler};
pub use loader::{ModuleCache, ModuleDefinition, ModuleLoader, PluginFactory, PluginModule, StaticLoader};
pub use manager::{
    ConfigOverrides, HostSummary, LoadSummary, ManagerHandle, PluginManager, PluginManagerBuilder,
};
pub use manifest::{PluginManifest, DEFAULT_PLUGIN_ORDER};
pub use registry::{FailedPlugin, PluginHandle, PluginRegistry};
pub use script::{ScriptLoader, ScriptPlugin, SCRIPT_EXTENSION};
pub use traits::{AsAny, Plugin, PluginStatus, WebRoute};
