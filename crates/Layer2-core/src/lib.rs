//! cheatdeck-core: Plugin Host Runtime
//!
//! Layer2 - 플러그인 로드/수명주기, 명령어, UI 스키마, 브라우저 JS payload
//!
//! # 주요 모듈
//!
//! - `meta`: 함수 마커(command / UI element / JS export)와 메타데이터 레지스트리
//! - `plugin`: 플러그인 trait, 로더, 레지스트리, 설정 브리지, PluginManager
//! - `command`: 명령어 인자 파싱과 실행
//! - `ui`: UI 스키마 집계와 UI 액션 처리
//! - `js`: 브라우저 주입용 JS payload 합성
//!
//! # 사용 예시
//!
//! ```ignore
//! use cheatdeck_core::{PluginManager, StaticLoader};
//! use cheatdeck_foundation::{HostSettings, JsonConfigStore};
//!
//! let store = Arc::new(JsonConfigStore::global()?);
//! let settings = HostSettings::from_store(store.as_ref())?;
//!
//! let manager = PluginManager::from_settings(&settings, store)
//!     .loader(Arc::new(my_plugins()))
//!     .build();
//!
//! // 로드 + 초기화 (injector가 있으면 on_game_ready까지)
//! manager.load_plugins(Some(injector), None).await;
//!
//! // 브라우저 payload
//! let (script, sizes) = manager.collect_all_plugin_js_with_sizes().await;
//!
//! // 명령어 / UI
//! manager.execute_command_line("plugins.anvil.set_speed 5").await?;
//! let schemas = manager.get_all_ui_schemas().await;
//! manager.execute_ui_action("anvil", "speed", Some(json!(7))).await;
//! ```

pub mod command;
pub mod js;
pub mod meta;
pub mod plugin;
pub mod ui;

#[cfg(test)]
mod test_support;

// Re-exports: Metadata
pub use meta::{
    Call, CommandSpec, FunctionDef, JsExportSpec, MetadataRegistry, ParamSpec, ParamType,
    SelectOption, UiElementSpec, UiElementType,
};

// Re-exports: Plugin
pub use plugin::{
    ConfigOverrides, EventBus, EventType, HostEvent, HostEventHandler, HostSummary, LoadSummary,
    ModuleLoader, Plugin, PluginContext, PluginHandle, PluginManager, PluginManagerBuilder,
    PluginManifest, PluginModule, PluginStatus, ScriptLoader, StaticLoader, WebRoute,
};

// Re-exports: Command
pub use command::{parse_args, CommandEntry};

// Re-exports: UI
pub use ui::{UiActionResult, UiElementView, UiSchema};

// Re-exports: JS
pub use js::{AcceptAll, ComposedPayload, JsComposer, JsSyntaxChecker, NodeSyntaxChecker};
