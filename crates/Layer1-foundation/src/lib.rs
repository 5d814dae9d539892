//! # cheatdeck-foundation
//!
//! Foundation layer for cheatdeck:
//! - Error: 공통 에러 타입 (Error, ArgumentError)
//! - Config: 영속 설정 저장소 (ConfigStore, JsonConfigStore, HostSettings)
//! - Storage: JsonStore (범용 JSON 파일)
//! - Injector: 브라우저 표현식 평가 계약
//! - Console: 사용자 대상 출력 싱크
//! - Runtime: 동기 호출자를 위한 one-shot 런타임 브리지
//!
//! ## 아키텍처
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  cheatdeck-core (PluginManager, Composer, Dispatcher) │
//! │              │                │                       │
//! │              ▼                ▼                       │
//! │        ConfigStore        Injector ──▶ browser        │
//! │        (conf.json)        ConsoleSink ──▶ user        │
//! └───────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod injector;
pub mod logging;
pub mod runtime;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{ArgumentError, Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ConfigMap, ConfigStore, HostSettings, JsonConfigStore, CONFIG_FILE, PLUGIN_CONFIGS_KEY,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{strip_json_comments, JsonStore};

// ============================================================================
// Browser / Console
// ============================================================================
pub use console::{ConsoleSink, MemoryConsole, TracingConsole};
pub use injector::{EvaluateResponse, Injector, RemoteObject};

// ============================================================================
// Runtime
// ============================================================================
pub use runtime::Scheduled;
