//! Error types for cheatdeck
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// cheatdeck 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 플러그인 관련
    // ========================================================================
    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Failed to load plugin {name}: {message}")]
    PluginLoad { name: String, message: String },

    #[error("Discovery error: {0}")]
    Discovery(String),

    // ========================================================================
    // 명령어/핸들러 관련
    // ========================================================================
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("Handler {function} failed: {message}")]
    Handler { function: String, message: String },

    // ========================================================================
    // 브라우저 연동 관련
    // ========================================================================
    #[error("No injector connected. Run 'inject' first.")]
    NoInjector,

    #[error("Injector error: {0}")]
    Injector(String),

    #[error("Function not found: window.{plugin}.{function}")]
    FunctionNotFound { plugin: String, function: String },

    #[error("JS syntax error in {plugin}.{export}: {message}")]
    JsSyntax {
        plugin: String,
        export: String,
        message: String,
    },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Argument(_)
                | Error::NoInjector
                | Error::FunctionNotFound { .. }
                | Error::PluginNotFound(_)
                | Error::NotFound(_)
                | Error::InvalidInput(_)
        )
    }

    /// 플러그인 로드 에러 생성 헬퍼
    pub fn plugin_load(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PluginLoad {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 핸들러 실행 에러 생성 헬퍼
    pub fn handler(function: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Handler {
            function: function.into(),
            message: message.into(),
        }
    }

    /// 브라우저 함수 부재 에러 생성 헬퍼
    pub fn function_not_found(plugin: impl Into<String>, function: impl Into<String>) -> Self {
        Error::FunctionNotFound {
            plugin: plugin.into(),
            function: function.into(),
        }
    }
}

// ============================================================================
// ArgumentError - 명령어 인자 파싱 에러
// ============================================================================

/// 명령어 인자 파싱 에러
///
/// 문제가 된 파라미터 이름이나 값을 함께 담는다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("Too many arguments: {}", extra.join(" "))]
    TooManyArguments { extra: Vec<String> },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

impl ArgumentError {
    pub fn missing(name: impl Into<String>) -> Self {
        ArgumentError::MissingArgument { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, value: impl Into<String>) -> Self {
        ArgumentError::InvalidValue {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
