//! # Metadata
//!
//! 플러그인 함수에 붙는 선언형 마커와 그 레지스트리.
//!
//! ```text
//! FunctionDef ── handler (async)
//!      │        signature (params, injector?, plugin_manager?)
//!      ├── CommandSpec     → 명령어 테이블 (plugins.<p>.<f>)
//!      ├── UiElementSpec   → UI 스키마
//!      └── JsExportSpec    → 브라우저 payload (window.<p>.<f>)
//! ```

mod descriptor;
mod function;
mod registry;

pub use descriptor::{
    CommandSpec, JsExportSpec, ParamSpec, ParamType, SelectOption, UiElementSpec, UiElementType,
    DEFAULT_CATEGORY,
};
pub use function::{Call, FunctionDef, Handler, SigParam, Signature, JS_SUFFIX};
pub use registry::MetadataRegistry;
