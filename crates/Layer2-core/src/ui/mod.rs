//! # UI
//!
//! 외부 프런트엔드가 쓰는 UI 스키마 집계와 액션 처리.

mod dispatch;
mod schema;

pub use dispatch::{dispatch, UiActionResult};
pub use schema::{
    categorize, config_path, element_views, plugin_schema, ui_handler, PluginInfo, UiElementView,
    UiSchema,
};
