//! Storage module for cheatdeck
//!
//! - `json`: JSON - 설정 파일 저장/로드 (주석 허용)

mod json;

// JSON Storage
pub use json::{strip_json_comments, JsonStore};
