//! JSON 파일 저장소

mod comments;
mod store;

pub use comments::strip_json_comments;
pub use store::JsonStore;
