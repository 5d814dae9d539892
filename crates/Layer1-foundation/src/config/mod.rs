//! Config - 설정 관리
//!
//! - `store.rs` - ConfigStore trait, JsonConfigStore (conf.json)
//! - `settings.rs` - HostSettings (호스트 전역 설정)
//! - `path.rs` - 점 경로 접근

pub mod path;
mod settings;
mod store;

pub use settings::HostSettings;
pub use store::{ConfigMap, ConfigStore, JsonConfigStore, CONFIG_FILE, PLUGIN_CONFIGS_KEY};
