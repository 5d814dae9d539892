//! Config Store - 영속 설정 저장소
//!
//! 디스크의 `conf.json`을 메모리에 캐시하고 변경 시 즉시 기록한다.
//! 플러그인 설정은 `plugin_configs.<plugin>` 아래에 객체로 저장된다.

use super::path;
use crate::storage::JsonStore;
use crate::{Error, Result};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// 플러그인 설정 맵 (키 -> 값)
pub type ConfigMap = Map<String, Value>;

/// 설정 파일명
pub const CONFIG_FILE: &str = "conf.json";

/// 플러그인 설정 루트 키
pub const PLUGIN_CONFIGS_KEY: &str = "plugin_configs";

// ============================================================================
// ConfigStore Trait
// ============================================================================

/// 영속 설정 저장소 인터페이스
///
/// 모든 쓰기 연산은 반환 전에 디스크에 반영된다.
pub trait ConfigStore: Send + Sync {
    /// 점 경로로 값 조회 (없으면 None)
    fn get_path(&self, path: &str) -> Option<Value>;

    /// 점 경로에 값 설정 후 저장
    fn set_path(&self, path: &str, value: Value) -> Result<()>;

    /// 플러그인 설정 조회 (없으면 빈 맵)
    fn get_plugin_config(&self, plugin: &str) -> ConfigMap;

    /// 플러그인 설정 전체 교체 후 저장
    fn set_plugin_config(&self, plugin: &str, config: ConfigMap) -> Result<()>;

    /// 모든 플러그인 설정
    fn get_all_plugin_configs(&self) -> Map<String, Value>;

    /// 플러그인 설정에 부분 병합 후 저장
    fn update_plugin_config(&self, plugin: &str, partial: ConfigMap) -> Result<()>;

    /// 디스크에서 다시 읽기
    fn reload(&self) -> Result<()>;

    /// 설정 전체 스냅샷
    fn snapshot(&self) -> Value;

    /// 설정된 플러그인 이름 목록
    fn plugins(&self) -> Vec<String> {
        self.get_path("plugins")
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// 점 경로 조회 (기본값)
    fn get_path_or(&self, path: &str, default: Value) -> Value {
        self.get_path(path).unwrap_or(default)
    }
}

// ============================================================================
// JsonConfigStore
// ============================================================================

/// JSON 파일 기반 설정 저장소
pub struct JsonConfigStore {
    /// 디스크 저장소 (None이면 메모리 전용)
    store: Option<JsonStore>,

    /// 메모리 캐시
    data: RwLock<Value>,
}

impl JsonConfigStore {
    /// 디렉토리의 `conf.json`을 연다
    ///
    /// 파일이 없거나 깨져 있으면 기본값으로 시작한다.
    pub fn open(store: JsonStore) -> Self {
        let data = Self::read_or_default(&store);
        Self {
            store: Some(store),
            data: RwLock::new(data),
        }
    }

    /// 글로벌 설정 디렉토리에서 연다
    pub fn global() -> Result<Self> {
        Ok(Self::open(JsonStore::global()?))
    }

    /// 디스크 없이 메모리만 사용하는 저장소
    pub fn in_memory(initial: Value) -> Self {
        let data = match initial {
            Value::Object(_) => with_defaults(initial),
            _ => default_config(),
        };
        Self {
            store: None,
            data: RwLock::new(data),
        }
    }

    /// 디스크 저장소
    pub fn json_store(&self) -> Option<&JsonStore> {
        self.store.as_ref()
    }

    /// 설정된 플러그인 목록 교체 후 저장
    pub fn set_plugins(&self, plugins: &[String]) -> Result<()> {
        self.set_path("plugins", json!(plugins))
    }

    /// 플러그인을 목록에 추가 (이미 있으면 무시)
    pub fn add_plugin(&self, plugin: &str, config: Option<ConfigMap>) -> Result<()> {
        let mut plugins = self.plugins();
        if !plugins.iter().any(|p| p == plugin) {
            plugins.push(plugin.to_string());
            self.set_plugins(&plugins)?;
        }
        if let Some(config) = config {
            self.set_plugin_config(plugin, config)?;
        }
        Ok(())
    }

    /// 플러그인을 목록과 설정에서 제거
    pub fn remove_plugin(&self, plugin: &str) -> Result<()> {
        let plugins: Vec<String> = self.plugins().into_iter().filter(|p| p != plugin).collect();
        {
            let mut data = self.data.write();
            if let Some(root) = data.as_object_mut() {
                root.insert("plugins".to_string(), json!(plugins));
                if let Some(configs) = root
                    .get_mut(PLUGIN_CONFIGS_KEY)
                    .and_then(Value::as_object_mut)
                {
                    configs.remove(plugin);
                }
            }
        }
        self.persist()
    }

    fn read_or_default(store: &JsonStore) -> Value {
        match store.load_optional::<Value>(CONFIG_FILE) {
            Ok(Some(value @ Value::Object(_))) => {
                info!("Loaded config from {}", store.file_path(CONFIG_FILE).display());
                with_defaults(value)
            }
            Ok(Some(_)) => {
                warn!("Config root is not an object, using defaults");
                default_config()
            }
            Ok(None) => {
                warn!(
                    "Config file not found at {}, using defaults",
                    store.file_path(CONFIG_FILE).display()
                );
                default_config()
            }
            Err(e) => {
                warn!("Error loading config: {}", e);
                default_config()
            }
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(store) = &self.store {
            let data = self.data.read().clone();
            store.save(CONFIG_FILE, &data)?;
            debug!("Saved config to {}", store.file_path(CONFIG_FILE).display());
        }
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn get_path(&self, path: &str) -> Option<Value> {
        let data = self.data.read();
        path::get_path(&data, path).cloned()
    }

    fn set_path(&self, path: &str, value: Value) -> Result<()> {
        path::set_path(&mut self.data.write(), path, value)?;
        self.persist()?;
        debug!("Set config path '{}'", path);
        Ok(())
    }

    fn get_plugin_config(&self, plugin: &str) -> ConfigMap {
        let data = self.data.read();
        data.get(PLUGIN_CONFIGS_KEY)
            .and_then(|configs| configs.get(plugin))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    fn set_plugin_config(&self, plugin: &str, config: ConfigMap) -> Result<()> {
        let path = plugin_path(plugin)?;
        path::set_path(&mut self.data.write(), &path, Value::Object(config))?;
        self.persist()?;
        info!("Updated config for plugin: {}", plugin);
        Ok(())
    }

    fn get_all_plugin_configs(&self) -> Map<String, Value> {
        let data = self.data.read();
        data.get(PLUGIN_CONFIGS_KEY)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    fn update_plugin_config(&self, plugin: &str, partial: ConfigMap) -> Result<()> {
        let mut merged = self.get_plugin_config(plugin);
        merged.extend(partial);
        self.set_plugin_config(plugin, merged)
    }

    fn reload(&self) -> Result<()> {
        let store = match &self.store {
            Some(store) => store,
            None => return Ok(()),
        };
        let fresh = match store.load_optional::<Value>(CONFIG_FILE)? {
            Some(value @ Value::Object(_)) => with_defaults(value),
            Some(_) => {
                return Err(Error::Config(format!(
                    "{} root must be an object",
                    store.file_path(CONFIG_FILE).display()
                )))
            }
            None => default_config(),
        };
        *self.data.write() = fresh;
        info!("Configuration reloaded from file");
        Ok(())
    }

    fn snapshot(&self) -> Value {
        self.data.read().clone()
    }
}

fn plugin_path(plugin: &str) -> Result<String> {
    if plugin.is_empty() || plugin.contains('.') {
        return Err(Error::InvalidInput(format!("Invalid plugin name: '{}'", plugin)));
    }
    Ok(format!("{}.{}", PLUGIN_CONFIGS_KEY, plugin))
}

fn default_config() -> Value {
    json!({
        "plugins": [],
        "plugin_configs": {},
        "debug": false,
    })
}

fn with_defaults(mut value: Value) -> Value {
    if let (Value::Object(map), Value::Object(defaults)) = (&mut value, default_config()) {
        for (key, default) in defaults {
            map.entry(key).or_insert(default);
        }
    }
    value
}
