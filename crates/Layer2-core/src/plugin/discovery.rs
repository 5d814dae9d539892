//! Plugin Discovery - 플러그인 파일 위치 규칙과 스캔
//!
//! 설정 목록의 이름은 `<name>` 또는 `<subdir>.<name>` 형식이다.
//! 각각 `plugin_dir/<name>.<ext>`, `plugin_dir/<subdir>/<name>.<ext>`로 매핑된다.

use cheatdeck_foundation::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// 모듈 키 접두사 (`plugins.<name>`)
pub const MODULE_PREFIX: &str = "plugins";

/// 스캔에서 제외하는 예제 플러그인
const EXAMPLE_PLUGIN: &str = "example_plugin";

/// 로드 키 -> 모듈 키
pub fn module_key(load_key: &str) -> String {
    format!("{}.{}", MODULE_PREFIX, load_key)
}

/// 로드 키 검증 (`name` 또는 `subdir.name`)
pub fn validate_load_key(load_key: &str) -> Result<()> {
    let segments: Vec<&str> = load_key.split('.').collect();
    let valid = !segments.is_empty()
        && segments.len() <= 2
        && segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });
    if valid {
        Ok(())
    } else {
        Err(Error::Discovery(format!("Invalid plugin name: '{}'", load_key)))
    }
}

/// 로드 키 -> 파일 경로
pub fn resolve_plugin_path(plugin_dir: &Path, load_key: &str, extension: &str) -> PathBuf {
    match load_key.split_once('.') {
        Some((subdir, name)) => plugin_dir.join(subdir).join(format!("{}.{}", name, extension)),
        None => plugin_dir.join(format!("{}.{}", load_key, extension)),
    }
}

/// 발견된 플러그인 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPlugin {
    /// 로드 키 (`subdir.name` 또는 `name`)
    pub load_key: String,

    pub path: PathBuf,
}

/// 플러그인 디렉토리 스캐너
pub struct PluginDiscovery {
    plugin_dir: PathBuf,
    extensions: Vec<String>,
}

impl PluginDiscovery {
    pub fn new(plugin_dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            extensions,
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// 루트와 한 단계 하위 디렉토리의 플러그인 파일
    pub async fn scan(&self) -> Result<Vec<DiscoveredPlugin>> {
        let mut found = Vec::new();
        if !self.plugin_dir.is_dir() {
            debug!("Plugin directory {:?} does not exist", self.plugin_dir);
            return Ok(found);
        }

        let mut subdirs = Vec::new();
        let mut entries = fs::read_dir(&self.plugin_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                if !is_hidden(&path) {
                    subdirs.push(path);
                }
            } else if let Some(stem) = self.plugin_stem(&path) {
                found.push(DiscoveredPlugin {
                    load_key: stem,
                    path,
                });
            }
        }

        for subdir in subdirs {
            let prefix = match subdir.file_name().and_then(|n| n.to_str()) {
                Some(prefix) => prefix.to_string(),
                None => continue,
            };
            let mut entries = match fs::read_dir(&subdir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to scan plugin directory {:?}: {}", subdir, e);
                    continue;
                }
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_file() {
                    if let Some(stem) = self.plugin_stem(&path) {
                        found.push(DiscoveredPlugin {
                            load_key: format!("{}.{}", prefix, stem),
                            path,
                        });
                    }
                }
            }
        }

        found.sort_by(|a, b| a.load_key.cmp(&b.load_key));
        found.dedup_by(|a, b| a.load_key == b.load_key);
        Ok(found)
    }

    /// 설정 목록에 없는 플러그인
    pub async fn unused(&self, configured: &[String]) -> Result<Vec<DiscoveredPlugin>> {
        let configured: HashSet<&str> = configured.iter().map(String::as_str).collect();
        let unused: Vec<_> = self
            .scan()
            .await?
            .into_iter()
            .filter(|p| !configured.contains(p.load_key.as_str()))
            .collect();
        if !unused.is_empty() {
            info!("Found {} unused plugins", unused.len());
        }
        Ok(unused)
    }

    fn plugin_stem(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        if !self.extensions.iter().any(|e| e == ext) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.starts_with('_') || stem.starts_with('.') || stem == EXAMPLE_PLUGIN {
            return None;
        }
        Some(stem.to_string())
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.') || n.starts_with('_'))
}
