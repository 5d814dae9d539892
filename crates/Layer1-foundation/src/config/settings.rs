//! Host Settings - 호스트 전역 설정
//!
//! `conf.json` 루트에서 플러그인 외 항목만 읽어온다.

use super::store::ConfigStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 호스트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// 로드할 플러그인 이름 목록 (순서 = 삽입 순서)
    #[serde(default)]
    pub plugins: Vec<String>,

    /// 디버그 로그 및 JS 덤프 활성화
    #[serde(default)]
    pub debug: bool,

    /// 플러그인 디렉토리
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    /// update 주기 (밀리초)
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// JS 문법 검사 사용 여부
    #[serde(default = "default_true")]
    pub js_syntax_check: bool,

    /// JS 덤프 디렉토리 (debug일 때만 사용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_dump_dir: Option<PathBuf>,
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            debug: false,
            plugin_dir: default_plugin_dir(),
            update_interval_ms: default_update_interval_ms(),
            js_syntax_check: true,
            js_dump_dir: None,
        }
    }
}

impl HostSettings {
    /// 저장소 스냅샷에서 읽기
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self> {
        Ok(serde_json::from_value(store.snapshot())?)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }

    /// debug일 때만 덤프 디렉토리 반환
    pub fn effective_dump_dir(&self) -> Option<PathBuf> {
        if self.debug {
            self.js_dump_dir.clone()
        } else {
            None
        }
    }
}
