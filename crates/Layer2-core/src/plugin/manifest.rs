//! Plugin Manifest - 플러그인 메타데이터 정의

use crate::meta::DEFAULT_CATEGORY;
use serde::{Deserialize, Serialize};

/// 플러그인 기본 정렬 순서 (명시하지 않으면 뒤쪽)
pub const DEFAULT_PLUGIN_ORDER: i32 = 999;

/// 플러그인 매니페스트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// 플러그인 이름 (식별자, `window.<name>` 네임스페이스)
    pub name: String,

    /// 버전
    #[serde(default = "default_version")]
    pub version: String,

    /// 설명
    #[serde(default = "default_description")]
    pub description: String,

    /// UI 그룹 카테고리
    #[serde(default = "default_category")]
    pub category: String,

    /// UI 정렬 순서
    #[serde(default = "default_order", alias = "plugin_order")]
    pub order: i32,

    /// 먼저 로드되어 있어야 하는 플러그인 (없으면 경고만)
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_description() -> String {
    "No description provided".to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_order() -> i32 {
    DEFAULT_PLUGIN_ORDER
}

impl PluginManifest {
    /// 새 매니페스트 생성
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: default_description(),
            category: default_category(),
            order: default_order(),
            dependencies: Vec::new(),
        }
    }

    /// 빌더 패턴: 버전 설정
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 빌더 패턴: 설명 설정
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 빌더 패턴: 카테고리 설정
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// 빌더 패턴: 정렬 순서 설정
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 빌더 패턴: 의존성 추가
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}
