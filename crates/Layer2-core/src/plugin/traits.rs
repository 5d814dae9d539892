//! Plugin traits - 핵심 플러그인 인터페이스

use super::context::PluginContext;
use super::manifest::PluginManifest;
use async_trait::async_trait;
use cheatdeck_foundation::{ConfigMap, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

// ============================================================================
// AsAny - 다운캐스팅 지원
// ============================================================================

/// 타입 캐스팅을 위한 헬퍼 (모든 `'static + Send + Sync` 타입에 자동 구현)
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// ============================================================================
// WebRoute - 플러그인이 노출하는 웹 라우트
// ============================================================================

/// 웹 라우트 선언 (프런트엔드가 실제 서버에 연결)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebRoute {
    pub method: String,
    pub path: String,
    /// 처리 함수 이름
    pub handler: String,
}

impl WebRoute {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        handler: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            handler: handler.into(),
        }
    }
}

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// 설정 동기화, 브라우저 호출 같은 공통 동작은 `PluginContext`가 담당하고
/// 플러그인은 필요한 콜백만 구현한다. 모든 콜백은 `ctx`를 통해 자기 설정에 접근한다.
#[async_trait]
pub trait Plugin: AsAny {
    /// 플러그인 매니페스트 반환
    fn manifest(&self) -> PluginManifest;

    /// (재)연결 시 호출. false 또는 에러면 실패 목록으로 간다.
    ///
    /// 기본 구현은 브라우저에 `window.pluginConfigs[name]`을 밀어 넣는다.
    async fn initialize(&self, ctx: &PluginContext) -> Result<bool> {
        ctx.init_config_in_browser().await;
        Ok(true)
    }

    /// 배치 초기화 후 injector가 있을 때 한 번 호출
    async fn on_game_ready(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 주기적 업데이트
    async fn update(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 언로드 및 리로드 전 정리
    async fn cleanup(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 설정 변경 알림
    ///
    /// 기본 구현은 전달된 설정을 브라우저 미러에 반영한다.
    async fn on_config_changed(&self, ctx: &PluginContext, config: &ConfigMap) -> Result<()> {
        ctx.push_config(config).await
    }

    /// 페이지 로드 알림
    async fn on_page_load(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 치트 실행 알림
    async fn on_cheat_executed(
        &self,
        _ctx: &PluginContext,
        _command: &str,
        _result: &Value,
    ) -> Result<()> {
        Ok(())
    }

    /// 자동완성 후보 (autocomplete_input 등)
    async fn autocomplete(
        &self,
        _ctx: &PluginContext,
        _element: &str,
        _query: &str,
    ) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    /// 플러그인이 노출하는 웹 라우트
    fn web_routes(&self) -> Vec<WebRoute> {
        Vec::new()
    }
}

/// 플러그인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// 활성 목록에 있음
    Active,

    /// cleanup 진행 중
    Unloading,

    /// 실패 목록에 있음
    Failed,
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Unloading => write!(f, "unloading"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_for, EchoPlugin};

    #[tokio::test]
    async fn test_default_callbacks_are_noops_without_injector() {
        let plugin = EchoPlugin::default();
        let ctx = context_for("echo_plugin");

        assert!(plugin.initialize(&ctx).await.unwrap());
        plugin.on_game_ready(&ctx).await.unwrap();
        plugin.update(&ctx).await.unwrap();
        plugin.on_config_changed(&ctx, &ConfigMap::new()).await.unwrap();
        assert!(plugin.autocomplete(&ctx, "item", "sw").await.unwrap().is_empty());
        assert!(plugin.web_routes().is_empty());
    }

    #[test]
    fn test_downcast_through_any() {
        let plugin: Arc<dyn Plugin> = Arc::new(EchoPlugin::default());
        assert!((*plugin).as_any().downcast_ref::<EchoPlugin>().is_some());
        assert!(plugin.into_any().downcast::<EchoPlugin>().is_ok());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PluginStatus::Active.to_string(), "active");
        assert_eq!(PluginStatus::Failed.to_string(), "failed");
    }
}
