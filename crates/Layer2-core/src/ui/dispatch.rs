//! UI Action Dispatcher - (plugin, element, value) -> 핸들러 호출
//!
//! 핸들러가 파라미터를 하나 이상 선언하면 첫 번째 파라미터로 값을 넘긴다.
//! 값이 있으면 `config_key`에 기록하고 해당 플러그인에만 변경을 알린다.

use crate::meta::Call;
use super::schema::ui_handler;
use crate::plugin::{PluginHandle, PluginManager};
use cheatdeck_foundation::ConfigMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// UI 액션 결과 (`{success: true, result}` 또는 `{error}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiActionResult {
    Success { success: bool, result: Value },
    Failure { error: String },
}

impl UiActionResult {
    pub fn success(result: Value) -> Self {
        Self::Success {
            success: true,
            result,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// UI 액션 실행
pub async fn dispatch(
    manager: &PluginManager,
    handle: &PluginHandle,
    element: &str,
    value: Option<Value>,
) -> UiActionResult {
    let def = match ui_handler(handle, element) {
        Some(def) => def,
        None => {
            return UiActionResult::failure(format!(
                "UI element '{}' not found in plugin '{}'",
                element, handle.name
            ))
        }
    };
    let value = value.filter(|v| !v.is_null());

    let mut call = Call::new(Arc::clone(&handle.ctx)).with_injector(handle.ctx.injector());
    if def.signature.wants_plugin_manager {
        call = call.with_plugin_manager(Some(manager.clone()));
    }
    if let Some(first) = def.signature.first_param() {
        match &value {
            Some(v) => call = call.with_arg(first.name.clone(), v.clone()),
            None if first.default.is_none() => {
                call = call.with_arg(first.name.clone(), Value::Null)
            }
            None => {}
        }
    }

    debug!("Executing UI action {}.{}", handle.name, element);
    let result = match def.invoke(Arc::clone(&handle.plugin), call).await {
        Ok(result) => result,
        Err(e) => {
            error!("Error executing UI action {}.{}: {}", handle.name, element, e);
            return UiActionResult::failure(format!("Error executing UI action: {}", e));
        }
    };

    if let (Some(value), Some(spec)) = (value, def.ui.as_ref()) {
        let config_key = spec.effective_config_key(&def.name).to_string();
        write_through(manager, handle, config_key, value).await;
    }

    UiActionResult::success(result)
}

/// 메모리 -> 저장소 -> 메모리(정규값) -> 브라우저, 그리고 대상 알림 예약
async fn write_through(manager: &PluginManager, handle: &PluginHandle, key: String, value: Value) {
    let ctx = &handle.ctx;
    ctx.set_config_value(key.clone(), value.clone());

    let mut partial = ConfigMap::new();
    partial.insert(key, value);
    if let Err(e) = ctx.store().update_plugin_config(&handle.name, partial) {
        error!("Failed to persist UI value for {}: {}", handle.name, e);
        return;
    }

    let canonical = ctx.reload_from_store();
    if let Err(e) = ctx.push_config(&canonical).await {
        warn!("Failed to push config for {}: {}", handle.name, e);
    }
    manager.schedule_config_notification(canonical, Some(handle.name.clone()));
}
