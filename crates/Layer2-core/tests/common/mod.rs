//! 통합 테스트 공용 픽스처

#![allow(dead_code)]

use async_trait::async_trait;
use cheatdeck_core::plugin::AsAny;
use cheatdeck_core::{
    Call, CommandSpec, FunctionDef, JsExportSpec, ParamSpec, Plugin, PluginContext, PluginHandle,
    PluginManifest, PluginModule, UiElementSpec,
};
use cheatdeck_foundation::{ConfigMap, EvaluateResponse, Injector, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 이름을 바꿔 쓸 수 있는 관찰용 플러그인
#[derive(Debug, Default)]
pub struct ProbePlugin {
    pub name: String,
    pub handler_calls: AtomicUsize,
    pub config_changes: Mutex<Vec<ConfigMap>>,
    pub last_toggle: Mutex<Option<bool>>,
}

impl ProbePlugin {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn from_handle(handle: &PluginHandle) -> Arc<ProbePlugin> {
        Arc::clone(&handle.plugin)
            .into_any()
            .downcast::<ProbePlugin>()
            .expect("handle holds a ProbePlugin")
    }

    pub fn config_change_count(&self) -> usize {
        self.config_changes.lock().len()
    }
}

#[async_trait]
impl Plugin for ProbePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(self.name.clone()).with_description("Integration probe")
    }

    async fn on_config_changed(&self, ctx: &PluginContext, config: &ConfigMap) -> Result<()> {
        self.config_changes.lock().push(config.clone());
        ctx.push_config(config).await
    }
}

/// 플러그인 이름별로 클래스 키가 다른 모듈
pub fn probe_module(name: &'static str) -> PluginModule {
    PluginModule::new(
        format!("probe::{}", name),
        move |_config: ConfigMap| -> Result<Arc<dyn Plugin>> {
            Ok(Arc::new(ProbePlugin::named(name)))
        },
    )
}

/// `set(toggle: bool = false)` 명령어, injector 필요
pub fn set_command() -> FunctionDef {
    FunctionDef::new("set", |p: Arc<ProbePlugin>, call: Call| async move {
        p.handler_calls.fetch_add(1, Ordering::SeqCst);
        let toggle = call.bool_arg("toggle").unwrap_or_default();
        *p.last_toggle.lock() = Some(toggle);
        Ok(json!(toggle))
    })
    .command(
        CommandSpec::new("Toggle the feature")
            .param(ParamSpec::bool("toggle").with_default(false)),
    )
    .needs_injector()
}

/// `debug` 키에 묶인 토글
pub fn debug_toggle() -> FunctionDef {
    FunctionDef::new("enable_debug", |p: Arc<ProbePlugin>, call: Call| async move {
        p.handler_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!(call.bool_arg("value").unwrap_or_default()))
    })
    .param("value")
    .ui(UiElementSpec::toggle("Debug").with_config_key("debug"))
}

/// 고정 본문 JS export
pub fn js_export(name: &str, body: &'static str) -> FunctionDef {
    FunctionDef::new(name, move |_p: Arc<ProbePlugin>, _call: Call| async move {
        Ok(json!(body))
    })
    .js_export(JsExportSpec::new())
}

/// 모든 표현식을 기록하고 함수 존재 확인에는 true를 돌려준다
#[derive(Default)]
pub struct FakeInjector {
    expressions: Mutex<Vec<String>>,
}

impl FakeInjector {
    pub fn expressions(&self) -> Vec<String> {
        self.expressions.lock().clone()
    }
}

#[async_trait]
impl Injector for FakeInjector {
    async fn evaluate(&self, expression: &str, _await_promise: bool) -> Result<EvaluateResponse> {
        self.expressions.lock().push(expression.to_string());
        let value = if expression.starts_with("typeof window.") {
            Value::Bool(true)
        } else {
            Value::Null
        };
        Ok(EvaluateResponse::from_value(value))
    }
}
