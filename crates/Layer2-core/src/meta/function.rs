//! FunctionDef - 플러그인 함수 정의
//!
//! 핸들러(비동기 클로저) + 시그니처 + 마커(command / UI / JS export).
//! 플러그인 모듈이 로드될 때 레지스트리에 등록된다.

use super::descriptor::{CommandSpec, JsExportSpec, UiElementSpec};
use crate::plugin::{Plugin, PluginContext, PluginManager};
use cheatdeck_foundation::{ArgumentError, ConfigMap, Error, Injector, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// 브라우저 export 함수 이름 접미사
pub const JS_SUFFIX: &str = "_js";

/// 타입 소거된 핸들러
pub type Handler = Arc<dyn Fn(Arc<dyn Plugin>, Call) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

// ============================================================================
// Signature
// ============================================================================

/// 핸들러 파라미터
#[derive(Debug, Clone, PartialEq)]
pub struct SigParam {
    pub name: String,
    pub default: Option<Value>,
}

/// 핸들러 시그니처
///
/// `params`는 receiver 이후의 일반 파라미터만 담는다.
/// injector / plugin_manager 의존성은 플래그로 따로 선언한다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub params: Vec<SigParam>,
    pub wants_injector: bool,
    pub wants_plugin_manager: bool,
}

impl Signature {
    pub fn param(&self, name: &str) -> Option<&SigParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn first_param(&self) -> Option<&SigParam> {
        self.params.first()
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }
}

// ============================================================================
// Call - 한 번의 호출 정보
// ============================================================================

/// 핸들러 호출 컨텍스트
#[derive(Clone)]
pub struct Call {
    /// 키워드 인자
    pub args: ConfigMap,

    /// 플러그인 컨텍스트 (설정 브리지)
    pub ctx: Arc<PluginContext>,

    /// 연결된 injector (시그니처가 요구할 때만)
    pub injector: Option<Arc<dyn Injector>>,

    /// 플러그인 매니저 (시그니처가 요구할 때만)
    pub plugin_manager: Option<PluginManager>,
}

impl Call {
    pub fn new(ctx: Arc<PluginContext>) -> Self {
        Self {
            args: ConfigMap::new(),
            ctx,
            injector: None,
            plugin_manager: None,
        }
    }

    pub fn with_args(mut self, args: ConfigMap) -> Self {
        self.args = args;
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    pub fn with_injector(mut self, injector: Option<Arc<dyn Injector>>) -> Self {
        self.injector = injector;
        self
    }

    pub fn with_plugin_manager(mut self, manager: Option<PluginManager>) -> Self {
        self.plugin_manager = manager;
        self
    }

    /// 인자 조회 (`null`은 없는 것으로 본다)
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }

    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        self.arg(name).and_then(Value::as_bool)
    }

    pub fn i64_arg(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(Value::as_i64)
    }

    pub fn f64_arg(&self, name: &str) -> Option<f64> {
        self.arg(name).and_then(Value::as_f64)
    }

    /// 연결된 injector (없으면 NoInjector)
    pub fn injector(&self) -> Result<&Arc<dyn Injector>> {
        self.injector.as_ref().ok_or(Error::NoInjector)
    }

    pub fn plugin_manager(&self) -> Result<&PluginManager> {
        self.plugin_manager
            .as_ref()
            .ok_or_else(|| Error::Internal("plugin manager not bound to this call".to_string()))
    }
}

// ============================================================================
// FunctionDef
// ============================================================================

/// 플러그인 함수 정의
#[derive(Clone)]
pub struct FunctionDef {
    pub name: String,
    pub signature: Signature,
    pub command: Option<CommandSpec>,
    pub ui: Option<UiElementSpec>,
    pub js_export: Option<JsExportSpec>,
    handler: Handler,
}

impl FunctionDef {
    /// 타입이 정해진 플러그인용 함수 정의
    ///
    /// 호출 시 `Arc<dyn Plugin>`을 `Arc<P>`로 다운캐스트한다.
    pub fn new<P, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        P: Plugin,
        F: Fn(Arc<P>, Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let name = name.into();
        let fn_name = name.clone();
        let handler: Handler = Arc::new(move |plugin: Arc<dyn Plugin>, call: Call| {
            match plugin.into_any().downcast::<P>() {
                Ok(typed) => handler(typed, call).boxed(),
                Err(_) => {
                    let fn_name = fn_name.clone();
                    async move {
                        Err(Error::handler(
                            fn_name,
                            format!("plugin is not a {}", std::any::type_name::<P>()),
                        ))
                    }
                    .boxed()
                }
            }
        });
        Self::from_handler(name, handler)
    }

    /// 타입 소거된 핸들러로 생성
    pub fn from_handler(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            signature: Signature::default(),
            command: None,
            ui: None,
            js_export: None,
            handler,
        }
    }

    // ========================================================================
    // 시그니처 빌더
    // ========================================================================

    /// 필수 파라미터
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.signature.params.push(SigParam {
            name: name.into(),
            default: None,
        });
        self
    }

    /// 기본값 있는 파라미터
    pub fn param_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.signature.params.push(SigParam {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn needs_injector(mut self) -> Self {
        self.signature.wants_injector = true;
        self
    }

    pub fn needs_plugin_manager(mut self) -> Self {
        self.signature.wants_plugin_manager = true;
        self
    }

    // ========================================================================
    // 마커
    // ========================================================================

    /// 명령어 마커
    ///
    /// 시그니처 파라미터가 비어 있으면 명령어 파라미터에서 가져온다.
    pub fn command(mut self, spec: CommandSpec) -> Self {
        if self.signature.params.is_empty() {
            self.signature.params = spec
                .params
                .iter()
                .map(|p| SigParam {
                    name: p.name.clone(),
                    default: p.default.clone(),
                })
                .collect();
        }
        self.command = Some(spec);
        self
    }

    pub fn ui(mut self, spec: UiElementSpec) -> Self {
        self.ui = Some(spec);
        self
    }

    pub fn js_export(mut self, spec: JsExportSpec) -> Self {
        self.js_export = Some(spec);
        self
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 브라우저 export 대상인지 (`_js` 접미사 + export 마커)
    pub fn is_js_export(&self) -> bool {
        self.name.ends_with(JS_SUFFIX)
            && (self.js_export.is_some()
                || self.command.as_ref().map_or(false, |c| c.js_export))
    }

    /// 브라우저 쪽 함수 이름 (`_js` 제거)
    pub fn js_name(&self) -> &str {
        self.name.strip_suffix(JS_SUFFIX).unwrap_or(&self.name)
    }

    /// 브라우저 함수 파라미터 이름
    ///
    /// 마커에 선언된 목록이 있으면 그것, 없으면 시그니처 파라미터.
    pub fn js_params(&self) -> Vec<String> {
        let declared = match (&self.js_export, &self.command) {
            (Some(spec), _) if !spec.params.is_empty() => spec.params.clone(),
            (_, Some(cmd)) if cmd.js_export && !cmd.params.is_empty() => cmd.js_params(),
            _ => Vec::new(),
        };
        if declared.is_empty() {
            self.signature.param_names()
        } else {
            declared
        }
    }

    /// JS 본문 생성용 인자: 시그니처 기본값, 없으면 빈 문자열
    pub fn js_default_args(&self) -> ConfigMap {
        self.js_params()
            .into_iter()
            .map(|name| {
                let value = self
                    .signature
                    .param(&name)
                    .and_then(|p| p.default.clone())
                    .unwrap_or_else(|| Value::String(String::new()));
                (name, value)
            })
            .collect()
    }

    /// 명령어 도움말
    pub fn help(&self) -> &str {
        self.command.as_ref().map_or("", |c| c.help.as_str())
    }

    // ========================================================================
    // 호출
    // ========================================================================

    /// 핸들러 호출
    ///
    /// 빠진 인자는 시그니처 기본값으로 채우고, 기본값도 없으면 에러.
    pub async fn invoke(&self, plugin: Arc<dyn Plugin>, mut call: Call) -> Result<Value> {
        for param in &self.signature.params {
            if call.args.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    call.args.insert(param.name.clone(), default.clone());
                }
                None => return Err(ArgumentError::missing(param.name.clone()).into()),
            }
        }
        if self.signature.wants_injector && call.injector.is_none() {
            return Err(Error::NoInjector);
        }
        (self.handler)(plugin, call).await
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("command", &self.command)
            .field("ui", &self.ui)
            .field("js_export", &self.js_export)
            .finish_non_exhaustive()
    }
}
