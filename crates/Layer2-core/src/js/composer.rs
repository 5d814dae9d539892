//! JS Payload Composer
//!
//! 플러그인 순서(로드 순서)대로 export 본문을 만들고 감싸서 이어 붙인다.
//! export 하나라도 실패한 플러그인은 블록 전체를 빼고 실패 목록에 남긴다.

use super::checker::JsSyntaxChecker;
use super::shim::{namespace_block, COMPAT_SHIM, GAME_READY_FN};
use crate::meta::{Call, FunctionDef};
use crate::plugin::PluginHandle;
use cheatdeck_foundation::{ConsoleSink, Error};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 디버그 덤프 파일 접미사 (`<plugin>_js_dump.js`)
pub const DUMP_SUFFIX: &str = "_js_dump.js";

/// export 하나의 실패
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub plugin: String,
    pub export: String,
    pub message: String,
}

/// 합쳐진 payload
#[derive(Debug, Clone, Default)]
pub struct ComposedPayload {
    pub script: String,

    /// (플러그인, 블록 바이트 수) 로드 순서
    pub sizes: Vec<(String, usize)>,

    pub failures: Vec<ExportFailure>,
}

impl ComposedPayload {
    /// 실패한 플러그인과 첫 번째 실패 사유
    pub fn failed_plugins(&self) -> Vec<(String, String)> {
        let mut plugins: Vec<(String, String)> = Vec::new();
        for failure in &self.failures {
            if plugins.iter().any(|(name, _)| name == &failure.plugin) {
                continue;
            }
            let error = Error::JsSyntax {
                plugin: failure.plugin.clone(),
                export: failure.export.clone(),
                message: failure.message.clone(),
            };
            plugins.push((failure.plugin.clone(), error.to_string()));
        }
        plugins
    }

    pub fn size_of(&self, plugin: &str) -> Option<usize> {
        self.sizes
            .iter()
            .find(|(name, _)| name == plugin)
            .map(|(_, size)| *size)
    }
}

pub struct JsComposer {
    checker: Arc<dyn JsSyntaxChecker>,
    console: Arc<dyn ConsoleSink>,
    dump_dir: Option<PathBuf>,
}

impl JsComposer {
    pub fn new(checker: Arc<dyn JsSyntaxChecker>, console: Arc<dyn ConsoleSink>) -> Self {
        Self {
            checker,
            console,
            dump_dir: None,
        }
    }

    /// 플러그인별 스크립트 덤프 위치 (None이면 덤프 안 함)
    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    pub fn checker_name(&self) -> &str {
        self.checker.name()
    }

    /// payload 생성
    pub async fn compose(&self, handles: &[PluginHandle]) -> ComposedPayload {
        let mut payload = ComposedPayload {
            script: String::from(COMPAT_SHIM),
            ..Default::default()
        };

        for handle in handles {
            let mut block = namespace_block(&handle.name);
            let mut failed = false;

            for def in handle.ctx.metadata().js_exports(handle.class()) {
                match self.render_export(handle, &def).await {
                    Ok(code) => block.push_str(&code),
                    Err(failure) => {
                        failed = true;
                        payload.failures.push(failure);
                    }
                }
            }

            if failed {
                continue;
            }

            if let Some(dir) = &self.dump_dir {
                dump_block(dir, &handle.name, &block).await;
            }
            payload.sizes.push((handle.name.clone(), block.len()));
            payload.script.push_str(&block);
        }

        self.report(&payload);
        payload
    }

    /// export 본문 생성 -> 검사 -> 감싸기
    async fn render_export(
        &self,
        handle: &PluginHandle,
        def: &FunctionDef,
    ) -> Result<String, ExportFailure> {
        let js_name = def.js_name().to_string();
        let failure = |message: String| ExportFailure {
            plugin: handle.name.clone(),
            export: js_name.clone(),
            message,
        };

        if !super::is_js_identifier(&js_name) {
            return Err(failure(format!("'{}' is not a valid JS identifier", js_name)));
        }

        let call = Call::new(Arc::clone(&handle.ctx))
            .with_args(def.js_default_args())
            .with_injector(handle.ctx.injector());
        let body = match def.invoke(Arc::clone(&handle.plugin), call).await {
            Ok(Value::String(body)) => body,
            Ok(other) => {
                return Err(failure(format!(
                    "export returned {} instead of a JS string",
                    kind_of(&other)
                )))
            }
            Err(e) => return Err(failure(e.to_string())),
        };

        let label = format!("{}.{}", handle.name, js_name);
        let check = self.checker.check(&label, &body).await;
        if !check.ok {
            return Err(failure(check.message));
        }

        debug!("Composed {} ({} bytes)", label, body.len());
        Ok(wrap_export(&handle.name, &js_name, &def.js_params(), &body))
    }

    fn report(&self, payload: &ComposedPayload) {
        for failure in &payload.failures {
            self.console.print(&format!(
                "JS syntax error in {}.{}: {}",
                failure.plugin, failure.export, failure.message
            ));
        }
        for (plugin, size) in &payload.sizes {
            self.console.print(&format!("  {}: {} bytes", plugin, size));
        }
        self.console.print(&format!(
            "JS payload: {} plugins, {} bytes, {} failed exports",
            payload.sizes.len(),
            payload.script.len(),
            payload.failures.len()
        ));
        info!(
            "Composed JS payload: {} plugins, {} bytes",
            payload.sizes.len(),
            payload.script.len()
        );
    }
}

/// 표준 래퍼: game ready 대기 + 에러를 문자열로 반환
pub(crate) fn wrap_export(plugin: &str, name: &str, params: &[String], body: &str) -> String {
    format!(
        "window.{p}.{n} = async function({params}) {{\n\
         \x20 try {{\n\
         \x20   await window.{ready}();\n\
         {body}\n\
         \x20 }} catch (e) {{\n\
         \x20   console.error('[{p}.{n}] Error:', e);\n\
         \x20   return 'Error: ' + e.message;\n\
         \x20 }}\n\
         }};\n",
        p = plugin,
        n = name,
        params = params.join(", "),
        ready = GAME_READY_FN,
        body = body,
    )
}

async fn dump_block(dir: &Path, plugin: &str, block: &str) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("Failed to create JS dump dir {}: {}", dir.display(), e);
        return;
    }
    let path = dir.join(format!("{}{}", plugin, DUMP_SUFFIX));
    if let Err(e) = tokio::fs::write(&path, block).await {
        warn!("Failed to write JS dump {}: {}", path.display(), e);
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
