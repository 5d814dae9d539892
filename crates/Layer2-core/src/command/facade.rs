//! Command Facade - 명령어 호출 진입점
//!
//! 시그니처가 요구하는 의존성(injector, plugin_manager)을 묶어서 핸들러를 실행하고,
//! 결과와 에러를 콘솔로 보고한다.

use crate::meta::{Call, FunctionDef, ParamSpec};
use crate::plugin::PluginManager;
use cheatdeck_foundation::{runtime, ConfigMap, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// 명령어 id 접두사
pub const COMMAND_PREFIX: &str = "plugins";

/// 설정을 바꿀 것으로 보는 함수 이름 키워드
pub const MUTATION_KEYWORDS: [&str; 5] = ["toggle", "set", "config", "save", "update"];

/// 명령어 테이블 항목
#[derive(Debug, Clone, Serialize)]
pub struct CommandEntry {
    /// `plugins.<plugin>.<function>`
    pub id: String,
    pub plugin: String,
    pub help: String,
    pub params: Vec<ParamSpec>,

    #[serde(skip)]
    pub function: Arc<FunctionDef>,
}

impl CommandEntry {
    pub fn new(plugin: &str, function: Arc<FunctionDef>) -> Self {
        let (help, params) = function
            .command
            .as_ref()
            .map(|spec| (spec.help.clone(), spec.params.clone()))
            .unwrap_or_default();
        Self {
            id: command_id(plugin, &function.name),
            plugin: plugin.to_string(),
            help,
            params,
            function,
        }
    }

    /// 함수 이름이 설정 변경을 암시하는지
    pub fn implies_mutation(&self) -> bool {
        let name = self.function.name.to_lowercase();
        MUTATION_KEYWORDS.iter().any(|keyword| name.contains(keyword))
    }
}

pub fn command_id(plugin: &str, function: &str) -> String {
    format!("{}.{}.{}", COMMAND_PREFIX, plugin, function)
}

/// `plugins.<plugin>.<function>` -> (plugin, function)
pub fn split_command_id(id: &str) -> Option<(&str, &str)> {
    let rest = id.strip_prefix(COMMAND_PREFIX)?.strip_prefix('.')?;
    let (plugin, function) = rest.split_once('.')?;
    if plugin.is_empty() || function.is_empty() || function.contains('.') {
        return None;
    }
    Some((plugin, function))
}

/// 명령어 실행
///
/// injector를 요구하는데 연결된 게 없으면 핸들러를 부르지 않고 NoInjector.
/// 함수 이름이 변경 키워드를 포함하면 실행 후 해당 플러그인에 설정 변경을 알린다.
pub async fn invoke_command(
    manager: &PluginManager,
    entry: &CommandEntry,
    args: ConfigMap,
) -> Result<Value> {
    let console = manager.console();
    let signature = &entry.function.signature;

    let injector = manager.injector();
    if signature.wants_injector && injector.is_none() {
        console.print(&Error::NoInjector.to_string());
        return Err(Error::NoInjector);
    }

    let handle = manager
        .get_plugin(&entry.plugin)
        .await
        .ok_or_else(|| Error::PluginNotFound(entry.plugin.clone()))?;

    let mut call = Call::new(Arc::clone(&handle.ctx))
        .with_args(args)
        .with_injector(injector);
    if signature.wants_plugin_manager {
        call = call.with_plugin_manager(Some(manager.clone()));
    }

    debug!("Executing command {}", entry.id);
    match entry.function.invoke(Arc::clone(&handle.plugin), call).await {
        Ok(result) => {
            if !result.is_null() {
                console.print(&format!("[JS return] {}", render(&result)));
            }
            if entry.implies_mutation() {
                manager
                    .notify_config_changed(handle.ctx.config(), Some(&handle.name))
                    .await;
            }
            Ok(result)
        }
        Err(e) => {
            error!("Error executing command {}: {}", entry.id, e);
            console.print(&format!("Error executing command: {}", e));
            Err(e)
        }
    }
}

/// 동기 호출자를 위한 버전 (one-shot 런타임에서 실행)
pub fn invoke_command_blocking(
    manager: &PluginManager,
    entry: &CommandEntry,
    args: ConfigMap,
) -> Result<Value> {
    runtime::block_on(invoke_command(manager, entry, args))?
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
