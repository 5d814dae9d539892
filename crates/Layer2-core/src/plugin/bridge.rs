//! Browser bridge - `window.*` 표현식 생성과 평가
//!
//! 플러그인 설정 미러(`window.pluginConfigs`)와 export 함수 호출은 모두
//! 여기서 만든 표현식을 `Injector::evaluate`로 보낸다.

use cheatdeck_foundation::{ConfigMap, Error, Injector, Result};
use serde_json::Value;
use tracing::debug;

/// 게임 컨텍스트 헬퍼 (있으면 `this`로 바인딩)
pub const GAME_CONTEXT_FN: &str = "getIdleonContext";

fn quoted(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

/// `window.pluginConfigs[name] = <config>` 표현식
pub fn config_assignment(name: &str, config: &ConfigMap) -> Result<String> {
    Ok(format!(
        "window.pluginConfigs = window.pluginConfigs || {{}}; window.pluginConfigs[{}] = {};",
        quoted(name)?,
        serde_json::to_string(config)?
    ))
}

/// `window.<plugin>.<function>`이 함수로 존재하는지 검사하는 표현식
pub fn function_probe(plugin: &str, function: &str) -> String {
    format!(
        "typeof window.{p} !== 'undefined' && typeof window.{p}.{f} === 'function'",
        p = plugin,
        f = function
    )
}

/// export 함수 호출 표현식
///
/// 게임 컨텍스트 헬퍼가 있으면 그 결과를 `this`로 넘긴다.
pub fn function_call(plugin: &str, function: &str, args: &[Value]) -> Result<String> {
    let rendered = args
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?
        .join(", ");
    let call_args = if rendered.is_empty() {
        String::new()
    } else {
        format!(", {}", rendered)
    };

    Ok(format!(
        "(typeof {ctx} === \"function\" ? window.{p}.{f}.call({ctx}(){call_args}) : window.{p}.{f}({args}))",
        ctx = GAME_CONTEXT_FN,
        p = plugin,
        f = function,
        call_args = call_args,
        args = rendered
    ))
}

/// 설정을 브라우저 미러에 반영
pub async fn push_config(injector: &dyn Injector, name: &str, config: &ConfigMap) -> Result<()> {
    let expression = config_assignment(name, config)?;
    injector.evaluate(&expression, false).await?;
    debug!("Pushed config for {} to browser", name);
    Ok(())
}

/// export 함수 호출 (없으면 FunctionNotFound)
pub async fn call_function(
    injector: &dyn Injector,
    plugin: &str,
    function: &str,
    args: &[Value],
) -> Result<Value> {
    let probe = injector
        .evaluate(&function_probe(plugin, function), false)
        .await?;
    if !probe.is_true() {
        return Err(Error::function_not_found(plugin, function));
    }

    let response = injector
        .evaluate(&function_call(plugin, function, args)?, true)
        .await?;
    Ok(response.into_value())
}
