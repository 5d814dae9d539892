//! Script Plugins - JSON으로 선언하는 플러그인
//!
//! 파일을 고치고 리로드하면 재시작 없이 동작이 바뀐다.
//!
//! ```json
//! {
//!   // 주석 허용
//!   "plugin": { "name": "anvil", "category": "World 1", "order": 1 },
//!   "functions": [
//!     {
//!       "name": "speed",
//!       "params": [{ "name": "value", "default": 1 }],
//!       "ui": { "type": "slider", "label": "Speed", "min_value": 1, "max_value": 10 },
//!       "action": { "kind": "reply", "text": "speed set to {value}" }
//!     },
//!     {
//!       "name": "boost_js",
//!       "js_export": { "params": ["amount"] },
//!       "action": { "kind": "js_body", "body": "return amount * 2;" }
//!     }
//!   ]
//! }
//! ```

use super::discovery::module_key;
use super::loader::{ModuleCache, ModuleLoader, PluginModule};
use super::manifest::PluginManifest;
use super::traits::Plugin;
use crate::meta::{Call, CommandSpec, FunctionDef, JsExportSpec, UiElementSpec};
use async_trait::async_trait;
use cheatdeck_foundation::{strip_json_comments, ConfigMap, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 스크립트 플러그인 파일 확장자
pub const SCRIPT_EXTENSION: &str = "json";

// ============================================================================
// 파일 스키마
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct ScriptFile {
    plugin: PluginManifest,

    #[serde(default)]
    functions: Vec<ScriptFunction>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptFunction {
    name: String,

    #[serde(default)]
    params: Vec<ScriptParam>,

    /// injector 필요 여부
    #[serde(default)]
    injector: bool,

    #[serde(default)]
    command: Option<CommandSpec>,

    #[serde(default)]
    ui: Option<UiElementSpec>,

    #[serde(default)]
    js_export: Option<JsExportSpec>,

    #[serde(default)]
    action: ScriptAction,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptParam {
    name: String,

    #[serde(default)]
    default: Option<Value>,
}

/// 함수 동작
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ScriptAction {
    #[default]
    Noop,

    /// 템플릿 문자열 반환 (`{param}` 치환)
    Reply { text: String },

    /// JS 본문 반환 (`_js` 함수용, `{param}` 치환)
    JsBody { body: String },

    /// 이 플러그인의 브라우저 export 호출
    RunJs { export: String },

    /// 인자 하나를 설정 키에 저장
    SetConfig {
        key: String,
        #[serde(default = "default_value_param")]
        param: String,
    },
}

fn default_value_param() -> String {
    "value".to_string()
}

impl ScriptAction {
    async fn run(&self, call: Call) -> Result<Value> {
        match self {
            Self::Noop => Ok(Value::Null),
            Self::Reply { text } => Ok(Value::String(render_template(text, &call.args))),
            Self::JsBody { body } => Ok(Value::String(render_template(body, &call.args))),
            Self::RunJs { export } => call.ctx.run_js_export(export, &call.args).await,
            Self::SetConfig { key, param } => {
                let value = call.arg(param).cloned().unwrap_or(Value::Null);
                call.ctx.set_config_value(key.clone(), value.clone());
                call.ctx.save_to_global_config(None).await?;
                Ok(json!(format!("{} set to {}", key, display_value(&value))))
            }
        }
    }
}

/// `{name}` 자리표시자를 인자 값으로 치환
fn render_template(template: &str, args: &ConfigMap) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), &display_value(value))
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// ScriptPlugin
// ============================================================================

/// JSON 파일에서 만든 플러그인 인스턴스
pub struct ScriptPlugin {
    manifest: PluginManifest,
}

impl ScriptPlugin {
    pub fn new(manifest: PluginManifest) -> Self {
        Self { manifest }
    }
}

#[async_trait]
impl Plugin for ScriptPlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }
}

impl ScriptFunction {
    fn into_def(self) -> FunctionDef {
        let action = Arc::new(self.action);
        let mut def = FunctionDef::new(self.name, move |_plugin: Arc<ScriptPlugin>, call: Call| {
            let action = Arc::clone(&action);
            async move { action.run(call).await }
        });

        for param in self.params {
            def = match param.default {
                Some(default) => def.param_default(param.name, default),
                None => def.param(param.name),
            };
        }
        if self.injector {
            def = def.needs_injector();
        }
        if let Some(command) = self.command {
            def = def.command(command);
        }
        if let Some(ui) = self.ui {
            def = def.ui(ui);
        }
        if let Some(js_export) = self.js_export {
            def = def.js_export(js_export);
        }
        def
    }
}

// ============================================================================
// ScriptLoader
// ============================================================================

/// `.json` 플러그인 로더
#[derive(Default)]
pub struct ScriptLoader {
    cache: ModuleCache,
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파일 내용으로 모듈 생성
    pub fn parse(load_key: &str, content: &str) -> Result<PluginModule> {
        let file: ScriptFile = serde_json::from_str(&strip_json_comments(content))
            .map_err(|e| Error::plugin_load(load_key, format!("invalid plugin file: {}", e)))?;

        let manifest = file.plugin;
        let key = module_key(load_key);
        let factory_manifest = manifest.clone();
        let mut module = PluginModule::new(
            format!("script:{}", key),
            move |_config: ConfigMap| -> Result<Arc<dyn Plugin>> {
                Ok(Arc::new(ScriptPlugin::new(factory_manifest.clone())))
            },
        )
        .with_key(key);

        for function in file.functions {
            module = module.function(function.into_def());
        }
        Ok(module)
    }
}

impl ModuleLoader for ScriptLoader {
    fn name(&self) -> &str {
        "script"
    }

    fn extension(&self) -> &str {
        SCRIPT_EXTENSION
    }

    fn load_fresh(&self, load_key: &str, path: &Path) -> Result<Arc<PluginModule>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::plugin_load(load_key, format!("{}: {}", path.display(), e)))?;
        let module = Arc::new(Self::parse(load_key, &content)?.with_source(path));
        self.cache.insert(Arc::clone(&module));
        debug!(
            "Loaded script module {} ({} functions)",
            module.key,
            module.functions().len()
        );
        Ok(module)
    }

    fn drop_cached(&self, prefix: &str) -> usize {
        self.cache.drop_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetadataRegistry;
    use crate::plugin::PluginContext;
    use cheatdeck_foundation::{ConfigStore, JsonConfigStore};
    use tempfile::TempDir;

    const ANVIL: &str = r#"{
        // speed plugin
        "plugin": { "name": "anvil", "category": "World 1", "plugin_order": 2 },
        "functions": [
            {
                "name": "greet",
                "params": [{ "name": "who", "default": "world" }],
                "command": { "help": "Say hello", "params": [{ "name": "who", "type": "str", "default": "world" }] },
                "action": { "kind": "reply", "text": "hello {who}" }
            },
            {
                "name": "speed",
                "ui": { "type": "slider", "label": "Speed", "min_value": 1, "max_value": 10 },
                "params": [{ "name": "value" }],
                "action": { "kind": "set_config", "key": "speed" }
            },
            {
                "name": "boost_js",
                "js_export": { "params": ["amount"] },
                "action": { "kind": "js_body", "body": "return amount * 2;" }
            }
        ]
    }"#;

    fn context(module: &PluginModule, store: Arc<dyn ConfigStore>) -> Arc<PluginContext> {
        let metadata = Arc::new(MetadataRegistry::new());
        metadata.register_class(&module.class, module.functions().iter().cloned());
        Arc::new(PluginContext::new(
            "anvil",
            module.class.clone(),
            ConfigMap::new(),
            store,
            metadata,
        ))
    }

    #[test]
    fn test_parse_markers() {
        let module = ScriptLoader::parse("world1.anvil", ANVIL).unwrap();
        assert_eq!(module.key, "plugins.world1.anvil");
        assert_eq!(module.class, "script:plugins.world1.anvil");

        let defs = module.functions();
        assert_eq!(defs.len(), 3);
        assert!(defs[0].command.is_some());
        assert!(defs[1].ui.is_some());
        assert!(defs[2].is_js_export());

        let plugin = module.instantiate(ConfigMap::new()).unwrap();
        let manifest = plugin.manifest();
        assert_eq!(manifest.order, 2);
        assert_eq!(manifest.category, "World 1");
    }

    #[test]
    fn test_parse_rejects_bad_file() {
        let err = ScriptLoader::parse("broken", "{ \"functions\": [] }").unwrap_err();
        assert!(matches!(err, Error::PluginLoad { .. }));
    }

    #[tokio::test]
    async fn test_reply_and_set_config_actions() {
        let module = ScriptLoader::parse("anvil", ANVIL).unwrap();
        let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::in_memory(json!({})));
        let ctx = context(&module, Arc::clone(&store));
        let plugin = module.instantiate(ConfigMap::new()).unwrap();
        let defs = module.functions();

        let reply = defs[0]
            .invoke(Arc::clone(&plugin), Call::new(Arc::clone(&ctx)))
            .await
            .unwrap();
        assert_eq!(reply, json!("hello world"));

        let set = defs[1]
            .invoke(plugin, Call::new(ctx).with_arg("value", json!(7)))
            .await
            .unwrap();
        assert_eq!(set, json!("speed set to 7"));
        assert_eq!(store.get_path("plugin_configs.anvil.speed"), Some(json!(7)));
    }

    #[test]
    fn test_loader_reads_fresh_copy() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("anvil.json");
        std::fs::write(&path, ANVIL).unwrap();

        let loader = ScriptLoader::new();
        assert_eq!(loader.locate(temp.path(), "anvil"), Some(path.clone()));
        let first = loader.load_fresh("anvil", &path).unwrap();
        assert_eq!(first.functions().len(), 3);

        std::fs::write(
            &path,
            r#"{ "plugin": { "name": "anvil" }, "functions": [] }"#,
        )
        .unwrap();
        let second = loader.load_fresh("anvil", &path).unwrap();
        assert!(second.functions().is_empty());
        assert_eq!(loader.drop_cached("plugins"), 1);
    }
}
