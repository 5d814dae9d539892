//! UI Schema - 플러그인 UI 메타데이터 집계
//!
//! 플러그인 -> 카테고리 -> element 목록(order 오름차순, 같으면 등록 순서).
//! `current_value`는 볼 때마다 `plugin_configs.<plugin>.<config_key>`에서 읽는다.

use crate::meta::{FunctionDef, UiElementSpec};
use crate::plugin::PluginHandle;
use cheatdeck_foundation::PLUGIN_CONFIGS_KEY;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// element 하나의 뷰
///
/// 핸들러 자체는 들고 있지 않는다. `name`이 핸들러를 가리키는 핸들이고,
/// `handler`와 `dispatch`가 메타데이터 레지스트리에서 같은 방식으로 찾는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElementView {
    /// 바인딩된 함수 이름 (액션 호출 시 element 이름)
    pub name: String,

    pub plugin: String,

    #[serde(flatten)]
    pub spec: UiElementSpec,

    pub current_value: Value,
}

impl UiElementView {
    pub fn config_key(&self) -> &str {
        self.spec.effective_config_key(&self.name)
    }

    /// 이 뷰에 바인딩된 핸들러
    pub fn handler(&self, handle: &PluginHandle) -> Option<Arc<FunctionDef>> {
        ui_handler(handle, &self.name)
    }
}

/// 플러그인의 UI element 이름으로 핸들러 조회
pub fn ui_handler(handle: &PluginHandle, element: &str) -> Option<Arc<FunctionDef>> {
    handle
        .ctx
        .metadata()
        .ui_elements(handle.class())
        .into_iter()
        .find(|def| def.name == element)
}

/// 스키마의 플러그인 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    pub category: String,
    pub order: i32,
}

/// 플러그인 UI 스키마
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSchema {
    pub plugin_info: PluginInfo,
    pub categories: BTreeMap<String, Vec<UiElementView>>,
}

/// 설정 저장소 경로
pub fn config_path(plugin: &str, config_key: &str) -> String {
    format!("{}.{}.{}", PLUGIN_CONFIGS_KEY, plugin, config_key)
}

/// 플러그인의 UI element (등록 순서, 현재 값 포함)
pub fn element_views(handle: &PluginHandle) -> Vec<UiElementView> {
    let store = handle.ctx.store();
    handle
        .ctx
        .metadata()
        .ui_elements(handle.class())
        .iter()
        .filter_map(|def| {
            let mut spec = def.ui.clone()?;
            let config_key = spec.effective_config_key(&def.name).to_string();
            let current_value = store
                .get_path(&config_path(&handle.name, &config_key))
                .or_else(|| spec.default_value.clone())
                .unwrap_or(Value::Null);
            spec.config_key = Some(config_key);
            Some(UiElementView {
                name: def.name.clone(),
                plugin: handle.name.clone(),
                spec,
                current_value,
            })
        })
        .collect()
}

/// 카테고리별로 묶고 order로 정렬 (안정 정렬)
pub fn categorize(views: Vec<UiElementView>) -> BTreeMap<String, Vec<UiElementView>> {
    let mut categories: BTreeMap<String, Vec<UiElementView>> = BTreeMap::new();
    for view in views {
        categories
            .entry(view.spec.category.clone())
            .or_default()
            .push(view);
    }
    for elements in categories.values_mut() {
        elements.sort_by_key(|view| view.spec.order);
    }
    categories
}

/// 플러그인 스키마
pub fn plugin_schema(handle: &PluginHandle) -> UiSchema {
    let manifest = handle.manifest();
    UiSchema {
        plugin_info: PluginInfo {
            name: handle.name.clone(),
            description: manifest.description,
            version: manifest.version,
            category: manifest.category,
            order: manifest.order,
        },
        categories: categorize(element_views(handle)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{Call, FunctionDef};
    use crate::test_support::{handle_with, EchoPlugin};
    use cheatdeck_foundation::{ConfigStore, JsonConfigStore};
    use serde_json::json;
    use std::sync::Arc;

    fn ui_def(name: &str, spec: UiElementSpec) -> FunctionDef {
        FunctionDef::new(name, |_p: Arc<EchoPlugin>, _c: Call| async move { Ok(json!(null)) })
            .ui(spec)
    }

    #[test]
    fn test_current_value_resolution() {
        let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::in_memory(json!({
            "plugin_configs": { "echo_plugin": { "debug": true } }
        })));
        let handle = handle_with(
            "echo_plugin",
            Arc::clone(&store),
            vec![
                ui_def("enable_debug", UiElementSpec::toggle("Debug").with_config_key("debug")),
                ui_def("speed", UiElementSpec::slider("Speed", 1.0, 10.0).with_default(4)),
                ui_def("run", UiElementSpec::button("Run")),
            ],
        );

        let views = element_views(&handle);
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].current_value, json!(true));
        assert_eq!(views[0].config_key(), "debug");
        assert_eq!(views[1].current_value, json!(4));
        assert_eq!(views[1].config_key(), "speed");
        assert_eq!(views[2].current_value, Value::Null);
    }

    #[test]
    fn test_categories_sorted_by_order_then_insertion() {
        let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::in_memory(json!({})));
        let handle = handle_with(
            "echo_plugin",
            store,
            vec![
                ui_def("c", UiElementSpec::button("C").with_order(2)),
                ui_def("a", UiElementSpec::button("A").with_order(1)),
                ui_def("b", UiElementSpec::button("B").with_order(1)),
                ui_def("x", UiElementSpec::button("X").with_category("Extra")),
            ],
        );

        let schema = plugin_schema(&handle);
        let general: Vec<_> = schema.categories["General"]
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(general, vec!["a", "b", "c"]);
        assert_eq!(schema.categories["Extra"].len(), 1);
        assert_eq!(schema.plugin_info.name, "echo_plugin");
    }

    #[test]
    fn test_view_name_resolves_to_bound_handler() {
        let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::in_memory(json!({})));
        let handle = handle_with(
            "echo_plugin",
            store,
            vec![
                ui_def("run", UiElementSpec::button("Run")),
                FunctionDef::new("hidden", |_p: Arc<EchoPlugin>, _c: Call| async move {
                    Ok(json!(null))
                }),
            ],
        );

        let views = element_views(&handle);
        assert_eq!(views.len(), 1);
        let def = views[0].handler(&handle).unwrap();
        assert_eq!(def.name, "run");
        assert!(def.ui.is_some());
        assert!(ui_handler(&handle, "hidden").is_none());
        assert!(ui_handler(&handle, "missing").is_none());
    }

    #[test]
    fn test_view_serializes_flat() {
        let store: Arc<dyn ConfigStore> = Arc::new(JsonConfigStore::in_memory(json!({})));
        let handle = handle_with(
            "echo_plugin",
            store,
            vec![ui_def("speed", UiElementSpec::slider("Speed", 1.0, 10.0))],
        );
        let value = serde_json::to_value(&element_views(&handle)[0]).unwrap();
        assert_eq!(value["type"], "slider");
        assert_eq!(value["config_key"], "speed");
        assert_eq!(value["current_value"], json!(1.0));
    }
}
