//! Descriptors - 함수에 붙는 선언형 메타데이터
//!
//! 하나의 함수가 command / UI element / JS export 마커를 동시에 가질 수 있다.

use cheatdeck_foundation::ConfigMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// UI element 기본 카테고리
pub const DEFAULT_CATEGORY: &str = "General";

// ============================================================================
// Command
// ============================================================================

/// 명령어 파라미터 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    #[serde(alias = "str")]
    String,
    Int,
    Float,
    Bool,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

/// 명령어 파라미터 선언
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    #[serde(rename = "type", default)]
    pub ty: ParamType,

    /// 기본값 (`null`도 유효한 기본값)
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            help: String::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Bool)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

/// 키가 있으면 `null`이어도 Some(Null)로 읽는다
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// 명령어 마커
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(default)]
    pub help: String,

    #[serde(default)]
    pub params: Vec<ParamSpec>,

    /// 브라우저 export 여부
    #[serde(default)]
    pub js_export: bool,
}

impl CommandSpec {
    pub fn new(help: impl Into<String>) -> Self {
        Self {
            help: help.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn exported(mut self) -> Self {
        self.js_export = true;
        self
    }

    /// JS 파라미터 이름 (params 순서)
    pub fn js_params(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }
}

/// 브라우저 export 마커
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsExportSpec {
    #[serde(default)]
    pub params: Vec<String>,
}

impl JsExportSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// UI Element
// ============================================================================

/// UI element 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiElementType {
    Toggle,
    Slider,
    Button,
    Select,
    TextInput,
    NumberInput,
    ColorPicker,
    FileUpload,
    InputWithButton,
    SearchWithResults,
    AutocompleteInput,
    Banner,
}

/// select 옵션
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// UI element 마커
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElementSpec {
    #[serde(rename = "type")]
    pub element_type: UiElementType,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,

    /// 설정 키 (없으면 함수 이름)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_key: Option<String>,

    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub order: i32,

    /// 자유 형식 추가 속성
    #[serde(default, flatten)]
    pub extra: ConfigMap,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl UiElementSpec {
    pub fn new(element_type: UiElementType, label: impl Into<String>) -> Self {
        Self {
            element_type,
            label: label.into(),
            description: String::new(),
            config_key: None,
            default_value: None,
            min_value: None,
            max_value: None,
            step: None,
            options: Vec::new(),
            placeholder: None,
            required: false,
            category: default_category(),
            order: 0,
            extra: ConfigMap::new(),
        }
    }

    // ========================================================================
    // 종류별 생성자
    // ========================================================================

    pub fn toggle(label: impl Into<String>) -> Self {
        Self::new(UiElementType::Toggle, label).with_default(false)
    }

    pub fn slider(label: impl Into<String>, min: f64, max: f64) -> Self {
        let mut spec = Self::new(UiElementType::Slider, label).with_default(min);
        spec.min_value = Some(min);
        spec.max_value = Some(max);
        spec.step = Some(1.0);
        spec
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(UiElementType::Button, label)
    }

    pub fn select(label: impl Into<String>, options: Vec<SelectOption>) -> Self {
        let mut spec = Self::new(UiElementType::Select, label);
        spec.options = options;
        spec
    }

    pub fn text_input(label: impl Into<String>) -> Self {
        Self::new(UiElementType::TextInput, label).with_default("")
    }

    pub fn number_input(label: impl Into<String>) -> Self {
        Self::new(UiElementType::NumberInput, label).with_default(0)
    }

    pub fn color_picker(label: impl Into<String>) -> Self {
        Self::new(UiElementType::ColorPicker, label).with_default("#000000")
    }

    pub fn file_upload(label: impl Into<String>) -> Self {
        Self::new(UiElementType::FileUpload, label)
    }

    pub fn input_with_button(label: impl Into<String>) -> Self {
        Self::new(UiElementType::InputWithButton, label)
    }

    pub fn search_with_results(label: impl Into<String>) -> Self {
        Self::new(UiElementType::SearchWithResults, label)
    }

    pub fn autocomplete_input(label: impl Into<String>) -> Self {
        Self::new(UiElementType::AutocompleteInput, label)
    }

    pub fn banner(label: impl Into<String>) -> Self {
        Self::new(UiElementType::Banner, label)
    }

    // ========================================================================
    // 빌더
    // ========================================================================

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self.step = Some(step);
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// 실제 설정 키 (config_key 또는 함수 이름)
    pub fn effective_config_key<'a>(&'a self, function_name: &'a str) -> &'a str {
        self.config_key.as_deref().unwrap_or(function_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_spec_null_default_is_present() {
        let spec: ParamSpec =
            serde_json::from_value(json!({ "name": "value", "default": null })).unwrap();
        assert_eq!(spec.default, Some(Value::Null));
        assert_eq!(spec.ty, ParamType::String);

        let spec: ParamSpec = serde_json::from_value(json!({ "name": "value" })).unwrap();
        assert_eq!(spec.default, None);
    }

    #[test]
    fn test_param_type_aliases() {
        let spec: ParamSpec =
            serde_json::from_value(json!({ "name": "n", "type": "str" })).unwrap();
        assert_eq!(spec.ty, ParamType::String);
        let spec: ParamSpec =
            serde_json::from_value(json!({ "name": "n", "type": "bool" })).unwrap();
        assert_eq!(spec.ty, ParamType::Bool);
    }

    #[test]
    fn test_ui_element_defaults() {
        let spec: UiElementSpec =
            serde_json::from_value(json!({ "type": "toggle", "label": "God mode" })).unwrap();
        assert_eq!(spec.category, DEFAULT_CATEGORY);
        assert_eq!(spec.order, 0);
        assert_eq!(spec.effective_config_key("godmode_ui"), "godmode_ui");
    }

    #[test]
    fn test_ui_element_extra_roundtrips_unknown_keys() {
        let spec: UiElementSpec = serde_json::from_value(json!({
            "type": "button",
            "label": "Run",
            "button_text": "Go"
        }))
        .unwrap();
        assert_eq!(spec.extra.get("button_text"), Some(&json!("Go")));

        let out = serde_json::to_value(&spec).unwrap();
        assert_eq!(out["type"], "button");
        assert_eq!(out["button_text"], "Go");
    }

    #[test]
    fn test_slider_constructor() {
        let spec = UiElementSpec::slider("Speed", 1.0, 10.0).with_config_key("speed");
        assert_eq!(spec.min_value, Some(1.0));
        assert_eq!(spec.max_value, Some(10.0));
        assert_eq!(spec.effective_config_key("speed_ui"), "speed");
    }

    #[test]
    fn test_command_js_params() {
        let spec = CommandSpec::new("Spawn an item")
            .param(ParamSpec::string("item"))
            .param(ParamSpec::int("amount").with_default(1))
            .exported();
        assert_eq!(spec.js_params(), vec!["item", "amount"]);
        assert!(spec.js_export);
    }
}
