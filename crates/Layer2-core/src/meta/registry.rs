//! Metadata Registry - (플러그인 타입, 함수 이름) -> 함수 정의
//!
//! 모듈이 로드될 때만 기록된다. 같은 이름으로 다시 등록하면 기존 항목을 교체하므로
//! 모듈을 다시 읽어도 중복이 생기지 않는다.

use super::function::FunctionDef;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 함수 메타데이터 레지스트리
#[derive(Default)]
pub struct MetadataRegistry {
    /// 플러그인 타입 -> 함수 정의 (등록 순서 유지)
    classes: RwLock<HashMap<String, Vec<Arc<FunctionDef>>>>,

    /// 명령어 함수 이름 -> 플러그인 타입 (나중 등록이 우선)
    commands: RwLock<HashMap<String, String>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 함수 하나 등록 (같은 이름이면 제자리 교체)
    pub fn register(&self, class: &str, def: FunctionDef) {
        let def = Arc::new(def);
        let name = def.name.clone();
        let is_command = def.command.is_some();

        {
            let mut classes = self.classes.write();
            let entries = classes.entry(class.to_string()).or_default();
            match entries.iter_mut().find(|existing| existing.name == name) {
                Some(slot) => *slot = def,
                None => entries.push(def),
            }
        }

        let mut commands = self.commands.write();
        if is_command {
            commands.insert(name.clone(), class.to_string());
        } else if commands.get(&name).map_or(false, |owner| owner == class) {
            commands.remove(&name);
        }
        debug!("Registered function {}::{}", class, name);
    }

    /// 플러그인 타입의 함수 목록을 통째로 교체
    pub fn register_class<I>(&self, class: &str, defs: I)
    where
        I: IntoIterator<Item = FunctionDef>,
    {
        self.remove_class(class);
        for def in defs {
            self.register(class, def);
        }
    }

    /// 플러그인 타입의 모든 함수 제거
    pub fn remove_class(&self, class: &str) {
        self.classes.write().remove(class);
        self.commands.write().retain(|_, owner| owner != class);
    }

    /// 전부 제거
    pub fn clear(&self) {
        self.classes.write().clear();
        self.commands.write().clear();
    }

    /// 함수 정의 조회
    pub fn function(&self, class: &str, name: &str) -> Option<Arc<FunctionDef>> {
        self.classes
            .read()
            .get(class)
            .and_then(|defs| defs.iter().find(|d| d.name == name).cloned())
    }

    /// 플러그인 타입의 모든 함수 (등록 순서)
    pub fn functions(&self, class: &str) -> Vec<Arc<FunctionDef>> {
        self.classes.read().get(class).cloned().unwrap_or_default()
    }

    /// 명령어 마커가 있는 함수
    pub fn commands(&self, class: &str) -> Vec<Arc<FunctionDef>> {
        self.filtered(class, |d| d.command.is_some())
    }

    /// UI element 마커가 있는 함수
    pub fn ui_elements(&self, class: &str) -> Vec<Arc<FunctionDef>> {
        self.filtered(class, |d| d.ui.is_some())
    }

    /// 브라우저 export 함수
    pub fn js_exports(&self, class: &str) -> Vec<Arc<FunctionDef>> {
        self.filtered(class, FunctionDef::is_js_export)
    }

    /// 전역 명령어 이름으로 조회
    pub fn command_by_name(&self, name: &str) -> Option<(String, Arc<FunctionDef>)> {
        let class = self.commands.read().get(name).cloned()?;
        let def = self.function(&class, name)?;
        Some((class, def))
    }

    /// 등록된 플러그인 타입 수
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    fn filtered(&self, class: &str, keep: impl Fn(&FunctionDef) -> bool) -> Vec<Arc<FunctionDef>> {
        self.classes
            .read()
            .get(class)
            .map(|defs| defs.iter().filter(|d| keep(d)).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::descriptor::{CommandSpec, JsExportSpec, UiElementSpec};
    use crate::meta::function::Call;
    use crate::test_support::EchoPlugin;
    use serde_json::json;

    fn def(name: &str) -> FunctionDef {
        FunctionDef::new(name, |_p: Arc<EchoPlugin>, _c: Call| async move { Ok(json!(null)) })
    }

    #[test]
    fn test_reregistration_replaces_in_place() {
        let registry = MetadataRegistry::new();
        registry.register("Anvil", def("a").command(CommandSpec::new("first")));
        registry.register("Anvil", def("b"));
        registry.register("Anvil", def("a").command(CommandSpec::new("second")));

        let names: Vec<_> = registry.functions("Anvil").iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.function("Anvil", "a").unwrap().help(), "second");
    }

    #[test]
    fn test_markers_are_independent() {
        let registry = MetadataRegistry::new();
        registry.register(
            "Anvil",
            def("speed_js")
                .command(CommandSpec::new("speed"))
                .ui(UiElementSpec::toggle("Speed"))
                .js_export(JsExportSpec::new()),
        );
        registry.register("Anvil", def("plain"));

        assert_eq!(registry.commands("Anvil").len(), 1);
        assert_eq!(registry.ui_elements("Anvil").len(), 1);
        assert_eq!(registry.js_exports("Anvil").len(), 1);
        assert_eq!(registry.functions("Anvil").len(), 2);
    }

    #[test]
    fn test_command_by_name_later_wins() {
        let registry = MetadataRegistry::new();
        registry.register("Anvil", def("boost").command(CommandSpec::new("anvil")));
        registry.register("Forge", def("boost").command(CommandSpec::new("forge")));

        let (class, found) = registry.command_by_name("boost").unwrap();
        assert_eq!(class, "Forge");
        assert_eq!(found.help(), "forge");

        registry.remove_class("Forge");
        assert!(registry.command_by_name("boost").is_none());
        assert!(registry.function("Anvil", "boost").is_some());
    }

    #[test]
    fn test_register_class_drops_stale_functions() {
        let registry = MetadataRegistry::new();
        registry.register_class("Anvil", vec![def("old"), def("kept")]);
        registry.register_class("Anvil", vec![def("kept"), def("new")]);

        assert!(registry.function("Anvil", "old").is_none());
        assert_eq!(registry.functions("Anvil").len(), 2);
        assert_eq!(registry.class_count(), 1);

        registry.clear();
        assert_eq!(registry.class_count(), 0);
    }
}
