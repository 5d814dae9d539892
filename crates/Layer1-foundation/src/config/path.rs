//! Dotted path 접근 (`plugin_configs.<plugin>.<key>`)

use crate::{Error, Result};
use serde_json::{Map, Value};

/// 점으로 구분된 경로의 값 조회
///
/// 중간 노드가 객체가 아니거나 키가 없으면 `None`.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// 점으로 구분된 경로에 값 설정
///
/// 없거나 객체가 아닌 중간 노드는 빈 객체로 교체된다.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let keys: Vec<&str> = path.split('.').collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(Error::InvalidInput(format!("Invalid config path: '{}'", path)));
    }

    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        insert_at(map, &keys, value);
    }
    Ok(())
}

fn insert_at(node: &mut Map<String, Value>, keys: &[&str], value: Value) {
    match keys {
        [] => {}
        [last] => {
            node.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let child = node
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_at(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_path() {
        let root = json!({ "plugin_configs": { "anvil": { "speed": 3 } } });
        assert_eq!(get_path(&root, "plugin_configs.anvil.speed"), Some(&json!(3)));
        assert_eq!(get_path(&root, "plugin_configs.anvil.missing"), None);
        assert_eq!(get_path(&root, "plugin_configs.anvil.speed.deeper"), None);
    }

    #[test]
    fn test_set_path_creates_intermediate_objects() {
        let mut root = json!({});
        set_path(&mut root, "plugin_configs.anvil.speed", json!(5)).unwrap();
        assert_eq!(root, json!({ "plugin_configs": { "anvil": { "speed": 5 } } }));
    }

    #[test]
    fn test_set_path_replaces_non_object_parent() {
        let mut root = json!({ "plugin_configs": 7 });
        set_path(&mut root, "plugin_configs.anvil", json!({})).unwrap();
        assert_eq!(root, json!({ "plugin_configs": { "anvil": {} } }));
    }

    #[test]
    fn test_set_path_rejects_empty_segment() {
        let mut root = json!({});
        assert!(set_path(&mut root, "a..b", json!(1)).is_err());
        assert!(set_path(&mut root, "", json!(1)).is_err());
    }
}
