//! 호환 shim과 네임스페이스 선언
//!
//! 예전 플러그인은 `window.<fn>`으로 서로를 불렀다. shim은 window 프로토타입 체인에
//! Proxy를 끼워 넣어, 직접 속성이 없을 때 등록된 플러그인 네임스페이스를 순서대로 찾는다.
//! `Window.prototype`과 그 위의 named-properties 객체는 프로토타입을 바꿀 수 없으므로
//! `window`부터 위로 올라가며 `Object.setPrototypeOf`가 성공하는 첫 링크
//! (브라우저에서는 `EventTarget.prototype`)에 붙인다. `in` 검사도 `has` 트랩으로 통과한다.
//! 읽기 전용이며 어떤 네임스페이스에도 쓰지 않는다.

/// 설치 여부 플래그
pub const SHIM_FLAG: &str = "__plugin_shim_installed";

/// 네임스페이스 등록 목록 (등록 순서 = 검색 순서)
pub const NAMESPACE_LIST: &str = "__plugin_namespaces";

/// 게임 준비 대기 헬퍼 (브라우저 쪽 core 스크립트가 제공)
pub const GAME_READY_FN: &str = "__idleon_wait_for_game_ready";

pub const COMPAT_SHIM: &str = r#"(function () {
  if (window.__plugin_shim_installed) return;
  window.__plugin_shim_installed = true;
  window.__plugin_namespaces = window.__plugin_namespaces || [];
  function lookup(prop) {
    var namespaces = window.__plugin_namespaces;
    for (var i = 0; i < namespaces.length; i++) {
      var bucket = window[namespaces[i]];
      if (bucket && typeof bucket[prop] === 'function') return bucket[prop];
    }
    return undefined;
  }
  var link = window;
  while (link) {
    var parent = Object.getPrototypeOf(link);
    if (!parent) break;
    var fallback = new Proxy(parent, {
      get: function (target, prop, receiver) {
        if (typeof prop === 'string' && !(prop in target)) {
          var found = lookup(prop);
          if (found !== undefined) return found;
        }
        return Reflect.get(target, prop, receiver);
      },
      has: function (target, prop) {
        if (prop in target) return true;
        return typeof prop === 'string' && lookup(prop) !== undefined;
      }
    });
    try {
      Object.setPrototypeOf(link, fallback);
      return;
    } catch (e) {
      link = parent;
    }
  }
  console.warn('[plugins] compatibility shim unavailable: no mutable prototype link');
})();
"#;

/// 플러그인 네임스페이스 선언 + shim 검색 목록 등록
pub fn namespace_block(plugin: &str) -> String {
    format!(
        "window.{p} = window.{p} || {{}};\n\
         window.{list} = window.{list} || [];\n\
         if (window.{list}.indexOf({q}) === -1) window.{list}.push({q});\n",
        p = plugin,
        list = NAMESPACE_LIST,
        q = serde_json::Value::String(plugin.to_string()),
    )
}
