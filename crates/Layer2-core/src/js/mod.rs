//! # Browser JS
//!
//! 플러그인 `_js` export를 하나의 주입 스크립트로 합친다.
//!
//! ```text
//! [compat shim (한 번)]
//! window.<p> = window.<p> || {};          플러그인마다
//! window.<p>.<name> = async function(..)  export마다 (game ready 대기 + try/catch)
//! ```

mod checker;
mod composer;
mod shim;

pub use checker::{AcceptAll, JsSyntaxChecker, NodeSyntaxChecker, SyntaxCheck, CHECK_TIMEOUT};
pub use composer::{ComposedPayload, ExportFailure, JsComposer, DUMP_SUFFIX};
pub use shim::{namespace_block, COMPAT_SHIM, GAME_READY_FN, NAMESPACE_LIST, SHIM_FLAG};

use regex::Regex;

lazy_static::lazy_static! {
    static ref JS_IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid");
}

/// `window.<name>`으로 쓸 수 없는 예약어
const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "with", "yield", "let", "await", "null", "true", "false",
];

/// JS 식별자로 쓸 수 있는지 (플러그인 네임스페이스, export 이름)
pub fn is_js_identifier(name: &str) -> bool {
    JS_IDENTIFIER.is_match(name) && !RESERVED_WORDS.contains(&name)
}
