//! JS 문법 검사기
//!
//! export 본문은 `return`/`await`를 포함하므로 async 함수로 감싸서 검사한다.
//! node가 없으면 모든 본문을 통과시킨다.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// 외부 검사기 제한 시간
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// 검사 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxCheck {
    pub ok: bool,
    pub message: String,
}

impl SyntaxCheck {
    pub fn passed() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait JsSyntaxChecker: Send + Sync {
    fn name(&self) -> &str;

    /// `label`은 보고용 식별자 (`<plugin>.<export>`)
    async fn check(&self, label: &str, code: &str) -> SyntaxCheck;
}

/// 검사 없이 통과
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

#[async_trait]
impl JsSyntaxChecker for AcceptAll {
    fn name(&self) -> &str {
        "accept-all"
    }

    async fn check(&self, _label: &str, _code: &str) -> SyntaxCheck {
        SyntaxCheck::passed()
    }
}

/// `node --check` 기반 검사기
#[derive(Debug, Clone)]
pub struct NodeSyntaxChecker {
    node: PathBuf,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl NodeSyntaxChecker {
    pub fn new(node: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            timeout: CHECK_TIMEOUT,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// PATH에서 node를 찾고, 없으면 AcceptAll
    pub fn detect() -> Arc<dyn JsSyntaxChecker> {
        match which::which("node") {
            Ok(path) => {
                debug!("Using node for JS syntax checks: {}", path.display());
                Arc::new(Self::new(path))
            }
            Err(_) => {
                warn!("node not found in PATH, JS syntax checks disabled");
                Arc::new(AcceptAll)
            }
        }
    }

    fn wrap(code: &str) -> String {
        format!("async function __plugin_export__() {{\n{}\n}}\n", code)
    }

    async fn run(&self, path: &PathBuf) -> SyntaxCheck {
        let child = Command::new(&self.node)
            .arg("--check")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) if output.status.success() => SyntaxCheck::passed(),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                SyntaxCheck::failed(summarize_stderr(&stderr))
            }
            Ok(Err(e)) => SyntaxCheck::failed(format!("Failed to run node: {}", e)),
            Err(_) => SyntaxCheck::failed(format!(
                "Syntax check timed out after {}s",
                self.timeout.as_secs()
            )),
        }
    }
}

#[async_trait]
impl JsSyntaxChecker for NodeSyntaxChecker {
    fn name(&self) -> &str {
        "node"
    }

    async fn check(&self, label: &str, code: &str) -> SyntaxCheck {
        let path = self
            .scratch_dir
            .join(format!("cheatdeck-check-{}.js", uuid::Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&path, Self::wrap(code)).await {
            return SyntaxCheck::failed(format!("Failed to write scratch file: {}", e));
        }

        let result = self.run(&path).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!("Failed to remove {}: {}", path.display(), e);
        }

        if !result.ok {
            debug!("Syntax check failed for {}: {}", label, result.message);
        }
        result
    }
}

/// node 에러 출력에서 파일 경로 줄을 빼고 핵심만
fn summarize_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains("cheatdeck-check-"))
        .filter(|line| !line.trim_start().starts_with("at "))
        .filter(|line| !line.starts_with("Node.js "))
        .collect();

    lines
        .iter()
        .find(|line| line.contains("Error"))
        .map(|line| line.to_string())
        .unwrap_or_else(|| lines.join("\n"))
}
