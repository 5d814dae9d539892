//! Console - 사용자 대상 출력 싱크
//!
//! 로그(`tracing`)와 별개로 사용자에게 보여줄 한 줄 메시지를 내보낸다.

use parking_lot::Mutex;
use tracing::info;

/// 사용자 대상 출력
pub trait ConsoleSink: Send + Sync {
    fn print(&self, line: &str);
}

/// `tracing`으로 전달하는 콘솔 (target = "console")
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn print(&self, line: &str) {
        info!(target: "console", "{}", line);
    }
}

/// 메모리에 쌓아두는 콘솔 (프런트엔드 폴링, 테스트)
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지의 출력
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// 출력 비우고 반환
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    /// 특정 문자열을 포함한 줄이 있는지
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

impl ConsoleSink for MemoryConsole {
    fn print(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
