//! Host Events - 라이프사이클 이벤트 버스
//!
//! 로드/실패/설정 변경 같은 호스트 이벤트를 발행한다.
//! 웹 UI나 로그 수집기가 구독해서 쓴다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

// ============================================================================
// HostEvent
// ============================================================================

/// 호스트 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEvent {
    pub event_type: EventType,
    pub data: Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// 관련 플러그인 (없으면 "host")
    pub source: String,
}

impl HostEvent {
    pub fn new(event_type: EventType, data: Value, source: impl Into<String>) -> Self {
        Self {
            event_type,
            data,
            timestamp: chrono::Utc::now(),
            source: source.into(),
        }
    }
}

/// 이벤트 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PluginLoaded,
    PluginFailed,
    PluginUnloaded,
    PluginsReloaded,
    ConfigChanged,
    UiAction,
    CommandExecuted,
    PayloadComposed,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PluginLoaded => write!(f, "plugin_loaded"),
            Self::PluginFailed => write!(f, "plugin_failed"),
            Self::PluginUnloaded => write!(f, "plugin_unloaded"),
            Self::PluginsReloaded => write!(f, "plugins_reloaded"),
            Self::ConfigChanged => write!(f, "config_changed"),
            Self::UiAction => write!(f, "ui_action"),
            Self::CommandExecuted => write!(f, "command_executed"),
            Self::PayloadComposed => write!(f, "payload_composed"),
        }
    }
}

// ============================================================================
// HostEventHandler
// ============================================================================

#[async_trait]
pub trait HostEventHandler: Send + Sync {
    fn name(&self) -> &str;

    fn interested_events(&self) -> Vec<EventType>;

    async fn handle(&self, event: &HostEvent);
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스 - 발행 및 구독
pub struct EventBus {
    sender: broadcast::Sender<HostEvent>,
    handlers: RwLock<HashMap<String, Arc<dyn HostEventHandler>>>,

    /// 최근 N개
    history: RwLock<Vec<HostEvent>>,
    history_size: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256, 100)
    }

    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::with_capacity(history_size)),
            history_size,
        }
    }

    pub async fn register_handler(&self, handler: Arc<dyn HostEventHandler>) {
        let name = handler.name().to_string();
        self.handlers.write().await.insert(name, handler);
    }

    pub async fn unregister_handler(&self, name: &str) {
        self.handlers.write().await.remove(name);
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: HostEvent) {
        debug!("Publishing event: {} ({})", event.event_type, event.source);

        {
            let mut history = self.history.write().await;
            if history.len() >= self.history_size {
                history.remove(0);
            }
            history.push(event.clone());
        }

        // 구독자가 없어도 OK
        let _ = self.sender.send(event.clone());

        // 핸들러 안에서 버스를 다시 만질 수 있으므로 가드를 놓고 호출한다
        let interested: Vec<Arc<dyn HostEventHandler>> = self
            .handlers
            .read()
            .await
            .values()
            .filter(|handler| handler.interested_events().contains(&event.event_type))
            .cloned()
            .collect();

        for handler in interested {
            handler.handle(&event).await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }

    pub async fn history(&self) -> Vec<HostEvent> {
        self.history.read().await.clone()
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 헬퍼 함수
// ============================================================================

pub fn plugin_loaded_event(name: &str, version: &str) -> HostEvent {
    HostEvent::new(
        EventType::PluginLoaded,
        json!({ "name": name, "version": version }),
        name,
    )
}

pub fn plugin_failed_event(name: &str, error: &str) -> HostEvent {
    HostEvent::new(EventType::PluginFailed, json!({ "error": error }), name)
}

pub fn config_changed_event(name: &str, config: &Value) -> HostEvent {
    HostEvent::new(EventType::ConfigChanged, json!({ "config": config }), name)
}

pub fn ui_action_event(plugin: &str, element: &str, success: bool) -> HostEvent {
    HostEvent::new(
        EventType::UiAction,
        json!({ "element": element, "success": success }),
        plugin,
    )
}

pub fn command_executed_event(command: &str, success: bool) -> HostEvent {
    HostEvent::new(
        EventType::CommandExecuted,
        json!({ "command": command, "success": success }),
        "host",
    )
}
