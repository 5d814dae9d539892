//! Injector - 브라우저 디버깅 채널 계약
//!
//! 호스트는 브라우저에 JS 표현식을 평가하는 것 외에는 아무것도 요구하지 않는다.
//! 응답 모양은 DevTools `Runtime.evaluate`의 `{result: {value}}`를 따른다.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 평가 결과 원격 객체
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// 원격 타입 ("string", "object", "undefined" 등)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// 직렬화된 값 (undefined면 없음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// `evaluate` 응답
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluateResponse {
    #[serde(default)]
    pub result: RemoteObject,
}

impl EvaluateResponse {
    /// 값만 담은 응답
    pub fn from_value(value: Value) -> Self {
        Self {
            result: RemoteObject {
                kind: None,
                value: Some(value),
            },
        }
    }

    /// 평가 값 (undefined는 None)
    pub fn value(&self) -> Option<&Value> {
        self.result.value.as_ref()
    }

    /// 평가 값을 소유권째로 꺼낸다 (undefined는 Null)
    pub fn into_value(self) -> Value {
        self.result.value.unwrap_or(Value::Null)
    }

    /// 값이 `true`인지
    pub fn is_true(&self) -> bool {
        matches!(self.value(), Some(Value::Bool(true)))
    }
}

/// 브라우저 표현식 평가기
#[async_trait]
pub trait Injector: Send + Sync {
    /// 표현식 평가
    ///
    /// `await_promise`가 true면 Promise가 settle될 때까지 기다린 결과를 돌려준다.
    async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<EvaluateResponse>;
}
