//! Argument Parser - 명령줄 인자 -> 키워드 인자
//!
//! 규칙:
//! 1. 문자열 파라미터 하나뿐이면 나머지 전부를 공백으로 이어 붙인다
//! 2. 아니면 위치 순서대로 선언된 타입으로 변환
//! 3. 빠진 뒤쪽 인자는 기본값, 기본값도 없으면 에러
//! 4. 남는 인자는 에러
//!
//! JSON 숫자로 표현할 수 없는 실수(`inf`, `nan`)는 `InvalidValue`로 거부한다.

use crate::meta::{ParamSpec, ParamType};
use cheatdeck_foundation::{ArgumentError, ConfigMap};
use serde_json::{Number, Value};

const QUOTES: [char; 2] = ['"', '\''];

/// 인자 파싱
pub fn parse_args(params: &[ParamSpec], args: &[String]) -> Result<ConfigMap, ArgumentError> {
    let mut result = ConfigMap::new();

    if let [only] = params {
        if only.ty == ParamType::String {
            let value = if args.is_empty() {
                only.default
                    .clone()
                    .ok_or_else(|| ArgumentError::missing(&only.name))?
            } else {
                Value::String(args.join(" ").trim_matches(QUOTES).to_string())
            };
            result.insert(only.name.clone(), value);
            return Ok(result);
        }
    }

    let mut rest = args.iter();
    for param in params {
        let value = match rest.next() {
            Some(raw) => coerce(param, raw)?,
            None => param
                .default
                .clone()
                .ok_or_else(|| ArgumentError::missing(&param.name))?,
        };
        result.insert(param.name.clone(), value);
    }

    let extra: Vec<String> = rest.cloned().collect();
    if !extra.is_empty() {
        return Err(ArgumentError::TooManyArguments { extra });
    }
    Ok(result)
}

/// 문자열 하나를 선언된 타입으로 변환
pub fn coerce(param: &ParamSpec, raw: &str) -> Result<Value, ArgumentError> {
    let invalid = || ArgumentError::invalid(&param.name, raw);
    match param.ty {
        ParamType::String => Ok(Value::String(raw.trim_matches(QUOTES).to_string())),
        ParamType::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        ParamType::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        ParamType::Bool => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
    }
}
