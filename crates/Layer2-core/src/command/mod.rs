//! # Commands
//!
//! 명령어 테이블(`plugins.<plugin>.<function>`)의 인자 파싱과 실행.

mod args;
mod facade;

pub use args::{coerce, parse_args};
pub use facade::{
    command_id, invoke_command, invoke_command_blocking, split_command_id, CommandEntry,
    COMMAND_PREFIX, MUTATION_KEYWORDS,
};
