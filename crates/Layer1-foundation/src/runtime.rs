//! Runtime bridge - 동기 호출자를 위한 one-shot 런타임
//!
//! 핸들러와 콜백은 모두 async로 정의된다. 실행 중인 런타임이 있으면 그 위에
//! 태스크로 올리고, 없으면 current-thread 런타임을 잠깐 만들어 완료까지 돌린다.

use crate::{Error, Result};
use std::future::Future;
use tokio::runtime::{Builder, Handle};
use tokio::task::JoinHandle;
use tracing::warn;

/// 예약 결과
#[derive(Debug)]
pub enum Scheduled {
    /// 실행 중인 런타임에 백그라운드 태스크로 올림
    Spawned(JoinHandle<()>),

    /// one-shot 런타임에서 완료까지 실행
    Completed,

    /// one-shot 런타임 생성 실패
    Failed(String),
}

impl Scheduled {
    pub fn is_spawned(&self) -> bool {
        matches!(self, Scheduled::Spawned(_))
    }
}

/// 실행 중인 런타임이 있는지
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}

/// one-shot 런타임에서 future를 완료까지 실행
///
/// 이미 런타임 안이면 블로킹할 수 없으므로 에러를 돌려준다.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if in_runtime() {
        return Err(Error::Internal(
            "cannot block inside a running async runtime; await the call instead".to_string(),
        ));
    }

    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    Ok(rt.block_on(future))
}

/// 실행 중인 런타임이면 spawn, 아니면 one-shot 런타임에서 실행
pub fn spawn_or_block<F>(future: F) -> Scheduled
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Scheduled::Spawned(handle.spawn(future)),
        Err(_) => match block_on(future) {
            Ok(()) => Scheduled::Completed,
            Err(e) => {
                warn!("Failed to run scheduled task: {}", e);
                Scheduled::Failed(e.to_string())
            }
        },
    }
}
