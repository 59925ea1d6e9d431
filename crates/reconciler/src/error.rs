//! 조정 엔진 에러 타입
//!
//! [`ReconcilerError`]는 ufw 명령, Docker API, 출력 채널에서 발생하는 에러를 표현합니다.
//! `From<ReconcilerError> for UfwGuardError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! Cleanup과 Sync는 이 에러들을 대부분 로그로 흡수하고 작업량을 줄이는 방향으로 진행합니다.

use ufwguard_core::error::{FirewallError, RuntimeError, UfwGuardError};

/// 조정 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    /// ufw 명령 실행 실패 (spawn 실패, 비정상 종료, stderr 출력)
    #[error("command '{command}' failed: {reason}")]
    Command {
        /// 실행한 명령줄
        command: String,
        /// 실패 사유
        reason: String,
    },

    /// 외부 호출 타임아웃
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// 타임아웃된 작업
        operation: String,
        /// 적용된 타임아웃 (초)
        secs: u64,
    },

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 출력 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<ReconcilerError> for UfwGuardError {
    fn from(err: ReconcilerError) -> Self {
        match err {
            ReconcilerError::Command { command, reason } => {
                UfwGuardError::Firewall(FirewallError::CommandFailed { command, reason })
            }
            ReconcilerError::Timeout { operation, secs } => {
                UfwGuardError::Firewall(FirewallError::Timeout {
                    command: operation,
                    secs,
                })
            }
            ReconcilerError::DockerApi(msg) | ReconcilerError::DockerConnection(msg) => {
                UfwGuardError::Runtime(RuntimeError::DockerApi(msg))
            }
            ReconcilerError::ContainerNotFound(id) => {
                UfwGuardError::Runtime(RuntimeError::NotFound(id))
            }
            ReconcilerError::Channel(msg) => {
                UfwGuardError::Runtime(RuntimeError::ChannelClosed(msg))
            }
        }
    }
}
