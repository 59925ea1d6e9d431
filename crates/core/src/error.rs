//! 에러 타입 -- 도메인별 에러 정의

/// ufwguard 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum UfwGuardError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 방화벽 명령 실행 에러
    #[error("firewall error: {0}")]
    Firewall(#[from] FirewallError),

    /// 컨테이너 런타임 에러
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 방화벽 명령 에러
#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    /// 명령 실행 실패 (spawn 실패, 비정상 종료, stderr 출력)
    #[error("command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// 명령 타임아웃
    #[error("command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
}

/// 컨테이너 런타임 에러
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    NotFound(String),

    /// 출력 채널이 닫힘
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}
