//! ufwguard 공통 크레이트
//!
//! 방화벽 조정 엔진과 데몬이 함께 쓰는 에러, 설정, 도메인 타입, 메트릭 이름을 제공합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, FirewallError, RuntimeError, UfwGuardError};

// 설정
pub use config::UfwGuardConfig;

// 도메인 타입
pub use types::{ContainerDetail, ContainerSummary};
