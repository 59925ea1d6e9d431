//! ufwguard 데몬 라이브러리
//!
//! 통합 테스트를 위해 내부 모듈을 노출합니다. 실제 실행은 바이너리(main.rs)로 합니다.

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod scheduler;
