//! 데몬 로깅 초기화
//!
//! `[general]` 섹션의 `log_level`은 ufwguard 크레이트에만 적용되고,
//! bollard/hyper 같은 의존 크레이트는 `warn` 으로 고정됩니다.
//! `RUST_LOG`가 설정되어 있으면 그 값을 그대로 사용합니다.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ufwguard_core::config::GeneralConfig;

/// 로그 레벨을 적용할 ufwguard 크레이트 타겟
const OWN_TARGETS: &[&str] = &["ufwguard_core", "ufwguard_reconciler", "ufwguard_daemon"];

/// `RUST_LOG`가 없을 때 사용할 필터 지시문을 만듭니다.
///
/// `default_directives("debug")` ->
/// `warn,ufwguard_core=debug,ufwguard_reconciler=debug,ufwguard_daemon=debug`
pub fn default_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for target in OWN_TARGETS {
        directives.push(',');
        directives.push_str(target);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directives(level))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", level, e))
}

/// 전역 tracing subscriber를 설치합니다.
///
/// 프로세스당 한 번, 첫 로그 이전에 호출해야 합니다.
///
/// * `"json"` - Cleanup/Sync 이벤트 필드를 그대로 담은 JSON 줄
/// * `"pretty"` - 사람이 읽기 위한 출력 (개발용)
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let fmt_layer = match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "pretty" => tracing_subscriber::fmt::layer().pretty().boxed(),
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.log_level)?)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}
