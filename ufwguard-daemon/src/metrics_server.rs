//! Prometheus 메트릭 엔드포인트
//!
//! `[metrics]` 섹션의 주소로 HTTP 리스너를 열고, Cleanup/Sync counter를
//! 설명과 함께 0으로 미리 등록합니다. 첫 Cleanup 패스가 끝나기 전에
//! 스크레이프해도 `ufwguard_*` 시계열이 모두 보입니다.

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use ufwguard_core::config::MetricsConfig;
use ufwguard_core::metrics as names;

/// 설정의 `listen_addr`/`port`를 소켓 주소로 변환합니다.
///
/// IPv6 주소는 대괄호 없이 적어도 됩니다 (`"::1"`).
pub fn listen_socket(config: &MetricsConfig) -> Result<SocketAddr> {
    let ip: IpAddr = config
        .listen_addr
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|e| {
            anyhow::anyhow!(
                "invalid metrics listen address '{}': {}",
                config.listen_addr,
                e
            )
        })?;
    Ok(SocketAddr::new(ip, config.port))
}

/// 전역 recorder를 설치하고 HTTP 리스너를 시작합니다.
///
/// 프로세스당 한 번만 호출할 수 있습니다.
///
/// # Errors
///
/// - 잘못된 listen 주소
/// - 소켓 바인딩 실패
/// - recorder가 이미 설치된 경우
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_socket(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    names::describe_all();
    names::register_all();

    tracing::info!(
        listen_addr = %addr,
        counters = names::COUNTERS.len(),
        "Prometheus metrics endpoint active"
    );

    Ok(())
}
