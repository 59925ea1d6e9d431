//! 설정 관리 -- ufwguard.toml 파싱 및 런타임 설정
//!
//! [`UfwGuardConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`UFWGUARD_DOCKER_MANAGED_LABEL=...` 형식)
//! 3. 설정 파일 (`ufwguard.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ufwguard_core::error::UfwGuardError> {
//! use ufwguard_core::config::UfwGuardConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = UfwGuardConfig::load("ufwguard.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = UfwGuardConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, UfwGuardError};

/// 관리 대상 컨테이너를 식별하는 기본 라벨 필터
pub const DEFAULT_MANAGED_LABEL: &str = "UFW_MANAGED=TRUE";

/// 설정 상한값 상수
const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_CLEANUP_INTERVAL_SECS: u64 = 86_400;
const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// ufwguard 통합 설정
///
/// `ufwguard.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 구성 요소는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UfwGuardConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 런타임 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// ufw 명령 설정
    #[serde(default)]
    pub firewall: FirewallConfig,
    /// Sync/Cleanup 스케줄 설정
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl UfwGuardConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, UfwGuardError> {
        Self::load_with(path, |_| {}).await
    }

    /// 파일 -> 환경변수 -> `overrides` 순으로 적용한 뒤 한 번만 검증합니다.
    ///
    /// 상위 계층(CLI 등)이 파일의 잘못된 값을 덮어쓸 수 있습니다.
    pub async fn load_with(
        path: impl AsRef<Path>,
        overrides: impl FnOnce(&mut Self),
    ) -> Result<Self, UfwGuardError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, UfwGuardError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UfwGuardError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                UfwGuardError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, UfwGuardError> {
        toml::from_str(toml_str).map_err(|e| {
            UfwGuardError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `UFWGUARD_{SECTION}_{FIELD}`
    /// 예: `UFWGUARD_FIREWALL_ELEVATION=doas`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "UFWGUARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "UFWGUARD_GENERAL_LOG_FORMAT");

        // Docker
        override_string(
            &mut self.docker.docker_socket,
            "UFWGUARD_DOCKER_DOCKER_SOCKET",
        );
        override_string(
            &mut self.docker.managed_label,
            "UFWGUARD_DOCKER_MANAGED_LABEL",
        );
        override_u64(&mut self.docker.timeout_secs, "UFWGUARD_DOCKER_TIMEOUT_SECS");

        // Firewall
        override_string(&mut self.firewall.ufw_path, "UFWGUARD_FIREWALL_UFW_PATH");
        override_string(&mut self.firewall.elevation, "UFWGUARD_FIREWALL_ELEVATION");
        override_u64(
            &mut self.firewall.command_timeout_secs,
            "UFWGUARD_FIREWALL_COMMAND_TIMEOUT_SECS",
        );

        // Schedule
        override_bool(
            &mut self.schedule.sync_on_start,
            "UFWGUARD_SCHEDULE_SYNC_ON_START",
        );
        override_u64(
            &mut self.schedule.cleanup_interval_secs,
            "UFWGUARD_SCHEDULE_CLEANUP_INTERVAL_SECS",
        );
        override_usize(
            &mut self.schedule.channel_capacity,
            "UFWGUARD_SCHEDULE_CHANNEL_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "UFWGUARD_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "UFWGUARD_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "UFWGUARD_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), UfwGuardError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 라벨 필터는 `KEY=VALUE` 또는 `KEY` 형식
        let label = self.docker.managed_label.trim();
        if label.is_empty() || label.starts_with('=') {
            return Err(invalid(
                "docker.managed_label",
                "must be of the form KEY or KEY=VALUE".to_owned(),
            ));
        }

        if self.docker.timeout_secs == 0 || self.docker.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                "docker.timeout_secs",
                format!("must be 1-{MAX_TIMEOUT_SECS}"),
            ));
        }

        if self.firewall.ufw_path.trim().is_empty() {
            return Err(invalid(
                "firewall.ufw_path",
                "must not be empty".to_owned(),
            ));
        }

        if self.firewall.elevation.chars().any(char::is_whitespace) {
            return Err(invalid(
                "firewall.elevation",
                "must be a single program name (or empty to disable)".to_owned(),
            ));
        }

        if self.firewall.command_timeout_secs == 0
            || self.firewall.command_timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(invalid(
                "firewall.command_timeout_secs",
                format!("must be 1-{MAX_TIMEOUT_SECS}"),
            ));
        }

        if self.schedule.cleanup_interval_secs == 0
            || self.schedule.cleanup_interval_secs > MAX_CLEANUP_INTERVAL_SECS
        {
            return Err(invalid(
                "schedule.cleanup_interval_secs",
                format!("must be 1-{MAX_CLEANUP_INTERVAL_SECS}"),
            ));
        }

        if self.schedule.channel_capacity == 0
            || self.schedule.channel_capacity > MAX_CHANNEL_CAPACITY
        {
            return Err(invalid(
                "schedule.channel_capacity",
                format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must not be 0 when metrics are enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> UfwGuardError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Docker 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (빈 문자열이면 플랫폼 기본값)
    pub docker_socket: String,
    /// 관리 대상 컨테이너 라벨 필터
    pub managed_label: String,
    /// Docker API 호출 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            managed_label: DEFAULT_MANAGED_LABEL.to_owned(),
            timeout_secs: 10,
        }
    }
}

/// ufw 명령 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// ufw 실행 파일 경로
    pub ufw_path: String,
    /// 권한 상승 프로그램 (빈 문자열이면 직접 실행)
    pub elevation: String,
    /// 명령 실행 타임아웃 (초)
    pub command_timeout_secs: u64,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            ufw_path: "ufw".to_owned(),
            elevation: "sudo".to_owned(),
            command_timeout_secs: 30,
        }
    }
}

/// Sync/Cleanup 스케줄 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// 시작 시 Sync 실행 여부
    pub sync_on_start: bool,
    /// Cleanup 주기 (초)
    pub cleanup_interval_secs: u64,
    /// Sync 출력 채널 용량
    pub channel_capacity: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sync_on_start: true,
            cleanup_interval_secs: 60,
            channel_capacity: 64,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9107,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
