//! 데몬 CLI 인자 정의
//!
//! 필드 doc 주석은 `--help` 출력에 그대로 쓰이므로 영어로 유지합니다.

use std::path::PathBuf;

use clap::Parser;

use ufwguard_core::config::UfwGuardConfig;

/// ufwguard firewall reconciliation daemon.
///
/// Hands running managed containers to the rule installer and
/// periodically removes ufw rules left behind by stopped containers.
#[derive(Parser, Debug)]
#[command(name = "ufwguard-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to ufwguard.toml configuration file.
    #[arg(short, long, default_value = "/etc/ufwguard/ufwguard.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Run a single Sync and Cleanup pass, then exit.
    #[arg(long)]
    pub once: bool,
}

impl DaemonCli {
    /// 로드된 설정 위에 CLI 오버라이드를 적용합니다.
    ///
    /// 검증은 `UfwGuardConfig::load_with`가 모든 계층을 적용한 뒤 한 번 수행합니다.
    pub fn apply_overrides(&self, config: &mut UfwGuardConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}
