//! ufw 명령 추상화 -- 규칙 목록 조회(RuleLister)와 규칙 삭제(RuleDeleter)
//!
//! [`Firewall`] trait은 엔진이 쓰는 두 가지 특권 명령을 감쌉니다:
//! `ufw show added`로 사용자 규칙을 조회하고, `ufw route delete ...`로 하나를 삭제합니다.
//! 운영 환경은 [`UfwFirewall`], 테스트는 `MockFirewall`을 사용합니다.
//!
//! # 실패 판정
//!
//! 실행 실패, 타임아웃, 0이 아닌 종료 코드, 그리고 stderr에 한 바이트라도 출력이 있으면
//! 실패입니다. ufw는 일부 에러를 종료 코드 0으로 보고하므로 stderr가 기준입니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use ufwguard_core::config::FirewallConfig;
//! use ufwguard_reconciler::{Firewall, UfwFirewall};
//!
//! let firewall = UfwFirewall::from_config(&FirewallConfig::default());
//! let output = firewall.list_rules().await?;
//! # Ok::<(), ufwguard_reconciler::ReconcilerError>(())
//! ```

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use ufwguard_core::config::FirewallConfig;

use crate::error::ReconcilerError;
use crate::rule::ManagedRule;

/// ufw 명령 추상화 trait
///
/// 스케줄러 태스크 간에 공유할 수 있도록 `Send + Sync + 'static`입니다.
pub trait Firewall: Send + Sync + 'static {
    /// `ufw show added`의 원본 출력(줄 단위)을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `ReconcilerError::Command`: 실행 실패, 0이 아닌 종료 코드, stderr 출력
    /// - `ReconcilerError::Timeout`: 제한 시간 초과
    fn list_rules(&self) -> impl Future<Output = Result<String, ReconcilerError>> + Send;

    /// 주어진 규칙 하나를 정확히 삭제하고 ufw의 stdout을 반환합니다.
    ///
    /// # Errors
    ///
    /// [`list_rules`](Self::list_rules)와 같습니다. 이미 없는 규칙의 삭제는
    /// ufw가 stderr로 보고하므로 `ReconcilerError::Command`가 됩니다.
    fn delete_rule(
        &self,
        rule: &ManagedRule,
    ) -> impl Future<Output = Result<String, ReconcilerError>> + Send;
}

/// `ufw` 바이너리를 호출하는 운영용 구현체
///
/// 인자는 셸 없이 프로세스에 직접 전달됩니다. `elevation`이 비어 있지 않으면
/// `<elevation> <ufw_path> <args...>` 형태로 실행합니다.
#[derive(Debug, Clone)]
pub struct UfwFirewall {
    ufw_path: String,
    elevation: Option<String>,
    timeout: Duration,
}

impl UfwFirewall {
    /// 방화벽 클라이언트를 생성합니다.
    ///
    /// # Arguments
    ///
    /// - `ufw_path`: ufw 바이너리 이름 또는 경로
    /// - `elevation`: 권한 상승 프로그램(`sudo`), 빈 문자열이면 직접 실행
    /// - `timeout`: 모든 명령의 상한 시간
    pub fn new(ufw_path: impl Into<String>, elevation: impl Into<String>, timeout: Duration) -> Self {
        let elevation = elevation.into();
        Self {
            ufw_path: ufw_path.into(),
            elevation: if elevation.trim().is_empty() {
                None
            } else {
                Some(elevation)
            },
            timeout,
        }
    }

    /// `[firewall]` 설정 섹션으로 생성합니다.
    pub fn from_config(config: &FirewallConfig) -> Self {
        Self::new(
            config.ufw_path.clone(),
            config.elevation.clone(),
            Duration::from_secs(config.command_timeout_secs),
        )
    }

    /// ufw 호출의 프로그램과 인자 목록을 만듭니다.
    fn command_line(&self, args: &[String]) -> (String, Vec<String>) {
        match &self.elevation {
            Some(elevation) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(self.ufw_path.clone());
                full.extend_from_slice(args);
                (elevation.clone(), full)
            }
            None => (self.ufw_path.clone(), args.to_vec()),
        }
    }

    async fn run(&self, args: &[String]) -> Result<String, ReconcilerError> {
        let (program, full_args) = self.command_line(args);
        let display = render_command(&program, &full_args);

        let mut cmd = Command::new(&program);
        cmd.args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ReconcilerError::Command {
                    command: display,
                    reason: format!("failed to spawn: {e}"),
                });
            }
            Err(_elapsed) => {
                return Err(ReconcilerError::Timeout {
                    operation: display,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        check_output(
            &display,
            output.status.success(),
            output.status.code(),
            &output.stdout,
            &output.stderr,
        )
    }
}

impl Firewall for UfwFirewall {
    async fn list_rules(&self) -> Result<String, ReconcilerError> {
        self.run(&["show".to_owned(), "added".to_owned()]).await
    }

    async fn delete_rule(&self, rule: &ManagedRule) -> Result<String, ReconcilerError> {
        self.run(&rule.delete_args()).await
    }
}

/// 종료된 명령에 실패 판정을 적용하고, 성공 시 stdout을 반환합니다.
fn check_output(
    command: &str,
    success: bool,
    code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<String, ReconcilerError> {
    // 판정은 원본 바이트 기준, 메시지에는 trim 된 텍스트 사용
    let failed_stderr = !stderr.is_empty();
    let stderr = String::from_utf8_lossy(stderr);
    let message = match stderr.trim() {
        "" => format!("{:?}", &*stderr),
        trimmed => trimmed.to_owned(),
    };

    if !success {
        let status = code.map_or_else(
            || "terminated by signal".to_owned(),
            |c| format!("exit status {c}"),
        );
        let reason = if failed_stderr {
            format!("{status}: {message}")
        } else {
            status
        };
        return Err(ReconcilerError::Command {
            command: command.to_owned(),
            reason,
        });
    }

    if failed_stderr {
        return Err(ReconcilerError::Command {
            command: command.to_owned(),
            reason: format!("unexpected stderr output: {message}"),
        });
    }

    Ok(String::from_utf8_lossy(stdout).into_owned())
}

/// 로그용 명령줄 문자열. 공백이 있는 인자는 따옴표로 감쌉니다.
fn render_command(program: &str, args: &[String]) -> String {
    let mut out = program.to_owned();
    for arg in args {
        out.push(' ');
        if arg.chars().any(char::is_whitespace) {
            out.push('\'');
            out.push_str(arg);
            out.push('\'');
        } else {
            out.push_str(arg);
        }
    }
    out
}

/// 테스트용 Mock 방화벽
///
/// 규칙 목록을 메모리에 보관하고, 삭제 시 실제로 제거하여
/// 연속된 조정 패스를 검증할 수 있게 합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockFirewall {
    /// 현재 규칙 줄 목록
    pub rules: std::sync::Mutex<Vec<String>>,
    /// list_rules 실패 시뮬레이션
    pub fail_list: bool,
    /// delete_rule 실패 시뮬레이션 대상 컨테이너 ID
    pub fail_delete_for: Option<String>,
    /// 삭제 호출 기록 (원본 줄)
    pub deleted: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockFirewall {
    /// 주어진 규칙 줄로 mock을 생성합니다.
    pub fn with_rules(rules: &[&str]) -> Self {
        Self {
            rules: std::sync::Mutex::new(rules.iter().map(|r| (*r).to_owned()).collect()),
            ..Self::default()
        }
    }

    /// 목록 조회가 실패하도록 설정합니다.
    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// 특정 컨테이너의 규칙 삭제가 실패하도록 설정합니다.
    pub fn with_failing_delete(mut self, container_id: &str) -> Self {
        self.fail_delete_for = Some(container_id.to_owned());
        self
    }

    /// 지금까지 삭제된 규칙 수
    pub fn delete_count(&self) -> usize {
        self.deleted.lock().map(|d| d.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl Firewall for MockFirewall {
    async fn list_rules(&self) -> Result<String, ReconcilerError> {
        if self.fail_list {
            return Err(ReconcilerError::Command {
                command: "ufw show added".to_owned(),
                reason: "ERROR: You need to be root to run this script".to_owned(),
            });
        }
        let rules = self.rules.lock().expect("mock lock");
        let mut out = String::from("Added user rules (see 'ufw status' for running firewall):\n");
        for rule in rules.iter() {
            out.push_str(rule);
            out.push('\n');
        }
        Ok(out)
    }

    async fn delete_rule(&self, rule: &ManagedRule) -> Result<String, ReconcilerError> {
        if self.fail_delete_for.as_deref() == Some(rule.container_id()) {
            return Err(ReconcilerError::Command {
                command: "ufw route delete".to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        let mut rules = self.rules.lock().expect("mock lock");
        let Some(pos) = rules.iter().position(|r| r == rule.raw()) else {
            return Err(ReconcilerError::Command {
                command: "ufw route delete".to_owned(),
                reason: "Could not delete non-existent rule".to_owned(),
            });
        };
        rules.remove(pos);
        self.deleted
            .lock()
            .expect("mock lock")
            .push(rule.raw().to_owned());
        Ok("Rule deleted".to_owned())
    }
}
