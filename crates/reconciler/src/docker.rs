//! Docker API 추상화
//!
//! [`DockerClient`] trait은 bollard Docker API를 감쌉니다. 운영 환경은
//! [`BollardDockerClient`], 테스트는 `MockDockerClient`를 사용합니다.
//!
//! # 구조
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────┐
//! │ ReconciliationEngine │   │ ContainerSync│
//! └──────────┬───────────┘   └──────┬───────┘
//!            └──────────┬───────────┘
//!                       ▼
//!                ┌─────────────┐
//!                │DockerClient │ (trait)
//!                └─────────────┘
//!                   │       │
//!                   ▼       ▼
//!              ┌───────┐ ┌──────┐
//!              │Bollard│ │ Mock │
//!              └───┬───┘ └──────┘
//!                  ▼
//!            Docker Daemon
//! ```
//!
//! # 컨테이너 ID 검증
//!
//! 방화벽 코멘트에서 읽은 ID는 신뢰할 수 없는 텍스트입니다. ID를 받는 메서드는 먼저 검증합니다:
//! - 길이 1-64
//! - ASCII 16진수 문자만 허용 ([0-9a-fA-F])
//!
//! 잘못된 ID는 데몬에 요청하지 않고 `ReconcilerError::DockerApi`를 반환합니다.
//! 컨테이너 이름은 ID로 인정되지 않으므로, 이름이 적힌 코멘트의 규칙은 Cleanup에서 고아가 됩니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ufwguard_core::config::DockerConfig;
use ufwguard_core::types::{ContainerDetail, ContainerSummary};

use crate::error::ReconcilerError;

/// 컨테이너 ID를 검증합니다.
///
/// Docker 컨테이너 ID는 64자 16진수 문자열이며, 더 짧은 접두어도 허용됩니다.
pub fn validate_container_id(id: &str) -> Result<(), ReconcilerError> {
    if id.is_empty() || id.len() > 64 {
        return Err(ReconcilerError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ReconcilerError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Docker API 추상화 trait
///
/// # 에러 처리
///
/// - **404**: `ReconcilerError::ContainerNotFound`
/// - **연결 실패**: `ReconcilerError::DockerConnection`
/// - **응답 지연**: `ReconcilerError::Timeout`
pub trait DockerClient: Send + Sync + 'static {
    /// 라벨 필터에 맞는 실행 중 컨테이너 목록을 조회합니다.
    ///
    /// # Arguments
    ///
    /// - `label`: Docker 라벨 필터, `KEY=VALUE` 또는 `KEY`
    ///
    /// # Errors
    ///
    /// Docker API 호출 실패 시 `ReconcilerError::DockerApi`
    fn list_managed_containers(
        &self,
        label: &str,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, ReconcilerError>> + Send;

    /// 컨테이너 하나를 inspect 합니다.
    ///
    /// # Arguments
    ///
    /// - `id`: 전체 ID 또는 접두어 (16진수 1-64자)
    ///
    /// # Errors
    ///
    /// - `ReconcilerError::ContainerNotFound`: 컨테이너 없음 (404)
    /// - `ReconcilerError::DockerApi`: 잘못된 ID 또는 기타 API 에러
    fn inspect_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerDetail, ReconcilerError>> + Send;

    /// Docker 데몬 연결을 확인합니다.
    fn ping(&self) -> impl Future<Output = Result<(), ReconcilerError>> + Send;
}

/// `bollard` 기반 운영용 Docker 클라이언트
///
/// 내부적으로 `Arc<bollard::Docker>`를 공유하며, 모든 호출에 타임아웃이 적용됩니다.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
    timeout: Duration,
}

impl BollardDockerClient {
    /// 기본 로컬 소켓으로 연결합니다.
    ///
    /// # Errors
    ///
    /// 연결 실패 시 `ReconcilerError::DockerConnection`
    pub fn connect_local(timeout: Duration) -> Result<Self, ReconcilerError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            ReconcilerError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
            timeout,
        })
    }

    /// 지정한 소켓 경로로 연결합니다.
    ///
    /// # Errors
    ///
    /// 연결 실패 시 `ReconcilerError::DockerConnection`
    pub fn connect_with_socket(
        socket_path: &str,
        timeout: Duration,
    ) -> Result<Self, ReconcilerError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            timeout.as_secs().max(1),
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            ReconcilerError::DockerConnection(format!(
                "failed to connect to docker at {socket_path}: {e}"
            ))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
            timeout,
        })
    }

    /// `[docker]` 설정 섹션에 따라 연결합니다.
    ///
    /// `docker_socket`이 비어 있으면 플랫폼 기본값을 사용합니다.
    pub fn from_config(config: &DockerConfig) -> Result<Self, ReconcilerError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        if config.docker_socket.trim().is_empty() {
            Self::connect_local(timeout)
        } else {
            Self::connect_with_socket(&config.docker_socket, timeout)
        }
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, ReconcilerError>
    where
        F: Future<Output = Result<T, ReconcilerError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_elapsed| {
                Err(ReconcilerError::Timeout {
                    operation: operation.to_owned(),
                    secs: self.timeout.as_secs(),
                })
            })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_managed_containers(
        &self,
        label: &str,
    ) -> Result<Vec<ContainerSummary>, ReconcilerError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            filters: HashMap::from([("label".to_owned(), vec![label.to_owned()])]),
            ..Default::default()
        };

        let containers = self
            .bounded("list containers", async {
                self.docker
                    .list_containers(Some(options))
                    .await
                    .map_err(|e| ReconcilerError::DockerApi(format!("list containers failed: {e}")))
            })
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                name: c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_owned())
                    .unwrap_or_default(),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetail, ReconcilerError> {
        validate_container_id(id)?;

        let details = self
            .bounded(&format!("inspect container {id}"), async {
                self.docker
                    .inspect_container(id, None)
                    .await
                    .map_err(|e| match e {
                        bollard::errors::Error::DockerResponseServerError {
                            status_code: 404,
                            ..
                        } => ReconcilerError::ContainerNotFound(id.to_owned()),
                        other => {
                            ReconcilerError::DockerApi(format!("inspect container failed: {other}"))
                        }
                    })
            })
            .await?;

        let config = details.config.unwrap_or_default();
        let ip_addresses = details
            .network_settings
            .and_then(|n| n.networks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(network, endpoint)| {
                endpoint
                    .ip_address
                    .filter(|ip| !ip.is_empty())
                    .map(|ip| (network, ip))
            })
            .collect();

        Ok(ContainerDetail {
            id: details.id.unwrap_or_else(|| id.to_owned()),
            name: details
                .name
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            // 상태 정보가 없으면 정지된 것으로 간주
            running: details.state.and_then(|s| s.running).unwrap_or(false),
            labels: config.labels.unwrap_or_default(),
            ip_addresses,
        })
    }

    async fn ping(&self) -> Result<(), ReconcilerError> {
        self.bounded("ping", async {
            self.docker
                .ping()
                .await
                .map(|_| ())
                .map_err(|e| ReconcilerError::DockerConnection(format!("ping failed: {e}")))
        })
        .await
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 설정 가능한 응답을 반환하여 Docker 없이도 테스트할 수 있습니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// 컨테이너 목록 (listing 순서 유지)
    pub containers: Vec<ContainerDetail>,
    /// list 호출 실패 시뮬레이션
    pub fail_list: bool,
    /// inspect 실패 시뮬레이션 대상 ID
    pub fail_inspect: Vec<String>,
    /// inspect 호출 횟수
    pub inspect_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockDockerClient {
    /// 빈 컨테이너 목록으로 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트용 컨테이너를 추가합니다.
    pub fn with_containers(mut self, containers: Vec<ContainerDetail>) -> Self {
        self.containers = containers;
        self
    }

    /// list 호출이 실패하도록 설정합니다.
    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// 특정 컨테이너의 inspect가 실패하도록 설정합니다.
    pub fn with_failing_inspect(mut self, id: &str) -> Self {
        self.fail_inspect.push(id.to_owned());
        self
    }

    /// 지금까지의 inspect 호출 횟수
    pub fn inspect_count(&self) -> usize {
        self.inspect_calls
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_managed_containers(
        &self,
        label: &str,
    ) -> Result<Vec<ContainerSummary>, ReconcilerError> {
        if self.fail_list {
            return Err(ReconcilerError::DockerApi("mock list failure".to_owned()));
        }
        let (key, value) = label.split_once('=').unwrap_or((label, ""));
        Ok(self
            .containers
            .iter()
            .filter(|c| c.running)
            .filter(|c| match c.labels.get(key) {
                Some(v) => value.is_empty() || v == value,
                None => false,
            })
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                labels: c.labels.clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetail, ReconcilerError> {
        self.inspect_calls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_inspect.iter().any(|f| f == id) {
            return Err(ReconcilerError::DockerApi("mock inspect failure".to_owned()));
        }
        // Docker는 고유한 ID 접두어도 해석함
        self.containers
            .iter()
            .find(|c| c.id == id || c.id.starts_with(id))
            .cloned()
            .ok_or_else(|| ReconcilerError::ContainerNotFound(id.to_owned()))
    }

    async fn ping(&self) -> Result<(), ReconcilerError> {
        Ok(())
    }
}
