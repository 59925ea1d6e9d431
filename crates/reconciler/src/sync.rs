//! 관리 컨테이너 동기화 (Sync)
//!
//! [`ContainerSync`]는 관리 라벨이 붙은 실행 중 컨테이너를 조회하고, 각각을 inspect 하여
//! 하위 규칙 설치기가 소비하는 채널로 한 번에 하나씩 전달합니다.
//! 이전에 보낸 컨테이너와의 비교나 중복 제거는 하지 않습니다.

use std::sync::Arc;

use tokio::sync::mpsc;

use ufwguard_core::config::DEFAULT_MANAGED_LABEL;
use ufwguard_core::types::ContainerDetail;

use crate::docker::DockerClient;
use crate::error::ReconcilerError;
use crate::report::{ReconcileEvent, Reporter, TracingReporter};

/// 한 번의 Sync 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// 목록에서 조회된 관리 컨테이너 수
    pub listed: usize,
    /// 채널로 전달된 컨테이너 수
    pub sent: usize,
    /// inspect 실패로 건너뛴 컨테이너 수
    pub skipped: usize,
}

/// 관리 컨테이너 동기화기
pub struct ContainerSync<D: DockerClient, R: Reporter = TracingReporter> {
    docker: Arc<D>,
    managed_label: String,
    reporter: R,
}

impl<D: DockerClient> ContainerSync<D> {
    /// 기본 라벨(`UFW_MANAGED=TRUE`)과 `TracingReporter`를 사용합니다.
    pub fn new(docker: Arc<D>) -> Self {
        Self::with_reporter(docker, DEFAULT_MANAGED_LABEL, TracingReporter)
    }
}

impl<D: DockerClient, R: Reporter> ContainerSync<D, R> {
    /// 라벨 필터와 Reporter를 지정하여 생성합니다.
    pub fn with_reporter(docker: Arc<D>, managed_label: impl Into<String>, reporter: R) -> Self {
        Self {
            docker,
            managed_label: managed_label.into(),
            reporter,
        }
    }

    /// 라벨 필터를 바꿉니다.
    pub fn managed_label(mut self, label: impl Into<String>) -> Self {
        self.managed_label = label.into();
        self
    }

    /// 동기화기의 Reporter
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// 관리 컨테이너를 조회하여 `tx`로 전달합니다.
    ///
    /// 목록 조회 실패는 보고 후 빈 결과로 끝나고, 개별 inspect 실패는 해당 컨테이너만
    /// 건너뜁니다. 전송은 블로킹이므로 소비자가 느리면 여기서 대기합니다.
    ///
    /// # Errors
    ///
    /// 수신 측이 닫힌 경우에만 `ReconcilerError::Channel`을 반환하며,
    /// 이후 컨테이너는 inspect 하지 않습니다.
    pub async fn sync(
        &self,
        tx: &mpsc::Sender<ContainerDetail>,
    ) -> Result<SyncSummary, ReconcilerError> {
        let containers = match self
            .docker
            .list_managed_containers(&self.managed_label)
            .await
        {
            Ok(containers) => containers,
            Err(e) => {
                self.reporter.report(&ReconcileEvent::ContainerListFailed {
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };

        let mut summary = SyncSummary {
            listed: containers.len(),
            ..SyncSummary::default()
        };

        for container in containers {
            let detail = match self.docker.inspect_container(&container.id).await {
                Ok(detail) => detail,
                Err(e) => {
                    summary.skipped += 1;
                    self.reporter.report(&ReconcileEvent::InspectFailed {
                        container_id: container.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let container_id = detail.id.clone();
            tx.send(detail).await.map_err(|e| {
                ReconcilerError::Channel(format!(
                    "rule installer dropped, container {container_id} not delivered: {e}"
                ))
            })?;
            summary.sent += 1;
            self.reporter
                .report(&ReconcileEvent::ContainerQueued { container_id });
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::docker::MockDockerClient;
    use crate::report::RecordingReporter;

    fn managed(id: &str) -> ContainerDetail {
        ContainerDetail {
            id: id.to_owned(),
            name: format!("c-{id}"),
            image: "nginx".to_owned(),
            running: true,
            labels: HashMap::from([("UFW_MANAGED".to_owned(), "TRUE".to_owned())]),
            ip_addresses: HashMap::new(),
        }
    }

    fn sync_with(docker: MockDockerClient) -> ContainerSync<MockDockerClient, RecordingReporter> {
        ContainerSync::with_reporter(
            Arc::new(docker),
            DEFAULT_MANAGED_LABEL,
            RecordingReporter::new(),
        )
    }

    #[tokio::test]
    async fn no_managed_containers_sends_nothing() {
        let sync = sync_with(MockDockerClient::new());
        let (tx, mut rx) = mpsc::channel(4);
        let summary = sync.sync(&tx).await.unwrap();
        assert_eq!(summary, SyncSummary::default());
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn inspect_failure_skips_only_that_container() {
        let sync = sync_with(
            MockDockerClient::new()
                .with_containers(vec![managed("aaa1"), managed("bbb2"), managed("ccc3")])
                .with_failing_inspect("bbb2"),
        );
        let (tx, mut rx) = mpsc::channel(4);
        let summary = sync.sync(&tx).await.unwrap();
        assert_eq!(summary.listed, 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.skipped, 1);

        assert_eq!(rx.recv().await.unwrap().id, "aaa1");
        assert_eq!(rx.recv().await.unwrap().id, "ccc3");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn list_failure_is_reported_and_completes() {
        let sync = sync_with(
            MockDockerClient::new()
                .with_containers(vec![managed("aaa1")])
                .with_failing_list(),
        );
        let (tx, _rx) = mpsc::channel(4);
        let summary = sync.sync(&tx).await.unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(
            sync.reporter()
                .count(|e| matches!(e, ReconcileEvent::ContainerListFailed { .. })),
            1
        );
    }

    #[tokio::test]
    async fn unlabeled_containers_are_ignored() {
        let mut other = managed("ddd4");
        other.labels.clear();
        let sync = sync_with(MockDockerClient::new().with_containers(vec![other, managed("aaa1")]));
        let (tx, mut rx) = mpsc::channel(4);
        let summary = sync.sync(&tx).await.unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(rx.recv().await.unwrap().id, "aaa1");
    }

    #[tokio::test]
    async fn closed_channel_returns_error() {
        let sync = sync_with(MockDockerClient::new().with_containers(vec![managed("aaa1")]));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = sync.sync(&tx).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::Channel(_)));
    }

    #[tokio::test]
    async fn custom_label_is_used_for_listing() {
        let mut labeled = managed("eee5");
        labeled.labels = HashMap::from([("FIREWALL".to_owned(), "ON".to_owned())]);
        let sync = sync_with(MockDockerClient::new().with_containers(vec![labeled, managed("aaa1")]))
            .managed_label("FIREWALL=ON");
        let (tx, mut rx) = mpsc::channel(4);
        sync.sync(&tx).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().id, "eee5");
    }

    #[tokio::test]
    async fn every_send_is_reported() {
        let sync = sync_with(MockDockerClient::new().with_containers(vec![managed("aaa1"), managed("bbb2")]));
        let (tx, _rx) = mpsc::channel(4);
        sync.sync(&tx).await.unwrap();
        assert_eq!(
            sync.reporter()
                .count(|e| matches!(e, ReconcileEvent::ContainerQueued { .. })),
            2
        );
    }
}
