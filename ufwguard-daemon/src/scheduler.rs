//! Sync/Cleanup 스케줄러
//!
//! [`Scheduler`]는 시작 시 한 번 Sync를 수행하고(설정 시), 이후 고정 주기로
//! Cleanup 패스를 실행합니다. 종료는 `CancellationToken`으로 전달됩니다.
//!
//! # 실행 흐름
//! ```text
//! run() ──> sync_on_start? ──> ContainerSync.sync(tx)
//!   └── loop: interval.tick() ──> ReconciliationEngine.cleanup()
//!             cancel.cancelled() ──> break
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ufwguard_core::config::UfwGuardConfig;
use ufwguard_core::types::ContainerDetail;
use ufwguard_reconciler::{
    CleanupSummary, ContainerSync, DockerClient, Firewall, ReconcilerError,
    ReconciliationEngine, Reporter, SyncSummary, TracingReporter,
};

/// `--once` 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Sync 결과
    pub sync: SyncSummary,
    /// Cleanup 결과
    pub cleanup: CleanupSummary,
}

/// Sync와 Cleanup을 구동하는 스케줄러
pub struct Scheduler<F: Firewall, D: DockerClient, R: Reporter + Clone = TracingReporter> {
    engine: ReconciliationEngine<F, D, R>,
    sync: ContainerSync<D, R>,
    sync_on_start: bool,
    cleanup_interval: Duration,
}

impl<F: Firewall, D: DockerClient> Scheduler<F, D> {
    /// `TracingReporter`를 사용하는 스케줄러를 생성합니다.
    pub fn new(firewall: Arc<F>, docker: Arc<D>, config: &UfwGuardConfig) -> Self {
        Self::with_reporter(firewall, docker, config, TracingReporter)
    }
}

impl<F: Firewall, D: DockerClient, R: Reporter + Clone> Scheduler<F, D, R> {
    /// 지정한 Reporter를 Cleanup과 Sync가 함께 사용하도록 생성합니다.
    pub fn with_reporter(
        firewall: Arc<F>,
        docker: Arc<D>,
        config: &UfwGuardConfig,
        reporter: R,
    ) -> Self {
        Self {
            engine: ReconciliationEngine::with_reporter(
                firewall,
                Arc::clone(&docker),
                reporter.clone(),
            ),
            sync: ContainerSync::with_reporter(
                docker,
                config.docker.managed_label.clone(),
                reporter,
            ),
            sync_on_start: config.schedule.sync_on_start,
            cleanup_interval: Duration::from_secs(config.schedule.cleanup_interval_secs),
        }
    }

    /// Sync 한 번과 Cleanup 한 번을 순서대로 실행합니다.
    ///
    /// # Errors
    ///
    /// 출력 채널이 닫힌 경우 `ReconcilerError::Channel`
    pub async fn run_once(
        &self,
        tx: &mpsc::Sender<ContainerDetail>,
    ) -> Result<PassSummary, ReconcilerError> {
        let sync = self.sync.sync(tx).await?;
        let cleanup = self.engine.cleanup().await;
        Ok(PassSummary { sync, cleanup })
    }

    /// 취소될 때까지 스케줄을 실행합니다.
    ///
    /// 첫 Cleanup은 즉시 실행되고, 이후 `cleanup_interval`마다 반복됩니다.
    /// 진행 중인 패스는 끝까지 실행된 뒤 취소가 반영됩니다.
    /// 반환 시 `tx`가 drop 되어 소비자 측 채널이 닫힙니다.
    ///
    /// # Errors
    ///
    /// 시작 Sync 중 출력 채널이 닫힌 경우 `ReconcilerError::Channel`
    pub async fn run(
        &self,
        tx: mpsc::Sender<ContainerDetail>,
        cancel: CancellationToken,
    ) -> Result<(), ReconcilerError> {
        if self.sync_on_start {
            let summary = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler cancelled during initial sync");
                    return Ok(());
                }
                result = self.sync.sync(&tx) => result?,
            };
            info!(
                listed = summary.listed,
                sent = summary.sent,
                skipped = summary.skipped,
                "initial sync completed"
            );
        }

        let mut interval = tokio::time::interval(self.cleanup_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.cleanup_interval.as_secs(),
            "cleanup schedule started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("scheduler received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    let summary = self.engine.cleanup().await;
                    debug!(rules_deleted = summary.rules_deleted, "scheduled cleanup finished");
                }
            }
        }

        Ok(())
    }
}

/// 규칙 설치기가 없을 때 Sync 출력 채널을 비우는 기본 소비자
///
/// 전달된 컨테이너를 로그로 남기고, 채널이 닫히면 받은 개수를 반환합니다.
pub fn spawn_container_logger(mut rx: mpsc::Receiver<ContainerDetail>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(container) = rx.recv().await {
            received += 1;
            let addresses: Vec<&str> = container.ip_addresses.values().map(String::as_str).collect();
            info!(
                container_id = %container.short_id(),
                name = %container.name,
                image = %container.image,
                addresses = ?addresses,
                "managed container ready for rule installation"
            );
        }
        debug!(received, "container channel closed");
        received
    })
}
