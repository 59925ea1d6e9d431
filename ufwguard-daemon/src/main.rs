use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ufwguard_core::config::UfwGuardConfig;
use ufwguard_daemon::cli::DaemonCli;
use ufwguard_daemon::scheduler::{Scheduler, spawn_container_logger};
use ufwguard_daemon::{logging, metrics_server};
use ufwguard_reconciler::{BollardDockerClient, DockerClient, UfwFirewall};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일 -> 환경변수 -> CLI, 검증은 마지막에 한 번
    let config = UfwGuardConfig::load_with(&cli.config, |c| cli.apply_overrides(c))
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "ufwguard-daemon starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let firewall = Arc::new(UfwFirewall::from_config(&config.firewall));
    let docker = Arc::new(
        BollardDockerClient::from_config(&config.docker)
            .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?,
    );
    // 연결 실패는 치명적이지 않음: 각 패스가 실패를 보고하고 다음 주기에 재시도
    if let Err(e) = docker.ping().await {
        tracing::warn!(error = %e, "docker daemon not reachable yet");
    }

    let scheduler = Scheduler::new(firewall, docker, &config);
    let (tx, rx) = mpsc::channel(config.schedule.channel_capacity);
    let consumer = spawn_container_logger(rx);

    if cli.once {
        let summary = scheduler
            .run_once(&tx)
            .await
            .map_err(|e| anyhow::anyhow!("single pass failed: {}", e))?;
        drop(tx);
        let _ = consumer.await;
        tracing::info!(
            containers_synced = summary.sync.sent,
            rules_deleted = summary.cleanup.rules_deleted,
            delete_failures = summary.cleanup.delete_failures,
            "single pass completed"
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let runner = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(tx, cancel).await }
    });

    tracing::info!("ufwguard-daemon running");
    let signal = wait_for_shutdown_signal().await?;
    tracing::info!(signal = signal, "shutdown signal received");
    cancel.cancel();

    match runner.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "scheduler stopped with error"),
        Err(e) => tracing::error!(error = %e, "scheduler task panicked"),
    }
    let _ = consumer.await;

    tracing::info!("ufwguard-daemon shut down");
    Ok(())
}

/// SIGTERM 또는 SIGINT를 기다리고, 수신한 시그널 이름을 반환합니다.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
