//! 통합 테스트 -- Cleanup/Sync 전체 플로우 검증
//!
//! 상태를 가진 테스트용 방화벽과 Docker 클라이언트를 사용하여
//! 규칙 목록 → 그룹화 → 런타임 조회 → 삭제 시나리오와
//! 관리 컨테이너 → 채널 전달 시나리오를 테스트합니다.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use ufwguard_core::types::ContainerDetail;
use ufwguard_reconciler::{
    ContainerSync, ReconcileEvent, ReconciliationEngine, RecordingReporter,
};

// 방화벽과 컨테이너 런타임 테스트 더블
mod mock {
    use super::*;
    use ufwguard_core::types::ContainerSummary;
    use ufwguard_reconciler::{DockerClient, Firewall, ManagedRule, ReconcilerError};

    pub struct TestFirewall {
        rules: Mutex<Vec<String>>,
        list_stderr: Mutex<Option<String>>,
        delete_calls: Mutex<Vec<Vec<String>>>,
    }

    impl TestFirewall {
        pub fn new(rules: &[&str]) -> Self {
            Self {
                rules: Mutex::new(rules.iter().map(|r| (*r).to_owned()).collect()),
                list_stderr: Mutex::new(None),
                delete_calls: Mutex::new(Vec::new()),
            }
        }

        pub async fn set_list_stderr(&self, stderr: &str) {
            *self.list_stderr.lock().await = Some(stderr.to_owned());
        }

        pub async fn delete_calls(&self) -> Vec<Vec<String>> {
            self.delete_calls.lock().await.clone()
        }

        pub async fn remaining(&self) -> Vec<String> {
            self.rules.lock().await.clone()
        }
    }

    impl Firewall for TestFirewall {
        async fn list_rules(&self) -> Result<String, ReconcilerError> {
            if let Some(stderr) = self.list_stderr.lock().await.clone() {
                return Err(ReconcilerError::Command {
                    command: "sudo ufw show added".to_owned(),
                    reason: stderr,
                });
            }
            let mut out =
                String::from("Added user rules (see 'ufw status' for running firewall):\n");
            for rule in self.rules.lock().await.iter() {
                out.push_str(rule);
                out.push('\n');
            }
            Ok(out)
        }

        async fn delete_rule(&self, rule: &ManagedRule) -> Result<String, ReconcilerError> {
            self.delete_calls.lock().await.push(rule.delete_args());
            let mut rules = self.rules.lock().await;
            match rules.iter().position(|r| r == rule.raw()) {
                Some(pos) => {
                    rules.remove(pos);
                    Ok("Rule deleted".to_owned())
                }
                None => Err(ReconcilerError::Command {
                    command: "sudo ufw route delete".to_owned(),
                    reason: "Could not delete non-existent rule".to_owned(),
                }),
            }
        }
    }

    pub struct TestDockerClient {
        containers: Mutex<Vec<ContainerDetail>>,
        broken: Mutex<Vec<String>>,
        inspect_calls: Mutex<usize>,
    }

    impl TestDockerClient {
        pub fn new() -> Self {
            Self {
                containers: Mutex::new(Vec::new()),
                broken: Mutex::new(Vec::new()),
                inspect_calls: Mutex::new(0),
            }
        }

        pub async fn add_container(&self, container: ContainerDetail) {
            self.containers.lock().await.push(container);
        }

        pub async fn break_inspect(&self, id: &str) {
            self.broken.lock().await.push(id.to_owned());
        }

        pub async fn stop(&self, id: &str) {
            for c in self.containers.lock().await.iter_mut() {
                if c.id.starts_with(id) {
                    c.running = false;
                }
            }
        }

        pub async fn inspect_calls(&self) -> usize {
            *self.inspect_calls.lock().await
        }
    }

    impl DockerClient for TestDockerClient {
        async fn list_managed_containers(
            &self,
            label: &str,
        ) -> Result<Vec<ContainerSummary>, ReconcilerError> {
            let (key, value) = label.split_once('=').unwrap_or((label, ""));
            Ok(self
                .containers
                .lock()
                .await
                .iter()
                .filter(|c| c.running && c.labels.get(key).is_some_and(|v| v == value))
                .map(|c| ContainerSummary {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    labels: c.labels.clone(),
                })
                .collect())
        }

        async fn inspect_container(&self, id: &str) -> Result<ContainerDetail, ReconcilerError> {
            *self.inspect_calls.lock().await += 1;
            if self.broken.lock().await.iter().any(|b| b == id) {
                return Err(ReconcilerError::DockerApi("connection reset".to_owned()));
            }
            self.containers
                .lock()
                .await
                .iter()
                .find(|c| c.id == id || c.id.starts_with(id))
                .cloned()
                .ok_or_else(|| ReconcilerError::ContainerNotFound(id.to_owned()))
        }

        async fn ping(&self) -> Result<(), ReconcilerError> {
            Ok(())
        }
    }
}

use mock::{TestDockerClient, TestFirewall};

const GOLDBERG_ID: &str = "b44309293890a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f607182930";
const DARWIN_ID: &str = "fd6b1483b319ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766";

const GOLDBERG_RULES: [&str; 3] = [
    "ufw route allow to 172.17.0.2 port 88 proto tcp comment 'dreamy_goldberg:b44309293890 Internet'",
    "ufw route allow from 192.168.3.0/24 to 172.17.0.2 port 89 proto tcp comment 'dreamy_goldberg:b44309293890 LAN'",
    "ufw route allow from 10.10.0.50 to 172.17.0.2 port 90 proto tcp comment 'dreamy_goldberg:b44309293890'",
];

const DARWIN_RULES: [&str; 2] = [
    "ufw route allow from 172.17.0.3 to 8.8.8.8 port 53 comment 'gracious_darwin:fd6b1483b319 GoogleDNS'",
    "ufw route deny from 172.17.0.3 comment 'gracious_darwin:fd6b1483b319'",
];

const UNRELATED: &str = "ufw allow 22/tcp";

fn container(id: &str, name: &str, running: bool) -> ContainerDetail {
    ContainerDetail {
        id: id.to_owned(),
        name: name.to_owned(),
        image: "nginx:latest".to_owned(),
        running,
        labels: HashMap::from([("UFW_MANAGED".to_owned(), "TRUE".to_owned())]),
        ip_addresses: HashMap::from([("bridge".to_owned(), "172.17.0.2".to_owned())]),
    }
}

fn all_rules() -> Vec<&'static str> {
    let mut rules = Vec::new();
    rules.extend(GOLDBERG_RULES);
    rules.push(UNRELATED);
    rules.extend(DARWIN_RULES);
    rules
}

async fn setup() -> (Arc<TestFirewall>, Arc<TestDockerClient>) {
    let firewall = Arc::new(TestFirewall::new(&all_rules()));
    let docker = Arc::new(TestDockerClient::new());
    docker
        .add_container(container(GOLDBERG_ID, "dreamy_goldberg", true))
        .await;
    docker
        .add_container(container(DARWIN_ID, "gracious_darwin", false))
        .await;
    (firewall, docker)
}

#[tokio::test]
async fn cleanup_deletes_only_stopped_container_rules() {
    let (firewall, docker) = setup().await;
    let engine = ReconciliationEngine::with_reporter(
        Arc::clone(&firewall),
        Arc::clone(&docker),
        RecordingReporter::new(),
    );

    let summary = engine.cleanup().await;

    assert_eq!(summary.rules_deleted, 2);
    assert_eq!(summary.orphaned_containers, 1);
    let remaining = firewall.remaining().await;
    assert_eq!(remaining.len(), 4);
    assert!(remaining.contains(&UNRELATED.to_owned()));
    for rule in GOLDBERG_RULES {
        assert!(remaining.contains(&rule.to_owned()));
    }
}

#[tokio::test]
async fn delete_commands_target_exact_rule_spec() {
    let (firewall, docker) = setup().await;
    let engine = ReconciliationEngine::with_reporter(firewall.clone(), docker, RecordingReporter::new());
    engine.cleanup().await;

    let calls = firewall.delete_calls().await;
    assert_eq!(
        calls[0],
        vec![
            "route",
            "delete",
            "allow",
            "from",
            "172.17.0.3",
            "to",
            "8.8.8.8",
            "port",
            "53",
            "comment",
            "gracious_darwin:fd6b1483b319 GoogleDNS",
        ]
    );
    assert_eq!(
        calls[1],
        vec![
            "route",
            "delete",
            "deny",
            "from",
            "172.17.0.3",
            "comment",
            "gracious_darwin:fd6b1483b319",
        ]
    );
}

#[tokio::test]
async fn repeated_cleanup_is_idempotent() {
    let (firewall, docker) = setup().await;
    let engine = ReconciliationEngine::with_reporter(firewall.clone(), docker, RecordingReporter::new());

    engine.cleanup().await;
    let after_first = firewall.delete_calls().await.len();
    let second = engine.cleanup().await;

    assert_eq!(after_first, 2);
    assert_eq!(second.rules_deleted, 0);
    assert_eq!(firewall.delete_calls().await.len(), after_first);
}

#[tokio::test]
async fn stopping_a_container_cleans_it_on_next_pass() {
    let (firewall, docker) = setup().await;
    let engine =
        ReconciliationEngine::with_reporter(firewall.clone(), docker.clone(), RecordingReporter::new());

    engine.cleanup().await;
    docker.stop("b44309293890").await;
    let summary = engine.cleanup().await;

    assert_eq!(summary.rules_deleted, 3);
    assert_eq!(firewall.remaining().await, vec![UNRELATED.to_owned()]);
}

#[tokio::test]
async fn runtime_error_is_treated_as_orphaned() {
    let (firewall, docker) = setup().await;
    docker.break_inspect("b44309293890").await;
    let engine = ReconciliationEngine::with_reporter(firewall.clone(), docker, RecordingReporter::new());

    let summary = engine.cleanup().await;

    assert_eq!(summary.orphaned_containers, 2);
    assert_eq!(summary.rules_deleted, 5);
    let orphan_reasons: Vec<_> = engine
        .reporter()
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ReconcileEvent::ContainerOrphaned {
                container_id,
                reason,
                ..
            } => Some((container_id, reason)),
            _ => None,
        })
        .collect();
    assert_eq!(orphan_reasons[0].0, "b44309293890");
    assert!(orphan_reasons[0].1.contains("connection reset"));
    assert_eq!(orphan_reasons[1].1, "not running");
}

#[tokio::test]
async fn listing_failure_means_no_queries_and_no_deletions() {
    let (firewall, docker) = setup().await;
    firewall
        .set_list_stderr("ERROR: You need to be root to run this script")
        .await;
    let engine = ReconciliationEngine::with_reporter(
        firewall.clone(),
        docker.clone(),
        RecordingReporter::new(),
    );

    let summary = engine.cleanup().await;

    assert_eq!(summary.rules_deleted, 0);
    assert_eq!(docker.inspect_calls().await, 0);
    assert!(firewall.delete_calls().await.is_empty());
    let events = engine.reporter().events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ReconcileEvent::RuleListFailed { reason } if reason.contains("root")));
}

#[tokio::test]
async fn concurrent_cleanups_delete_each_rule_once() {
    let (firewall, docker) = setup().await;
    let engine = Arc::new(ReconciliationEngine::with_reporter(
        firewall.clone(),
        docker,
        RecordingReporter::new(),
    ));

    let a = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.cleanup().await }
    });
    let b = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.cleanup().await }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    // both passes may try the same rules; the firewall only removes them once
    assert_eq!(a.rules_deleted + b.rules_deleted, 2);
    assert_eq!(firewall.remaining().await.len(), 4);
}

#[tokio::test]
async fn sync_forwards_running_managed_containers_in_order() {
    let docker = Arc::new(TestDockerClient::new());
    docker.add_container(container("aaaa1111", "one", true)).await;
    docker.add_container(container("bbbb2222", "two", true)).await;
    docker.add_container(container("cccc3333", "three", true)).await;
    docker.break_inspect("bbbb2222").await;

    let sync = ContainerSync::with_reporter(docker, "UFW_MANAGED=TRUE", RecordingReporter::new());
    let (tx, mut rx) = mpsc::channel(8);

    let summary = sync.sync(&tx).await.unwrap();
    drop(tx);

    assert_eq!(summary.sent, 2);
    let mut received = Vec::new();
    while let Some(detail) = rx.recv().await {
        received.push(detail.name);
    }
    assert_eq!(received, vec!["one", "three"]);
}

#[tokio::test]
async fn sync_backpressures_on_bounded_channel() {
    let docker = Arc::new(TestDockerClient::new());
    for i in 0..4 {
        docker
            .add_container(container(&format!("aaaa000{i}"), &format!("c{i}"), true))
            .await;
    }
    let sync = ContainerSync::with_reporter(docker, "UFW_MANAGED=TRUE", RecordingReporter::new());
    let (tx, mut rx) = mpsc::channel(1);

    let consumer = tokio::spawn(async move {
        let mut n = 0;
        while rx.recv().await.is_some() {
            n += 1;
        }
        n
    });

    let summary = sync.sync(&tx).await.unwrap();
    drop(tx);

    assert_eq!(summary.sent, 4);
    assert_eq!(consumer.await.unwrap(), 4);
}
