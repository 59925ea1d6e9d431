//! 조정 엔진 (Cleanup) -- 사라졌거나 정지된 컨테이너의 ufw 규칙 삭제
//!
//! [`ReconciliationEngine`]은 상태를 보관하지 않습니다. 매 패스마다 ufw 규칙 목록과
//! Docker 조회 결과만으로 삭제 대상을 다시 계산하므로 언제 다시 실행해도 안전합니다.
//!
//! # 처리 흐름
//! ```text
//! Firewall.list_rules() ──> group_rules() ──> RuleGroups (containerID -> rules)
//!                                                  |
//!                              DockerClient.inspect_container() (ID당 1회)
//!                                                  |
//!                                     reconcile(groups, live IDs)
//!                                                  |
//!                                    Firewall.delete_rule() (규칙마다)
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use ufwguard_core::metrics as names;

use crate::docker::DockerClient;
use crate::firewall::Firewall;
use crate::report::{ReconcileEvent, Reporter, TracingReporter};
use crate::rule::ManagedRule;

/// 컨테이너 ID별 관리 규칙 묶음
///
/// 컨테이너 ID는 처음 발견된 순서로, 각 그룹 안의 규칙은 출력 순서대로 유지됩니다.
#[derive(Debug, Clone, Default)]
pub struct RuleGroups {
    groups: Vec<(String, Vec<ManagedRule>)>,
    index: HashMap<String, usize>,
}

impl RuleGroups {
    /// 빈 그룹 맵을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙을 해당 컨테이너 ID 그룹 끝에 추가합니다.
    pub fn insert(&mut self, rule: ManagedRule) {
        match self.index.get(rule.container_id()) {
            Some(&i) => self.groups[i].1.push(rule),
            None => {
                let id = rule.container_id().to_owned();
                self.index.insert(id.clone(), self.groups.len());
                self.groups.push((id, vec![rule]));
            }
        }
    }

    /// 컨테이너 ID의 규칙 목록
    pub fn get(&self, container_id: &str) -> Option<&[ManagedRule]> {
        self.index
            .get(container_id)
            .map(|&i| self.groups[i].1.as_slice())
    }

    /// 발견 순서의 컨테이너 ID
    pub fn container_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(id, _)| id.as_str())
    }

    /// 발견 순서의 (컨테이너 ID, 규칙) 쌍
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ManagedRule])> {
        self.groups
            .iter()
            .map(|(id, rules)| (id.as_str(), rules.as_slice()))
    }

    /// 서로 다른 컨테이너 ID 수
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// 그룹이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 전체 규칙 수
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|(_, rules)| rules.len()).sum()
    }
}

/// `ufw show added` 출력을 컨테이너 ID별로 묶습니다.
///
/// 관리 규칙 형식이 아닌 줄은 조용히 버립니다.
pub fn group_rules(output: &str) -> RuleGroups {
    let mut groups = RuleGroups::new();
    for rule in output.lines().filter_map(ManagedRule::parse) {
        groups.insert(rule);
    }
    groups
}

/// 삭제 대상으로 판정된 한 컨테이너의 규칙
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedRules {
    /// 규칙 코멘트의 컨테이너 ID
    pub container_id: String,
    /// 삭제할 규칙 (발견 순서)
    pub rules: Vec<ManagedRule>,
}

/// 실행 중인 컨테이너 ID 집합에 없는 그룹을 발견 순서대로 반환합니다.
///
/// 외부 호출이 없는 순수 함수입니다.
pub fn reconcile(groups: &RuleGroups, live: &HashSet<String>) -> Vec<OrphanedRules> {
    groups
        .iter()
        .filter(|(id, _)| !live.contains(*id))
        .map(|(id, rules)| OrphanedRules {
            container_id: id.to_owned(),
            rules: rules.to_vec(),
        })
        .collect()
}

/// 한 번의 조정 패스 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// 검증을 통과한 관리 규칙 수
    pub rules_seen: usize,
    /// 조회한 컨테이너 ID 수
    pub containers_checked: usize,
    /// 고아로 판정된 컨테이너 ID 수
    pub orphaned_containers: usize,
    /// 삭제에 성공한 규칙 수
    pub rules_deleted: usize,
    /// 삭제에 실패한 규칙 수
    pub delete_failures: usize,
}

/// 조정 엔진 -- 고아 규칙을 찾아 삭제합니다.
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use ufwguard_reconciler::{BollardDockerClient, ReconciliationEngine, UfwFirewall};
///
/// let engine = ReconciliationEngine::new(Arc::new(firewall), Arc::new(docker));
/// let summary = engine.cleanup().await;
/// ```
pub struct ReconciliationEngine<F: Firewall, D: DockerClient, R: Reporter = TracingReporter> {
    firewall: Arc<F>,
    docker: Arc<D>,
    reporter: R,
}

impl<F: Firewall, D: DockerClient> ReconciliationEngine<F, D> {
    /// `TracingReporter`를 사용하는 엔진을 생성합니다.
    pub fn new(firewall: Arc<F>, docker: Arc<D>) -> Self {
        Self::with_reporter(firewall, docker, TracingReporter)
    }
}

impl<F: Firewall, D: DockerClient, R: Reporter> ReconciliationEngine<F, D, R> {
    /// 지정한 Reporter를 사용하는 엔진을 생성합니다.
    pub fn with_reporter(firewall: Arc<F>, docker: Arc<D>, reporter: R) -> Self {
        Self {
            firewall,
            docker,
            reporter,
        }
    }

    /// 엔진의 Reporter
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// 조정 패스 한 번을 실행합니다.
    ///
    /// 실패는 모두 보고만 하고 작업량을 줄이는 방향으로 진행합니다.
    /// 규칙 목록을 얻지 못하면 Docker 조회도 삭제도 하지 않습니다.
    pub async fn cleanup(&self) -> CleanupSummary {
        counter!(names::CLEANUP_PASSES_TOTAL).increment(1);

        let groups = match self.firewall.list_rules().await {
            Ok(output) => group_rules(&output),
            Err(e) => {
                self.reporter.report(&ReconcileEvent::RuleListFailed {
                    reason: e.to_string(),
                });
                RuleGroups::new()
            }
        };

        let mut summary = CleanupSummary {
            rules_seen: groups.rule_count(),
            containers_checked: groups.len(),
            ..CleanupSummary::default()
        };

        let mut live = HashSet::with_capacity(groups.len());
        let mut reasons = HashMap::new();
        for container_id in groups.container_ids() {
            match self.docker.inspect_container(container_id).await {
                Ok(detail) if detail.running => {
                    live.insert(container_id.to_owned());
                }
                Ok(_) => {
                    reasons.insert(container_id.to_owned(), "not running".to_owned());
                }
                Err(e) => {
                    reasons.insert(container_id.to_owned(), e.to_string());
                }
            }
        }

        for orphan in reconcile(&groups, &live) {
            summary.orphaned_containers += 1;
            self.reporter.report(&ReconcileEvent::ContainerOrphaned {
                container_id: orphan.container_id.clone(),
                rule_count: orphan.rules.len(),
                reason: reasons
                    .remove(&orphan.container_id)
                    .unwrap_or_else(|| "not running".to_owned()),
            });

            for rule in &orphan.rules {
                match self.firewall.delete_rule(rule).await {
                    Ok(_) => {
                        summary.rules_deleted += 1;
                        self.reporter.report(&ReconcileEvent::RuleDeleted {
                            container_id: orphan.container_id.clone(),
                            rule: rule.raw().to_owned(),
                        });
                    }
                    Err(e) => {
                        summary.delete_failures += 1;
                        self.reporter.report(&ReconcileEvent::RuleDeleteFailed {
                            container_id: orphan.container_id.clone(),
                            rule: rule.raw().to_owned(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            rules_seen = summary.rules_seen,
            containers_checked = summary.containers_checked,
            orphaned_containers = summary.orphaned_containers,
            rules_deleted = summary.rules_deleted,
            delete_failures = summary.delete_failures,
            "cleanup pass completed"
        );
        summary
    }
}
