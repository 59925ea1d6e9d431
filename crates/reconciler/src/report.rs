//! 조정 이벤트 보고 -- 주입 가능한 관측 싱크
//!
//! Cleanup과 Sync는 로그를 직접 쓰지 않고 [`Reporter`]에 [`ReconcileEvent`]를 전달합니다.
//! 운영 환경은 [`TracingReporter`]로 `tracing` 로그와 `metrics` 카운터를 남기고,
//! 테스트는 [`RecordingReporter`]로 발생한 이벤트를 검증합니다.

use std::sync::Mutex;

use metrics::counter;
use tracing::{error, info, warn};

use ufwguard_core::metrics as names;

/// 조정 과정에서 발생하는 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// ufw 규칙 목록 조회 실패 -- 이번 패스는 아무것도 하지 않음
    RuleListFailed {
        /// 실패 사유
        reason: String,
    },
    /// 컨테이너가 없거나 실행 중이 아니어서 규칙이 고아로 판정됨
    ContainerOrphaned {
        /// 규칙 코멘트의 컨테이너 ID
        container_id: String,
        /// 삭제 대상 규칙 수
        rule_count: usize,
        /// 판정 사유 (`not running` 또는 조회 에러)
        reason: String,
    },
    /// 규칙 삭제 성공
    RuleDeleted {
        /// 규칙 코멘트의 컨테이너 ID
        container_id: String,
        /// 삭제된 원본 규칙
        rule: String,
    },
    /// 규칙 삭제 실패
    RuleDeleteFailed {
        /// 규칙 코멘트의 컨테이너 ID
        container_id: String,
        /// 삭제하려던 원본 규칙
        rule: String,
        /// 실패 사유
        reason: String,
    },
    /// 관리 컨테이너 목록 조회 실패
    ContainerListFailed {
        /// 실패 사유
        reason: String,
    },
    /// Sync 중 컨테이너 inspect 실패 -- 해당 컨테이너는 건너뜀
    InspectFailed {
        /// 컨테이너 ID
        container_id: String,
        /// 실패 사유
        reason: String,
    },
    /// 컨테이너가 하위 채널로 전달됨
    ContainerQueued {
        /// 컨테이너 ID
        container_id: String,
    },
}

/// 조정 이벤트 싱크
pub trait Reporter: Send + Sync + 'static {
    /// 이벤트 하나를 보고합니다.
    fn report(&self, event: &ReconcileEvent);
}

/// `tracing` 로그와 `metrics` 카운터로 이벤트를 기록하는 기본 Reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::RuleListFailed { reason } => {
                counter!(names::RULE_LIST_FAILURES_TOTAL).increment(1);
                error!(error = %reason, "failed to list ufw rules, skipping cleanup pass");
            }
            ReconcileEvent::ContainerOrphaned {
                container_id,
                rule_count,
                reason,
            } => {
                counter!(names::ORPHANED_CONTAINERS_TOTAL).increment(1);
                warn!(
                    container_id = %container_id,
                    rule_count = rule_count,
                    reason = %reason,
                    "container does not seem to be running, cleaning up ufw rules"
                );
            }
            ReconcileEvent::RuleDeleted { container_id, rule } => {
                counter!(names::RULES_DELETED_TOTAL).increment(1);
                info!(container_id = %container_id, rule = %rule, "deleted ufw rule");
            }
            ReconcileEvent::RuleDeleteFailed {
                container_id,
                rule,
                reason,
            } => {
                counter!(names::RULE_DELETE_FAILURES_TOTAL).increment(1);
                error!(
                    container_id = %container_id,
                    rule = %rule,
                    error = %reason,
                    "failed to delete ufw rule"
                );
            }
            ReconcileEvent::ContainerListFailed { reason } => {
                counter!(names::CONTAINER_LIST_FAILURES_TOTAL).increment(1);
                error!(error = %reason, "couldn't retrieve managed containers");
            }
            ReconcileEvent::InspectFailed {
                container_id,
                reason,
            } => {
                counter!(names::SYNC_INSPECT_FAILURES_TOTAL).increment(1);
                error!(
                    container_id = %container_id,
                    error = %reason,
                    "couldn't inspect managed container, skipping"
                );
            }
            ReconcileEvent::ContainerQueued { container_id } => {
                counter!(names::CONTAINERS_SYNCED_TOTAL).increment(1);
                info!(container_id = %container_id, "queued managed container for rule installation");
            }
        }
    }
}

/// 이벤트를 메모리에 기록하는 Reporter
///
/// 테스트와 진단용입니다.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingReporter {
    /// 빈 Reporter를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 기록된 이벤트의 복사본을 반환합니다.
    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// 조건을 만족하는 이벤트 수를 셉니다.
    pub fn count(&self, predicate: impl Fn(&ReconcileEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| predicate(e)).count())
            .unwrap_or(0)
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &ReconcileEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl<R: Reporter> Reporter for std::sync::Arc<R> {
    fn report(&self, event: &ReconcileEvent) {
        (**self).report(event);
    }
}
