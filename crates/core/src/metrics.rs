//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 구성 요소는 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ufwguard_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(ufwguard_core::metrics::RULES_DELETED_TOTAL).increment(1);
//! ```

// ─── Cleanup 메트릭 ────────────────────────────────────────────────

/// Cleanup: 실행된 조정 패스 수 (counter)
pub const CLEANUP_PASSES_TOTAL: &str = "ufwguard_cleanup_passes_total";

/// Cleanup: 규칙 목록 조회 실패 수 (counter)
pub const RULE_LIST_FAILURES_TOTAL: &str = "ufwguard_rule_list_failures_total";

/// Cleanup: 고아로 판정된 컨테이너 수 (counter)
pub const ORPHANED_CONTAINERS_TOTAL: &str = "ufwguard_orphaned_containers_total";

/// Cleanup: 삭제된 규칙 수 (counter)
pub const RULES_DELETED_TOTAL: &str = "ufwguard_rules_deleted_total";

/// Cleanup: 규칙 삭제 실패 수 (counter)
pub const RULE_DELETE_FAILURES_TOTAL: &str = "ufwguard_rule_delete_failures_total";

// ─── Sync 메트릭 ───────────────────────────────────────────────────

/// Sync: 하위 채널로 전달된 컨테이너 수 (counter)
pub const CONTAINERS_SYNCED_TOTAL: &str = "ufwguard_containers_synced_total";

/// Sync: 컨테이너 목록 조회 실패 수 (counter)
pub const CONTAINER_LIST_FAILURES_TOTAL: &str = "ufwguard_container_list_failures_total";

/// Sync: inspect 실패로 건너뛴 컨테이너 수 (counter)
pub const SYNC_INSPECT_FAILURES_TOTAL: &str = "ufwguard_sync_inspect_failures_total";

/// 데몬이 내보내는 모든 counter 이름
pub const COUNTERS: &[&str] = &[
    CLEANUP_PASSES_TOTAL,
    RULE_LIST_FAILURES_TOTAL,
    ORPHANED_CONTAINERS_TOTAL,
    RULES_DELETED_TOTAL,
    RULE_DELETE_FAILURES_TOTAL,
    CONTAINERS_SYNCED_TOTAL,
    CONTAINER_LIST_FAILURES_TOTAL,
    SYNC_INSPECT_FAILURES_TOTAL,
];

/// 모든 counter를 0으로 등록합니다.
///
/// 첫 Cleanup 이전의 스크레이프에서도 시계열이 보이도록 recorder 설치 직후 호출합니다.
pub fn register_all() {
    for &name in COUNTERS {
        metrics::counter!(name).absolute(0);
    }
}

/// 모든 메트릭의 설명을 등록합니다.
///
/// 메트릭 recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        CLEANUP_PASSES_TOTAL,
        "Total number of reconciliation passes executed"
    );
    describe_counter!(
        RULE_LIST_FAILURES_TOTAL,
        "Reconciliation passes skipped because ufw rules could not be listed"
    );
    describe_counter!(
        ORPHANED_CONTAINERS_TOTAL,
        "Container IDs whose rules were found orphaned"
    );
    describe_counter!(RULES_DELETED_TOTAL, "Total number of ufw rules deleted");
    describe_counter!(
        RULE_DELETE_FAILURES_TOTAL,
        "Total number of failed ufw rule deletions"
    );
    describe_counter!(
        CONTAINERS_SYNCED_TOTAL,
        "Managed containers handed off to the rule installer"
    );
    describe_counter!(
        CONTAINER_LIST_FAILURES_TOTAL,
        "Sync passes where managed containers could not be listed"
    );
    describe_counter!(
        SYNC_INSPECT_FAILURES_TOTAL,
        "Managed containers skipped during sync because inspection failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in COUNTERS {
            assert!(name.starts_with("ufwguard_"), "{name}");
            assert!(name.ends_with("_total"), "{name}");
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
        register_all();
    }

    #[test]
    fn counter_names_are_unique() {
        let mut names = COUNTERS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COUNTERS.len());
        assert!(names.contains(&RULES_DELETED_TOTAL));
    }
}
