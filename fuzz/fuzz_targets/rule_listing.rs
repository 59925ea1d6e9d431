#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

use ufwguard_reconciler::{group_rules, reconcile};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// `ufw show added` 출력 전체
    listing: String,
    /// 실행 중으로 간주할 컨테이너 ID
    live: Vec<String>,
}

fuzz_target!(|input: FuzzInput| {
    let groups = group_rules(&input.listing);
    let live: HashSet<String> = input.live.into_iter().collect();

    let orphans = reconcile(&groups, &live);

    // 고아 그룹은 실행 중 ID를 포함하지 않고, 전체 그룹 수를 넘지 않음
    assert!(orphans.len() <= groups.len());
    for orphan in &orphans {
        assert!(!live.contains(&orphan.container_id));
        assert!(!orphan.rules.is_empty());
    }
});
