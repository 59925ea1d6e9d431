#![no_main]

use libfuzzer_sys::fuzz_target;
use ufwguard_reconciler::ManagedRule;

// 임의의 한 줄에 대해 파서가 패닉 없이 동작하고, 통과한 규칙은
// 셸 없이 재구성 가능한 형태를 유지해야 함
fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(rule) = ManagedRule::parse(line) {
        let id = rule.container_id();
        assert!(!id.is_empty());
        assert!(!id.contains(['\'', ':', ' ']));

        let args = rule.delete_args();
        assert_eq!(args[0], "route");
        assert_eq!(args[1], "delete");
        assert_eq!(args[2], rule.direction().as_str());
        assert!(args.last().is_some_and(|c| c.contains(id)));
    }
});
