//! 도메인 타입 -- 컨테이너 런타임에서 조회한 읽기 전용 정보
//!
//! 두 타입 모두 조회 시점의 스냅샷이며, 엔진은 패스 사이에 이를 보관하지 않습니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 관리 대상 컨테이너 목록의 한 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// 컨테이너 ID
    pub id: String,
    /// 컨테이너 이름 (선행 `/` 제거)
    pub name: String,
    /// 컨테이너 라벨
    pub labels: HashMap<String, String>,
}

/// 컨테이너 상세 정보 (inspect 결과)
///
/// 외부 규칙 설치기가 포트/라벨을 해석하는 데 필요한 정보를 담습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetail {
    /// 전체 컨테이너 ID
    pub id: String,
    /// 컨테이너 이름 (선행 `/` 제거)
    pub name: String,
    /// 이미지명
    pub image: String,
    /// 실행 여부 (`State.Running`)
    pub running: bool,
    /// 컨테이너 라벨
    pub labels: HashMap<String, String>,
    /// 네트워크 이름 -> IP 주소
    pub ip_addresses: HashMap<String, String>,
}

impl ContainerDetail {
    /// 12자리 단축 ID를 반환합니다. 규칙 코멘트에 기록되는 형식입니다.
    pub fn short_id(&self) -> &str {
        &self.id[..12.min(self.id.len())]
    }
}

impl fmt::Display for ContainerDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) image={} running={}",
            self.name,
            self.short_id(),
            self.image,
            self.running,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: &str) -> ContainerDetail {
        ContainerDetail {
            id: id.to_owned(),
            name: "dreamy_goldberg".to_owned(),
            image: "nginx:latest".to_owned(),
            running: true,
            labels: HashMap::from([("UFW_MANAGED".to_owned(), "TRUE".to_owned())]),
            ip_addresses: HashMap::from([("bridge".to_owned(), "172.17.0.2".to_owned())]),
        }
    }

    #[test]
    fn short_id_truncates_full_hash() {
        let d = detail("b44309293890aabbccddeeff00112233");
        assert_eq!(d.short_id(), "b44309293890");
    }

    #[test]
    fn short_id_keeps_short_ids() {
        let d = detail("abc");
        assert_eq!(d.short_id(), "abc");
    }

    #[test]
    fn display_contains_name_and_short_id() {
        let display = detail("b44309293890aabbccddeeff00112233").to_string();
        assert!(display.contains("dreamy_goldberg"));
        assert!(display.contains("(b44309293890)"));
        assert!(display.contains("running=true"));
    }
}
