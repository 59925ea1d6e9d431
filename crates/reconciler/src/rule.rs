//! ufw 규칙 파싱 -- `ufw show added` 출력 한 줄을 관리 규칙으로 분해
//!
//! 관리 규칙의 형식은 규칙 설치기와 공유하는 계약입니다:
//!
//! ```text
//! ufw route allow to 172.17.0.2 port 88 proto tcp comment 'dreamy_goldberg:b44309293890 Internet'
//!           ^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^ ^^^^^^^^^^^^ ^^^^^^^^
//!           direction          spec                         label           container_id tag
//! ```
//!
//! 형식에 맞지 않는 줄(헤더, 수동으로 추가한 규칙 등)은 관리 규칙이 아니며
//! 절대 그룹에 들어가거나 삭제되지 않습니다.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// 관리 규칙 문법. 코멘트는 `label:id` 뒤에 공백으로 구분된 태그가 선택적으로 붙습니다.
static MANAGED_RULE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^ufw route (?P<direction>allow|deny) (?P<spec>[^']*)'(?P<comment>(?P<label>[^':\s]+):(?P<id>[^':\s]+)(?: (?P<tag>[^']*))?)'$",
    )
    .ok()
});

/// 규칙 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 허용
    Allow,
    /// 차단
    Deny,
}

impl Direction {
    /// ufw 명령에서 쓰는 키워드를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 검증을 통과한 관리 규칙
///
/// 원본 줄(`raw`)을 그대로 보존합니다. ufw의 삭제는 식별자가 아니라
/// 전체 규칙 명세로 매칭되므로 삭제 인자는 항상 원본에서 만들어집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRule {
    raw: String,
    direction: Direction,
    spec: String,
    label: String,
    container_id: String,
    tag: Option<String>,
    comment: String,
}

impl ManagedRule {
    /// 한 줄을 파싱합니다. 관리 규칙 형식이 아니면 `None`을 반환합니다.
    ///
    /// 줄 끝의 `\r`과 공백은 무시합니다. 정규식 초기화에 실패한 경우에도
    /// `None`을 반환하여 어떤 규칙도 삭제 대상이 되지 않게 합니다.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        let re = MANAGED_RULE.as_ref()?;
        let caps = re.captures(line)?;

        let direction = match caps.name("direction")?.as_str() {
            "allow" => Direction::Allow,
            "deny" => Direction::Deny,
            _ => return None,
        };

        Some(Self {
            raw: line.to_owned(),
            direction,
            spec: caps.name("spec")?.as_str().trim().to_owned(),
            label: caps.name("label")?.as_str().to_owned(),
            container_id: caps.name("id")?.as_str().to_owned(),
            tag: caps
                .name("tag")
                .map(|t| t.as_str().to_owned())
                .filter(|t| !t.is_empty()),
            comment: caps.name("comment")?.as_str().to_owned(),
        })
    }

    /// 규칙 코멘트에 기록된 컨테이너 ID
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// 규칙 코멘트의 라벨 (보통 컨테이너 이름)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 규칙 코멘트의 선택적 태그 (예: `LAN`, `GoogleDNS`)
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// 규칙 방향
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 방향과 코멘트 사이의 규칙 명세 (`comment` 키워드 포함)
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// `ufw show added`가 출력한 원본 줄
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 코멘트 본문 (`label:id[ tag]`, 따옴표 제외, 출력 그대로)
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// 이 규칙을 삭제하는 ufw 인자 목록을 만듭니다.
    ///
    /// 선행 `ufw route` 를 `route delete` 로 바꾸고 나머지 명세는 그대로 유지합니다.
    /// 셸을 거치지 않으므로 코멘트는 따옴표 없이 하나의 인자로 전달됩니다.
    pub fn delete_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(4 + self.spec.split_whitespace().count());
        args.push("route".to_owned());
        args.push("delete".to_owned());
        args.push(self.direction.as_str().to_owned());
        args.extend(self.spec.split_whitespace().map(str::to_owned));
        args.push(self.comment.clone());
        args
    }
}

impl fmt::Display for ManagedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 주어진 줄이 관리 규칙인지 확인합니다.
pub fn is_managed_rule(line: &str) -> bool {
    ManagedRule::parse(line).is_some()
}
