//! 규칙 카탈로그 데이터 타입
//!
//! YAML 카탈로그 문서에서 역직렬화되는 구조체들을 정의합니다.
//! 파일/프로세스/네트워크 규칙 블록 타입은 생성되는 정책에서도 그대로 사용됩니다.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use polgen_core::types::Action;

use crate::error::EngineError;

/// 규칙 이름 최대 길이
const MAX_RULE_NAME_LEN: usize = 256;

/// 심각도 허용 범위
pub const SEVERITY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// 카탈로그 문서 -- 캐시 파일 하나에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// version: 1.4.0
/// rules:
///   - name: pkg-mgr-execution
///     precondition:
///       - /usr/bin/apt
///     tags: [package-manager]
///     description:
///       refs:
///         - name: MITRE-TTP
///           url: [https://attack.mitre.org/techniques/T1072/]
///       tldr: Block package manager execution
///       detailed: Package managers should not run inside production containers.
///     spec:
///       severity: 5
///       action: Block
///       process:
///         matchPaths:
///           - path: /usr/bin/apt
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// 카탈로그 버전 (semver)
    pub version: String,
    /// 규칙 목록 (순서 유지)
    #[serde(default)]
    pub rules: Vec<MatchSpec>,
}

/// 규칙 템플릿 -- 전제 조건과 정책 조각의 쌍
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSpec {
    /// 규칙 고유 이름
    pub name: String,
    /// 이미지 파일 목록에 모두 매칭되어야 하는 경로 패턴
    #[serde(default)]
    pub precondition: Vec<String>,
    /// 필터링용 태그
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// 설명
    #[serde(default)]
    pub description: Description,
    /// 정책 조각
    pub spec: PolicyFragment,
}

impl MatchSpec {
    /// 필터링에 사용하는 유효 태그 (최상위 `tags` ∪ `spec.tags`)
    pub fn effective_tags(&self) -> impl Iterator<Item = &str> {
        self.tags.union(&self.spec.tags).map(String::as_str)
    }

    /// 정규식 컴파일을 제외한 구조적 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::RuleValidation {
                rule: "(empty)".to_owned(),
                reason: "rule name must not be empty".to_owned(),
            });
        }

        if self.name.len() > MAX_RULE_NAME_LEN {
            return Err(EngineError::RuleValidation {
                rule: self.name.clone(),
                reason: format!("rule name must not exceed {MAX_RULE_NAME_LEN} characters"),
            });
        }

        if !SEVERITY_RANGE.contains(&self.spec.severity) {
            return Err(EngineError::RuleValidation {
                rule: self.name.clone(),
                reason: format!(
                    "severity {} out of range {}-{}",
                    self.spec.severity,
                    SEVERITY_RANGE.start(),
                    SEVERITY_RANGE.end()
                ),
            });
        }

        if !self.spec.has_any_rule() {
            return Err(EngineError::RuleValidation {
                rule: self.name.clone(),
                reason: "spec must define at least one file, process or network rule".to_owned(),
            });
        }

        Ok(())
    }
}

/// 규칙 설명
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    /// 참고 자료
    pub refs: Vec<Reference>,
    /// 한 줄 요약
    pub tldr: String,
    /// 상세 설명
    pub detailed: String,
}

/// 참고 자료 링크
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    /// 자료 이름
    pub name: String,
    /// URL 목록
    #[serde(default)]
    pub url: Vec<String>,
}

/// 정책 조각 -- 생성 정책의 `spec`에 복사됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFragment {
    /// 심각도 (1-10)
    pub severity: u8,
    /// 기본 액션
    #[serde(default)]
    pub action: Action,
    /// 알림 메시지
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 정책 태그
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// 파일 접근 규칙
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRule>,
    /// 프로세스 실행 규칙
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<FileRule>,
    /// 네트워크 규칙
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkRule>,
}

impl PolicyFragment {
    /// 비어있지 않은 규칙 블록이 하나라도 있는지 확인합니다.
    pub fn has_any_rule(&self) -> bool {
        self.file.as_ref().is_some_and(|r| !r.is_empty())
            || self.process.as_ref().is_some_and(|r| !r.is_empty())
            || self.network.as_ref().is_some_and(|r| !r.is_empty())
    }
}

/// 파일/프로세스 규칙 블록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRule {
    /// 개별 경로
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_paths: Vec<MatchPath>,
    /// 디렉토리
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_directories: Vec<MatchDirectory>,
    /// 패턴
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_patterns: Vec<MatchPattern>,
    /// 블록 단위 액션 (없으면 정책 액션을 따름)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// 이미지 경로에서 집약한 결과로 채울 셀렉터
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateSelector>,
}

impl FileRule {
    /// 매치 항목도 집약 셀렉터도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        !self.has_entries() && self.aggregate.is_none()
    }

    /// 리터럴 매치 항목이 있는지 확인합니다.
    pub fn has_entries(&self) -> bool {
        !self.match_paths.is_empty()
            || !self.match_directories.is_empty()
            || !self.match_patterns.is_empty()
    }
}

/// 개별 경로 매치
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPath {
    /// 절대 경로
    pub path: String,
    /// 읽기 전용
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    /// 소유자만 허용
    #[serde(default, skip_serializing_if = "is_false")]
    pub owner_only: bool,
    /// 접근 주체 제한
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from_source: Vec<FromSource>,
}

/// 디렉토리 매치
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDirectory {
    /// 디렉토리 경로 (`/`로 끝남)
    pub dir: String,
    /// 하위 디렉토리 포함
    #[serde(default, skip_serializing_if = "is_false")]
    pub recursive: bool,
    /// 읽기 전용
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    /// 소유자만 허용
    #[serde(default, skip_serializing_if = "is_false")]
    pub owner_only: bool,
    /// 접근 주체 제한
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from_source: Vec<FromSource>,
}

/// 패턴 매치
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPattern {
    /// 경로 정규식
    pub pattern: String,
    /// 읽기 전용
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    /// 소유자만 허용
    #[serde(default, skip_serializing_if = "is_false")]
    pub owner_only: bool,
}

/// 접근 주체
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromSource {
    /// 실행 파일 경로
    pub path: String,
}

/// 집약 셀렉터
///
/// `include` 정규식에 매칭되는 이미지 경로를 집약하여 규칙 블록에 채웁니다.
/// `include`가 비어있으면 전제 조건에 매칭된 경로를 사용합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSelector {
    /// 대상 경로 정규식 (비시작 고정)
    #[serde(default)]
    pub include: Vec<String>,
    /// 생성 항목의 읽기 전용 플래그
    #[serde(default)]
    pub read_only: bool,
    /// 생성 항목의 소유자 전용 플래그
    #[serde(default)]
    pub owner_only: bool,
    /// 생성 디렉토리의 recursive 플래그
    #[serde(default)]
    pub recursive: bool,
}

/// 네트워크 규칙 블록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRule {
    /// 프로토콜 매치
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_protocols: Vec<MatchProtocol>,
    /// 블록 단위 액션
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl NetworkRule {
    /// 프로토콜 매치가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.match_protocols.is_empty()
    }
}

/// 프로토콜 매치
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchProtocol {
    /// 프로토콜 (tcp, udp, icmp, raw)
    pub protocol: String,
    /// 접근 주체 제한
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from_source: Vec<FromSource>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> MatchSpec {
        MatchSpec {
            name: "pkg-mgr-execution".to_owned(),
            precondition: vec!["/usr/bin/apt".to_owned()],
            tags: BTreeSet::from(["package-manager".to_owned()]),
            description: Description::default(),
            spec: PolicyFragment {
                severity: 5,
                action: Action::Block,
                message: None,
                tags: BTreeSet::from(["NIST".to_owned()]),
                file: None,
                process: Some(FileRule {
                    match_paths: vec![MatchPath {
                        path: "/usr/bin/apt".to_owned(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                network: None,
            },
        }
    }

    #[test]
    fn valid_spec_passes_validation() {
        sample_spec().validate().unwrap();
    }

    #[test]
    fn empty_name_fails_validation() {
        let mut spec = sample_spec();
        spec.name = "  ".to_owned();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn severity_out_of_range_fails_validation() {
        let mut spec = sample_spec();
        spec.spec.severity = 0;
        assert!(spec.validate().is_err());
        spec.spec.severity = 11;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn spec_without_rules_fails_validation() {
        let mut spec = sample_spec();
        spec.spec.process = Some(FileRule::default());
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn aggregate_selector_alone_counts_as_rule() {
        let mut spec = sample_spec();
        spec.spec.process = None;
        spec.spec.file = Some(FileRule {
            aggregate: Some(AggregateSelector::default()),
            ..Default::default()
        });
        spec.validate().unwrap();
    }

    #[test]
    fn effective_tags_is_union() {
        let spec = sample_spec();
        let tags: Vec<&str> = spec.effective_tags().collect();
        assert_eq!(tags, vec!["NIST", "package-manager"]);
    }

    #[test]
    fn deserialize_camel_case_stanza() {
        let yaml = r#"
matchDirectories:
  - dir: /etc/ssl/
    recursive: true
    fromSource:
      - path: /usr/bin/openssl
action: Allow
"#;
        let rule: FileRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.match_directories[0].dir, "/etc/ssl/");
        assert!(rule.match_directories[0].recursive);
        assert_eq!(rule.match_directories[0].from_source[0].path, "/usr/bin/openssl");
        assert_eq!(rule.action, Some(Action::Allow));
    }

    #[test]
    fn serialize_omits_false_flags() {
        let path = MatchPath {
            path: "/etc/passwd".to_owned(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&path).unwrap();
        assert!(yaml.contains("path: /etc/passwd"));
        assert!(!yaml.contains("readOnly"));
    }
}
