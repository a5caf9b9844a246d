//! 규칙 카탈로그 -- 로딩, 검증, 전제 조건 매칭
//!
//! 카탈로그는 프로세스 시작 시 한 번 로드되며 이후 읽기 전용입니다.
//! 여러 추천 패스가 `Arc<RuleCatalog>`로 공유할 수 있습니다.
//!
//! # 모듈 구성
//! - [`types`]: YAML 문서 구조체
//! - [`matcher`]: 컴파일된 규칙과 전제 조건 평가
//! - [`loader`]: 문서 파싱 및 파일 로딩
//! - [`cache`]: 버전 비교 기반 캐시 갱신

pub mod cache;
pub mod loader;
pub mod matcher;
pub mod types;

use std::collections::{BTreeSet, HashSet};

use semver::Version;

use crate::error::EngineError;

pub use cache::{CacheUpdate, CatalogCache};
pub use loader::CatalogLoader;
pub use matcher::CompiledSpec;
pub use types::{CatalogDocument, MatchSpec};

/// 카탈로그 최대 규칙 수
const MAX_RULES_COUNT: usize = 10_000;

/// 검증 및 컴파일이 끝난 규칙 카탈로그
///
/// 규칙 순서는 문서 순서를 그대로 유지합니다.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    version: Version,
    rules: Vec<CompiledSpec>,
}

impl RuleCatalog {
    /// 문서를 검증하고 모든 규칙을 컴파일합니다.
    ///
    /// # Errors
    /// - 버전이 semver 형식이 아닌 경우
    /// - 규칙 수가 상한을 넘는 경우
    /// - 규칙 이름이 중복되거나 개별 규칙 검증에 실패한 경우
    pub fn from_document(document: CatalogDocument) -> Result<Self, EngineError> {
        let version = parse_version(&document.version)?;

        if document.rules.len() > MAX_RULES_COUNT {
            return Err(EngineError::CatalogLoad {
                path: "(document)".to_owned(),
                reason: format!(
                    "too many rules: {} (max: {MAX_RULES_COUNT})",
                    document.rules.len()
                ),
            });
        }

        let mut seen = HashSet::with_capacity(document.rules.len());
        let mut rules = Vec::with_capacity(document.rules.len());
        for spec in document.rules {
            if !seen.insert(spec.name.clone()) {
                return Err(EngineError::RuleValidation {
                    rule: spec.name,
                    reason: "duplicate rule name".to_owned(),
                });
            }
            rules.push(CompiledSpec::compile(spec)?);
        }

        Ok(Self { version, rules })
    }

    /// 카탈로그 버전
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// 규칙 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 커서 위치의 규칙을 반환하고 커서를 전진시킵니다.
    ///
    /// 끝에 도달하면 `None`을 반환하며 커서는 더 이상 움직이지 않습니다.
    pub fn next_rule(&self, cursor: &mut usize) -> Option<&CompiledSpec> {
        let rule = self.rules.get(*cursor)?;
        *cursor += 1;
        Some(rule)
    }

    /// 규칙 이름으로 조회합니다.
    pub fn get(&self, name: &str) -> Option<&CompiledSpec> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// 문서 순서대로 규칙을 순회합니다.
    pub fn iter(&self) -> std::slice::Iter<'_, CompiledSpec> {
        self.rules.iter()
    }

    /// 카탈로그에 등장하는 모든 유효 태그
    pub fn tags(&self) -> BTreeSet<&str> {
        self.rules
            .iter()
            .flat_map(|r| r.spec().effective_tags())
            .collect()
    }
}

impl<'a> IntoIterator for &'a RuleCatalog {
    type Item = &'a CompiledSpec;
    type IntoIter = std::slice::Iter<'a, CompiledSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// 카탈로그 버전 문자열을 파싱합니다. 앞의 `v`는 허용합니다.
pub fn parse_version(raw: &str) -> Result<Version, EngineError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|e| EngineError::CatalogLoad {
        path: "(document)".to_owned(),
        reason: format!("invalid catalog version '{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
version: v1.2.0
rules:
  - name: curl-exec
    precondition: [/usr/bin/curl]
    tags: [network]
    spec:
      severity: 3
      process:
        matchPaths:
          - path: /usr/bin/curl
  - name: shadow-read
    precondition: [/etc/shadow]
    tags: [filesystem]
    spec:
      severity: 7
      action: Block
      file:
        matchPaths:
          - path: /etc/shadow
            readOnly: true
"#;

    fn catalog() -> RuleCatalog {
        let doc = CatalogLoader::parse_yaml(DOC, "test").unwrap();
        RuleCatalog::from_document(doc).unwrap()
    }

    #[test]
    fn from_document_preserves_order() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        let names: Vec<&str> = catalog.iter().map(CompiledSpec::name).collect();
        assert_eq!(names, vec!["curl-exec", "shadow-read"]);
        assert_eq!(catalog.version(), &Version::new(1, 2, 0));
    }

    #[test]
    fn next_rule_walks_sequentially() {
        let catalog = catalog();
        let mut cursor = 0;
        assert_eq!(catalog.next_rule(&mut cursor).unwrap().name(), "curl-exec");
        assert_eq!(catalog.next_rule(&mut cursor).unwrap().name(), "shadow-read");
        assert!(catalog.next_rule(&mut cursor).is_none());
        assert!(catalog.next_rule(&mut cursor).is_none());
        assert_eq!(cursor, 2);
    }

    #[test]
    fn tags_collects_all_rules() {
        let catalog = catalog();
        let tags: Vec<&str> = catalog.tags().into_iter().collect();
        assert_eq!(tags, vec!["filesystem", "network"]);
    }

    #[test]
    fn get_by_name() {
        let catalog = catalog();
        assert!(catalog.get("shadow-read").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut doc = CatalogLoader::parse_yaml(DOC, "test").unwrap();
        let dup = doc.rules[0].clone();
        doc.rules.push(dup);
        let err = RuleCatalog::from_document(doc).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn invalid_version_rejected() {
        let mut doc = CatalogLoader::parse_yaml(DOC, "test").unwrap();
        doc.version = "latest".to_owned();
        assert!(RuleCatalog::from_document(doc).is_err());
    }

    #[test]
    fn parse_version_accepts_v_prefix() {
        assert_eq!(parse_version("v0.3.1").unwrap(), Version::new(0, 3, 1));
        assert_eq!(parse_version("0.3.1").unwrap(), Version::new(0, 3, 1));
        assert!(parse_version("0.3").is_err());
    }
}
