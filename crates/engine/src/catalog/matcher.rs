//! 전제 조건 매칭 -- 태그 필터와 경로 정규식 평가
//!
//! [`CompiledSpec`]은 규칙 템플릿의 정규식을 로딩 시점에 한 번만 컴파일하여 보관합니다.
//! 매칭 시에는 재컴파일 없이 이미지 파일 목록에 대해 평가만 수행합니다.

use regex::Regex;

use polgen_core::types::ImageInfo;

use super::types::{FileRule, MatchSpec};
use crate::error::EngineError;

/// 전제 조건 검사를 무조건 통과시키는 표식
pub const OPTSCAN_SENTINEL: &str = "OPTSCAN";

/// 컴파일된 규칙 템플릿
///
/// 카탈로그 로딩 시 생성되며 이후 읽기 전용입니다.
#[derive(Debug, Clone)]
pub struct CompiledSpec {
    spec: MatchSpec,
    preconditions: Vec<Regex>,
    optscan: bool,
    file_include: Vec<Regex>,
    process_include: Vec<Regex>,
}

impl CompiledSpec {
    /// 규칙을 검증하고 정규식을 컴파일합니다.
    ///
    /// # Errors
    /// - 구조적 검증 실패
    /// - 전제 조건, `matchPatterns`, 집약 `include` 정규식 컴파일 실패
    pub fn compile(spec: MatchSpec) -> Result<Self, EngineError> {
        spec.validate()?;

        let mut preconditions = Vec::with_capacity(spec.precondition.len());
        let mut optscan = false;
        for (idx, raw) in spec.precondition.iter().enumerate() {
            if raw.contains(OPTSCAN_SENTINEL) {
                optscan = true;
                continue;
            }
            let pattern = precondition_pattern(raw);
            let regex = Regex::new(&pattern).map_err(|e| EngineError::RuleValidation {
                rule: spec.name.clone(),
                reason: format!("invalid regex in precondition[{idx}] '{raw}': {e}"),
            })?;
            preconditions.push(regex);
        }

        let file_include = compile_stanza(&spec.name, "file", spec.spec.file.as_ref())?;
        let process_include = compile_stanza(&spec.name, "process", spec.spec.process.as_ref())?;

        Ok(Self {
            spec,
            preconditions,
            optscan,
            file_include,
            process_include,
        })
    }

    /// 원본 규칙 템플릿
    pub fn spec(&self) -> &MatchSpec {
        &self.spec
    }

    /// 규칙 이름
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// `OPTSCAN` 표식이 있는 규칙인지 확인합니다.
    pub fn is_optscan(&self) -> bool {
        self.optscan
    }

    /// 파일 블록 집약 셀렉터의 `include` 정규식
    pub fn file_include(&self) -> &[Regex] {
        &self.file_include
    }

    /// 프로세스 블록 집약 셀렉터의 `include` 정규식
    pub fn process_include(&self) -> &[Regex] {
        &self.process_include
    }

    /// 규칙이 이미지에 적용되는지 판정합니다.
    ///
    /// 태그 필터와 전제 조건 필터를 모두 통과해야 합니다.
    pub fn matches(&self, image: &ImageInfo, requested_tags: &[String]) -> bool {
        self.matches_tags(requested_tags) && self.matches_preconditions(image)
    }

    /// 태그 필터 (OR 의미)
    ///
    /// 요청 태그가 비어있으면 항상 통과합니다.
    pub fn matches_tags(&self, requested_tags: &[String]) -> bool {
        if requested_tags.is_empty() {
            return true;
        }
        self.spec
            .effective_tags()
            .any(|tag| requested_tags.iter().any(|r| r == tag))
    }

    /// 전제 조건 필터 (AND 의미)
    ///
    /// 각 전제 조건은 이미지 파일 목록 중 최소 하나에 매칭되어야 합니다.
    /// 전제 조건이 비어있으면 통과합니다.
    pub fn matches_preconditions(&self, image: &ImageInfo) -> bool {
        if self.optscan {
            return true;
        }
        self.preconditions
            .iter()
            .all(|re| image.file_list.iter().any(|path| re.is_match(path)))
    }

    /// 전제 조건 중 하나라도 매칭된 이미지 파일 경로 (정렬됨)
    pub fn hits<'a>(&self, image: &'a ImageInfo) -> Vec<&'a str> {
        if self.preconditions.is_empty() {
            return Vec::new();
        }
        image
            .file_list
            .iter()
            .filter(|path| self.preconditions.iter().any(|re| re.is_match(path)))
            .map(String::as_str)
            .collect()
    }
}

/// 전제 조건 문자열을 정규식 패턴으로 변환합니다.
///
/// `*`로 끝나지 않으면 `$`를 붙여 접미사 매칭이 되도록 합니다.
pub fn precondition_pattern(raw: &str) -> String {
    if raw.ends_with('*') {
        raw.to_owned()
    } else {
        format!("{raw}$")
    }
}

fn compile_stanza(
    rule: &str,
    stanza: &str,
    file_rule: Option<&FileRule>,
) -> Result<Vec<Regex>, EngineError> {
    let Some(file_rule) = file_rule else {
        return Ok(Vec::new());
    };

    for (idx, pattern) in file_rule.match_patterns.iter().enumerate() {
        Regex::new(&pattern.pattern).map_err(|e| EngineError::RuleValidation {
            rule: rule.to_owned(),
            reason: format!("invalid regex in {stanza}.matchPatterns[{idx}]: {e}"),
        })?;
    }

    let Some(selector) = file_rule.aggregate.as_ref() else {
        return Ok(Vec::new());
    };

    selector
        .include
        .iter()
        .enumerate()
        .map(|(idx, pattern)| {
            Regex::new(pattern).map_err(|e| EngineError::RuleValidation {
                rule: rule.to_owned(),
                reason: format!("invalid regex in {stanza}.aggregate.include[{idx}]: {e}"),
            })
        })
        .collect()
}
