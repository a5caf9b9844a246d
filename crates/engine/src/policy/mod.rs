//! 정책 문서 -- 생성 정책의 타입과 조립
//!
//! 정책 하나는 (이미지, 매칭된 규칙) 쌍 하나에 대응하며
//! YAML 문서 하나로 직렬화됩니다. 서로 다른 규칙의 정책은 합치지 않습니다.

pub mod assembler;
pub mod selection;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use polgen_core::types::Action;

use crate::catalog::types::{FileRule, NetworkRule};
use crate::error::EngineError;

pub use assembler::PolicyAssembler;
pub use selection::{AggregatedPaths, collect_aggregated};

/// 이름에서 `-`로 치환하는 문자
const NAME_REPLACED_CHARS: [char; 5] = ['/', ':', '\\', '.', '@'];

/// 생성된 보안 정책
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// API 버전
    pub api_version: String,
    /// 리소스 종류
    pub kind: String,
    /// 메타데이터
    pub metadata: PolicyMetadata,
    /// 정책 본문
    pub spec: PolicySpec,
}

impl Policy {
    /// 정책 이름
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// YAML 문서로 직렬화합니다.
    pub fn to_yaml(&self) -> Result<String, EngineError> {
        serde_yaml::to_string(self).map_err(|e| EngineError::Serialize(e.to_string()))
    }
}

/// 정책 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    /// 정책 이름
    pub name: String,
    /// 네임스페이스
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// 정책 본문
///
/// 비어있는 규칙 블록은 포함하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    /// 심각도 (1-10)
    pub severity: u8,
    /// 적용 대상
    pub selector: Selector,
    /// 정책 액션
    pub action: Action,
    /// 알림 메시지
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 태그
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
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

impl PolicySpec {
    /// 규칙 블록이 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.process.is_none() && self.network.is_none()
    }
}

/// 라벨 셀렉터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// 라벨 일치 조건
    pub match_labels: BTreeMap<String, String>,
}

/// 파일/정책 이름에 쓸 수 없는 문자를 `-`로 치환합니다.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if NAME_REPLACED_CHARS.contains(&c) { '-' } else { c })
        .collect()
}
