//! 엔진 에러 타입
//!
//! [`EngineError`]는 카탈로그 로딩, 정책 조립, 정책 쓰기 등 엔진 내부에서
//! 발생하는 모든 에러를 표현합니다.
//! `From<EngineError> for PolgenError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use polgen_core::error::{CatalogError, ConfigError, PolgenError, RecommendError};

/// 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 카탈로그 파일/문서 로딩 실패
    #[error("catalog load error: {path}: {reason}")]
    CatalogLoad {
        /// 카탈로그 소스 (파일 경로 등)
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 이름
        rule: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 다른 작성자가 카탈로그 캐시를 잠그고 있음
    #[error("catalog cache busy: lock held at {0}")]
    CacheBusy(String),

    /// 규칙 블록이 하나도 남지 않은 정책
    #[error("policy for rule '{rule}' has no file, process or network rules")]
    EmptyPolicy {
        /// 규칙 이름
        rule: String,
    },

    /// 정책 직렬화 실패
    #[error("policy serialize error: {0}")]
    Serialize(String),

    /// 정책 파일 쓰기 실패
    #[error("policy write error: {path}: {reason}")]
    PolicyWrite {
        /// 출력 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 리포트 싱크 에러
    #[error("report error: {0}")]
    Report(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<EngineError> for PolgenError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CatalogLoad { path, reason } => {
                PolgenError::Catalog(CatalogError::LoadFailed(format!("{path}: {reason}")))
            }
            EngineError::RuleValidation { rule, reason } => {
                PolgenError::Catalog(CatalogError::InvalidRule { rule, reason })
            }
            EngineError::CacheBusy(path) => PolgenError::Catalog(CatalogError::CacheBusy(path)),
            EngineError::EmptyPolicy { rule } => PolgenError::Recommend(
                RecommendError::Assembly(format!("empty policy for rule '{rule}'")),
            ),
            EngineError::Serialize(msg) => {
                PolgenError::Recommend(RecommendError::Assembly(msg))
            }
            EngineError::PolicyWrite { path, reason } => {
                PolgenError::Recommend(RecommendError::PolicyWrite { path, reason })
            }
            EngineError::Report(msg) => PolgenError::Recommend(RecommendError::Report(msg)),
            EngineError::Config { field, reason } => {
                PolgenError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
