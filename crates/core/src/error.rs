//! 에러 타입 -- 도메인별 에러 정의

/// polgen 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PolgenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 규칙 카탈로그 에러
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// 정책 추천 에러
    #[error("recommend error: {0}")]
    Recommend(#[from] RecommendError),

    /// 로깅 초기화 에러
    #[error("logging error: {0}")]
    Logging(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 규칙 카탈로그 에러
///
/// 카탈로그 로딩 실패는 치명적입니다. 매칭할 템플릿이 없으면 엔진이 동작할 수 없습니다.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// 카탈로그 문서 로딩/파싱 실패
    #[error("catalog load failed: {0}")]
    LoadFailed(String),

    /// 규칙 검증 실패
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    /// 다른 프로세스가 캐시를 갱신 중
    #[error("catalog cache busy: {0}")]
    CacheBusy(String),
}

/// 정책 추천 에러
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    /// 정책 조립 실패
    #[error("policy assembly failed: {0}")]
    Assembly(String),

    /// 정책 파일 쓰기 실패
    #[error("policy write failed: {path}: {reason}")]
    PolicyWrite { path: String, reason: String },

    /// 리포트 출력 실패
    #[error("report failed: {0}")]
    Report(String),
}
