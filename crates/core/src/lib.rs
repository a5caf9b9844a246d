//! polgen 공통 크레이트
//!
//! 컨테이너 이미지 정책 추천 엔진이 공유하는 에러, 설정, 도메인 타입,
//! 로깅 초기화, 메트릭 이름을 제공합니다.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{CatalogError, ConfigError, PolgenError, RecommendError};

// 설정
pub use config::{CatalogConfig, GeneralConfig, PolgenConfig, RecommendConfig};

// 로깅
pub use logging::init_tracing;

// 도메인 타입
pub use types::{Action, ImageInfo, ImageScan};
