//! polgen 엔진 -- 컨테이너 이미지 보안 정책 추천
//!
//! 규칙 카탈로그를 이미지 파일시스템 내용과 매칭하고, 매칭을 일으킨 구체 경로를
//! 최소한의 경로/디렉토리 패턴으로 일반화하여 정책 문서를 생성합니다.
//!
//! # 아키텍처
//! ```text
//! RuleCatalog ──┐
//!               ├──> CompiledSpec::matches ──> PathAggregator ──> PolicyAssembler
//! ImageInfo ────┘         (태그/전제 조건)        (경로 트라이)          │
//!                                                                       v
//!                                          ReportSink <── Recommender (YAML 쓰기)
//! ```
//!
//! # 모듈 구성
//! - [`catalog`]: 카탈로그 문서 타입, 로더, 캐시, 전제 조건 매칭
//! - [`aggregate`]: 경로 트라이와 집약 알고리즘
//! - [`policy`]: 정책 문서 타입과 조립기
//! - [`report`]: 리포트 싱크
//! - [`recommender`]: 추천 패스 오케스트레이션
//! - [`config`]: 엔진 설정
//! - [`error`]: 엔진 에러 타입

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod policy;
pub mod recommender;
pub mod report;

// --- 주요 타입 re-export ---

pub use aggregate::{PathAggregator, SysPath};
pub use catalog::{CacheUpdate, CatalogCache, CatalogLoader, CompiledSpec, MatchSpec, RuleCatalog};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::EngineError;
pub use policy::{Policy, PolicyAssembler};
pub use recommender::{PassSummary, Recommender};
pub use report::{CollectingSink, JsonReportSink, Report, ReportSink};
