//! 추천기 -- 이미지 한 개에 대한 추천 패스 오케스트레이션
//!
//! 패스 순서: 스캔 결과 정리 → 규칙 필터링 → 경로 집약 → 정책 조립 → 파일 쓰기 → 리포트.
//! (이미지, 규칙) 쌍 하나의 실패는 기록만 하고 패스를 계속 진행합니다.
//!
//! # 사용 예시
//! ```ignore
//! use std::sync::Arc;
//! use polgen_engine::{CatalogLoader, CollectingSink, EngineConfig, Recommender};
//!
//! let catalog = Arc::new(CatalogLoader::load_file("rules.yaml", 10 * 1024 * 1024).await?);
//! let mut recommender = Recommender::new(catalog, EngineConfig::default(), CollectingSink::new())?;
//! let summary = recommender.recommend(scan).await?;
//! recommender.finish()?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use polgen_core::metrics as m;
use polgen_core::types::{ImageInfo, ImageScan};

use crate::catalog::RuleCatalog;
use crate::catalog::matcher::CompiledSpec;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::policy::{Policy, PolicyAssembler};
use crate::report::ReportSink;

/// 추천 패스 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// 대표 태그
    pub image: String,
    /// 스캔 실패로 경로 정보 없이 수행되었는지 여부
    pub degraded: bool,
    /// 전제 조건과 태그 필터를 통과한 규칙 수
    pub matched: usize,
    /// 기록된 정책 수
    pub written: usize,
    /// 빈 정책이라 건너뛴 수
    pub skipped: usize,
    /// 조립/쓰기에 실패한 수
    pub failed: usize,
}

/// 정책 추천기
///
/// 카탈로그는 `Arc`로 공유되며 읽기 전용입니다.
/// 리포트 싱크 타입은 생성 시 제네릭으로 고정됩니다.
pub struct Recommender<S: ReportSink> {
    catalog: Arc<RuleCatalog>,
    config: EngineConfig,
    assembler: PolicyAssembler,
    sink: S,
}

impl<S: ReportSink> Recommender<S> {
    /// 추천기를 생성합니다.
    ///
    /// # Errors
    /// 설정 검증 실패
    pub fn new(
        catalog: Arc<RuleCatalog>,
        config: EngineConfig,
        sink: S,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let assembler = PolicyAssembler::new(&config);
        Ok(Self {
            catalog,
            config,
            assembler,
            sink,
        })
    }

    /// 규칙 카탈로그
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 리포트 싱크
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// 리포트 싱크를 꺼냅니다.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// 이미지에 적용되는 규칙을 카탈로그 순서대로 반환합니다.
    pub fn select(&self, image: &ImageInfo) -> Vec<&CompiledSpec> {
        self.catalog
            .iter()
            .filter(|spec| spec.matches(image, &self.config.tags))
            .collect()
    }

    /// 이미지 한 개에 대해 추천 패스를 수행합니다.
    ///
    /// # Errors
    /// 리포트 싱크 에러만 전파합니다. 정책 조립/쓰기 실패는 요약과 싱크에 기록됩니다.
    pub async fn recommend(&mut self, scan: ImageScan) -> Result<PassSummary, EngineError> {
        let started = Instant::now();

        let (image, degraded) = match scan {
            ImageScan::Complete(info) => (info, false),
            ImageScan::Failed { image, reason } => {
                warn!(
                    image = %image,
                    reason = %reason,
                    "image scan failed, recommending without filesystem data"
                );
                metrics::counter!(m::RECOMMEND_DEGRADED_SCANS_TOTAL).increment(1);
                (ImageInfo::degraded(image), true)
            }
        };

        let mut summary = PassSummary {
            image: image.canonical_tag().to_owned(),
            degraded,
            ..PassSummary::default()
        };

        self.sink.begin_image(&image)?;

        let catalog = Arc::clone(&self.catalog);
        let mut cursor = 0;
        while let Some(spec) = catalog.next_rule(&mut cursor) {
            if !spec.matches(&image, &self.config.tags) {
                debug!(image = %summary.image, rule = spec.name(), "rule not applicable, skipping");
                continue;
            }
            summary.matched += 1;
            metrics::counter!(m::RECOMMEND_RULES_MATCHED_TOTAL).increment(1);

            let policy = match self.assembler.assemble_for_image(spec, &image) {
                Ok(policy) => policy,
                Err(EngineError::EmptyPolicy { rule }) if self.config.skip_empty_policies => {
                    debug!(image = %summary.image, rule = %rule, "policy has no rules, skipping");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    self.fail(spec, e, &mut summary)?;
                    continue;
                }
            };

            let path = PolicyAssembler::policy_path(&self.config.out_dir, &image, spec);
            match write_policy(&path, &policy).await {
                Ok(()) => {
                    debug!(
                        image = %summary.image,
                        rule = spec.name(),
                        path = %path.display(),
                        "policy written"
                    );
                    summary.written += 1;
                    metrics::counter!(
                        m::RECOMMEND_POLICIES_WRITTEN_TOTAL,
                        m::LABEL_ACTION => policy.spec.action.to_string()
                    )
                    .increment(1);
                    self.sink.record(spec.spec(), &policy, &path)?;
                }
                Err(e) => self.fail(spec, e, &mut summary)?,
            }
        }

        let elapsed = started.elapsed();
        metrics::counter!(m::RECOMMEND_PASSES_TOTAL).increment(1);
        metrics::histogram!(m::RECOMMEND_PASS_DURATION_SECONDS).record(elapsed.as_secs_f64());

        info!(
            image = %summary.image,
            degraded = summary.degraded,
            matched = summary.matched,
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "recommendation pass complete"
        );

        Ok(summary)
    }

    /// 여러 이미지를 순서대로 처리하고 싱크를 마무리합니다.
    pub async fn recommend_all<I>(&mut self, scans: I) -> Result<Vec<PassSummary>, EngineError>
    where
        I: IntoIterator<Item = ImageScan>,
    {
        let mut summaries = Vec::new();
        for scan in scans {
            summaries.push(self.recommend(scan).await?);
        }
        self.finish()?;
        Ok(summaries)
    }

    /// 리포트 싱크를 마무리합니다.
    pub fn finish(&mut self) -> Result<(), EngineError> {
        self.sink.finish()
    }

    fn fail(
        &mut self,
        spec: &CompiledSpec,
        error: EngineError,
        summary: &mut PassSummary,
    ) -> Result<(), EngineError> {
        warn!(
            image = %summary.image,
            rule = spec.name(),
            error = %error,
            "failed to produce policy"
        );
        summary.failed += 1;
        metrics::counter!(m::RECOMMEND_POLICY_FAILURES_TOTAL).increment(1);
        self.sink.record_failure(spec.spec(), &error)
    }
}

/// 정책을 YAML로 직렬화하여 파일에 씁니다. 상위 디렉토리가 없으면 만듭니다.
async fn write_policy(path: &Path, policy: &Policy) -> Result<(), EngineError> {
    let yaml = policy.to_yaml()?;
    let write_err = |e: std::io::Error| EngineError::PolicyWrite {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, yaml).await.map_err(write_err)
}
