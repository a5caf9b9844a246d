//! 리포트 싱크 -- 추천 패스의 결과 기록
//!
//! [`Recommender`](crate::recommender::Recommender)는 생성 시점에 싱크 타입을 제네릭으로 고정합니다.
//! 싱크는 이미지마다 `begin_image` → `record`/`record_failure`* 순서로 호출되고,
//! 모든 이미지 처리가 끝나면 `finish`가 한 번 호출됩니다.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use polgen_core::types::{Action, ImageInfo};

use crate::catalog::types::MatchSpec;
use crate::error::EngineError;
use crate::policy::Policy;

/// 추천 결과를 받는 싱크
pub trait ReportSink {
    /// 새 이미지의 패스를 시작합니다.
    fn begin_image(&mut self, image: &ImageInfo) -> Result<(), EngineError>;

    /// 정책이 파일로 기록되었음을 알립니다.
    fn record(&mut self, spec: &MatchSpec, policy: &Policy, path: &Path)
    -> Result<(), EngineError>;

    /// (이미지, 규칙) 쌍의 처리 실패를 알립니다.
    fn record_failure(&mut self, spec: &MatchSpec, error: &EngineError)
    -> Result<(), EngineError>;

    /// 모든 이미지 처리가 끝났음을 알립니다.
    fn finish(&mut self) -> Result<(), EngineError>;
}

/// 전체 리포트
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// 이미지별 결과
    pub images: Vec<ImageReport>,
}

impl Report {
    /// 기록된 정책 수
    pub fn policy_count(&self) -> usize {
        self.images.iter().map(|i| i.policies.len()).sum()
    }

    /// 기록된 실패 수
    pub fn failure_count(&self) -> usize {
        self.images.iter().map(|i| i.failures.len()).sum()
    }
}

/// 이미지 한 개의 결과
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    /// 대표 태그
    pub image: String,
    /// 운영체제
    pub os: String,
    /// 아키텍처
    pub arch: String,
    /// 배포판
    pub distro: String,
    /// 생성된 정책
    pub policies: Vec<PolicyRecord>,
    /// 실패한 규칙
    pub failures: Vec<FailureRecord>,
}

/// 생성된 정책 기록
#[derive(Debug, Clone, Serialize)]
pub struct PolicyRecord {
    /// 규칙 이름
    pub rule: String,
    /// 정책 이름
    pub policy: String,
    /// 심각도
    pub severity: u8,
    /// 액션
    pub action: Action,
    /// 태그
    pub tags: Vec<String>,
    /// 한 줄 설명
    pub tldr: String,
    /// 참고 자료 이름
    pub refs: Vec<String>,
    /// 출력 파일 경로
    pub path: String,
}

/// 실패 기록
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    /// 규칙 이름
    pub rule: String,
    /// 에러 메시지
    pub error: String,
}

/// 메모리에 결과를 모으는 싱크
#[derive(Debug, Default)]
pub struct CollectingSink {
    report: Report,
    finished: bool,
}

impl CollectingSink {
    /// 빈 싱크를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 모은 리포트
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// `finish`가 호출되었는지 확인합니다.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 리포트를 꺼냅니다.
    pub fn into_report(self) -> Report {
        self.report
    }

    fn current(&mut self) -> Result<&mut ImageReport, EngineError> {
        self.report
            .images
            .last_mut()
            .ok_or_else(|| EngineError::Report("record called before begin_image".to_owned()))
    }
}

impl ReportSink for CollectingSink {
    fn begin_image(&mut self, image: &ImageInfo) -> Result<(), EngineError> {
        self.report.images.push(ImageReport {
            image: image.canonical_tag().to_owned(),
            os: image.os.clone(),
            arch: image.arch.clone(),
            distro: image.distro.clone(),
            policies: Vec::new(),
            failures: Vec::new(),
        });
        Ok(())
    }

    fn record(
        &mut self,
        spec: &MatchSpec,
        policy: &Policy,
        path: &Path,
    ) -> Result<(), EngineError> {
        let record = PolicyRecord {
            rule: spec.name.clone(),
            policy: policy.name().to_owned(),
            severity: policy.spec.severity,
            action: policy.spec.action,
            tags: spec.effective_tags().map(str::to_owned).collect(),
            tldr: spec.description.tldr.clone(),
            refs: spec.description.refs.iter().map(|r| r.name.clone()).collect(),
            path: path.display().to_string(),
        };
        self.current()?.policies.push(record);
        Ok(())
    }

    fn record_failure(&mut self, spec: &MatchSpec, error: &EngineError) -> Result<(), EngineError> {
        let record = FailureRecord {
            rule: spec.name.clone(),
            error: error.to_string(),
        };
        self.current()?.failures.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        self.finished = true;
        Ok(())
    }
}

/// `finish` 시점에 JSON 리포트를 writer에 쓰는 싱크
pub struct JsonReportSink<W: Write> {
    inner: CollectingSink,
    writer: W,
}

impl<W: Write> JsonReportSink<W> {
    /// writer로 싱크를 생성합니다.
    pub fn new(writer: W) -> Self {
        Self {
            inner: CollectingSink::new(),
            writer,
        }
    }

    /// 지금까지 모은 리포트
    pub fn report(&self) -> &Report {
        self.inner.report()
    }

    /// writer를 꺼냅니다.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonReportSink<W> {
    fn begin_image(&mut self, image: &ImageInfo) -> Result<(), EngineError> {
        self.inner.begin_image(image)
    }

    fn record(
        &mut self,
        spec: &MatchSpec,
        policy: &Policy,
        path: &Path,
    ) -> Result<(), EngineError> {
        self.inner.record(spec, policy, path)
    }

    fn record_failure(&mut self, spec: &MatchSpec, error: &EngineError) -> Result<(), EngineError> {
        self.inner.record_failure(spec, error)
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        serde_json::to_writer_pretty(&mut self.writer, self.inner.report())
            .map_err(|e| EngineError::Report(format!("failed to serialize report: {e}")))?;
        writeln!(self.writer)
            .and_then(|()| self.writer.flush())
            .map_err(|e| EngineError::Report(format!("failed to write report: {e}")))?;
        self.inner.finish()
    }
}
