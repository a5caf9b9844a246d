//! 정책 조립기 -- 규칙 템플릿, 이미지 메타데이터, 집약 경로를 정책 문서로 결합합니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polgen_core::types::ImageInfo;

use crate::aggregate::{PathAggregator, SysPath};
use crate::catalog::matcher::CompiledSpec;
use crate::catalog::types::{AggregateSelector, FileRule, MatchDirectory, MatchPath};
use crate::config::EngineConfig;
use crate::error::EngineError;

use super::selection::{AggregatedPaths, collect_aggregated};
use super::{Policy, PolicyMetadata, PolicySpec, Selector, sanitize_name};

/// 정책 조립기
///
/// 조립은 순수 변환이며 파일 I/O를 하지 않습니다.
#[derive(Debug, Clone)]
pub struct PolicyAssembler {
    api_version: String,
    kind: String,
    selector_label_key: String,
    aggregator: PathAggregator,
}

impl PolicyAssembler {
    /// 엔진 설정에서 조립기를 생성합니다.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_version: config.api_version.clone(),
            kind: config.kind.clone(),
            selector_label_key: config.selector_label_key.clone(),
            aggregator: PathAggregator::new(config.aggregation_threshold),
        }
    }

    /// 조립에 사용하는 경로 집약기
    pub fn aggregator(&self) -> &PathAggregator {
        &self.aggregator
    }

    /// 정책 이름: `<대표 태그>-<규칙 이름>`을 정리한 값
    pub fn policy_name(image: &ImageInfo, spec: &CompiledSpec) -> String {
        sanitize_name(&format!("{}-{}", image.canonical_tag(), spec.name()))
    }

    /// 정책 파일 경로: `<out_dir>/<정리된 태그>/<정리된 규칙 이름>.yaml`
    pub fn policy_path(out_dir: &Path, image: &ImageInfo, spec: &CompiledSpec) -> PathBuf {
        out_dir
            .join(sanitize_name(image.canonical_tag()))
            .join(format!("{}.yaml", sanitize_name(spec.name())))
    }

    /// 이미지 라벨이 있으면 그대로, 없으면 저장소 이름으로 셀렉터를 만듭니다.
    pub fn selector(&self, image: &ImageInfo) -> Selector {
        let match_labels = if image.labels.is_empty() {
            BTreeMap::from([(self.selector_label_key.clone(), image.repo_name().to_owned())])
        } else {
            image.labels.clone()
        };
        Selector { match_labels }
    }

    /// 집약 셀렉터를 평가한 뒤 정책을 조립합니다.
    pub fn assemble_for_image(
        &self,
        spec: &CompiledSpec,
        image: &ImageInfo,
    ) -> Result<Policy, EngineError> {
        let aggregated = collect_aggregated(spec, image, &self.aggregator);
        self.assemble(spec, image, &aggregated)
    }

    /// 정책을 조립합니다.
    ///
    /// # Errors
    /// 비어있지 않은 규칙 블록이 하나도 남지 않으면 [`EngineError::EmptyPolicy`].
    pub fn assemble(
        &self,
        spec: &CompiledSpec,
        image: &ImageInfo,
        aggregated: &AggregatedPaths,
    ) -> Result<Policy, EngineError> {
        let fragment = &spec.spec().spec;

        let file = fragment
            .file
            .as_ref()
            .and_then(|rule| finalize_stanza(rule, aggregated.file.as_deref()));
        let process = fragment
            .process
            .as_ref()
            .and_then(|rule| finalize_stanza(rule, aggregated.process.as_deref()));
        let network = fragment.network.clone().filter(|rule| !rule.is_empty());

        let policy_spec = PolicySpec {
            severity: fragment.severity,
            selector: self.selector(image),
            action: fragment.action,
            message: fragment.message.clone(),
            tags: fragment.tags.clone(),
            file,
            process,
            network,
        };

        if policy_spec.is_empty() {
            return Err(EngineError::EmptyPolicy {
                rule: spec.name().to_owned(),
            });
        }

        let namespace = Some(image.namespace.clone()).filter(|ns| !ns.is_empty());

        Ok(Policy {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            metadata: PolicyMetadata {
                name: Self::policy_name(image, spec),
                namespace,
            },
            spec: policy_spec,
        })
    }
}

/// 집약 결과를 블록에 더하고 빈 블록은 버립니다.
///
/// 리터럴 항목은 작성된 그대로 앞에 두고, 집약 항목은 셀렉터 속성으로 뒤에 붙입니다.
fn finalize_stanza(rule: &FileRule, aggregated: Option<&[SysPath]>) -> Option<FileRule> {
    let mut out = FileRule {
        match_paths: rule.match_paths.clone(),
        match_directories: rule.match_directories.clone(),
        match_patterns: rule.match_patterns.clone(),
        action: rule.action,
        aggregate: None,
    };

    if let (Some(selector), Some(paths)) = (rule.aggregate.as_ref(), aggregated) {
        for path in paths {
            if path.is_directory {
                let entry = to_match_directory(selector, path);
                if !out.match_directories.iter().any(|d| same_directory(&d.dir, &entry.dir)) {
                    out.match_directories.push(entry);
                }
            } else if !out.match_paths.iter().any(|m| m.path == path.path) {
                out.match_paths.push(to_match_path(selector, path));
            }
        }
    }

    out.has_entries().then_some(out)
}

fn same_directory(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

fn to_match_path(selector: &AggregateSelector, path: &SysPath) -> MatchPath {
    MatchPath {
        path: path.path.clone(),
        read_only: selector.read_only,
        owner_only: selector.owner_only,
        from_source: Vec::new(),
    }
}

fn to_match_directory(selector: &AggregateSelector, path: &SysPath) -> MatchDirectory {
    MatchDirectory {
        dir: path.path.clone(),
        recursive: selector.recursive,
        read_only: selector.read_only,
        owner_only: selector.owner_only,
        from_source: Vec::new(),
    }
}
