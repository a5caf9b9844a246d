//! 집약 대상 경로 선택
//!
//! 집약 셀렉터가 있는 파일/프로세스 블록마다 이미지 경로를 골라
//! [`PathAggregator::aggregate`]로 집약합니다.
//!
//! 블록의 리터럴 항목은 트리에 넣지 않습니다. 리터럴 디렉토리 아래의 이미지 경로는
//! 집약 전에 제외하고, 리터럴 경로와 같은 집약 결과는 버립니다.

use regex::Regex;

use polgen_core::types::ImageInfo;

use crate::aggregate::{PathAggregator, SysPath};
use crate::catalog::matcher::CompiledSpec;
use crate::catalog::types::FileRule;

/// 블록별 집약 결과
///
/// 셀렉터가 없는 블록은 `None`입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedPaths {
    /// 파일 블록
    pub file: Option<Vec<SysPath>>,
    /// 프로세스 블록
    pub process: Option<Vec<SysPath>>,
}

impl AggregatedPaths {
    /// 집약이 필요한 블록이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.process.is_none()
    }
}

/// 규칙의 집약 셀렉터에 따라 이미지 경로를 집약합니다.
pub fn collect_aggregated(
    spec: &CompiledSpec,
    image: &ImageInfo,
    aggregator: &PathAggregator,
) -> AggregatedPaths {
    let fragment = &spec.spec().spec;
    AggregatedPaths {
        file: fragment
            .file
            .as_ref()
            .and_then(|rule| aggregate_stanza(rule, spec.file_include(), spec, image, aggregator)),
        process: fragment.process.as_ref().and_then(|rule| {
            aggregate_stanza(rule, spec.process_include(), spec, image, aggregator)
        }),
    }
}

fn aggregate_stanza(
    rule: &FileRule,
    include: &[Regex],
    spec: &CompiledSpec,
    image: &ImageInfo,
    aggregator: &PathAggregator,
) -> Option<Vec<SysPath>> {
    rule.aggregate.as_ref()?;

    let literal_dirs = literal_directories(rule);
    let inputs = select_paths(include, spec, image)
        .into_iter()
        .filter(|p| !literal_dirs.iter().any(|dir| p.starts_with(dir.as_str())));

    let aggregated = aggregator
        .aggregate(inputs)
        .into_iter()
        .filter(|p| p.is_directory || !rule.match_paths.iter().any(|m| m.path == p.path))
        .collect();
    Some(aggregated)
}

/// 집약 입력 경로를 고릅니다.
///
/// `include`가 비어있으면 전제 조건에 매칭된 경로를, 아니면 이미지의 파일/디렉토리
/// 경로 중 `include` 정규식 하나라도 매칭되는 경로를 사용합니다.
/// 디렉토리 경로는 `/`를 붙여 디렉토리 입력으로 표시합니다.
pub fn select_paths(include: &[Regex], spec: &CompiledSpec, image: &ImageInfo) -> Vec<String> {
    if include.is_empty() {
        return spec.hits(image).into_iter().map(str::to_owned).collect();
    }

    let matches = |path: &str| include.iter().any(|re| re.is_match(path));

    let files = image
        .file_list
        .iter()
        .filter(|p| matches(p.as_str()))
        .map(String::clone);
    let dirs = image.dir_list.iter().filter(|p| matches(p.as_str())).map(|p| {
        if p.ends_with('/') {
            p.clone()
        } else {
            format!("{p}/")
        }
    });
    files.chain(dirs).collect()
}

/// 블록의 리터럴 디렉토리 (끝에 `/`를 붙인 형태)
fn literal_directories(rule: &FileRule) -> Vec<String> {
    rule.match_directories
        .iter()
        .map(|d| SysPath::directory(d.dir.as_str()).path)
        .collect()
}
