//! 경로 집약 -- 구체 경로 집합을 최소한의 경로/디렉토리 패턴으로 일반화합니다.
//!
//! # 처리 단계
//! 1. 토큰화 및 정렬: `/세그먼트` 단위로 나누고 사전순으로 정렬
//! 2. 삽입: 와일드카드 자식을 먼저, 그 다음 정확히 같은 자식을 찾아 내려감
//! 3. 집약: 후위 순회로 자식 수가 임계값을 넘는 노드를 디렉토리로 접음
//! 4. 생성: 모든 리프에서 [`SysPath`] 생성
//! 5. 중복 제거: 디렉토리 항목에 포함되는 파일 항목 제거
//!
//! 모든 단계는 호출마다 새로 만드는 트리 위에서 동기적으로 수행되며 실패하지 않습니다.
//!
//! # 사용 예시
//! ```
//! use polgen_engine::aggregate::{PathAggregator, SysPath};
//!
//! let aggregator = PathAggregator::new(3);
//! let out = aggregator.aggregate([
//!     "/etc/conf.d/app1",
//!     "/etc/conf.d/app2",
//!     "/etc/conf.d/app3",
//!     "/etc/conf.d/app4",
//! ]);
//! assert_eq!(out, vec![SysPath::directory("/etc/conf.d")]);
//! ```

pub mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

use polgen_core::config::DEFAULT_AGGREGATION_THRESHOLD;
use polgen_core::metrics as m;

pub use tree::{Node, NodeId, PathTree, Segment};

/// 집약 결과 경로
///
/// 디렉토리는 항상 `/`로 끝납니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SysPath {
    /// 경로 (디렉토리는 `/`로 끝남)
    pub path: String,
    /// 디렉토리 여부
    pub is_directory: bool,
}

impl SysPath {
    /// 파일 항목을 생성합니다.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }

    /// 디렉토리 항목을 생성합니다. 끝에 `/`가 없으면 붙입니다.
    pub fn directory(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            is_directory: true,
        }
    }

    /// 경로를 세그먼트 열로 변환합니다.
    pub fn segments(&self) -> Vec<Segment> {
        tokenize(&self.path).0
    }

    /// 이 디렉토리 항목이 다른 항목을 포함하는지 확인합니다.
    ///
    /// 세그먼트 단위 접두사 비교이며 와일드카드를 고려합니다.
    /// 자기 자신이나 파일 항목은 아무것도 포함하지 않습니다.
    pub fn covers(&self, other: &SysPath) -> bool {
        if !self.is_directory {
            return false;
        }
        let prefix = self.segments();
        let target = other.segments();
        if prefix.is_empty() || target.len() <= prefix.len() {
            return false;
        }
        prefix
            .iter()
            .zip(&target)
            .all(|(dir, seg)| dir == seg || dir.accepts(seg))
    }
}

impl fmt::Display for SysPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// 경로 문자열을 세그먼트 열로 나눕니다.
///
/// 빈 세그먼트는 건너뛰며, `/`로 끝나면 디렉토리 입력으로 간주합니다.
pub fn tokenize(path: &str) -> (Vec<Segment>, bool) {
    let is_directory = path.len() > 1 && path.ends_with('/');
    let segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(Segment::parse)
        .collect();
    (segments, is_directory)
}

/// 디렉토리 항목에 포함되는 파일 항목을 제거합니다.
///
/// 입력 순서를 유지합니다.
pub fn dedup(paths: Vec<SysPath>) -> Vec<SysPath> {
    let directories: Vec<SysPath> = paths.iter().filter(|p| p.is_directory).cloned().collect();
    if directories.is_empty() {
        return paths;
    }
    paths
        .into_iter()
        .filter(|p| p.is_directory || !directories.iter().any(|d| d.covers(p)))
        .collect()
}

/// 경로 집약기
#[derive(Debug, Clone, Copy)]
pub struct PathAggregator {
    threshold: usize,
}

impl Default for PathAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_AGGREGATION_THRESHOLD)
    }
}

impl PathAggregator {
    /// 형제 노드 임계값으로 생성합니다.
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// 임계값
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// 경로 집합을 트리로 만듭니다 (집약 전).
    pub fn build_tree<I, S>(&self, paths: I) -> PathTree
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = PathTree::new(self.threshold);
        insert_sorted(&mut tree, paths);
        tree
    }

    /// 경로 집합을 최소 패턴 집합으로 집약합니다.
    ///
    /// 결과는 경로순으로 정렬됩니다.
    pub fn aggregate<I, S>(&self, paths: I) -> Vec<SysPath>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = PathTree::new(self.threshold);
        let inserted = insert_sorted(&mut tree, paths);
        self.finish(tree, inserted)
    }

    /// 기존 항목에 새 경로를 병합하여 집약합니다.
    ///
    /// 기존 항목을 먼저 삽입하며, 디렉토리 항목은 디렉토리로 고정됩니다.
    /// 그 다음 새 경로를 삽입하고 집약합니다.
    pub fn merge<I, S>(&self, existing: &[SysPath], new_paths: I) -> Vec<SysPath>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = PathTree::new(self.threshold);

        let mut known: Vec<&SysPath> = existing.iter().collect();
        known.sort();
        for entry in &known {
            let (segments, _) = tokenize(&entry.path);
            tree.insert(&segments, entry.is_directory);
        }

        let inserted = known.len() + insert_sorted(&mut tree, new_paths);
        self.finish(tree, inserted)
    }

    fn finish(&self, mut tree: PathTree, inserted: usize) -> Vec<SysPath> {
        tree.aggregate();
        let result = dedup(tree.generate());

        metrics::counter!(m::AGGREGATE_INPUT_PATHS_TOTAL).increment(inserted as u64);
        metrics::counter!(m::AGGREGATE_OUTPUT_PATHS_TOTAL).increment(result.len() as u64);
        tracing::trace!(
            input = inserted,
            output = result.len(),
            threshold = self.threshold,
            "aggregated paths"
        );

        result
    }
}

fn insert_sorted<I, S>(tree: &mut PathTree, paths: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = paths.into_iter().map(|p| p.as_ref().to_owned()).collect();
    sorted.sort();
    for path in &sorted {
        let (segments, is_directory) = tokenize(path);
        tree.insert(&segments, is_directory);
    }
    sorted.len()
}
