#![no_main]

use libfuzzer_sys::fuzz_target;
use polgen_engine::aggregate::PathAggregator;

/// 이미지 파일 목록에 나올 수 있는 형태의 절대 경로만 남깁니다.
fn is_plain_path(path: &str) -> bool {
    path.starts_with('/')
        && path[1..].split('/').all(|seg| {
            !seg.is_empty()
                && seg != "."
                && seg != ".."
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
}

fuzz_target!(|input: (u8, Vec<String>)| {
    let (threshold, paths) = input;
    let aggregator = PathAggregator::new(usize::from(threshold % 8) + 1);
    let paths: Vec<String> = paths.into_iter().filter(|p| is_plain_path(p)).collect();

    let first = aggregator.aggregate(&paths);
    for entry in &first {
        assert_eq!(entry.is_directory, entry.path.ends_with('/'));
    }

    // 집약 결과를 다시 집약해도 같은 결과여야 합니다.
    let second = aggregator.aggregate(first.iter().map(|p| p.path.as_str()));
    assert_eq!(first, second);
});
