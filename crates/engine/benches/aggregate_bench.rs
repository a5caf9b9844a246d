//! 경로 집약 / 전제 조건 매칭 벤치마크
//!
//! 입력 경로 수에 따른 집약 성능과 카탈로그 크기에 따른 매칭 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use polgen_core::types::ImageInfo;
use polgen_engine::aggregate::{PathAggregator, SysPath};
use polgen_engine::catalog::CatalogLoader;

/// 실제 이미지와 비슷한 분포의 경로를 생성합니다.
fn synthetic_paths(count: usize) -> Vec<String> {
    let roots = ["usr/bin", "usr/lib/x86_64-linux-gnu", "etc", "etc/ssl/certs", "proc", "var/lib/dpkg/info"];
    (0..count)
        .map(|i| {
            let root = roots[i % roots.len()];
            if root == "proc" {
                format!("/proc/{}/status", i)
            } else {
                format!("/{root}/file-{i}")
            }
        })
        .collect()
}

fn synthetic_catalog(rules: usize) -> String {
    let mut yaml = String::from("version: 1.0.0\nrules:\n");
    for i in 0..rules {
        yaml.push_str(&format!(
            "  - name: rule-{i}\n    precondition: [/usr/bin/file-{i}, /etc/file-{}]\n    tags: [bench]\n    spec:\n      severity: 3\n      file:\n        matchPaths:\n          - path: /usr/bin/file-{i}\n",
            i + 2
        ));
    }
    yaml
}

fn bench_aggregate(c: &mut Criterion) {
    let aggregator = PathAggregator::default();

    let mut group = c.benchmark_group("aggregate");
    for size in [100usize, 1_000, 10_000] {
        let paths = synthetic_paths(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("paths", size), &paths, |b, paths| {
            b.iter(|| aggregator.aggregate(black_box(paths)))
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let aggregator = PathAggregator::default();
    let existing: Vec<SysPath> = vec![
        SysPath::directory("/etc/ssl/"),
        SysPath::directory("/var/lib/dpkg/"),
        SysPath::file("/usr/bin/file-0"),
    ];
    let paths = synthetic_paths(1_000);

    c.bench_function("merge_1000", |b| {
        b.iter(|| aggregator.merge(black_box(&existing), black_box(&paths)))
    });
}

fn bench_precondition_match(c: &mut Criterion) {
    let image = ImageInfo {
        name: "bench:latest".to_owned(),
        file_list: synthetic_paths(5_000).into_iter().collect(),
        ..ImageInfo::default()
    };
    let tags = vec!["bench".to_owned()];

    let mut group = c.benchmark_group("precondition");
    for rules in [10usize, 100] {
        let catalog = CatalogLoader::load_str(&synthetic_catalog(rules), "bench").unwrap();
        group.throughput(Throughput::Elements(rules as u64));
        group.bench_with_input(BenchmarkId::new("rules", rules), &catalog, |b, catalog| {
            b.iter(|| {
                catalog
                    .iter()
                    .filter(|spec| spec.matches(black_box(&image), &tags))
                    .count()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_merge, bench_precondition_match);
criterion_main!(benches);
