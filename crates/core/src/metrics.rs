//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 기록은 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `polgen_`
//! - 구성 요소명: `catalog_`, `recommend_`, `aggregate_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(polgen_core::metrics::RECOMMEND_POLICIES_WRITTEN_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 정책 액션 레이블 키 (allow, audit, block)
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Catalog 메트릭 ────────────────────────────────────────────────

/// Catalog: 로드된 규칙 수 (gauge)
pub const CATALOG_RULES_LOADED: &str = "polgen_catalog_rules_loaded";

/// Catalog: 캐시 갱신 횟수 (counter, label: result)
pub const CATALOG_CACHE_UPDATES_TOTAL: &str = "polgen_catalog_cache_updates_total";

// ─── Recommend 메트릭 ──────────────────────────────────────────────

/// Recommend: 완료된 추천 패스 수 (counter)
pub const RECOMMEND_PASSES_TOTAL: &str = "polgen_recommend_passes_total";

/// Recommend: 스캔 실패로 축소 모드로 실행된 패스 수 (counter)
pub const RECOMMEND_DEGRADED_SCANS_TOTAL: &str = "polgen_recommend_degraded_scans_total";

/// Recommend: 전제 조건을 만족한 규칙 수 (counter)
pub const RECOMMEND_RULES_MATCHED_TOTAL: &str = "polgen_recommend_rules_matched_total";

/// Recommend: 기록된 정책 파일 수 (counter, label: action)
pub const RECOMMEND_POLICIES_WRITTEN_TOTAL: &str = "polgen_recommend_policies_written_total";

/// Recommend: 정책 파일 쓰기 실패 수 (counter)
pub const RECOMMEND_POLICY_FAILURES_TOTAL: &str = "polgen_recommend_policy_failures_total";

/// Recommend: 패스 소요 시간 (histogram, 초)
pub const RECOMMEND_PASS_DURATION_SECONDS: &str = "polgen_recommend_pass_duration_seconds";

// ─── Aggregate 메트릭 ──────────────────────────────────────────────

/// Aggregate: 집약 입력 경로 수 (counter)
pub const AGGREGATE_INPUT_PATHS_TOTAL: &str = "polgen_aggregate_input_paths_total";

/// Aggregate: 집약 결과 경로 수 (counter)
pub const AGGREGATE_OUTPUT_PATHS_TOTAL: &str = "polgen_aggregate_output_paths_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_gauge!(
        CATALOG_RULES_LOADED,
        "Number of rule templates in the loaded catalog"
    );
    describe_counter!(
        CATALOG_CACHE_UPDATES_TOTAL,
        "Catalog cache store attempts by result"
    );

    describe_counter!(
        RECOMMEND_PASSES_TOTAL,
        "Total number of completed recommendation passes"
    );
    describe_counter!(
        RECOMMEND_DEGRADED_SCANS_TOTAL,
        "Passes that ran without filesystem data after a scan failure"
    );
    describe_counter!(
        RECOMMEND_RULES_MATCHED_TOTAL,
        "Total number of rule templates whose preconditions were satisfied"
    );
    describe_counter!(
        RECOMMEND_POLICIES_WRITTEN_TOTAL,
        "Total number of policy documents written"
    );
    describe_counter!(
        RECOMMEND_POLICY_FAILURES_TOTAL,
        "Total number of policy documents that failed to assemble or write"
    );
    describe_histogram!(
        RECOMMEND_PASS_DURATION_SECONDS,
        "Time to complete one recommendation pass in seconds"
    );

    describe_counter!(
        AGGREGATE_INPUT_PATHS_TOTAL,
        "Total number of concrete paths fed into the aggregator"
    );
    describe_counter!(
        AGGREGATE_OUTPUT_PATHS_TOTAL,
        "Total number of path patterns produced by the aggregator"
    );
}
