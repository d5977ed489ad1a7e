//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진의 각 단계는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다. 레코더가 설치되지 않으면
//! 모든 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scangate_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(scangate_core::metrics::SCANS_SUBMITTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (low, medium, high)
pub const LABEL_SEVERITY: &str = "severity";

/// 분석 트랙 레이블 키 (sast, osa)
pub const LABEL_TRACK: &str = "track";

/// 빌드 결과 레이블 키 (success, unstable, failure)
pub const LABEL_OUTCOME: &str = "outcome";

/// 스캔 종류 레이블 키 (full, incremental)
pub const LABEL_SCAN_KIND: &str = "kind";

// ─── 실행 메트릭 ────────────────────────────────────────────────────

/// 완료된 실행 수 (counter, label: outcome)
pub const RUNS_COMPLETED_TOTAL: &str = "scangate_runs_completed_total";

/// 제출된 스캔 수 (counter, label: kind)
pub const SCANS_SUBMITTED_TOTAL: &str = "scangate_scans_submitted_total";

/// 중복 스캔 방지로 건너뛴 실행 수 (counter)
pub const SCANS_SKIPPED_DUPLICATE_TOTAL: &str = "scangate_scans_skipped_duplicate_total";

/// 대기 타임아웃으로 끝난 스캔 수 (counter)
pub const SCANS_TIMED_OUT_TOTAL: &str = "scangate_scans_timed_out_total";

/// 취소된 실행 수 (counter)
pub const RUNS_CANCELLED_TOTAL: &str = "scangate_runs_cancelled_total";

/// 실행 전체 소요 시간 (histogram, 초)
pub const RUN_DURATION_SECONDS: &str = "scangate_run_duration_seconds";

/// 임시 아카이브 삭제 실패 수 (counter)
pub const ARCHIVE_CLEANUP_FAILURES_TOTAL: &str = "scangate_archive_cleanup_failures_total";

/// 상태 폴링 횟수 (counter)
pub const STATUS_POLLS_TOTAL: &str = "scangate_status_polls_total";

/// 스캔 대기 소요 시간 (histogram, 초)
pub const SCAN_WAIT_DURATION_SECONDS: &str = "scangate_scan_wait_duration_seconds";

// ─── 보고서 / 임계값 메트릭 ────────────────────────────────────────

/// 보고서 파싱 소요 시간 (histogram, 초)
pub const REPORT_PARSE_DURATION_SECONDS: &str = "scangate_report_parse_duration_seconds";

/// 파싱된 보고서 수 (counter)
pub const REPORTS_PARSED_TOTAL: &str = "scangate_reports_parsed_total";

/// 보고서 파싱 실패 수 (counter)
pub const REPORT_PARSE_FAILURES_TOTAL: &str = "scangate_report_parse_failures_total";

/// 최신 실행의 심각도별 결과 수 (gauge, labels: track, severity)
pub const FINDINGS: &str = "scangate_findings";

/// 임계값 위반 수 (counter, labels: track, severity)
pub const THRESHOLD_VIOLATIONS_TOTAL: &str = "scangate_threshold_violations_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스캔 대기 시간 히스토그램 버킷 (초)
///
/// 10s ~ 4h 범위 (원격 스캔은 수 분에서 수 시간)
pub const SCAN_WAIT_BUCKETS: [f64; 8] = [
    10.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 14400.0,
];

/// 보고서 파싱 시간 히스토그램 버킷 (초)
pub const REPORT_PARSE_BUCKETS: [f64; 7] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 호스트가 전역 레코더를 설치한 뒤 호출해야 합니다. 엔진의 컨트롤러 빌더가
/// 프로세스당 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        RUNS_COMPLETED_TOTAL,
        "Total number of scan runs completed, by build outcome"
    );
    describe_counter!(
        SCANS_SUBMITTED_TOTAL,
        "Total number of scans submitted to the remote service"
    );
    describe_counter!(
        SCANS_SKIPPED_DUPLICATE_TOTAL,
        "Runs skipped because the project already had a queued scan"
    );
    describe_counter!(
        SCANS_TIMED_OUT_TOTAL,
        "Scans that did not finish within the configured wait timeout"
    );
    describe_counter!(RUNS_CANCELLED_TOTAL, "Runs stopped by an external cancellation");
    describe_histogram!(RUN_DURATION_SECONDS, "Wall time of a complete scan run");
    describe_counter!(
        ARCHIVE_CLEANUP_FAILURES_TOTAL,
        "Temporary source archives that could not be deleted"
    );
    describe_counter!(STATUS_POLLS_TOTAL, "Total number of scan status polls");
    describe_histogram!(
        SCAN_WAIT_DURATION_SECONDS,
        "Time spent waiting for a remote scan to finish"
    );
    describe_histogram!(
        REPORT_PARSE_DURATION_SECONDS,
        "Time spent parsing a scan report"
    );
    describe_counter!(REPORTS_PARSED_TOTAL, "Scan reports parsed successfully");
    describe_counter!(
        REPORT_PARSE_FAILURES_TOTAL,
        "Scan reports that failed to parse and were marked invalid"
    );
    describe_gauge!(FINDINGS, "Findings of the latest run by track and severity");
    describe_counter!(
        THRESHOLD_VIOLATIONS_TOTAL,
        "Severity thresholds crossed, by track and severity"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_use_prefix() {
        for name in [
            RUNS_COMPLETED_TOTAL,
            SCANS_SUBMITTED_TOTAL,
            SCANS_SKIPPED_DUPLICATE_TOTAL,
            SCANS_TIMED_OUT_TOTAL,
            RUNS_CANCELLED_TOTAL,
            RUN_DURATION_SECONDS,
            ARCHIVE_CLEANUP_FAILURES_TOTAL,
            STATUS_POLLS_TOTAL,
            REPORTS_PARSED_TOTAL,
            REPORT_PARSE_FAILURES_TOTAL,
            SCAN_WAIT_DURATION_SECONDS,
            REPORT_PARSE_DURATION_SECONDS,
            FINDINGS,
            THRESHOLD_VIOLATIONS_TOTAL,
        ] {
            assert!(name.starts_with("scangate_"), "{name}");
        }
    }

    #[test]
    fn buckets_are_sorted() {
        assert!(SCAN_WAIT_BUCKETS.windows(2).all(|w| w[0] < w[1]));
        assert!(REPORT_PARSE_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
