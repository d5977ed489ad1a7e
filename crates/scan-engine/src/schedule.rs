//! 증분/전체 스캔 스케줄링
//!
//! 빌드 번호와 잡 설정만으로 스캔 범위를 결정하는 순수 함수입니다.
//! 같은 입력에는 항상 같은 결과를 돌려주므로 I/O 없이 검증할 수 있습니다.

use scangate_core::config::{FULL_SCAN_CYCLE_MAX, FULL_SCAN_CYCLE_MIN};

use crate::types::ScanKind;

/// 스캔 범위를 결정합니다.
///
/// 규칙 (순서대로):
/// 1. 증분 스캔을 요청하지 않으면 전체 스캔
/// 2. 주기적 전체 스캔을 요청하지 않으면 항상 증분 스캔
/// 3. `cycle_length`가 1-99 범위를 벗어나면 항상 증분 스캔
/// 4. 그 외에는 `build_number % (cycle_length + 1) == 1`일 때 전체 스캔
///
/// # 예시
///
/// ```
/// use scangate_engine::schedule::decide;
/// use scangate_engine::types::ScanKind;
///
/// assert_eq!(decide(11, true, true, 9), ScanKind::Full);
/// assert_eq!(decide(12, true, true, 9), ScanKind::Incremental);
/// ```
pub fn decide(
    build_number: u64,
    incremental_requested: bool,
    periodic_full_requested: bool,
    cycle_length: i32,
) -> ScanKind {
    if !incremental_requested {
        return ScanKind::Full;
    }
    if !periodic_full_requested {
        return ScanKind::Incremental;
    }
    if !(FULL_SCAN_CYCLE_MIN..=FULL_SCAN_CYCLE_MAX).contains(&cycle_length) {
        return ScanKind::Incremental;
    }

    let period = u64::from(cycle_length.unsigned_abs()) + 1;
    if build_number % period == 1 {
        ScanKind::Full
    } else {
        ScanKind::Incremental
    }
}
