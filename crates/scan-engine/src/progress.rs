//! 스캔 진행 추적
//!
//! 동기 모드에서 [`ScanProgressTracker`]가 고정 간격으로 원격 상태를 폴링합니다.
//! 폴링은 다음 중 하나로 끝납니다.
//!
//! - 원격 완료: 보고서 요청에 쓸 스캔 ID 반환
//! - 대기 타임아웃 (설정 시): [`TrackOutcome::TimedOut`] 반환, 보고서 단계 생략
//! - 취소 신호: 원격 스캔 취소를 요청한 뒤 [`EngineError::Cancelled`] 전파
//!
//! 폴링 중에는 추적기가 [`RunHandle`]을 소유합니다.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{Remote, ScanServiceClient};
use crate::error::EngineError;
use crate::types::{RunHandle, ScanStatus};

/// 최소 폴링 간격. 더 짧은 간격은 이 값으로 올립니다.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 폴링 종료 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// 원격 스캔 완료
    Completed {
        /// 스캔 ID
        scan_id: u64,
    },
    /// 대기 시간 초과 (결과 없음)
    TimedOut,
}

/// 스캔 진행 추적기
#[derive(Debug, Clone, Copy)]
pub struct ScanProgressTracker {
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl ScanProgressTracker {
    /// 추적기를 생성합니다. `timeout`이 `None`이면 완료나 취소까지 기다립니다.
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            timeout,
        }
    }

    /// 제출된 실행을 완료, 타임아웃, 취소 중 하나가 될 때까지 폴링합니다.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Cancelled`]: 취소 신호 수신 (원격 취소 요청 후)
    /// - [`EngineError::ScanFailed`]: 원격이 실패 또는 취소를 보고
    /// - 원격 호출 실패
    pub async fn track<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        run: RunHandle,
    ) -> Result<TrackOutcome, EngineError> {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = remote.cancel.cancelled() => return Err(cancel_run(remote, &run).await),
                _ = ticker.tick() => {}
            }

            if let Some(limit) = self.timeout {
                let elapsed = started.elapsed();
                if elapsed > limit {
                    warn!(
                        run_id = %run.run_id,
                        elapsed_secs = elapsed.as_secs(),
                        limit_secs = limit.as_secs(),
                        "scan wait timed out, no results will be retrieved"
                    );
                    metrics::counter!(scangate_core::metrics::SCANS_TIMED_OUT_TOTAL).increment(1);
                    return Ok(TrackOutcome::TimedOut);
                }
            }

            metrics::counter!(scangate_core::metrics::STATUS_POLLS_TOTAL).increment(1);
            let status = match remote
                .call("poll_status", remote.client.poll_status(remote.session, &run))
                .await
            {
                Ok(status) => status,
                Err(e) if e.is_cancelled() => return Err(cancel_run(remote, &run).await),
                Err(e) => return Err(e),
            };

            match status {
                ScanStatus::Queued => debug!(run_id = %run.run_id, "scan is queued"),
                ScanStatus::Running { stage, percent } => {
                    info!(run_id = %run.run_id, stage = %stage, percent, "scan in progress");
                }
                ScanStatus::Finished { scan_id } => {
                    metrics::histogram!(scangate_core::metrics::SCAN_WAIT_DURATION_SECONDS)
                        .record(started.elapsed().as_secs_f64());
                    info!(run_id = %run.run_id, scan_id, "scan finished");
                    return Ok(TrackOutcome::Completed { scan_id });
                }
                ScanStatus::Failed { reason } => return Err(EngineError::ScanFailed(reason)),
                ScanStatus::Cancelled => {
                    return Err(EngineError::ScanFailed(
                        "scan was cancelled by the scan service".to_owned(),
                    ));
                }
            }
        }
    }
}

/// 원격 스캔 취소를 시도하고 취소 에러를 돌려줍니다.
///
/// 원격 취소 실패는 로그만 남기며 취소 전파를 막지 않습니다.
pub(crate) async fn cancel_run<C: ScanServiceClient>(remote: &Remote<'_, C>, run: &RunHandle) -> EngineError {
    info!(run_id = %run.run_id, "cancelling scan");
    match remote
        .cleanup("cancel_scan", remote.client.cancel_scan(remote.session, run))
        .await
    {
        Ok(()) => info!(run_id = %run.run_id, "scan cancelled"),
        Err(e) => warn!(run_id = %run.run_id, error = %e, "failed to cancel scan"),
    }
    EngineError::Cancelled
}
