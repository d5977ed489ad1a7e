//! 오픈소스 의존성 분석(OSA) 파이프라인
//!
//! SAST 파이프라인과 같은 구조(패키징, 제출, 대기, 결과)를 따르되, 시작 전에
//! 라이선스를 먼저 확인합니다. 라이선스가 없으면 패키징이나 제출 없이
//! "결과 없음"으로 즉시 끝납니다.
//!
//! OSA 실패는 빌드를 중단시키지 않습니다. 취소를 제외한 모든 에러는 로그를 남기고
//! [`OsaScanResult::no_result`]로 바뀝니다.
//!
//! # 모드
//!
//! - 동기: 완료까지 대기하고 요약(심각도별 개수, 취약/정상 라이브러리 수)과
//!   HTML/PDF 보고서를 가져옵니다.
//! - 비동기: 제출 후 바로 `None`을 반환합니다 (평가할 결과 없음).

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::archive::{Archiver, FilterPattern};
use crate::client::{OsaScanStatus, Remote, ScanServiceClient};
use crate::error::EngineError;
use crate::progress::MIN_POLL_INTERVAL;
use crate::types::OsaScanResult;

/// OSA HTML 보고서 파일 이름
pub const OSA_HTML_REPORT: &str = "OSAReport.html";

/// OSA PDF 보고서 파일 이름
pub const OSA_PDF_REPORT: &str = "OSAReport.pdf";

/// OSA 실행 입력
#[derive(Debug, Clone)]
pub struct OsaRun<'p> {
    /// 프로젝트 ID
    pub project_id: u64,
    /// 패키징 기준 디렉토리
    pub base_dir: &'p Path,
    /// 의존성 파일 패턴
    pub pattern: &'p FilterPattern,
    /// 결과 대기 여부
    pub synchronous: bool,
}

/// OSA 오케스트레이터
#[derive(Debug, Clone)]
pub struct OsaOrchestrator {
    poll_interval: Duration,
    timeout: Option<Duration>,
    report_dir: PathBuf,
}

impl OsaOrchestrator {
    /// 오케스트레이터를 생성합니다.
    pub fn new(poll_interval: Duration, timeout: Option<Duration>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            timeout,
            report_dir: report_dir.into(),
        }
    }

    /// OSA 파이프라인을 실행합니다.
    ///
    /// 비동기 모드에서는 `Ok(None)`을 반환합니다.
    ///
    /// # Errors
    ///
    /// 취소된 경우에만 [`EngineError::Cancelled`]를 반환합니다.
    pub async fn run<C: ScanServiceClient, A: Archiver>(
        &self,
        remote: &Remote<'_, C>,
        archiver: &A,
        run: OsaRun<'_>,
    ) -> Result<Option<OsaScanResult>, EngineError> {
        match self.execute(remote, archiver, &run).await {
            Ok(result) => Ok(result),
            Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
            Err(EngineError::LicenseMissing) => {
                error!(
                    project_id = run.project_id,
                    "NO_LICENSE_ERROR: open source analysis license is not enabled"
                );
                Ok(Some(OsaScanResult::no_result(
                    EngineError::LicenseMissing.to_string(),
                )))
            }
            Err(e) => {
                error!(project_id = run.project_id, error = %e, "open source analysis failed");
                Ok(Some(OsaScanResult::no_result(e.to_string())))
            }
        }
    }

    async fn execute<C: ScanServiceClient, A: Archiver>(
        &self,
        remote: &Remote<'_, C>,
        archiver: &A,
        run: &OsaRun<'_>,
    ) -> Result<Option<OsaScanResult>, EngineError> {
        let licensed = remote
            .call("is_license_valid", remote.client.is_license_valid(remote.session))
            .await?;
        if !licensed {
            return Err(EngineError::LicenseMissing);
        }

        let osa_scan_id = {
            let archive = tokio::select! {
                biased;
                _ = remote.cancel.cancelled() => return Err(EngineError::Cancelled),
                res = archiver.archive(run.base_dir, run.pattern) => res?,
            };
            debug!(archive = %archive.path().display(), "dependencies packaged");
            remote
                .call(
                    "submit_osa_scan",
                    remote
                        .client
                        .submit_osa_scan(remote.session, run.project_id, archive.path()),
                )
                .await?
        };
        info!(osa_scan_id = %osa_scan_id, "open source analysis submitted");

        if !run.synchronous {
            info!("open source analysis running asynchronously, results will not be evaluated");
            return Ok(None);
        }

        if let Some(reason) = self.wait(remote, &osa_scan_id).await? {
            return Ok(Some(OsaScanResult::no_result(reason)));
        }

        let summary = remote
            .call(
                "osa_summary",
                remote.client.osa_summary(remote.session, &osa_scan_id),
            )
            .await?;
        let result = OsaScanResult::from_summary(osa_scan_id.clone(), summary);
        info!(
            high = result.counts.high,
            medium = result.counts.medium,
            low = result.counts.low,
            vulnerable_libraries = result.vulnerable_libraries,
            clean_libraries = result.clean_libraries,
            "open source analysis results"
        );

        self.store_reports(remote, &osa_scan_id).await?;
        Ok(Some(result))
    }

    /// 완료까지 폴링합니다. 결과를 얻을 수 없으면 사유를 반환합니다.
    async fn wait<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        osa_scan_id: &str,
    ) -> Result<Option<String>, EngineError> {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = remote.cancel.cancelled() => return Err(EngineError::Cancelled),
                _ = ticker.tick() => {}
            }

            if let Some(limit) = self.timeout {
                if started.elapsed() > limit {
                    warn!(osa_scan_id, "open source analysis timed out");
                    return Ok(Some("open source analysis timed out".to_owned()));
                }
            }

            let status = remote
                .call(
                    "osa_scan_status",
                    remote.client.osa_scan_status(remote.session, osa_scan_id),
                )
                .await?;
            match status {
                OsaScanStatus::InProgress => debug!(osa_scan_id, "open source analysis in progress"),
                OsaScanStatus::Finished => return Ok(None),
                OsaScanStatus::Failed { reason } => {
                    return Ok(Some(format!("open source analysis failed: {reason}")));
                }
            }
        }
    }

    /// HTML/PDF 보고서를 보고서 디렉토리에 저장합니다. 쓰기 실패는 로그만 남깁니다.
    async fn store_reports<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        osa_scan_id: &str,
    ) -> Result<(), EngineError> {
        let html = remote
            .call(
                "osa_html_report",
                remote.client.osa_html_report(remote.session, osa_scan_id),
            )
            .await?;
        let pdf = remote
            .call(
                "osa_pdf_report",
                remote.client.osa_pdf_report(remote.session, osa_scan_id),
            )
            .await?;

        if let Err(e) = tokio::fs::create_dir_all(&self.report_dir).await {
            warn!(dir = %self.report_dir.display(), error = %e, "failed to create report directory");
            return Ok(());
        }
        for (name, bytes) in [(OSA_HTML_REPORT, html.into_bytes()), (OSA_PDF_REPORT, pdf)] {
            let path = self.report_dir.join(name);
            match tokio::fs::write(&path, bytes).await {
                Ok(()) => debug!(path = %path.display(), "open source analysis report saved"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to save open source analysis report"),
            }
        }
        Ok(())
    }
}
