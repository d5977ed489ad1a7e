//! 보고서 요청, 다운로드, 파싱
//!
//! [`ReportFetcher`]는 완료된 스캔의 보고서 생성을 요청하고 보고서 디렉토리로
//! 내려받습니다. XML은 항상, PDF는 설정된 경우에만 요청합니다.
//!
//! [`parse_report_file`]은 내려받은 XML을 [`ReportAggregator`]로 집계합니다.
//! 파싱 실패는 파이프라인을 중단시키지 않고, 0 개수와 에러 메시지를 가진
//! 무효 결과([`ScanResult::invalid`])로 복구됩니다.
//!
//! # 모듈 구조
//!
//! - [`events`]: 이벤트 핸들러 trait과 집계기
//! - [`xml`]: quick-xml 스트리밍 드라이버

pub mod events;
pub mod xml;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::client::{Remote, ScanServiceClient};
use crate::error::EngineError;
use crate::types::{ReportFormat, ReportHandle, ScanResult};

pub use events::{ReportAggregator, ReportEventHandler, RootAttributes};

/// 보고서 다운로드기
#[derive(Debug, Clone)]
pub struct ReportFetcher {
    report_dir: PathBuf,
}

impl ReportFetcher {
    /// 보고서를 `report_dir`에 저장하는 다운로드기를 생성합니다.
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    /// 형식별 저장 경로
    pub fn destination(&self, format: ReportFormat) -> PathBuf {
        self.report_dir.join(format.file_name())
    }

    /// 보고서 생성을 요청합니다.
    pub async fn request<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        scan_id: u64,
        format: ReportFormat,
    ) -> Result<ReportHandle, EngineError> {
        let handle = remote
            .call(
                "generate_report",
                remote.client.generate_report(remote.session, scan_id, format),
            )
            .await?;
        debug!(scan_id, report_id = handle.id, %format, "report generation requested");
        Ok(handle)
    }

    /// 요청된 보고서를 내려받아 저장 경로를 반환합니다.
    ///
    /// 다운로드에는 요청 타임아웃을 적용하지 않고 취소만 확인합니다.
    pub async fn retrieve<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        handle: &ReportHandle,
    ) -> Result<PathBuf, EngineError> {
        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(|e| EngineError::Io {
                path: self.report_dir.display().to_string(),
                source: e,
            })?;

        let destination = self.destination(handle.format);
        remote
            .download(
                remote
                    .client
                    .retrieve_report(remote.session, handle, &destination),
            )
            .await?;
        info!(
            format = %handle.format,
            path = %destination.display(),
            "report retrieved"
        );
        Ok(destination)
    }

    /// 진행 중인 보고서 생성을 취소합니다. 실패는 로그만 남깁니다.
    pub async fn cancel<C: ScanServiceClient>(remote: &Remote<'_, C>, handle: &ReportHandle) {
        info!(report_id = handle.id, "cancelling report generation");
        match remote
            .cleanup(
                "cancel_report",
                remote.client.cancel_report(remote.session, handle),
            )
            .await
        {
            Ok(()) => info!(report_id = handle.id, "report generation cancelled"),
            Err(e) => warn!(report_id = handle.id, error = %e, "failed to cancel report generation"),
        }
    }
}

/// 리더에서 XML 보고서를 집계합니다.
///
/// # Errors
///
/// 파싱 실패 시 부분 집계를 버리고 에러를 반환합니다.
pub fn parse_report<R: BufRead>(source: R, server_url: &str) -> Result<ScanResult, EngineError> {
    let mut aggregator = ReportAggregator::new(server_url);
    xml::parse_reader(source, &mut aggregator)?;
    Ok(aggregator.finish())
}

/// 저장된 XML 보고서 파일을 집계합니다.
///
/// 파일 I/O와 파싱은 `spawn_blocking`에서 실행됩니다. 어떤 실패든
/// [`ScanResult::invalid`]로 바뀌며, 이 함수는 에러를 반환하지 않습니다.
pub async fn parse_report_file(path: PathBuf, server_url: String) -> ScanResult {
    let started = Instant::now();
    let shown = path.display().to_string();

    let outcome = tokio::task::spawn_blocking(move || {
        let file = File::open(&path).map_err(|e| EngineError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        parse_report(BufReader::new(file), &server_url)
    })
    .await;

    metrics::histogram!(scangate_core::metrics::REPORT_PARSE_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    let failure = match outcome {
        Ok(Ok(result)) => {
            metrics::counter!(scangate_core::metrics::REPORTS_PARSED_TOTAL).increment(1);
            debug!(path = %shown, total = result.counts.total(), "report parsed");
            return result;
        }
        Ok(Err(e)) => e.to_string(),
        Err(join) => format!("report parsing task failed: {join}"),
    };

    error!(path = %shown, error = %failure, "failed to parse scan report, results are invalid");
    metrics::counter!(scangate_core::metrics::REPORT_PARSE_FAILURES_TOTAL).increment(1);
    ScanResult::invalid(failure)
}
