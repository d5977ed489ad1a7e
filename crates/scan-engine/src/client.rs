//! Remote scan service abstraction.
//!
//! The [`ScanServiceClient`] trait is the only seam between the engine and the
//! remote scanning service. The wire protocol lives behind it and is supplied by
//! the host; tests use `MockScanService`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ ScanController       │
//! └──────────┬───────────┘
//!            │
//!            ▼
//!   ┌───────────────────┐
//!   │ ScanServiceClient │ (trait)
//!   └───────────────────┘
//!        │          │
//!        ▼          ▼
//!   ┌────────┐  ┌──────┐
//!   │  host  │  │ Mock │
//!   └───┬────┘  └──────┘
//!       │
//!       ▼
//!   scan service
//! ```
//!
//! Every call made by the engine goes through [`call`], which races the remote
//! future against the run's cancellation token and the configured request timeout.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::types::{
    OsaSummary, ReportFormat, ReportHandle, RunHandle, ScanRequest, ScanStatus, Session,
};

/// Status of a remote open source analysis scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsaScanStatus {
    /// Still analyzing.
    InProgress,
    /// Results are available.
    Finished,
    /// The remote service gave up on the scan.
    Failed {
        /// Reason reported by the service.
        reason: String,
    },
}

/// Trait abstracting the remote scanning service.
///
/// The trait is `Send + Sync + 'static`, allowing it to be shared across
/// async contexts behind an `Arc`.
///
/// # Errors
///
/// Implementations report transport and service failures as
/// [`EngineError::Remote`], and a rejected login as [`EngineError::LoginRejected`].
pub trait ScanServiceClient: Send + Sync + 'static {
    /// Opens a session with the given credentials.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, EngineError>> + Send;

    /// Resolves a project by name within a group.
    ///
    /// Returns `0` when no such project exists.
    fn resolve_project_id(
        &self,
        session: &Session,
        project_name: &str,
        group_id: &str,
    ) -> impl Future<Output = Result<u64, EngineError>> + Send;

    /// Reports whether the project already has scans waiting in the queue.
    fn project_has_queued_scans(
        &self,
        session: &Session,
        project_id: u64,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Uploads the packaged source and starts a scan.
    ///
    /// Creates the project when `request.project_id` is `0`.
    fn submit_scan(
        &self,
        session: &Session,
        request: &ScanRequest,
        archive: &Path,
    ) -> impl Future<Output = Result<RunHandle, EngineError>> + Send;

    /// Reads the current status of a submitted run.
    fn poll_status(
        &self,
        session: &Session,
        run: &RunHandle,
    ) -> impl Future<Output = Result<ScanStatus, EngineError>> + Send;

    /// Cancels a submitted run.
    fn cancel_scan(
        &self,
        session: &Session,
        run: &RunHandle,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Requests generation of a report for a finished scan.
    fn generate_report(
        &self,
        session: &Session,
        scan_id: u64,
        format: ReportFormat,
    ) -> impl Future<Output = Result<ReportHandle, EngineError>> + Send;

    /// Waits for a requested report and writes it to `destination`.
    fn retrieve_report(
        &self,
        session: &Session,
        report: &ReportHandle,
        destination: &Path,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Cancels a pending report generation.
    fn cancel_report(
        &self,
        session: &Session,
        report: &ReportHandle,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Checks the open source analysis license entitlement.
    fn is_license_valid(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Uploads packaged dependencies for open source analysis.
    ///
    /// Returns the remote OSA scan id.
    fn submit_osa_scan(
        &self,
        session: &Session,
        project_id: u64,
        archive: &Path,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;

    /// Reads the status of an open source analysis scan.
    fn osa_scan_status(
        &self,
        session: &Session,
        osa_scan_id: &str,
    ) -> impl Future<Output = Result<OsaScanStatus, EngineError>> + Send;

    /// Fetches the severity and library summary of a finished OSA scan.
    fn osa_summary(
        &self,
        session: &Session,
        osa_scan_id: &str,
    ) -> impl Future<Output = Result<OsaSummary, EngineError>> + Send;

    /// Fetches the HTML report of a finished OSA scan.
    fn osa_html_report(
        &self,
        session: &Session,
        osa_scan_id: &str,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;

    /// Fetches the PDF report of a finished OSA scan.
    fn osa_pdf_report(
        &self,
        session: &Session,
        osa_scan_id: &str,
    ) -> impl Future<Output = Result<Vec<u8>, EngineError>> + Send;
}

/// Runs one remote call, bounded by the request timeout and the cancellation token.
///
/// Cancellation wins over a simultaneously ready result.
pub async fn call<T>(
    cancel: &CancellationToken,
    timeout: Duration,
    operation: &'static str,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        res = with_timeout(timeout, operation, fut) => res,
    }
}

/// Runs one remote call bounded only by the cancellation token.
///
/// Used for report downloads, whose duration grows with the report size.
pub async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        res = fut => res,
    }
}

/// Runs one remote call bounded only by the request timeout.
///
/// Used for cleanup calls issued after cancellation.
pub async fn with_timeout<T>(
    timeout: Duration,
    operation: &'static str,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res,
        Err(_) => Err(EngineError::RemoteTimeout {
            operation,
            secs: timeout.as_secs(),
        }),
    }
}

/// Everything a pipeline stage needs to talk to the remote service for one run.
pub struct Remote<'a, C> {
    /// Remote service client.
    pub client: &'a C,
    /// Session opened by the login phase.
    pub session: &'a Session,
    /// Run-wide cancellation signal.
    pub cancel: &'a CancellationToken,
    /// Timeout applied to each call except downloads.
    pub timeout: Duration,
}

impl<C: ScanServiceClient> Remote<'_, C> {
    /// See [`call`].
    pub async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        call(self.cancel, self.timeout, operation, fut).await
    }

    /// See [`until_cancelled`].
    pub async fn download<T>(
        &self,
        fut: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        until_cancelled(self.cancel, fut).await
    }

    /// See [`with_timeout`].
    pub async fn cleanup<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        with_timeout(self.timeout, operation, fut).await
    }
}

#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Mutex;

/// 테스트용 Mock 스캔 서비스
///
/// 응답을 빌더로 구성하고, 호출된 작업 이름을 순서대로 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockScanService {
    /// 로그인 거부 여부
    pub reject_login: bool,
    /// resolve_project_id가 반환할 ID
    pub existing_project_id: u64,
    /// 새 프로젝트 생성 시 부여할 ID
    pub created_project_id: u64,
    /// 대기 중인 스캔 존재 여부
    pub queued_scans: bool,
    /// 라이선스 유효 여부
    pub license_valid: bool,
    /// 실패시킬 작업 이름
    pub fail_operation: Option<&'static str>,
    /// retrieve_report가 완료되지 않도록 할지 여부
    pub hang_on_report: bool,
    /// retrieve_report가 XML로 쓰는 내용
    pub report_xml: String,
    /// OSA 요약
    pub osa_summary: OsaSummary,
    /// poll_status가 차례로 반환할 상태 (소진되면 Running)
    pub statuses: Mutex<VecDeque<ScanStatus>>,
    /// 호출된 작업 기록
    pub calls: Mutex<Vec<&'static str>>,
    /// submit_scan 시점에 아카이브 파일이 존재했는지
    pub archive_seen: Mutex<Vec<bool>>,
}

#[cfg(test)]
impl MockScanService {
    /// 기본 응답을 가진 mock을 생성합니다.
    ///
    /// 프로젝트는 존재하지 않고(0), 라이선스는 유효하며, 스캔은 첫 폴링에서 완료됩니다.
    pub fn new() -> Self {
        Self {
            created_project_id: 77,
            license_valid: true,
            statuses: Mutex::new(VecDeque::from(vec![ScanStatus::Finished { scan_id: 1001 }])),
            ..Self::default()
        }
    }

    /// 로그인을 거부하도록 설정합니다.
    pub fn with_login_rejected(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// 기존 프로젝트 ID를 설정합니다.
    pub fn with_existing_project(mut self, id: u64) -> Self {
        self.existing_project_id = id;
        self
    }

    /// 대기 중인 스캔이 있다고 보고하도록 설정합니다.
    pub fn with_queued_scans(mut self) -> Self {
        self.queued_scans = true;
        self
    }

    /// 라이선스 유효 여부를 설정합니다.
    pub fn with_license(mut self, valid: bool) -> Self {
        self.license_valid = valid;
        self
    }

    /// 지정한 작업이 실패하도록 설정합니다.
    pub fn with_failing(mut self, operation: &'static str) -> Self {
        self.fail_operation = Some(operation);
        self
    }

    /// 보고서 다운로드가 끝나지 않도록 설정합니다.
    pub fn with_hanging_report(mut self) -> Self {
        self.hang_on_report = true;
        self
    }

    /// 다운로드될 XML 보고서 내용을 설정합니다.
    pub fn with_report_xml(mut self, xml: impl Into<String>) -> Self {
        self.report_xml = xml.into();
        self
    }

    /// OSA 요약을 설정합니다.
    pub fn with_osa_summary(mut self, summary: OsaSummary) -> Self {
        self.osa_summary = summary;
        self
    }

    /// 폴링 상태 시퀀스를 설정합니다.
    pub fn with_statuses(self, statuses: Vec<ScanStatus>) -> Self {
        *self.statuses.lock().unwrap() = VecDeque::from(statuses);
        self
    }

    /// 지금까지 호출된 작업 목록
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// 작업이 한 번 이상 호출되었는지 확인합니다.
    pub fn called(&self, operation: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| *c == operation)
    }

    fn record(&self, operation: &'static str) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(operation);
        if self.fail_operation == Some(operation) {
            return Err(EngineError::remote(operation, "mock failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
impl ScanServiceClient for MockScanService {
    async fn login(&self, username: &str, _password: &str) -> Result<Session, EngineError> {
        self.record("login")?;
        if self.reject_login {
            return Err(EngineError::LoginRejected(format!(
                "invalid credentials for '{username}'"
            )));
        }
        Ok(Session {
            token: "mock-session".to_owned(),
        })
    }

    async fn resolve_project_id(
        &self,
        _session: &Session,
        _project_name: &str,
        _group_id: &str,
    ) -> Result<u64, EngineError> {
        self.record("resolve_project_id")?;
        Ok(self.existing_project_id)
    }

    async fn project_has_queued_scans(
        &self,
        _session: &Session,
        _project_id: u64,
    ) -> Result<bool, EngineError> {
        self.record("project_has_queued_scans")?;
        Ok(self.queued_scans)
    }

    async fn submit_scan(
        &self,
        _session: &Session,
        request: &ScanRequest,
        archive: &Path,
    ) -> Result<RunHandle, EngineError> {
        self.archive_seen.lock().unwrap().push(archive.exists());
        self.record("submit_scan")?;
        let project_id = if request.project_id == 0 {
            self.created_project_id
        } else {
            request.project_id
        };
        Ok(RunHandle {
            run_id: "run-1".to_owned(),
            project_id,
        })
    }

    async fn poll_status(
        &self,
        _session: &Session,
        _run: &RunHandle,
    ) -> Result<ScanStatus, EngineError> {
        self.record("poll_status")?;
        let next = self.statuses.lock().unwrap().pop_front();
        Ok(next.unwrap_or(ScanStatus::Running {
            stage: "scanning".to_owned(),
            percent: 50,
        }))
    }

    async fn cancel_scan(&self, _session: &Session, _run: &RunHandle) -> Result<(), EngineError> {
        self.record("cancel_scan")
    }

    async fn generate_report(
        &self,
        _session: &Session,
        _scan_id: u64,
        format: ReportFormat,
    ) -> Result<ReportHandle, EngineError> {
        self.record("generate_report")?;
        let id = match format {
            ReportFormat::Xml => 1,
            ReportFormat::Pdf => 2,
        };
        Ok(ReportHandle { id, format })
    }

    async fn retrieve_report(
        &self,
        _session: &Session,
        report: &ReportHandle,
        destination: &Path,
    ) -> Result<(), EngineError> {
        self.record("retrieve_report")?;
        if self.hang_on_report {
            std::future::pending::<()>().await;
        }
        let bytes = match report.format {
            ReportFormat::Xml => self.report_xml.clone().into_bytes(),
            ReportFormat::Pdf => b"%PDF-1.4 mock".to_vec(),
        };
        tokio::fs::write(destination, bytes)
            .await
            .map_err(|e| EngineError::Io {
                path: destination.display().to_string(),
                source: e,
            })
    }

    async fn cancel_report(
        &self,
        _session: &Session,
        _report: &ReportHandle,
    ) -> Result<(), EngineError> {
        self.record("cancel_report")
    }

    async fn is_license_valid(&self, _session: &Session) -> Result<bool, EngineError> {
        self.record("is_license_valid")?;
        Ok(self.license_valid)
    }

    async fn submit_osa_scan(
        &self,
        _session: &Session,
        _project_id: u64,
        archive: &Path,
    ) -> Result<String, EngineError> {
        self.archive_seen.lock().unwrap().push(archive.exists());
        self.record("submit_osa_scan")?;
        Ok("osa-1".to_owned())
    }

    async fn osa_scan_status(
        &self,
        _session: &Session,
        _osa_scan_id: &str,
    ) -> Result<OsaScanStatus, EngineError> {
        self.record("osa_scan_status")?;
        Ok(OsaScanStatus::Finished)
    }

    async fn osa_summary(
        &self,
        _session: &Session,
        _osa_scan_id: &str,
    ) -> Result<OsaSummary, EngineError> {
        self.record("osa_summary")?;
        Ok(self.osa_summary)
    }

    async fn osa_html_report(
        &self,
        _session: &Session,
        _osa_scan_id: &str,
    ) -> Result<String, EngineError> {
        self.record("osa_html_report")?;
        Ok("<html>osa</html>".to_owned())
    }

    async fn osa_pdf_report(
        &self,
        _session: &Session,
        _osa_scan_id: &str,
    ) -> Result<Vec<u8>, EngineError> {
        self.record("osa_pdf_report")?;
        Ok(b"%PDF-1.4 osa".to_vec())
    }
}
