//! 빌드 실행 컨트롤러
//!
//! [`ScanController`]는 빌드 한 번의 스캔 파이프라인을 순서대로 실행합니다.
//!
//! # 파이프라인
//!
//! ```text
//! configuration ─▶ (SCM 트리거 건너뜀) ─▶ login
//!      │
//!      ▼
//! submission: 프로젝트 확인 ─▶ 중복 스캔 검사 ─▶ packaging ─▶ 제출
//!      │
//!      ├─ 비동기: (OSA 제출) ─▶ Pending 결과, 성공
//!      ▼
//! polling ─▶ reporting (XML, PDF) ─▶ parsing ─▶ osa ─▶ thresholding ─▶ 산출물
//! ```
//!
//! 각 단계는 `tracing` span으로 감싸여 실패가 어느 단계에서 났는지 로그로 구분됩니다.
//! 실행 전체는 실행 ID(UUID v4)를 가진 `scan_run` span 안에서 돌아갑니다.
//!
//! # 결과 정책
//!
//! - 임계값 위반: 설정된 결과(`Unstable` 또는 `Failure`)
//! - 대기 타임아웃: `Unstable`, 보고서와 산출물 단계 생략
//! - 설정/패키징/원격 에러: 에러 전파. `status_on_error` 정책이 `unstable`이면
//!   `Unstable` 보고서로 바뀝니다.
//! - 취소: 진행 중인 원격 스캔이나 보고서 생성을 취소한 뒤 [`EngineError::Cancelled`]
//!
//! # 사용 예시
//!
//! ```ignore
//! let (controller, events) = ScanControllerBuilder::from_config(client, archiver, &config)
//!     .build()?;
//! let report = controller.run(&RunContext::new(42, workspace), &cancel).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use scangate_core::config::{ErrorPolicy, GlobalPolicy, JobConfig, ScangateConfig, ServerConfig};
use scangate_core::types::{BuildOutcome, ScanTrack, Severity};

use crate::archive::{Archiver, FilterPattern};
use crate::client::{self, Remote, ScanServiceClient};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::{self, BuildEvent, BuildEventKind, SkipReason};
use crate::guard::DuplicateScanGuard;
use crate::osa::{OsaOrchestrator, OsaRun};
use crate::progress::{self, ScanProgressTracker, TrackOutcome};
use crate::report::{self, ReportFetcher};
use crate::schedule;
use crate::submit::{self, ScanSubmitter};
use crate::summary::ArtifactWriter;
use crate::threshold::{ThresholdPlan, Verdict, Violation};
use crate::types::{OsaScanResult, ReportFormat, ReportHandle, RunHandle, ScanKind, ScanResult};

/// 기본 이벤트 채널 용량
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// 메트릭 설명은 프로세스당 한 번 등록합니다.
static DESCRIBE_METRICS: Once = Once::new();

/// 원격 프로젝트 화면 링크를 만듭니다.
pub fn project_state_url(server_url: &str, project_id: u64) -> String {
    format!(
        "{}/CxWebClient/portal#/projectState/{project_id}/Summary",
        server_url.trim_end_matches('/')
    )
}

/// 빌드를 시작시킨 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildCause {
    /// 소스 저장소 변경
    Scm,
    /// 사용자 수동 실행
    User,
    /// 주기 실행
    Timer,
    /// 상위 잡
    Upstream,
    /// 기타
    Other,
}

/// 빌드 한 번의 실행 환경
#[derive(Debug, Clone)]
pub struct RunContext {
    /// 빌드 번호 (스캔 범위 결정에 사용)
    pub build_number: u64,
    /// 패키징 대상 작업 공간
    pub workspace: PathBuf,
    /// 보고서가 저장되는 빌드 디렉토리
    pub build_dir: PathBuf,
    /// 빌드 원인 목록
    pub causes: Vec<BuildCause>,
}

impl RunContext {
    /// 빌드 디렉토리를 작업 공간과 같게 두는 실행 환경을 만듭니다.
    pub fn new(build_number: u64, workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            build_number,
            build_dir: workspace.clone(),
            workspace,
            causes: Vec::new(),
        }
    }

    /// 빌드 디렉토리를 지정합니다.
    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    /// 빌드 원인을 지정합니다.
    pub fn with_causes(mut self, causes: Vec<BuildCause>) -> Self {
        self.causes = causes;
        self
    }

    /// SCM 외의 원인이 하나도 없는지 확인합니다.
    ///
    /// 원인 목록이 비어 있어도 `true`입니다.
    pub fn triggered_only_by_scm(&self) -> bool {
        self.causes.iter().all(|cause| *cause == BuildCause::Scm)
    }
}

/// 빌드 실행 결과 기록
///
/// 실행이 끝나면 `summary.json`으로 보고서 디렉토리에 저장됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// 실행 ID
    pub run_id: String,
    /// 최종 빌드 결과
    pub outcome: BuildOutcome,
    /// 스캔 없이 끝난 사유
    pub skipped: Option<SkipReason>,
    /// 스캔 범위
    pub scan_kind: Option<ScanKind>,
    /// 대기 타임아웃 여부
    pub timed_out: bool,
    /// SAST 결과
    pub sast: Option<ScanResult>,
    /// OSA 결과
    pub osa: Option<OsaScanResult>,
    /// 임계값 위반 목록
    pub violations: Vec<Violation>,
    /// 정책에 따라 `Unstable`로 바뀐 에러 메시지
    pub error: Option<String>,
}

impl BuildReport {
    fn skipped(run_id: &str, reason: SkipReason) -> Self {
        Self {
            run_id: run_id.to_owned(),
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

/// 취소 시 정리해야 할 원격 작업
enum Cleanup {
    None,
    Scan(RunHandle),
    Report(ReportHandle),
}

/// 실행 단위로 한 번 결정되는 값
struct RunPlan<'a> {
    run_id: &'a str,
    ctx: &'a RunContext,
    thresholds: ThresholdPlan,
    kind: ScanKind,
    synchronous: bool,
}

/// 스캔 컨트롤러
///
/// `ScanControllerBuilder`로 생성합니다. 한 인스턴스로 여러 빌드를 순차 또는
/// 동시에 실행할 수 있으며, 실행 사이에 공유되는 가변 상태는 없습니다.
pub struct ScanController<C, A> {
    client: Arc<C>,
    archiver: Arc<A>,
    config: EngineConfig,
    global: Arc<GlobalPolicy>,
    job: JobConfig,
    server: ServerConfig,
    event_tx: mpsc::Sender<BuildEvent>,
}

impl<C: ScanServiceClient, A: Archiver> ScanController<C, A> {
    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 빌드 한 번을 실행합니다.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Cancelled`]: 취소 신호 수신 (원격 정리 후)
    /// - 설정/패키징/원격 에러 (`status_on_error` 정책이 `unstable`이 아닐 때)
    pub async fn run(
        &self,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<BuildReport, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let span = info_span!(
            "scan_run",
            run_id = %run_id,
            build = ctx.build_number,
            project = %self.job.project_name
        );

        let result = self.execute(&run_id, ctx, cancel).instrument(span).await;
        metrics::histogram!(scangate_core::metrics::RUN_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(report) => {
                record_outcome(report.outcome);
                info!(run_id = %run_id, outcome = %report.outcome, "scan run finished");
                Ok(report)
            }
            Err(EngineError::Cancelled) => {
                metrics::counter!(scangate_core::metrics::RUNS_CANCELLED_TOTAL).increment(1);
                warn!(run_id = %run_id, "scan run cancelled");
                Err(EngineError::Cancelled)
            }
            Err(e) if self.downgrades_errors() => {
                error!(
                    run_id = %run_id,
                    category = %e.category(),
                    error = %e,
                    "scan run failed, marking build unstable"
                );
                record_outcome(BuildOutcome::Unstable);
                self.publish(
                    &run_id,
                    BuildEventKind::Completed {
                        outcome: BuildOutcome::Unstable,
                        violations: Vec::new(),
                    },
                );
                Ok(BuildReport {
                    run_id,
                    outcome: BuildOutcome::Unstable,
                    error: Some(e.to_string()),
                    ..BuildReport::default()
                })
            }
            Err(e) => {
                error!(
                    run_id = %run_id,
                    category = %e.category(),
                    error = %e,
                    "scan run failed"
                );
                record_outcome(BuildOutcome::Failure);
                Err(e)
            }
        }
    }

    fn downgrades_errors(&self) -> bool {
        match self.job.status_on_error {
            ErrorPolicy::Unstable => true,
            ErrorPolicy::Failure => false,
            ErrorPolicy::Global => self.global.status_on_error == BuildOutcome::Unstable,
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<BuildReport, EngineError> {
        let plan = RunPlan {
            run_id,
            ctx,
            thresholds: ThresholdPlan::resolve(&self.global, &self.job),
            kind: schedule::decide(
                ctx.build_number,
                self.job.incremental,
                self.job.full_scans_scheduled,
                self.job.full_scan_cycle,
            ),
            synchronous: self.job.wait_for_results || self.global.thresholds_locked(),
        };

        info_span!("configuration").in_scope(|| self.log_configuration(&plan));

        if self.job.skip_scm_triggers && ctx.triggered_only_by_scm() {
            info!("build was triggered by source control only, skipping scan");
            self.publish(
                run_id,
                BuildEventKind::Skipped {
                    reason: SkipReason::ScmTrigger,
                },
            );
            return Ok(BuildReport::skipped(run_id, SkipReason::ScmTrigger));
        }

        let timeout = self.config.request_timeout();
        let session = client::call(
            cancel,
            timeout,
            "login",
            self.client
                .login(&self.server.username, &self.server.password),
        )
        .instrument(info_span!("login"))
        .await?;
        info!(url = %self.server.url, username = %self.server.username, "logged in to the scan service");

        let remote = Remote {
            client: self.client.as_ref(),
            session: &session,
            cancel,
            timeout,
        };
        let mut cleanup = Cleanup::None;
        let result = self.scan(&plan, &remote, &mut cleanup).await;

        if matches!(result, Err(EngineError::Cancelled)) {
            match cleanup {
                Cleanup::Scan(run) => {
                    progress::cancel_run(&remote, &run).await;
                }
                Cleanup::Report(handle) => ReportFetcher::cancel(&remote, &handle).await,
                Cleanup::None => {}
            }
        }
        result
    }

    async fn scan(
        &self,
        plan: &RunPlan<'_>,
        remote: &Remote<'_, C>,
        cleanup: &mut Cleanup,
    ) -> Result<BuildReport, EngineError> {
        let submitter = ScanSubmitter::new(
            remote,
            self.archiver.as_ref(),
            self.global.prohibit_project_creation,
        );
        let submission = info_span!("submission", kind = %plan.kind);

        let project_id = submitter
            .resolve_project(&self.job.project_name, &self.job.group_id)
            .instrument(submission.clone())
            .await?;

        if DuplicateScanGuard::new(self.job.avoid_duplicate_scans)
            .should_skip(remote, project_id)
            .instrument(submission.clone())
            .await?
        {
            self.publish(
                plan.run_id,
                BuildEventKind::Skipped {
                    reason: SkipReason::DuplicateScan,
                },
            );
            return Ok(BuildReport::skipped(plan.run_id, SkipReason::DuplicateScan));
        }

        let request = submit::build_request(&self.job, project_id, plan.kind);
        let pattern = FilterPattern::for_job(&self.global, &self.job);
        let run = submitter
            .submit(&request, &plan.ctx.workspace, &pattern)
            .instrument(submission)
            .await?;

        let project_id = run.project_id;
        let state_url = project_state_url(&self.server.url, project_id);
        let report_dir = plan.ctx.build_dir.join(&self.config.report_dir);
        *cleanup = Cleanup::Scan(run.clone());

        if !plan.synchronous {
            let osa = self
                .run_osa(remote, project_id, &plan.ctx.workspace, &report_dir, false)
                .await?;
            *cleanup = Cleanup::None;
            info!(
                project_id,
                url = %state_url,
                "running in asynchronous mode, not waiting for scan results"
            );
            self.publish(
                plan.run_id,
                BuildEventKind::Pending {
                    project_id,
                    project_state_url: state_url.clone(),
                },
            );
            return Ok(BuildReport {
                run_id: plan.run_id.to_owned(),
                scan_kind: Some(plan.kind),
                sast: Some(ScanResult::pending(project_id, state_url)),
                osa,
                ..BuildReport::default()
            });
        }

        // 폴링 중 취소는 추적기가 직접 원격 취소를 요청합니다.
        *cleanup = Cleanup::None;
        let tracker = ScanProgressTracker::new(self.config.poll_interval(), self.config.scan_timeout());
        let scan_id = match tracker
            .track(remote, run)
            .instrument(info_span!("polling"))
            .await?
        {
            TrackOutcome::Completed { scan_id } => scan_id,
            TrackOutcome::TimedOut => {
                warn!(project_id, "scan did not finish in time, marking build unstable");
                self.publish(
                    plan.run_id,
                    BuildEventKind::Completed {
                        outcome: BuildOutcome::Unstable,
                        violations: Vec::new(),
                    },
                );
                return Ok(BuildReport {
                    run_id: plan.run_id.to_owned(),
                    outcome: BuildOutcome::Unstable,
                    scan_kind: Some(plan.kind),
                    timed_out: true,
                    ..BuildReport::default()
                });
            }
        };

        let fetcher = ReportFetcher::new(&report_dir);
        let xml_path = fetch_report(remote, &fetcher, scan_id, ReportFormat::Xml, cleanup)
            .instrument(info_span!("reporting", format = "xml"))
            .await?;
        if self.job.generate_pdf_report {
            match fetch_report(remote, &fetcher, scan_id, ReportFormat::Pdf, cleanup)
                .instrument(info_span!("reporting", format = "pdf"))
                .await
            {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(error = %e, "failed to generate PDF report"),
            }
        }

        let mut sast = report::parse_report_file(xml_path, self.server.url.clone())
            .instrument(info_span!("parsing"))
            .await;
        sast.project_id = project_id;
        sast.scan_id = Some(scan_id);
        sast.project_state_url = state_url;
        sast.thresholds = plan.thresholds.attached(ScanTrack::Sast);
        log_results(&sast);

        let mut osa = self
            .run_osa(remote, project_id, &plan.ctx.workspace, &report_dir, true)
            .await?;
        if let Some(result) = osa.as_mut().filter(|r| r.returned_result) {
            result.thresholds = plan.thresholds.attached(ScanTrack::Osa);
        }

        let (outcome, violations) = info_span!("thresholding")
            .in_scope(|| self.evaluate(&plan.thresholds, &sast, osa.as_ref()));

        let report = BuildReport {
            run_id: plan.run_id.to_owned(),
            outcome,
            skipped: None,
            scan_kind: Some(plan.kind),
            timed_out: false,
            sast: Some(sast),
            osa,
            violations,
            error: None,
        };

        ArtifactWriter::new(
            &report_dir,
            plan.ctx.workspace.join(&self.config.workspace_reports_dir),
        )
        .publish(&report)
        .await;

        self.publish(
            plan.run_id,
            BuildEventKind::Completed {
                outcome,
                violations: report.violations.clone(),
            },
        );
        Ok(report)
    }

    async fn run_osa(
        &self,
        remote: &Remote<'_, C>,
        project_id: u64,
        base_dir: &Path,
        report_dir: &Path,
        synchronous: bool,
    ) -> Result<Option<OsaScanResult>, EngineError> {
        if !self.job.osa.enabled {
            return Ok(None);
        }
        let pattern = FilterPattern::for_osa(&self.job.osa);
        let orchestrator = OsaOrchestrator::new(
            self.config.poll_interval(),
            self.config.scan_timeout(),
            report_dir,
        );
        orchestrator
            .run(
                remote,
                self.archiver.as_ref(),
                OsaRun {
                    project_id,
                    base_dir,
                    pattern: &pattern,
                    synchronous,
                },
            )
            .instrument(info_span!("osa"))
            .await
    }

    fn evaluate(
        &self,
        plan: &ThresholdPlan,
        sast: &ScanResult,
        osa: Option<&OsaScanResult>,
    ) -> (BuildOutcome, Vec<Violation>) {
        record_findings(ScanTrack::Sast, sast);

        let osa = osa.filter(|r| r.returned_result).map(|r| &r.counts);
        if let Some(counts) = osa {
            for severity in Severity::THRESHOLDED {
                metrics::gauge!(
                    scangate_core::metrics::FINDINGS,
                    scangate_core::metrics::LABEL_TRACK => ScanTrack::Osa.as_str(),
                    scangate_core::metrics::LABEL_SEVERITY => severity.as_str()
                )
                .set(f64::from(counts.get(severity)));
            }
        }
        let Verdict {
            outcome,
            violations,
        } = plan.judge(&sast.counts, osa);

        if violations.is_empty() {
            info!(active = plan.active, "no thresholds exceeded");
        } else {
            error!(count = violations.len(), outcome = %outcome, "build failed due to:");
            for violation in &violations {
                error!(
                    track = violation.track.as_str(),
                    severity = violation.severity.as_str(),
                    "{violation}"
                );
                metrics::counter!(
                    scangate_core::metrics::THRESHOLD_VIOLATIONS_TOTAL,
                    scangate_core::metrics::LABEL_TRACK => violation.track.as_str(),
                    scangate_core::metrics::LABEL_SEVERITY => violation.severity.as_str()
                )
                .increment(1);
            }
        }
        (outcome, violations)
    }

    fn log_configuration(&self, plan: &RunPlan<'_>) {
        info!(
            url = %self.server.url,
            username = %self.server.username,
            project = %self.job.project_name,
            group_id = %self.job.group_id,
            preset = %self.job.preset,
            kind = %plan.kind,
            synchronous = plan.synchronous,
            generate_pdf = self.job.generate_pdf_report,
            avoid_duplicates = self.job.avoid_duplicate_scans,
            filter = %FilterPattern::for_job(&self.global, &self.job),
            "scan configuration"
        );
        info!(
            active = plan.thresholds.active,
            source = ?plan.thresholds.source,
            sast = ?plan.thresholds.sast.limits,
            osa = ?plan.thresholds.osa.limits,
            outcome_on_violation = %plan.thresholds.sast.outcome_on_violation,
            "thresholds in effect"
        );
        info!(
            enabled = self.job.osa.enabled,
            include = %self.job.osa.include,
            exclude = %self.job.osa.exclude,
            "open source analysis configuration"
        );
        if self.global.legacy_osa_threshold_mix {
            warn!("legacy OSA threshold mix is on, OSA medium/low limits are compared against SAST counts");
        }
    }

    fn publish(&self, run_id: &str, kind: BuildEventKind) {
        event::publish(&self.event_tx, BuildEvent::new(run_id, kind));
    }
}

async fn fetch_report<C: ScanServiceClient>(
    remote: &Remote<'_, C>,
    fetcher: &ReportFetcher,
    scan_id: u64,
    format: ReportFormat,
    cleanup: &mut Cleanup,
) -> Result<PathBuf, EngineError> {
    let handle = fetcher.request(remote, scan_id, format).await?;
    *cleanup = Cleanup::Report(handle);
    let path = fetcher.retrieve(remote, &handle).await?;
    *cleanup = Cleanup::None;
    Ok(path)
}

fn log_results(result: &ScanResult) {
    if !result.valid {
        warn!(
            error = result.error_message.as_deref().unwrap_or_default(),
            "scan results are invalid, counts are reported as zero"
        );
        return;
    }
    info!(
        high = result.counts.high,
        medium = result.counts.medium,
        low = result.counts.low,
        info = result.counts.info,
        deep_link = %result.metadata.deep_link,
        "scan results"
    );
    for severity in Severity::THRESHOLDED {
        for query in result.queries_for(severity) {
            debug!(
                severity = severity.as_str(),
                query = %query.pretty_name(),
                count = query.count,
                "query results"
            );
        }
    }
}

fn record_findings(track: ScanTrack, result: &ScanResult) {
    for severity in [Severity::High, Severity::Medium, Severity::Low, Severity::Info] {
        metrics::gauge!(
            scangate_core::metrics::FINDINGS,
            scangate_core::metrics::LABEL_TRACK => track.as_str(),
            scangate_core::metrics::LABEL_SEVERITY => severity.as_str()
        )
        .set(f64::from(result.counts.get(severity)));
    }
}

fn record_outcome(outcome: BuildOutcome) {
    metrics::counter!(
        scangate_core::metrics::RUNS_COMPLETED_TOTAL,
        scangate_core::metrics::LABEL_OUTCOME => outcome.as_str()
    )
    .increment(1);
}

/// [`ScanController`] 빌더
pub struct ScanControllerBuilder<C, A> {
    client: Arc<C>,
    archiver: Arc<A>,
    config: EngineConfig,
    global: Arc<GlobalPolicy>,
    job: JobConfig,
    server: ServerConfig,
    event_tx: Option<mpsc::Sender<BuildEvent>>,
    event_channel_capacity: usize,
}

impl<C: ScanServiceClient, A: Archiver> ScanControllerBuilder<C, A> {
    /// 원격 클라이언트와 패키저로 새 빌더를 생성합니다.
    pub fn new(client: Arc<C>, archiver: Arc<A>) -> Self {
        Self {
            client,
            archiver,
            config: EngineConfig::default(),
            global: Arc::new(GlobalPolicy::default()),
            job: JobConfig::default(),
            server: ServerConfig::default(),
            event_tx: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// 통합 설정에서 엔진 설정, 전역 정책, 잡 설정, 유효 서버 설정을 가져옵니다.
    pub fn from_config(client: Arc<C>, archiver: Arc<A>, config: &ScangateConfig) -> Self {
        Self::new(client, archiver)
            .engine_config(EngineConfig::from_core(config))
            .global(Arc::new(config.global.clone()))
            .job(config.job.clone())
            .server(config.effective_server().clone())
    }

    /// 엔진 설정을 지정합니다.
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 전역 정책 스냅샷을 지정합니다.
    pub fn global(mut self, global: Arc<GlobalPolicy>) -> Self {
        self.global = global;
        self
    }

    /// 잡 설정을 지정합니다.
    pub fn job(mut self, job: JobConfig) -> Self {
        self.job = job;
        self
    }

    /// 서버 연결 설정을 지정합니다.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// 외부 이벤트 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn event_sender(mut self, tx: mpsc::Sender<BuildEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 이벤트 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// 컨트롤러를 빌드합니다.
    ///
    /// 외부 채널을 설정하지 않았으면 이벤트 수신기를 함께 반환합니다.
    /// 처음 성공한 빌드에서 메트릭 설명을 등록하므로, 호스트는 그 전에 레코더를 설치해야 합니다.
    ///
    /// # Errors
    ///
    /// 엔진 설정이 유효하지 않거나, 프로젝트 이름이 비어 있거나,
    /// 서버 URL이 `http://` 또는 `https://`로 시작하지 않으면 `EngineError::Config`
    pub fn build(
        self,
    ) -> Result<(ScanController<C, A>, Option<mpsc::Receiver<BuildEvent>>), EngineError> {
        self.config.validate()?;

        if self.job.project_name.trim().is_empty() {
            return Err(EngineError::Config {
                field: "job.project_name".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        let url = &self.server.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EngineError::Config {
                field: "server.url".to_owned(),
                reason: format!("'{url}' must start with http:// or https://"),
            });
        }
        if self.event_channel_capacity == 0 {
            return Err(EngineError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let (event_tx, event_rx) = match self.event_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.event_channel_capacity);
                (tx, Some(rx))
            }
        };

        DESCRIBE_METRICS.call_once(scangate_core::metrics::describe_all);

        let controller = ScanController {
            client: self.client,
            archiver: self.archiver,
            config: self.config,
            global: self.global,
            job: self.job,
            server: self.server,
            event_tx,
        };
        Ok((controller, event_rx))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scangate_core::types::SeverityLimits;

    use super::*;
    use crate::archive::{MockArchiveFailure, MockArchiver};
    use crate::client::MockScanService;
    use crate::summary::SUMMARY_FILE;
    use crate::types::{OsaSummary, ScanStatus, SeverityCounts};

    const REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<CxXMLResults DeepLink="http://10.0.0.1/CxWebClient/ViewerMain.aspx?scanid=1001&amp;projectid=77" ScanStart="Monday, March 2, 2026 10:00:00 AM" ScanTime="00h:02m:00s" LinesOfCodeScanned="1200" FilesScanned="30" ScanType="Full">
  <Query name="SQL_Injection" SeverityIndex="3">
    <Result FalsePositive="False" SeverityIndex="3"/>
    <Result FalsePositive="False" SeverityIndex="3"/>
  </Query>
  <Query name="Hardcoded_Password" SeverityIndex="2">
    <Result FalsePositive="False" SeverityIndex="2"/>
  </Query>
</CxXMLResults>"#;

    struct Fixture {
        _dir: tempfile::TempDir,
        workspace: PathBuf,
        build_dir: PathBuf,
        archiver: Arc<MockArchiver>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_archiver(|dir| MockArchiver::new(dir))
        }

        fn with_archiver(make: impl FnOnce(PathBuf) -> MockArchiver) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let workspace = dir.path().join("workspace");
            let build_dir = dir.path().join("builds/42");
            let archives = dir.path().join("archives");
            for d in [&workspace, &build_dir, &archives] {
                std::fs::create_dir_all(d).unwrap();
            }
            Self {
                archiver: Arc::new(make(archives)),
                _dir: dir,
                workspace,
                build_dir,
            }
        }

        fn context(&self) -> RunContext {
            RunContext::new(1, &self.workspace).with_build_dir(&self.build_dir)
        }

        fn workspace_reports(&self) -> PathBuf {
            self.workspace.join("scangate/reports")
        }
    }

    fn job() -> JobConfig {
        JobConfig {
            project_name: "payments".to_owned(),
            group_id: "team-1".to_owned(),
            preset: "Default".to_owned(),
            ..JobConfig::default()
        }
    }

    fn server() -> ServerConfig {
        ServerConfig {
            url: "https://scan.example.com".to_owned(),
            username: "ci".to_owned(),
            password: "secret".to_owned(),
        }
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll_interval_secs: 1,
            ..EngineConfig::default()
        }
    }

    type Built = (
        ScanController<MockScanService, MockArchiver>,
        mpsc::Receiver<BuildEvent>,
        Arc<MockScanService>,
    );

    fn build_with(
        client: MockScanService,
        fx: &Fixture,
        job: JobConfig,
        global: GlobalPolicy,
        config: EngineConfig,
    ) -> Built {
        let client = Arc::new(client);
        let (controller, rx) = ScanControllerBuilder::new(Arc::clone(&client), Arc::clone(&fx.archiver))
            .engine_config(config)
            .global(Arc::new(global))
            .job(job)
            .server(server())
            .build()
            .unwrap();
        (controller, rx.unwrap(), client)
    }

    fn build(client: MockScanService, fx: &Fixture, job: JobConfig, global: GlobalPolicy) -> Built {
        build_with(client, fx, job, global, fast_config())
    }

    fn cancel_after(cancel: &CancellationToken, delay: Duration) {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger.cancel();
        });
    }

    #[test]
    fn project_state_url_trims_trailing_slash() {
        assert_eq!(
            project_state_url("https://scan.example.com/", 12),
            "https://scan.example.com/CxWebClient/portal#/projectState/12/Summary"
        );
    }

    #[test]
    fn scm_only_detection() {
        let ctx = RunContext::new(1, "/ws");
        assert!(ctx.triggered_only_by_scm());
        let ctx = ctx.with_causes(vec![BuildCause::Scm]);
        assert!(ctx.triggered_only_by_scm());
        let ctx = ctx.with_causes(vec![BuildCause::Scm, BuildCause::User]);
        assert!(!ctx.triggered_only_by_scm());
    }

    #[test]
    fn builder_creates_event_channel() {
        let fx = Fixture::new();
        let (_, rx) = ScanControllerBuilder::new(Arc::new(MockScanService::new()), Arc::clone(&fx.archiver))
            .job(job())
            .server(server())
            .build()
            .unwrap();
        assert!(rx.is_some());
    }

    #[test]
    fn builder_registers_metric_descriptions() {
        let fx = Fixture::new();
        for _ in 0..2 {
            ScanControllerBuilder::new(Arc::new(MockScanService::new()), Arc::clone(&fx.archiver))
                .job(job())
                .server(server())
                .build()
                .unwrap();
        }
        assert!(DESCRIBE_METRICS.is_completed());
    }

    #[test]
    fn builder_with_external_event_sender() {
        let fx = Fixture::new();
        let (tx, _rx) = mpsc::channel(4);
        let (_, rx) = ScanControllerBuilder::new(Arc::new(MockScanService::new()), Arc::clone(&fx.archiver))
            .job(job())
            .server(server())
            .event_sender(tx)
            .build()
            .unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn builder_rejects_missing_project_and_bad_url() {
        let fx = Fixture::new();
        let result = ScanControllerBuilder::new(Arc::new(MockScanService::new()), Arc::clone(&fx.archiver))
            .server(server())
            .build();
        assert!(matches!(result, Err(EngineError::Config { ref field, .. }) if field == "job.project_name"));

        let result = ScanControllerBuilder::new(Arc::new(MockScanService::new()), Arc::clone(&fx.archiver))
            .job(job())
            .server(ServerConfig {
                url: "scan.example.com".to_owned(),
                ..server()
            })
            .build();
        assert!(matches!(result, Err(EngineError::Config { ref field, .. }) if field == "server.url"));
    }

    #[test]
    fn builder_from_config_uses_job_server() {
        let fx = Fixture::new();
        let mut config = ScangateConfig::default();
        config.server = server();
        config.job = job();
        config.job.own_server = Some(ServerConfig {
            url: "https://own.example.com".to_owned(),
            username: "job-user".to_owned(),
            password: "job-secret".to_owned(),
        });
        config.global.scan_timeout_enabled = true;
        config.global.scan_timeout_minutes = 2;

        let (controller, _) =
            ScanControllerBuilder::from_config(Arc::new(MockScanService::new()), Arc::clone(&fx.archiver), &config)
                .build()
                .unwrap();
        assert_eq!(controller.server.url, "https://own.example.com");
        assert_eq!(controller.config().scan_timeout_secs, Some(120));
    }

    #[tokio::test]
    async fn synchronous_run_parses_report_and_publishes_artifacts() {
        let fx = Fixture::new();
        let (controller, mut rx, client) =
            build(MockScanService::new().with_report_xml(REPORT), &fx, job(), GlobalPolicy::default());

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, BuildOutcome::Success);
        assert_eq!(report.scan_kind, Some(ScanKind::Full));
        let sast = report.sast.as_ref().unwrap();
        assert!(sast.valid);
        assert_eq!(sast.project_id, 77);
        assert_eq!(sast.scan_id, Some(1001));
        assert_eq!(sast.counts.high, 2);
        assert_eq!(sast.counts.medium, 1);
        assert!(sast.metadata.deep_link.starts_with("https://scan.example.com/CxWebClient/"));
        assert!(sast.thresholds.is_none());
        assert!(report.osa.is_none());

        let reports = fx.workspace_reports();
        assert!(reports.join(SUMMARY_FILE).exists());
        assert!(reports.join("ScanReport.xml").exists());
        assert!(!reports.join("ScanReport.pdf").exists());
        assert!(!fx.archiver.any_left_behind());
        assert!(!client.called("cancel_scan"));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.metadata.trace_id, report.run_id);
        assert_eq!(
            event.kind,
            BuildEventKind::Completed {
                outcome: BuildOutcome::Success,
                violations: Vec::new(),
            }
        );
    }

    #[tokio::test]
    async fn threshold_violation_sets_configured_outcome() {
        let fx = Fixture::new();
        let job = JobConfig {
            thresholds_enabled: true,
            sast_limits: SeverityLimits {
                high: Some(1),
                medium: Some(1),
                low: None,
            },
            status_on_threshold_violation: BuildOutcome::Unstable,
            ..job()
        };
        let (controller, _rx, _) =
            build(MockScanService::new().with_report_xml(REPORT), &fx, job, GlobalPolicy::default());

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, BuildOutcome::Unstable);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(
            report.violations[0].to_string(),
            "SAST high Severity Results are Above Threshold. Results: 2. Threshold: 1"
        );
        assert!(report.sast.unwrap().thresholds.is_some());
    }

    #[tokio::test]
    async fn locked_global_thresholds_override_job() {
        let fx = Fixture::new();
        let job = JobConfig {
            wait_for_results: false,
            thresholds_enabled: false,
            sast_limits: SeverityLimits {
                high: Some(100),
                ..SeverityLimits::default()
            },
            ..job()
        };
        let global = GlobalPolicy {
            force_thresholds: true,
            lock_thresholds: true,
            sast_limits: SeverityLimits {
                medium: Some(0),
                ..SeverityLimits::default()
            },
            ..GlobalPolicy::default()
        };
        let (controller, _rx, client) =
            build(MockScanService::new().with_report_xml(REPORT), &fx, job, global);

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        // 잠금은 비동기 설정보다 우선하여 결과를 기다립니다.
        assert!(client.called("poll_status"));
        assert_eq!(report.outcome, BuildOutcome::Failure);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn duplicate_scan_is_skipped_with_success() {
        let fx = Fixture::new();
        let job = JobConfig {
            avoid_duplicate_scans: true,
            ..job()
        };
        let (controller, mut rx, client) = build(
            MockScanService::new().with_existing_project(12).with_queued_scans(),
            &fx,
            job,
            GlobalPolicy::default(),
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, BuildOutcome::Success);
        assert_eq!(report.skipped, Some(SkipReason::DuplicateScan));
        assert!(!client.called("submit_scan"));
        assert_eq!(fx.archiver.created_count(), 0);
        assert_eq!(
            rx.try_recv().unwrap().kind,
            BuildEventKind::Skipped {
                reason: SkipReason::DuplicateScan
            }
        );
    }

    #[tokio::test]
    async fn scm_triggered_build_is_skipped_without_login() {
        let fx = Fixture::new();
        let job = JobConfig {
            skip_scm_triggers: true,
            ..job()
        };
        let (controller, _rx, client) =
            build(MockScanService::new(), &fx, job, GlobalPolicy::default());

        let ctx = fx.context().with_causes(vec![BuildCause::Scm]);
        let report = controller.run(&ctx, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.skipped, Some(SkipReason::ScmTrigger));
        assert_eq!(report.outcome, BuildOutcome::Success);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn user_cause_is_not_skipped() {
        let fx = Fixture::new();
        let job = JobConfig {
            skip_scm_triggers: true,
            ..job()
        };
        let (controller, _rx, client) = build(
            MockScanService::new().with_report_xml(REPORT),
            &fx,
            job,
            GlobalPolicy::default(),
        );

        let ctx = fx
            .context()
            .with_causes(vec![BuildCause::Scm, BuildCause::User]);
        let report = controller.run(&ctx, &CancellationToken::new()).await.unwrap();

        assert!(report.skipped.is_none());
        assert!(client.called("submit_scan"));
    }

    #[tokio::test]
    async fn asynchronous_run_records_pending_result() {
        let fx = Fixture::new();
        let job = JobConfig {
            wait_for_results: false,
            ..job()
        };
        let (controller, mut rx, client) =
            build(MockScanService::new(), &fx, job, GlobalPolicy::default());

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        let sast = report.sast.unwrap();
        assert!(sast.asynchronous);
        assert_eq!(
            sast.project_state_url,
            "https://scan.example.com/CxWebClient/portal#/projectState/77/Summary"
        );
        assert_eq!(report.outcome, BuildOutcome::Success);
        assert!(!client.called("poll_status"));
        assert!(!fx.archiver.any_left_behind());
        assert!(matches!(
            rx.try_recv().unwrap().kind,
            BuildEventKind::Pending { project_id: 77, .. }
        ));
    }

    #[tokio::test]
    async fn incremental_schedule_reaches_request() {
        let fx = Fixture::new();
        let job = JobConfig {
            incremental: true,
            full_scans_scheduled: true,
            full_scan_cycle: 9,
            ..job()
        };
        let client = MockScanService::new()
            .with_report_xml(REPORT)
            .with_statuses(vec![
                ScanStatus::Finished { scan_id: 1001 },
                ScanStatus::Finished { scan_id: 1002 },
            ]);
        let (controller, _rx, _) = build(client, &fx, job, GlobalPolicy::default());

        let ctx = RunContext::new(12,&fx.workspace).with_build_dir(&fx.build_dir);
        let report = controller.run(&ctx, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.scan_kind, Some(ScanKind::Incremental));

        let ctx = RunContext::new(11, &fx.workspace).with_build_dir(&fx.build_dir);
        let report = controller.run(&ctx, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.scan_kind, Some(ScanKind::Full));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_unstable_and_skips_reports() {
        let fx = Fixture::new();
        let config = EngineConfig {
            poll_interval_secs: 1,
            scan_timeout_secs: Some(5),
            ..EngineConfig::default()
        };
        let (controller, mut rx, client) = build_with(
            MockScanService::new().with_statuses(Vec::new()),
            &fx,
            job(),
            GlobalPolicy::default(),
            config,
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.timed_out);
        assert_eq!(report.outcome, BuildOutcome::Unstable);
        assert!(report.sast.is_none());
        assert!(!client.called("generate_report"));
        assert!(!client.called("cancel_scan"));
        assert!(!fx.workspace_reports().exists());
        assert!(matches!(
            rx.try_recv().unwrap().kind,
            BuildEventKind::Completed {
                outcome: BuildOutcome::Unstable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn creation_denied_fails_without_packaging() {
        let fx = Fixture::new();
        let global = GlobalPolicy {
            prohibit_project_creation: true,
            ..GlobalPolicy::default()
        };
        let (controller, _rx, client) = build(MockScanService::new(), &fx, job(), global);

        let err = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::CreationDenied { .. }));
        assert!(!client.called("submit_scan"));
        assert_eq!(fx.archiver.created_count(), 0);
    }

    #[tokio::test]
    async fn error_policy_unstable_downgrades_failure() {
        let fx = Fixture::new();
        let global = GlobalPolicy {
            prohibit_project_creation: true,
            ..GlobalPolicy::default()
        };
        let job = JobConfig {
            status_on_error: ErrorPolicy::Unstable,
            ..job()
        };
        let (controller, mut rx, _) = build(MockScanService::new(), &fx, job, global);

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, BuildOutcome::Unstable);
        assert!(report.error.unwrap().contains("payments"));
        assert!(matches!(rx.try_recv().unwrap().kind, BuildEventKind::Completed { .. }));
    }

    #[tokio::test]
    async fn global_error_policy_is_followed() {
        let fx = Fixture::new();
        let global = GlobalPolicy {
            status_on_error: BuildOutcome::Unstable,
            ..GlobalPolicy::default()
        };
        let (controller, _rx, _) = build(
            MockScanService::new().with_failing("submit_scan"),
            &fx,
            job(),
            global,
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, BuildOutcome::Unstable);
        assert!(!fx.archiver.any_left_behind());
    }

    #[tokio::test]
    async fn login_rejected_stops_before_project_lookup() {
        let fx = Fixture::new();
        let (controller, _rx, client) = build(
            MockScanService::new().with_login_rejected(),
            &fx,
            job(),
            GlobalPolicy::default(),
        );

        let err = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::LoginRejected(_)));
        assert!(!client.called("resolve_project_id"));
    }

    #[tokio::test]
    async fn packaging_failure_propagates_and_cleans_archive() {
        let fx = Fixture::with_archiver(|dir| {
            MockArchiver::new(dir).with_failure(MockArchiveFailure::TooLarge)
        });
        let (controller, _rx, client) =
            build(MockScanService::new(), &fx, job(), GlobalPolicy::default());

        let err = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TooLarge { .. }));
        assert!(!client.called("submit_scan"));
        assert!(!fx.archiver.any_left_behind());
    }

    #[tokio::test]
    async fn cancel_during_polling_cancels_remote_scan() {
        let fx = Fixture::new();
        let (controller, _rx, client) = build(
            MockScanService::new().with_statuses(Vec::new()),
            &fx,
            job(),
            GlobalPolicy::default(),
        );

        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(100));
        let err = controller.run(&fx.context(), &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(client.called("cancel_scan"));
        assert!(!client.called("generate_report"));
        assert!(!fx.archiver.any_left_behind());
    }

    #[tokio::test]
    async fn cancel_during_report_cancels_report_generation() {
        let fx = Fixture::new();
        let (controller, _rx, client) = build(
            MockScanService::new().with_hanging_report(),
            &fx,
            job(),
            GlobalPolicy::default(),
        );

        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(100));
        let err = controller.run(&fx.context(), &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(client.called("cancel_report"));
        assert!(!client.called("cancel_scan"));
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_calls() {
        let fx = Fixture::new();
        let (controller, _rx, client) =
            build(MockScanService::new(), &fx, job(), GlobalPolicy::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = controller.run(&fx.context(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn osa_without_license_yields_no_result() {
        let fx = Fixture::new();
        let mut job = job();
        job.osa.enabled = true;
        let (controller, _rx, client) = build(
            MockScanService::new().with_report_xml(REPORT).with_license(false),
            &fx,
            job,
            GlobalPolicy::default(),
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        let osa = report.osa.unwrap();
        assert!(!osa.returned_result);
        assert!(!client.called("submit_osa_scan"));
        assert_eq!(report.outcome, BuildOutcome::Success);
        // SAST 패키징 한 번만
        assert_eq!(fx.archiver.created_count(), 1);
    }

    #[tokio::test]
    async fn osa_violation_uses_osa_counts() {
        let fx = Fixture::new();
        let mut job = JobConfig {
            thresholds_enabled: true,
            osa_limits: SeverityLimits {
                high: Some(0),
                medium: Some(5),
                low: None,
            },
            ..job()
        };
        job.osa.enabled = true;
        let summary = OsaSummary {
            counts: SeverityCounts {
                high: 1,
                medium: 0,
                low: 7,
                info: 0,
            },
            vulnerable_libraries: 2,
            clean_libraries: 40,
        };
        let (controller, _rx, _) = build(
            MockScanService::new()
                .with_report_xml(REPORT)
                .with_osa_summary(summary),
            &fx,
            job,
            GlobalPolicy::default(),
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, BuildOutcome::Failure);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].track, ScanTrack::Osa);
        assert_eq!(report.violations[0].severity, Severity::High);
        let osa = report.osa.unwrap();
        assert!(osa.returned_result);
        assert!(osa.thresholds.is_some());
        assert!(fx.workspace_reports().join("OSAReport.html").exists());
        assert_eq!(fx.archiver.created_count(), 2);
        assert!(!fx.archiver.any_left_behind());
    }

    #[tokio::test]
    async fn malformed_report_is_invalid_and_run_continues() {
        let fx = Fixture::new();
        let (controller, _rx, _) = build(
            MockScanService::new().with_report_xml("<CxXMLResults><Query name=\"A\""),
            &fx,
            job(),
            GlobalPolicy::default(),
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        let sast = report.sast.unwrap();
        assert!(!sast.valid);
        assert_eq!(sast.counts.total(), 0);
        assert_eq!(sast.scan_id, Some(1001));
        assert_eq!(report.outcome, BuildOutcome::Success);
        assert!(fx.workspace_reports().join(SUMMARY_FILE).exists());
    }

    #[tokio::test]
    async fn pdf_report_is_retrieved_when_configured() {
        let fx = Fixture::new();
        let job = JobConfig {
            generate_pdf_report: true,
            ..job()
        };
        let (controller, _rx, _) = build(
            MockScanService::new().with_report_xml(REPORT),
            &fx,
            job,
            GlobalPolicy::default(),
        );

        controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(fx.workspace_reports().join("ScanReport.pdf").exists());
    }

    #[tokio::test]
    async fn summary_document_round_trips() {
        let fx = Fixture::new();
        let (controller, _rx, _) = build(
            MockScanService::new().with_report_xml(REPORT),
            &fx,
            job(),
            GlobalPolicy::default(),
        );

        let report = controller
            .run(&fx.context(), &CancellationToken::new())
            .await
            .unwrap();

        let json = std::fs::read_to_string(fx.workspace_reports().join(SUMMARY_FILE)).unwrap();
        let stored: BuildReport = serde_json::from_str(&json).unwrap();
        assert_eq!(stored.run_id, report.run_id);
        assert_eq!(stored.sast.unwrap().counts.high, 2);
    }
}
