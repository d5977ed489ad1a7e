//! 스캔 제출
//!
//! [`ScanSubmitter`]는 프로젝트를 확인하고, 소스를 패키징하고, 스캔을 제출하여
//! [`RunHandle`]을 돌려줍니다.
//!
//! 패키징된 임시 파일은 [`ArchiveHandle`](crate::archive::ArchiveHandle)이 소유하므로
//! 제출 성공, 실패, 취소 어느 경로로 끝나도 이 함수를 벗어나면 삭제됩니다.

use std::path::Path;

use tracing::{Instrument, info, info_span};

use scangate_core::config::JobConfig;

use crate::archive::{Archiver, FilterPattern};
use crate::client::{Remote, ScanServiceClient};
use crate::error::EngineError;
use crate::types::{RunHandle, ScanKind, ScanRequest};

/// 잡 설정과 스캔 범위로 스캔 요청을 만듭니다.
pub fn build_request(job: &JobConfig, project_id: u64, kind: ScanKind) -> ScanRequest {
    ScanRequest {
        project_name: job.project_name.clone(),
        project_id,
        group_id: job.group_id.clone(),
        preset: job.preset.clone(),
        source_encoding: job.source_encoding.clone(),
        comment: job.comment.clone(),
        incremental: kind.is_incremental(),
    }
}

/// 스캔 제출기
pub struct ScanSubmitter<'r, 'a, C, A> {
    remote: &'r Remote<'a, C>,
    archiver: &'r A,
    prohibit_project_creation: bool,
}

impl<'r, 'a, C: ScanServiceClient, A: Archiver> ScanSubmitter<'r, 'a, C, A> {
    /// 제출기를 생성합니다.
    pub fn new(remote: &'r Remote<'a, C>, archiver: &'r A, prohibit_project_creation: bool) -> Self {
        Self {
            remote,
            archiver,
            prohibit_project_creation,
        }
    }

    /// 프로젝트 이름과 그룹으로 기존 프로젝트 ID를 찾습니다. 없으면 0.
    pub async fn resolve_project(&self, name: &str, group_id: &str) -> Result<u64, EngineError> {
        let id = self
            .remote
            .call(
                "resolve_project_id",
                self.remote
                    .client
                    .resolve_project_id(self.remote.session, name, group_id),
            )
            .await?;
        if id == 0 {
            info!(project = name, "project does not exist yet");
        } else {
            info!(project = name, project_id = id, "project resolved");
        }
        Ok(id)
    }

    /// 소스를 패키징하고 스캔을 제출합니다.
    ///
    /// 새 프로젝트가 필요한데 생성이 금지되어 있으면 패키징이나 원격 제출 없이
    /// [`EngineError::CreationDenied`]로 즉시 실패합니다.
    pub async fn submit(
        &self,
        request: &ScanRequest,
        base_dir: &Path,
        pattern: &FilterPattern,
    ) -> Result<RunHandle, EngineError> {
        if request.project_id == 0 && self.prohibit_project_creation {
            return Err(EngineError::CreationDenied {
                project: request.project_name.clone(),
            });
        }

        let archive = tokio::select! {
            biased;
            _ = self.remote.cancel.cancelled() => return Err(EngineError::Cancelled),
            res = self
                .archiver
                .archive(base_dir, pattern)
                .instrument(info_span!("packaging")) => res?,
        };
        info!(archive = %archive.path().display(), "source packaged");

        let run = self
            .remote
            .call(
                "submit_scan",
                self.remote
                    .client
                    .submit_scan(self.remote.session, request, archive.path()),
            )
            .await?;

        let kind = if request.incremental { "incremental" } else { "full" };
        metrics::counter!(
            scangate_core::metrics::SCANS_SUBMITTED_TOTAL,
            scangate_core::metrics::LABEL_SCAN_KIND => kind
        )
        .increment(1);
        info!(
            run_id = %run.run_id,
            project_id = run.project_id,
            kind,
            "scan job submitted successfully"
        );
        Ok(run)
    }
}
