//! 중복 스캔 방지
//!
//! 제출 전에 프로젝트에 대기 중인 스캔이 있는지 원격 서비스에 묻습니다.
//! 중복 방지가 켜져 있고 대기 중인 스캔이 있으면 컨트롤러는 스캔 없이
//! 성공으로 파이프라인을 끝냅니다.

use tracing::info;

use crate::client::{Remote, ScanServiceClient};
use crate::error::EngineError;

/// 중복 스캔 가드
#[derive(Debug, Clone, Copy)]
pub struct DuplicateScanGuard {
    enabled: bool,
}

impl DuplicateScanGuard {
    /// 가드를 생성합니다. `enabled`가 false면 원격 확인을 하지 않습니다.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// 원격 서비스에 대기 중인 스캔이 있는지 묻습니다.
    pub async fn has_queued_scans<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        project_id: u64,
    ) -> Result<bool, EngineError> {
        remote
            .call(
                "project_has_queued_scans",
                remote
                    .client
                    .project_has_queued_scans(remote.session, project_id),
            )
            .await
    }

    /// 이번 실행을 건너뛰어야 하는지 판단합니다.
    ///
    /// 아직 존재하지 않는 프로젝트(ID 0)에는 대기 중인 스캔이 있을 수 없습니다.
    pub async fn should_skip<C: ScanServiceClient>(
        &self,
        remote: &Remote<'_, C>,
        project_id: u64,
    ) -> Result<bool, EngineError> {
        if !self.enabled || project_id == 0 {
            return Ok(false);
        }
        let queued = self.has_queued_scans(remote, project_id).await?;
        if queued {
            info!(project_id, "project already has a queued scan, avoiding duplicate scan");
            metrics::counter!(scangate_core::metrics::SCANS_SKIPPED_DUPLICATE_TOTAL).increment(1);
        }
        Ok(queued)
    }
}
