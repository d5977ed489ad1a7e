//! 빌드 이벤트
//!
//! [`BuildEvent`]는 컨트롤러가 결과 싱크(`tokio::mpsc` 채널)로 보내는 이벤트입니다.
//! core의 [`Event`] trait을 구현하며, 한 실행에서 나온 이벤트는 실행 ID를
//! trace ID로 공유합니다.
//!
//! # 사용 예시
//!
//! ```
//! use scangate_core::event::Event;
//! use scangate_engine::event::{BuildEvent, BuildEventKind, SkipReason};
//!
//! let event = BuildEvent::new("run-1", BuildEventKind::Skipped {
//!     reason: SkipReason::DuplicateScan,
//! });
//! assert_eq!(event.event_type(), "build");
//! assert_eq!(event.metadata().trace_id, "run-1");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use scangate_core::event::{EVENT_TYPE_BUILD, Event, EventMetadata, MODULE_SCAN_ENGINE};
use scangate_core::types::BuildOutcome;

use crate::threshold::Violation;

/// 스캔 없이 끝난 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 모든 빌드 원인이 SCM 트리거
    ScmTrigger,
    /// 프로젝트에 대기 중인 스캔이 있음
    DuplicateScan,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScmTrigger => write!(f, "scm trigger"),
            Self::DuplicateScan => write!(f, "duplicate scan"),
        }
    }
}

/// 빌드 이벤트 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEventKind {
    /// 스캔 없이 성공으로 종료
    Skipped {
        /// 사유
        reason: SkipReason,
    },
    /// 비동기 모드로 제출만 하고 종료
    Pending {
        /// 프로젝트 ID
        project_id: u64,
        /// 원격 프로젝트 화면 링크
        project_state_url: String,
    },
    /// 파이프라인 완료
    Completed {
        /// 최종 빌드 결과
        outcome: BuildOutcome,
        /// 임계값 위반 목록
        violations: Vec<Violation>,
    },
}

/// 빌드 이벤트
#[derive(Debug, Clone)]
pub struct BuildEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터 (trace ID = 실행 ID)
    pub metadata: EventMetadata,
    /// 이벤트 내용
    pub kind: BuildEventKind,
}

impl BuildEvent {
    /// 실행 ID에 연결된 이벤트를 생성합니다.
    pub fn new(run_id: impl Into<String>, kind: BuildEventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_SCAN_ENGINE, run_id),
            kind,
        }
    }
}

impl Event for BuildEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_BUILD
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.id[..8.min(self.id.len())];
        match &self.kind {
            BuildEventKind::Skipped { reason } => write!(f, "BuildEvent[{id}] skipped ({reason})"),
            BuildEventKind::Pending { project_id, .. } => {
                write!(f, "BuildEvent[{id}] pending project={project_id}")
            }
            BuildEventKind::Completed {
                outcome,
                violations,
            } => write!(
                f,
                "BuildEvent[{id}] completed outcome={outcome} violations={}",
                violations.len()
            ),
        }
    }
}

/// 이벤트를 보냅니다. 채널이 가득 찼거나 닫혔으면 경고만 남깁니다.
pub fn publish(sender: &mpsc::Sender<BuildEvent>, event: BuildEvent) {
    if let Err(e) = sender.try_send(event) {
        warn!(error = %e, "failed to send build event (channel full or closed)");
    }
}
