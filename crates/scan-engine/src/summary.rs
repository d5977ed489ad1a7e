//! 빌드 산출물 기록
//!
//! 보고서 디렉토리에 요약 문서(`summary.json`)를 쓰고, 디렉토리 내용을
//! 작업 공간의 보고서 폴더로 복사합니다. 산출물 기록 실패는 빌드 결과를 바꾸지 않으며
//! 파일 단위로 로그만 남깁니다.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// 요약 문서 파일 이름
pub const SUMMARY_FILE: &str = "summary.json";

/// 산출물 기록기
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    report_dir: PathBuf,
    workspace_reports_dir: PathBuf,
}

impl ArtifactWriter {
    /// `report_dir`의 내용을 `workspace_reports_dir`로 복사하는 기록기를 생성합니다.
    pub fn new(report_dir: impl Into<PathBuf>, workspace_reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            workspace_reports_dir: workspace_reports_dir.into(),
        }
    }

    /// 요약 문서를 보고서 디렉토리에 씁니다.
    pub async fn write_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf, EngineError> {
        let json = serde_json::to_vec_pretty(summary).map_err(|e| EngineError::Io {
            path: SUMMARY_FILE.to_owned(),
            source: std::io::Error::other(e),
        })?;
        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(|e| io_error(&self.report_dir, e))?;

        let path = self.report_dir.join(SUMMARY_FILE);
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), "summary written");
        Ok(path)
    }

    /// 보고서 디렉토리의 파일을 작업 공간 보고서 폴더로 복사합니다.
    ///
    /// 복사에 성공한 파일 수를 반환합니다. 개별 파일 실패는 경고 로그만 남깁니다.
    pub async fn copy_to_workspace(&self) -> Result<usize, EngineError> {
        tokio::fs::create_dir_all(&self.workspace_reports_dir)
            .await
            .map_err(|e| io_error(&self.workspace_reports_dir, e))?;

        let mut entries = tokio::fs::read_dir(&self.report_dir)
            .await
            .map_err(|e| io_error(&self.report_dir, e))?;

        let mut copied = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.report_dir.display(), error = %e, "failed to read report directory entry");
                    break;
                }
            };
            let source = entry.path();
            if !source.is_file() {
                continue;
            }
            let target = self.workspace_reports_dir.join(entry.file_name());
            match tokio::fs::copy(&source, &target).await {
                Ok(_) => copied += 1,
                Err(e) => warn!(
                    source = %source.display(),
                    target = %target.display(),
                    error = %e,
                    "failed to copy report to workspace"
                ),
            }
        }
        info!(
            copied,
            dir = %self.workspace_reports_dir.display(),
            "reports copied to workspace"
        );
        Ok(copied)
    }

    /// 요약을 쓰고 작업 공간으로 복사합니다. 실패는 로그만 남깁니다.
    pub async fn publish<T: Serialize>(&self, summary: &T) {
        if let Err(e) = self.write_summary(summary).await {
            warn!(error = %e, "failed to write summary");
        }
        if let Err(e) = self.copy_to_workspace().await {
            warn!(error = %e, "failed to copy reports to workspace");
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.display().to_string(),
        source,
    }
}
