//! 소스 패키징 인터페이스
//!
//! 압축 알고리즘은 호스트가 제공하는 [`Archiver`] 구현의 몫입니다.
//! 엔진은 필터 패턴을 조합해 넘기고, 돌려받은 [`ArchiveHandle`]의 수명을 관리합니다.
//!
//! [`ArchiveHandle`]은 범위 기반 자원입니다. 성공, 모든 실패, 취소 경로에서
//! 핸들이 drop될 때 임시 파일이 삭제되며, 첫 삭제가 실패하면 한 번 더 시도합니다.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use scangate_core::config::{GlobalPolicy, JobConfig, OsaJobConfig};

use crate::error::EngineError;

/// 패키징 대상 파일 필터 패턴
///
/// 쉼표로 구분된 glob 목록이며, `!`로 시작하는 항목은 제외 패턴입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPattern(String);

impl FilterPattern {
    /// 필터 패턴과 제외 폴더 목록을 하나의 패턴으로 조합합니다.
    ///
    /// 제외 폴더 `a, b`는 `!**/a/**/*, !**/b/**/*`가 되어 필터 패턴 뒤에 붙습니다.
    pub fn compose(filter_pattern: &str, exclude_folders: &str) -> Self {
        let mut parts: Vec<String> = Vec::new();
        let filter = filter_pattern.trim();
        if !filter.is_empty() {
            parts.push(filter.to_owned());
        }
        parts.extend(
            exclude_folders
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(|f| format!("!**/{f}/**/*")),
        );
        Self(parts.join(", "))
    }

    /// SAST 패키징 패턴. 잡 값이 비어 있으면 전역 값으로 대체합니다.
    pub fn for_job(global: &GlobalPolicy, job: &JobConfig) -> Self {
        let filter = if job.filter_pattern.trim().is_empty() {
            &global.filter_pattern
        } else {
            &job.filter_pattern
        };
        let exclude = if job.exclude_folders.trim().is_empty() {
            &global.exclude_folders
        } else {
            &job.exclude_folders
        };
        Self::compose(filter, exclude)
    }

    /// OSA 패키징 패턴 (포함 패턴 + 제외 폴더)
    pub fn for_osa(osa: &OsaJobConfig) -> Self {
        Self::compose(&osa.include, &osa.exclude)
    }

    /// 패턴 문자열
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 패키징된 소스 임시 파일
///
/// drop 시 파일을 삭제합니다.
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
}

impl ArchiveHandle {
    /// 이미 생성된 임시 파일을 소유하는 핸들을 만듭니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 임시 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArchiveHandle {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "temporary archive deleted"),
            Err(first) => {
                warn!(
                    path = %self.path.display(),
                    error = %first,
                    "failed to delete temporary archive, retrying"
                );
                if let Err(second) = std::fs::remove_file(&self.path) {
                    error!(
                        path = %self.path.display(),
                        error = %second,
                        "failed to delete temporary archive"
                    );
                    metrics::counter!(scangate_core::metrics::ARCHIVE_CLEANUP_FAILURES_TOTAL)
                        .increment(1);
                }
            }
        }
    }
}

/// 소스 패키징 협력자
///
/// # Errors
///
/// - [`EngineError::TooLarge`]: 업로드 크기 제한 초과
/// - [`EngineError::NoMatchingFiles`]: 패턴에 일치하는 파일 없음
/// - [`EngineError::Archive`]: 패키징 중 I/O 실패
pub trait Archiver: Send + Sync + 'static {
    /// `base_dir` 아래에서 `pattern`에 일치하는 파일을 패키징합니다.
    fn archive(
        &self,
        base_dir: &Path,
        pattern: &FilterPattern,
    ) -> impl Future<Output = Result<ArchiveHandle, EngineError>> + Send;
}

#[cfg(test)]
use std::sync::Mutex;

/// 테스트용 패키징 실패 종류
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub enum MockArchiveFailure {
    /// 크기 제한 초과
    TooLarge,
    /// 일치 파일 없음
    NoMatchingFiles,
    /// I/O 실패
    Io,
}

/// 테스트용 Mock 패키저
///
/// 지정된 디렉토리에 임시 파일을 만들고 그 경로를 기록합니다.
#[cfg(test)]
pub struct MockArchiver {
    dir: PathBuf,
    failure: Option<MockArchiveFailure>,
    /// 생성한 파일 경로
    pub created: Mutex<Vec<PathBuf>>,
    /// 전달받은 패턴
    pub patterns: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockArchiver {
    /// `dir`에 임시 파일을 만드는 mock을 생성합니다.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            failure: None,
            created: Mutex::new(Vec::new()),
            patterns: Mutex::new(Vec::new()),
        }
    }

    /// 패키징이 실패하도록 설정합니다.
    pub fn with_failure(mut self, failure: MockArchiveFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// 생성된 파일 중 아직 존재하는 것이 있는지 확인합니다.
    pub fn any_left_behind(&self) -> bool {
        self.created.lock().unwrap().iter().any(|p| p.exists())
    }

    /// 생성된 파일 수
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[cfg(test)]
impl Archiver for MockArchiver {
    async fn archive(
        &self,
        _base_dir: &Path,
        pattern: &FilterPattern,
    ) -> Result<ArchiveHandle, EngineError> {
        self.patterns.lock().unwrap().push(pattern.as_str().to_owned());
        let index = self.created.lock().unwrap().len();
        let path = self.dir.join(format!("source-{index}.zip"));
        std::fs::write(&path, b"PK mock").map_err(|e| EngineError::Archive(e.to_string()))?;
        self.created.lock().unwrap().push(path.clone());
        let handle = ArchiveHandle::new(path);

        match self.failure {
            None => Ok(handle),
            Some(MockArchiveFailure::TooLarge) => Err(EngineError::TooLarge {
                file: "big.bin".to_owned(),
                limit_bytes: 1024,
            }),
            Some(MockArchiveFailure::NoMatchingFiles) => Err(EngineError::NoMatchingFiles),
            Some(MockArchiveFailure::Io) => Err(EngineError::Archive("disk full".to_owned())),
        }
    }
}
