//! 스캔 엔진 에러 타입
//!
//! [`EngineError`]는 스캔 파이프라인 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<EngineError> for ScangateError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **설정**: `LoginRejected`, `LicenseMissing`, `CreationDenied`, `Config`
//! - **패키징**: `TooLarge`, `NoMatchingFiles`, `Archive`
//! - **원격 서비스**: `Remote`, `RemoteTimeout`, `ScanFailed`, `Io`
//! - **보고서 파싱**: `ReportParse` (파이프라인 내부에서 복구됨)
//! - **취소**: `Cancelled`
//!
//! 임계값 위반은 에러가 아니라 [`Violation`](crate::threshold::Violation) 값입니다.

use std::fmt;

use scangate_core::error::{EngineFailure, ScangateError};

/// 스캔 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 로그인 거부 (잘못된 자격 증명)
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// OSA 라이선스 없음
    #[error(
        "open source analysis license is not enabled for this project, contact your administrator"
    )]
    LicenseMissing,

    /// 프로젝트 생성 금지 정책으로 새 프로젝트를 만들 수 없음
    #[error("creation of new project '{project}' is not authorized, use an existing project")]
    CreationDenied {
        /// 요청된 프로젝트 이름
        project: String,
    },

    /// 엔진 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 패키징 크기 제한 초과
    #[error("reached maximum upload size limit of {limit_bytes} bytes when packaging '{file}'")]
    TooLarge {
        /// 제한에 도달한 시점의 파일
        file: String,
        /// 최대 업로드 크기 (바이트)
        limit_bytes: u64,
    },

    /// 필터 패턴에 일치하는 파일 없음
    #[error("no files to scan")]
    NoMatchingFiles,

    /// 패키징 중 I/O 실패
    #[error("packaging failed: {0}")]
    Archive(String),

    /// 원격 서비스 호출 실패
    #[error("remote {operation} failed: {reason}")]
    Remote {
        /// 호출한 원격 작업 이름
        operation: &'static str,
        /// 실패 사유
        reason: String,
    },

    /// 원격 호출 타임아웃
    #[error("remote {operation} timed out after {secs}s")]
    RemoteTimeout {
        /// 호출한 원격 작업 이름
        operation: &'static str,
        /// 적용된 타임아웃 (초)
        secs: u64,
    },

    /// 원격 서비스가 스캔 실패를 보고함
    #[error("scan failed on the remote service: {0}")]
    ScanFailed(String),

    /// 보고서 파싱 실패
    #[error("report parse error: {0}")]
    ReportParse(String),

    /// 보고서/산출물 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 외부 취소 신호
    #[error("run cancelled")]
    Cancelled,
}

/// 에러 분류
///
/// 컨트롤러는 이 분류로 중단 여부와 빌드 결과 강등 정책을 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 자격 증명, 라이선스, 생성 권한
    Configuration,
    /// 소스 패키징
    Packaging,
    /// 원격 서비스 통신
    RemoteService,
    /// 보고서 파싱 (로컬 복구)
    ReportParsing,
    /// 취소
    Cancelled,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Packaging => "packaging",
            Self::RemoteService => "remote_service",
            Self::ReportParsing => "report_parsing",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl EngineError {
    /// 에러의 분류를 반환합니다.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LoginRejected(_)
            | Self::LicenseMissing
            | Self::CreationDenied { .. }
            | Self::Config { .. } => ErrorCategory::Configuration,
            Self::TooLarge { .. } | Self::NoMatchingFiles | Self::Archive(_) => {
                ErrorCategory::Packaging
            }
            Self::Remote { .. } | Self::RemoteTimeout { .. } | Self::ScanFailed(_) | Self::Io { .. } => {
                ErrorCategory::RemoteService
            }
            Self::ReportParse(_) => ErrorCategory::ReportParsing,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// 원격 호출 실패 에러를 생성합니다.
    pub fn remote(operation: &'static str, reason: impl fmt::Display) -> Self {
        Self::Remote {
            operation,
            reason: reason.to_string(),
        }
    }

    /// 취소 에러인지 확인합니다.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<EngineError> for ScangateError {
    fn from(err: EngineError) -> Self {
        let failure = match err.category() {
            ErrorCategory::Configuration => EngineFailure::Configuration(err.to_string()),
            ErrorCategory::Packaging => EngineFailure::Packaging(err.to_string()),
            ErrorCategory::RemoteService => EngineFailure::RemoteService(err.to_string()),
            ErrorCategory::ReportParsing => EngineFailure::ReportParsing(err.to_string()),
            ErrorCategory::Cancelled => EngineFailure::Cancelled,
        };
        ScangateError::Engine(failure)
    }
}
