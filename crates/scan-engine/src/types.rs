//! 도메인 타입 -- 스캔 엔진 전용 데이터 구조
//!
//! 스캔 요청, 원격 실행 핸들, 심각도 집계, 쿼리별 결과, 스캔 결과 등
//! 파이프라인 단계 사이를 오가는 핵심 타입을 정의합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use scangate_core::types::Severity;

use crate::threshold::ThresholdConfig;

/// 스캔 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    /// 전체 재분석
    Full,
    /// 변경된 코드만 분석
    Incremental,
}

impl ScanKind {
    /// 증분 스캔 여부
    pub fn is_incremental(&self) -> bool {
        matches!(self, Self::Incremental)
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

/// 스캔 요청
///
/// 빌드마다 생성되며 제출 이후에는 변경되지 않습니다.
/// 패키징된 소스는 [`ArchiveHandle`](crate::archive::ArchiveHandle)로 함께 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// 프로젝트 이름
    pub project_name: String,
    /// 기존 프로젝트 ID (0이면 새 프로젝트)
    pub project_id: u64,
    /// 팀(그룹) ID
    pub group_id: String,
    /// 스캔 프리셋
    pub preset: String,
    /// 소스 인코딩 설정 ID
    pub source_encoding: String,
    /// 스캔 코멘트
    pub comment: String,
    /// 증분 스캔 여부
    pub incremental: bool,
}

/// 제출된 스캔의 원격 식별자
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    /// 원격 실행 ID
    pub run_id: String,
    /// 프로젝트 ID (새로 생성되었을 수 있음)
    pub project_id: u64,
}

/// 원격 스캔 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// 대기열에 있음
    Queued,
    /// 진행 중
    Running {
        /// 현재 단계 이름
        stage: String,
        /// 전체 진행률 (0-100)
        percent: u8,
    },
    /// 완료됨
    Finished {
        /// 보고서 요청에 사용하는 스캔 ID
        scan_id: u64,
    },
    /// 원격에서 실패함
    Failed {
        /// 실패 사유
        reason: String,
    },
    /// 원격에서 취소됨
    Cancelled,
}

/// 원격 세션
///
/// 로그인 성공 시 발급되며 이후 모든 원격 호출에 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 세션 토큰
    pub token: String,
}

/// 보고서 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportFormat {
    /// XML (집계 대상)
    Xml,
    /// PDF (보관용)
    Pdf,
}

impl ReportFormat {
    /// 보고서 디렉토리에 저장되는 파일 이름
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Xml => "ScanReport.xml",
            Self::Pdf => "ScanReport.pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml => write!(f, "XML"),
            Self::Pdf => write!(f, "PDF"),
        }
    }
}

/// 생성 요청된 보고서 핸들
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportHandle {
    /// 원격 보고서 ID
    pub id: u64,
    /// 보고서 형식
    pub format: ReportFormat,
}

/// 심각도별 결과 수
///
/// 오탐(false positive)으로 표시되지 않은 결과만 집계합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// High
    pub high: u32,
    /// Medium
    pub medium: u32,
    /// Low
    pub low: u32,
    /// Info
    pub info: u32,
}

impl SeverityCounts {
    /// 심각도에 대응하는 개수를 반환합니다.
    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    /// 심각도 버킷을 하나 증가시킵니다.
    pub fn increment(&mut self, severity: Severity) {
        let slot = match severity {
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Info => &mut self.info,
        };
        *slot = slot.saturating_add(1);
    }

    /// 전체 결과 수
    pub fn total(&self) -> u64 {
        u64::from(self.high) + u64::from(self.medium) + u64::from(self.low) + u64::from(self.info)
    }
}

/// 쿼리(규칙)별 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// 쿼리 이름 (예: `SQL_Injection`)
    pub name: String,
    /// 쿼리 심각도
    pub severity: Severity,
    /// 이 쿼리에서 집계된 결과 수
    pub count: u32,
}

impl QueryResult {
    /// 표시용 이름 (`_`를 공백으로 치환)
    pub fn pretty_name(&self) -> String {
        self.name.replace('_', " ")
    }
}

/// 보고서 루트 요소에서 읽은 스캔 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// 서버 UI로 연결되는 딥 링크 (재작성됨, 없으면 빈 문자열)
    pub deep_link: String,
    /// 스캔 시작 시각
    pub scan_start: String,
    /// 스캔 소요 시간
    pub scan_time: String,
    /// 스캔된 코드 줄 수
    pub lines_of_code_scanned: String,
    /// 스캔된 파일 수
    pub files_scanned: String,
    /// 스캔 종류
    pub scan_type: String,
}

/// SAST 스캔 결과
///
/// 파싱 전에 생성되어 집계기가 채우고, 이후 빌드 기록에 읽기 전용으로 첨부됩니다.
/// 완전히 채워진 유효한 결과이거나, 에러 메시지와 0 개수를 가진 무효 결과 중 하나입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// 프로젝트 ID
    pub project_id: u64,
    /// 스캔 ID (비동기 모드에서는 없음)
    pub scan_id: Option<u64>,
    /// 비동기 모드로 제출만 하고 끝났는지 여부
    pub asynchronous: bool,
    /// 원격 프로젝트 화면 링크
    pub project_state_url: String,
    /// 심각도별 개수
    pub counts: SeverityCounts,
    /// 심각도별 쿼리 결과
    pub queries: BTreeMap<Severity, Vec<QueryResult>>,
    /// 보고서 메타데이터
    pub metadata: ScanMetadata,
    /// 결과 유효 여부
    pub valid: bool,
    /// 무효 결과의 에러 메시지
    pub error_message: Option<String>,
    /// 적용된 임계값 (임계값 평가가 비활성화면 없음)
    pub thresholds: Option<ThresholdConfig>,
}

impl ScanResult {
    /// 파싱 실패로 무효화된 결과를 생성합니다. 모든 개수는 0입니다.
    pub fn invalid(error_message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_message: Some(error_message.into()),
            ..Self::default()
        }
    }

    /// 비동기 모드의 대기 중 결과를 생성합니다.
    pub fn pending(project_id: u64, project_state_url: impl Into<String>) -> Self {
        Self {
            project_id,
            asynchronous: true,
            project_state_url: project_state_url.into(),
            valid: true,
            ..Self::default()
        }
    }

    /// 심각도에 해당하는 쿼리 결과 목록
    pub fn queries_for(&self, severity: Severity) -> &[QueryResult] {
        self.queries
            .get(&severity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// 원격 서비스가 돌려주는 OSA 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsaSummary {
    /// 심각도별 취약점 수
    pub counts: SeverityCounts,
    /// 취약하거나 오래된 라이브러리 수
    pub vulnerable_libraries: u32,
    /// 취약점 없는 라이브러리 수
    pub clean_libraries: u32,
}

/// OSA 스캔 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsaScanResult {
    /// OSA가 이 빌드에서 활성화되었는지
    pub enabled: bool,
    /// 평가 가능한 결과가 반환되었는지
    pub returned_result: bool,
    /// 원격 OSA 스캔 ID
    pub scan_id: Option<String>,
    /// 심각도별 개수
    pub counts: SeverityCounts,
    /// 취약하거나 오래된 라이브러리 수
    pub vulnerable_libraries: u32,
    /// 취약점 없는 라이브러리 수
    pub clean_libraries: u32,
    /// 실패 사유 (결과가 없을 때)
    pub error_message: Option<String>,
    /// 적용된 임계값
    pub thresholds: Option<ThresholdConfig>,
}

impl OsaScanResult {
    /// 결과 없이 종료된 OSA 실행을 나타냅니다.
    pub fn no_result(error_message: impl Into<String>) -> Self {
        Self {
            enabled: true,
            returned_result: false,
            error_message: Some(error_message.into()),
            ..Self::default()
        }
    }

    /// 원격 요약에서 결과를 생성합니다.
    pub fn from_summary(scan_id: impl Into<String>, summary: OsaSummary) -> Self {
        Self {
            enabled: true,
            returned_result: true,
            scan_id: Some(scan_id.into()),
            counts: summary.counts,
            vulnerable_libraries: summary.vulnerable_libraries,
            clean_libraries: summary.clean_libraries,
            error_message: None,
            thresholds: None,
        }
    }
}
