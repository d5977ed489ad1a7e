//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 엔진, CLI, 설정이 공유하는 심각도, 빌드 결과, 스캔 트랙 등을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 원격 스캔 서비스가 보고하는 취약점 심각도입니다.
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성 결과
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
}

impl Severity {
    /// 임계값 평가 대상 심각도 (높은 순서)
    pub const THRESHOLDED: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    /// XML 보고서의 `SeverityIndex` 값에서 심각도를 파싱합니다.
    ///
    /// `0`=Info, `1`=Low, `2`=Medium, `3`=High. 그 외 값은 `None`.
    pub fn from_index(index: &str) -> Option<Self> {
        match index.trim() {
            "0" => Some(Self::Info),
            "1" => Some(Self::Low),
            "2" => Some(Self::Medium),
            "3" => Some(Self::High),
            _ => None,
        }
    }

    /// 진단 메시지와 메트릭 레이블에 쓰이는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// 빌드 결과
///
/// 호스트 CI 시스템에 보고되는 최종 상태입니다.
/// `Ord` 구현은 나쁜 쪽이 더 큽니다 (`Success < Unstable < Failure`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    /// 정상 통과
    #[default]
    Success,
    /// 불안정 (실패는 아님)
    Unstable,
    /// 실패
    Failure,
}

impl BuildOutcome {
    /// 두 결과 중 더 나쁜 쪽을 반환합니다.
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unstable => "unstable",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// 분석 트랙
///
/// 소스 코드 정적 분석(SAST)과 오픈소스 의존성 분석(OSA)은
/// 각자의 임계값으로 독립적으로 평가됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanTrack {
    /// 정적 소스 분석
    Sast,
    /// 오픈소스 의존성 분석
    Osa,
}

impl ScanTrack {
    /// 위반 메시지 앞에 붙는 트랙 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sast => "SAST",
            Self::Osa => "OSA",
        }
    }

    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sast => "sast",
            Self::Osa => "osa",
        }
    }
}

impl fmt::Display for ScanTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 심각도별 임계값
///
/// `None`은 해당 심각도에 제한이 없음을 뜻합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityLimits {
    /// High 허용 최대 개수
    pub high: Option<u32>,
    /// Medium 허용 최대 개수
    pub medium: Option<u32>,
    /// Low 허용 최대 개수
    pub low: Option<u32>,
}

impl SeverityLimits {
    /// 심각도에 대응하는 임계값을 반환합니다. Info는 항상 `None`.
    pub fn limit_for(&self, severity: Severity) -> Option<u32> {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => None,
        }
    }

    /// 하나 이상의 임계값이 설정되어 있는지 확인합니다.
    pub fn any_set(&self) -> bool {
        self.high.is_some() || self.medium.is_some() || self.low.is_some()
    }
}
