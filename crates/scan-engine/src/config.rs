//! 스캔 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`ScangateConfig`]에서 스캔 대기 타임아웃을 가져오고,
//! 엔진 고유 설정(폴링 간격, 원격 호출 타임아웃, 보고서 디렉토리)을 추가합니다.
//!
//! # 사용 예시
//!
//! ```
//! use scangate_engine::EngineConfig;
//!
//! // 기본값으로 생성
//! let config = EngineConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use scangate_engine::EngineConfigBuilder;
//!
//! let config = EngineConfigBuilder::new()
//!     .poll_interval_secs(5)
//!     .scan_timeout_secs(Some(3600))
//!     .build()
//!     .unwrap();
//! ```

use std::path::{Component, Path};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use scangate_core::config::ScangateConfig;

use crate::error::EngineError;

/// 스캔 엔진 설정
///
/// # 필드
///
/// - **poll_interval_secs**: 스캔 상태 폴링 간격
/// - **scan_timeout_secs**: 스캔 대기 타임아웃 (`None`이면 무제한)
/// - **request_timeout_secs**: 원격 호출 하나의 타임아웃
/// - **report_dir**: 보고서와 요약이 저장되는 빌드 디렉토리
/// - **workspace_reports_dir**: 보고서가 복사되는 작업 공간 하위 폴더 (상대 경로)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 스캔 상태 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 스캔 대기 타임아웃 (초). `None`이면 완료/취소까지 대기
    pub scan_timeout_secs: Option<u64>,
    /// 원격 호출 하나의 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 보고서 디렉토리
    pub report_dir: String,
    /// 작업 공간 안의 보고서 복사 위치 (상대 경로)
    pub workspace_reports_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            scan_timeout_secs: None,
            request_timeout_secs: 300,
            report_dir: "scangate".to_owned(),
            workspace_reports_dir: "scangate/reports".to_owned(),
        }
    }
}

/// 설정 상한값 상수
const MAX_POLL_INTERVAL_SECS: u64 = 3_600;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3_600;
const MAX_PATH_LEN: usize = 4096;

impl EngineConfig {
    /// core 설정에서 엔진 설정을 생성합니다.
    ///
    /// 스캔 타임아웃은 전역 정책에서 가져오고, 나머지는 기본값을 사용합니다.
    pub fn from_core(core: &ScangateConfig) -> Self {
        let scan_timeout_secs = core
            .global
            .scan_timeout_enabled
            .then(|| core.global.scan_timeout_minutes.saturating_mul(60));

        Self {
            scan_timeout_secs,
            ..Self::default()
        }
    }

    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// 스캔 대기 타임아웃
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }

    /// 원격 호출 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `poll_interval_secs`: 1-3600
    /// - `scan_timeout_secs`: 설정 시 1 이상
    /// - `request_timeout_secs`: 1-3600
    /// - `report_dir`: 비어 있으면 안 되고 `..` 금지
    /// - `workspace_reports_dir`: 비어 있지 않은 상대 경로, `..` 금지
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(EngineError::Config {
                field: "poll_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            });
        }

        if self.scan_timeout_secs == Some(0) {
            return Err(EngineError::Config {
                field: "scan_timeout_secs".to_owned(),
                reason: "must be at least 1 when set".to_owned(),
            });
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(EngineError::Config {
                field: "request_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            });
        }

        validate_dir("report_dir", &self.report_dir)?;
        validate_dir("workspace_reports_dir", &self.workspace_reports_dir)?;

        if Path::new(&self.workspace_reports_dir).is_absolute() {
            return Err(EngineError::Config {
                field: "workspace_reports_dir".to_owned(),
                reason: "must be relative to the workspace".to_owned(),
            });
        }

        Ok(())
    }
}

fn validate_dir(field: &str, dir: &str) -> Result<(), EngineError> {
    if dir.is_empty() {
        return Err(EngineError::Config {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }

    // Path traversal 체크: Path::components()로 ParentDir 컴포넌트 검출
    if Path::new(dir)
        .components()
        .any(|c| c == Component::ParentDir)
    {
        return Err(EngineError::Config {
            field: field.to_owned(),
            reason: format!("'{dir}' contains path traversal pattern '..'"),
        });
    }

    if dir.len() > MAX_PATH_LEN {
        return Err(EngineError::Config {
            field: field.to_owned(),
            reason: format!("exceeds maximum length {MAX_PATH_LEN}"),
        });
    }

    Ok(())
}

/// [`EngineConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 폴링 간격(초)을 설정합니다.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// 스캔 대기 타임아웃(초)을 설정합니다.
    pub fn scan_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.scan_timeout_secs = secs;
        self
    }

    /// 원격 호출 타임아웃(초)을 설정합니다.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// 보고서 디렉토리를 설정합니다.
    pub fn report_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.report_dir = dir.into();
        self
    }

    /// 작업 공간 보고서 폴더를 설정합니다.
    pub fn workspace_reports_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.workspace_reports_dir = dir.into();
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `EngineError::Config` 반환
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_converts_timeout_minutes() {
        let mut core = ScangateConfig::default();
        core.global.scan_timeout_enabled = true;
        core.global.scan_timeout_minutes = 90;
        let config = EngineConfig::from_core(&core);
        assert_eq!(config.scan_timeout_secs, Some(5400));
        assert_eq!(config.scan_timeout(), Some(Duration::from_secs(5400)));
        // extended fields use defaults
        assert_eq!(config.poll_interval_secs, 10);
    }

    #[test]
    fn from_core_without_timeout() {
        let mut core = ScangateConfig::default();
        core.global.scan_timeout_minutes = 90;
        let config = EngineConfig::from_core(&core);
        assert!(config.scan_timeout_secs.is_none());
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = EngineConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_scan_timeout() {
        let config = EngineConfig {
            scan_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_too_large_request_timeout() {
        let config = EngineConfig {
            request_timeout_secs: 10_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_traversal() {
        let config = EngineConfig {
            report_dir: "../outside".to_owned(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("report_dir"));
    }

    #[test]
    fn validate_rejects_absolute_workspace_dir() {
        let config = EngineConfig {
            workspace_reports_dir: "/tmp/reports".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_all_setters() {
        let config = EngineConfigBuilder::new()
            .poll_interval_secs(2)
            .scan_timeout_secs(Some(60))
            .request_timeout_secs(30)
            .report_dir("/var/builds/42/scangate")
            .workspace_reports_dir("reports/scan")
            .build()
            .unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.report_dir, "/var/builds/42/scangate");
        assert_eq!(config.workspace_reports_dir, "reports/scan");
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = EngineConfigBuilder::new().poll_interval_secs(0).build();
        assert!(result.is_err());
    }
}
