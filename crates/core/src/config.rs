//! 설정 관리: scangate.toml 파싱 및 런타임 설정
//!
//! [`ScangateConfig`]는 모든 설정 섹션을 담는 최상위 구조체입니다.
//!
//! # 섹션
//! - `[general]`: 로그 레벨과 형식
//! - `[server]`: 원격 스캔 서비스 주소와 자격 증명
//! - `[global]`: 관리자가 소유하는 전역 정책 ([`GlobalPolicy`])
//! - `[job]`: 빌드 잡 단위 설정 ([`JobConfig`])
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SCANGATE_SERVER_URL=https://...` 형식)
//! 3. 설정 파일 (`scangate.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scangate_core::error::ScangateError> {
//! use scangate_core::config::ScangateConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ScangateConfig::load("scangate.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScangateConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScangateError};
use crate::types::{BuildOutcome, SeverityLimits};

/// 전체 스캔 주기 허용 범위 (`full_scan_cycle`)
pub const FULL_SCAN_CYCLE_MIN: i32 = 1;
/// 전체 스캔 주기 허용 범위 상한
pub const FULL_SCAN_CYCLE_MAX: i32 = 99;

/// 기본 파일 필터 패턴
pub const DEFAULT_FILTER_PATTERN: &str = "!**/_cvs/**/*, !**/.svn/**/*, !**/.hg/**/*, \
!**/.git/**/*, !**/.bzr/**/*, !**/bin/**/*, !**/obj/**/*, !**/backup/**/*, !**/.idea/**/*, \
!**/*.DS_Store, !**/*.ipr, !**/*.iws, !**/*.bak, !**/*.tmp, !**/*.aac, !**/*.aif, \
!**/*.iff, !**/*.m3u, !**/*.mid, !**/*.mp3, !**/*.mpa, !**/*.ra, !**/*.wav, !**/*.wma, \
!**/*.3g2, !**/*.3gp, !**/*.asf, !**/*.asx, !**/*.avi, !**/*.flv, !**/*.mov, !**/*.mp4, \
!**/*.mpg, !**/*.rm, !**/*.swf, !**/*.vob, !**/*.wmv, !**/*.bmp, !**/*.gif, !**/*.jpg, \
!**/*.png, !**/*.psd, !**/*.tif, !**/*.jar, !**/*.zip, !**/*.rar, !**/*.exe, !**/*.dll, \
!**/*.pdb, !**/*.7z, !**/*.gz, !**/*.tar.gz, !**/*.tar, !**/*.ahtm, !**/*.ahtml, \
!**/*.fhtml, !**/*.hdm, !**/*.hdml, !**/*.hsql, !**/*.ht, !**/*.hta, !**/*.htc, \
!**/*.htd, !**/*.war, !**/*.ear, !**/*.htmls, !**/*.ihtml, !**/*.mht, !**/*.mhtm, \
!**/*.mhtml, !**/*.ssi, !**/*.stm, !**/*.stml, !**/*.ttml, !**/*.txn, !**/*.xhtm, \
!**/*.xhtml, !**/*.class, !**/*.iml";

/// scangate 통합 설정
///
/// `scangate.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScangateConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 원격 스캔 서비스 연결 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 전역 정책 (관리자 설정)
    #[serde(default)]
    pub global: GlobalPolicy,
    /// 빌드 잡 설정
    #[serde(default)]
    pub job: JobConfig,
}

impl ScangateConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScangateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScangateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScangateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScangateError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScangateError> {
        toml::from_str(toml_str).map_err(|e| {
            ScangateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCANGATE_{SECTION}_{FIELD}`
    /// 예: `SCANGATE_JOB_PROJECT_NAME=payments`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCANGATE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCANGATE_GENERAL_LOG_FORMAT");

        // Server
        override_string(&mut self.server.url, "SCANGATE_SERVER_URL");
        override_string(&mut self.server.username, "SCANGATE_SERVER_USERNAME");
        override_string(&mut self.server.password, "SCANGATE_SERVER_PASSWORD");

        // Global
        override_bool(
            &mut self.global.prohibit_project_creation,
            "SCANGATE_GLOBAL_PROHIBIT_PROJECT_CREATION",
        );
        override_bool(
            &mut self.global.force_thresholds,
            "SCANGATE_GLOBAL_FORCE_THRESHOLDS",
        );
        override_bool(
            &mut self.global.scan_timeout_enabled,
            "SCANGATE_GLOBAL_SCAN_TIMEOUT_ENABLED",
        );
        override_u64(
            &mut self.global.scan_timeout_minutes,
            "SCANGATE_GLOBAL_SCAN_TIMEOUT_MINUTES",
        );

        // Job
        override_string(&mut self.job.project_name, "SCANGATE_JOB_PROJECT_NAME");
        override_string(&mut self.job.group_id, "SCANGATE_JOB_GROUP_ID");
        override_string(&mut self.job.preset, "SCANGATE_JOB_PRESET");
        override_bool(&mut self.job.incremental, "SCANGATE_JOB_INCREMENTAL");
        override_bool(
            &mut self.job.full_scans_scheduled,
            "SCANGATE_JOB_FULL_SCANS_SCHEDULED",
        );
        override_i32(&mut self.job.full_scan_cycle, "SCANGATE_JOB_FULL_SCAN_CYCLE");
        override_bool(&mut self.job.wait_for_results, "SCANGATE_JOB_WAIT_FOR_RESULTS");
        override_bool(
            &mut self.job.generate_pdf_report,
            "SCANGATE_JOB_GENERATE_PDF_REPORT",
        );
        override_bool(&mut self.job.osa.enabled, "SCANGATE_JOB_OSA_ENABLED");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// `full_scan_cycle`은 검증하지 않습니다. 범위를 벗어난 값은
    /// 실행 시 "항상 증분 스캔"으로 처리됩니다.
    pub fn validate(&self) -> Result<(), ScangateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        validate_server_url("server.url", &self.server.url)?;
        if let Some(own) = &self.job.own_server {
            validate_server_url("job.own_server.url", &own.url)?;
            if own.url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "job.own_server.url".to_owned(),
                    reason: "must not be empty when own server credentials are used".to_owned(),
                }
                .into());
            }
        }

        if self.global.scan_timeout_enabled && self.global.scan_timeout_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "global.scan_timeout_minutes".to_owned(),
                reason: "must be at least 1 when scan timeout is enabled".to_owned(),
            }
            .into());
        }

        for (field, outcome) in [
            ("global.status_on_error", self.global.status_on_error),
            (
                "global.status_on_threshold_violation",
                self.global.status_on_threshold_violation,
            ),
            (
                "job.status_on_threshold_violation",
                self.job.status_on_threshold_violation,
            ),
        ] {
            if outcome == BuildOutcome::Success {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must be 'unstable' or 'failure'".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// 이 잡에 적용되는 서버 설정을 반환합니다.
    ///
    /// 잡 전용 자격 증명이 있으면 그것을, 없으면 전역 `[server]`를 사용합니다.
    pub fn effective_server(&self) -> &ServerConfig {
        self.job.own_server.as_ref().unwrap_or(&self.server)
    }
}

fn validate_server_url(field: &str, url: &str) -> Result<(), ScangateError> {
    if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("'{url}' must start with http:// or https://"),
        }
        .into());
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 원격 스캔 서비스 연결 설정
///
/// 자격 증명 저장/암호화는 호스트의 책임이며, 여기서는 평문으로 전달받습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 서버 기본 URL (예: `https://scan.example.com`)
    pub url: String,
    /// 사용자명
    pub username: String,
    /// 비밀번호
    pub password: String,
}

/// 전역 정책: 여러 빌드 잡이 공유하는 관리자 설정
///
/// 실행마다 `Arc<GlobalPolicy>` 불변 스냅샷으로 주입됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalPolicy {
    /// 새 프로젝트 생성 금지
    pub prohibit_project_creation: bool,
    /// 임계값 강제 적용
    pub force_thresholds: bool,
    /// 잡이 임계값 설정을 변경하지 못하도록 잠금
    pub lock_thresholds: bool,
    /// SAST 강제 임계값
    pub sast_limits: SeverityLimits,
    /// OSA 강제 임계값
    pub osa_limits: SeverityLimits,
    /// 잡이 `status_on_error = "global"`일 때 적용할 에러 시 빌드 결과
    pub status_on_error: BuildOutcome,
    /// 전역 임계값 위반 시 빌드 결과
    pub status_on_threshold_violation: BuildOutcome,
    /// 스캔 대기 타임아웃 활성화
    pub scan_timeout_enabled: bool,
    /// 스캔 대기 타임아웃 (분)
    pub scan_timeout_minutes: u64,
    /// 기본 제외 폴더 (쉼표 구분)
    pub exclude_folders: String,
    /// 기본 파일 필터 패턴
    pub filter_pattern: String,
    /// OSA 임계값 평가 시 medium/low에 SAST 개수를 사용하는 이전 동작
    pub legacy_osa_threshold_mix: bool,
}

impl Default for GlobalPolicy {
    fn default() -> Self {
        Self {
            prohibit_project_creation: false,
            force_thresholds: false,
            lock_thresholds: true,
            sast_limits: SeverityLimits::default(),
            osa_limits: SeverityLimits::default(),
            status_on_error: BuildOutcome::Failure,
            status_on_threshold_violation: BuildOutcome::Failure,
            scan_timeout_enabled: false,
            scan_timeout_minutes: 60,
            exclude_folders: String::new(),
            filter_pattern: DEFAULT_FILTER_PATTERN.to_owned(),
            legacy_osa_threshold_mix: false,
        }
    }
}

impl GlobalPolicy {
    /// 전역 임계값이 잡 설정을 잠그고 강제하는지 확인합니다.
    pub fn thresholds_locked(&self) -> bool {
        self.force_thresholds && self.lock_thresholds
    }
}

/// 임계값 출처
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdSource {
    /// 잡 설정의 임계값
    #[default]
    Job,
    /// 전역 정책의 임계값
    Global,
}

/// 에러 발생 시 빌드 결과 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// 빌드를 불안정으로 표시
    Unstable,
    /// 에러를 그대로 전파 (빌드 실패)
    Failure,
    /// 전역 정책을 따름
    #[default]
    Global,
}

/// 오픈소스 의존성 분석 잡 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OsaJobConfig {
    /// OSA 활성화 여부
    pub enabled: bool,
    /// 포함 패턴 (쉼표 구분)
    pub include: String,
    /// 제외 패턴 (쉼표 구분)
    pub exclude: String,
}

/// 빌드 잡 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// 잡 전용 서버 자격 증명 (없으면 `[server]` 사용)
    pub own_server: Option<ServerConfig>,
    /// 프로젝트 이름
    pub project_name: String,
    /// 팀(그룹) ID
    pub group_id: String,
    /// 스캔 프리셋
    pub preset: String,
    /// 소스 인코딩 설정 ID
    pub source_encoding: String,
    /// 스캔 코멘트
    pub comment: String,
    /// 증분 스캔 요청
    pub incremental: bool,
    /// 주기적 전체 스캔 요청
    pub full_scans_scheduled: bool,
    /// 전체 스캔 사이의 증분 스캔 횟수 (1-99)
    pub full_scan_cycle: i32,
    /// 결과를 기다릴지 여부 (false면 비동기 모드)
    pub wait_for_results: bool,
    /// 대기 중인 스캔이 있으면 건너뜀
    pub avoid_duplicate_scans: bool,
    /// PDF 보고서 생성
    pub generate_pdf_report: bool,
    /// SCM 트리거로만 시작된 빌드는 건너뜀
    pub skip_scm_triggers: bool,
    /// 임계값 평가 활성화
    pub thresholds_enabled: bool,
    /// 임계값 출처
    pub threshold_source: ThresholdSource,
    /// SAST 임계값
    pub sast_limits: SeverityLimits,
    /// OSA 임계값
    pub osa_limits: SeverityLimits,
    /// 잡 임계값 위반 시 빌드 결과
    pub status_on_threshold_violation: BuildOutcome,
    /// 에러 발생 시 빌드 결과 정책
    pub status_on_error: ErrorPolicy,
    /// 제외 폴더 (비어 있으면 전역값 사용)
    pub exclude_folders: String,
    /// 파일 필터 패턴 (비어 있으면 전역값 사용)
    pub filter_pattern: String,
    /// 오픈소스 분석 설정
    pub osa: OsaJobConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            own_server: None,
            project_name: String::new(),
            group_id: String::new(),
            preset: String::new(),
            source_encoding: String::new(),
            comment: String::new(),
            incremental: false,
            full_scans_scheduled: false,
            full_scan_cycle: 10,
            wait_for_results: true,
            avoid_duplicate_scans: false,
            generate_pdf_report: false,
            skip_scm_triggers: false,
            thresholds_enabled: false,
            threshold_source: ThresholdSource::Job,
            sast_limits: SeverityLimits::default(),
            osa_limits: SeverityLimits::default(),
            status_on_threshold_violation: BuildOutcome::Failure,
            status_on_error: ErrorPolicy::Global,
            exclude_folders: String::new(),
            filter_pattern: String::new(),
            osa: OsaJobConfig::default(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_i32(target: &mut i32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<i32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse i32 from env var, ignoring"
            ),
        }
    }
}
