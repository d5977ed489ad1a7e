//! 에러 타입: 도메인별 에러 정의

/// scangate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ScangateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 파이프라인 에러
    #[error("engine error: {0}")]
    Engine(#[from] EngineFailure),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 실패 분류
///
/// 엔진 크레이트의 세부 에러가 상위로 전파될 때 사용하는 카테고리입니다.
#[derive(Debug, thiserror::Error)]
pub enum EngineFailure {
    /// 자격 증명, 라이선스, 프로젝트 생성 권한 등 설정 문제
    #[error("configuration: {0}")]
    Configuration(String),

    /// 소스 패키징 실패
    #[error("packaging: {0}")]
    Packaging(String),

    /// 원격 서비스 통신 실패
    #[error("remote service: {0}")]
    RemoteService(String),

    /// 보고서 파싱 실패
    #[error("report parsing: {0}")]
    ReportParsing(String),

    /// 외부 취소 신호
    #[error("cancelled")]
    Cancelled,
}
