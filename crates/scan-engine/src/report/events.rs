//! 보고서 이벤트와 집계기
//!
//! XML 드라이버는 요소를 만날 때마다 [`ReportEventHandler`]의 콜백을 호출합니다.
//! [`ReportAggregator`]는 이 콜백만으로 심각도별 개수, 쿼리별 결과, 메타데이터를
//! 만들기 때문에 실제 XML 없이 합성 이벤트 스트림으로 집계 규칙을 검증할 수 있습니다.
//!
//! # 집계 규칙
//!
//! - 오탐으로 표시된 결과는 어느 버킷에도 세지 않습니다.
//! - 심각도를 알 수 없거나 없는 결과는 로그를 남기고 건너뜁니다 (쿼리 개수에도 미포함).
//! - 쿼리가 닫힐 때 [`QueryResult`] 하나를 만듭니다. 쿼리 심각도를 알 수 없으면 버립니다.
//! - 루트 속성은 처음 한 번만 기록합니다.

use std::collections::BTreeMap;

use tracing::{error, warn};

use scangate_core::types::Severity;

use crate::types::{QueryResult, ScanMetadata, ScanResult, SeverityCounts};

/// 딥 링크 안에서 서버 UI 경로가 시작되는 위치를 나타내는 토큰
pub const DEEP_LINK_SENTINEL: &str = "CxWebClient";

/// 루트 결과 요소의 속성
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootAttributes {
    /// 원본 딥 링크
    pub deep_link: Option<String>,
    /// 스캔 시작 시각
    pub scan_start: Option<String>,
    /// 스캔 소요 시간
    pub scan_time: Option<String>,
    /// 스캔된 코드 줄 수
    pub lines_of_code_scanned: Option<String>,
    /// 스캔된 파일 수
    pub files_scanned: Option<String>,
    /// 스캔 종류
    pub scan_type: Option<String>,
}

/// 스트리밍 보고서 이벤트 핸들러
///
/// 심각도는 보고서에 적힌 원본 인덱스 문자열 그대로 전달됩니다.
pub trait ReportEventHandler {
    /// 루트 결과 요소
    fn on_root(&mut self, attributes: RootAttributes);

    /// 쿼리 그룹 시작
    fn on_query_open(&mut self, name: Option<&str>, severity: Option<&str>);

    /// 개별 결과
    fn on_finding(&mut self, false_positive: bool, severity: Option<&str>);

    /// 쿼리 그룹 종료
    fn on_query_close(&mut self);
}

struct OpenQuery {
    name: String,
    severity: Option<Severity>,
    raw_severity: Option<String>,
    count: u32,
}

/// 보고서 집계기
pub struct ReportAggregator {
    server_url: String,
    counts: SeverityCounts,
    queries: BTreeMap<Severity, Vec<QueryResult>>,
    metadata: ScanMetadata,
    root_seen: bool,
    current: Option<OpenQuery>,
}

impl ReportAggregator {
    /// 딥 링크 재작성에 쓸 서버 주소로 집계기를 생성합니다.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            counts: SeverityCounts::default(),
            queries: BTreeMap::new(),
            metadata: ScanMetadata::default(),
            root_seen: false,
            current: None,
        }
    }

    /// 집계를 마치고 유효한 결과를 만듭니다.
    pub fn finish(self) -> ScanResult {
        ScanResult {
            counts: self.counts,
            queries: self.queries,
            metadata: self.metadata,
            valid: true,
            ..ScanResult::default()
        }
    }
}

impl ReportEventHandler for ReportAggregator {
    fn on_root(&mut self, attributes: RootAttributes) {
        if self.root_seen {
            return;
        }
        self.root_seen = true;
        self.metadata = ScanMetadata {
            deep_link: rewrite_deep_link(&self.server_url, attributes.deep_link.as_deref()),
            scan_start: attributes.scan_start.unwrap_or_default(),
            scan_time: attributes.scan_time.unwrap_or_default(),
            lines_of_code_scanned: attributes.lines_of_code_scanned.unwrap_or_default(),
            files_scanned: attributes.files_scanned.unwrap_or_default(),
            scan_type: attributes.scan_type.unwrap_or_default(),
        };
    }

    fn on_query_open(&mut self, name: Option<&str>, severity: Option<&str>) {
        if name.is_none() {
            error!("\"name\" attribute was not found in element \"Query\"");
        }
        if severity.is_none() {
            error!("\"SeverityIndex\" attribute was not found in element \"Query\"");
        }
        self.current = Some(OpenQuery {
            name: name.unwrap_or_default().to_owned(),
            severity: severity.and_then(Severity::from_index),
            raw_severity: severity.map(str::to_owned),
            count: 0,
        });
    }

    fn on_finding(&mut self, false_positive: bool, severity: Option<&str>) {
        if false_positive {
            return;
        }
        let Some(raw) = severity else {
            error!("\"SeverityIndex\" attribute was not found in element \"Result\", finding skipped");
            return;
        };
        let Some(severity) = Severity::from_index(raw) else {
            error!(severity = raw, "finding with unknown severity skipped");
            return;
        };
        self.counts.increment(severity);
        if let Some(query) = self.current.as_mut() {
            query.count = query.count.saturating_add(1);
        }
    }

    fn on_query_close(&mut self) {
        let Some(query) = self.current.take() else {
            warn!("query closed without being opened");
            return;
        };
        match query.severity {
            Some(severity) => self.queries.entry(severity).or_default().push(QueryResult {
                name: query.name,
                severity,
                count: query.count,
            }),
            None => error!(
                query = %query.name,
                severity = query.raw_severity.as_deref().unwrap_or("<missing>"),
                "query with unknown severity discarded"
            ),
        }
    }
}

/// 보고서의 딥 링크를 설정된 서버 주소 기준으로 재작성합니다.
///
/// 원본 값에서 [`DEEP_LINK_SENTINEL`]을 찾아 그 위치부터를 서버 주소 뒤에 붙입니다.
/// 값이 없거나 토큰이 없으면 빈 문자열을 반환하고 에러 로그를 남깁니다.
///
/// ```
/// use scangate_engine::report::events::rewrite_deep_link;
///
/// let link = rewrite_deep_link(
///     "https://scan.example.com/",
///     Some("http://10.0.0.5/CxWebClient/ViewerMain.aspx?scanid=1"),
/// );
/// assert_eq!(link, "https://scan.example.com/CxWebClient/ViewerMain.aspx?scanid=1");
/// ```
pub fn rewrite_deep_link(server_url: &str, raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        error!("\"DeepLink\" attribute was not found in the report root element");
        return String::new();
    };
    match raw.find(DEEP_LINK_SENTINEL) {
        Some(idx) => format!("{}/{}", server_url.trim_end_matches('/'), &raw[idx..]),
        None => {
            error!(
                deep_link = raw,
                "deep link in report has an unexpected format, code viewer link will not work"
            );
            String::new()
        }
    }
}
