//! XML 보고서 스트리밍 드라이버
//!
//! `quick_xml::Reader`로 보고서를 한 번 훑으며 [`ReportEventHandler`] 콜백을 호출합니다.
//! 문서 전체를 메모리에 올리지 않습니다.
//!
//! 인식하는 요소:
//!
//! | 요소 | 이벤트 |
//! |---|---|
//! | `CxXMLResults` | [`ReportEventHandler::on_root`] |
//! | `Query` | [`ReportEventHandler::on_query_open`] / [`ReportEventHandler::on_query_close`] |
//! | `Result` | [`ReportEventHandler::on_finding`] |

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::EngineError;
use crate::report::events::{ReportEventHandler, RootAttributes};

const ROOT: &[u8] = b"CxXMLResults";
const QUERY: &[u8] = b"Query";
const RESULT: &[u8] = b"Result";

/// 버퍼 리더에서 보고서를 파싱합니다.
///
/// # Errors
///
/// 형식이 잘못된 문서, 닫히지 않은 요소, 루트 요소 누락은
/// [`EngineError::ReportParse`]로 반환됩니다. 이미 호출된 콜백은 되돌리지 않으므로
/// 호출자는 에러 시 핸들러의 부분 집계를 버려야 합니다.
pub fn parse_reader<R: BufRead, H: ReportEventHandler>(
    source: R,
    handler: &mut H,
) -> Result<(), EngineError> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut root_seen = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            EngineError::ReportParse(format!(
                "malformed report at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                open_element(&e, handler, &mut root_seen)?;
            }
            Event::Empty(e) => {
                open_element(&e, handler, &mut root_seen)?;
                if e.name().as_ref() == QUERY {
                    handler.on_query_close();
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if e.name().as_ref() == QUERY {
                    handler.on_query_close();
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(EngineError::ReportParse(
            "unexpected end of report: unclosed elements".to_owned(),
        ));
    }
    if !root_seen {
        return Err(EngineError::ReportParse(
            "report does not contain a CxXMLResults element".to_owned(),
        ));
    }
    Ok(())
}

/// 문자열 보고서를 파싱합니다.
pub fn parse_str<H: ReportEventHandler>(xml: &str, handler: &mut H) -> Result<(), EngineError> {
    parse_reader(xml.as_bytes(), handler)
}

fn open_element<H: ReportEventHandler>(
    element: &BytesStart<'_>,
    handler: &mut H,
    root_seen: &mut bool,
) -> Result<(), EngineError> {
    match element.name().as_ref() {
        ROOT => {
            *root_seen = true;
            handler.on_root(RootAttributes {
                deep_link: attribute(element, b"DeepLink")?,
                scan_start: attribute(element, b"ScanStart")?,
                scan_time: attribute(element, b"ScanTime")?,
                lines_of_code_scanned: attribute(element, b"LinesOfCodeScanned")?,
                files_scanned: attribute(element, b"FilesScanned")?,
                scan_type: attribute(element, b"ScanType")?,
            });
        }
        QUERY => {
            let name = attribute(element, b"name")?;
            let severity = attribute(element, b"SeverityIndex")?;
            handler.on_query_open(name.as_deref(), severity.as_deref());
        }
        RESULT => {
            let false_positive = attribute(element, b"FalsePositive")?
                .is_some_and(|v| v.eq_ignore_ascii_case("true"));
            let severity = attribute(element, b"SeverityIndex")?;
            handler.on_finding(false_positive, severity.as_deref());
        }
        _ => {}
    }
    Ok(())
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, EngineError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| EngineError::ReportParse(format!("invalid attribute: {e}")))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| EngineError::ReportParse(format!("invalid attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
