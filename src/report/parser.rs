//! Lightning report table parser.
//!
//! The report is loosely structured HTML. Instead of building a DOM, the
//! text is cut into row segments at every `</tr>`, each row is classified
//! from its opening `<tr ...>` tag, and the `<td>` cells of data rows are
//! mapped to [`EventRecord`] fields by position:
//!
//! | Cell | Field              |
//! |------|--------------------|
//! | 0    | name               |
//! | 1    | area               |
//! | 2    | volcano type       |
//! | 3    | longitude          |
//! | 4    | latitude           |
//! | 5    | strikes within 20 km  |
//! | 6    | strikes within 100 km |
//!
//! Rows with eight or more cells carry the volcano number in front, which
//! shifts the table above by one. Markup is matched ASCII
//! case-insensitively; all offsets found in the lowered copy are valid in
//! the original text because ASCII lowering never changes byte lengths.

use crate::domain::{Coordinates, EventRecord, Severity};
use crate::error::ParseError;

const ROW_END: &str = "</tr>";

/// Cell count from which the first cell is the volcano number.
const NUMBERED_ROW_CELLS: usize = 8;

const NAME: usize = 0;
const AREA: usize = 1;
const VOLCANO_TYPE: usize = 2;
const LONGITUDE: usize = 3;
const LATITUDE: usize = 4;
const STRIKES_20KM: usize = 5;
const STRIKES_100KM: usize = 6;

/// Row classification derived from the opening `<tr>` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Row styled as an alert.
    Alert,
    /// Sub-alert ("inner") row.
    Inner,
    /// Title, header, footer or any other non-data row.
    Other,
}

impl RowKind {
    /// Classifies a lowercased opening tag. `alert` wins over `inner`.
    #[must_use]
    pub fn classify(opening_tag: &str) -> Self {
        if opening_tag.contains("alert") {
            Self::Alert
        } else if opening_tag.contains("inner") {
            Self::Inner
        } else {
            Self::Other
        }
    }

    /// Severity carried by data rows; `None` for [`RowKind::Other`].
    #[must_use]
    pub const fn severity(self) -> Option<Severity> {
        match self {
            Self::Alert => Some(Severity::Alert),
            Self::Inner => Some(Severity::Warning),
            Self::Other => None,
        }
    }
}

/// Parses report text into event records, in report row order.
///
/// Malformed rows are skipped. Only records whose two strike counts are
/// both present and non-zero are returned.
///
/// # Errors
///
/// Returns [`ParseError::EmptyReport`] for blank input and
/// [`ParseError::NoTableRows`] when no `<tr>` markup exists at all.
pub fn parse_report(report: &str) -> Result<Vec<EventRecord>, ParseError> {
    if report.trim().is_empty() {
        return Err(ParseError::EmptyReport);
    }
    let lowered = report.to_ascii_lowercase();
    if find_tag(&lowered, "<tr", 0).is_none() {
        return Err(ParseError::NoTableRows);
    }

    let mut records = Vec::new();
    let mut skipped = 0_usize;
    for segment in row_segments(report, &lowered) {
        let Some(severity) = segment
            .opening_tag()
            .and_then(|tag| RowKind::classify(tag).severity())
        else {
            continue;
        };
        match map_row(&segment.cells(), severity) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    tracing::debug!(kept = records.len(), skipped, "parsed lightning report");
    Ok(records)
}

/// The same stretch of report text, original and lowered.
#[derive(Debug, Clone, Copy)]
struct RowSegment<'a> {
    raw: &'a str,
    lower: &'a str,
}

fn row_segments<'a>(raw: &'a str, lower: &'a str) -> Vec<RowSegment<'a>> {
    let mut segments = Vec::new();
    let mut start = 0;
    while start <= lower.len() {
        let end = lower
            .get(start..)
            .and_then(|rest| rest.find(ROW_END))
            .map_or(lower.len(), |offset| start + offset);
        if let (Some(raw), Some(lower)) = (raw.get(start..end), lower.get(start..end)) {
            segments.push(RowSegment { raw, lower });
        }
        start = end + ROW_END.len();
    }
    segments
}

impl<'a> RowSegment<'a> {
    /// The lowered `<tr ...>` tag introducing the row.
    fn opening_tag(&self) -> Option<&'a str> {
        let start = find_tag(self.lower, "<tr", 0)?;
        let len = self.lower.get(start..)?.find('>')?;
        self.lower.get(start..=start + len)
    }

    /// Cleaned text of every `<td>` cell in the row.
    fn cells(&self) -> Vec<String> {
        let mut cells = Vec::new();
        let mut cursor = 0;
        while let Some(open) = find_tag(self.lower, "<td", cursor) {
            let Some(content_start) = self
                .lower
                .get(open..)
                .and_then(|rest| rest.find('>'))
                .map(|offset| open + offset + 1)
            else {
                break;
            };
            let close = find_tag(self.lower, "</td", content_start);
            let next = find_tag(self.lower, "<td", content_start);
            let content_end = match (close, next) {
                (Some(close), Some(next)) => close.min(next),
                (Some(end), None) | (None, Some(end)) => end,
                (None, None) => self.lower.len(),
            };
            cells.push(clean_cell(
                self.raw.get(content_start..content_end).unwrap_or_default(),
            ));
            cursor = content_end;
        }
        cells
    }
}

/// Finds `name` (e.g. `"<td"`) at or after `from`, only where it is a whole
/// tag name: followed by whitespace, `>` or `/`.
fn find_tag(haystack: &str, name: &str, from: usize) -> Option<usize> {
    let mut cursor = from;
    loop {
        let pos = cursor + haystack.get(cursor..)?.find(name)?;
        let after = pos + name.len();
        match haystack.as_bytes().get(after) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(pos),
            Some(_) => cursor = after,
            None => return None,
        }
    }
}

/// Strips nested tags, decodes common entities and collapses whitespace.
fn clean_cell(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn map_row(cells: &[String], severity: Severity) -> Option<EventRecord> {
    let (identifier, fields) = if cells.len() >= NUMBERED_ROW_CELLS {
        (
            cells.first().and_then(|c| non_empty(c)),
            cells.get(1..)?,
        )
    } else {
        (None, cells)
    };
    let cell = |index: usize| fields.get(index).map(String::as_str);

    let longitude = cell(LONGITUDE).and_then(parse_coordinate)?;
    let latitude = cell(LATITUDE).and_then(parse_coordinate)?;
    let strikes_within_20km = cell(STRIKES_20KM).and_then(parse_count)?;
    let strikes_within_100km = cell(STRIKES_100KM).and_then(parse_count)?;
    // Zero counts are dropped along with missing ones: only active
    // volcanoes are reported.
    if strikes_within_20km == 0 || strikes_within_100km == 0 {
        return None;
    }

    Some(EventRecord {
        identifier,
        name: cell(NAME).and_then(non_empty),
        area: cell(AREA).and_then(non_empty),
        coordinates: Coordinates::new(longitude, latitude),
        strikes_within_20km,
        strikes_within_100km,
        volcano_type: cell(VOLCANO_TYPE).unwrap_or_default().to_string(),
        severity,
    })
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_coordinate(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a non-negative strike count. Accepts thousands separators and
/// whole-number decimals such as `"12.0"`.
fn parse_count(text: &str) -> Option<u32> {
    let digits = text.trim().replace(',', "");
    if let Ok(count) = digits.parse::<u32>() {
        return Some(count);
    }
    let value = digits.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then(|| value as u32)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const ALERT_ROW: &str = r#"<tr class="alert"><td>V1</td><td>ObsArea</td><td>Stratovolcano</td><td>120.5</td><td>-8.3</td><td>12</td><td>3</td></tr>"#;

    fn parse_ok(report: &str) -> Vec<EventRecord> {
        let Ok(records) = parse_report(report) else {
            panic!("report should parse");
        };
        records
    }

    fn table(rows: &[&str]) -> String {
        format!("<html><body><table>\n{}\n</table></body></html>", rows.join("\n"))
    }

    #[test]
    fn single_alert_row() {
        let records = parse_ok(&table(&[ALERT_ROW]));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.severity, Severity::Alert);
        assert_eq!(record.coordinates.to_position(), [120.5, -8.3]);
        assert_eq!(record.strikes_within_20km, 12);
        assert_eq!(record.strikes_within_100km, 3);
        assert_eq!(record.name.as_deref(), Some("V1"));
        assert_eq!(record.area.as_deref(), Some("ObsArea"));
        assert_eq!(record.volcano_type, "Stratovolcano");
        assert_eq!(record.identifier, None);
    }

    #[test]
    fn inner_row_is_a_warning() {
        let row = r#"<tr class="inner"><td>Ibu</td><td>Darwin</td><td>Stratovolcano</td><td>127.63</td><td>1.488</td><td>1</td><td>7</td></tr>"#;
        let records = parse_ok(&table(&[row]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Warning);
    }

    #[test]
    fn alert_wins_over_inner() {
        let row = r#"<tr class="inner alert"><td>A</td><td>B</td><td>C</td><td>1</td><td>2</td><td>3</td><td>4</td></tr>"#;
        let records = parse_ok(&table(&[row]));
        assert_eq!(records[0].severity, Severity::Alert);
    }

    #[test]
    fn unclassified_rows_are_discarded() {
        let title = r#"<tr class="title"><td>Volcano</td><td>Area</td><td>Type</td><td>1</td><td>2</td><td>3</td><td>4</td></tr>"#;
        let plain = "<tr><td>X</td><td>Y</td><td>Z</td><td>1</td><td>2</td><td>3</td><td>4</td></tr>";
        let records = parse_ok(&table(&[title, plain, ALERT_ROW]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("V1"));
    }

    #[test]
    fn classification_ignores_cell_text() {
        let row = "<tr><td>Inner Crater</td><td>alert zone</td><td>Cone</td><td>1</td><td>2</td><td>3</td><td>4</td></tr>";
        assert!(parse_ok(&table(&[row])).is_empty());
    }

    #[test]
    fn missing_hundred_km_cell_is_excluded() {
        let row = r#"<tr class="alert"><td>V2</td><td>A</td><td>T</td><td>10</td><td>20</td><td>5</td></tr>"#;
        assert!(parse_ok(&table(&[row])).is_empty());
    }

    #[test]
    fn non_numeric_hundred_km_cell_is_excluded() {
        let row = r#"<tr class="alert"><td>V2</td><td>A</td><td>T</td><td>10</td><td>20</td><td>5</td><td>n/a</td></tr>"#;
        assert!(parse_ok(&table(&[row])).is_empty());
    }

    #[test]
    fn zero_strikes_are_excluded() {
        let row = r#"<tr class="alert"><td>V3</td><td>A</td><td>T</td><td>10</td><td>20</td><td>0</td><td>8</td></tr>"#;
        assert!(parse_ok(&table(&[row])).is_empty());
    }

    #[test]
    fn missing_coordinates_skip_the_row() {
        let row = r#"<tr class="alert"><td>V4</td><td>A</td><td>T</td><td></td><td>20</td><td>5</td><td>8</td></tr>"#;
        let records = parse_ok(&table(&[row, ALERT_ROW]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("V1"));
    }

    #[test]
    fn numbered_rows_shift_positions() {
        let report = "<table>\n<tr class=\"alert\">\n<td>264020</td>\n<td>Semeru</td>\n<td>Darwin</td>\n<td>Stratovolcano</td>\n<td>112.92</td>\n<td>-8.108</td>\n<td>2</td>\n<td>14</td>\n</tr>\n</table>";
        let records = parse_ok(report);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.identifier.as_deref(), Some("264020"));
        assert_eq!(record.name.as_deref(), Some("Semeru"));
        assert_eq!(record.coordinates.to_position(), [112.92, -8.108]);
        assert_eq!(record.strikes_within_20km, 2);
        assert_eq!(record.strikes_within_100km, 14);
    }

    #[test]
    fn tolerates_case_attributes_nested_markup_and_entities() {
        let row = r#"<TR Class="ALERT" id="r1"><TD align="left"><a href="/v/5">Krakatau</a></TD><TD>Sunda&nbsp;Strait &amp; Java</TD><TD> Caldera </TD><TD>105.423</TD><TD>-6.102</TD><TD>1,204</TD><TD>33.0</TD></TR>"#;
        let records = parse_ok(&table(&[row]));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name.as_deref(), Some("Krakatau"));
        assert_eq!(record.area.as_deref(), Some("Sunda Strait & Java"));
        assert_eq!(record.volcano_type, "Caldera");
        assert_eq!(record.strikes_within_20km, 1204);
        assert_eq!(record.strikes_within_100km, 33);
    }

    #[test]
    fn extra_cells_are_ignored() {
        let row = r#"<tr class="inner"><td>264020</td><td>V</td><td>A</td><td>T</td><td>1.5</td><td>2.5</td><td>3</td><td>4</td><td>extra</td><td>more</td></tr>"#;
        let records = parse_ok(&table(&[row]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].strikes_within_100km, 4);
    }

    #[test]
    fn preserves_row_order() {
        let second = ALERT_ROW.replace("V1", "V9");
        let records = parse_ok(&table(&[ALERT_ROW, second.as_str()]));
        let names: Vec<_> = records.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["V1", "V9"]);
    }

    #[test]
    fn parsing_is_deterministic() {
        let report = table(&[ALERT_ROW, "<tr class=\"footer\"><td>updated</td></tr>"]);
        assert_eq!(parse_ok(&report), parse_ok(&report));
    }

    #[test]
    fn table_without_data_rows_is_empty() {
        let report = table(&["<tr><th>Volcano</th><th>Area</th></tr>"]);
        assert!(parse_ok(&report).is_empty());
    }

    #[test]
    fn blank_input_is_a_parse_failure() {
        assert_eq!(parse_report("  \n\t"), Err(ParseError::EmptyReport));
    }

    #[test]
    fn text_without_rows_is_a_parse_failure() {
        assert_eq!(
            parse_report("<html><body><track src=\"x\">maintenance</body></html>"),
            Err(ParseError::NoTableRows)
        );
    }

    #[test]
    fn row_classifier() {
        assert_eq!(RowKind::classify(r#"<tr class="alert">"#), RowKind::Alert);
        assert_eq!(RowKind::classify(r#"<tr class="inner">"#), RowKind::Inner);
        assert_eq!(RowKind::classify("<tr>"), RowKind::Other);
        assert_eq!(RowKind::Other.severity(), None);
    }

    #[test]
    fn count_parsing() {
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count(" 7.0 "), Some(7));
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("2.5"), None);
        assert_eq!(parse_count(""), None);
    }
}
