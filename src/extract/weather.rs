use super::Extractor;
use crate::dates::row_timestamp_key;
use crate::types::{FieldValue, Observation, Record, TimestampedObservations};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

/// Rows before the first observation (title and two header rows).
pub const HEADER_ROWS: usize = 3;
/// Cells in a well-formed observation row.
pub const ROW_CELLS: usize = 18;

const TABLE_SELECTOR: &str = r#"table[cellspacing="3"]"#;

// Cell positions within an observation row
const COL_DAY: usize = 0;
const COL_TIME: usize = 1;
const COL_WIND: usize = 2;
const COL_SKY: usize = 5;
const COL_TEMP: usize = 6;
const COL_DEW_POINT: usize = 7;
const COL_HUMIDITY: usize = 10;
const COL_WIND_CHILL: usize = 11;
const COL_HEAT_INDEX: usize = 12;
const COL_PRECIP_1HR: usize = 15;

pub const FIELD_WIND: &str = "wind";
pub const FIELD_SKY: &str = "sky";
pub const FIELD_TEMP: &str = "temp_F";
pub const FIELD_DEW_POINT: &str = "dwpt";
pub const FIELD_HUMIDITY: &str = "humidity";
pub const FIELD_WIND_CHILL: &str = "wind_chill_F";
pub const FIELD_HEAT_INDEX: &str = "heat_index_F";
pub const FIELD_PRECIP_1HR: &str = "precip_1_hr";

/// Observation-history tables: one row per reading, newest first, with only
/// the day of month in the date column.
#[derive(Default)]
pub struct WeatherTableExtractor;

impl Extractor for WeatherTableExtractor {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn extract(&self, body: &str, today: NaiveDate) -> TimestampedObservations {
        let mut out = TimestampedObservations::new();
        let document = Html::parse_document(body);
        let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
            Selector::parse(TABLE_SELECTOR),
            Selector::parse("tr"),
            Selector::parse("td"),
        ) else {
            return out;
        };

        let Some(table) = document.select(&table_sel).next() else {
            warn!("observation table not found; page layout may have changed");
            return out;
        };

        for (index, row) in table.select(&row_sel).enumerate().skip(HEADER_ROWS) {
            let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
            if cells.len() != ROW_CELLS {
                debug!(row = index, cells = cells.len(), "end of observation rows");
                break;
            }
            match parse_row(&cells, today) {
                Some((key, record)) => {
                    out.insert(key, Observation::Fields(record));
                }
                None => debug!(row = index, "rejected observation row"),
            }
        }
        out
    }
}

/// Text of a cell when it holds a single string, possibly wrapped in
/// single-child elements. Cells with mixed or no content have no text.
pub fn cell_string(cell: ElementRef) -> Option<String> {
    let mut node = *cell;
    loop {
        let mut children = node.children();
        let only = children.next()?;
        if children.next().is_some() {
            return None;
        }
        match only.value() {
            Node::Text(text) => {
                let text: &str = text;
                return Some(text.to_string());
            }
            Node::Element(_) => node = only,
            _ => return None,
        }
    }
}

/// Leftover tag fragments mean the source served broken markup.
pub fn has_markup_fragments(text: &str) -> bool {
    text.contains('<') || text.contains('>') || text.contains("td")
}

fn parse_row(cells: &[ElementRef], today: NaiveDate) -> Option<(String, Record)> {
    let texts: Vec<Option<String>> = cells.iter().map(|c| cell_string(*c)).collect();
    let joined: String = texts.iter().flatten().map(String::as_str).collect();
    if has_markup_fragments(&joined) {
        return None;
    }

    let text = |col: usize| texts[col].as_deref().map(str::trim);
    let int = |col: usize| text(col).and_then(|t| t.parse::<i64>().ok());

    let day: u32 = text(COL_DAY)?.parse().ok()?;
    let time = text(COL_TIME)?;
    let key = row_timestamp_key(day, time, today)?;

    let mut record = Record::new();
    record.insert(FIELD_WIND.into(), FieldValue::from(text(COL_WIND)?));
    record.insert(FIELD_SKY.into(), FieldValue::from(text(COL_SKY)?));
    record.insert(FIELD_TEMP.into(), FieldValue::Int(int(COL_TEMP)?));
    record.insert(FIELD_DEW_POINT.into(), FieldValue::Int(int(COL_DEW_POINT)?));
    record.insert(FIELD_HUMIDITY.into(), FieldValue::from(text(COL_HUMIDITY)?));

    if text(COL_WIND_CHILL) != Some("NA") {
        if let Some(v) = int(COL_WIND_CHILL) {
            record.insert(FIELD_WIND_CHILL.into(), FieldValue::Int(v));
        }
    }
    if text(COL_HEAT_INDEX) != Some("NA") {
        if let Some(v) = int(COL_HEAT_INDEX) {
            record.insert(FIELD_HEAT_INDEX.into(), FieldValue::Int(v));
        }
    }
    if let Some(precip) = text(COL_PRECIP_1HR).filter(|t| !t.is_empty()) {
        if let Ok(v) = precip.parse::<f64>() {
            record.insert(FIELD_PRECIP_1HR.into(), FieldValue::Float(v));
        }
    }

    Some((key, record))
}
