//! Workbook Parser
//!
//! calamineを使用したスプレッドシート（XLSX/XLS/ODS）の読み込み。
//! 最初のシートのみを対象とし、1行目をヘッダーとして扱います。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{DateTime, NaiveDateTime};
use std::io::{Cursor, Read, Seek};

use crate::error::WintourError;
use crate::parser::{build_record, normalize_headers};
use crate::types::{CellValue, RawRecord};

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
pub(crate) struct WorkbookParser<R: Read + Seek> {
    /// calamineのワークブック（形式は自動判定）
    workbook: Sheets<R>,
}

impl WorkbookParser<Cursor<Vec<u8>>> {
    /// メモリ上のバイト列からワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(WintourError::Parse)` - ファイル構造が不正な場合（致命的エラー）
    pub fn open(bytes: Vec<u8>) -> Result<Self, WintourError> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(Self { workbook })
    }
}

impl<R: Read + Seek> WorkbookParser<R> {
    /// 最初のシートを読み込み、レコード列に変換する
    ///
    /// 行番号はシート上の絶対位置（1始まり）です。先頭に空行があってもずれません。
    /// シートが空の場合は空のレコード列を返します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<RawRecord>)` - ヘッダー行を除くすべての行
    /// * `Err(WintourError::Parse)` - シートが存在しない、または読み込めない場合
    pub fn read_first_sheet(&mut self) -> Result<Vec<RawRecord>, WintourError> {
        if let Some(name) = self.workbook.sheet_names().first() {
            tracing::debug!(sheet = %name, "reading first worksheet");
        }

        let range = self
            .workbook
            .worksheet_range_at(0)
            .ok_or(calamine::Error::Msg("Workbook has no worksheets"))??;

        let Some((start_row, _)) = range.start() else {
            return Ok(Vec::new());
        };

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let headers = normalize_headers(header_row.iter().map(|c| convert_cell(c).as_text()));

        let records = rows
            .enumerate()
            .map(|(idx, row)| {
                // ヘッダー行 = start_row + 1、最初のデータ行 = start_row + 2
                let row_number = start_row as usize + idx + 2;
                let values = row.iter().map(convert_cell).collect();
                build_record(row_number, &headers, values)
            })
            .collect();

        Ok(records)
    }
}

/// calamineのセルを`CellValue`に変換する
///
/// 日付書式のセルは`CellValue::Date`として保持します。
pub(crate) fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Date(value),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        other => CellValue::Text(other.to_string()),
    }
}

/// ODSなどのISO形式の日時文字列を解釈する
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
