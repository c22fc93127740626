//! Parser Module
//!
//! アップロードされたバイト列を、ヘッダー名 → セル値のレコード列に変換するモジュール。
//! 下流のマッピングの意味には依存しません。

mod delimited;
mod workbook;

pub(crate) use delimited::DelimitedParser;
pub(crate) use workbook::WorkbookParser;

use std::collections::BTreeMap;

use crate::api::{Delimiter, SourceFormat};
use crate::error::WintourError;
use crate::types::{CellValue, RawRecord};

/// 入力形式に応じてレコード列を読み込む
///
/// ここで返るエラーはすべて致命的エラー（バッチ全体の中断）です。
pub(crate) fn parse_records(
    bytes: &[u8],
    format: SourceFormat,
    delimiter: Delimiter,
) -> Result<Vec<RawRecord>, WintourError> {
    match format {
        SourceFormat::Spreadsheet => WorkbookParser::open(bytes.to_vec())?.read_first_sheet(),
        SourceFormat::Delimited => DelimitedParser::new(delimiter).parse(bytes),
    }
}

/// ヘッダー行を正規化する
///
/// 前後の空白とBOMを除去し、重複したヘッダーには`_1`, `_2`...を付けます。
/// 空のヘッダーは`None`（その列は読み込まない）。
pub(crate) fn normalize_headers<I, S>(raw: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    raw.into_iter()
        .map(|h| {
            let name = h.as_ref().trim_start_matches('\u{feff}').trim().to_string();
            if name.is_empty() {
                return None;
            }
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{}_{}", name, count)
            };
            *count += 1;
            Some(unique)
        })
        .collect()
}

/// 1行分のレコードを組み立てる
///
/// すべてのヘッダーについてキーを作成し、欠けているセルは`CellValue::Empty`とします。
pub(crate) fn build_record(
    row_number: usize,
    headers: &[Option<String>],
    mut values: Vec<CellValue>,
) -> RawRecord {
    values.resize(headers.len(), CellValue::Empty);
    let fields = headers
        .iter()
        .zip(values)
        .filter_map(|(header, value)| header.as_ref().map(|h| (h.clone(), value)))
        .collect();
    RawRecord::new(row_number, fields)
}
