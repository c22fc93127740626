//! Delimited Text Parser
//!
//! CSVの読み込み。バイト列はレガシーな1バイト文字コード（Windows-1252、WHATWGにおける
//! `iso-8859-1`）としてデコードしてから区切り文字で分割します。
//! UTF-8のBOMがある場合のみUTF-8としてデコードし、BOMは除去されます。

use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;

use crate::api::Delimiter;
use crate::error::WintourError;
use crate::parser::{build_record, normalize_headers};
use crate::types::{CellValue, RawRecord};

/// 区切りテキストパーサー
#[derive(Debug, Clone, Copy)]
pub(crate) struct DelimitedParser {
    delimiter: Delimiter,
}

impl DelimitedParser {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    /// バイト列をレコード列に変換する
    ///
    /// 行番号は各レコードが始まる元ファイル上の行（1始まり）です。
    pub fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRecord>, WintourError> {
        let text = decode_legacy(bytes);
        let delimiter = self
            .delimiter
            .as_byte()
            .unwrap_or_else(|| sniff_delimiter(&text));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = normalize_headers(reader.headers()?.iter());
        if headers.iter().all(Option::is_none) {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            let values = record.iter().map(CellValue::from).collect();
            records.push(build_record(row_number, &headers, values));
        }

        let shown = (delimiter as char).escape_default().to_string();
        tracing::debug!(
            delimiter = %shown,
            columns = headers.len(),
            rows = records.len(),
            "parsed delimited text"
        );

        Ok(records)
    }
}

/// レガシー1バイト文字コードでデコードする
pub(crate) fn decode_legacy(bytes: &[u8]) -> String {
    // decode()はBOMを検出した場合にその文字コードへ切り替える
    let (text, encoding, _had_errors) = WINDOWS_1252.decode(bytes);
    if encoding != WINDOWS_1252 {
        tracing::debug!(encoding = encoding.name(), "byte order mark overrides legacy encoding");
    }
    text.into_owned()
}

/// ヘッダー行で最も多く出現する区切り文字を選ぶ（同数の場合はカンマ）
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let count = |c: char| header.chars().filter(|&h| h == c).count();

    [(b',', count(',')), (b';', count(';')), (b'\t', count('\t'))]
        .into_iter()
        .fold((b',', 0), |best, (d, n)| if n > best.1 { (d, n) } else { best })
        .0
}
