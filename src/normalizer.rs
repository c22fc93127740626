//! Normalizer Module
//!
//! 生のセル値を正規化された値に変換する純粋関数群。I/Oは行いません。
//!
//! - 日付: ネイティブな日付、`日/月/年`形式、ISO形式、Excelのシリアル値
//! - 金額: `R$ 1.234,56`のようなブラジル形式の文字列
//! - コード: 支払方法・航空会社名から短いコードへの変換
//!
//! どの関数もエラーを返しません。解釈できない日付は`None`、金額は`0.0`になります。

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::types::CellValue;

/// セル値を日付に正規化する
///
/// # 戻り値
///
/// * `Some(NaiveDate)` - 解釈できた場合（時刻は切り捨て、UTC基準）
/// * `None` - 空、または解釈できない場合
pub fn normalize_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Number(n) => excel_serial_to_date(*n),
        CellValue::Bool(_) | CellValue::Empty => None,
    }
}

/// 文字列の日付を解釈する
///
/// 1. `/`を含む場合は`日/月/年`（4桁の年）、含まない場合はISO形式として解釈
/// 2. 失敗した場合、ブラジル形式の日-月-年として再解釈（2桁の年、末尾の時刻、`-`や`.`区切りを許容）
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let first = if s.contains('/') {
        parse_day_month_year(s)
    } else {
        parse_iso_like(s)
    };

    first.or_else(|| parse_brazilian(s))
}

fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn parse_iso_like(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }

    // タイムゾーン付きはUTCに変換してから日付を取る
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

fn parse_brazilian(s: &str) -> Option<NaiveDate> {
    let date_part = s.split_whitespace().next()?;
    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts[0].len() > 2 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    let year = match parts[2].len() {
        1 | 2 => 2000 + year,
        4 => year,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Excelのシリアル値（1900年システム）を日付に変換する
///
/// - シリアル値1 = 1900-01-01
/// - シリアル値60はExcelのうるう年バグによる存在しない1900-02-29（1900-02-28として扱う）
/// - シリアル値61以降 = 1899-12-30起算
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 9999-12-31 = 2958465
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }

    let days = serial.floor() as i64;
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_signed(Duration::days(days))
}

/// セル値を金額に正規化する
///
/// 数値はそのまま返します。文字列は[`parse_decimal_text`]で解釈します。
pub fn normalize_decimal(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => parse_decimal_text(s),
        _ => 0.0,
    }
}

/// ブラジル形式の金額文字列を解釈する
///
/// 通貨記号などの接頭辞を除去し、千の位の`.`を削除し、小数点の`,`を`.`に変換します。
/// 解釈できない場合は`0.0`を返します。
///
/// ```
/// use wintour_xml::parse_decimal_text;
///
/// assert_eq!(parse_decimal_text("R$ 1.234,56"), 1234.56);
/// assert_eq!(parse_decimal_text("abc"), 0.0);
/// ```
pub fn parse_decimal_text(raw: &str) -> f64 {
    let s = raw.trim();
    let Some(start) = s.find(|c: char| c.is_ascii_digit() || c == ',') else {
        return 0.0;
    };

    let negative = s[..start].contains('-');
    let cleaned: String = s[start..]
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);

    let value = leading_number(&cleaned).unwrap_or(0.0);
    if negative {
        -value
    } else {
        value
    }
}

/// 文字列先頭の数値部分だけを解釈する（`12abc` → 12）
fn leading_number(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    for (idx, c) in s.char_indices() {
        match c {
            '0'..='9' => end = idx + 1,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    if end == 0 {
        return None;
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// コード変換テーブル
///
/// 支払方法と航空会社名を短いコードに変換します。テーブルにない値は拒否せず、
/// 小文字化した入力をそのままコードとして使います。
///
/// # 使用例
///
/// ```
/// use wintour_xml::CodeTables;
///
/// let tables = CodeTables::default().with_carrier("PASSAREDO", "2z");
/// assert_eq!(tables.payment_method_code("cartao"), "cc");
/// assert_eq!(tables.carrier_code("Passaredo"), "2z");
/// assert_eq!(tables.carrier_code("TAP"), "tap");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTables {
    payment_methods: BTreeMap<String, String>,
    carriers: BTreeMap<String, String>,
}

impl Default for CodeTables {
    fn default() -> Self {
        Self::empty()
            .with_payment_method("CARTAO", "cc")
            .with_payment_method("CARTÃO", "cc")
            .with_payment_method("FATURADO", "iv")
            .with_payment_method("INVOICE", "iv")
            .with_carrier("LATAM", "la")
            .with_carrier("AZUL", "ad")
            .with_carrier("GOL", "g3")
    }
}

impl CodeTables {
    /// 空のテーブル（すべての値が小文字化してそのまま使われる）
    pub fn empty() -> Self {
        Self {
            payment_methods: BTreeMap::new(),
            carriers: BTreeMap::new(),
        }
    }

    /// 支払方法のエントリを追加（ラベルは大文字小文字を区別しない）
    pub fn with_payment_method(mut self, label: &str, code: &str) -> Self {
        self.payment_methods
            .insert(label.trim().to_uppercase(), code.to_string());
        self
    }

    /// 航空会社のエントリを追加（名前は大文字小文字を区別しない）
    pub fn with_carrier(mut self, name: &str, code: &str) -> Self {
        self.carriers.insert(name.trim().to_uppercase(), code.to_string());
        self
    }

    /// 支払方法のコード
    pub fn payment_method_code(&self, raw: &str) -> String {
        lookup(&self.payment_methods, raw)
    }

    /// 航空会社のコード
    pub fn carrier_code(&self, raw: &str) -> String {
        lookup(&self.carriers, raw)
    }
}

fn lookup(table: &BTreeMap<String, String>, raw: &str) -> String {
    let key = raw.trim().to_uppercase();
    table
        .get(&key)
        .cloned()
        .unwrap_or_else(|| raw.trim().to_lowercase())
}
