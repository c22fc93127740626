//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::api::ServiceType;

/// セルの値を表す列挙型
///
/// スプレッドシートのネイティブな日付セルは`Date`として保持し、文字列には変換しません。
/// 下流の正規化で「型付きの日付」と「文字列の日付」を区別するためです。
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 文字列
    Text(String),

    /// 数値（f64）
    Number(f64),

    /// ネイティブな日付・日時
    Date(NaiveDateTime),

    /// 論理値
    Bool(bool),

    /// 空セル
    Empty,
}

pub(crate) static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// 値を文字列として取得
    ///
    /// 整数値の数値は`.0`を付けずに出力します（Excelで数値として保存されたハンドル対策）。
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Date(dt) => dt.format("%Y-%m-%d").to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

/// 入力ファイルの1行分の生データ
///
/// すべてのヘッダー名がキーとして存在します（欠損セルは`CellValue::Empty`）。
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 元ファイル上の行番号（1始まり、ヘッダー行が1）
    pub row_number: usize,

    /// ヘッダー名 → セル値
    pub fields: BTreeMap<String, CellValue>,
}

impl RawRecord {
    /// 新しいレコードを生成
    pub fn new(row_number: usize, fields: BTreeMap<String, CellValue>) -> Self {
        Self { row_number, fields }
    }

    /// ヘッダー名でセル値を取得（存在しない場合は空セル）
    pub fn get(&self, header: &str) -> &CellValue {
        self.fields.get(header).unwrap_or(&EMPTY_CELL)
    }

    /// ヘッダー名でセル値を検索し、実際のヘッダー名とともに返す
    ///
    /// 完全一致を優先し、見つからない場合は大文字小文字・空白・記号を無視して比較します。
    /// アクセント記号は区別します（`Emissão`と`Emissao`は別の列）。
    pub fn find_entry(&self, header: &str) -> Option<(&String, &CellValue)> {
        if let Some(entry) = self.fields.get_key_value(header) {
            return Some(entry);
        }
        let wanted = fold_header(header);
        self.fields
            .iter()
            .find(|(name, _)| fold_header(name) == wanted)
    }
}

/// ヘッダー名の比較用キー
pub(crate) fn fold_header(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 運賃の内訳（`valores`ブロックの3項目）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fare {
    /// 運賃・宿泊料金・レンタル料金
    pub tarifa: f64,
    /// 税金
    pub taxa: f64,
    /// DU手数料（航空の場合は割引額）
    pub taxa_du: f64,
}

/// 全サービス種別で共通のヘッダー項目
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoucherHeader {
    /// 小文字化・トリム済みのハンドル（常に空でない）
    pub handle: String,
    pub requisition: String,
    pub issue_date: Option<NaiveDate>,
    pub payment_method: String,
    pub currency: String,
    pub client: String,
    pub cost_center: String,
    pub requester: String,
    pub approver: String,
    pub department: String,
    pub purpose: String,
    pub issuer: String,
    /// 仕入先コード（航空会社コードなど）
    pub vendor: String,
    pub ticket_number: String,
    pub locator: String,
    pub passenger: String,
    pub registration: String,
}

/// 航空の旅程
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AirItinerary {
    pub origin: String,
    pub destination: String,
    pub departure: Option<NaiveDate>,
    /// 復路の日付（ない場合は往路の日付を使用）
    pub return_date: Option<NaiveDate>,
    pub flight_class: String,
}

/// ホテルの宿泊情報
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HotelStay {
    pub hotel_name: String,
    pub city: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub accommodation: String,
}

/// レンタカーの貸出情報
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarRental {
    pub company: String,
    pub pickup_city: String,
    pub pickup_date: Option<NaiveDate>,
    pub return_city: String,
    pub return_date: Option<NaiveDate>,
}

/// バスの旅程
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusTrip {
    pub company: String,
    pub entry_date: Option<NaiveDate>,
    pub origin_city: String,
    pub destination_city: String,
}

/// サービス種別ごとの旅程ブロック
#[derive(Debug, Clone, PartialEq)]
pub enum Itinerary {
    Air(AirItinerary),
    Hotel(HotelStay),
    Car(CarRental),
    Bus(BusTrip),
}

impl Itinerary {
    /// 旅程に対応するサービス種別
    pub fn service_type(&self) -> ServiceType {
        match self {
            Itinerary::Air(_) => ServiceType::Air,
            Itinerary::Hotel(_) => ServiceType::Hotel,
            Itinerary::Car(_) => ServiceType::Car,
            Itinerary::Bus(_) => ServiceType::Bus,
        }
    }
}

/// 正規化済みのバウチャー（1行 = 1件）
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalVoucher {
    pub header: VoucherHeader,
    pub fare: Fare,
    pub itinerary: Itinerary,
}

impl CanonicalVoucher {
    /// サービス種別
    pub fn service_type(&self) -> ServiceType {
        self.itinerary.service_type()
    }

    /// 出力ファイル名（`wintour-<type>-<handle>.xml`）
    pub fn file_name(&self) -> String {
        format!(
            "wintour-{}-{}.xml",
            self.service_type().as_str(),
            self.header.handle
        )
    }
}

/// 生成済みのXML文書
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    /// 出力ファイル名
    pub file_name: String,
    /// レガシー文字コードで符号化済みのXML
    pub bytes: Vec<u8>,
}

/// 行単位のエラー
///
/// `Display`は下流契約の書式（`Linha <n> (Handle: <id>): <message>`）に従います。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 元ファイル上の行番号（1始まり）
    pub row_number: usize,
    /// ハンドル（不明な場合は`N/D`）
    pub handle: String,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Linha {} (Handle: {}): {}",
            self.row_number, self.handle, self.message
        )
    }
}

/// バッチ処理の結果
///
/// JSONにシリアライズすると、呼び出し側との契約である
/// `{"generatedFiles": [...], "errors": ["Linha ...", ...]}`になります。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// 生成したファイル名（元の行順）
    pub generated_files: Vec<String>,

    /// 行単位のエラー（元の行順）
    #[serde(serialize_with = "serialize_row_errors")]
    pub errors: Vec<RowError>,

    /// ハンドルが空のため読み飛ばした行数
    #[serde(skip)]
    pub skipped_rows: usize,
}

impl BatchResult {
    /// 契約書式のJSON文字列に変換
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn serialize_row_errors<S: Serializer>(errors: &[RowError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

/// 致命的エラー時のレスポンス（`{"error": "..."}`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FatalResponse {
    pub error: String,
}

impl FatalResponse {
    /// 致命的エラーからレスポンスを生成
    pub fn from_error(error: &crate::error::WintourError) -> Self {
        Self {
            error: format!("Erro fatal ao processar arquivo: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        let fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
            .collect();
        RawRecord::new(2, fields)
    }

    #[test]
    fn test_cell_value_as_text() {
        assert_eq!(CellValue::Number(12345.0).as_text(), "12345");
        assert_eq!(CellValue::Number(12.5).as_text(), "12.5");
        assert_eq!(CellValue::Text("AB12".to_string()).as_text(), "AB12");
        assert_eq!(CellValue::Empty.as_text(), "");

        let dt = NaiveDate::from_ymd_opt(2024, 12, 25)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::Date(dt).as_text(), "2024-12-25");
    }

    #[test]
    fn test_raw_record_get_missing_is_empty() {
        let rec = record(&[("Handle", "AB12")]);
        assert_eq!(rec.get("Handle").as_text(), "AB12");
        assert_eq!(rec.get("Bilhete"), &CellValue::Empty);
    }

    #[test]
    fn test_raw_record_find_is_case_and_space_insensitive() {
        let rec = record(&[("Data Check-In", "01/02/2024")]);
        let (name, _) = rec.find_entry("datacheckin").unwrap();
        assert_eq!(name, "Data Check-In");
        assert!(rec.find_entry("DataCheck-In").is_some());
        // アクセント記号は区別する
        let rec = record(&[("DataEmissão", "01/02/2024")]);
        assert!(rec.find_entry("DataEmissao").is_none());
    }

    #[test]
    fn test_file_name() {
        let voucher = CanonicalVoucher {
            header: VoucherHeader {
                handle: "ab12".to_string(),
                ..Default::default()
            },
            fare: Fare::default(),
            itinerary: Itinerary::Car(CarRental::default()),
        };
        assert_eq!(voucher.file_name(), "wintour-carro-ab12.xml");
    }

    #[test]
    fn test_batch_result_json_contract() {
        let result = BatchResult {
            generated_files: vec!["wintour-air-ab12.xml".to_string()],
            errors: vec![RowError {
                row_number: 3,
                handle: "cd34".to_string(),
                message: "Datas inválidas.".to_string(),
            }],
            skipped_rows: 4,
        };

        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(value["generatedFiles"][0], "wintour-air-ab12.xml");
        assert_eq!(value["errors"][0], "Linha 3 (Handle: cd34): Datas inválidas.");
        assert!(value.get("skippedRows").is_none());
    }

    #[test]
    fn test_fatal_response() {
        let err = crate::error::WintourError::UnsupportedFormat("pdf".to_string());
        let response = FatalResponse::from_error(&err);
        assert!(response.error.starts_with("Erro fatal ao processar arquivo"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.starts_with("{\"error\":"));
    }
}
