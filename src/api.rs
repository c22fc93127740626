//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::WintourError;

/// サービス種別
///
/// 呼び出し側（アップロードのエンドポイント）が指定します。データから推測はしません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    /// 航空券
    Air,
    /// ホテル
    Hotel,
    /// レンタカー
    Car,
    /// 長距離バス
    Bus,
}

impl ServiceType {
    /// すべてのサービス種別
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Air,
        ServiceType::Hotel,
        ServiceType::Car,
        ServiceType::Bus,
    ];

    /// 出力ファイル名やCLIで使用する名前（`air`, `hotel`, `carro`, `onibus`）
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Air => "air",
            ServiceType::Hotel => "hotel",
            ServiceType::Car => "carro",
            ServiceType::Bus => "onibus",
        }
    }

    /// Wintourの商品コード（`codigo_produto`要素）
    pub fn product_code(&self) -> &'static str {
        match self {
            ServiceType::Air => "tkt",
            ServiceType::Hotel => "htl",
            ServiceType::Car => "car",
            ServiceType::Bus => "rod",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = WintourError;

    /// 大文字小文字を区別せずに解釈します。旧ルート名（`aereo`）と英語名も受け付けます。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "air" | "aereo" => Ok(ServiceType::Air),
            "hotel" => Ok(ServiceType::Hotel),
            "carro" | "car" => Ok(ServiceType::Car),
            "onibus" | "bus" => Ok(ServiceType::Bus),
            other => Err(WintourError::Config(format!(
                "Unknown service type '{}' (expected air, hotel, carro or onibus)",
                other
            ))),
        }
    }
}

/// 入力ファイルの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceFormat {
    /// スプレッドシート（`.xlsx`, `.xlsm`, `.xls`, `.xlsb`, `.ods`）
    ///
    /// 最初のシートのみを読み込みます。
    Spreadsheet,

    /// 区切りテキスト（`.csv`, `.txt`）
    ///
    /// レガシーな1バイト文字コードで読み込みます。
    Delimited,
}

impl SourceFormat {
    /// 拡張子から入力形式を判定する
    ///
    /// # 引数
    ///
    /// * `extension` - 先頭の`.`の有無は問わない拡張子
    ///
    /// # 戻り値
    ///
    /// * `Ok(SourceFormat)` - 既知の拡張子の場合
    /// * `Err(WintourError::UnsupportedFormat)` - それ以外の場合
    pub fn from_extension(extension: &str) -> Result<Self, WintourError> {
        let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Spreadsheet),
            "csv" | "txt" => Ok(SourceFormat::Delimited),
            _ => Err(WintourError::UnsupportedFormat(ext)),
        }
    }

    /// ファイルパスの拡張子から入力形式を判定する
    pub fn from_path(path: &Path) -> Result<Self, WintourError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }
}

/// CSVの区切り文字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Delimiter {
    /// ヘッダー行から自動判定（`;`、`,`、タブのうち最も多いもの）
    #[default]
    Auto,
    /// カンマ（`,`）
    Comma,
    /// セミコロン（`;`）。ブラジル版Excelのエクスポートで一般的
    Semicolon,
    /// タブ
    Tab,
}

impl Delimiter {
    /// 区切り文字のバイト値（`Auto`の場合は`None`）
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Delimiter::Auto => None,
            Delimiter::Comma => Some(b','),
            Delimiter::Semicolon => Some(b';'),
            Delimiter::Tab => Some(b'\t'),
        }
    }
}

/// 出力XMLのレガシー1バイト文字コード
///
/// どちらの場合も、文字コードで表現できない文字はXMLの数値文字参照（`&#NNNN;`）として
/// 出力されるため、生成される文書は常に整形式で情報も失われません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum TextEncoding {
    /// ISO-8859-1（デフォルト）
    ///
    /// U+0000〜U+00FFをそのまま1バイトに写像します。
    #[default]
    Latin1,

    /// Windows-1252
    ///
    /// `encoding_rs`で符号化します。`€`などを1バイトで表現できます。
    Windows1252,
}

impl TextEncoding {
    /// XML宣言に記載する文字コード名
    pub fn xml_label(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }
}
