//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! エラーは2階層に分かれます。
//!
//! - [`WintourError`]: バッチ全体を中断する致命的エラー（ファイル構造の破損など）
//! - [`MappingError`]: 1行だけに影響する行単位のエラー（バッチは継続）

use thiserror::Error;

/// wintour-xmlクレート全体で使用する致命的エラー型
///
/// 入力ファイルそのものが読めない場合など、まだ行の境界が存在しない段階で
/// 発生したエラーを表します。このエラーが返された場合、`BatchResult`は生成されません。
///
/// # 使用例
///
/// ```rust,no_run
/// use wintour_xml::WintourError;
/// use std::fs::File;
///
/// fn open_upload(path: &str) -> Result<File, WintourError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(file)
/// }
/// ```
#[derive(Error, Debug)]
pub enum WintourError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// スプレッドシートの解析中に発生したエラー（calamine由来）
    ///
    /// ファイル形式が不正、破損したファイルなどが原因となります。
    #[error("Failed to parse spreadsheet: {0}")]
    Parse(#[from] calamine::Error),

    /// 区切りテキスト（CSV）の解析中に発生したエラー
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// XMLの生成中に発生したエラー
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// サポートされていない入力形式
    ///
    /// 行を1つも読む前に返されます。
    #[error("Unsupported format: '{0}' (expected .xlsx, .xls or .csv)")]
    UnsupportedFormat(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ProcessorBuilder::build()`時、またはCLI引数の解釈時に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// 出力ファイル名として使用できない値
    ///
    /// ハンドルにパス区切り文字や制御文字が含まれている場合に発生します。
    #[error("Invalid output file name '{name}': {reason}")]
    InvalidFileName {
        /// 生成しようとしたファイル名
        name: String,
        /// 拒否された理由
        reason: String,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力サイズの上限を超えた場合などに発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// 1行のマッピングに失敗したことを表すエラー
///
/// メッセージは下流の利用者（ブラジルの運用担当者）向けにポルトガル語で出力します。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// 必須項目（日付など）が空、または解釈できない
    #[error("Campo(s) obrigatório(s) vazio(s) ou inválido(s): {}", .fields.join(", "))]
    MissingRequired {
        /// 問題のあった列名（ソースのヘッダー名）
        fields: Vec<String>,
    },
}
