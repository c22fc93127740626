//! Security Module
//!
//! 入力サイズの上限と、出力ファイル名の検証を提供するモジュール。
//! ハンドルは外部のスプレッドシート由来の値であり、そのままファイル名に使うため、
//! パストラバーサルを防ぐ必要があります。

use crate::error::WintourError;

/// セキュリティ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_input_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_size: 104_857_600, // 100MB
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証
    pub fn check_input_size(&self, len: usize) -> Result<(), WintourError> {
        if len as u64 > self.max_input_size {
            return Err(WintourError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_size
            )));
        }
        Ok(())
    }
}

/// 出力ファイル名の検証
///
/// フラットな出力ディレクトリの外に書き込めないことを保証します。
///
/// # 戻り値
///
/// * `Ok(())` - ファイル名が安全な場合
/// * `Err(WintourError::InvalidFileName)` - `/`、`\`、制御文字を含む場合、または`.`・`..`そのものの場合
pub(crate) fn validate_file_name(name: &str) -> Result<(), WintourError> {
    let reject = |reason: &str| {
        Err(WintourError::InvalidFileName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("empty file name");
    }

    if name.contains('/') || name.contains('\\') {
        return reject("path separator is not allowed");
    }

    // 区切り文字がなければ`..`は名前の一部にすぎない
    if name == "." || name == ".." {
        return reject("path traversal detected");
    }

    if name.chars().any(char::is_control) {
        return reject("control character is not allowed");
    }

    Ok(())
}
