//! Text Encoding
//!
//! 生成済みのXMLテキストをレガシーな1バイト文字コードのバイト列に変換します。
//! XMLの生成とは独立した後段の処理で、マッピングには影響しません。
//!
//! 文字コードで表現できない文字は数値文字参照（`&#NNNN;`）として出力するため、
//! 情報が失われることはなく、出力は常に整形式のXMLです。

use encoding_rs::WINDOWS_1252;

use crate::api::TextEncoding;

/// XMLテキストを指定された文字コードで符号化する
///
/// 数値文字参照はテキストノード内でのみ有効です。要素名と属性名はASCIIのみを前提とします。
pub(crate) fn encode(xml: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Latin1 => encode_latin1(xml),
        TextEncoding::Windows1252 => {
            // encoding_rsは表現できない文字を10進の数値文字参照に置き換える
            let (bytes, _, _had_unmappable) = WINDOWS_1252.encode(xml);
            bytes.into_owned()
        }
    }
}

/// ISO-8859-1: U+00FFまでは1文字1バイト
fn encode_latin1(xml: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(xml.len());
    for c in xml.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(byte) => out.push(byte),
            Err(_) => out.extend_from_slice(format!("&#{};", u32::from(c)).as_bytes()),
        }
    }
    out
}
