//! Output Module
//!
//! XML文書の生成、レガシー文字コードへの符号化、保存先への書き込みを提供するモジュール。

mod document;
mod encoding;
mod sink;

pub(crate) use document::DocumentBuilder;
pub use sink::{DirectorySink, MemorySink, OutputSink};
