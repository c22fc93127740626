//! Output Sink
//!
//! 生成したXML文書の保存先を抽象化するモジュール。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::WintourError;
use crate::types::GeneratedDocument;

/// 文書の保存先
///
/// 同じファイル名への書き込みは後勝ちで上書きします。ロックは行いません。
pub trait OutputSink: fmt::Debug + Send + Sync {
    /// 1件の文書を保存する
    ///
    /// ここで返したエラーはその行だけの失敗として扱われ、バッチは継続します。
    fn write(&self, document: &GeneratedDocument) -> Result<(), WintourError>;
}

/// フラットな出力ディレクトリ
///
/// ディレクトリが存在しない場合は最初の書き込み時に作成します。
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl OutputSink for DirectorySink {
    fn write(&self, document: &GeneratedDocument) -> Result<(), WintourError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&document.file_name);
        fs::write(&path, &document.bytes)?;
        tracing::trace!(path = %path.display(), bytes = document.bytes.len(), "document written");
        Ok(())
    }
}

/// メモリ上の保存先（テスト・ライブラリ利用向け）
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// ファイル名で文書のバイト列を取得
    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_name)
            .cloned()
    }

    /// 保存済みのファイル名（辞書順）
    pub fn file_names(&self) -> Vec<String> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn write(&self, document: &GeneratedDocument) -> Result<(), WintourError> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.file_name.clone(), document.bytes.clone());
        Ok(())
    }
}
