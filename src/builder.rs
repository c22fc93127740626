//! Builder Module
//!
//! Fluent Builder APIを提供し、`BatchProcessor`インスタンスを段階的に構築する。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rayon::prelude::*;

use crate::api::{Delimiter, ServiceType, SourceFormat, TextEncoding};
use crate::error::WintourError;
use crate::mapping::columns::{ColumnTable, Field};
use crate::mapping::{map_record, MappingContext};
use crate::normalizer::CodeTables;
use crate::output::{DirectorySink, DocumentBuilder, OutputSink};
use crate::security::{validate_file_name, SecurityConfig};
use crate::types::{BatchResult, GeneratedDocument, RawRecord, RowError};

/// デフォルトの出力ディレクトリ
pub const DEFAULT_OUTPUT_DIR: &str = "xml";

/// デフォルトの代理店名（`nome_agencia`要素）
pub const DEFAULT_AGENCY_NAME: &str = "uniglobe pro";

/// ハンドルが取得できない行のエラーに表示する値
const UNKNOWN_HANDLE: &str = "N/D";

/// 並列処理で一度に文書を生成する行数
const PARALLEL_CHUNK_SIZE: usize = 512;

/// バッチ処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ProcessingConfig {
    /// 代理店名
    pub agency_name: String,

    /// 出力XMLの文字コード
    pub text_encoding: TextEncoding,

    /// 区切りテキストの区切り文字
    pub delimiter: Delimiter,

    /// 生成日時の固定値（Noneの場合はバッチ開始時刻）
    pub generated_at: Option<NaiveDateTime>,

    /// マッピングと文書生成を並列に行うか
    pub parallel: bool,

    /// コード表・列対応表
    pub mapping: MappingContext,

    /// 入力サイズの上限
    pub security: SecurityConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            agency_name: DEFAULT_AGENCY_NAME.to_string(),
            text_encoding: TextEncoding::default(),
            delimiter: Delimiter::default(),
            generated_at: None,
            parallel: false,
            mapping: MappingContext::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use wintour_xml::{ProcessorBuilder, TextEncoding};
///
/// # fn main() -> Result<(), wintour_xml::WintourError> {
/// let processor = ProcessorBuilder::new()
///     .with_output_dir("/var/spool/wintour")
///     .with_text_encoding(TextEncoding::Windows1252)
///     .parallel(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProcessorBuilder {
    /// 内部設定（構築中）
    config: ProcessingConfig,

    /// 出力先（Noneの場合は`xml`ディレクトリ）
    sink: Option<Arc<dyn OutputSink>>,
}

impl Default for ProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 出力先: カレントディレクトリの`xml/`
    /// - 代理店名: `uniglobe pro`
    /// - 文字コード: ISO-8859-1
    /// - 区切り文字: 自動判定
    /// - 逐次処理
    /// - 入力サイズの上限: 100MB
    pub fn new() -> Self {
        Self {
            config: ProcessingConfig::default(),
            sink: None,
        }
    }

    /// 出力ディレクトリを指定する
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sink = Some(Arc::new(DirectorySink::new(dir)));
        self
    }

    /// 任意の出力先を指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use wintour_xml::{MemorySink, ProcessorBuilder};
    ///
    /// let sink = Arc::new(MemorySink::new());
    /// let builder = ProcessorBuilder::new().with_sink(sink.clone());
    /// ```
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 支払方法・航空会社のコード表を指定する
    pub fn with_code_tables(mut self, tables: CodeTables) -> Self {
        self.config.mapping.code_tables = tables;
        self
    }

    /// 列対応表を指定する
    pub fn with_column_table(mut self, table: ColumnTable) -> Self {
        self.config.mapping.columns = table;
        self
    }

    /// `Moeda`列が空の場合の通貨を指定する（デフォルト: `BRL`）
    pub fn with_default_currency(mut self, currency: &str) -> Self {
        self.config.mapping.default_currency = currency.trim().to_uppercase();
        self
    }

    /// 代理店名を指定する
    pub fn with_agency_name(mut self, name: &str) -> Self {
        self.config.agency_name = name.trim().to_string();
        self
    }

    /// 出力XMLの文字コードを指定する
    pub fn with_text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.config.text_encoding = encoding;
        self
    }

    /// 区切りテキストの区切り文字を指定する
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// 生成日時を固定する
    ///
    /// 同じ入力から常に同じバイト列を生成したい場合（テストなど）に使用します。
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.config.generated_at = Some(generated_at);
        self
    }

    /// マッピングと文書生成を並列に行うかを指定する
    ///
    /// 書き込みは常に元の行順で逐次に行われます。
    pub fn parallel(mut self, enable: bool) -> Self {
        self.config.parallel = enable;
        self
    }

    /// 入力サイズの上限（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_size = bytes;
        self
    }

    /// 設定を検証し、`BatchProcessor`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(BatchProcessor)` - 設定が有効な場合
    /// * `Err(WintourError::Config)` - 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * 代理店名が空
    /// * 通貨が空
    /// * 入力サイズの上限が0
    /// * 列対応表にハンドル列が定義されていないサービス種別がある
    pub fn build(self) -> Result<BatchProcessor, WintourError> {
        // 1. 出力項目の検証
        if self.config.agency_name.is_empty() {
            return Err(WintourError::Config(
                "Agency name must not be empty".to_string(),
            ));
        }

        if self.config.mapping.default_currency.is_empty() {
            return Err(WintourError::Config(
                "Default currency must not be empty".to_string(),
            ));
        }

        // 2. 入力サイズの上限の検証
        if self.config.security.max_input_size == 0 {
            return Err(WintourError::Config(
                "Maximum input size must be greater than zero".to_string(),
            ));
        }

        // 3. 列対応表の検証
        for service in ServiceType::ALL {
            if self
                .config
                .mapping
                .columns
                .headers(service, Field::Handle)
                .next()
                .is_none()
            {
                return Err(WintourError::Config(format!(
                    "Column table has no header for Handle ({})",
                    service
                )));
            }
        }

        // 4. BatchProcessorインスタンス生成
        let sink: Arc<dyn OutputSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(DirectorySink::new(DEFAULT_OUTPUT_DIR)),
        };
        Ok(BatchProcessor {
            config: self.config,
            sink,
        })
    }
}

/// 1行の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RowOutcome {
    /// 文書を生成して保存した
    Generated(String),
    /// ハンドルが空のため読み飛ばした
    Skipped,
    /// この行のみ失敗した
    Failed(RowError),
}

/// マッピングと文書生成（純粋な段階）を終えた行
#[derive(Debug)]
enum Staged {
    Ready {
        handle: String,
        document: GeneratedDocument,
    },
    Skipped,
    Failed(RowError),
}

/// バッチ処理のファサード
///
/// 1回のアップロード（1ファイル）を処理し、行ごとにXML文書を1件生成します。
/// 1行の失敗は他の行に影響しません。
///
/// # 使用例
///
/// ```rust,no_run
/// use wintour_xml::{ProcessorBuilder, ServiceType};
/// use std::path::Path;
///
/// # fn main() -> Result<(), wintour_xml::WintourError> {
/// let processor = ProcessorBuilder::new().build()?;
/// let result = processor.process_file(Path::new("aereo.xlsx"), ServiceType::Air)?;
/// println!("{}", result.to_json().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BatchProcessor {
    /// 処理設定
    config: ProcessingConfig,

    /// 出力先
    sink: Arc<dyn OutputSink>,
}

impl BatchProcessor {
    /// メモリ上のバイト列を処理する
    ///
    /// # 引数
    ///
    /// * `bytes` - アップロードされたファイルの内容
    /// * `format` - 入力形式（拡張子から判定したもの）
    /// * `service` - サービス種別
    ///
    /// # 戻り値
    ///
    /// * `Ok(BatchResult)` - 生成したファイル名と行単位のエラー（どちらも元の行順）
    /// * `Err(WintourError)` - 入力ファイルそのものが読めない場合（致命的エラー）
    ///
    /// # 処理フロー
    ///
    /// 1. 入力サイズの検証
    /// 2. レコード列の読み込み
    /// 3. 各行のマッピングと文書生成（並列可）
    /// 4. 生成した文書をすぐに元の行順で保存し、結果を集計
    pub fn process(
        &self,
        bytes: &[u8],
        format: SourceFormat,
        service: ServiceType,
    ) -> Result<BatchResult, WintourError> {
        // 1. 入力サイズの検証
        self.config.security.check_input_size(bytes.len())?;

        // 2. レコード列の読み込み（ここでのエラーのみ致命的）
        let records = crate::parser::parse_records(bytes, format, self.config.delimiter)?;
        tracing::info!(%service, rows = records.len(), "batch started");

        if let Some(first) = records.first() {
            match self.config.mapping.columns.detect_revision(service, first) {
                Some(revision) => tracing::debug!(?revision, "detected column layout"),
                None => tracing::debug!("no known column layout matches the header row"),
            }
        }

        // 生成日時はバッチ全体で1つ
        let generated_at = self
            .config
            .generated_at
            .unwrap_or_else(|| Local::now().naive_local());
        let documents = DocumentBuilder::new(
            self.config.agency_name.clone(),
            self.config.text_encoding,
            generated_at,
        );

        // 3. マッピング・文書生成・保存（常に元の行順で保存する）
        let mut result = BatchResult::default();
        if self.config.parallel {
            // 文書生成のみ並列化し、チャンクごとに保存してメモリ使用量を抑える
            for chunk in records.chunks(PARALLEL_CHUNK_SIZE) {
                let mut indexed: Vec<(usize, Staged)> = chunk
                    .par_iter()
                    .enumerate()
                    .map(|(idx, record)| (idx, self.stage(service, record, &documents)))
                    .collect();

                // 結果をインデックス順にソート（並列処理の順序を保証）
                indexed.sort_by_key(|(idx, _)| *idx);
                for (idx, staged) in indexed {
                    tally(&mut result, self.commit(&chunk[idx], staged));
                }
            }
        } else {
            for record in &records {
                let staged = self.stage(service, record, &documents);
                tally(&mut result, self.commit(record, staged));
            }
        }

        tracing::info!(
            generated = result.generated_files.len(),
            errors = result.errors.len(),
            skipped = result.skipped_rows,
            "batch finished"
        );

        Ok(result)
    }

    /// ファイルを読み込んで処理する
    ///
    /// 入力形式は拡張子から判定します。未対応の拡張子はファイルを読む前にエラーになります。
    pub fn process_file(
        &self,
        path: &Path,
        service: ServiceType,
    ) -> Result<BatchResult, WintourError> {
        let format = SourceFormat::from_path(path)?;

        let len = fs::metadata(path)?.len();
        if len > self.config.security.max_input_size {
            return Err(WintourError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.config.security.max_input_size
            )));
        }

        let bytes = fs::read(path)?;
        self.process(&bytes, format, service)
    }

    /// マッピングと文書生成（I/Oなし、並列実行可）
    fn stage(
        &self,
        service: ServiceType,
        record: &RawRecord,
        documents: &DocumentBuilder,
    ) -> Staged {
        let voucher = match map_record(service, record, &self.config.mapping) {
            Ok(Some(voucher)) => voucher,
            Ok(None) => return Staged::Skipped,
            Err(e) => {
                let handle = self
                    .config
                    .mapping
                    .handle_of(service, record)
                    .unwrap_or_else(|| UNKNOWN_HANDLE.to_string());
                return Staged::Failed(row_error(record, handle, e.to_string()));
            }
        };

        let handle = voucher.header.handle.clone();
        match documents.build(&voucher) {
            Ok(document) => Staged::Ready { handle, document },
            Err(e) => Staged::Failed(row_error(record, handle, e.to_string())),
        }
    }

    /// ファイル名の検証と保存（逐次）
    fn commit(&self, record: &RawRecord, staged: Staged) -> RowOutcome {
        match staged {
            Staged::Ready { handle, document } => {
                let saved = validate_file_name(&document.file_name)
                    .and_then(|()| self.sink.write(&document));
                match saved {
                    Ok(()) => RowOutcome::Generated(document.file_name),
                    Err(e) => RowOutcome::Failed(row_error(record, handle, e.to_string())),
                }
            }
            Staged::Skipped => {
                tracing::trace!(row = record.row_number, "row skipped: empty handle");
                RowOutcome::Skipped
            }
            Staged::Failed(error) => RowOutcome::Failed(error),
        }
    }
}

/// 1行の処理結果を集計に加える
fn tally(result: &mut BatchResult, outcome: RowOutcome) {
    match outcome {
        RowOutcome::Generated(file_name) => result.generated_files.push(file_name),
        RowOutcome::Skipped => result.skipped_rows += 1,
        RowOutcome::Failed(error) => {
            tracing::warn!(row = error.row_number, handle = %error.handle, "{}", error.message);
            result.errors.push(error);
        }
    }
}

fn row_error(record: &RawRecord, handle: String, message: String) -> RowError {
    RowError {
        row_number: record.row_number,
        handle,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    // ASCIIのみのヘッダー（最初の改訂の列名）
    const HOTEL_CSV: &str = "handle;data_emissao;data_checkin;data_checkout;hotel\n\
                             H1;01/03/2025;10/03/2025;12/03/2025;Hotel Sol\n\
                             ;01/03/2025;10/03/2025;12/03/2025;Sem handle\n\
                             H3;01/03/2025;xx;12/03/2025;Hotel Lua\n\
                             H4;01/03/2025;10/03/2025;12/03/2025;Hotel Mar\n";

    fn memory_processor(sink: &Arc<MemorySink>) -> BatchProcessor {
        ProcessorBuilder::new()
            .with_sink(sink.clone())
            .with_generated_at(fixed_time())
            .build()
            .unwrap()
    }

    #[test]
    fn test_processor_builder_new() {
        let builder = ProcessorBuilder::new();
        assert_eq!(builder.config.agency_name, "uniglobe pro");
        assert_eq!(builder.config.text_encoding, TextEncoding::Latin1);
        assert_eq!(builder.config.delimiter, Delimiter::Auto);
        assert!(builder.config.generated_at.is_none());
        assert!(!builder.config.parallel);
        assert!(builder.sink.is_none());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = ProcessorBuilder::new()
            .with_agency_name("  agencia teste ")
            .with_text_encoding(TextEncoding::Windows1252)
            .with_delimiter(Delimiter::Semicolon)
            .with_default_currency("usd")
            .with_max_input_size(1024)
            .parallel(true);

        assert_eq!(builder.config.agency_name, "agencia teste");
        assert_eq!(builder.config.text_encoding, TextEncoding::Windows1252);
        assert_eq!(builder.config.delimiter, Delimiter::Semicolon);
        assert_eq!(builder.config.mapping.default_currency, "USD");
        assert_eq!(builder.config.security.max_input_size, 1024);
        assert!(builder.config.parallel);
    }

    #[test]
    fn test_build_success() {
        assert!(ProcessorBuilder::new().build().is_ok());
    }

    #[test]
    fn test_build_with_empty_agency_name() {
        match ProcessorBuilder::new().with_agency_name("   ").build() {
            Err(WintourError::Config(msg)) => assert!(msg.contains("Agency name")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_with_zero_input_size() {
        match ProcessorBuilder::new().with_max_input_size(0).build() {
            Err(WintourError::Config(msg)) => assert!(msg.contains("Maximum input size")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_with_column_table_without_handle() {
        let result = ProcessorBuilder::new()
            .with_column_table(ColumnTable::empty())
            .build();
        assert!(matches!(result, Err(WintourError::Config(_))));
    }

    #[test]
    fn test_process_isolates_row_failures() {
        let sink = Arc::new(MemorySink::new());
        let processor = memory_processor(&sink);

        let result = processor
            .process(HOTEL_CSV.as_bytes(), SourceFormat::Delimited, ServiceType::Hotel)
            .unwrap();

        assert_eq!(
            result.generated_files,
            vec!["wintour-hotel-h1.xml", "wintour-hotel-h4.xml"]
        );
        assert_eq!(result.skipped_rows, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row_number, 4);
        assert_eq!(result.errors[0].handle, "h3");
        assert!(result.errors[0]
            .to_string()
            .starts_with("Linha 4 (Handle: h3): "));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential_sink = Arc::new(MemorySink::new());
        let sequential = memory_processor(&sequential_sink)
            .process(HOTEL_CSV.as_bytes(), SourceFormat::Delimited, ServiceType::Hotel)
            .unwrap();

        let parallel_sink = Arc::new(MemorySink::new());
        let parallel = ProcessorBuilder::new()
            .with_sink(parallel_sink.clone())
            .with_generated_at(fixed_time())
            .parallel(true)
            .build()
            .unwrap()
            .process(HOTEL_CSV.as_bytes(), SourceFormat::Delimited, ServiceType::Hotel)
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(
            sequential_sink.get("wintour-hotel-h4.xml"),
            parallel_sink.get("wintour-hotel-h4.xml")
        );
    }

    /// 指定したファイル名の書き込みだけ失敗し、書き込み順を記録する保存先
    #[derive(Debug, Default)]
    struct FailingSink {
        fail_on: String,
        written: std::sync::Mutex<Vec<String>>,
    }

    impl FailingSink {
        fn new(fail_on: &str) -> Self {
            Self {
                fail_on: fail_on.to_string(),
                written: Default::default(),
            }
        }

        fn written(&self) -> Vec<String> {
            self.written.lock().unwrap().clone()
        }
    }

    impl OutputSink for FailingSink {
        fn write(&self, document: &GeneratedDocument) -> Result<(), WintourError> {
            if document.file_name == self.fail_on {
                return Err(WintourError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "disk is read-only",
                )));
            }
            self.written.lock().unwrap().push(document.file_name.clone());
            Ok(())
        }
    }

    fn bus_csv(rows: usize) -> String {
        let mut csv = String::from("handle;data_emissao;data_entrada\n");
        for row in 1..=rows {
            csv.push_str(&format!("B{row};01/03/2025;02/03/2025\n"));
        }
        csv
    }

    #[test]
    fn test_sink_failure_is_a_row_error() {
        let sink = Arc::new(FailingSink::new("wintour-onibus-b2.xml"));
        let processor = ProcessorBuilder::new()
            .with_sink(sink.clone())
            .with_generated_at(fixed_time())
            .build()
            .unwrap();

        let result = processor
            .process(bus_csv(4).as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
            .unwrap();

        assert_eq!(
            result.generated_files,
            vec![
                "wintour-onibus-b1.xml",
                "wintour-onibus-b3.xml",
                "wintour-onibus-b4.xml"
            ]
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row_number, 3);
        assert_eq!(result.errors[0].handle, "b2");
        assert!(result.errors[0].message.contains("disk is read-only"));
        assert_eq!(sink.written(), result.generated_files);
    }

    #[test]
    fn test_parallel_writes_follow_row_order_across_chunks() {
        let rows = PARALLEL_CHUNK_SIZE * 2 + 7;
        let sink = Arc::new(FailingSink::new("wintour-onibus-b600.xml"));
        let result = ProcessorBuilder::new()
            .with_sink(sink.clone())
            .with_generated_at(fixed_time())
            .parallel(true)
            .build()
            .unwrap()
            .process(bus_csv(rows).as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
            .unwrap();

        assert_eq!(result.generated_files.len(), rows - 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row_number, 601);
        assert_eq!(sink.written(), result.generated_files);
        assert_eq!(result.generated_files[0], "wintour-onibus-b1.xml");
        assert_eq!(
            result.generated_files.last().map(String::as_str),
            Some(format!("wintour-onibus-b{rows}.xml").as_str())
        );
    }

    #[test]
    fn test_process_rejects_oversized_input() {
        let processor = ProcessorBuilder::new()
            .with_sink(Arc::new(MemorySink::new()))
            .with_max_input_size(8)
            .build()
            .unwrap();

        let result = processor.process(
            HOTEL_CSV.as_bytes(),
            SourceFormat::Delimited,
            ServiceType::Hotel,
        );
        assert!(matches!(result, Err(WintourError::SecurityViolation(_))));
    }

    #[test]
    fn test_unsafe_handle_is_a_row_error() {
        let sink = Arc::new(MemorySink::new());
        let csv = "handle,data_emissao,data_entrada\n../etc,01/03/2025,02/03/2025\nok,01/03/2025,02/03/2025\n";

        let result = memory_processor(&sink)
            .process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
            .unwrap();

        assert_eq!(result.generated_files, vec!["wintour-onibus-ok.xml"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row_number, 2);
        assert_eq!(result.errors[0].handle, "../etc");
    }

    #[test]
    fn test_empty_input_is_an_empty_batch() {
        let sink = Arc::new(MemorySink::new());
        let result = memory_processor(&sink)
            .process(b"", SourceFormat::Delimited, ServiceType::Car)
            .unwrap();
        assert_eq!(result, BatchResult::default());
    }

    #[test]
    fn test_process_file_unsupported_extension() {
        let processor = ProcessorBuilder::new().build().unwrap();
        let result = processor.process_file(Path::new("vouchers.pdf"), ServiceType::Air);
        assert!(matches!(result, Err(WintourError::UnsupportedFormat(_))));
    }
}
