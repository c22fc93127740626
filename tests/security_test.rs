//! セキュリティテスト
//!
//! ハンドルはそのまま出力ファイル名になるため、出力ディレクトリの外へ書き込めないこと、
//! および入力サイズの上限が守られることを確認します。

use std::sync::Arc;
use wintour_xml::{DirectorySink, MemorySink, ProcessorBuilder, ServiceType, SourceFormat, WintourError};

const BUS_HEADER: &str = "handle;data_emissao;data_entrada\n";

fn bus_csv(handles: &[&str]) -> String {
    let mut csv = BUS_HEADER.to_string();
    for handle in handles {
        csv.push_str(&format!("{};01/03/2025;02/03/2025\n", handle));
    }
    csv
}

/// パストラバーサル: `..`と区切り文字を組み合わせたハンドルはその行のみエラーになる
#[test]
fn test_path_traversal_dotdot() {
    let temp = tempfile::tempdir().unwrap();
    let out_dir = temp.path().join("xml");
    let processor = ProcessorBuilder::new()
        .with_output_dir(&out_dir)
        .build()
        .unwrap();

    let csv = bus_csv(&["B1", "../x", "..\\y", "B4"]);
    let result = processor
        .process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
        .unwrap();

    assert_eq!(
        result.generated_files,
        vec!["wintour-onibus-b1.xml", "wintour-onibus-b4.xml"]
    );
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].message.contains("path separator"));
    assert_eq!(result.errors[0].row_number, 3);

    // 出力ディレクトリの外には何も作られない
    let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

/// 区切り文字を含まない`..`はファイル名の一部として扱う
#[test]
fn test_dotdot_inside_handle_is_allowed() {
    let temp = tempfile::tempdir().unwrap();
    let out_dir = temp.path().join("xml");
    let processor = ProcessorBuilder::new()
        .with_output_dir(&out_dir)
        .build()
        .unwrap();

    let csv = bus_csv(&["a..b", ".."]);
    let result = processor
        .process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
        .unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(
        result.generated_files,
        vec!["wintour-onibus-a..b.xml", "wintour-onibus-...xml"]
    );
    assert!(out_dir.join("wintour-onibus-a..b.xml").is_file());
    assert!(out_dir.join("wintour-onibus-...xml").is_file());
}

/// パス区切り文字を含むハンドル（Unix形式とWindows形式）
#[test]
fn test_path_separators_in_handle() {
    let sink = Arc::new(MemorySink::new());
    let processor = ProcessorBuilder::new()
        .with_sink(sink.clone())
        .build()
        .unwrap();

    let csv = bus_csv(&["../../etc/passwd", "a/b", "c\\d", "C:\\tmp"]);
    let result = processor
        .process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
        .unwrap();

    assert!(result.generated_files.is_empty());
    assert!(sink.is_empty());
    assert_eq!(result.errors.len(), 4);
    for error in &result.errors {
        assert!(
            error.message.contains("Invalid output file name"),
            "unexpected message: {}",
            error.message
        );
    }
}

/// 絶対パスのハンドルでも出力ディレクトリの中にしか書き込まない
#[test]
fn test_absolute_path_handle() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("escape");
    let handle = target.to_string_lossy().to_string();

    let processor = ProcessorBuilder::new()
        .with_sink(Arc::new(DirectorySink::new(temp.path().join("xml"))))
        .build()
        .unwrap();
    let csv = bus_csv(&[&handle]);
    let result = processor
        .process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert!(!target.exists());
}

/// 入力サイズの上限
#[test]
fn test_input_size_limit() {
    let processor = ProcessorBuilder::new()
        .with_sink(Arc::new(MemorySink::new()))
        .with_max_input_size(64)
        .build()
        .unwrap();

    let csv = bus_csv(&["B1", "B2", "B3"]);
    assert!(csv.len() > 64);

    match processor.process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus) {
        Err(WintourError::SecurityViolation(msg)) => assert!(msg.contains("Input file size")),
        other => panic!("Expected SecurityViolation error, got {:?}", other),
    }
}

/// ファイルからの読み込みでも、読み込む前にサイズを検証する
#[test]
fn test_input_file_size_limit() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("onibus.csv");
    std::fs::write(&input, bus_csv(&["B1", "B2", "B3"])).unwrap();

    let processor = ProcessorBuilder::new()
        .with_sink(Arc::new(MemorySink::new()))
        .with_max_input_size(64)
        .build()
        .unwrap();

    assert!(matches!(
        processor.process_file(&input, ServiceType::Bus),
        Err(WintourError::SecurityViolation(_))
    ));
}

/// 制御文字はファイル名から拒否され、XML本文からは削除される
#[test]
fn test_control_characters() {
    let sink = Arc::new(MemorySink::new());
    let processor = ProcessorBuilder::new()
        .with_sink(sink.clone())
        .build()
        .unwrap();

    let csv = "handle;data_emissao;data_entrada;nome_passageiro\n\
               \"B\x071\";01/03/2025;02/03/2025;Ana\n\
               B2;01/03/2025;02/03/2025;\"Jo\x00\x1bse\"\n";
    let result = processor
        .process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus)
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row_number, 2);
    assert_eq!(result.generated_files, vec!["wintour-onibus-b2.xml"]);

    let xml = sink.get("wintour-onibus-b2.xml").unwrap();
    let expected: &[u8] = b"<passageiro>Jose</passageiro>";
    assert!(xml.windows(expected.len()).any(|w| w == expected));
}

/// 正常なファイルの処理はセキュリティエラーにならない
#[test]
fn test_valid_file_processing() {
    let processor = ProcessorBuilder::new()
        .with_sink(Arc::new(MemorySink::new()))
        .build()
        .unwrap();

    let csv = bus_csv(&["B1"]);
    let result = processor.process(csv.as_bytes(), SourceFormat::Delimited, ServiceType::Bus);

    assert!(result.is_ok());
}
