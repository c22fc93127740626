//! パフォーマンスベンチマーク
//!
//! このモジュールは、wintour-xmlクレートのバッチ処理性能を測定するためのベンチマークを提供します。
//!
//! 実装するベンチマーク:
//! - ワークブック（航空券5,000行）の逐次処理と並列処理
//! - CSV（ホテル5,000行）の逐次処理と並列処理
//! - 大規模バッチ（航空券100,000行、環境変数で有効化）
//!
//! 出力先はすべて`MemorySink`です。ディスクI/Oは含みません。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::sync::Arc;
use wintour_xml::{MemorySink, ProcessorBuilder, ServiceType, SourceFormat};

/// 航空券の行を`rows`行持つワークブックを生成
fn generate_air_workbook(rows: u32) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let headers = [
        "Handle",
        "DataEmissão",
        "DataEmbarque",
        "DataRetorno",
        "CiaAérea",
        "AeroportoOrigem",
        "AeroportoDestino",
        "TarifaTotalcomTaxas",
        "Taxas",
        "PassageiroNomeCompleto",
        "FormaPagamento",
    ];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for row in 1..=rows {
        worksheet.write_string(row, 0, format!("T{row}"))?;
        worksheet.write_string(row, 1, "10/01/2025")?;
        worksheet.write_string(row, 2, format!("{:02}/02/2025", row % 28 + 1))?;
        worksheet.write_string(row, 3, format!("{:02}/03/2025", row % 28 + 1))?;
        worksheet.write_string(row, 4, ["LATAM", "GOL", "AZUL"][row as usize % 3])?;
        worksheet.write_string(row, 5, "GRU")?;
        worksheet.write_string(row, 6, "REC")?;
        worksheet.write_string(row, 7, format!("R$ 1.{:03},90", row % 1000))?;
        worksheet.write_number(row, 8, 87.35)?;
        worksheet.write_string(row, 9, format!("Passageiro Número {row}"))?;
        worksheet.write_string(row, 10, "FATURADO")?;
    }

    workbook.save_to_buffer()
}

/// ホテルの行を`rows`行持つLatin-1のCSVを生成
fn generate_hotel_csv(rows: u32) -> Vec<u8> {
    let mut csv = String::from(
        "Handle;DataEmissão;DataCheck-In;DataCheck-Out;NomeHotel;CidadeHotel;ValorTotalDiárias;TaxaDU\n",
    );
    for row in 1..=rows {
        csv.push_str(&format!(
            "H{row};03/02/2025;{day:02}/03/2025;{next:02}/03/2025;Hotel Ação {row};São Paulo;{value},50;25,00\n",
            day = row % 27 + 1,
            next = row % 27 + 2,
            value = 200 + row % 700,
        ));
    }
    csv.chars().map(|c| c as u8).collect()
}

fn bench_batch(
    c: &mut Criterion,
    group_name: &str,
    data: &[u8],
    format: SourceFormat,
    service: ServiceType,
) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10); // 10回のサンプルで平均を取る

    for parallel in [false, true] {
        let processor = ProcessorBuilder::new()
            .with_sink(Arc::new(MemorySink::new()))
            .parallel(parallel)
            .build()
            .unwrap();
        let label = if parallel { "parallel" } else { "sequential" };

        group.bench_with_input(BenchmarkId::new("process", label), data, |b, data| {
            b.iter(|| {
                let result = processor
                    .process(black_box(data), format, service)
                    .unwrap();
                black_box(result)
            });
        });
    }

    group.finish();
}

fn benchmark_workbook(c: &mut Criterion) {
    let data = generate_air_workbook(5_000).unwrap();
    bench_batch(c, "air_workbook_5k", &data, SourceFormat::Spreadsheet, ServiceType::Air);
}

fn benchmark_csv(c: &mut Criterion) {
    let data = generate_hotel_csv(5_000);
    bench_batch(c, "hotel_csv_5k", &data, SourceFormat::Delimited, ServiceType::Hotel);
}

/// 大規模バッチのベンチマーク
///
/// 注意: このベンチマークは非常に時間がかかるため、通常はスキップされる。
/// 実行する場合は環境変数 `BENCH_LARGE_BATCH=true` を設定してください。
fn benchmark_large_batch(c: &mut Criterion) {
    // 環境変数で有効化されていない場合はスキップ
    if std::env::var("BENCH_LARGE_BATCH").is_err() {
        eprintln!("Info: Large batch benchmark skipped. Set BENCH_LARGE_BATCH=true to enable.");
        return;
    }

    let data = match generate_air_workbook(100_000) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Warning: Failed to generate workbook: {}. Skipping benchmark.", e);
            return;
        }
    };
    bench_batch(c, "air_workbook_100k", &data, SourceFormat::Spreadsheet, ServiceType::Air);
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(std::time::Duration::from_secs(20))
        .warm_up_time(std::time::Duration::from_secs(3));
    targets = benchmark_workbook, benchmark_csv
}

// 大規模バッチのベンチマークは別グループとして定義
criterion_group! {
    name = large_benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(120))
        .warm_up_time(std::time::Duration::from_secs(5));
    targets = benchmark_large_batch
}

criterion_main!(benches, large_benches);
