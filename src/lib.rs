//! wintour-xml - Travel-service spreadsheets to Wintour XML vouchers
//!
//! This crate reads spreadsheet (XLSX/XLS/ODS) and delimited-text (CSV) exports
//! of travel-service transactions (air, hotel, car rental, bus) and turns every
//! row into one standardized XML voucher in the Wintour `bilhetes` schema.
//!
//! A malformed row never aborts a batch: it is reported as a row error
//! (`Linha <n> (Handle: <id>): <message>`) and the remaining rows are processed.
//! Only a file that cannot be read at all is a fatal error.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wintour_xml::{ProcessorBuilder, ServiceType};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Write vouchers into ./xml with default settings
//!     let processor = ProcessorBuilder::new().build()?;
//!
//!     let result = processor.process_file(Path::new("aereo.xlsx"), ServiceType::Air)?;
//!
//!     // {"generatedFiles": [...], "errors": [...]}
//!     println!("{}", result.to_json()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # In-memory processing
//!
//! ```rust
//! use std::sync::Arc;
//! use wintour_xml::{MemorySink, ProcessorBuilder, ServiceType, SourceFormat};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = Arc::new(MemorySink::new());
//! let processor = ProcessorBuilder::new().with_sink(sink.clone()).build()?;
//!
//! let csv = b"handle,data_emissao,data_entrada\nB1,01/03/2025,02/03/2025\n";
//! let result = processor.process(csv, SourceFormat::Delimited, ServiceType::Bus)?;
//!
//! assert_eq!(result.generated_files, vec!["wintour-onibus-b1.xml"]);
//! assert!(sink.get("wintour-onibus-b1.xml").is_some());
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use wintour_xml::{CodeTables, Delimiter, ProcessorBuilder, TextEncoding};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let _processor = ProcessorBuilder::new()
//!         .with_output_dir("/srv/wintour/xml")
//!         .with_agency_name("minha agencia")
//!         .with_code_tables(CodeTables::default().with_carrier("PASSAREDO", "2z"))
//!         .with_delimiter(Delimiter::Semicolon)
//!         .with_text_encoding(TextEncoding::Windows1252)
//!         .parallel(true)
//!         .build()?;
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod error;
mod mapping;
mod normalizer;
mod output;
mod parser;
mod security;
mod types;

// 公開API
pub use api::{Delimiter, ServiceType, SourceFormat, TextEncoding};
pub use builder::{BatchProcessor, ProcessorBuilder, DEFAULT_AGENCY_NAME, DEFAULT_OUTPUT_DIR};
pub use error::{MappingError, WintourError};
pub use mapping::columns::{ColumnTable, Field, SchemaRevision};
pub use normalizer::{
    excel_serial_to_date, normalize_date, normalize_decimal, parse_date_text, parse_decimal_text,
    CodeTables,
};
pub use output::{DirectorySink, MemorySink, OutputSink};
pub use types::{
    AirItinerary, BatchResult, BusTrip, CanonicalVoucher, CarRental, CellValue, Fare,
    FatalResponse, GeneratedDocument, HotelStay, Itinerary, RawRecord, RowError, VoucherHeader,
};
