//! Mapping Module
//!
//! 1行分の`RawRecord`をサービス種別ごとの`CanonicalVoucher`に変換するモジュール。
//!
//! マッピングは純粋関数で、I/Oを行いません。結果は3通りです。
//!
//! - `Ok(Some(voucher))` - 変換に成功
//! - `Ok(None)` - ハンドルが空のため読み飛ばし（エラーではない）
//! - `Err(MappingError)` - 必須項目が空または不正（その行のみ失敗）

mod air;
mod bus;
mod car;
pub mod columns;
mod hotel;

use chrono::NaiveDate;

use crate::api::ServiceType;
use crate::error::MappingError;
use crate::normalizer::{normalize_date, normalize_decimal, CodeTables};
use crate::types::{CanonicalVoucher, CellValue, Fare, RawRecord, VoucherHeader, EMPTY_CELL};

use columns::{ColumnTable, Field};

/// マッピングに注入する設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MappingContext {
    pub code_tables: CodeTables,
    pub columns: ColumnTable,
    /// `Moeda`列が空の場合の通貨
    pub default_currency: String,
}

impl Default for MappingContext {
    fn default() -> Self {
        Self {
            code_tables: CodeTables::default(),
            columns: ColumnTable::default(),
            default_currency: "BRL".to_string(),
        }
    }
}

impl MappingContext {
    /// 小文字化・トリム済みのハンドル（空の場合は`None`）
    pub fn handle_of(&self, service: ServiceType, record: &RawRecord) -> Option<String> {
        let handle = RowView::new(record, self, service)
            .text(Field::Handle)
            .to_lowercase();
        (!handle.is_empty()).then_some(handle)
    }
}

/// 1行をバウチャーに変換する
///
/// # 引数
///
/// * `service` - 呼び出し側が指定したサービス種別
/// * `record` - パース済みの1行
/// * `ctx` - コード表・列対応表
pub(crate) fn map_record(
    service: ServiceType,
    record: &RawRecord,
    ctx: &MappingContext,
) -> Result<Option<CanonicalVoucher>, MappingError> {
    let Some(handle) = ctx.handle_of(service, record) else {
        return Ok(None);
    };

    let row = RowView::new(record, ctx, service);
    let voucher = match service {
        ServiceType::Air => air::map(&row, handle)?,
        ServiceType::Hotel => hotel::map(&row, handle)?,
        ServiceType::Car => car::map(&row, handle)?,
        ServiceType::Bus => bus::map(&row, handle)?,
    };
    Ok(Some(voucher))
}

/// 列対応表を通して1行を読むためのビュー
pub(crate) struct RowView<'a> {
    record: &'a RawRecord,
    ctx: &'a MappingContext,
    service: ServiceType,
}

impl<'a> RowView<'a> {
    pub fn new(record: &'a RawRecord, ctx: &'a MappingContext, service: ServiceType) -> Self {
        Self {
            record,
            ctx,
            service,
        }
    }

    pub fn codes(&self) -> &CodeTables {
        &self.ctx.code_tables
    }

    fn cell(&self, field: Field) -> &'a CellValue {
        self.ctx
            .columns
            .resolve(self.service, field, self.record)
            .map(|(_, value)| value)
            .unwrap_or(&EMPTY_CELL)
    }

    /// トリム済みの文字列（列がない場合は空文字列）
    pub fn text(&self, field: Field) -> String {
        self.cell(field).as_text().trim().to_string()
    }

    pub fn date(&self, field: Field) -> Option<NaiveDate> {
        normalize_date(self.cell(field))
    }

    pub fn amount(&self, field: Field) -> f64 {
        normalize_decimal(self.cell(field))
    }

    /// エラーメッセージ用の列名（実際のヘッダー名、なければ最新の改訂の名前）
    fn column_name(&self, field: Field) -> String {
        match self.ctx.columns.resolve(self.service, field, self.record) {
            Some((header, _)) => header.trim().to_string(),
            None => self.ctx.columns.label(self.service, field),
        }
    }

    /// 全サービス種別で共通のヘッダー項目
    pub fn header(&self, handle: String, issue_date: Option<NaiveDate>) -> VoucherHeader {
        let currency = match self.text(Field::Currency) {
            c if c.is_empty() => self.ctx.default_currency.clone(),
            c => c.to_uppercase(),
        };

        VoucherHeader {
            handle,
            requisition: self.text(Field::Requisition),
            issue_date,
            payment_method: self
                .codes()
                .payment_method_code(&self.text(Field::PaymentMethod)),
            currency,
            client: self.text(Field::Client),
            cost_center: self.text(Field::CostCenter),
            requester: self.text(Field::Requester),
            approver: self.text(Field::Approver),
            department: self.text(Field::Department),
            purpose: self.text(Field::Purpose),
            issuer: self.text(Field::Issuer),
            vendor: self.text(Field::Vendor),
            ticket_number: self.text(Field::TicketNumber),
            locator: self.text(Field::Locator),
            passenger: self.text(Field::Passenger),
            registration: self.text(Field::Registration),
        }
    }

    pub fn fare(&self) -> Fare {
        Fare {
            tarifa: self.amount(Field::Fare),
            taxa: self.amount(Field::Taxes),
            taxa_du: self.amount(Field::Fee),
        }
    }
}

/// 必須項目の検証
///
/// 不正な項目をすべて集めてから、1つの`MappingError`にまとめます。
pub(crate) struct Required<'r, 'a> {
    row: &'r RowView<'a>,
    invalid: Vec<String>,
}

impl<'r, 'a> Required<'r, 'a> {
    pub fn new(row: &'r RowView<'a>) -> Self {
        Self {
            row,
            invalid: Vec::new(),
        }
    }

    /// 必須の日付項目
    pub fn date(&mut self, field: Field) -> Option<NaiveDate> {
        let date = self.row.date(field);
        if date.is_none() {
            self.invalid.push(self.row.column_name(field));
        }
        date
    }

    pub fn finish(self) -> Result<(), MappingError> {
        if self.invalid.is_empty() {
            Ok(())
        } else {
            Err(MappingError::MissingRequired {
                fields: self.invalid,
            })
        }
    }
}
