//! Column Table
//!
//! ソースのヘッダー名と正規化済みの項目（[`Field`]）の対応表。
//! 上流のエクスポートは3回レイアウトが変わっており、各項目は改訂ごとのヘッダー名を持ちます。
//! 改訂ごとに別々のマッピング処理を書くのではなく、この表だけで差異を吸収します。

use std::collections::BTreeMap;

use crate::api::ServiceType;
use crate::types::{CellValue, RawRecord};

/// 上流エクスポートのスキーマ改訂
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaRevision {
    /// データベースの列名をそのまま使った最初のエクスポート（`data_emissao`など）
    V1,
    /// 人が読むためのラベル（`Data de Emissão`など）
    V2,
    /// 現行のBennerエクスポート（`DataEmissão`など）
    V3,
}

impl SchemaRevision {
    /// 新しい順
    pub const NEWEST_FIRST: [SchemaRevision; 3] =
        [SchemaRevision::V3, SchemaRevision::V2, SchemaRevision::V1];

    fn index(self) -> usize {
        match self {
            SchemaRevision::V1 => 0,
            SchemaRevision::V2 => 1,
            SchemaRevision::V3 => 2,
        }
    }
}

/// 正規化済みの項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Handle,
    IssueDate,
    Requisition,
    Locator,
    TicketNumber,
    Passenger,
    Registration,
    PaymentMethod,
    Currency,
    Issuer,
    Client,
    CostCenter,
    Requester,
    Approver,
    Department,
    Purpose,
    Vendor,
    /// 運賃・宿泊料金・レンタル料金
    Fare,
    Taxes,
    /// DU手数料（航空の場合は割引額、バスの場合はその他の金額）
    Fee,
    Carrier,
    Origin,
    Destination,
    Departure,
    ReturnDate,
    FlightClass,
    HotelName,
    City,
    CheckIn,
    CheckOut,
    Accommodation,
    Company,
    PickupCity,
    PickupDate,
    DropoffCity,
    DropoffDate,
    EntryDate,
}

type Row = (Field, [&'static str; 3]);

// [V1, V2, V3]。空文字列はその改訂に列が存在しないことを表す
const COMMON: &[Row] = &[
    (Field::Handle, ["handle", "Handle", "Handle"]),
    (Field::IssueDate, ["data_emissao", "Data de Emissão", "DataEmissão"]),
    (Field::Requisition, ["requisicao", "Requisição", "RequisiçãoBenner"]),
    (Field::Passenger, ["nome_passageiro", "Nome do Passageiro", "PassageiroNomeCompleto"]),
    (Field::Registration, ["matricula", "Matrícula", "PassageiroMatrícula"]),
    (Field::PaymentMethod, ["forma_pagamento", "Pagamento", "FormaPagamento"]),
    (Field::Currency, ["", "Moeda", "Moeda"]),
    (Field::Issuer, ["emissor", "Emissor", "Emissor"]),
    (Field::Client, ["cliente", "Cliente", "InformaçãoCliente"]),
    (Field::CostCenter, ["centro_custo", "Centro de Custo", "BI"]),
    (Field::Requester, ["solicitante", "Solicitante", "Solicitante"]),
    (Field::Approver, ["aprovador", "Aprovador", "AprovadorEfetivo"]),
    (Field::Department, ["departamento", "Departamento", "Departamento"]),
    (Field::Purpose, ["", "Motivo da Viagem", "Finalidade"]),
    (Field::Vendor, ["fornecedor", "Fornecedor", "Fornecedor"]),
    (Field::Taxes, ["taxas", "Taxas", "Taxas"]),
];

const AIR: &[Row] = &[
    (Field::Locator, ["localizador", "Localizador", "AéreoLocalizador"]),
    (Field::TicketNumber, ["bilhete", "Número do Bilhete", "Bilhete"]),
    (Field::Carrier, ["cia_aerea", "Companhia Aérea", "CiaAérea"]),
    (Field::Origin, ["origem", "Origem", "AeroportoOrigem"]),
    (Field::Destination, ["destino", "Destino", "AeroportoDestino"]),
    (Field::Departure, ["data_embarque", "Data de Embarque", "DataEmbarque"]),
    (Field::ReturnDate, ["data_retorno", "Data de Retorno", "DataRetorno"]),
    (Field::FlightClass, ["classe", "Classe", "Classe"]),
    (Field::Fare, ["tarifa", "Tarifa", "TarifaTotalcomTaxas"]),
    (Field::Fee, ["desconto", "Desconto", "DescontoAéreo"]),
];

const HOTEL: &[Row] = &[
    (Field::Locator, ["localizador", "Localizador", "HotelLocalizador"]),
    (Field::TicketNumber, ["voucher", "Voucher", "NúmeroVoucher"]),
    (Field::HotelName, ["hotel", "Hotel", "NomeHotel"]),
    (Field::City, ["cidade", "Cidade", "CidadeHotel"]),
    (Field::CheckIn, ["data_checkin", "Check-In", "DataCheck-In"]),
    (Field::CheckOut, ["data_checkout", "Check-Out", "DataCheck-Out"]),
    (Field::Accommodation, ["tipo_apartamento", "Tipo de Apartamento", "TipoApartamento"]),
    (Field::Fare, ["valor_diarias", "Valor Diárias", "ValorTotalDiárias"]),
    (Field::Fee, ["taxa_du", "Taxa DU", "TaxaDU"]),
];

const CAR: &[Row] = &[
    (Field::Locator, ["localizador", "Localizador", "LocaçãoLocalizador"]),
    (Field::TicketNumber, ["voucher", "Voucher", "NúmeroVoucher"]),
    (Field::Company, ["locadora", "Locadora", "Locadora"]),
    (Field::PickupCity, ["cidade_retirada", "Cidade de Retirada", "CidadeRetirada"]),
    (Field::PickupDate, ["data_retirada", "Data de Retirada", "DataRetirada"]),
    (Field::DropoffCity, ["cidade_devolucao", "Cidade de Devolução", "CidadeDevolução"]),
    (Field::DropoffDate, ["data_devolucao", "Data de Devolução", "DataDevolução"]),
    (Field::Fare, ["valor_locacao", "Valor Locação", "ValorTotalLocação"]),
    (Field::Fee, ["taxa_du", "Taxa DU", "TaxaDU"]),
];

const BUS: &[Row] = &[
    (Field::Locator, ["localizador", "Localizador", "RodoviárioLocalizador"]),
    (Field::TicketNumber, ["bilhete", "Bilhete", "Bilhete"]),
    (Field::Company, ["viacao", "Viação", "Viação"]),
    (Field::EntryDate, ["data_entrada", "Data de Entrada", "DataEntrada"]),
    (Field::Origin, ["origem", "Origem", "CidadeOrigem"]),
    (Field::Destination, ["destino", "Destino", "CidadeDestino"]),
    (Field::Fare, ["valor", "Valor", "ValorTotal"]),
    (Field::Fee, ["outros", "Outros Valores", "OutrosValores"]),
];

/// 改訂つきの列対応表
///
/// デフォルトの表は現行のエクスポートと過去2回の改訂に対応しています。
/// 別のエクスポートに合わせる場合は[`ColumnTable::with_column`]で上書きし、
/// `ProcessorBuilder::with_column_table`で注入します。
///
/// # 使用例
///
/// ```
/// use wintour_xml::{ColumnTable, Field, SchemaRevision, ServiceType};
///
/// let table = ColumnTable::default().with_column(
///     ServiceType::Hotel,
///     Field::City,
///     SchemaRevision::V3,
///     "Município",
/// );
/// assert_eq!(table.label(ServiceType::Hotel, Field::City), "Município");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTable {
    columns: BTreeMap<(ServiceType, Field), [String; 3]>,
}

impl Default for ColumnTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for service in ServiceType::ALL {
            let specific = match service {
                ServiceType::Air => AIR,
                ServiceType::Hotel => HOTEL,
                ServiceType::Car => CAR,
                ServiceType::Bus => BUS,
            };
            for (field, names) in COMMON.iter().chain(specific) {
                table
                    .columns
                    .insert((service, *field), names.map(str::to_string));
            }
        }
        table
    }
}

impl ColumnTable {
    /// 空の表
    pub fn empty() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }

    /// ある改訂でのヘッダー名を設定する
    pub fn with_column(
        mut self,
        service: ServiceType,
        field: Field,
        revision: SchemaRevision,
        header: &str,
    ) -> Self {
        let names = self.columns.entry((service, field)).or_default();
        names[revision.index()] = header.trim().to_string();
        self
    }

    /// 項目のヘッダー名（新しい改訂から順に、存在するもののみ）
    pub fn headers(&self, service: ServiceType, field: Field) -> impl Iterator<Item = &str> {
        let names = self.columns.get(&(service, field));
        SchemaRevision::NEWEST_FIRST
            .into_iter()
            .filter_map(move |rev| names.map(|n| n[rev.index()].as_str()))
            .filter(|name| !name.is_empty())
    }

    /// エラーメッセージに使う項目名（最新の改訂のヘッダー名）
    pub fn label(&self, service: ServiceType, field: Field) -> String {
        self.headers(service, field)
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", field))
    }

    /// レコードから項目の値を探す
    ///
    /// 新しい改訂のヘッダー名から順に完全一致で探し、見つからなければ
    /// 同じ順で大文字小文字・空白・記号を無視して探します。
    ///
    /// # 戻り値
    ///
    /// * `Some((header, value))` - 見つかったヘッダー名と値
    /// * `None` - どの改訂の列も存在しない場合
    pub fn resolve<'r>(
        &self,
        service: ServiceType,
        field: Field,
        record: &'r RawRecord,
    ) -> Option<(&'r str, &'r CellValue)> {
        let exact = self
            .headers(service, field)
            .find_map(|name| record.fields.get_key_value(name));
        if let Some((header, value)) = exact {
            return Some((header.as_str(), value));
        }

        self.headers(service, field).find_map(|name| {
            record
                .find_entry(name)
                .map(|(header, value)| (header.as_str(), value))
        })
    }

    /// ヘッダー集合に最もよく一致する改訂を判定する
    ///
    /// 一致数が同じ場合は新しい改訂を優先します。1列も一致しない場合は`None`。
    pub fn detect_revision(
        &self,
        service: ServiceType,
        record: &RawRecord,
    ) -> Option<SchemaRevision> {
        SchemaRevision::NEWEST_FIRST
            .into_iter()
            .map(|rev| {
                let hits = self
                    .columns
                    .iter()
                    .filter(|((s, _), names)| {
                        let name = &names[rev.index()];
                        *s == service && !name.is_empty() && record.fields.contains_key(name)
                    })
                    .count();
                (rev, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .fold(None, |best: Option<(SchemaRevision, usize)>, (rev, hits)| match best {
                Some((_, best_hits)) if best_hits >= hits => best,
                _ => Some((rev, hits)),
            })
            .map(|(rev, _)| rev)
    }
}
