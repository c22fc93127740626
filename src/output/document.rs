//! Document Builder
//!
//! 正規化済みのバウチャーを固定スキーマのXML（ルート要素`bilhetes`）に変換するモジュール。
//!
//! 宣言されたすべての要素を常に出力します。値がない場合は空の要素になります。
//! XMLで使用できない制御文字は削除し、`<`や`&`などはquick-xmlがエスケープします。

use std::io::Write;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::api::TextEncoding;
use crate::error::WintourError;
use crate::output::encoding::encode;
use crate::types::{
    AirItinerary, BusTrip, CanonicalVoucher, CarRental, Fare, GeneratedDocument, HotelStay,
    Itinerary, VoucherHeader,
};

/// スキーマのバージョン（`versao_xml`要素）
const SCHEMA_VERSION: &str = "4";

/// 航空の区間に出力する仮の便名
const PLACEHOLDER_FLIGHT_NUMBER: &str = "9999";

/// レンタカーの車種区分（上流データに存在しない）
const UNKNOWN_CAR_CATEGORY: &str = "SEM INFORMACAO";

/// XML文書ビルダー
///
/// 生成日時はバッチ全体で1つです。同じ入力と同じ生成日時からは同じバイト列が生成されます。
#[derive(Debug, Clone)]
pub(crate) struct DocumentBuilder {
    agency_name: String,
    encoding: TextEncoding,
    generated_at: NaiveDateTime,
}

impl DocumentBuilder {
    pub fn new(agency_name: String, encoding: TextEncoding, generated_at: NaiveDateTime) -> Self {
        Self {
            agency_name,
            encoding,
            generated_at,
        }
    }

    /// バウチャーを符号化済みの文書に変換する
    ///
    /// # 戻り値
    ///
    /// * `Ok(GeneratedDocument)` - ファイル名と符号化済みのバイト列
    /// * `Err(WintourError::Xml)` - XMLの書き込みに失敗した場合（その行のみのエラー）
    pub fn build(&self, voucher: &CanonicalVoucher) -> Result<GeneratedDocument, WintourError> {
        let xml = self.render(voucher)?;
        Ok(GeneratedDocument {
            file_name: voucher.file_name(),
            bytes: encode(&xml, self.encoding),
        })
    }

    /// バウチャーをXMLテキストに変換する（符号化前）
    pub fn render(&self, voucher: &CanonicalVoucher) -> Result<String, WintourError> {
        let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some(self.encoding.xml_label()),
            None,
        )))?;

        open(&mut xml, "bilhetes")?;
        text_element(&mut xml, "nr_arquivo", &voucher.header.handle)?;
        text_element(
            &mut xml,
            "data_geracao",
            &self.generated_at.format("%d/%m/%Y").to_string(),
        )?;
        text_element(
            &mut xml,
            "hora_geracao",
            &self.generated_at.format("%H:%M").to_string(),
        )?;
        text_element(&mut xml, "nome_agencia", &self.agency_name)?;
        text_element(&mut xml, "versao_xml", SCHEMA_VERSION)?;

        open(&mut xml, "bilhete")?;
        write_header(&mut xml, &voucher.header, voucher.service_type().product_code())?;
        write_fare(&mut xml, &voucher.fare)?;
        match &voucher.itinerary {
            Itinerary::Air(air) => write_air(&mut xml, air, &voucher.header.vendor)?,
            Itinerary::Hotel(stay) => write_hotel(&mut xml, stay)?,
            Itinerary::Car(rental) => write_car(&mut xml, rental)?,
            Itinerary::Bus(trip) => write_bus(&mut xml, trip)?,
        }
        close(&mut xml, "bilhete")?;
        close(&mut xml, "bilhetes")?;

        String::from_utf8(xml.into_inner())
            .map_err(|e| WintourError::Xml(quick_xml::Error::NonDecodable(Some(e.utf8_error()))))
    }
}

fn write_header<W: Write>(
    xml: &mut Writer<W>,
    header: &VoucherHeader,
    product_code: &str,
) -> quick_xml::Result<()> {
    text_element(xml, "idv_externo", &header.requisition)?;
    text_element(xml, "data_lancamento", &format_date(header.issue_date))?;
    text_element(xml, "codigo_produto", product_code)?;
    text_element(xml, "fornecedor", &header.vendor)?;
    text_element(xml, "num_bilhete", &header.ticket_number)?;
    text_element(xml, "localizador", &header.locator)?;
    text_element(xml, "passageiro", &header.passenger)?;
    text_element(xml, "matricula", &header.registration)?;
    text_element(xml, "forma_pagamento", &header.payment_method)?;
    text_element(xml, "moeda", &header.currency)?;
    text_element(xml, "emissor", &header.issuer)?;
    text_element(xml, "cliente", &header.client)?;
    text_element(xml, "centro_custo", &header.cost_center)?;
    text_element(xml, "solicitante", &header.requester)?;
    text_element(xml, "aprovador", &header.approver)?;
    text_element(xml, "departamento", &header.department)?;
    text_element(xml, "motivo_viagem", &header.purpose)
}

fn write_fare<W: Write>(xml: &mut Writer<W>, fare: &Fare) -> quick_xml::Result<()> {
    open(xml, "valores")?;
    for (code, value) in [("tarifa", fare.tarifa), ("taxa", fare.taxa), ("taxa_du", fare.taxa_du)] {
        open(xml, "item")?;
        text_element(xml, "codigo", code)?;
        text_element(xml, "valor", &format_amount(value))?;
        close(xml, "item")?;
    }
    close(xml, "valores")
}

/// 往路と復路の2区間。復路は出発地と到着地を入れ替え、復路の日付がなければ往路の日付を使う
fn write_air<W: Write>(
    xml: &mut Writer<W>,
    air: &AirItinerary,
    carrier_code: &str,
) -> quick_xml::Result<()> {
    let return_date = air.return_date.or(air.departure);
    let legs = [
        (&air.origin, &air.destination, air.departure),
        (&air.destination, &air.origin, return_date),
    ];

    open(xml, "roteiro")?;
    open(xml, "aereo")?;
    for (from, to, date) in legs {
        open(xml, "trecho")?;
        text_element(xml, "cia_iata", carrier_code)?;
        text_element(xml, "numero_voo", PLACEHOLDER_FLIGHT_NUMBER)?;
        text_element(xml, "aeroporto_origem", from)?;
        text_element(xml, "aeroporto_destino", to)?;
        text_element(xml, "data_partida", &format_date(date))?;
        text_element(xml, "classe", &air.flight_class)?;
        close(xml, "trecho")?;
    }
    close(xml, "aereo")?;
    close(xml, "roteiro")
}

fn write_hotel<W: Write>(xml: &mut Writer<W>, stay: &HotelStay) -> quick_xml::Result<()> {
    open(xml, "hotel")?;
    text_element(xml, "nome_hotel", &stay.hotel_name)?;
    text_element(xml, "cidade_hotel", &stay.city)?;
    text_element(xml, "data_checkin", &format_date(stay.check_in))?;
    text_element(xml, "data_checkout", &format_date(stay.check_out))?;
    text_element(xml, "tipo_apartamento", &stay.accommodation)?;
    text_element(xml, "qtd_apartamentos", "1")?;
    text_element(xml, "qtd_hospedes", "1")?;
    close(xml, "hotel")
}

fn write_car<W: Write>(xml: &mut Writer<W>, rental: &CarRental) -> quick_xml::Result<()> {
    open(xml, "locacao")?;
    text_element(xml, "locadora", &rental.company)?;
    text_element(xml, "cidade_retirada", &rental.pickup_city)?;
    text_element(xml, "data_retirada", &format_date(rental.pickup_date))?;
    text_element(xml, "cidade_devolucao", &rental.return_city)?;
    text_element(xml, "data_devolucao", &format_date(rental.return_date))?;
    text_element(xml, "categoria", UNKNOWN_CAR_CATEGORY)?;
    close(xml, "locacao")
}

fn write_bus<W: Write>(xml: &mut Writer<W>, trip: &BusTrip) -> quick_xml::Result<()> {
    let description = format!(
        "{} - {} - {}",
        format_date(trip.entry_date),
        trip.origin_city,
        trip.destination_city
    );

    open(xml, "rodoviario")?;
    text_element(xml, "descricao", &description)?;
    close(xml, "rodoviario")
}

fn open<W: Write>(xml: &mut Writer<W>, name: &str) -> quick_xml::Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))
}

fn close<W: Write>(xml: &mut Writer<W>, name: &str) -> quick_xml::Result<()> {
    xml.write_event(Event::End(BytesEnd::new(name)))
}

/// 値が空でも要素を出力する
fn text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()> {
    let safe = xml_safe(text);
    open(xml, name)?;
    xml.write_event(Event::Text(BytesText::new(&safe)))?;
    close(xml, name)
}

/// XML 1.0で使用できない文字を削除（タブ・改行・復帰は残す）
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| match c {
            '\t' | '\n' | '\r' => true,
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => false,
            _ => true,
        })
        .collect()
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}
