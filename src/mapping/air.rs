//! 航空券のマッピング
//!
//! 必須: ハンドル、発券日、搭乗日。仕入先は航空会社コードです。

use crate::error::MappingError;
use crate::mapping::columns::Field;
use crate::mapping::{Required, RowView};
use crate::types::{AirItinerary, CanonicalVoucher, Itinerary};

pub(crate) fn map(row: &RowView<'_>, handle: String) -> Result<CanonicalVoucher, MappingError> {
    let mut required = Required::new(row);
    let issue_date = required.date(Field::IssueDate);
    let departure = required.date(Field::Departure);
    required.finish()?;

    let mut header = row.header(handle, issue_date);
    header.vendor = row.codes().carrier_code(&row.text(Field::Carrier));

    let itinerary = AirItinerary {
        origin: row.text(Field::Origin).to_uppercase(),
        destination: row.text(Field::Destination).to_uppercase(),
        departure,
        return_date: row.date(Field::ReturnDate),
        flight_class: row.text(Field::FlightClass),
    };

    Ok(CanonicalVoucher {
        header,
        fare: row.fare(),
        itinerary: Itinerary::Air(itinerary),
    })
}
