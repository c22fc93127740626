//! 長距離バスのマッピング
//!
//! 必須: ハンドル、発行日、乗車日。

use crate::error::MappingError;
use crate::mapping::columns::Field;
use crate::mapping::{Required, RowView};
use crate::types::{BusTrip, CanonicalVoucher, Itinerary};

pub(crate) fn map(row: &RowView<'_>, handle: String) -> Result<CanonicalVoucher, MappingError> {
    let mut required = Required::new(row);
    let issue_date = required.date(Field::IssueDate);
    let entry_date = required.date(Field::EntryDate);
    required.finish()?;

    let trip = BusTrip {
        company: row.text(Field::Company),
        entry_date,
        origin_city: row.text(Field::Origin).to_uppercase(),
        destination_city: row.text(Field::Destination).to_uppercase(),
    };

    let mut header = row.header(handle, issue_date);
    if header.vendor.is_empty() {
        header.vendor = trip.company.to_lowercase();
    }

    Ok(CanonicalVoucher {
        header,
        fare: row.fare(),
        itinerary: Itinerary::Bus(trip),
    })
}
