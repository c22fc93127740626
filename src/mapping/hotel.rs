//! ホテルのマッピング
//!
//! 必須: ハンドル、発行日、チェックイン日、チェックアウト日。

use crate::error::MappingError;
use crate::mapping::columns::Field;
use crate::mapping::{Required, RowView};
use crate::types::{CanonicalVoucher, HotelStay, Itinerary};

pub(crate) fn map(row: &RowView<'_>, handle: String) -> Result<CanonicalVoucher, MappingError> {
    let mut required = Required::new(row);
    let issue_date = required.date(Field::IssueDate);
    let check_in = required.date(Field::CheckIn);
    let check_out = required.date(Field::CheckOut);
    required.finish()?;

    let stay = HotelStay {
        hotel_name: row.text(Field::HotelName),
        city: row.text(Field::City),
        check_in,
        check_out,
        accommodation: row.text(Field::Accommodation),
    };

    let mut header = row.header(handle, issue_date);
    if header.vendor.is_empty() {
        header.vendor = stay.hotel_name.to_lowercase();
    }

    Ok(CanonicalVoucher {
        header,
        fare: row.fare(),
        itinerary: Itinerary::Hotel(stay),
    })
}
