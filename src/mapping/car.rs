//! レンタカーのマッピング
//!
//! 必須: ハンドル、発行日、貸出日、返却日。

use crate::error::MappingError;
use crate::mapping::columns::Field;
use crate::mapping::{Required, RowView};
use crate::types::{CanonicalVoucher, CarRental, Itinerary};

pub(crate) fn map(row: &RowView<'_>, handle: String) -> Result<CanonicalVoucher, MappingError> {
    let mut required = Required::new(row);
    let issue_date = required.date(Field::IssueDate);
    let pickup_date = required.date(Field::PickupDate);
    let return_date = required.date(Field::DropoffDate);
    required.finish()?;

    let pickup_city = row.text(Field::PickupCity);
    // 返却都市が空の場合は貸出都市に返却
    let return_city = match row.text(Field::DropoffCity) {
        city if city.is_empty() => pickup_city.clone(),
        city => city,
    };

    let rental = CarRental {
        company: row.text(Field::Company),
        pickup_city,
        pickup_date,
        return_city,
        return_date,
    };

    let mut header = row.header(handle, issue_date);
    if header.vendor.is_empty() {
        header.vendor = rental.company.to_lowercase();
    }

    Ok(CanonicalVoucher {
        header,
        fare: row.fare(),
        itinerary: Itinerary::Car(rental),
    })
}
