//! Explicit partial updates. Each patch lists the fields a caller may change;
//! `None` leaves the stored value untouched.

use aero_shared::Masked;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, CoreResult};
use crate::models::{
    check_passport, check_required, Booking, Passenger, MAX_NAME_LEN, MAX_NATIONALITY_LEN,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingPatch {
    pub total_price: Option<i64>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.total_price.is_none()
    }

    pub fn apply(self, booking: &mut Booking) -> CoreResult<()> {
        if let Some(price) = self.total_price {
            if price < 0 {
                return Err(BookingError::Validation(
                    "total_price must not be negative".to_string(),
                ));
            }
            booking.total_price = price;
        }
        Ok(())
    }
}

/// Passengers never move between bookings, so the owning booking is not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassengerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// `Some(None)` clears the passport number.
    #[serde(default, with = "double_option")]
    pub passport_number: Option<Option<Masked<String>>>,
}

impl PassengerPatch {
    /// Checks every given field before touching the passenger, so a rejected
    /// patch leaves it unchanged.
    pub fn apply(self, passenger: &mut Passenger) -> CoreResult<()> {
        self.validate()?;

        if let Some(first_name) = self.first_name {
            passenger.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            passenger.last_name = last_name;
        }
        if let Some(nationality) = self.nationality {
            passenger.nationality = nationality;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            passenger.date_of_birth = date_of_birth;
        }
        if let Some(passport_number) = self.passport_number {
            passenger.passport_number = passport_number;
        }
        Ok(())
    }

    fn validate(&self) -> CoreResult<()> {
        if let Some(first_name) = &self.first_name {
            check_required("first_name", first_name, MAX_NAME_LEN)?;
        }
        if let Some(last_name) = &self.last_name {
            check_required("last_name", last_name, MAX_NAME_LEN)?;
        }
        if let Some(nationality) = &self.nationality {
            check_required("nationality", nationality, MAX_NATIONALITY_LEN)?;
        }
        if let Some(Some(passport)) = &self.passport_number {
            check_passport(passport)?;
        }
        Ok(())
    }
}

// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
