use aero_core::{
    BookingError, CoreResult, Entity, Passenger, PassengerInfo, PassengerPatch, StoreTx,
};
use tracing::{error, info};
use uuid::Uuid;

pub struct PassengerRegistrar;

impl PassengerRegistrar {
    /// Insert a passenger under `booking_id`.
    pub async fn register(
        tx: &mut dyn StoreTx,
        booking_id: Uuid,
        info: PassengerInfo,
    ) -> CoreResult<Passenger> {
        let passenger = Passenger::new(booking_id, info);

        if let Err(e) = tx.insert_passenger(&passenger).await {
            error!("Failed to register passenger for booking {}: {}", booking_id, e);
            return Err(match e {
                BookingError::IntegrityViolation { detail, .. } => {
                    BookingError::integrity(Entity::Passenger, detail)
                }
                other => other,
            });
        }

        info!("Registered passenger {} on booking {}", passenger.id, booking_id);
        Ok(passenger)
    }

    pub async fn passengers_for_booking(
        tx: &mut dyn StoreTx,
        booking_id: Uuid,
    ) -> CoreResult<Vec<Passenger>> {
        tx.passengers_for_booking(booking_id).await
    }

    pub async fn get(tx: &mut dyn StoreTx, passenger_id: Uuid) -> CoreResult<Passenger> {
        tx.get_passenger(passenger_id)
            .await?
            .ok_or_else(|| BookingError::not_found(Entity::Passenger, passenger_id))
    }

    pub async fn update(
        tx: &mut dyn StoreTx,
        passenger_id: Uuid,
        patch: PassengerPatch,
    ) -> CoreResult<Passenger> {
        let mut passenger = Self::get(tx, passenger_id).await?;
        patch.apply(&mut passenger)?;
        tx.update_passenger(&passenger).await?;

        info!("Updated passenger {}", passenger.id);
        Ok(passenger)
    }
}
