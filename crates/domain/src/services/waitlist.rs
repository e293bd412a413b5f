//! Waitlist ordering and promotion.
//!
//! Positions of active waitlist entries always form the sequence 1..n. Every
//! removal from the waitlist (cancellation or promotion) renumbers the entries
//! behind it, walking the queue front to back so no two entries ever share a
//! position mid-update.

use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Booking, BookingStatus, ClassInstance, Promotion};
use crate::stores::BookingTransaction;

/// Waitlisted bookings in queue order (position, then arrival).
pub fn queue(bookings: &[Booking]) -> Vec<&Booking> {
    let mut waiting: Vec<&Booking> = bookings.iter().filter(|b| b.is_waitlisted()).collect();
    waiting.sort_by_key(|b| (b.waitlist_position.unwrap_or(i32::MAX), b.created_at, b.id));
    waiting
}

/// Position a newly waitlisted booking receives.
pub fn next_position(bookings: &[Booking]) -> i32 {
    bookings
        .iter()
        .filter(|b| b.is_waitlisted())
        .filter_map(|b| b.waitlist_position)
        .max()
        .map_or(1, |max| max + 1)
}

/// Position updates that make the waitlist dense again once `removed` has
/// left it. Returned front to back.
pub fn compaction(bookings: &[Booking], removed: Uuid) -> Vec<(Uuid, i32)> {
    queue(bookings)
        .into_iter()
        .filter(|b| b.id != removed)
        .enumerate()
        .filter_map(|(index, b)| {
            let expected = index as i32 + 1;
            (b.waitlist_position != Some(expected)).then_some((b.id, expected))
        })
        .collect()
}

/// Apply [`compaction`] inside a unit of work.
pub async fn compact(
    tx: &mut dyn BookingTransaction,
    bookings: &[Booking],
    removed: Uuid,
) -> Result<usize, StoreError> {
    let shifts = compaction(bookings, removed);
    for (id, position) in &shifts {
        tx.update_waitlist_position(*id, Some(*position)).await?;
    }
    Ok(shifts.len())
}

/// Promote the first waitlisted booking whose member can take the spot.
///
/// `bookings` is the class's active set as read inside `tx`. Members without
/// an available session keep their place and the next position is tried.
/// Nothing happens for a cancelled or full class.
pub async fn promote_next(
    tx: &mut dyn BookingTransaction,
    class: &ClassInstance,
    bookings: &[Booking],
) -> Result<Option<Promotion>, StoreError> {
    if class.is_cancelled {
        return Ok(None);
    }

    let confirmed = bookings.iter().filter(|b| b.is_confirmed()).count();
    if !class.has_room_for(confirmed) {
        return Ok(None);
    }

    let mut skipped = Vec::new();
    for candidate in queue(bookings) {
        let subscription = if candidate.is_drop_in {
            None
        } else {
            match tx.get_active_subscription(candidate.member_id).await? {
                Some(balance) if balance.has_available_session() => Some(balance),
                _ => {
                    debug!(
                        class_id = %class.id,
                        booking_id = %candidate.id,
                        member_id = %candidate.member_id,
                        "Waitlisted member has no available session, trying next"
                    );
                    skipped.push(candidate.id);
                    continue;
                }
            }
        };

        let from_position = candidate.waitlist_position.unwrap_or_default();
        tx.update_waitlist_position(candidate.id, None).await?;
        tx.update_booking_status(candidate.id, BookingStatus::Confirmed)
            .await?;
        if let Some(balance) = &subscription {
            tx.adjust_sessions_used(balance.subscription_id, 1).await?;
        }
        compact(tx, bookings, candidate.id).await?;

        info!(
            class_id = %class.id,
            booking_id = %candidate.id,
            member_id = %candidate.member_id,
            from_position,
            skipped = skipped.len(),
            "Promoted waitlisted booking"
        );

        return Ok(Some(Promotion {
            booking: Booking {
                status: BookingStatus::Confirmed,
                waitlist_position: None,
                ..candidate.clone()
            },
            from_position,
            skipped,
        }));
    }

    Ok(None)
}
