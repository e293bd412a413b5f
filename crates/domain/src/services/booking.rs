//! Booking admission, cancellation and waitlist promotion.
//!
//! Every operation runs inside one [`BookingTransaction`] for the class, so the
//! capacity check and the write that depends on it can never interleave with
//! another request for the same class. When the backend reports a concurrent
//! conflict the operation is re-evaluated from scratch against fresh state, up
//! to `max_conflict_retries` extra attempts.

use std::future::Future;

use tracing::{info, warn};
use uuid::Uuid;

use super::waitlist;
use crate::errors::BookingError;
use crate::models::{
    Admission, Booking, BookingStatus, CancellationOutcome, ClassCancellation, ClassDetail,
    ClassRoster, NewBooking, Promotion,
};
use crate::stores::{BookingStore, BookingTransaction, ClassStore};

/// Default number of automatic retries after a concurrent conflict.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 1;

/// Booking engine over a [`BookingStore`].
#[derive(Clone)]
pub struct BookingService<S> {
    store: S,
    max_conflict_retries: u32,
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Override how many times a conflicting operation is re-run.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Admit a member to a class as confirmed or waitlisted.
    pub async fn request_booking(
        &self,
        class_id: Uuid,
        member_id: Uuid,
        is_drop_in: bool,
    ) -> Result<Admission, BookingError> {
        self.with_retry("request_booking", || {
            self.try_request_booking(class_id, member_id, is_drop_in)
        })
        .await
    }

    /// Cancel a confirmed or waitlisted booking.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<CancellationOutcome, BookingError> {
        self.with_retry("cancel_booking", || {
            self.try_release(booking_id, BookingStatus::Cancelled)
        })
        .await
    }

    /// Record that a confirmed member did not attend. The session stays used
    /// and the freed spot is offered to the waitlist.
    pub async fn mark_no_show(
        &self,
        booking_id: Uuid,
    ) -> Result<CancellationOutcome, BookingError> {
        self.with_retry("mark_no_show", || {
            self.try_release(booking_id, BookingStatus::NoShow)
        })
        .await
    }

    /// Move the next eligible waitlisted booking into a free spot.
    pub async fn promote(&self, class_id: Uuid) -> Result<Option<Promotion>, BookingError> {
        self.with_retry("promote", || self.try_promote(class_id))
            .await
    }

    /// Soft-cancel a class and release every active booking on it.
    pub async fn cancel_class(&self, class_id: Uuid) -> Result<ClassCancellation, BookingError> {
        self.with_retry("cancel_class", || self.try_cancel_class(class_id))
            .await
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, BookingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BookingError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_transient() && retries < self.max_conflict_retries => {
                    retries += 1;
                    warn!(operation, retries, error = %err, "Concurrent conflict, retrying");
                }
                result => return result,
            }
        }
    }

    async fn try_request_booking(
        &self,
        class_id: Uuid,
        member_id: Uuid,
        is_drop_in: bool,
    ) -> Result<Admission, BookingError> {
        let mut tx = self.store.begin(class_id).await?;

        let class = tx
            .get_class(class_id)
            .await?
            .ok_or(BookingError::ClassNotFound(class_id))?;
        let bookings = tx.list_active_bookings(class_id).await?;

        if bookings.iter().any(|b| b.member_id == member_id) {
            return Err(BookingError::AlreadyBooked);
        }
        if class.is_cancelled {
            return Err(BookingError::ClassCancelled);
        }
        if is_drop_in && class.requires_subscription {
            return Err(BookingError::DropInNotAllowed);
        }

        let subscription = if is_drop_in {
            None
        } else {
            let balance = tx
                .get_active_subscription(member_id)
                .await?
                .filter(|b| b.has_available_session())
                .ok_or(BookingError::NoActiveSubscription)?;
            Some(balance)
        };

        let confirmed = bookings.iter().filter(|b| b.is_confirmed()).count();
        let (status, position) = if class.has_room_for(confirmed) {
            (BookingStatus::Confirmed, None)
        } else {
            (BookingStatus::Waitlist, Some(waitlist::next_position(&bookings)))
        };

        let booking = tx
            .insert_booking(NewBooking {
                class_id,
                member_id,
                status,
                waitlist_position: position,
                is_drop_in,
            })
            .await?;

        if status == BookingStatus::Confirmed {
            if let Some(balance) = &subscription {
                tx.adjust_sessions_used(balance.subscription_id, 1).await?;
            }
        }

        tx.commit().await?;

        info!(
            class_id = %class_id,
            booking_id = %booking.id,
            member_id = %member_id,
            status = %status,
            position = ?position,
            is_drop_in,
            "Booking admitted"
        );

        Ok(Admission {
            booking,
            status,
            position,
        })
    }

    /// Shared path for cancellation and no-show.
    async fn try_release(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<CancellationOutcome, BookingError> {
        let class_id = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?
            .class_id;

        let mut tx = self.store.begin(class_id).await?;

        // Re-read under the class lock; the unlocked read only located the class.
        let booking = tx
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        let previous_status = booking.status;
        let allowed = match new_status {
            BookingStatus::NoShow => previous_status == BookingStatus::Confirmed,
            _ => previous_status.is_active(),
        };
        if !allowed {
            return Err(BookingError::BookingNotActive);
        }

        let class = tx
            .get_class(class_id)
            .await?
            .ok_or(BookingError::ClassNotFound(class_id))?;
        let bookings = tx.list_active_bookings(class_id).await?;

        if booking.waitlist_position.is_some() {
            tx.update_waitlist_position(booking_id, None).await?;
        }
        tx.update_booking_status(booking_id, new_status).await?;

        let remaining: Vec<Booking> = bookings
            .into_iter()
            .filter(|b| b.id != booking_id)
            .collect();

        let mut session_refunded = false;
        let mut promotion = None;
        match previous_status {
            BookingStatus::Confirmed => {
                if new_status == BookingStatus::Cancelled && !booking.is_drop_in {
                    session_refunded = refund_session(tx.as_mut(), &booking).await?;
                }
                promotion = waitlist::promote_next(tx.as_mut(), &class, &remaining).await?;
            }
            BookingStatus::Waitlist => {
                waitlist::compact(tx.as_mut(), &remaining, booking_id).await?;
            }
            BookingStatus::Cancelled | BookingStatus::NoShow => {}
        }

        tx.commit().await?;

        info!(
            class_id = %class_id,
            booking_id = %booking_id,
            member_id = %booking.member_id,
            previous_status = %previous_status,
            status = %new_status,
            session_refunded,
            promoted = ?promotion.as_ref().map(|p| p.booking.id),
            "Booking released"
        );

        Ok(CancellationOutcome {
            booking: Booking {
                status: new_status,
                waitlist_position: None,
                ..booking
            },
            previous_status,
            session_refunded,
            promotion,
        })
    }

    async fn try_promote(&self, class_id: Uuid) -> Result<Option<Promotion>, BookingError> {
        let mut tx = self.store.begin(class_id).await?;
        let class = tx
            .get_class(class_id)
            .await?
            .ok_or(BookingError::ClassNotFound(class_id))?;
        let bookings = tx.list_active_bookings(class_id).await?;

        let promotion = waitlist::promote_next(tx.as_mut(), &class, &bookings).await?;
        if promotion.is_some() {
            tx.commit().await?;
        }
        Ok(promotion)
    }

    async fn try_cancel_class(&self, class_id: Uuid) -> Result<ClassCancellation, BookingError> {
        let mut tx = self.store.begin(class_id).await?;
        let class = tx
            .get_class(class_id)
            .await?
            .ok_or(BookingError::ClassNotFound(class_id))?;

        if class.is_cancelled {
            return Ok(ClassCancellation {
                class_id,
                bookings_cancelled: 0,
                sessions_refunded: 0,
                already_cancelled: true,
            });
        }

        let bookings = tx.list_active_bookings(class_id).await?;
        tx.set_class_cancelled(class_id).await?;

        let mut sessions_refunded = 0;
        // Waitlist first, back to front, so positions are released without clashes.
        for booking in bookings.iter().rev() {
            if booking.waitlist_position.is_some() {
                tx.update_waitlist_position(booking.id, None).await?;
            }
            tx.update_booking_status(booking.id, BookingStatus::Cancelled)
                .await?;
            if booking.is_confirmed()
                && !booking.is_drop_in
                && refund_session(tx.as_mut(), booking).await?
            {
                sessions_refunded += 1;
            }
        }

        tx.commit().await?;

        info!(
            class_id = %class_id,
            bookings_cancelled = bookings.len(),
            sessions_refunded,
            "Class cancelled"
        );

        Ok(ClassCancellation {
            class_id,
            bookings_cancelled: bookings.len(),
            sessions_refunded,
            already_cancelled: false,
        })
    }
}

impl<S: BookingStore + ClassStore> BookingService<S> {
    /// Confirmed list and ordered waitlist of a class.
    pub async fn roster(&self, class_id: Uuid) -> Result<ClassRoster, BookingError> {
        let class = self
            .store
            .get_class(class_id)
            .await?
            .ok_or(BookingError::ClassNotFound(class_id))?;
        let bookings = self.store.list_active_bookings(class_id).await?;

        let waitlist: Vec<Booking> = waitlist::queue(&bookings).into_iter().cloned().collect();
        let confirmed: Vec<Booking> = bookings.into_iter().filter(|b| b.is_confirmed()).collect();

        Ok(ClassRoster {
            class_id,
            capacity: class.capacity,
            spots_left: class.spots_left(confirmed.len()),
            confirmed,
            waitlist,
        })
    }

    /// Class with its derived occupancy counts.
    pub async fn class_detail(&self, class_id: Uuid) -> Result<ClassDetail, BookingError> {
        let class = self
            .store
            .get_class(class_id)
            .await?
            .ok_or(BookingError::ClassNotFound(class_id))?;
        let bookings = self.store.list_active_bookings(class_id).await?;

        let confirmed = bookings.iter().filter(|b| b.is_confirmed()).count();
        let waiting = bookings.len() - confirmed;

        Ok(ClassDetail {
            spots_left: class.spots_left(confirmed),
            confirmed_count: confirmed as i64,
            waitlist_count: waiting as i64,
            class,
        })
    }
}

/// Give one session back to the member's active subscription, if any.
///
/// The credit lands on whichever subscription is active at cancellation time,
/// which after a renewal is not the one that was charged.
async fn refund_session(
    tx: &mut dyn BookingTransaction,
    booking: &Booking,
) -> Result<bool, BookingError> {
    match tx.get_active_subscription(booking.member_id).await? {
        Some(balance) => {
            tx.adjust_sessions_used(balance.subscription_id, -1).await?;
            Ok(true)
        }
        None => {
            warn!(
                booking_id = %booking.id,
                member_id = %booking.member_id,
                "No active subscription to refund session to"
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassInstance, NewClassInstance};
    use crate::stores::InMemoryStore;
    use chrono::NaiveDate;
    use std::sync::Arc;

    async fn class_with(
        store: &InMemoryStore,
        capacity: Option<i32>,
        requires_subscription: bool,
    ) -> ClassInstance {
        store
            .create_class(NewClassInstance {
                organization_id: Uuid::new_v4(),
                template_id: None,
                name: "HIIT".to_string(),
                class_type: "conditioning".to_string(),
                starts_at: NaiveDate::from_ymd_opt(2024, 6, 3)
                    .unwrap()
                    .and_hms_opt(18, 30, 0)
                    .unwrap(),
                duration_minutes: 45,
                capacity,
                location: Some("Studio 2".to_string()),
                requires_subscription,
                drop_in_price: Some(1500),
            })
            .await
            .unwrap()
    }

    async fn member(store: &InMemoryStore, sessions_total: Option<i32>) -> Uuid {
        let member_id = Uuid::new_v4();
        store.add_subscription(member_id, sessions_total, 0).await;
        member_id
    }

    async fn sessions_used(store: &InMemoryStore, member_id: Uuid) -> i32 {
        store.subscription_of(member_id).await.unwrap().sessions_used
    }

    fn positions(roster: &ClassRoster) -> Vec<(Uuid, Option<i32>)> {
        roster
            .waitlist
            .iter()
            .map(|b| (b.member_id, b.waitlist_position))
            .collect()
    }

    #[tokio::test]
    async fn test_confirms_until_full_then_waitlists() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(2), true).await;
        let service = BookingService::new(store.clone());

        let mut admissions = Vec::new();
        for _ in 0..4 {
            let member_id = member(&store, Some(10)).await;
            admissions.push(service.request_booking(class.id, member_id, false).await.unwrap());
        }

        let statuses: Vec<(BookingStatus, Option<i32>)> =
            admissions.iter().map(|a| (a.status, a.position)).collect();
        assert_eq!(
            statuses,
            vec![
                (BookingStatus::Confirmed, None),
                (BookingStatus::Confirmed, None),
                (BookingStatus::Waitlist, Some(1)),
                (BookingStatus::Waitlist, Some(2)),
            ]
        );
    }

    #[tokio::test]
    async fn test_unlimited_capacity_always_confirms() {
        let store = InMemoryStore::new();
        let class = class_with(&store, None, true).await;
        let service = BookingService::new(store.clone());

        for _ in 0..25 {
            let member_id = member(&store, None).await;
            let admission = service.request_booking(class.id, member_id, false).await.unwrap();
            assert_eq!(admission.status, BookingStatus::Confirmed);
        }

        let detail = service.class_detail(class.id).await.unwrap();
        assert_eq!(detail.confirmed_count, 25);
        assert_eq!(detail.spots_left, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_overbook() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(2), true).await;
        let service = Arc::new(BookingService::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let member_id = member(&store, Some(10)).await;
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.request_booking(class.id, member_id, false).await
            }));
        }

        let mut confirmed = 0;
        let mut waitlisted = Vec::new();
        for handle in handles {
            let admission = handle.await.unwrap().unwrap();
            match admission.status {
                BookingStatus::Confirmed => confirmed += 1,
                BookingStatus::Waitlist => waitlisted.push(admission.position),
                other => panic!("unexpected status {other}"),
            }
        }
        assert_eq!(confirmed, 2);
        assert_eq!(waitlisted, vec![Some(1)]);
    }

    #[tokio::test]
    async fn test_duplicate_booking_rejected() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());
        let member_id = member(&store, Some(10)).await;

        service.request_booking(class.id, member_id, false).await.unwrap();
        let err = service
            .request_booking(class.id, member_id, false)
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::AlreadyBooked);
        assert_eq!(sessions_used(&store, member_id).await, 1);
    }

    #[tokio::test]
    async fn test_member_can_rebook_after_cancelling() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());
        let member_id = member(&store, Some(10)).await;

        let first = service.request_booking(class.id, member_id, false).await.unwrap();
        service.cancel_booking(first.booking.id).await.unwrap();
        let second = service.request_booking(class.id, member_id, false).await.unwrap();

        assert_eq!(second.status, BookingStatus::Confirmed);
        assert_ne!(first.booking.id, second.booking.id);
    }

    #[tokio::test]
    async fn test_requires_available_session() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(5), true).await;
        let service = BookingService::new(store.clone());

        let no_subscription = Uuid::new_v4();
        let err = service
            .request_booking(class.id, no_subscription, false)
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::NoActiveSubscription);

        let exhausted = Uuid::new_v4();
        store.add_subscription(exhausted, Some(4), 4).await;
        let err = service
            .request_booking(class.id, exhausted, false)
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::NoActiveSubscription);
        assert!(store.bookings_for_class(class.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_drop_in_skips_subscription() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(5), false).await;
        let service = BookingService::new(store.clone());

        let admission = service
            .request_booking(class.id, Uuid::new_v4(), true)
            .await
            .unwrap();
        assert_eq!(admission.status, BookingStatus::Confirmed);
        assert!(admission.booking.is_drop_in);
    }

    #[tokio::test]
    async fn test_drop_in_rejected_for_subscription_classes() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(5), true).await;
        let service = BookingService::new(store.clone());

        let err = service
            .request_booking(class.id, Uuid::new_v4(), true)
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::DropInNotAllowed);
    }

    #[tokio::test]
    async fn test_unknown_and_cancelled_class() {
        let store = InMemoryStore::new();
        let service = BookingService::new(store.clone());
        let member_id = member(&store, Some(10)).await;

        let missing = Uuid::new_v4();
        assert_eq!(
            service.request_booking(missing, member_id, false).await.unwrap_err(),
            BookingError::ClassNotFound(missing)
        );

        let class = class_with(&store, Some(5), true).await;
        service.cancel_class(class.id).await.unwrap();
        assert_eq!(
            service.request_booking(class.id, member_id, false).await.unwrap_err(),
            BookingError::ClassCancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_confirmed_promotes_and_shifts_waitlist() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(2), true).await;
        let service = BookingService::new(store.clone());

        let mut members = Vec::new();
        let mut bookings = Vec::new();
        for _ in 0..5 {
            let member_id = member(&store, Some(10)).await;
            members.push(member_id);
            bookings.push(service.request_booking(class.id, member_id, false).await.unwrap());
        }

        let outcome = service.cancel_booking(bookings[0].booking.id).await.unwrap();
        assert_eq!(outcome.previous_status, BookingStatus::Confirmed);
        assert!(outcome.session_refunded);
        let promotion = outcome.promotion.unwrap();
        assert_eq!(promotion.booking.member_id, members[2]);
        assert_eq!(promotion.from_position, 1);
        assert!(promotion.skipped.is_empty());

        let roster = service.roster(class.id).await.unwrap();
        assert_eq!(roster.confirmed.len(), 2);
        assert_eq!(
            positions(&roster),
            vec![(members[3], Some(1)), (members[4], Some(2))]
        );
        assert_eq!(sessions_used(&store, members[0]).await, 0);
        assert_eq!(sessions_used(&store, members[2]).await, 1);
    }

    #[tokio::test]
    async fn test_cancel_waitlisted_shifts_those_behind() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        let mut members = Vec::new();
        let mut bookings = Vec::new();
        for _ in 0..4 {
            let member_id = member(&store, Some(10)).await;
            members.push(member_id);
            bookings.push(service.request_booking(class.id, member_id, false).await.unwrap());
        }

        let outcome = service.cancel_booking(bookings[1].booking.id).await.unwrap();
        assert_eq!(outcome.previous_status, BookingStatus::Waitlist);
        assert!(!outcome.session_refunded);
        assert!(outcome.promotion.is_none());

        let roster = service.roster(class.id).await.unwrap();
        assert_eq!(
            positions(&roster),
            vec![(members[2], Some(1)), (members[3], Some(2))]
        );
        assert_eq!(sessions_used(&store, members[1]).await, 0);
    }

    #[tokio::test]
    async fn test_promotion_skips_member_without_sessions() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        let holder = member(&store, Some(10)).await;
        let held = service.request_booking(class.id, holder, false).await.unwrap();

        let exhausted = Uuid::new_v4();
        store.add_subscription(exhausted, Some(1), 0).await;
        service.request_booking(class.id, exhausted, false).await.unwrap();
        let eligible = member(&store, Some(10)).await;
        service.request_booking(class.id, eligible, false).await.unwrap();

        // Use up the only session of the first waitlisted member elsewhere.
        let other = class_with(&store, Some(5), true).await;
        service.request_booking(other.id, exhausted, false).await.unwrap();

        let outcome = service.cancel_booking(held.booking.id).await.unwrap();
        let promotion = outcome.promotion.unwrap();
        assert_eq!(promotion.booking.member_id, eligible);
        assert_eq!(promotion.from_position, 2);
        assert_eq!(promotion.skipped.len(), 1);

        let roster = service.roster(class.id).await.unwrap();
        assert_eq!(positions(&roster), vec![(exhausted, Some(1))]);
    }

    #[tokio::test]
    async fn test_no_eligible_candidate_leaves_spot_open() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        let holder = member(&store, Some(10)).await;
        let held = service.request_booking(class.id, holder, false).await.unwrap();
        let waiting = Uuid::new_v4();
        store.add_subscription(waiting, Some(1), 0).await;
        service.request_booking(class.id, waiting, false).await.unwrap();
        let other = class_with(&store, None, true).await;
        service.request_booking(other.id, waiting, false).await.unwrap();

        let outcome = service.cancel_booking(held.booking.id).await.unwrap();
        assert!(outcome.promotion.is_none());

        let detail = service.class_detail(class.id).await.unwrap();
        assert_eq!(detail.confirmed_count, 0);
        assert_eq!(detail.waitlist_count, 1);
        assert_eq!(detail.spots_left, Some(1));
    }

    #[tokio::test]
    async fn test_drop_in_waitlist_promoted_without_subscription() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), false).await;
        let service = BookingService::new(store.clone());

        let holder = service
            .request_booking(class.id, Uuid::new_v4(), true)
            .await
            .unwrap();
        let walk_in = Uuid::new_v4();
        service.request_booking(class.id, walk_in, true).await.unwrap();

        let outcome = service.cancel_booking(holder.booking.id).await.unwrap();
        assert!(!outcome.session_refunded);
        assert_eq!(outcome.promotion.unwrap().booking.member_id, walk_in);
    }

    #[tokio::test]
    async fn test_cancel_twice_rejected() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(3), true).await;
        let service = BookingService::new(store.clone());
        let member_id = member(&store, Some(10)).await;

        let admission = service.request_booking(class.id, member_id, false).await.unwrap();
        service.cancel_booking(admission.booking.id).await.unwrap();
        let err = service.cancel_booking(admission.booking.id).await.unwrap_err();
        assert_eq!(err, BookingError::BookingNotActive);
        assert_eq!(sessions_used(&store, member_id).await, 0);

        let missing = Uuid::new_v4();
        assert_eq!(
            service.cancel_booking(missing).await.unwrap_err(),
            BookingError::BookingNotFound(missing)
        );
    }

    #[tokio::test]
    async fn test_session_accounting_balances_out() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(2), true).await;
        let service = BookingService::new(store.clone());

        let a = member(&store, Some(10)).await;
        let b = member(&store, Some(10)).await;
        let c = member(&store, Some(10)).await;
        let booking_a = service.request_booking(class.id, a, false).await.unwrap();
        service.request_booking(class.id, b, false).await.unwrap();
        let booking_c = service.request_booking(class.id, c, false).await.unwrap();
        assert_eq!(sessions_used(&store, c).await, 0);

        service.cancel_booking(booking_a.booking.id).await.unwrap();
        service.cancel_booking(booking_c.booking.id).await.unwrap();

        assert_eq!(sessions_used(&store, a).await, 0);
        assert_eq!(sessions_used(&store, b).await, 1);
        assert_eq!(sessions_used(&store, c).await, 0);
    }

    #[tokio::test]
    async fn test_refund_goes_to_subscription_active_at_cancellation() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(5), true).await;
        let service = BookingService::new(store.clone());

        let a = member(&store, Some(10)).await;
        let admission = service.request_booking(class.id, a, false).await.unwrap();
        assert_eq!(sessions_used(&store, a).await, 1);

        store.end_subscriptions(a).await;
        let renewed = store.add_subscription(a, Some(10), 3).await;

        let outcome = service.cancel_booking(admission.booking.id).await.unwrap();
        assert!(outcome.session_refunded);
        let balance = store.subscription_of(a).await.unwrap();
        assert_eq!(balance.subscription_id, renewed.subscription_id);
        assert_eq!(balance.sessions_used, 2);
    }

    #[tokio::test]
    async fn test_cancel_without_active_subscription_skips_refund() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(5), true).await;
        let service = BookingService::new(store.clone());

        let a = member(&store, Some(10)).await;
        let admission = service.request_booking(class.id, a, false).await.unwrap();
        store.end_subscriptions(a).await;

        let outcome = service.cancel_booking(admission.booking.id).await.unwrap();
        assert!(!outcome.session_refunded);
        assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_no_show_keeps_session_and_promotes() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        let absent = member(&store, Some(10)).await;
        let waiting = member(&store, Some(10)).await;
        let admission = service.request_booking(class.id, absent, false).await.unwrap();
        service.request_booking(class.id, waiting, false).await.unwrap();

        let outcome = service.mark_no_show(admission.booking.id).await.unwrap();
        assert_eq!(outcome.booking.status, BookingStatus::NoShow);
        assert!(!outcome.session_refunded);
        assert_eq!(outcome.promotion.unwrap().booking.member_id, waiting);
        assert_eq!(sessions_used(&store, absent).await, 1);
        assert_eq!(sessions_used(&store, waiting).await, 1);
    }

    #[tokio::test]
    async fn test_no_show_requires_confirmed_booking() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        service
            .request_booking(class.id, member(&store, Some(10)).await, false)
            .await
            .unwrap();
        let waitlisted = service
            .request_booking(class.id, member(&store, Some(10)).await, false)
            .await
            .unwrap();

        let err = service.mark_no_show(waitlisted.booking.id).await.unwrap_err();
        assert_eq!(err, BookingError::BookingNotActive);
    }

    #[tokio::test]
    async fn test_promote_is_noop_when_full() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        service
            .request_booking(class.id, member(&store, Some(10)).await, false)
            .await
            .unwrap();
        service
            .request_booking(class.id, member(&store, Some(10)).await, false)
            .await
            .unwrap();

        assert!(service.promote(class.id).await.unwrap().is_none());
        let roster = service.roster(class.id).await.unwrap();
        assert_eq!(roster.waitlist.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_class_releases_everything_once() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(1), true).await;
        let service = BookingService::new(store.clone());

        let confirmed = member(&store, Some(10)).await;
        let waiting = member(&store, Some(10)).await;
        service.request_booking(class.id, confirmed, false).await.unwrap();
        service.request_booking(class.id, waiting, false).await.unwrap();

        let result = service.cancel_class(class.id).await.unwrap();
        assert_eq!(result.bookings_cancelled, 2);
        assert_eq!(result.sessions_refunded, 1);
        assert!(!result.already_cancelled);
        assert_eq!(sessions_used(&store, confirmed).await, 0);
        assert!(store
            .bookings_for_class(class.id)
            .await
            .iter()
            .all(|b| b.status == BookingStatus::Cancelled && b.waitlist_position.is_none()));

        let again = service.cancel_class(class.id).await.unwrap();
        assert!(again.already_cancelled);
        assert_eq!(again.bookings_cancelled, 0);
        assert_eq!(sessions_used(&store, confirmed).await, 0);
    }

    #[tokio::test]
    async fn test_conflict_is_retried_once() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(2), true).await;
        let service = BookingService::new(store.clone());
        let member_id = member(&store, Some(10)).await;

        store.inject_conflicts(1).await;
        let admission = service.request_booking(class.id, member_id, false).await.unwrap();
        assert_eq!(admission.status, BookingStatus::Confirmed);
        assert_eq!(store.bookings_for_class(class.id).await.len(), 1);
        assert_eq!(sessions_used(&store, member_id).await, 1);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces() {
        let store = InMemoryStore::new();
        let class = class_with(&store, Some(2), true).await;
        let service = BookingService::new(store.clone()).with_conflict_retries(2);
        let member_id = member(&store, Some(10)).await;

        store.inject_conflicts(3).await;
        let err = service
            .request_booking(class.id, member_id, false)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(store.bookings_for_class(class.id).await.is_empty());
        assert_eq!(sessions_used(&store, member_id).await, 0);
    }
}
