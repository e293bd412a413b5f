//! PostgreSQL implementation of the domain store traits.
//!
//! A booking unit of work is one database transaction that starts by locking
//! the class row with `SELECT ... FOR UPDATE`. Every booking mutation for the
//! class goes through that lock, so admission and promotion decisions are
//! always made against the current committed state.

use chrono::NaiveDateTime;
use domain::errors::StoreError;
use domain::models::{
    Booking, BookingStatus, ClassInstance, ClassTemplate, NewBooking, NewClassInstance,
    NewClassTemplate, SubscriptionBalance,
};
use domain::stores::{BookingStore, BookingTransaction, ClassStore, TemplateStore};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::repositories::{
    BookingRepository, ClassRepository, ClassTemplateRepository, SubscriptionRepository,
};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Classify a database error for the domain layer.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                StoreError::Conflict(db_err.message().to_string())
            }
            Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) | Some(CHECK_VIOLATION) => {
                StoreError::Constraint(db_err.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        },
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn expect_one(rows: u64, what: &str, id: Uuid) -> Result<(), StoreError> {
    if rows == 0 {
        return Err(StoreError::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}

/// Store backed by the scheduling tables.
#[derive(Clone)]
pub struct PgSchedulingStore {
    pool: PgPool,
    templates: ClassTemplateRepository,
    classes: ClassRepository,
    bookings: BookingRepository,
}

impl PgSchedulingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            templates: ClassTemplateRepository::new(pool.clone()),
            classes: ClassRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl TemplateStore for PgSchedulingStore {
    async fn get_template(&self, id: Uuid) -> Result<Option<ClassTemplate>, StoreError> {
        let entity = self.templates.find_by_id(id).await.map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }

    async fn create_template(&self, data: NewClassTemplate) -> Result<ClassTemplate, StoreError> {
        let entity = self.templates.create(&data).await.map_err(map_sqlx_error)?;
        Ok(entity.into())
    }
}

#[async_trait::async_trait]
impl ClassStore for PgSchedulingStore {
    async fn find_class_at(
        &self,
        organization_id: Uuid,
        starts_at: NaiveDateTime,
    ) -> Result<Option<ClassInstance>, StoreError> {
        let entity = self
            .classes
            .find_active_at(organization_id, starts_at)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }

    async fn create_class(&self, data: NewClassInstance) -> Result<ClassInstance, StoreError> {
        let entity = self.classes.create(&data).await.map_err(map_sqlx_error)?;
        Ok(entity.into())
    }

    async fn get_class(&self, id: Uuid) -> Result<Option<ClassInstance>, StoreError> {
        let entity = self.classes.find_by_id(id).await.map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }
}

#[async_trait::async_trait]
impl BookingStore for PgSchedulingStore {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let entity = self.bookings.find_by_id(id).await.map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list_active_bookings(&self, class_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let entities = self
            .bookings
            .list_active(class_id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_classes_awaiting_promotion(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Uuid>, StoreError> {
        self.classes
            .find_awaiting_promotion(from, until)
            .await
            .map_err(map_sqlx_error)
    }

    async fn begin(&self, class_id: Uuid) -> Result<Box<dyn BookingTransaction>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let locked = ClassRepository::lock_for_update(&mut tx, class_id)
            .await
            .map_err(map_sqlx_error)?;
        debug!(class_id = %class_id, found = locked.is_some(), "Locked class for booking");
        Ok(Box::new(PgBookingTransaction { tx }))
    }
}

/// Booking unit of work holding the class row lock. Dropping it rolls back.
pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl BookingTransaction for PgBookingTransaction {
    async fn get_class(&mut self, id: Uuid) -> Result<Option<ClassInstance>, StoreError> {
        // Already locked by `begin`; re-locking in the same transaction is free.
        let entity = ClassRepository::lock_for_update(&mut self.tx, id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }

    async fn set_class_cancelled(&mut self, id: Uuid) -> Result<(), StoreError> {
        let rows = ClassRepository::mark_cancelled(&mut self.tx, id)
            .await
            .map_err(map_sqlx_error)?;
        expect_one(rows, "class", id)
    }

    async fn get_booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let entity = BookingRepository::find_by_id_in(&mut self.tx, id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list_active_bookings(&mut self, class_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let entities = BookingRepository::list_active_in(&mut self.tx, class_id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn insert_booking(&mut self, data: NewBooking) -> Result<Booking, StoreError> {
        let entity = BookingRepository::insert_in(&mut self.tx, &data)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entity.into())
    }

    async fn update_booking_status(
        &mut self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let rows = BookingRepository::update_status_in(&mut self.tx, id, status)
            .await
            .map_err(map_sqlx_error)?;
        expect_one(rows, "booking", id)
    }

    async fn update_waitlist_position(
        &mut self,
        id: Uuid,
        position: Option<i32>,
    ) -> Result<(), StoreError> {
        let rows = BookingRepository::update_position_in(&mut self.tx, id, position)
            .await
            .map_err(map_sqlx_error)?;
        expect_one(rows, "booking", id)
    }

    async fn get_active_subscription(
        &mut self,
        member_id: Uuid,
    ) -> Result<Option<SubscriptionBalance>, StoreError> {
        let entity = SubscriptionRepository::lock_active_for_member(&mut self.tx, member_id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(entity.map(Into::into))
    }

    async fn adjust_sessions_used(
        &mut self,
        subscription_id: Uuid,
        delta: i32,
    ) -> Result<(), StoreError> {
        let rows = SubscriptionRepository::adjust_sessions_used_in(
            &mut self.tx,
            subscription_id,
            delta,
        )
        .await
        .map_err(map_sqlx_error)?;
        expect_one(rows, "subscription", subscription_id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
