//! In-memory store for development and testing.
//!
//! A booking unit of work holds the store mutex for its whole lifetime and
//! writes into a private copy of the state, which replaces the shared state on
//! commit. Dropping the unit leaves the shared state untouched.

use chrono::{NaiveDateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    active_booking_order, BookingStore, BookingTransaction, ClassStore, TemplateStore,
};
use crate::errors::StoreError;
use crate::models::{
    Booking, BookingStatus, ClassInstance, ClassTemplate, NewBooking, NewClassInstance,
    NewClassTemplate, SubscriptionBalance,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    templates: HashMap<Uuid, ClassTemplate>,
    classes: HashMap<Uuid, ClassInstance>,
    bookings: HashMap<Uuid, Booking>,
    subscriptions: HashMap<Uuid, SubscriptionBalance>,
    /// Start times for which `create_class` fails.
    failing_slots: HashSet<NaiveDateTime>,
    /// Number of upcoming commits that report a conflict.
    pending_conflicts: u32,
}

impl MemoryState {
    fn active_bookings(&self, class_id: Uuid) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .values()
            .filter(|b| b.class_id == class_id && b.status.is_active())
            .cloned()
            .collect();
        bookings.sort_by_key(active_booking_order);
        bookings
    }

    fn booking_mut(&mut self, id: Uuid) -> Result<&mut Booking, StoreError> {
        self.bookings
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", id)))
    }
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active subscription for a member.
    pub async fn add_subscription(
        &self,
        member_id: Uuid,
        sessions_total: Option<i32>,
        sessions_used: i32,
    ) -> SubscriptionBalance {
        let balance = SubscriptionBalance {
            subscription_id: Uuid::new_v4(),
            member_id,
            sessions_total,
            sessions_used,
        };
        let mut state = self.state.lock().await;
        state
            .subscriptions
            .insert(balance.subscription_id, balance.clone());
        balance
    }

    /// Drop every subscription a member holds, as if it expired.
    pub async fn end_subscriptions(&self, member_id: Uuid) {
        let mut state = self.state.lock().await;
        state.subscriptions.retain(|_, s| s.member_id != member_id);
    }

    /// Current balance of a member's subscription.
    pub async fn subscription_of(&self, member_id: Uuid) -> Option<SubscriptionBalance> {
        let state = self.state.lock().await;
        state
            .subscriptions
            .values()
            .find(|s| s.member_id == member_id)
            .cloned()
    }

    /// All bookings of a class regardless of status.
    pub async fn bookings_for_class(&self, class_id: Uuid) -> Vec<Booking> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.class_id == class_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.created_at, b.id));
        bookings
    }

    /// Number of stored classes, cancelled ones included.
    pub async fn class_count(&self) -> usize {
        self.state.lock().await.classes.len()
    }

    /// Make `create_class` fail for a given start time.
    pub async fn fail_class_creation_at(&self, starts_at: NaiveDateTime) {
        self.state.lock().await.failing_slots.insert(starts_at);
    }

    /// Make the next `count` booking commits report a concurrent conflict.
    pub async fn inject_conflicts(&self, count: u32) {
        self.state.lock().await.pending_conflicts = count;
    }
}

#[async_trait::async_trait]
impl TemplateStore for InMemoryStore {
    async fn get_template(&self, id: Uuid) -> Result<Option<ClassTemplate>, StoreError> {
        Ok(self.state.lock().await.templates.get(&id).cloned())
    }

    async fn create_template(&self, data: NewClassTemplate) -> Result<ClassTemplate, StoreError> {
        let template = ClassTemplate {
            id: Uuid::new_v4(),
            organization_id: data.organization_id,
            name: data.name,
            class_type: data.class_type,
            duration_minutes: data.duration_minutes,
            capacity: data.capacity,
            location: data.location,
            requires_subscription: data.requires_subscription,
            drop_in_price: data.drop_in_price,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .templates
            .insert(template.id, template.clone());
        Ok(template)
    }
}

#[async_trait::async_trait]
impl ClassStore for InMemoryStore {
    async fn find_class_at(
        &self,
        organization_id: Uuid,
        starts_at: NaiveDateTime,
    ) -> Result<Option<ClassInstance>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .classes
            .values()
            .find(|c| {
                c.organization_id == organization_id && c.starts_at == starts_at && !c.is_cancelled
            })
            .cloned())
    }

    async fn create_class(&self, data: NewClassInstance) -> Result<ClassInstance, StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_slots.contains(&data.starts_at) {
            return Err(StoreError::Backend(format!(
                "simulated failure creating class at {}",
                data.starts_at
            )));
        }
        let clash = state.classes.values().any(|c| {
            c.organization_id == data.organization_id
                && c.starts_at == data.starts_at
                && !c.is_cancelled
        });
        if clash {
            return Err(StoreError::Constraint(format!(
                "class already scheduled at {}",
                data.starts_at
            )));
        }

        let class = ClassInstance {
            id: Uuid::new_v4(),
            organization_id: data.organization_id,
            template_id: data.template_id,
            name: data.name,
            class_type: data.class_type,
            starts_at: data.starts_at,
            duration_minutes: data.duration_minutes,
            capacity: data.capacity,
            location: data.location,
            requires_subscription: data.requires_subscription,
            drop_in_price: data.drop_in_price,
            is_cancelled: false,
            created_at: Utc::now(),
        };
        state.classes.insert(class.id, class.clone());
        Ok(class)
    }

    async fn get_class(&self, id: Uuid) -> Result<Option<ClassInstance>, StoreError> {
        Ok(self.state.lock().await.classes.get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl BookingStore for InMemoryStore {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_active_bookings(&self, class_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        Ok(self.state.lock().await.active_bookings(class_id))
    }

    async fn list_classes_awaiting_promotion(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Uuid>, StoreError> {
        let state = self.state.lock().await;
        let mut classes: Vec<&ClassInstance> = state
            .classes
            .values()
            .filter(|c| !c.is_cancelled && c.starts_at >= from && c.starts_at < until)
            .filter(|c| {
                let active = state.active_bookings(c.id);
                let confirmed = active.iter().filter(|b| b.is_confirmed()).count();
                active.iter().any(|b| b.is_waitlisted()) && c.has_room_for(confirmed)
            })
            .collect();
        classes.sort_by_key(|c| (c.starts_at, c.id));
        Ok(classes.into_iter().map(|c| c.id).collect())
    }

    async fn begin(&self, _class_id: Uuid) -> Result<Box<dyn BookingTransaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Unit of work over the in-memory state.
struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait::async_trait]
impl BookingTransaction for MemoryTransaction {
    async fn get_class(&mut self, id: Uuid) -> Result<Option<ClassInstance>, StoreError> {
        Ok(self.working.classes.get(&id).cloned())
    }

    async fn set_class_cancelled(&mut self, id: Uuid) -> Result<(), StoreError> {
        let class = self
            .working
            .classes
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("class {}", id)))?;
        class.is_cancelled = true;
        Ok(())
    }

    async fn get_booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.working.bookings.get(&id).cloned())
    }

    async fn list_active_bookings(&mut self, class_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        Ok(self.working.active_bookings(class_id))
    }

    async fn insert_booking(&mut self, data: NewBooking) -> Result<Booking, StoreError> {
        let duplicate = self.working.bookings.values().any(|b| {
            b.class_id == data.class_id && b.member_id == data.member_id && b.status.is_active()
        });
        if duplicate {
            return Err(StoreError::Constraint(format!(
                "member {} already booked class {}",
                data.member_id, data.class_id
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            class_id: data.class_id,
            member_id: data.member_id,
            status: data.status,
            waitlist_position: data.waitlist_position,
            is_drop_in: data.is_drop_in,
            created_at: Utc::now(),
        };
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update_booking_status(
        &mut self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        self.working.booking_mut(id)?.status = status;
        Ok(())
    }

    async fn update_waitlist_position(
        &mut self,
        id: Uuid,
        position: Option<i32>,
    ) -> Result<(), StoreError> {
        self.working.booking_mut(id)?.waitlist_position = position;
        Ok(())
    }

    async fn get_active_subscription(
        &mut self,
        member_id: Uuid,
    ) -> Result<Option<SubscriptionBalance>, StoreError> {
        Ok(self
            .working
            .subscriptions
            .values()
            .find(|s| s.member_id == member_id)
            .cloned())
    }

    async fn adjust_sessions_used(
        &mut self,
        subscription_id: Uuid,
        delta: i32,
    ) -> Result<(), StoreError> {
        let subscription = self
            .working
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or_else(|| StoreError::NotFound(format!("subscription {}", subscription_id)))?;
        subscription.sessions_used = (subscription.sessions_used + delta).max(0);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { mut guard, working } = *self;
        if guard.pending_conflicts > 0 {
            guard.pending_conflicts -= 1;
            return Err(StoreError::Conflict(
                "simulated concurrent update".to_string(),
            ));
        }
        *guard = working;
        Ok(())
    }
}
