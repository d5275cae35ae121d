//! Record store
//!
//! In-memory collections of users, detections, prices, schemes,
//! notifications, analytics events and scheme applications. Each collection
//! sits behind its own `RwLock` so concurrent requests and scheduled jobs can
//! read and write without coordinating with each other.
//!
//! Ids are `<prefix>_<unique suffix>` and are never reused within a
//! collection. Records come back as owned clones; nothing outside the store
//! holds a reference into a collection.

pub mod models;

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use models::*;

/// Store-level failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// A record type held in a [`Collection`]
pub trait Record: Clone + Send + Sync + 'static {
    /// Caller-supplied fields; the store fills in id and timestamps
    type Draft: Send;

    /// Prefix used when generating ids, e.g. `user` gives `user_<suffix>`
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;

    fn from_draft(id: String, now: DateTime<Utc>, draft: Self::Draft) -> Self;

    /// Reject drafts that would break a collection invariant
    fn validate(_draft: &Self::Draft) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Records that support partial updates
pub trait Patchable: Record {
    type Patch: Send;

    /// Merge the patch and refresh the update timestamp
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// Reject patches that would break a collection invariant
    fn validate_patch(_patch: &Self::Patch) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Generate a candidate id for the given prefix
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Ordered, lock-guarded set of records of one type
pub struct Collection<T: Record> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a new record, returning the stored copy
    pub async fn create(&self, draft: T::Draft) -> Result<T, StoreError> {
        T::validate(&draft)?;

        let mut records = self.records.write().await;
        let id = loop {
            let candidate = generate_id(T::ID_PREFIX);
            if !records.iter().any(|r| r.id() == candidate) {
                break candidate;
            }
        };

        let record = T::from_draft(id, Utc::now(), draft);
        records.push(record.clone());
        Ok(record)
    }

    /// Insert unless an existing record conflicts with the draft.
    ///
    /// The scan and the insert happen under one write lock, so two racing
    /// callers cannot both pass the conflict check. `None` on conflict.
    pub async fn create_unless<F>(
        &self,
        draft: T::Draft,
        conflicts: F,
    ) -> Result<Option<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        T::validate(&draft)?;

        let mut records = self.records.write().await;
        if records.iter().any(|r| conflicts(r)) {
            return Ok(None);
        }
        let id = loop {
            let candidate = generate_id(T::ID_PREFIX);
            if !records.iter().any(|r| r.id() == candidate) {
                break candidate;
            }
        };

        let record = T::from_draft(id, Utc::now(), draft);
        records.push(record.clone());
        Ok(Some(record))
    }

    pub async fn find_by_id(&self, id: &str) -> Option<T> {
        self.records.read().await.iter().find(|r| r.id() == id).cloned()
    }

    /// First record matching the predicate, in insertion order
    pub async fn find<F>(&self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.records.read().await.iter().find(|r| predicate(r)).cloned()
    }

    pub async fn filter_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    pub async fn all(&self) -> Vec<T> {
        self.records.read().await.clone()
    }

    pub async fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.records.read().await.iter().filter(|r| predicate(r)).count()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Mutate a record in place under the write lock
    async fn modify<F>(&self, id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut records = self.records.write().await;
        let record = records.iter_mut().find(|r| r.id() == id)?;
        f(record);
        Some(record.clone())
    }
}

impl<T: Patchable> Collection<T> {
    /// Apply a validated partial update; `Ok(None)` when the id is unknown
    pub async fn update(&self, id: &str, patch: T::Patch) -> Result<Option<T>, StoreError> {
        T::validate_patch(&patch)?;
        Ok(self
            .modify(id, |record| record.apply_patch(patch, Utc::now()))
            .await)
    }

    /// Apply a partial update only if `guard` accepts the current record.
    ///
    /// The guard runs under the same write lock as the patch.
    pub async fn update_if<E, G>(
        &self,
        id: &str,
        patch: T::Patch,
        guard: G,
    ) -> Result<Option<T>, E>
    where
        E: From<StoreError>,
        G: FnOnce(&T) -> Result<(), E>,
    {
        T::validate_patch(&patch)?;

        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        guard(&*record)?;
        record.apply_patch(patch, Utc::now());
        Ok(Some(record.clone()))
    }
}

/// Counts shown on the admin dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_detections: usize,
    pub total_prices: usize,
    pub active_schemes: usize,
    pub recent_detections: usize,
}

/// All collections of the service
#[derive(Default)]
pub struct RecordStore {
    pub users: Collection<User>,
    pub detections: Collection<DiseaseDetection>,
    pub prices: Collection<MandiPrice>,
    pub schemes: Collection<GovernmentScheme>,
    pub notifications: Collection<Notification>,
    pub events: Collection<AnalyticsEvent>,
    pub applications: Collection<SchemeApplication>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Users

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        let email = email.to_lowercase();
        self.users.find(|u| u.email.to_lowercase() == email).await
    }

    // Detections

    /// A user's detections, newest first
    pub async fn detections_by_user(&self, user_id: &str) -> Vec<DiseaseDetection> {
        let mut detections = self.detections.filter_by(|d| d.user_id == user_id).await;
        detections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        detections
    }

    pub async fn recent_detections(&self, limit: usize) -> Vec<DiseaseDetection> {
        let mut detections = self.detections.all().await;
        detections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        detections.truncate(limit);
        detections
    }

    // Prices

    /// Case-insensitive substring match on crop name
    pub async fn prices_by_crop(&self, crop: &str) -> Vec<MandiPrice> {
        let needle = crop.to_lowercase();
        self.prices
            .filter_by(|p| p.crop.to_lowercase().contains(&needle))
            .await
    }

    /// Case-insensitive substring match on state name
    pub async fn prices_by_state(&self, state: &str) -> Vec<MandiPrice> {
        let needle = state.to_lowercase();
        self.prices
            .filter_by(|p| p.state.to_lowercase().contains(&needle))
            .await
    }

    // Schemes

    pub async fn active_schemes(&self) -> Vec<GovernmentScheme> {
        self.schemes
            .filter_by(|s| s.status == SchemeStatus::Active)
            .await
    }

    pub async fn schemes_by_category(&self, category: &str) -> Vec<GovernmentScheme> {
        self.schemes
            .filter_by(|s| s.category == category && s.status == SchemeStatus::Active)
            .await
    }

    pub async fn scheme_by_title(&self, title: &str) -> Option<GovernmentScheme> {
        self.schemes.find(|s| s.title == title).await
    }

    // Notifications

    /// A user's notifications, newest first
    pub async fn notifications_for_user(&self, user_id: &str, unread_only: bool) -> Vec<Notification> {
        let mut notifications = self
            .notifications
            .filter_by(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .await;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    /// Mark a notification read. Read notifications never revert to unread.
    pub async fn mark_notification_read(&self, id: &str) -> Result<Notification, StoreError> {
        self.notifications
            .modify(id, |n| n.is_read = true)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("notification {id}")))
    }

    // Analytics

    pub async fn log_event(&self, event: NewEvent) -> Result<AnalyticsEvent, StoreError> {
        self.events.create(event).await
    }

    /// Events of one type from the last `days` days
    pub async fn events_by_type(&self, event_type: &str, days: i64) -> Vec<AnalyticsEvent> {
        let cutoff = Utc::now() - Duration::days(days);
        self.events
            .filter_by(|e| e.event_type == event_type && e.created_at >= cutoff)
            .await
    }

    /// Event counts per type since the cutoff
    pub async fn event_counts_since(&self, cutoff: DateTime<Utc>) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for event in self.events.filter_by(|e| e.created_at >= cutoff).await {
            *counts.entry(event.event_type).or_insert(0) += 1;
        }
        counts
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        let week_ago = Utc::now() - Duration::days(7);
        DashboardStats {
            total_users: self.users.len().await,
            total_detections: self.detections.len().await,
            total_prices: self.prices.len().await,
            active_schemes: self
                .schemes
                .count(|s| s.status == SchemeStatus::Active)
                .await,
            recent_detections: self.detections.count(|d| d.created_at >= week_ago).await,
        }
    }

    // Applications

    pub async fn applications_for_user(&self, user_id: &str) -> Vec<SchemeApplication> {
        self.applications.filter_by(|a| a.user_id == user_id).await
    }
}
