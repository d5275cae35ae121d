//! Record types held by the store
//!
//! Every record has a draft type (the fields a caller supplies) and is
//! materialized by the store, which assigns the id and timestamps.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Patchable, Record, StoreError};

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    /// Farm size in hectares
    pub farm_size: Option<f64>,
    pub crops: Vec<String>,
    pub role: Role,
    pub language_preference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub farm_size: Option<f64>,
    pub crops: Vec<String>,
    pub role: Role,
    pub language_preference: String,
}

/// Profile fields a user may change after registration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub farm_size: Option<f64>,
    pub crops: Option<Vec<String>>,
    pub language_preference: Option<String>,
}

impl Record for User {
    type Draft = NewUser;
    const ID_PREFIX: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewUser) -> Self {
        Self {
            id,
            email: draft.email,
            password_hash: draft.password_hash,
            name: draft.name,
            phone: draft.phone,
            location: draft.location,
            farm_size: draft.farm_size,
            crops: draft.crops,
            role: draft.role,
            language_preference: draft.language_preference,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(draft: &NewUser) -> Result<(), StoreError> {
        if draft.email.trim().is_empty() {
            return Err(StoreError::Validation("email must not be empty".into()));
        }
        validate_farm_size(draft.farm_size)
    }
}

fn validate_farm_size(farm_size: Option<f64>) -> Result<(), StoreError> {
    match farm_size {
        Some(size) if !size.is_finite() || size < 0.0 => {
            Err(StoreError::Validation(format!("invalid farm size {size}")))
        }
        _ => Ok(()),
    }
}

impl Patchable for User {
    type Patch = UserPatch;

    fn validate_patch(patch: &UserPatch) -> Result<(), StoreError> {
        validate_farm_size(patch.farm_size)
    }

    fn apply_patch(&mut self, patch: UserPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(location) = patch.location {
            self.location = Some(location);
        }
        if let Some(farm_size) = patch.farm_size {
            self.farm_size = Some(farm_size);
        }
        if let Some(crops) = patch.crops {
            self.crops = crops;
        }
        if let Some(language) = patch.language_preference {
            self.language_preference = language;
        }
        self.updated_at = now;
    }
}

// =============================================================================
// Disease detections
// =============================================================================

/// Disease severity, ordered from harmless to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseDetection {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub image_filename: Option<String>,
    pub disease: String,
    pub confidence: f64,
    pub treatment: String,
    pub severity: Severity,
    pub crop_type: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDetection {
    pub user_id: String,
    pub image_url: String,
    pub image_filename: Option<String>,
    pub disease: String,
    pub confidence: f64,
    pub treatment: String,
    pub severity: Severity,
    pub crop_type: Option<String>,
    pub location: Option<String>,
}

impl Record for DiseaseDetection {
    type Draft = NewDetection;
    const ID_PREFIX: &'static str = "detect";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewDetection) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            image_url: draft.image_url,
            image_filename: draft.image_filename,
            disease: draft.disease,
            confidence: draft.confidence,
            treatment: draft.treatment,
            severity: draft.severity,
            crop_type: draft.crop_type,
            location: draft.location,
            created_at: now,
        }
    }

    fn validate(draft: &NewDetection) -> Result<(), StoreError> {
        if !(0.0..=1.0).contains(&draft.confidence) {
            return Err(StoreError::Validation(format!(
                "confidence {} outside [0, 1]",
                draft.confidence
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Mandi prices
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandiPrice {
    pub id: String,
    pub crop: String,
    pub variety: Option<String>,
    pub market: String,
    pub state: String,
    pub district: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
    pub price_date: NaiveDate,
    pub unit: String,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPrice {
    pub crop: String,
    pub variety: Option<String>,
    pub market: String,
    pub state: String,
    pub district: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
    pub price_date: NaiveDate,
    pub unit: String,
    pub source: Option<String>,
}

impl Record for MandiPrice {
    type Draft = NewPrice;
    const ID_PREFIX: &'static str = "price";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewPrice) -> Self {
        Self {
            id,
            crop: draft.crop,
            variety: draft.variety,
            market: draft.market,
            state: draft.state,
            district: draft.district,
            min_price: draft.min_price,
            max_price: draft.max_price,
            modal_price: draft.modal_price,
            price_date: draft.price_date,
            unit: draft.unit,
            source: draft.source,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(draft: &NewPrice) -> Result<(), StoreError> {
        let prices = [draft.min_price, draft.modal_price, draft.max_price];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(StoreError::Validation("prices must be non-negative".into()));
        }
        if draft.min_price > draft.modal_price || draft.modal_price > draft.max_price {
            return Err(StoreError::Validation(format!(
                "modal price {} outside band [{}, {}]",
                draft.modal_price, draft.min_price, draft.max_price
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Government schemes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeStatus {
    Active,
    Inactive,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentScheme {
    pub id: String,
    pub title: String,
    pub description: String,
    pub eligibility: String,
    pub benefits: String,
    pub application_process: String,
    pub deadline: Option<String>,
    pub status: SchemeStatus,
    pub category: String,
    pub target_states: Option<Vec<String>>,
    pub official_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScheme {
    pub title: String,
    pub description: String,
    pub eligibility: String,
    pub benefits: String,
    pub application_process: String,
    pub deadline: Option<String>,
    pub status: SchemeStatus,
    pub category: String,
    pub target_states: Option<Vec<String>>,
    pub official_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemePatch {
    pub description: Option<String>,
    pub benefits: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<SchemeStatus>,
    pub official_url: Option<String>,
}

impl Record for GovernmentScheme {
    type Draft = NewScheme;
    const ID_PREFIX: &'static str = "scheme";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewScheme) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            eligibility: draft.eligibility,
            benefits: draft.benefits,
            application_process: draft.application_process,
            deadline: draft.deadline,
            status: draft.status,
            category: draft.category,
            target_states: draft.target_states,
            official_url: draft.official_url,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(draft: &NewScheme) -> Result<(), StoreError> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("scheme title must not be empty".into()));
        }
        Ok(())
    }
}

impl Patchable for GovernmentScheme {
    type Patch = SchemePatch;

    fn apply_patch(&mut self, patch: SchemePatch, now: DateTime<Utc>) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(benefits) = patch.benefits {
            self.benefits = benefits;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = Some(deadline);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(url) = patch.official_url {
            self.official_url = Some(url);
        }
        self.updated_at = now;
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DiseaseAlert,
    PriceUpdate,
    SchemeUpdate,
    WeatherAlert,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// New notifications always start unread
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
}

impl Record for Notification {
    type Draft = NewNotification;
    const ID_PREFIX: &'static str = "notif";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewNotification) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            is_read: false,
            priority: draft.priority,
            created_at: now,
        }
    }
}

// =============================================================================
// Analytics events
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: String,
    pub user_id: Option<String>,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: Option<String>,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, event_data: serde_json::Value) -> Self {
        Self {
            user_id: None,
            event_type: event_type.into(),
            event_data,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn for_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }
}

impl Record for AnalyticsEvent {
    type Draft = NewEvent;
    const ID_PREFIX: &'static str = "event";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewEvent) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            event_type: draft.event_type,
            event_data: draft.event_data,
            ip_address: draft.ip_address,
            user_agent: draft.user_agent,
            created_at: now,
        }
    }
}

// =============================================================================
// Scheme applications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeApplication {
    pub id: String,
    pub user_id: String,
    pub scheme_id: String,
    pub status: ApplicationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub documents: Vec<ApplicationDocument>,
    pub notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: String,
    pub scheme_id: String,
    pub documents: Vec<ApplicationDocument>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Record for SchemeApplication {
    type Draft = NewApplication;
    const ID_PREFIX: &'static str = "app";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, now: DateTime<Utc>, draft: NewApplication) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            scheme_id: draft.scheme_id,
            status: ApplicationStatus::Draft,
            submitted_at: None,
            documents: draft.documents,
            notes: None,
            reviewed_at: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Patchable for SchemeApplication {
    type Patch = ApplicationPatch;

    fn apply_patch(&mut self, patch: ApplicationPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(submitted_at) = patch.submitted_at {
            self.submitted_at = Some(submitted_at);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        self.updated_at = now;
    }
}
