//! Government scheme service
//!
//! Eligibility verdicts, category and search views, recommendations,
//! scheme data refresh and the application workflow.

pub mod catalogue;
pub mod eligibility;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SchemesConfig;
use crate::store::models::{
    ApplicationDocument, ApplicationPatch, ApplicationStatus, GovernmentScheme, NewApplication,
    NewEvent, NewNotification, NewScheme, NotificationKind, Priority, SchemeApplication,
    SchemePatch, SchemeStatus,
};
use crate::store::{RecordStore, StoreError};
pub use eligibility::{Eligibility, UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("Scheme not found")]
    SchemeNotFound,

    #[error("Application not found")]
    ApplicationNotFound,

    #[error("Application {0} has already been submitted")]
    AlreadySubmitted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Predefined categories: (name, description, icon)
const CATEGORIES: [(&str, &str, &str); 5] = [
    (
        "Financial Support",
        "Direct financial assistance and subsidies for farmers",
        "IndianRupee",
    ),
    ("Insurance", "Crop insurance and risk management schemes", "Shield"),
    (
        "Technical Support",
        "Technical guidance and agricultural extension services",
        "BookOpen",
    ),
    ("Credit Support", "Credit facilities and loan schemes for farmers", "CreditCard"),
    (
        "Input Subsidy",
        "Subsidies on seeds, fertilizers, and farm equipment",
        "Sprout",
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct SchemeCategory {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub schemes: Vec<GovernmentScheme>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemeSearch {
    #[serde(default)]
    pub query: String,
    pub category: Option<String>,
    pub state: Option<String>,
    pub status: Option<SchemeStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub high_priority: Vec<GovernmentScheme>,
    pub recommended: Vec<GovernmentScheme>,
    pub other: Vec<GovernmentScheme>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub success: bool,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Document attached to a new application
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpload {
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    pub url: String,
}

pub struct SchemeService {
    store: Arc<RecordStore>,
    fetch_delay: Duration,
}

impl SchemeService {
    pub fn new(store: Arc<RecordStore>, config: &SchemesConfig) -> Self {
        Self {
            store,
            fetch_delay: Duration::from_millis(config.fetch_delay_ms),
        }
    }

    /// Insert the built-in catalogue, skipping titles already present
    pub async fn seed_defaults(&self) -> Result<usize, StoreError> {
        self.insert_missing(catalogue::default_schemes()).await
    }

    async fn insert_missing(&self, schemes: Vec<NewScheme>) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for scheme in schemes {
            if self.store.scheme_by_title(&scheme.title).await.is_some() {
                debug!(title = %scheme.title, "Scheme already present");
                continue;
            }
            self.store.schemes.create(scheme).await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    pub async fn check_eligibility(
        &self,
        scheme_id: &str,
        profile: &UserProfile,
    ) -> Result<Eligibility, SchemeError> {
        let scheme = self
            .store
            .schemes
            .find_by_id(scheme_id)
            .await
            .ok_or(SchemeError::SchemeNotFound)?;
        Ok(eligibility::evaluate(&scheme.title, profile))
    }

    /// Active schemes grouped by category; empty categories are omitted
    pub async fn categories(&self) -> Vec<SchemeCategory> {
        let mut categories: Vec<SchemeCategory> = CATEGORIES
            .iter()
            .map(|(name, description, icon)| SchemeCategory {
                name: name.to_string(),
                description: description.to_string(),
                icon: icon.to_string(),
                schemes: Vec::new(),
            })
            .collect();

        for scheme in self.store.active_schemes().await {
            match categories.iter_mut().find(|c| c.name == scheme.category) {
                Some(category) => category.schemes.push(scheme),
                None => categories.push(SchemeCategory {
                    name: scheme.category.clone(),
                    description: format!("Schemes related to {}", scheme.category.to_lowercase()),
                    icon: "FileText".to_string(),
                    schemes: vec![scheme],
                }),
            }
        }

        categories.retain(|c| !c.schemes.is_empty());
        categories
    }

    /// Text search over active schemes with optional filters
    pub async fn search(&self, search: &SchemeSearch) -> Vec<GovernmentScheme> {
        let term = search.query.trim().to_lowercase();
        let state = search.state.as_ref().map(|s| s.to_lowercase());
        let candidates = match &search.category {
            Some(category) => self.store.schemes_by_category(category).await,
            None => self.store.active_schemes().await,
        };

        candidates
            .into_iter()
            .filter(|s| {
                term.is_empty()
                    || [&s.title, &s.description, &s.category, &s.benefits]
                        .iter()
                        .any(|field| field.to_lowercase().contains(&term))
            })
            .filter(|s| search.status.map_or(true, |status| s.status == status))
            .filter(|s| match (&state, &s.target_states) {
                (None, _) | (_, None) => true,
                (Some(state), Some(targets)) => {
                    targets.iter().any(|t| t == "All States")
                        || targets.iter().any(|t| t.to_lowercase().contains(state.as_str()))
                }
            })
            .collect()
    }

    /// Split active schemes by how strongly they suit the profile
    pub async fn recommendations(&self, profile: &UserProfile) -> Recommendations {
        let mut result = Recommendations::default();
        let small_holder = profile
            .farm_size
            .is_some_and(|size| size <= eligibility::SMALL_FARM_LIMIT_HA);

        for scheme in self.store.active_schemes().await {
            let verdict = eligibility::evaluate(&scheme.title, profile);
            if !verdict.is_eligible {
                result.other.push(scheme);
                continue;
            }

            let high_priority = (small_holder && scheme.title.contains("PM-KISAN"))
                || scheme.title.contains("Fasal Bima")
                || scheme.title.contains("Soil Health");
            if high_priority {
                result.high_priority.push(scheme);
            } else {
                result.recommended.push(scheme);
            }
        }

        result
    }

    /// Pull the latest scheme list and insert schemes not yet known
    pub async fn update_scheme_data(&self) -> RefreshSummary {
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        let mut errors = Vec::new();
        let updated = match self.apply_refresh(catalogue::refreshed_schemes()).await {
            Ok(count) => count,
            Err(e) => {
                errors.push(format!("Update failed: {e}"));
                0
            }
        };

        let event = NewEvent::new(
            "schemes_update",
            json!({
                "updated": updated,
                "errors": errors.len(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
        );
        if let Err(e) = self.store.log_event(event).await {
            warn!(error = %e, "Failed to log scheme update event");
        }

        info!(updated, errors = errors.len(), "Scheme data refreshed");
        RefreshSummary {
            success: errors.is_empty(),
            updated,
            errors,
        }
    }

    /// Insert unknown titles and patch known ones whose details changed
    async fn apply_refresh(&self, schemes: Vec<NewScheme>) -> Result<usize, StoreError> {
        let mut updated = 0;
        for scheme in schemes {
            match self.store.scheme_by_title(&scheme.title).await {
                None => {
                    self.store.schemes.create(scheme).await?;
                    updated += 1;
                }
                Some(existing) => {
                    let Some(patch) = refresh_patch(&existing, scheme) else {
                        continue;
                    };
                    if self.store.schemes.update(&existing.id, patch).await?.is_some() {
                        debug!(title = %existing.title, "Scheme details refreshed");
                        updated += 1;
                    }
                }
            }
        }
        Ok(updated)
    }

    pub async fn create_application(
        &self,
        user_id: &str,
        scheme_id: &str,
        documents: Vec<DocumentUpload>,
    ) -> Result<SchemeApplication, SchemeError> {
        if self.store.schemes.find_by_id(scheme_id).await.is_none() {
            return Err(SchemeError::SchemeNotFound);
        }

        let now = Utc::now();
        let documents = documents
            .into_iter()
            .map(|d| ApplicationDocument {
                kind: d.kind,
                filename: d.filename,
                url: d.url,
                uploaded_at: now,
            })
            .collect();

        let application = self
            .store
            .applications
            .create(NewApplication {
                user_id: user_id.to_string(),
                scheme_id: scheme_id.to_string(),
                documents,
            })
            .await?;
        info!(application_id = %application.id, scheme_id, "Scheme application created");
        Ok(application)
    }

    /// Move a draft application to submitted and notify the applicant
    pub async fn submit_application(
        &self,
        application_id: &str,
    ) -> Result<SchemeApplication, SchemeError> {
        let patch = ApplicationPatch {
            status: Some(ApplicationStatus::Submitted),
            submitted_at: Some(Utc::now()),
            notes: None,
        };
        let application = self
            .store
            .applications
            .update_if(application_id, patch, |existing| {
                if existing.status == ApplicationStatus::Draft {
                    Ok(())
                } else {
                    Err(SchemeError::AlreadySubmitted(application_id.to_string()))
                }
            })
            .await?
            .ok_or(SchemeError::ApplicationNotFound)?;

        self.store
            .notifications
            .create(NewNotification {
                user_id: application.user_id.clone(),
                title: "Application Submitted".to_string(),
                message: format!(
                    "Your scheme application has been submitted successfully. Application ID: {}",
                    application.id
                ),
                kind: NotificationKind::SchemeUpdate,
                priority: Priority::Medium,
            })
            .await?;

        Ok(application)
    }

    pub async fn application_status(&self, application_id: &str) -> Option<SchemeApplication> {
        self.store.applications.find_by_id(application_id).await
    }

    pub async fn applications_for_user(&self, user_id: &str) -> Vec<SchemeApplication> {
        self.store.applications_for_user(user_id).await
    }
}

/// Fields of `fresh` that differ from the stored scheme; `None` if nothing changed
fn refresh_patch(existing: &GovernmentScheme, fresh: NewScheme) -> Option<SchemePatch> {
    let patch = SchemePatch {
        description: (existing.description != fresh.description).then_some(fresh.description),
        benefits: (existing.benefits != fresh.benefits).then_some(fresh.benefits),
        deadline: fresh.deadline.filter(|d| existing.deadline.as_ref() != Some(d)),
        status: (existing.status != fresh.status).then_some(fresh.status),
        official_url: fresh
            .official_url
            .filter(|u| existing.official_url.as_ref() != Some(u)),
    };

    let changed = patch.description.is_some()
        || patch.benefits.is_some()
        || patch.deadline.is_some()
        || patch.status.is_some()
        || patch.official_url.is_some();
    changed.then_some(patch)
}
