//! Eligibility rules per scheme title
//!
//! Rules are keyed by the exact scheme title. Titles without a dedicated
//! rule set get the general criteria and are reported eligible.

use serde::{Deserialize, Serialize};

use crate::store::models::User;

pub const PM_KISAN: &str = "PM-KISAN Samman Nidhi";
pub const FASAL_BIMA: &str = "Pradhan Mantri Fasal Bima Yojana";
pub const SOIL_HEALTH_CARD: &str = "Soil Health Card Scheme";
pub const KISAN_CREDIT_CARD: &str = "Kisan Credit Card";

/// Largest holding, in hectares, that counts as small or marginal
pub const SMALL_FARM_LIMIT_HA: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandOwnership {
    Owned,
    Leased,
    Sharecropper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarmerCategory {
    Small,
    Marginal,
    Large,
}

/// Facts about a farmer that eligibility rules may consult
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub farm_size: Option<f64>,
    #[serde(default)]
    pub crops: Vec<String>,
    pub location: Option<String>,
    pub income: Option<f64>,
    pub land_ownership: Option<LandOwnership>,
    pub category: Option<FarmerCategory>,
}

impl UserProfile {
    /// Profile built from the facts a registered user has on file
    pub fn from_user(user: &User) -> Self {
        Self {
            farm_size: user.farm_size,
            crops: user.crops.clone(),
            location: user.location.clone(),
            ..Self::default()
        }
    }

    fn is_small_holder(&self) -> bool {
        self.farm_size.map_or(true, |size| size <= SMALL_FARM_LIMIT_HA)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub is_eligible: bool,
    pub reasons: Vec<String>,
    pub requirements: Vec<String>,
    pub documents: Vec<String>,
    pub application_steps: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Verdict for the scheme with the given title
pub fn evaluate(title: &str, profile: &UserProfile) -> Eligibility {
    match title {
        PM_KISAN => {
            let (is_eligible, reason) = if profile.is_small_holder() {
                (true, "Eligible as small/marginal farmer with land up to 2 hectares")
            } else {
                (false, "Farm size exceeds 2 hectares limit for small and marginal farmers")
            };
            Eligibility {
                is_eligible,
                reasons: strings(&[reason]),
                requirements: strings(&[
                    "Must be a small or marginal farmer",
                    "Cultivable land should not exceed 2 hectares",
                    "Must have valid land records",
                ]),
                documents: strings(&[
                    "Aadhaar Card",
                    "Bank Account Details",
                    "Land Records (Khata/Khatauni)",
                    "Passport Size Photo",
                ]),
                application_steps: strings(&[
                    "Visit pmkisan.gov.in or nearest CSC",
                    "Fill the registration form with Aadhaar details",
                    "Upload required documents",
                    "Submit application and note registration number",
                    "Track application status online",
                ]),
            }
        }
        FASAL_BIMA => Eligibility {
            is_eligible: true,
            reasons: strings(&["All farmers growing notified crops are eligible"]),
            requirements: strings(&[
                "Must be growing notified crops in notified areas",
                "Should have valid land records or crop loan documents",
                "Premium payment within due date",
            ]),
            documents: strings(&[
                "Aadhaar Card",
                "Bank Account Details",
                "Land Records",
                "Crop Loan Documents (if applicable)",
                "Sowing Certificate",
            ]),
            application_steps: strings(&[
                "Visit nearest bank, insurance company, or CSC",
                "Fill crop insurance application form",
                "Submit required documents",
                "Pay premium amount",
                "Receive policy document",
            ]),
        },
        SOIL_HEALTH_CARD => Eligibility {
            is_eligible: true,
            reasons: strings(&["All farmers across the country are eligible"]),
            requirements: strings(&[
                "Must be a farmer with cultivable land",
                "Should provide soil samples",
            ]),
            documents: strings(&["Aadhaar Card", "Land Records", "Contact Details"]),
            application_steps: strings(&[
                "Contact local agriculture department",
                "Visit Krishi Vigyan Kendra",
                "Provide soil samples from different parts of field",
                "Receive soil health card with recommendations",
            ]),
        },
        KISAN_CREDIT_CARD => {
            let reason = if profile.land_ownership == Some(LandOwnership::Sharecropper) {
                "Eligible as sharecropper under expanded coverage"
            } else {
                "Eligible as farmer with land ownership/lease"
            };
            Eligibility {
                is_eligible: true,
                reasons: strings(&[reason]),
                requirements: strings(&[
                    "Must be a farmer (including tenant farmers and sharecroppers)",
                    "Should have valid land records or crop cultivation proof",
                    "Good credit history preferred",
                ]),
                documents: strings(&[
                    "Aadhaar Card",
                    "PAN Card",
                    "Land Records",
                    "Bank Account Details",
                    "Passport Size Photos",
                    "Income Certificate",
                ]),
                application_steps: strings(&[
                    "Visit nearest bank branch",
                    "Fill KCC application form",
                    "Submit required documents",
                    "Bank verification and assessment",
                    "Receive KCC upon approval",
                ]),
            }
        }
        _ => Eligibility {
            is_eligible: true,
            reasons: strings(&["General eligibility criteria apply"]),
            requirements: strings(&["Must be a farmer", "Should meet scheme-specific criteria"]),
            documents: strings(&["Aadhaar Card", "Land Records", "Bank Account Details"]),
            application_steps: strings(&[
                "Check detailed eligibility criteria",
                "Gather required documents",
                "Apply through designated channels",
                "Track application status",
            ]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(farm_size: Option<f64>) -> UserProfile {
        UserProfile {
            farm_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_pm_kisan_farm_size_limit() {
        let large = evaluate(PM_KISAN, &profile(Some(3.0)));
        assert!(!large.is_eligible);
        assert_eq!(
            large.reasons,
            vec!["Farm size exceeds 2 hectares limit for small and marginal farmers"]
        );

        assert!(evaluate(PM_KISAN, &profile(Some(1.5))).is_eligible);
        assert!(evaluate(PM_KISAN, &profile(Some(2.0))).is_eligible);
        assert!(evaluate(PM_KISAN, &profile(None)).is_eligible);
    }

    #[test]
    fn test_other_schemes_always_eligible() {
        for title in [FASAL_BIMA, SOIL_HEALTH_CARD, KISAN_CREDIT_CARD, "Some New Scheme"] {
            let verdict = evaluate(title, &profile(Some(50.0)));
            assert!(verdict.is_eligible, "{title}");
            assert!(!verdict.documents.is_empty());
            assert!(!verdict.application_steps.is_empty());
        }
    }

    #[test]
    fn test_kisan_credit_card_sharecropper_reason() {
        let sharecropper = UserProfile {
            land_ownership: Some(LandOwnership::Sharecropper),
            ..Default::default()
        };
        let verdict = evaluate(KISAN_CREDIT_CARD, &sharecropper);
        assert_eq!(verdict.reasons, vec!["Eligible as sharecropper under expanded coverage"]);
    }

    #[test]
    fn test_unknown_title_gets_general_rules() {
        let verdict = evaluate("pm-kisan samman nidhi", &profile(Some(10.0)));
        assert!(verdict.is_eligible);
        assert_eq!(verdict.reasons, vec!["General eligibility criteria apply"]);
    }
}
