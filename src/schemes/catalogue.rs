//! Built-in scheme definitions

use super::eligibility::{FASAL_BIMA, KISAN_CREDIT_CARD, PM_KISAN, SOIL_HEALTH_CARD};
use crate::store::models::{NewScheme, SchemeStatus};

fn all_states() -> Option<Vec<String>> {
    Some(vec!["All States".to_string()])
}

/// Schemes seeded into an empty store at startup
pub fn default_schemes() -> Vec<NewScheme> {
    vec![
        NewScheme {
            title: PM_KISAN.to_string(),
            description: "Income support to small and marginal farmer families".to_string(),
            eligibility: "Small and marginal farmers with cultivable land up to 2 hectares"
                .to_string(),
            benefits: "Rs. 6000 per year in three equal installments".to_string(),
            application_process: "Register online at pmkisan.gov.in or visit nearest CSC"
                .to_string(),
            deadline: None,
            status: SchemeStatus::Active,
            category: "Financial Support".to_string(),
            target_states: all_states(),
            official_url: Some("https://pmkisan.gov.in".to_string()),
        },
        NewScheme {
            title: FASAL_BIMA.to_string(),
            description: "Crop insurance against yield losses from natural calamities"
                .to_string(),
            eligibility: "All farmers growing notified crops in notified areas".to_string(),
            benefits: "Insurance cover for crop loss at low premium rates".to_string(),
            application_process: "Apply through banks, insurance companies or CSC".to_string(),
            deadline: None,
            status: SchemeStatus::Active,
            category: "Insurance".to_string(),
            target_states: all_states(),
            official_url: Some("https://pmfby.gov.in".to_string()),
        },
        NewScheme {
            title: SOIL_HEALTH_CARD.to_string(),
            description: "Soil testing with nutrient and fertilizer recommendations".to_string(),
            eligibility: "All farmers".to_string(),
            benefits: "Free soil health card every two years".to_string(),
            application_process: "Contact the local agriculture department or Krishi Vigyan Kendra"
                .to_string(),
            deadline: None,
            status: SchemeStatus::Active,
            category: "Technical Support".to_string(),
            target_states: all_states(),
            official_url: Some("https://soilhealth.dac.gov.in".to_string()),
        },
        NewScheme {
            title: KISAN_CREDIT_CARD.to_string(),
            description: "Short-term credit for crop cultivation and allied activities"
                .to_string(),
            eligibility: "Owner cultivators, tenant farmers and sharecroppers".to_string(),
            benefits: "Collateral-free credit up to Rs. 1.6 lakh at subsidized interest"
                .to_string(),
            application_process: "Apply at the nearest bank branch".to_string(),
            deadline: None,
            status: SchemeStatus::Active,
            category: "Credit Support".to_string(),
            target_states: all_states(),
            official_url: None,
        },
    ]
}

/// Schemes returned by the periodic refresh
pub fn refreshed_schemes() -> Vec<NewScheme> {
    vec![NewScheme {
        title: "Pradhan Mantri Kisan Maan Dhan Yojana".to_string(),
        description: "Pension scheme for small and marginal farmers".to_string(),
        eligibility: "Small and marginal farmers aged 18-40 years".to_string(),
        benefits: "Monthly pension of Rs. 3000 after 60 years of age".to_string(),
        application_process: "Apply online at maandhan.in or visit nearest CSC".to_string(),
        deadline: Some("2025-12-31".to_string()),
        status: SchemeStatus::Active,
        category: "Financial Support".to_string(),
        target_states: all_states(),
        official_url: Some("https://maandhan.in".to_string()),
    }]
}
