//! Crop disease classifier
//!
//! Features are sampled from the image, matched against the fixed disease
//! catalogue, and the best match is adjusted for crop relevance and
//! regional prevalence. Confidence always ends up in [0, 0.95].

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::DetectionConfig;
use crate::store::models::Severity;

const MAX_CONFIDENCE: f64 = 0.95;
const BASELINE_CONFIDENCE: f64 = 0.5;
const IRRELEVANT_CROP_FACTOR: f64 = 0.6;
const REGIONAL_BOOST: f64 = 0.1;
const REGIONAL_BOOST_FLOOR: f64 = 0.8;
const HIGH_RESOLUTION_BYTES: usize = 500_000;

const HEALTHY: &str = "healthy_plant";

#[derive(Debug)]
pub struct DiseaseProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub treatment: &'static str,
    pub severity: Severity,
    pub preventive_measures: &'static [&'static str],
    pub affected_crops: &'static [&'static str],
    pub symptoms: &'static [&'static str],
    image_features: &'static [&'static str],
}

pub static CATALOGUE: [DiseaseProfile; 7] = [
    DiseaseProfile {
        key: "tomato_late_blight",
        name: "Tomato Late Blight",
        description: "A serious fungal disease that affects tomato plants, causing dark lesions on leaves and stems",
        treatment: "Apply copper-based fungicide (Copper oxychloride 50% WP @ 3g/liter). Remove affected parts and improve air circulation. Avoid overhead watering.",
        severity: Severity::High,
        preventive_measures: &[
            "Plant resistant varieties",
            "Ensure proper spacing for air circulation",
            "Avoid overhead irrigation",
            "Remove plant debris",
            "Apply preventive fungicide sprays",
        ],
        affected_crops: &["Tomato", "Potato", "Eggplant"],
        symptoms: &[
            "Dark water-soaked lesions",
            "White fuzzy growth on leaf undersides",
            "Brown spots on fruits",
        ],
        image_features: &["dark_spots", "water_soaked_lesions", "leaf_browning"],
    },
    DiseaseProfile {
        key: "wheat_rust",
        name: "Wheat Rust",
        description: "Fungal disease causing orange-red pustules on wheat leaves and stems",
        treatment: "Spray Propiconazole 25% EC @ 1ml/liter or Tebuconazole 10% + Sulphur 65% WG @ 2g/liter. Apply at early infection stage.",
        severity: Severity::Medium,
        preventive_measures: &[
            "Use resistant wheat varieties",
            "Proper crop rotation",
            "Timely sowing",
            "Balanced fertilization",
            "Monitor weather conditions",
        ],
        affected_crops: &["Wheat", "Barley", "Oats"],
        symptoms: &["Orange-red pustules", "Yellow streaks", "Premature leaf drying"],
        image_features: &["orange_pustules", "rust_spots", "leaf_yellowing"],
    },
    DiseaseProfile {
        key: "rice_blast",
        name: "Rice Blast",
        description: "Fungal disease causing diamond-shaped lesions on rice leaves",
        treatment: "Apply Tricyclazole 75% WP @ 0.6g/liter or Carbendazim 50% WP @ 1g/liter. Ensure proper drainage.",
        severity: Severity::High,
        preventive_measures: &[
            "Use certified disease-free seeds",
            "Maintain proper water management",
            "Avoid excessive nitrogen fertilization",
            "Plant resistant varieties",
            "Remove infected plant debris",
        ],
        affected_crops: &["Rice"],
        symptoms: &[
            "Diamond-shaped lesions",
            "Gray centers with brown borders",
            "Neck rot in severe cases",
        ],
        image_features: &["diamond_lesions", "gray_spots", "brown_borders"],
    },
    DiseaseProfile {
        key: "potato_early_blight",
        name: "Potato Early Blight",
        description: "Fungal disease causing concentric ring spots on potato leaves",
        treatment: "Apply Mancozeb 75% WP @ 2g/liter or Chlorothalonil 75% WP @ 2g/liter. Remove affected foliage.",
        severity: Severity::Medium,
        preventive_measures: &[
            "Crop rotation with non-solanaceous crops",
            "Proper plant spacing",
            "Avoid overhead irrigation",
            "Remove volunteer plants",
            "Use certified seed potatoes",
        ],
        affected_crops: &["Potato", "Tomato"],
        symptoms: &[
            "Concentric ring spots",
            "Target-like lesions",
            "Yellowing of lower leaves",
        ],
        image_features: &["concentric_rings", "target_spots", "yellowing_leaves"],
    },
    DiseaseProfile {
        key: "powdery_mildew",
        name: "Powdery Mildew",
        description: "Fungal growth forming a white powdery layer on leaf surfaces",
        treatment: "Spray wettable sulphur 80% WP @ 2g/liter or Hexaconazole 5% EC @ 1ml/liter at first appearance.",
        severity: Severity::Low,
        preventive_measures: &[
            "Avoid dense planting",
            "Avoid excess nitrogen",
            "Remove infected leaves early",
        ],
        affected_crops: &["Wheat", "Pea", "Cucumber", "Mustard"],
        symptoms: &[
            "White powdery patches",
            "Curling of young leaves",
            "Slightly stunted growth",
        ],
        image_features: &["white_powder", "leaf_curling", "stunted_growth"],
    },
    DiseaseProfile {
        key: "bacterial_wilt",
        name: "Bacterial Wilt",
        description: "Soil-borne bacterial infection blocking the plant's water-conducting tissue",
        treatment: "No chemical cure. Uproot and destroy infected plants, drench soil with bleaching powder @ 15kg/ha and rotate with non-host crops.",
        severity: Severity::Critical,
        preventive_measures: &[
            "Use resistant varieties",
            "Rotate with cereals for 2-3 seasons",
            "Disinfect tools between plants",
            "Improve field drainage",
        ],
        affected_crops: &["Tomato", "Potato", "Eggplant"],
        symptoms: &[
            "Sudden wilting of green leaves",
            "Brown discoloration inside stem",
            "Milky ooze from cut stems",
        ],
        image_features: &["wilting_leaves", "vascular_browning", "bacterial_ooze"],
    },
    DiseaseProfile {
        key: HEALTHY,
        name: "Healthy Plant",
        description: "Plant appears healthy with no visible signs of disease",
        treatment: "Continue regular monitoring and maintain good agricultural practices. No treatment required.",
        severity: Severity::None,
        preventive_measures: &[
            "Regular monitoring",
            "Proper nutrition",
            "Adequate watering",
            "Good sanitation practices",
            "Preventive care",
        ],
        affected_crops: &["All crops"],
        symptoms: &[
            "Green healthy foliage",
            "Normal growth pattern",
            "No visible lesions",
        ],
        image_features: &["healthy_green", "normal_texture", "no_spots"],
    },
];

/// Diseases commonly seen per region
const REGIONAL_PREVALENCE: [(&str, [&str; 2]); 4] = [
    ("punjab", ["wheat_rust", "rice_blast"]),
    ("haryana", ["wheat_rust", "tomato_late_blight"]),
    ("uttar pradesh", ["potato_early_blight", "wheat_rust"]),
    ("maharashtra", ["tomato_late_blight", "potato_early_blight"]),
];

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Image size exceeds maximum allowed size")]
    ImageTooLarge,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseReport {
    pub disease: String,
    pub confidence: f64,
    pub description: String,
    pub treatment: String,
    pub severity: Severity,
    pub preventive_measures: Vec<String>,
    pub affected_crops: Vec<String>,
    pub symptoms: Vec<String>,
}

impl DiseaseReport {
    fn from_profile(profile: &DiseaseProfile, confidence: f64) -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            disease: profile.name.to_string(),
            confidence,
            description: profile.description.to_string(),
            treatment: profile.treatment.to_string(),
            severity: profile.severity,
            preventive_measures: owned(profile.preventive_measures),
            affected_crops: owned(profile.affected_crops),
            symptoms: owned(profile.symptoms),
        }
    }
}

pub struct DiseaseDetector {
    max_image_size: usize,
    analysis_delay: Duration,
    rng: Mutex<StdRng>,
}

impl DiseaseDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic detector for reproducible runs
    pub fn with_seed(config: &DetectionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &DetectionConfig, rng: StdRng) -> Self {
        Self {
            max_image_size: config.max_image_size,
            analysis_delay: Duration::from_millis(config.analysis_delay_ms),
            rng: Mutex::new(rng),
        }
    }

    pub async fn detect(
        &self,
        image: &[u8],
        crop_type: Option<&str>,
        location: Option<&str>,
    ) -> Result<DiseaseReport, DetectorError> {
        if image.len() > self.max_image_size {
            return Err(DetectorError::ImageTooLarge);
        }

        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }

        let features = self.extract_features(image.len());
        Ok(self.classify(&features, crop_type, location))
    }

    /// Sample 2-4 features from the known pool, plus resolution features for
    /// large images
    pub fn extract_features(&self, image_len: usize) -> Vec<&'static str> {
        let mut features = Vec::new();
        if image_len > HIGH_RESOLUTION_BYTES {
            features.extend(["high_resolution", "detailed_texture"]);
        }

        let pool: Vec<&'static str> = CATALOGUE
            .iter()
            .flat_map(|p| p.image_features.iter().copied())
            .collect();

        let mut rng = self.lock_rng();
        let count = rng.gen_range(2..=4);
        for _ in 0..count {
            let feature = pool[rng.gen_range(0..pool.len())];
            if !features.contains(&feature) {
                features.push(feature);
            }
        }
        features
    }

    /// Score features against the catalogue and adjust for context
    pub fn classify(
        &self,
        features: &[&str],
        crop_type: Option<&str>,
        location: Option<&str>,
    ) -> DiseaseReport {
        let mut best = self.healthy();
        let mut confidence = BASELINE_CONFIDENCE;

        for profile in CATALOGUE.iter() {
            let hits = profile
                .image_features
                .iter()
                .filter(|f| features.contains(*f))
                .count();
            let score = hits as f64 / profile.image_features.len() as f64;
            if score > confidence {
                best = profile;
                confidence = score;
            }
        }

        let jitter: f64 = self.lock_rng().gen_range(0.0..0.2);
        confidence = (confidence + jitter).min(MAX_CONFIDENCE);

        if let Some(crop) = crop_type.filter(|c| !c.is_empty()) {
            if best.key != HEALTHY && !affects_crop(best, crop) {
                confidence *= IRRELEVANT_CROP_FACTOR;
            }
        }

        if let Some(location) = location {
            if confidence > REGIONAL_BOOST_FLOOR && is_regionally_common(best.key, location) {
                confidence = (confidence + REGIONAL_BOOST).min(MAX_CONFIDENCE);
            }
        }

        let confidence = (confidence.clamp(0.0, MAX_CONFIDENCE) * 100.0).round() / 100.0;
        DiseaseReport::from_profile(best, confidence)
    }

    /// Catalogue entry by display name, reported with full confidence
    pub fn disease_info(&self, name: &str) -> Option<DiseaseReport> {
        CATALOGUE
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| DiseaseReport::from_profile(p, 1.0))
    }

    pub fn supported_diseases(&self) -> Vec<&'static str> {
        CATALOGUE.iter().map(|p| p.name).collect()
    }

    pub fn diseases_by_crop(&self, crop: &str) -> Vec<&'static str> {
        let crop = crop.to_lowercase();
        CATALOGUE
            .iter()
            .filter(|p| p.affected_crops.iter().any(|c| c.to_lowercase().contains(&crop)))
            .map(|p| p.name)
            .collect()
    }

    fn healthy(&self) -> &'static DiseaseProfile {
        // The healthy profile is the last catalogue entry
        &CATALOGUE[CATALOGUE.len() - 1]
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        // A poisoned rng is still a valid rng
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn affects_crop(profile: &DiseaseProfile, crop: &str) -> bool {
    let crop = crop.to_lowercase();
    profile.affected_crops.iter().any(|c| {
        let c = c.to_lowercase();
        c.contains(&crop) || crop.contains(&c)
    })
}

fn is_regionally_common(key: &str, location: &str) -> bool {
    let location = location.to_lowercase();
    REGIONAL_PREVALENCE
        .iter()
        .find(|(region, _)| location.contains(region))
        .is_some_and(|(_, diseases)| diseases.contains(&key))
}
