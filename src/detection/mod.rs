//! Crop disease detection pipeline
//!
//! validate -> assess -> preprocess -> classify -> store -> notify -> log
//!
//! The detection record, its notification and the analytics event are
//! separate writes; a failure between them leaves earlier writes in place.

pub mod classifier;
pub mod imaging;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::{DetectionConfig, UploadConfig};
use crate::store::models::{
    DiseaseDetection, NewDetection, NewEvent, NewNotification, NotificationKind, Priority,
    Severity,
};
use crate::store::{RecordStore, StoreError};
pub use classifier::{DetectorError, DiseaseDetector, DiseaseReport};
pub use imaging::{ImageError, ImageUpload, QualityAssessment};

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Disease detection failed: {0}")]
    Detector(#[from] DetectorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Optional context supplied with an upload
#[derive(Debug, Clone, Default)]
pub struct DetectionRequest {
    pub user_id: Option<String>,
    pub crop_type: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    #[serde(flatten)]
    pub report: DiseaseReport,
    pub detection_id: Option<String>,
    /// Confidence fell below the configured threshold
    pub low_confidence: bool,
    pub image_quality: QualityAssessment,
    pub timestamp: DateTime<Utc>,
    pub processing_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionHistory {
    pub detections: Vec<DiseaseDetection>,
    pub total: usize,
    pub has_more: bool,
}

/// Notification priority for a severity, if it warrants one
pub fn alert_priority(severity: Severity) -> Option<Priority> {
    match severity {
        Severity::Critical => Some(Priority::High),
        Severity::High => Some(Priority::Medium),
        _ => None,
    }
}

pub struct DetectionService {
    store: Arc<RecordStore>,
    detector: Arc<DiseaseDetector>,
    upload: UploadConfig,
    preprocess_delay: Duration,
    confidence_threshold: f64,
}

impl DetectionService {
    pub fn new(
        store: Arc<RecordStore>,
        detector: Arc<DiseaseDetector>,
        upload: UploadConfig,
        config: &DetectionConfig,
    ) -> Self {
        Self {
            store,
            detector,
            upload,
            preprocess_delay: Duration::from_millis(config.preprocess_delay_ms),
            confidence_threshold: config.confidence_threshold,
        }
    }

    pub fn detector(&self) -> &DiseaseDetector {
        &self.detector
    }

    pub async fn analyze(
        &self,
        image: ImageUpload,
        request: DetectionRequest,
    ) -> Result<DetectionResult, DetectionError> {
        let started = Instant::now();

        imaging::validate_image(&image, &self.upload)?;
        let image_quality = imaging::assess_quality(&image.bytes);

        if !self.preprocess_delay.is_zero() {
            tokio::time::sleep(self.preprocess_delay).await;
        }

        let report = self
            .detector
            .detect(
                &image.bytes,
                request.crop_type.as_deref(),
                request.location.as_deref(),
            )
            .await?;

        let low_confidence = report.confidence < self.confidence_threshold;
        if low_confidence {
            warn!(
                disease = %report.disease,
                confidence = report.confidence,
                threshold = self.confidence_threshold,
                "Detection below confidence threshold"
            );
        }

        let mut detection_id = None;
        if let Some(user_id) = &request.user_id {
            let filename = imaging::generate_filename(&image.filename, user_id);
            let detection = self
                .store
                .detections
                .create(NewDetection {
                    user_id: user_id.clone(),
                    image_url: format!("/uploads/{filename}"),
                    image_filename: Some(filename),
                    disease: report.disease.clone(),
                    confidence: report.confidence,
                    treatment: report.treatment.clone(),
                    severity: report.severity,
                    crop_type: request.crop_type.clone(),
                    location: request.location.clone(),
                })
                .await?;
            detection_id = Some(detection.id);

            self.notify(user_id, &report, request.crop_type.as_deref()).await?;
        }

        let event = NewEvent::new(
            "disease_detection",
            json!({
                "disease": report.disease,
                "confidence": report.confidence,
                "severity": report.severity,
                "cropType": request.crop_type,
                "location": request.location,
                "imageSize": image.bytes.len(),
                "imageType": image.content_type,
                "lowConfidence": low_confidence,
            }),
        )
        .for_user(request.user_id.clone());
        if let Err(e) = self.store.log_event(event).await {
            warn!(error = %e, "Failed to log detection event");
        }

        info!(
            disease = %report.disease,
            confidence = report.confidence,
            severity = %report.severity,
            "Disease detection complete"
        );

        Ok(DetectionResult {
            report,
            detection_id,
            low_confidence,
            image_quality,
            timestamp: Utc::now(),
            processing_time: format!("{:.1}s", started.elapsed().as_secs_f64()),
        })
    }

    /// Emit a disease alert for High and Critical findings
    async fn notify(
        &self,
        user_id: &str,
        report: &DiseaseReport,
        crop_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let Some(priority) = alert_priority(report.severity) else {
            return Ok(());
        };

        self.store
            .notifications
            .create(NewNotification {
                user_id: user_id.to_string(),
                title: format!("{} Disease Detected", report.severity),
                message: format!(
                    "{} detected in your {} with {}% confidence. Immediate treatment recommended.",
                    report.disease,
                    crop_type.unwrap_or("crop"),
                    (report.confidence * 100.0).round()
                ),
                kind: NotificationKind::DiseaseAlert,
                priority,
            })
            .await?;
        Ok(())
    }

    /// A user's most recent detections
    pub async fn history(&self, user_id: &str, limit: usize) -> DetectionHistory {
        let mut detections = self.store.detections_by_user(user_id).await;
        let total = detections.len();
        detections.truncate(limit);
        DetectionHistory {
            detections,
            total,
            has_more: total > limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(store: Arc<RecordStore>) -> DetectionService {
        service_with_threshold(store, DetectionConfig::default().confidence_threshold)
    }

    fn service_with_threshold(store: Arc<RecordStore>, confidence_threshold: f64) -> DetectionService {
        let config = DetectionConfig {
            analysis_delay_ms: 0,
            preprocess_delay_ms: 0,
            confidence_threshold,
            ..DetectionConfig::default()
        };
        let detector = Arc::new(DiseaseDetector::with_seed(&config, 11));
        DetectionService::new(store, detector, UploadConfig::default(), &config)
    }

    fn jpeg(len: usize) -> ImageUpload {
        let mut bytes = vec![0u8; len];
        bytes[0] = 0xff;
        bytes[1] = 0xd8;
        ImageUpload {
            filename: "leaf.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes,
        }
    }

    fn report(severity: Severity) -> DiseaseReport {
        DiseaseReport {
            disease: "Bacterial Wilt".to_string(),
            confidence: 0.91,
            description: String::new(),
            treatment: String::new(),
            severity,
            preventive_measures: vec![],
            affected_crops: vec![],
            symptoms: vec![],
        }
    }

    #[test]
    fn test_alert_priority_by_severity() {
        assert_eq!(alert_priority(Severity::Critical), Some(Priority::High));
        assert_eq!(alert_priority(Severity::High), Some(Priority::Medium));
        assert_eq!(alert_priority(Severity::Medium), None);
        assert_eq!(alert_priority(Severity::Low), None);
        assert_eq!(alert_priority(Severity::None), None);
    }

    #[tokio::test]
    async fn test_critical_finding_creates_one_high_priority_alert() {
        let store = Arc::new(RecordStore::new());
        let service = service(store.clone());

        service.notify("user_1", &report(Severity::Critical), Some("tomato")).await.unwrap();
        service.notify("user_2", &report(Severity::Low), Some("tomato")).await.unwrap();

        let alerts = store.notifications_for_user("user_1", false).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].priority, Priority::High);
        assert_eq!(alerts[0].title, "Critical Disease Detected");
        assert_eq!(
            alerts[0].message,
            "Bacterial Wilt detected in your tomato with 91% confidence. Immediate treatment recommended."
        );
        assert!(store.notifications_for_user("user_2", false).await.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_stores_detection_and_matching_alerts() {
        let store = Arc::new(RecordStore::new());
        let service = service(store.clone());
        let request = DetectionRequest {
            user_id: Some("user_9".to_string()),
            crop_type: Some("tomato".to_string()),
            location: Some("Maharashtra".to_string()),
        };

        let mut expected_alerts = 0;
        for _ in 0..20 {
            let result = service.analyze(jpeg(120_000), request.clone()).await.unwrap();
            assert!((0.0..=1.0).contains(&result.report.confidence));
            assert!(result.detection_id.as_deref().unwrap().starts_with("detect_"));
            if alert_priority(result.report.severity).is_some() {
                expected_alerts += 1;
            }
        }

        assert_eq!(store.detections_by_user("user_9").await.len(), 20);
        assert_eq!(store.notifications_for_user("user_9", false).await.len(), expected_alerts);
        assert_eq!(store.events_by_type("disease_detection", 1).await.len(), 20);
    }

    #[tokio::test]
    async fn test_anonymous_detection_is_not_stored() {
        let store = Arc::new(RecordStore::new());
        let service = service(store.clone());

        let result = service.analyze(jpeg(80_000), DetectionRequest::default()).await.unwrap();

        assert!(result.detection_id.is_none());
        assert!(!result.image_quality.suitable);
        assert!(store.detections.is_empty().await);
        assert_eq!(store.events.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_upload_rejected_before_detection() {
        let store = Arc::new(RecordStore::new());
        let service = service(store.clone());
        let mut gif = jpeg(1_000);
        gif.content_type = "image/gif".to_string();

        assert!(matches!(
            service.analyze(gif, DetectionRequest::default()).await,
            Err(DetectionError::Image(_))
        ));
        // Passes the upload limit but exceeds the detector limit
        assert!(matches!(
            service.analyze(jpeg(6 * 1024 * 1024), DetectionRequest::default()).await,
            Err(DetectionError::Detector(_))
        ));
        assert!(store.events.is_empty().await);
    }

    #[tokio::test]
    async fn test_low_confidence_follows_threshold() {
        let store = Arc::new(RecordStore::new());

        let strict = service_with_threshold(store.clone(), 0.96);
        for _ in 0..5 {
            let result = strict.analyze(jpeg(120_000), DetectionRequest::default()).await.unwrap();
            assert!(result.low_confidence);
        }

        let lenient = service_with_threshold(store.clone(), 0.0);
        for _ in 0..5 {
            let result = lenient.analyze(jpeg(120_000), DetectionRequest::default()).await.unwrap();
            assert!(!result.low_confidence);
        }

        let default = service(store);
        let result = default.analyze(jpeg(120_000), DetectionRequest::default()).await.unwrap();
        assert_eq!(result.low_confidence, result.report.confidence < 0.7);
    }

    #[tokio::test]
    async fn test_history_limits_newest_first() {
        let store = Arc::new(RecordStore::new());
        let service = service(store.clone());
        let request = DetectionRequest {
            user_id: Some("user_3".to_string()),
            ..Default::default()
        };
        for _ in 0..3 {
            service.analyze(jpeg(60_000), request.clone()).await.unwrap();
        }

        let history = service.history("user_3", 2).await;
        assert_eq!(history.total, 3);
        assert_eq!(history.detections.len(), 2);
        assert!(history.has_more);
        assert!(history.detections[0].created_at >= history.detections[1].created_at);
        assert!(!service.history("user_3", 10).await.has_more);
    }
}
