/**
 * Enrollment Service
 * Registers a batch of captured frames under one salt and hands the records to storage
 */

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::FaceDataBackend;
use crate::binding::{bind, Salt};
use crate::config::FaceKeyConfig;
use crate::error::{FaceKeyError, Result};
use crate::quantizer::FEATURE_COUNT;
use crate::records::{upload_payload, EnrollmentRecord, UploadPayload};
use crate::sketch::SecureSketch;

/// One capture from the geometry pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceFrame {
    pub distances: Vec<f64>,
    /// Inter-ocular distance ratio.
    pub iod: f32,
}

impl FaceFrame {
    pub fn new(distances: Vec<f64>, iod: f32) -> Self {
        Self { distances, iod }
    }

    /// IOD in the percent units stored on records.
    pub fn iod_percent(&self) -> f64 {
        f64::from(self.iod) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub salt: Salt,
    pub records: Vec<EnrollmentRecord>,
    /// Frames that were dropped for shape or failed to register.
    pub rejected_frames: usize,
}

impl EnrollmentOutcome {
    pub fn upload_payload(&self) -> UploadPayload {
        upload_payload(&self.salt, &self.records)
    }
}

pub struct EnrollmentService {
    sketch: Arc<SecureSketch>,
    config: FaceKeyConfig,
}

impl EnrollmentService {
    /// Fails with `InvalidConfig` when the thresholds do not validate.
    pub fn new(sketch: Arc<SecureSketch>, config: FaceKeyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { sketch, config })
    }

    /// Registers every frame on a blocking worker; the codec is only ever
    /// touched from there.
    pub async fn enroll(&self, user_id: &str, frames: Vec<FaceFrame>) -> Result<EnrollmentOutcome> {
        info!("Enrollment request: user_id={}, frames={}", user_id, frames.len());

        let sketch = Arc::clone(&self.sketch);
        let min_frames = self.config.min_enrollment_frames;
        let outcome =
            tokio::task::spawn_blocking(move || enroll_frames(&sketch, &frames, min_frames))
                .await??;

        info!(
            "Enrollment complete: user_id={}, records={}, rejected={}",
            user_id,
            outcome.records.len(),
            outcome.rejected_frames
        );
        Ok(outcome)
    }

    /// Enrolls and uploads in one step. Nothing is uploaded when the batch
    /// falls below the threshold.
    pub async fn enroll_and_upload<B: FaceDataBackend>(
        &self,
        backend: &B,
        user_id: &str,
        frames: Vec<FaceFrame>,
    ) -> Result<EnrollmentOutcome> {
        let outcome = self.enroll(user_id, frames).await?;
        backend.upload(user_id, outcome.upload_payload()).await?;
        Ok(outcome)
    }

    /// Deletes the user's stored biometric enrollment.
    pub async fn reset<B: FaceDataBackend>(&self, backend: &B, user_id: &str) -> Result<()> {
        info!("Biometric reset: user_id={}", user_id);
        backend.delete(user_id).await
    }
}

/// Synchronous enrollment core.
///
/// Frames of the wrong length are dropped up front. Each remaining frame is
/// registered with its own R and bound under one shared salt; a frame that
/// fails is counted and skipped. Fails with `InsufficientFrames` when fewer
/// than `min_frames` records survive either stage.
pub fn enroll_frames(
    sketch: &SecureSketch,
    frames: &[FaceFrame],
    min_frames: usize,
) -> Result<EnrollmentOutcome> {
    if min_frames == 0 {
        return Err(FaceKeyError::InvalidConfig(
            "min_enrollment_frames must be at least 1".to_string(),
        ));
    }

    let valid: Vec<&FaceFrame> = frames
        .iter()
        .filter(|f| f.distances.len() == FEATURE_COUNT)
        .collect();
    if valid.len() < min_frames {
        warn!("Enrollment rejected: {} valid frames, need {}", valid.len(), min_frames);
        return Err(FaceKeyError::InsufficientFrames {
            required: min_frames,
            available: valid.len(),
        });
    }

    let salt = Salt::generate()?;
    let mut records = Vec::with_capacity(valid.len());
    let mut failed = 0usize;

    for (index, frame) in valid.iter().enumerate() {
        match sketch.register(&frame.distances) {
            Ok(registered) => {
                let binding = bind(&registered.secret32, &salt)?;
                records.push(EnrollmentRecord {
                    helper: registered.helper.clone(),
                    binding,
                    iod: frame.iod_percent(),
                });
            }
            Err(e) if e.is_frame_local() => {
                debug!("Frame {} not registered: {}", index, e);
                failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if records.len() < min_frames {
        warn!(
            "Enrollment rejected: {} frames registered, {} failed, need {}",
            records.len(),
            failed,
            min_frames
        );
        return Err(FaceKeyError::InsufficientFrames {
            required: min_frames,
            available: records.len(),
        });
    }

    Ok(EnrollmentOutcome {
        salt,
        records,
        rejected_frames: frames.len() - valid.len() + failed,
    })
}
