/**
 * Verification Service
 * Matches fresh frames against a user's stored records
 *
 * For each frame, records are tried in order until `required_record_matches`
 * tokens check out; the first frame that gets there passes the attempt.
 * Records whose IOD is too far from the frame's are skipped before any
 * codec work.
 */

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::FaceDataBackend;
use crate::binding::{token_candidate, token_matches, Salt};
use crate::config::FaceKeyConfig;
use crate::enrollment::FaceFrame;
use crate::error::{FaceKeyError, Result};
use crate::quantizer::FEATURE_COUNT;
use crate::records::{FetchPayload, StoredRecord};
use crate::sketch::SecureSketch;

/// A validated, read-only snapshot of one user's stored enrollment.
#[derive(Debug)]
pub struct VerificationSession {
    salt: Salt,
    records: Vec<StoredRecord>,
    skipped_records: usize,
}

impl VerificationSession {
    /// Parses a fetch payload. A bad salt rejects the whole payload; bad
    /// records are skipped and counted.
    pub fn from_payload(payload: &FetchPayload, helper_len: usize) -> Result<Self> {
        let salt = Salt::from_hex(&payload.salt)?;

        let mut records = Vec::with_capacity(payload.face_data.len());
        let mut skipped_records = 0;
        for (index, wire) in payload.face_data.iter().enumerate() {
            match StoredRecord::from_wire(wire, helper_len) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping stored record {}: {}", index, e);
                    skipped_records += 1;
                }
            }
        }

        Ok(Self {
            salt,
            records,
            skipped_records,
        })
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }
}

/// Sessions fetched once per user and reused until invalidated.
pub struct SessionCache {
    helper_len: usize,
    sessions: RwLock<HashMap<String, Arc<VerificationSession>>>,
}

impl SessionCache {
    /// Shapes fetched records against the sketch's codeword length.
    pub fn new(sketch: &SecureSketch) -> Result<Self> {
        Ok(Self {
            helper_len: sketch.params()?.n(),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn get_or_fetch<B: FaceDataBackend>(
        &self,
        backend: &B,
        user_id: &str,
    ) -> Result<Arc<VerificationSession>> {
        if let Some(session) = self.sessions.read().await.get(user_id) {
            return Ok(Arc::clone(session));
        }

        let payload = backend.fetch(user_id).await?;
        let session = Arc::new(VerificationSession::from_payload(&payload, self.helper_len)?);
        debug!(
            "Cached session for user_id={}: {} records, {} skipped",
            user_id,
            session.records.len(),
            session.skipped_records
        );

        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::clone(&session));
        Ok(Arc::clone(entry))
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    /// `best_match_count / total_records * 100`. Reporting only.
    pub match_percentage: f64,
    pub best_match_count: usize,
    pub total_records: usize,
    /// Index of the passing frame among the evaluated frames.
    pub best_frame: Option<usize>,
    pub frames_evaluated: usize,
    pub notes: Vec<String>,
}

pub struct VerificationService {
    sketch: Arc<SecureSketch>,
    config: FaceKeyConfig,
}

impl VerificationService {
    /// Fails with `InvalidConfig` when the thresholds do not validate.
    pub fn new(sketch: Arc<SecureSketch>, config: FaceKeyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { sketch, config })
    }

    /// Runs the matching loop on a blocking worker.
    pub async fn verify(
        &self,
        session: Arc<VerificationSession>,
        frames: Vec<FaceFrame>,
    ) -> Result<VerificationResult> {
        let sketch = Arc::clone(&self.sketch);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || match_frames(&sketch, &session, &frames, &config))
            .await?
    }

    /// Fetches (or reuses) the user's session, then verifies.
    pub async fn verify_user<B: FaceDataBackend>(
        &self,
        backend: &B,
        cache: &SessionCache,
        user_id: &str,
        frames: Vec<FaceFrame>,
    ) -> Result<VerificationResult> {
        info!("Verification request: user_id={}, frames={}", user_id, frames.len());
        let session = cache.get_or_fetch(backend, user_id).await?;
        let result = self.verify(session, frames).await?;
        info!(
            "Verification finished: user_id={}, success={}, match={:.1}%",
            user_id, result.success, result.match_percentage
        );
        Ok(result)
    }
}

enum PairOutcome {
    IodOutOfRange,
    Mismatch,
    Matched,
}

/// Synchronous matching engine.
///
/// Frames of the wrong length are dropped and at most
/// `max_verification_frames` are evaluated. Evaluation stops at the first
/// frame with `required_record_matches` matches; otherwise the best count
/// seen is reported and the attempt fails.
pub fn match_frames(
    sketch: &SecureSketch,
    session: &VerificationSession,
    frames: &[FaceFrame],
    config: &FaceKeyConfig,
) -> Result<VerificationResult> {
    config.validate()?;
    let mut notes = Vec::new();

    let usable: Vec<&FaceFrame> = frames
        .iter()
        .filter(|f| f.distances.len() == FEATURE_COUNT)
        .take(config.max_verification_frames)
        .collect();
    let wrong_shape = frames.iter().filter(|f| f.distances.len() != FEATURE_COUNT).count();
    if wrong_shape > 0 {
        notes.push(format!("dropped {} frames with wrong distance count", wrong_shape));
    }
    if usable.len() < config.min_verification_frames {
        return Err(FaceKeyError::InsufficientFrames {
            required: config.min_verification_frames,
            available: usable.len(),
        });
    }
    if session.skipped_records > 0 {
        notes.push(format!("{} malformed stored records ignored", session.skipped_records));
    }

    let total_records = session.records.len();
    let mut best_match_count = 0;
    let mut best_frame = None;
    let mut frames_evaluated = 0;

    for (index, frame) in usable.iter().enumerate() {
        frames_evaluated += 1;
        let (matches, iod_skipped) = count_frame_matches(sketch, session, frame, config)?;
        notes.push(format!(
            "frame {}: {} matched, {} skipped by iod",
            index, matches, iod_skipped
        ));
        best_match_count = best_match_count.max(matches);

        if matches >= config.required_record_matches {
            best_frame = Some(index);
            break;
        }
    }

    let match_percentage = if total_records == 0 {
        0.0
    } else {
        best_match_count as f64 / total_records as f64 * 100.0
    };

    Ok(VerificationResult {
        success: best_frame.is_some(),
        match_percentage,
        best_match_count,
        total_records,
        best_frame,
        frames_evaluated,
        notes,
    })
}

/// Tries records in order until the required count is reached. Returns
/// the match count and how many records the IOD gate skipped.
fn count_frame_matches(
    sketch: &SecureSketch,
    session: &VerificationSession,
    frame: &FaceFrame,
    config: &FaceKeyConfig,
) -> Result<(usize, usize)> {
    let mut matches = 0;
    let mut iod_skipped = 0;

    for record in &session.records {
        match match_record(sketch, &session.salt, record, frame, config.iod_epsilon)? {
            PairOutcome::Matched => {
                matches += 1;
                if matches >= config.required_record_matches {
                    break;
                }
            }
            PairOutcome::IodOutOfRange => iod_skipped += 1,
            PairOutcome::Mismatch => {}
        }
    }

    Ok((matches, iod_skipped))
}

fn match_record(
    sketch: &SecureSketch,
    salt: &Salt,
    record: &StoredRecord,
    frame: &FaceFrame,
    iod_epsilon: f64,
) -> Result<PairOutcome> {
    let gap = (frame.iod_percent() - record.iod).abs();
    if !gap.is_finite() || gap > iod_epsilon {
        return Ok(PairOutcome::IodOutOfRange);
    }

    let scale = record.iod / 100.0;
    let scaled: Vec<f64> = frame.distances.iter().map(|d| d * scale).collect();

    match sketch.verify_bits(&scaled, &record.helper) {
        Ok(recovered) => {
            let candidate = token_candidate(&recovered.secret32, salt, &record.k2);
            if token_matches(&candidate, &record.token) {
                Ok(PairOutcome::Matched)
            } else {
                Ok(PairOutcome::Mismatch)
            }
        }
        Err(e) if e.is_frame_local() => Ok(PairOutcome::Mismatch),
        Err(e) => Err(e),
    }
}
