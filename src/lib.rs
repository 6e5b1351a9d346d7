/*!
 * Nautilus FaceKey
 * Biometric key binding for the secure enclave
 *
 * Handles:
 * - Quantization of face-geometry distance vectors
 * - BCH secure sketch (helper data binding a random secret to the face)
 * - Key binding (k2 / token pairs the server can store)
 * - Multi-frame enrollment and verification matching
 *
 * Camera capture, landmark detection, the geometry pipeline and network
 * transport are external collaborators.
 */

pub mod backend;
pub mod bch;
pub mod binding;
pub mod bits;
pub mod config;
pub mod enrollment;
pub mod entropy;
pub mod error;
pub mod gf;
pub mod quantizer;
pub mod records;
pub mod sketch;
pub mod verification;

pub use backend::{FaceDataBackend, InMemoryBackend};
pub use bch::{BchCodec, BchParams};
pub use binding::{KeyBinding, Salt};
pub use config::FaceKeyConfig;
pub use enrollment::{EnrollmentOutcome, EnrollmentService, FaceFrame};
pub use error::{FaceKeyError, Result};
pub use records::{EnrollmentRecord, FetchPayload, StoredRecord, UploadPayload, WireRecord};
pub use sketch::{FrameRecord, FrameVerification, SecureSketch, SketchState};
pub use verification::{SessionCache, VerificationResult, VerificationService, VerificationSession};
