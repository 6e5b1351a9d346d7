/**
 * Records
 * Enrollment records and the upload / fetch payloads exchanged with the backend
 */

use serde::{Deserialize, Serialize};

use crate::binding::{decode_hex32, KeyBinding, Salt};
use crate::bits::parse_bit_string;
use crate::error::{FaceKeyError, Result};

/// One stored record as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub helper: String,
    pub k2: String,
    pub token: String,
    pub iod: String,
}

/// Enrollment → backend, one call per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub salt: String,
    pub records: Vec<WireRecord>,
}

/// Backend → device, consumed before verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPayload {
    pub salt: String,
    #[serde(rename = "faceData")]
    pub face_data: Vec<WireRecord>,
}

impl UploadPayload {
    /// Request body for the upload call.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FaceKeyError::Backend(format!("cannot encode upload: {}", e)))
    }
}

impl FetchPayload {
    /// Parses the backend's fetch response. Record contents are checked
    /// later, one by one, in [`StoredRecord::from_wire`].
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| FaceKeyError::MalformedRecord(format!("fetch response: {}", e)))
    }
}

impl From<UploadPayload> for FetchPayload {
    fn from(upload: UploadPayload) -> Self {
        Self {
            salt: upload.salt,
            face_data: upload.records,
        }
    }
}

/// A record produced by a successful registration. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub helper: String,
    pub binding: KeyBinding,
    /// Inter-ocular distance in percent (`frame.iod * 100`).
    pub iod: f64,
}

impl EnrollmentRecord {
    pub fn to_wire(&self) -> WireRecord {
        WireRecord {
            helper: self.helper.clone(),
            k2: hex::encode(self.binding.k2),
            token: hex::encode(self.binding.token),
            iod: self.iod.to_string(),
        }
    }
}

pub fn upload_payload(salt: &Salt, records: &[EnrollmentRecord]) -> UploadPayload {
    UploadPayload {
        salt: salt.to_hex(),
        records: records.iter().map(EnrollmentRecord::to_wire).collect(),
    }
}

/// A fetched record that passed the shape checks, parsed for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub helper: Vec<u8>,
    pub k2: [u8; 32],
    pub token: [u8; 32],
    pub iod: f64,
}

impl StoredRecord {
    /// Validates the wire shape: `helper_len` bits, 64-hex `k2`/`token`,
    /// a finite `iod`.
    pub fn from_wire(wire: &WireRecord, helper_len: usize) -> Result<Self> {
        if wire.helper.len() != helper_len {
            return Err(FaceKeyError::MalformedRecord(format!(
                "helper has {} characters, expected {}",
                wire.helper.len(),
                helper_len
            )));
        }
        let helper = parse_bit_string(&wire.helper).ok_or_else(|| {
            FaceKeyError::MalformedRecord("helper contains characters other than 0/1".to_string())
        })?;

        let iod: f64 = wire
            .iod
            .trim()
            .parse()
            .map_err(|_| FaceKeyError::MalformedRecord(format!("iod {:?} is not a number", wire.iod)))?;
        if !iod.is_finite() {
            return Err(FaceKeyError::MalformedRecord("iod is not finite".to_string()));
        }

        Ok(Self {
            helper,
            k2: decode_hex32(&wire.k2, "k2")?,
            token: decode_hex32(&wire.token, "token")?,
            iod,
        })
    }
}
