//! Evidence upload and display-URL resolution for FI-1557 form photos.
//!
//! A stored image has one durable identity, its storage path. The URL a
//! browser can actually fetch it from is derived on demand: the public
//! bucket link is preferred (no expiry to manage), and a 1-hour signed URL
//! is the fallback when the public link is not reachable. Reachability is
//! the only fallback trigger.

use crate::model::{EvidenceRecord, Loan};
use crate::probe::UrlProbe;
use crate::storage::ObjectStorage;
use chrono::Utc;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Validity window for signed fallback URLs.
const SIGNED_URL_TTL_SECONDS: u32 = 3600;

/// Uploads above this size are rejected before touching storage.
const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("evidence must be an image, got '{0}'")]
    InvalidFileType(String),

    #[error("evidence file is {size} bytes, maximum is {MAX_FILE_BYTES}")]
    FileTooLarge { size: usize },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("no reachable URL for '{0}'")]
    EvidenceUnreachable(String),
}

/// An image handed over by the caller for upload.
#[derive(Debug, Clone)]
pub struct EvidenceFile {
    pub bytes: Vec<u8>,
    /// MIME type as reported by the client, e.g. `image/jpeg`.
    pub content_type: String,
}

/// Outcome of a successful upload. `url_unresolved` is set when the file
/// was stored but no URL verified as reachable; storage success and URL
/// accessibility are independent concerns.
#[derive(Debug)]
pub struct UploadOutcome {
    pub evidence: EvidenceRecord,
    pub url_unresolved: bool,
}

pub struct EvidenceResolver {
    storage: Box<dyn ObjectStorage>,
    probe: Box<dyn UrlProbe>,
}

impl EvidenceResolver {
    pub fn new(storage: Box<dyn ObjectStorage>, probe: Box<dyn UrlProbe>) -> Self {
        Self { storage, probe }
    }

    /// Resolve a currently-working display URL for a stored object.
    ///
    /// Public first, verified with a HEAD probe; signed as fallback, also
    /// verified. Fails with [`EvidenceError::EvidenceUnreachable`] when
    /// neither answers.
    pub fn resolve(&self, storage_path: &str) -> Result<String, EvidenceError> {
        let public_url = self.storage.public_url(storage_path);
        if self.probe.is_reachable(&public_url) {
            return Ok(public_url);
        }

        debug!(path = storage_path, "Public URL not reachable, trying signed URL");

        let signed_url = match self.storage.signed_url(storage_path, SIGNED_URL_TTL_SECONDS) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, path = storage_path, "Signed URL request failed");
                return Err(EvidenceError::EvidenceUnreachable(storage_path.to_string()));
            }
        };

        if self.probe.is_reachable(&signed_url) {
            return Ok(signed_url);
        }

        Err(EvidenceError::EvidenceUnreachable(storage_path.to_string()))
    }

    /// Best-effort re-resolution for a record that is being read for display.
    ///
    /// When no URL is newly reachable the previous `display_url` is kept
    /// as-is instead of being blanked: a stale link that might still render
    /// beats a guaranteed broken image. This is deliberately different from
    /// the fresh [`resolve`] path, which fails loudly.
    pub fn refresh(&self, record: &EvidenceRecord) -> EvidenceRecord {
        let storage_path = if record.storage_path.is_empty() {
            // Legacy records carry only a URL; recover the path from it.
            match storage_path_from_url(&record.display_url) {
                Some(path) => path,
                None => {
                    debug!(
                        url = %record.display_url,
                        "No storage path recoverable, keeping URL as-is"
                    );
                    return record.clone();
                }
            }
        } else {
            record.storage_path.clone()
        };

        match self.resolve(&storage_path) {
            Ok(display_url) => EvidenceRecord {
                storage_path,
                display_url,
                filename: record.filename.clone(),
                uploaded_at: record.uploaded_at,
            },
            Err(err) => {
                warn!(
                    error = %err,
                    path = storage_path,
                    "Evidence refresh failed, retaining previous URL"
                );
                record.clone()
            }
        }
    }

    /// Validate and store an evidence image for a loan, then resolve its
    /// initial display URL.
    ///
    /// Validation rejections happen before any storage call. A stored file
    /// whose URL cannot be verified still counts as a successful upload;
    /// the record comes back with an empty `display_url` and
    /// `url_unresolved` set so the caller can warn.
    pub fn upload(&self, loan: &Loan, file: &EvidenceFile) -> Result<UploadOutcome, EvidenceError> {
        validate_file(file)?;

        let uploaded_at = Utc::now();
        let storage_path = derive_path(
            loan.equipment.as_ref().map(|e| e.kind.to_string()).as_deref(),
            loan.equipment.as_ref().map(|e| e.serial_number.as_str()),
            &loan.borrower_name,
            uploaded_at.timestamp_millis(),
            &file.content_type,
        );

        self.storage
            .upload(&storage_path, &file.bytes, &file.content_type)
            .map_err(|err| EvidenceError::UploadFailed(err.to_string()))?;

        let filename = storage_path
            .rsplit('/')
            .next()
            .unwrap_or(&storage_path)
            .to_string();

        match self.resolve(&storage_path) {
            Ok(display_url) => Ok(UploadOutcome {
                evidence: EvidenceRecord {
                    storage_path,
                    display_url,
                    filename,
                    uploaded_at: Some(uploaded_at),
                },
                url_unresolved: false,
            }),
            Err(err) => {
                warn!(
                    error = %err,
                    path = storage_path,
                    "Stored evidence has no reachable URL yet"
                );
                Ok(UploadOutcome {
                    evidence: EvidenceRecord {
                        storage_path,
                        display_url: String::new(),
                        filename,
                        uploaded_at: Some(uploaded_at),
                    },
                    url_unresolved: true,
                })
            }
        }
    }
}

/// Reject a file before any storage call: images only, at most 10 MiB.
pub fn validate_file(file: &EvidenceFile) -> Result<(), EvidenceError> {
    if !file.content_type.starts_with("image/") {
        return Err(EvidenceError::InvalidFileType(file.content_type.clone()));
    }

    if file.bytes.len() > MAX_FILE_BYTES {
        return Err(EvidenceError::FileTooLarge {
            size: file.bytes.len(),
        });
    }

    Ok(())
}

/// Deterministic storage path for an evidence image. Pure function of its
/// inputs so path layout is testable without a live upload.
///
/// Shape: `evidencias/prestamo_{type}_{serial}_{borrower}/FI-1557-{millis}.{ext}`
pub fn derive_path(
    equipment_type: Option<&str>,
    serial_number: Option<&str>,
    borrower_name: &str,
    timestamp_millis: i64,
    content_type: &str,
) -> String {
    let equipment_type = equipment_type.unwrap_or("equipo");
    let serial = match serial_number.map(sanitize) {
        Some(s) if !s.is_empty() => s,
        _ => "unknown".to_string(),
    };
    let borrower = sanitize(borrower_name);
    let extension = content_type.split('/').nth(1).filter(|e| !e.is_empty()).unwrap_or("jpg");

    format!(
        "evidencias/prestamo_{equipment_type}_{serial}_{borrower}/FI-1557-{timestamp_millis}.{extension}"
    )
}

/// Strip everything non-alphanumeric and lowercase the rest, so names like
/// "Ana María" become safe path components.
fn sanitize(value: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9]").expect("invalid sanitize regex");
    re.replace_all(value, "").to_lowercase()
}

/// Recover the durable storage path from a full public or signed URL, for
/// records written before paths were stored alongside URLs.
fn storage_path_from_url(url: &str) -> Option<String> {
    for marker in ["/storage/v1/object/public/", "/storage/v1/object/sign/"] {
        if let Some(rest) = url.split(marker).nth(1) {
            // Skip the bucket segment and drop any signed-URL query string.
            let path = rest.split_once('/')?.1;
            let path = path.split('?').next().unwrap_or(path);
            if !path.is_empty() {
                return Some(path.to_string());
            }
        }
    }

    // Not a full URL at all: older records stored the bare path.
    if !url.starts_with("http") && !url.is_empty() {
        return Some(url.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvidenceRecord;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    struct FakeStorage {
        signed_fails: bool,
        uploads: Arc<Mutex<Vec<String>>>,
    }

    impl FakeStorage {
        fn new() -> Self {
            Self {
                signed_fails: false,
                uploads: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ObjectStorage for FakeStorage {
        fn upload(&self, path: &str, _bytes: &[u8], _content_type: &str) -> anyhow::Result<()> {
            self.uploads.lock().unwrap().push(path.to_string());
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://store.test/storage/v1/object/public/imagenes/{path}")
        }

        fn signed_url(&self, path: &str, ttl_seconds: u32) -> anyhow::Result<String> {
            if self.signed_fails {
                return Err(anyhow!("sign endpoint down"));
            }
            Ok(format!(
                "https://store.test/storage/v1/object/sign/imagenes/{path}?token=t{ttl_seconds}"
            ))
        }
    }

    /// Probe that answers from a fixed policy on URL kind.
    struct FakeProbe {
        public_reachable: bool,
        signed_reachable: bool,
    }

    impl UrlProbe for FakeProbe {
        fn is_reachable(&self, url: &str) -> bool {
            if url.contains("/object/sign/") {
                self.signed_reachable
            } else {
                self.public_reachable
            }
        }
    }

    fn resolver(public: bool, signed: bool) -> EvidenceResolver {
        EvidenceResolver::new(
            Box::new(FakeStorage::new()),
            Box::new(FakeProbe {
                public_reachable: public,
                signed_reachable: signed,
            }),
        )
    }

    fn image_file(size: usize) -> EvidenceFile {
        EvidenceFile {
            bytes: vec![0u8; size],
            content_type: "image/jpeg".into(),
        }
    }

    fn loan_with_equipment() -> Loan {
        serde_json::from_value(serde_json::json!({
            "id": "loan-1",
            "equipment_id": "eq-1",
            "borrower_name": "Ana María",
            "borrower_department": "Sistemas",
            "start_date": "2024-03-15T17:00:00Z",
            "expected_return_date": "2024-03-22T17:00:00Z",
            "status": "active",
            "created_at": "2024-03-15T17:00:00Z",
            "updated_at": "2024-03-15T17:00:00Z",
            "equipment": {
                "id": "eq-1",
                "type": "laptop",
                "serial_number": "AB-12",
                "model": "ThinkPad",
                "status": "loaned",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn public_url_wins_when_both_reachable() {
        let url = resolver(true, true).resolve("evidencias/a.jpg").unwrap();
        assert!(url.contains("/object/public/"));
    }

    #[test]
    fn falls_back_to_signed_when_public_unreachable() {
        let url = resolver(false, true).resolve("evidencias/a.jpg").unwrap();
        assert!(url.contains("/object/sign/"));
    }

    #[test]
    fn fresh_resolution_fails_when_nothing_reachable() {
        let err = resolver(false, false).resolve("evidencias/a.jpg").unwrap_err();
        assert!(matches!(err, EvidenceError::EvidenceUnreachable(_)));
    }

    #[test]
    fn signed_request_failure_is_unreachable() {
        let storage = FakeStorage {
            signed_fails: true,
            uploads: Arc::new(Mutex::new(Vec::new())),
        };
        let resolver = EvidenceResolver::new(
            Box::new(storage),
            Box::new(FakeProbe {
                public_reachable: false,
                signed_reachable: true,
            }),
        );

        let err = resolver.resolve("evidencias/a.jpg").unwrap_err();
        assert!(matches!(err, EvidenceError::EvidenceUnreachable(_)));
    }

    #[test]
    fn refresh_retains_previous_url_on_total_failure() {
        let record = EvidenceRecord {
            storage_path: "evidencias/a.jpg".into(),
            display_url: "https://store.test/old-but-maybe-fine.jpg".into(),
            filename: "a.jpg".into(),
            uploaded_at: None,
        };

        let refreshed = resolver(false, false).refresh(&record);
        assert_eq!(refreshed, record);
    }

    #[test]
    fn refresh_recovers_path_from_legacy_signed_url() {
        let record = EvidenceRecord {
            storage_path: String::new(),
            display_url:
                "https://store.test/storage/v1/object/sign/imagenes/evidencias/x/a.jpg?token=abc"
                    .into(),
            filename: "a.jpg".into(),
            uploaded_at: None,
        };

        let refreshed = resolver(true, false).refresh(&record);
        assert_eq!(refreshed.storage_path, "evidencias/x/a.jpg");
        assert!(refreshed.display_url.contains("/object/public/"));
    }

    #[test]
    fn upload_rejects_non_image_without_touching_storage() {
        let storage = FakeStorage::new();
        let uploads = Arc::clone(&storage.uploads);
        let resolver = EvidenceResolver::new(
            Box::new(storage),
            Box::new(FakeProbe {
                public_reachable: true,
                signed_reachable: true,
            }),
        );
        let file = EvidenceFile {
            bytes: vec![0u8; 16],
            content_type: "application/pdf".into(),
        };

        let err = resolver.upload(&loan_with_equipment(), &file).unwrap_err();
        assert!(matches!(err, EvidenceError::InvalidFileType(_)));
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn upload_rejects_oversized_file_without_touching_storage() {
        let storage = FakeStorage::new();
        let uploads = Arc::clone(&storage.uploads);
        let resolver = EvidenceResolver::new(
            Box::new(storage),
            Box::new(FakeProbe {
                public_reachable: true,
                signed_reachable: true,
            }),
        );

        let err = resolver
            .upload(&loan_with_equipment(), &image_file(11 * 1024 * 1024))
            .unwrap_err();
        assert!(matches!(err, EvidenceError::FileTooLarge { .. }));
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn upload_at_exactly_ten_mib_is_accepted() {
        let outcome = resolver(true, true)
            .upload(&loan_with_equipment(), &image_file(10 * 1024 * 1024))
            .unwrap();
        assert!(!outcome.url_unresolved);
    }

    #[test]
    fn upload_succeeds_with_unresolved_url_when_nothing_reachable() {
        let outcome = resolver(false, false)
            .upload(&loan_with_equipment(), &image_file(16))
            .unwrap();

        assert!(outcome.url_unresolved);
        assert!(outcome.evidence.display_url.is_empty());
        assert!(!outcome.evidence.storage_path.is_empty());
    }

    #[test]
    fn derived_path_is_deterministic_and_sanitized() {
        let first = derive_path(Some("laptop"), Some("AB-12"), "Ana María", 1000, "image/png");
        let second = derive_path(Some("laptop"), Some("AB-12"), "Ana María", 1000, "image/png");

        assert_eq!(first, second);
        assert_eq!(
            first,
            "evidencias/prestamo_laptop_ab12_anamara/FI-1557-1000.png"
        );
    }

    #[test]
    fn derived_path_defaults_for_missing_metadata() {
        let path = derive_path(None, None, "Bob", 1000, "image/jpeg");
        assert_eq!(path, "evidencias/prestamo_equipo_unknown_bob/FI-1557-1000.jpeg");
    }

    #[test]
    fn derived_path_falls_back_to_jpg_extension() {
        let path = derive_path(Some("laptop"), Some("S1"), "Bob", 1000, "image/");
        assert!(path.ends_with(".jpg"));
    }
}
