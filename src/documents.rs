//! Staging of uploaded case documents.
//!
//! Uploads are written to disk under `<data_dir>/documents/<case_id>/`
//! with a content hash, and referenced from the store as opaque
//! `DocumentRef`s. The orchestrator never looks inside a document; only
//! the extraction gate reads the staged files.

use std::fs;
use std::path::Path;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{DocumentKind, DocumentRef};

/// Upload formats the intake accepts.
const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// An uploaded document before staging.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub kind: DocumentKind,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Whether the filename carries an accepted extension.
pub fn accepted_format(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// SHA-256 of the document content, hex-encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Write an upload to the staging area and return its reference.
///
/// The stored filename is the document id plus the original extension,
/// so re-uploads never collide with the file they supersede.
pub fn stage_upload(
    documents_dir: &Path,
    case_id: Uuid,
    upload: &StagedUpload,
) -> std::io::Result<DocumentRef> {
    let case_dir = documents_dir.join(case_id.to_string());
    fs::create_dir_all(&case_dir)?;

    let id = Uuid::new_v4();
    let extension = Path::new(&upload.filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase();
    let stored_path = case_dir.join(format!("{id}.{extension}"));
    fs::write(&stored_path, &upload.bytes)?;

    Ok(DocumentRef {
        id,
        case_id,
        kind: upload.kind,
        filename: upload.filename.clone(),
        sha256: content_hash(&upload.bytes),
        stored_path: stored_path.to_string_lossy().into_owned(),
        uploaded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions() {
        assert!(accepted_format("wohnungsgeberbestaetigung.pdf"));
        assert!(accepted_format("scan.PNG"));
        assert!(accepted_format("photo.jpeg"));
    }

    #[test]
    fn rejects_unknown_or_missing_extension() {
        assert!(!accepted_format("form.docx"));
        assert!(!accepted_format("form"));
        assert!(!accepted_format("archive.tar.gz"));
    }

    #[test]
    fn hash_is_deterministic_and_content_sensitive() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"abc").len(), 64);
    }

    #[test]
    fn staging_writes_file_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let case_id = Uuid::new_v4();
        let upload = StagedUpload {
            kind: DocumentKind::RegistrationForm,
            filename: "anmeldung.pdf".into(),
            bytes: b"fake pdf bytes".to_vec(),
        };

        let doc = stage_upload(dir.path(), case_id, &upload).unwrap();
        assert_eq!(doc.kind, DocumentKind::RegistrationForm);
        assert_eq!(doc.filename, "anmeldung.pdf");
        assert_eq!(doc.sha256, content_hash(b"fake pdf bytes"));
        assert!(Path::new(&doc.stored_path).exists());
        assert_eq!(fs::read(&doc.stored_path).unwrap(), b"fake pdf bytes");
    }

    #[test]
    fn restaging_same_kind_keeps_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let case_id = Uuid::new_v4();
        let first = stage_upload(
            dir.path(),
            case_id,
            &StagedUpload {
                kind: DocumentKind::RegistrationForm,
                filename: "v1.pdf".into(),
                bytes: b"v1".to_vec(),
            },
        )
        .unwrap();
        let second = stage_upload(
            dir.path(),
            case_id,
            &StagedUpload {
                kind: DocumentKind::RegistrationForm,
                filename: "v2.pdf".into(),
                bytes: b"v2".to_vec(),
            },
        )
        .unwrap();
        assert_ne!(first.stored_path, second.stored_path);
    }
}
