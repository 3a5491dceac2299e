//! Borrower KYC documents.
//!
//! The engine stores only path references; binary content lives with the
//! external file-storage collaborator. Upload validation (size cap, allowed
//! extensions per kind) happens at the engine boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DocumentId, UserId};

/// Kind of an uploaded borrower document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NrcFront,
    NrcBack,
    Selfie,
    PaymentProof,
    Other,
}

impl DocumentKind {
    /// File extensions accepted for this document kind.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            DocumentKind::NrcFront | DocumentKind::NrcBack | DocumentKind::Selfie => {
                &["jpg", "jpeg", "png"]
            }
            DocumentKind::PaymentProof | DocumentKind::Other => &["jpg", "jpeg", "png", "pdf"],
        }
    }

    /// The three kinds a borrower must hold, verified, before applying for a
    /// loan.
    pub fn identity_set() -> [DocumentKind; 3] {
        [
            DocumentKind::NrcFront,
            DocumentKind::NrcBack,
            DocumentKind::Selfie,
        ]
    }
}

/// An uploaded document owned by a borrower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerDocument {
    id: DocumentId,
    owner: UserId,
    kind: DocumentKind,
    file_path: String,
    file_size_bytes: u64,
    verified: bool,
    verified_by: Option<UserId>,
    uploaded_at: DateTime<Utc>,
}

impl BorrowerDocument {
    pub fn new(
        id: DocumentId,
        owner: UserId,
        kind: DocumentKind,
        file_path: String,
        file_size_bytes: u64,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            kind,
            file_path,
            file_size_bytes,
            verified: false,
            verified_by: None,
            uploaded_at,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_bytes
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn verified_by(&self) -> Option<UserId> {
        self.verified_by
    }

    pub fn verify(&mut self, by: UserId) {
        self.verified = true;
        self.verified_by = Some(by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_kinds_reject_pdf() {
        assert!(!DocumentKind::Selfie.allowed_extensions().contains(&"pdf"));
        assert!(DocumentKind::PaymentProof.allowed_extensions().contains(&"pdf"));
    }
}
