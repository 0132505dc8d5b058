use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serde wire name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(ClaimStatus {
    Submitted => "Submitted",
    UnderReview => "Under Review",
    Approved => "Approved",
    Denied => "Denied",
    QueryRaised => "Query Raised",
    SentToDoctor => "Sent to Doctor",
    SentToMedicalRecords => "Sent to Medical Records",
    DocumentsRequested => "Documents Requested",
    PartiallyApproved => "Partially Approved",
    AdditionalInfoRequired => "Additional Info Required",
});

str_enum!(DocumentKind {
    Claim => "CLAIM",
    Approval => "APPROVAL",
    Query => "QUERY",
});

str_enum!(ActionKind {
    Approve => "approve",
    Deny => "deny",
    Query => "query",
    SendToDoctor => "sendToDoctor",
    SendToMedicalRecords => "sendToMedicalRecords",
    RequestDocuments => "requestDocuments",
    Delete => "delete",
});

impl ClaimStatus {
    /// Match a free-text status from an insurer document against the known labels.
    ///
    /// Case, underscores and repeated whitespace are ignored. A few insurer
    /// synonyms map onto the closest label. Returns `None` for anything else.
    pub fn from_label_lenient(text: &str) -> Option<Self> {
        let folded = text
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let status = match folded.as_str() {
            "submitted" => Self::Submitted,
            "under review" | "pending" | "in review" => Self::UnderReview,
            "approved" | "accepted" => Self::Approved,
            "denied" | "rejected" | "declined" => Self::Denied,
            "query raised" | "query" | "queried" => Self::QueryRaised,
            "sent to doctor" => Self::SentToDoctor,
            "sent to medical records" | "sent to medical board" | "sent to medical records/board" => {
                Self::SentToMedicalRecords
            }
            "documents requested" => Self::DocumentsRequested,
            "partially approved" | "partial approval" => Self::PartiallyApproved,
            "additional info required" | "additional information required" => {
                Self::AdditionalInfoRequired
            }
            _ => return None,
        };
        Some(status)
    }

    /// True for the three outcomes the item status rules can produce explicitly.
    pub fn is_adjudicated(&self) -> bool {
        matches!(self, Self::Approved | Self::Denied | Self::QueryRaised)
    }
}

impl ActionKind {
    /// Actions that are rejected unless the reviewer supplies a comment.
    pub fn requires_comment(&self) -> bool {
        matches!(
            self,
            Self::Deny
                | Self::Query
                | Self::SendToDoctor
                | Self::SendToMedicalRecords
                | Self::RequestDocuments
        )
    }

    /// Timeline label recorded when the action is applied.
    /// `Delete` leaves no timeline entry.
    pub fn status(&self) -> Option<ClaimStatus> {
        match self {
            Self::Approve => Some(ClaimStatus::Approved),
            Self::Deny => Some(ClaimStatus::Denied),
            Self::Query => Some(ClaimStatus::QueryRaised),
            Self::SendToDoctor => Some(ClaimStatus::SentToDoctor),
            Self::SendToMedicalRecords => Some(ClaimStatus::SentToMedicalRecords),
            Self::RequestDocuments => Some(ClaimStatus::DocumentsRequested),
            Self::Delete => None,
        }
    }
}
