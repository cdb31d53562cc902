//! # Domain Records
//!
//! Links, submissions and the small closed vocabularies around them
//! (slots, document types, review status, resource category).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{LinkId, SubmissionId, Token};

/// Default page size for link listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

/// One of the three document positions in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Government-issued identity document.
    Id,
    /// Photograph of the recipient.
    Selfie,
    /// Proof of residential address.
    Address,
}

impl Slot {
    /// Processing order of the pipeline.
    pub const ALL: [Slot; 3] = [Slot::Id, Slot::Selfie, Slot::Address];

    /// Name used in storage folders and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Selfie => "selfie",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage classification of an uploaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    /// Any `image/*` media. Delivered by its plain secure URL.
    Image,
    /// PDF. Stored as a raw resource and delivered by a signed inline URL.
    Document,
}

impl ResourceCategory {
    /// Name persisted next to each URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
        }
    }

    /// Resource type segment used by the object storage API.
    pub fn storage_resource_type(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "raw",
        }
    }
}

impl FromStr for ResourceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "document" | "raw" => Ok(Self::Document),
            other => Err(format!("unknown resource category: {other}")),
        }
    }
}

macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $err:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every accepted value.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire and database label.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok(Self::$variant),)+
                    other => Err(ValidationError::$err(other.to_string())),
                }
            }
        }
    };
}

label_enum!(
    /// Kind of identity document in the ID slot.
    IdType, UnknownIdType {
        /// Passport.
        Passport => "passport",
        /// Driving licence.
        DrivingLicense => "driving_license",
        /// National identity card.
        NationalId => "national_id",
        /// Residence permit.
        ResidencePermit => "residence_permit",
    }
);

label_enum!(
    /// Kind of document in the address slot.
    AddressProofType, UnknownAddressProofType {
        /// Utility bill.
        UtilityBill => "utility_bill",
        /// Bank statement.
        BankStatement => "bank_statement",
        /// Rental agreement.
        RentalAgreement => "rental_agreement",
        /// Letter from a government body.
        GovernmentLetter => "government_letter",
    }
);

label_enum!(
    /// Review state of a submission.
    SubmissionStatus, UnknownStatus {
        /// Awaiting review. Every submission starts here.
        Submitted => "submitted",
        /// Accepted by a reviewer.
        Approved => "approved",
        /// Declined by a reviewer.
        Rejected => "rejected",
    }
);

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// A tokenized document request addressed to one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link identifier.
    pub id: LinkId,
    /// Recipient first name.
    pub name: String,
    /// Recipient last name.
    pub surname: String,
    /// Recipient email, if known.
    pub email: Option<String>,
    /// Recipient phone, if known.
    pub phone: Option<String>,
    /// Capability token embedded in the verification URL.
    pub token: Token,
    /// Public verification URL handed to the recipient.
    pub link: String,
    /// Whether the recipient is asked for an ID document.
    pub require_id: bool,
    /// Whether the recipient is asked for a selfie.
    pub require_selfie: bool,
    /// Whether the recipient is asked for a proof of address.
    pub require_address_proof: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    /// Recipient first name.
    #[serde(default)]
    pub name: String,
    /// Recipient last name.
    #[serde(default)]
    pub surname: String,
    /// Recipient email.
    #[serde(default)]
    pub email: Option<String>,
    /// Recipient phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Ask for an ID document.
    #[serde(default)]
    pub require_id: bool,
    /// Ask for a selfie.
    #[serde(default)]
    pub require_selfie: bool,
    /// Ask for a proof of address.
    #[serde(default)]
    pub require_address_proof: bool,
}

impl NewLink {
    /// Trim the input, issue a token and build the link record.
    ///
    /// Name and surname must be non-blank. Blank optional fields become `None`.
    pub fn into_link(self, verify_base_url: &str) -> Result<Link, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        let surname = self.surname.trim().to_string();
        if surname.is_empty() {
            return Err(ValidationError::MissingField("surname"));
        }
        let token = Token::generate();
        let link = format!("{}/verify/{}", verify_base_url.trim_end_matches('/'), token);
        Ok(Link {
            id: LinkId::new(),
            name,
            surname,
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            token,
            link,
            require_id: self.require_id,
            require_selfie: self.require_selfie,
            require_address_proof: self.require_address_proof,
            created_at: Utc::now(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Listing parameters for the admin link table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkQuery {
    /// Case-insensitive substring matched against name, surname, email and phone.
    pub search: Option<String>,
    /// One-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
}

impl LinkQuery {
    /// Build a query, clamping page to at least 1 and per_page to `1..=100`
    /// (default 20). A blank search is treated as no search.
    pub fn new(search: Option<String>, page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            search: non_blank(search),
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Whether a link matches the search term.
    pub fn matches(&self, link: &Link) -> bool {
        let Some(term) = &self.search else {
            return true;
        };
        let term = term.to_lowercase();
        [
            Some(link.name.as_str()),
            Some(link.surname.as_str()),
            link.email.as_deref(),
            link.phone.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&term))
    }
}

/// A link with its submission, if one has been made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkWithSubmission {
    /// The link.
    #[serde(flatten)]
    pub link: Link,
    /// Its submission.
    pub submission: Option<Submission>,
}

/// One page of a link listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPage {
    /// Rows on this page, newest first.
    pub items: Vec<LinkWithSubmission>,
    /// Rows matching the search across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// The documents a recipient submitted for one link.
///
/// Each URL is stored alongside the resource category it was uploaded as, so
/// a reviewer UI never has to guess from the URL shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Submission identifier.
    pub id: SubmissionId,
    /// Link this submission answers.
    pub document_link_id: LinkId,
    /// Token of that link. Unique across submissions.
    pub token: Token,
    /// ID document type, when an ID was submitted.
    pub id_type: Option<IdType>,
    /// Reviewer URL of the ID document.
    pub id_picture_url: Option<String>,
    /// Category of the ID document upload.
    pub id_picture_category: Option<ResourceCategory>,
    /// Reviewer URL of the selfie.
    pub selfie_url: Option<String>,
    /// Category of the selfie upload. Always `image` when present.
    pub selfie_category: Option<ResourceCategory>,
    /// Address proof type, when one was submitted.
    pub address_proof_type: Option<AddressProofType>,
    /// Reviewer URL of the address proof.
    pub address_proof_picture_url: Option<String>,
    /// Category of the address proof upload.
    pub address_proof_picture_category: Option<ResourceCategory>,
    /// Commit time.
    pub submitted_at: DateTime<Utc>,
    /// Review state.
    pub status: SubmissionStatus,
}

impl Submission {
    /// Number of document slots filled.
    pub fn slot_count(&self) -> usize {
        [
            &self.id_picture_url,
            &self.selfie_url,
            &self.address_proof_picture_url,
        ]
        .into_iter()
        .filter(|url| url.is_some())
        .count()
    }
}
