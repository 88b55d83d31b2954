//! Form intake: raw multipart fields in, a validated [PortfolioCandidate] out.
//!
//! Nothing in here touches the filesystem or the database, so a candidate only
//! exists once every field has passed.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidateEmail;

use crate::error::PortfolioError;

pub const NAME_MAX_CHARS: usize = 50;
pub const BIO_MAX_CHARS: usize = 500;
pub const SKILLS_MAX_CHARS: usize = 250;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern is a valid regex"));

/// An uploaded file as it came off the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Untyped form fields. Everything is optional here, [PortfolioForm::validate] decides.
#[derive(Clone, Debug, Default)]
pub struct PortfolioForm {
    pub fname: Option<String>,
    pub lname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub profile_picture: Option<Upload>,
}

/// A fully validated submission, ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortfolioCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub skills: String,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub profile_picture: Upload,
}

/// Multipart body accepted by `POST /submit-portfolio/`, for the API docs.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct PortfolioSubmission {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub skills: String,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    #[schema(value_type = String, format = Binary)]
    pub profile_picture: Vec<u8>,
    pub csrf_token: String,
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn required(field: &str, value: Option<String>, errors: &mut Vec<String>) -> String {
    match value {
        Some(value) => value,
        None => {
            errors.push(format!("{field}: field required"));
            String::new()
        }
    }
}

fn name(field: &str, value: Option<String>, errors: &mut Vec<String>) -> String {
    // a missing field is reported once, not again by the shape check
    let count = errors.len();
    let value = required(field, value, errors);
    let len = char_len(&value);
    if errors.len() == count && (len == 0 || len > NAME_MAX_CHARS) {
        errors.push(format!(
            "{field}: must be between 1 and {NAME_MAX_CHARS} characters"
        ));
    }
    value
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

impl PortfolioForm {
    /// Check every field and build a candidate, or report every field that failed.
    pub fn validate(self) -> Result<PortfolioCandidate, PortfolioError> {
        let mut errors = Vec::new();

        let first_name = name("fname", self.fname, &mut errors);
        let last_name = name("lname", self.lname, &mut errors);

        let count = errors.len();
        let email = required("email", self.email, &mut errors);
        if errors.len() == count && !is_valid_email(&email) {
            errors.push("email: value is not a valid email address".to_string());
        }

        let count = errors.len();
        let phone = required("phone", self.phone, &mut errors);
        if errors.len() == count && !is_valid_phone(&phone) {
            errors.push(
                "phone: must be 9 to 15 digits, optionally prefixed with + and/or 1".to_string(),
            );
        }

        let bio = required("bio", self.bio, &mut errors);
        if char_len(&bio) > BIO_MAX_CHARS {
            errors.push(format!("bio: must be at most {BIO_MAX_CHARS} characters"));
        }

        let skills = required("skills", self.skills, &mut errors);
        if char_len(&skills) > SKILLS_MAX_CHARS {
            errors.push(format!(
                "skills: must be at most {SKILLS_MAX_CHARS} characters"
            ));
        }

        let profile_picture = match self.profile_picture {
            Some(upload) if !upload.filename.trim().is_empty() => Some(upload),
            _ => {
                errors.push("profile_picture: an image file is required".to_string());
                None
            }
        };

        match profile_picture {
            Some(profile_picture) if errors.is_empty() => Ok(PortfolioCandidate {
                first_name,
                last_name,
                email,
                phone,
                bio,
                skills,
                linkedin: optional(self.linkedin),
                github: optional(self.github),
                profile_picture,
            }),
            _ => Err(PortfolioError::Validation(errors)),
        }
    }
}
