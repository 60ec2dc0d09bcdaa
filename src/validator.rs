//! Field and attachment checks for contact submissions.
//!
//! Checks run in a fixed order and stop at the first failure: required
//! fields, then attachment count, then each attachment's size.

use crate::error::ValidationError;
use crate::models::{Attachment, Submission};

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: u64 = 1024 * 1024;

/// A submission that passed validation. Required fields are guaranteed non-empty.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub contact_type: Option<String>,
    pub attachments: Vec<Attachment>,
}

pub fn validate(submission: Submission) -> Result<ValidSubmission, ValidationError> {
    let (Some(name), Some(email), Some(message)) = (
        present(submission.name),
        present(submission.email),
        present(submission.message),
    ) else {
        return Err(ValidationError::MissingField);
    };

    if submission.attachments.len() > MAX_ATTACHMENTS {
        return Err(ValidationError::TooManyAttachments);
    }

    if submission
        .attachments
        .iter()
        .any(|a| a.size > MAX_ATTACHMENT_BYTES)
    {
        return Err(ValidationError::AttachmentTooLarge);
    }

    Ok(ValidSubmission {
        name,
        email,
        subject: submission.subject.unwrap_or_default(),
        message,
        contact_type: present(submission.contact_type),
        attachments: submission.attachments,
    })
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}
