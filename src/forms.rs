use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Catalog;

pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_ISSUE_IMAGES: usize = 5;
pub const MAX_ISSUE_TITLE_CHARS: usize = 100;
pub const MAX_ISSUE_DESCRIPTION_CHARS: usize = 1000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("maximum {limit} images allowed")]
    TooMany { limit: usize },
    #[error("{file_name} is larger than {limit_bytes} bytes")]
    TooLarge { file_name: String, limit_bytes: u64 },
    #[error("{file_name} is not an image")]
    NotAnImage { file_name: String },
}

fn check_attachment(image: &ImageAttachment) -> Result<(), AttachmentError> {
    if !image.content_type.starts_with("image/") {
        return Err(AttachmentError::NotAnImage {
            file_name: image.file_name.clone(),
        });
    }
    if image.size_bytes > MAX_IMAGE_BYTES {
        return Err(AttachmentError::TooLarge {
            file_name: image.file_name.clone(),
            limit_bytes: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum Problem {
    Required,
    TooLong { max: usize },
    UnknownCategory,
    InvalidDate,
    InvalidTime,
    GuidelinesNotAccepted,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    #[serde(flatten)]
    pub problem: Problem,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            Problem::Required => write!(f, "{} is required", self.field),
            Problem::TooLong { max } => {
                write!(f, "{} must be at most {max} characters", self.field)
            }
            Problem::UnknownCategory => write!(f, "{} is not a known category", self.field),
            Problem::InvalidDate => write!(f, "{} is not a valid date", self.field),
            Problem::InvalidTime => write!(f, "{} is not a valid time", self.field),
            Problem::GuidelinesNotAccepted => {
                write!(f, "the reporting guidelines must be accepted")
            }
        }
    }
}

/// Every field problem found in one validation pass.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("invalid form: {}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, problem: Problem) {
        self.errors.push(FieldError { field, problem });
    }

    pub fn has(&self, field: &str, problem: Problem) -> bool {
        self.errors
            .iter()
            .any(|error| error.field == field && error.problem == problem)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn require(errors: &mut ValidationErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, Problem::Required);
        false
    } else {
        true
    }
}

fn check_category(errors: &mut ValidationErrors, catalog: &Catalog, value: &str) {
    if require(errors, "category", value) && !catalog.has_category(value) {
        errors.push("category", Problem::UnknownCategory);
    }
}

fn check_length(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(field, Problem::TooLong { max });
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub category: String,
    /// `YYYY-MM-DD`, as a date input produces it.
    pub event_date: String,
    /// `HH:MM`, as a time input produces it.
    pub start_time: String,
    pub venue_name: String,
    pub address: String,
    pub image: Option<ImageAttachment>,
}

impl EventForm {
    /// Replaces the event image; a rejected image leaves the old one in place.
    pub fn set_image(&mut self, image: ImageAttachment) -> Result<(), AttachmentError> {
        check_attachment(&image)?;
        self.image = Some(image);
        Ok(())
    }

    pub fn clear_image(&mut self) -> Option<ImageAttachment> {
        self.image.take()
    }

    pub fn validate(&self, catalog: &Catalog) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "description", &self.description);
        check_category(&mut errors, catalog, &self.category);
        if require(&mut errors, "eventDate", &self.event_date)
            && NaiveDate::parse_from_str(self.event_date.trim(), "%Y-%m-%d").is_err()
        {
            errors.push("eventDate", Problem::InvalidDate);
        }
        if require(&mut errors, "startTime", &self.start_time)
            && NaiveTime::parse_from_str(self.start_time.trim(), "%H:%M").is_err()
        {
            errors.push("startTime", Problem::InvalidTime);
        }
        require(&mut errors, "venueName", &self.venue_name);
        require(&mut errors, "address", &self.address);
        errors.into_result()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueReportForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub address: String,
    pub is_anonymous: bool,
    pub images: Vec<ImageAttachment>,
    pub guidelines_accepted: bool,
}

/// What survives a draft save: every field except the photos.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct IssueReportDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub address: String,
    pub is_anonymous: bool,
    #[serde(alias = "guidelines")]
    pub guidelines_accepted: bool,
}

impl IssueReportForm {
    /// Adds a batch of photos. The batch is all-or-nothing.
    pub fn attach_images(&mut self, images: Vec<ImageAttachment>) -> Result<(), AttachmentError> {
        if self.images.len() + images.len() > MAX_ISSUE_IMAGES {
            return Err(AttachmentError::TooMany {
                limit: MAX_ISSUE_IMAGES,
            });
        }
        for image in &images {
            check_attachment(image)?;
        }
        self.images.extend(images);
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageAttachment> {
        if index < self.images.len() {
            Some(self.images.remove(index))
        } else {
            None
        }
    }

    pub fn can_attach_more(&self) -> bool {
        self.images.len() < MAX_ISSUE_IMAGES
    }

    pub fn validate(&self, catalog: &Catalog) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if require(&mut errors, "title", &self.title) {
            check_length(&mut errors, "title", &self.title, MAX_ISSUE_TITLE_CHARS);
        }
        check_category(&mut errors, catalog, &self.category);
        if require(&mut errors, "description", &self.description) {
            check_length(
                &mut errors,
                "description",
                &self.description,
                MAX_ISSUE_DESCRIPTION_CHARS,
            );
        }
        require(&mut errors, "location", &self.location);
        require(&mut errors, "address", &self.address);
        if !self.guidelines_accepted {
            errors.push("guidelines", Problem::GuidelinesNotAccepted);
        }
        errors.into_result()
    }

    pub fn to_draft(&self) -> IssueReportDraft {
        IssueReportDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            address: self.address.clone(),
            is_anonymous: self.is_anonymous,
            guidelines_accepted: self.guidelines_accepted,
        }
    }

    /// Restores saved fields; photos already attached are kept.
    pub fn apply_draft(&mut self, draft: IssueReportDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.category = draft.category;
        self.location = draft.location;
        self.address = draft.address;
        self.is_anonymous = draft.is_anonymous;
        self.guidelines_accepted = draft.guidelines_accepted;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
