//! Pure validation of records before they are written.
//!
//! The database enforces the same invariants through constraints; these
//! checks exist so callers get a typed error without a round trip.

use chrono::Datelike;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::ValidationError;
use super::types::{
    Aircraft, Component, DueItem, Embedding, MaintenanceEvent, Organization, User,
};

/// Earliest manufacture year accepted for an aircraft.
const FIRST_POWERED_FLIGHT_YEAR: i32 = 1903;

/// Hours columns are `NUMERIC(10,1)`.
const HOURS_SCALE: u32 = 1;

/// Largest value a `NUMERIC(10,1)` column holds.
const MAX_HOURS: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 1);

/// Validates an organization before creation.
pub fn validate_organization(org: &Organization) -> Result<(), ValidationError> {
    require("name", &org.name)?;
    require("timezone", &org.timezone)?;
    if !is_valid_slug(&org.slug) {
        return Err(ValidationError::InvalidSlug(org.slug.clone()));
    }
    Ok(())
}

/// Validates a user before creation.
pub fn validate_user(user: &User) -> Result<(), ValidationError> {
    require("display_name", &user.display_name)?;
    if !is_plausible_email(&user.email) {
        return Err(ValidationError::InvalidEmail(user.email.clone()));
    }
    Ok(())
}

/// Validates an aircraft before creation.
pub fn validate_aircraft(aircraft: &Aircraft) -> Result<(), ValidationError> {
    require("tail_number", &aircraft.tail_number)?;
    if let Some(year) = aircraft.year {
        let next_year = chrono::Utc::now().year() + 1;
        if !(FIRST_POWERED_FLIGHT_YEAR..=next_year).contains(&year) {
            return Err(ValidationError::InvalidYear(year));
        }
    }
    Ok(())
}

/// Validates a component against the aircraft it is installed on.
pub fn validate_component(component: &Component, aircraft: &Aircraft) -> Result<(), ValidationError> {
    require("name", &component.name)?;
    ensure_same_org("Component", aircraft.org_id, component.org_id)
}

/// Validates a maintenance event against its aircraft.
pub fn validate_maintenance_event(
    event: &MaintenanceEvent,
    aircraft: &Aircraft,
) -> Result<(), ValidationError> {
    require("description", &event.description)?;
    ensure_same_org("MaintenanceEvent", aircraft.org_id, event.org_id)?;
    ensure_hours("tach_hours", event.tach_hours)?;
    ensure_hours("hobbs_hours", event.hobbs_hours)?;
    Ok(())
}

/// Validates a due item against its aircraft.
pub fn validate_due_item(item: &DueItem, aircraft: &Aircraft) -> Result<(), ValidationError> {
    require("title", &item.title)?;
    ensure_same_org("DueItem", aircraft.org_id, item.org_id)?;
    ensure_hours("due_hours", item.due_hours)
}

/// Validates an embedding's target and vector shape.
pub fn validate_embedding(embedding: &Embedding) -> Result<(), ValidationError> {
    let actual = embedding.vector.len();
    if usize::try_from(embedding.dimensions).ok() != Some(actual) {
        return Err(ValidationError::EmbeddingDimensions {
            declared: embedding.dimensions,
            actual,
        });
    }
    if embedding.vector.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::EmbeddingNotFinite);
    }
    Ok(())
}

/// Checks that a child record is scoped to its parent's organization.
pub fn ensure_same_org(
    entity: &'static str,
    parent_org: Uuid,
    child_org: Uuid,
) -> Result<(), ValidationError> {
    if parent_org != child_org {
        return Err(ValidationError::OrganizationMismatch {
            entity,
            parent_org,
            child_org,
        });
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

/// Hours must fit their column exactly: non-negative, one decimal place, in range.
fn ensure_hours(field: &'static str, hours: Option<Decimal>) -> Result<(), ValidationError> {
    let Some(value) = hours else {
        return Ok(());
    };
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeHours { field });
    }
    if value.normalize().scale() > HOURS_SCALE {
        return Err(ValidationError::HoursPrecision { field, value });
    }
    if value > MAX_HOURS {
        return Err(ValidationError::HoursOutOfRange { field, value });
    }
    Ok(())
}

/// Slugs are lowercase ASCII words separated by single hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
