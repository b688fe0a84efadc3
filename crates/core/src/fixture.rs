//! Baseline seed data shape.
//!
//! A fixture is a JSON document with an `organization`, its `users` and its
//! `aircraft`. Keys are camelCase to match the rest of the JSON surface.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::maintenance::{
    validate_aircraft, validate_organization, validate_user, Aircraft, Organization, User,
    UserRole, UserStatus, ValidationError,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixtureError {
    #[error("Fixture is not valid JSON: {0}")]
    Parse(String),
    #[error("Invalid fixture record: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Duplicate user email in fixture: {0}")]
    DuplicateEmail(String),
    #[error("Duplicate aircraft tail number in fixture: {0}")]
    DuplicateTailNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFixture {
    pub organization: OrganizationFixture,
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub aircraft: Vec<AircraftFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationFixture {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFixture {
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftFixture {
    pub tail_number: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl SeedFixture {
    /// Parses a fixture document. Consistency is checked by [`validate_fixture`].
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(json).map_err(|e| FixtureError::Parse(e.to_string()))
    }
}

impl OrganizationFixture {
    pub fn to_organization(&self) -> Organization {
        let org = Organization::new(&self.name, &self.slug);
        match &self.timezone {
            Some(tz) => org.with_timezone(tz),
            None => org,
        }
    }
}

impl UserFixture {
    pub fn to_user(&self, org_id: Uuid) -> User {
        User::new(org_id, &self.email, &self.display_name, self.role)
            .with_status(self.status.unwrap_or(UserStatus::Active))
    }
}

impl AircraftFixture {
    pub fn to_aircraft(&self, org_id: Uuid) -> Aircraft {
        Aircraft {
            id: Uuid::new_v4(),
            org_id,
            tail_number: self.tail_number.clone(),
            make: self.make.clone(),
            model: self.model.clone(),
            serial_number: self.serial_number.clone(),
            year: self.year,
        }
    }
}

/// Validates every record in the fixture and rejects duplicates that the
/// database unique constraints would otherwise silently collapse on upsert.
pub fn validate_fixture(fixture: &SeedFixture) -> Result<(), FixtureError> {
    let org = fixture.organization.to_organization();
    validate_organization(&org)?;

    let mut emails = HashSet::new();
    for user in &fixture.users {
        validate_user(&user.to_user(org.id))?;
        if !emails.insert(user.email.as_str()) {
            return Err(FixtureError::DuplicateEmail(user.email.clone()));
        }
    }

    let mut tails = HashSet::new();
    for aircraft in &fixture.aircraft {
        validate_aircraft(&aircraft.to_aircraft(org.id))?;
        if !tails.insert(aircraft.tail_number.as_str()) {
            return Err(FixtureError::DuplicateTailNumber(
                aircraft.tail_number.clone(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "organization": { "name": "Demo Flying Club", "slug": "demo-flying-club", "timezone": "America/Denver" },
        "users": [
            { "email": "owner@demo.aero", "displayName": "Demo Owner", "role": "OWNER" },
            { "email": "ia@demo.aero", "displayName": "Demo IA", "role": "MECHANIC", "status": "INVITED" }
        ],
        "aircraft": [
            { "tailNumber": "N172DM", "make": "Cessna", "model": "172S", "year": 2006 }
        ]
    }"#;

    #[test]
    fn test_parse_fixture() {
        let fixture = SeedFixture::from_json(FIXTURE).unwrap();

        assert_eq!(fixture.organization.slug, "demo-flying-club");
        assert_eq!(fixture.users.len(), 2);
        assert_eq!(fixture.users[1].status, Some(UserStatus::Invited));
        assert_eq!(fixture.aircraft[0].year, Some(2006));
    }

    #[test]
    fn test_defaults_applied_when_converting() {
        let fixture = SeedFixture::from_json(FIXTURE).unwrap();
        let org_id = Uuid::new_v4();

        let owner = fixture.users[0].to_user(org_id);
        assert_eq!(owner.org_id, org_id);
        assert_eq!(owner.status, UserStatus::Active);

        let org = OrganizationFixture {
            name: "No TZ".to_string(),
            slug: "no-tz".to_string(),
            timezone: None,
        }
        .to_organization();
        assert_eq!(org.timezone, "UTC");
    }

    #[test]
    fn test_duplicate_tail_numbers_rejected() {
        let mut fixture = SeedFixture::from_json(FIXTURE).unwrap();
        fixture.aircraft.push(fixture.aircraft[0].clone());

        assert_eq!(
            validate_fixture(&fixture),
            Err(FixtureError::DuplicateTailNumber("N172DM".to_string()))
        );
    }

    #[test]
    fn test_duplicate_emails_rejected() {
        let mut fixture = SeedFixture::from_json(FIXTURE).unwrap();
        fixture.users.push(fixture.users[0].clone());

        assert_eq!(
            validate_fixture(&fixture),
            Err(FixtureError::DuplicateEmail("owner@demo.aero".to_string()))
        );
    }

    #[test]
    fn test_parsing_does_not_validate() {
        let json = FIXTURE.replace("demo-flying-club", "Demo Flying Club");
        let fixture = SeedFixture::from_json(&json).unwrap();

        assert!(matches!(
            validate_fixture(&fixture),
            Err(FixtureError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = SeedFixture::from_json("{ not json").unwrap_err();
        assert!(matches!(err, FixtureError::Parse(_)));
    }
}
