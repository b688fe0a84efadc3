//! Enumerations stored as PostgreSQL enum types.
//!
//! Every variant serializes to the SCREAMING_SNAKE_CASE label used by the
//! database enum, so the same string travels through JSON fixtures, SQL
//! parameters and audit snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::UnknownVariant;

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $type_name:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Name of the PostgreSQL enum type backing this column.
            pub const TYPE_NAME: &'static str = $type_name;

            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the database label for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        type_name: $type_name,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

labeled_enum! {
    /// Role a user holds inside their organization.
    UserRole => "user_role" {
        Owner => "OWNER",
        Admin => "ADMIN",
        Mechanic => "MECHANIC",
        Inspector => "INSPECTOR",
        Pilot => "PILOT",
        Viewer => "VIEWER",
    }
}

labeled_enum! {
    /// Account status of a user.
    UserStatus => "user_status" {
        Invited => "INVITED",
        Active => "ACTIVE",
        Suspended => "SUSPENDED",
        Disabled => "DISABLED",
    }
}

labeled_enum! {
    ComponentType => "component_type" {
        Airframe => "AIRFRAME",
        Engine => "ENGINE",
        Propeller => "PROPELLER",
        Avionics => "AVIONICS",
        Appliance => "APPLIANCE",
        Other => "OTHER",
    }
}

labeled_enum! {
    /// Certificate held by the person attesting a maintenance event.
    CredentialType => "credential_type" {
        /// Airframe & Powerplant mechanic.
        Ap => "AP",
        /// Inspection Authorization.
        Ia => "IA",
        RepairStation => "REPAIR_STATION",
        OwnerOperator => "OWNER_OPERATOR",
        Other => "OTHER",
    }
}

labeled_enum! {
    DirectiveType => "directive_type" {
        AirworthinessDirective => "AIRWORTHINESS_DIRECTIVE",
        ServiceBulletin => "SERVICE_BULLETIN",
        ServiceLetter => "SERVICE_LETTER",
        InspectionProgram => "INSPECTION_PROGRAM",
    }
}

labeled_enum! {
    /// Kind of work recorded by a maintenance event or expected by a due item.
    MaintenanceEventType => "maintenance_event_type" {
        Inspection => "INSPECTION",
        Repair => "REPAIR",
        Alteration => "ALTERATION",
        AdCompliance => "AD_COMPLIANCE",
        ServiceBulletin => "SERVICE_BULLETIN",
        ComponentChange => "COMPONENT_CHANGE",
        Other => "OTHER",
    }
}

labeled_enum! {
    /// How a maintenance event entered the system.
    EventOrigin => "event_origin" {
        Manual => "MANUAL",
        DocumentIngestion => "DOCUMENT_INGESTION",
        Import => "IMPORT",
    }
}

labeled_enum! {
    ComplianceStatus => "compliance_status" {
        Complied => "COMPLIED",
        Recurring => "RECURRING",
        NotApplicable => "NOT_APPLICABLE",
        Pending => "PENDING",
        Overdue => "OVERDUE",
    }
}

labeled_enum! {
    /// Which kind of record an embedding vector represents.
    EmbeddingScope => "embedding_scope" {
        MaintenanceEvent => "MAINTENANCE_EVENT",
        ComplianceSnapshot => "COMPLIANCE_SNAPSHOT",
    }
}

labeled_enum! {
    DueItemStatus => "due_item_status" {
        Open => "OPEN",
        Completed => "COMPLETED",
        Deferred => "DEFERRED",
    }
}

labeled_enum! {
    ActorType => "actor_type" {
        User => "USER",
        System => "SYSTEM",
        Service => "SERVICE",
    }
}

labeled_enum! {
    /// Entity kinds that can appear in the audit log.
    AuditEntityType => "audit_entity_type" {
        Organization => "ORGANIZATION",
        User => "USER",
        Aircraft => "AIRCRAFT",
        Component => "COMPONENT",
        Signatory => "SIGNATORY",
        Directive => "DIRECTIVE",
        MaintenanceEvent => "MAINTENANCE_EVENT",
        ComplianceSnapshot => "COMPLIANCE_SNAPSHOT",
        DueItem => "DUE_ITEM",
        Embedding => "EMBEDDING",
    }
}

labeled_enum! {
    AuditAction => "audit_action" {
        Created => "CREATED",
        Updated => "UPDATED",
        Deleted => "DELETED",
        Signed => "SIGNED",
        Exported => "EXPORTED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        for kind in MaintenanceEventType::ALL {
            assert_eq!(kind.to_string().parse::<MaintenanceEventType>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_unknown_label_names_the_type() {
        let err = "CAPTAIN".parse::<UserRole>().unwrap_err();
        assert_eq!(err.type_name, "user_role");
        assert_eq!(err.to_string(), "Unknown user_role value: CAPTAIN");
    }

    #[test]
    fn test_serde_uses_database_labels() {
        let json = serde_json::to_string(&DirectiveType::AirworthinessDirective).unwrap();
        assert_eq!(json, "\"AIRWORTHINESS_DIRECTIVE\"");

        let parsed: CredentialType = serde_json::from_str("\"IA\"").unwrap();
        assert_eq!(parsed, CredentialType::Ia);
    }
}
