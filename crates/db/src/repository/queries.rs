//! SQL statements used by the PostgreSQL repository.
//!
//! Enum parameters are bound as text and cast to their column type; enum
//! columns are read back as text. Pure data, no I/O.

// ============================================================================
// Organizations and users
// ============================================================================

pub const SELECT_ORGANIZATION_BY_ID: &str =
    "SELECT id, name, slug, timezone FROM organizations WHERE id = $1";

pub const SELECT_ORGANIZATION_BY_SLUG: &str =
    "SELECT id, name, slug, timezone FROM organizations WHERE slug = $1";

pub const INSERT_ORGANIZATION: &str =
    "INSERT INTO organizations (id, name, slug, timezone) VALUES ($1, $2, $3, $4)";

pub const SELECT_USER_BY_ID: &str = r#"
SELECT id, org_id, email, display_name, role::text AS role, status::text AS status
FROM users WHERE id = $1
"#;

pub const SELECT_USER_BY_EMAIL: &str = r#"
SELECT id, org_id, email, display_name, role::text AS role, status::text AS status
FROM users WHERE org_id = $1 AND email = $2
"#;

pub const INSERT_USER: &str = r#"
INSERT INTO users (id, org_id, email, display_name, role, status)
VALUES ($1, $2, $3, $4, $5::user_role, $6::user_status)
"#;

// ============================================================================
// Fleet
// ============================================================================

pub const SELECT_AIRCRAFT_BY_ID: &str = r#"
SELECT id, org_id, tail_number, make, model, serial_number, year
FROM aircraft WHERE id = $1
"#;

pub const SELECT_AIRCRAFT_BY_TAIL_NUMBER: &str = r#"
SELECT id, org_id, tail_number, make, model, serial_number, year
FROM aircraft WHERE org_id = $1 AND tail_number = $2
"#;

pub const INSERT_AIRCRAFT: &str = r#"
INSERT INTO aircraft (id, org_id, tail_number, make, model, serial_number, year)
VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

pub const SELECT_COMPONENT_BY_ID: &str = r#"
SELECT id, org_id, aircraft_id, name, type::text AS type, serial_number, manufacturer, model
FROM components WHERE id = $1
"#;

pub const INSERT_COMPONENT: &str = r#"
INSERT INTO components (id, org_id, aircraft_id, name, type, serial_number, manufacturer, model)
VALUES ($1, $2, $3, $4, $5::component_type, $6, $7, $8)
"#;

// ============================================================================
// Maintenance
// ============================================================================

pub const SELECT_SIGNATORY_BY_ID: &str = r#"
SELECT id, org_id, full_name, credential_type::text AS credential_type, certificate_id, email
FROM signatories WHERE id = $1
"#;

pub const INSERT_SIGNATORY: &str = r#"
INSERT INTO signatories (id, org_id, full_name, credential_type, certificate_id, email)
VALUES ($1, $2, $3, $4::credential_type, $5, $6)
"#;

pub const SELECT_DIRECTIVE_BY_ID: &str = r#"
SELECT id, org_id, directive_type::text AS directive_type, reference_code, title, applicability
FROM directives WHERE id = $1
"#;

pub const INSERT_DIRECTIVE: &str = r#"
INSERT INTO directives (id, org_id, directive_type, reference_code, title, applicability)
VALUES ($1, $2, $3::directive_type, $4, $5, $6)
"#;

pub const SELECT_MAINTENANCE_EVENT_BY_ID: &str = r#"
SELECT id, org_id, aircraft_id, component_id, signatory_id,
       event_type::text AS event_type, origin::text AS origin,
       performed_at, description, corrective_action, tach_hours, hobbs_hours
FROM maintenance_events WHERE id = $1
"#;

pub const INSERT_MAINTENANCE_EVENT: &str = r#"
INSERT INTO maintenance_events (
    id, org_id, aircraft_id, component_id, signatory_id, event_type, origin,
    performed_at, description, corrective_action, tach_hours, hobbs_hours
)
VALUES (
    $1, $2, $3, $4, $5, $6::maintenance_event_type, $7::event_origin,
    $8, $9, $10, $11, $12
)
"#;

/// The link inherits the event's organization; the composite foreign key to
/// `directives` rejects a directive from another organization.
pub const INSERT_EVENT_DIRECTIVE: &str = r#"
INSERT INTO maintenance_event_directives (org_id, event_id, directive_id, compliance_status, notes)
SELECT e.org_id, e.id, $2, $3::compliance_status, $4
FROM maintenance_events e WHERE e.id = $1
"#;

pub const SELECT_EVENT_DIRECTIVES: &str = r#"
SELECT event_id, directive_id, compliance_status::text AS compliance_status, notes
FROM maintenance_event_directives
WHERE event_id = $1
ORDER BY created_at, directive_id
"#;

// ============================================================================
// Compliance
// ============================================================================

pub const INSERT_COMPLIANCE_SNAPSHOT: &str = r#"
INSERT INTO compliance_snapshots (id, org_id, aircraft_id, as_of, summary)
VALUES ($1, $2, $3, $4, $5)
"#;

pub const SELECT_LATEST_COMPLIANCE_SNAPSHOT: &str = r#"
SELECT id, org_id, aircraft_id, as_of, summary
FROM compliance_snapshots
WHERE aircraft_id = $1
ORDER BY as_of DESC, created_at DESC
LIMIT 1
"#;

pub const INSERT_DUE_ITEM: &str = r#"
INSERT INTO due_items (
    id, org_id, aircraft_id, component_id, directive_id, event_type, title, due_at, due_hours, status
)
VALUES ($1, $2, $3, $4, $5, $6::maintenance_event_type, $7, $8, $9, $10::due_item_status)
"#;

pub const SELECT_OPEN_DUE_ITEMS: &str = r#"
SELECT id, org_id, aircraft_id, component_id, directive_id, event_type::text AS event_type,
       title, due_at, due_hours, status::text AS status
FROM due_items
WHERE aircraft_id = $1 AND status = 'OPEN' AND due_at <= $2
ORDER BY due_at, title
"#;

// ============================================================================
// Embeddings
// ============================================================================

pub const INSERT_EMBEDDING: &str = r#"
INSERT INTO embeddings (
    id, org_id, scope, target_event_id, target_compliance_snapshot_id, dimensions, vector, model
)
VALUES ($1, $2, $3::embedding_scope, $4, $5, $6, $7, $8)
"#;

pub const SELECT_EMBEDDINGS_BY_ORG: &str = r#"
SELECT id, org_id, scope::text AS scope, target_event_id, target_compliance_snapshot_id,
       dimensions, vector, model
FROM embeddings
WHERE org_id = $1
ORDER BY created_at, id
"#;

// ============================================================================
// Audit logs
// ============================================================================

pub const INSERT_AUDIT_LOG: &str = r#"
INSERT INTO audit_logs (
    id, org_id, actor_id, actor_type, entity_type, entity_id, action, summary, before, after, created_at
)
VALUES ($1, $2, $3, $4::actor_type, $5::audit_entity_type, $6, $7::audit_action, $8, $9, $10, $11)
"#;

pub const SELECT_AUDIT_LOG_BY_ID: &str = r#"
SELECT id, org_id, actor_id, actor_type::text AS actor_type, entity_type::text AS entity_type,
       entity_id, action::text AS action, summary, before, after, created_at
FROM audit_logs WHERE id = $1
"#;

pub const SELECT_AUDIT_LOGS_FOR_ENTITY: &str = r#"
SELECT id, org_id, actor_id, actor_type::text AS actor_type, entity_type::text AS entity_type,
       entity_id, action::text AS action, summary, before, after, created_at
FROM audit_logs
WHERE entity_type = $1::audit_entity_type AND entity_id = $2
ORDER BY created_at, id
"#;
