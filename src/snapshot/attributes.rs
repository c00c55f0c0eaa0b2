//! Attribute tables
//!
//! Which attributes of each object kind take part in the comparison, and
//! how. The diff engine walks these tables instead of branching per kind.

use super::normalize::{normalize, BodyKind};
use crate::introspection::{Column, Constraint, Event, Routine, Trigger, View};
use std::borrow::Cow;
use tracing::warn;

/// How an attribute participates in the comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeRole {
    /// Raw values must match
    Compared,
    /// Never marks the object different
    Ignored,
    /// Values are compared after body normalization
    Body(BodyKind),
}

/// One comparable attribute of an object kind
pub struct Attribute<T> {
    /// Catalog name, used in logs
    pub name: &'static str,
    pub read: for<'a> fn(&'a T) -> Option<Cow<'a, str>>,
    pub role: AttributeRole,
}

fn text(value: &str) -> Option<Cow<'_, str>> {
    Some(Cow::Borrowed(value))
}

fn optional(value: &Option<String>) -> Option<Cow<'_, str>> {
    value.as_deref().map(Cow::Borrowed)
}

fn list(values: &[String]) -> Option<Cow<'_, str>> {
    if values.is_empty() {
        None
    } else {
        Some(Cow::Owned(values.join(",")))
    }
}

pub static COLUMN_ATTRIBUTES: &[Attribute<Column>] = &[
    Attribute { name: "Type", read: |c| text(&c.column_type), role: AttributeRole::Compared },
    Attribute {
        name: "Null",
        read: |c| text(if c.nullable { "YES" } else { "NO" }),
        role: AttributeRole::Compared,
    },
    // key membership is covered by the constraint diff
    Attribute { name: "Key", read: |c| text(&c.key), role: AttributeRole::Ignored },
    Attribute { name: "Default", read: |c| optional(&c.default_value), role: AttributeRole::Compared },
    Attribute { name: "Extra", read: |c| optional(&c.extra), role: AttributeRole::Compared },
];

pub static CONSTRAINT_ATTRIBUTES: &[Attribute<Constraint>] = &[
    Attribute { name: "CONSTRAINT_NAME", read: |c| text(&c.name), role: AttributeRole::Compared },
    Attribute { name: "TABLE_NAME", read: |c| text(&c.table), role: AttributeRole::Compared },
    Attribute {
        name: "CONSTRAINT_TYPE",
        read: |c| text(c.constraint_type.as_str()),
        role: AttributeRole::Compared,
    },
    Attribute { name: "COLUMN_NAME", read: |c| list(&c.columns), role: AttributeRole::Compared },
    Attribute {
        name: "REFERENCED_TABLE_NAME",
        read: |c| optional(&c.referenced_table),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "REFERENCED_COLUMN_NAME",
        read: |c| list(&c.referenced_columns),
        role: AttributeRole::Compared,
    },
    Attribute { name: "UPDATE_RULE", read: |c| optional(&c.update_rule), role: AttributeRole::Compared },
    Attribute { name: "DELETE_RULE", read: |c| optional(&c.delete_rule), role: AttributeRole::Compared },
    Attribute { name: "CHECK_CLAUSE", read: |c| optional(&c.check_clause), role: AttributeRole::Compared },
    Attribute { name: "INDEX_TYPE", read: |c| optional(&c.index_type), role: AttributeRole::Compared },
    Attribute {
        name: "COLUMN_DEFAULT",
        read: |c| optional(&c.column_default),
        role: AttributeRole::Compared,
    },
];

pub static TRIGGER_ATTRIBUTES: &[Attribute<Trigger>] = &[
    Attribute { name: "Trigger", read: |t| text(&t.name), role: AttributeRole::Compared },
    Attribute { name: "Event", read: |t| text(&t.event), role: AttributeRole::Compared },
    Attribute { name: "Table", read: |t| text(&t.table), role: AttributeRole::Compared },
    Attribute {
        name: "Statement",
        read: |t| text(&t.statement),
        role: AttributeRole::Body(BodyKind::Trigger),
    },
    Attribute { name: "Timing", read: |t| text(&t.timing), role: AttributeRole::Compared },
    Attribute { name: "sql_mode", read: |t| optional(&t.sql_mode), role: AttributeRole::Compared },
    Attribute { name: "Definer", read: |t| optional(&t.definer), role: AttributeRole::Compared },
    Attribute {
        name: "character_set_client",
        read: |t| optional(&t.character_set_client),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "collation_connection",
        read: |t| optional(&t.collation_connection),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "Database Collation",
        read: |t| optional(&t.database_collation),
        role: AttributeRole::Compared,
    },
];

/// Shared by procedures and functions; the body is the `SHOW CREATE` text
pub static ROUTINE_ATTRIBUTES: &[Attribute<Routine>] = &[
    Attribute { name: "Name", read: |r| text(&r.name), role: AttributeRole::Compared },
    Attribute { name: "Definer", read: |r| optional(&r.definer), role: AttributeRole::Compared },
    Attribute {
        name: "Security_type",
        read: |r| optional(&r.security_type),
        role: AttributeRole::Compared,
    },
    Attribute { name: "Comment", read: |r| optional(&r.comment), role: AttributeRole::Compared },
    Attribute {
        name: "character_set_client",
        read: |r| optional(&r.character_set_client),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "collation_connection",
        read: |r| optional(&r.collation_connection),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "Database Collation",
        read: |r| optional(&r.database_collation),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "Create Routine",
        read: |r| text(&r.definition),
        role: AttributeRole::Body(BodyKind::Routine),
    },
];

pub static EVENT_ATTRIBUTES: &[Attribute<Event>] = &[
    Attribute { name: "Name", read: |e| text(&e.name), role: AttributeRole::Compared },
    Attribute { name: "Definer", read: |e| optional(&e.definer), role: AttributeRole::Compared },
    Attribute { name: "Time zone", read: |e| optional(&e.time_zone), role: AttributeRole::Compared },
    Attribute { name: "Execute at", read: |e| optional(&e.execute_at), role: AttributeRole::Compared },
    Attribute {
        name: "Interval value",
        read: |e| optional(&e.interval_value),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "Interval field",
        read: |e| optional(&e.interval_field),
        role: AttributeRole::Compared,
    },
    Attribute { name: "Starts", read: |e| optional(&e.starts), role: AttributeRole::Compared },
    Attribute { name: "Ends", read: |e| optional(&e.ends), role: AttributeRole::Compared },
    Attribute { name: "Status", read: |e| optional(&e.status), role: AttributeRole::Compared },
    Attribute { name: "Originator", read: |e| optional(&e.originator), role: AttributeRole::Compared },
    Attribute {
        name: "character_set_client",
        read: |e| optional(&e.character_set_client),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "collation_connection",
        read: |e| optional(&e.collation_connection),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "Database Collation",
        read: |e| optional(&e.database_collation),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "Create Event",
        read: |e| text(&e.definition),
        role: AttributeRole::Body(BodyKind::Event),
    },
];

pub static VIEW_ATTRIBUTES: &[Attribute<View>] = &[
    Attribute { name: "TABLE_NAME", read: |v| text(&v.name), role: AttributeRole::Compared },
    Attribute {
        name: "VIEW_DEFINITION",
        read: |v| text(&v.definition),
        role: AttributeRole::Body(BodyKind::View),
    },
    Attribute { name: "CHECK_OPTION", read: |v| optional(&v.check_option), role: AttributeRole::Compared },
    Attribute { name: "IS_UPDATABLE", read: |v| optional(&v.is_updatable), role: AttributeRole::Compared },
    Attribute { name: "DEFINER", read: |v| optional(&v.definer), role: AttributeRole::Compared },
    Attribute { name: "SECURITY_TYPE", read: |v| optional(&v.security_type), role: AttributeRole::Compared },
    Attribute {
        name: "CHARACTER_SET_CLIENT",
        read: |v| optional(&v.character_set_client),
        role: AttributeRole::Compared,
    },
    Attribute {
        name: "COLLATION_CONNECTION",
        read: |v| optional(&v.collation_connection),
        role: AttributeRole::Compared,
    },
];

/// Name of the first attribute on which `ours` and `theirs` diverge.
///
/// Body attributes whose raw text differs are normalized first; when a
/// body cannot be isolated the raw mismatch stands.
pub fn first_difference<T>(
    attributes: &[Attribute<T>],
    object: &str,
    ours: &T,
    theirs: &T,
) -> Option<&'static str> {
    attributes.iter().find_map(|attribute| {
        let (a, b) = ((attribute.read)(ours), (attribute.read)(theirs));
        if a == b {
            return None;
        }

        match attribute.role {
            AttributeRole::Ignored => None,
            AttributeRole::Compared => Some(attribute.name),
            AttributeRole::Body(kind) => {
                let a = a.unwrap_or_default();
                let b = b.unwrap_or_default();
                match (normalize(kind, &a), normalize(kind, &b)) {
                    (Ok(a), Ok(b)) if a == b => None,
                    (Ok(_), Ok(_)) => Some(attribute.name),
                    (Err(err), _) | (_, Err(err)) => {
                        warn!("{} `{}`: {}; comparing raw text", kind, object, err);
                        Some(attribute.name)
                    }
                }
            }
        }
    })
}
