//! SQL quoting helpers shared by catalog queries and generated DDL.

use regex::{NoExpand, Regex};

/// Quote a MySQL identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal with single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Quote a list of identifiers as a comma separated column list.
pub fn quote_ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrite schema-qualified references from one database name to another.
///
/// Handles both `` `db`.`` and bare `db.` qualifiers.
pub fn rewrite_schema_name(text: &str, from: &str, to: &str) -> String {
    if from.is_empty() || from == to {
        return text.to_string();
    }

    let quoted = text.replace(
        &format!("{}.", quote_ident(from)),
        &format!("{}.", quote_ident(to)),
    );

    let bare = format!("{}.", to);
    match Regex::new(&format!(r"\b{}\.", regex::escape(from))) {
        Ok(re) => re.replace_all(&quoted, NoExpand(&bare)).into_owned(),
        Err(_) => quoted,
    }
}
