use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use crate::error::SchemaError;

/// Logical table roles referenced by the statement templates.
#[derive(AsRefStr, EnumIter, Display, Debug, PartialEq, Eq, Copy, Clone)]
#[strum(serialize_all = "snake_case")]
pub enum TableRole {
    Users,
    SchemaVersion,
    Folders,
    FoldersMapping,
}

impl TableRole {
    /// The token standing for this role inside a template, e.g. `{{users}}`.
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.as_ref())
    }
}

/// Physical identifiers for each table role.
///
/// Supplied once when a provider is opened and never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TableNames {
    pub users: String,
    pub schema_version: String,
    pub folders: String,
    pub folders_mapping: String,
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            users: "users".to_owned(),
            schema_version: "schema_version".to_owned(),
            folders: "folders".to_owned(),
            folders_mapping: "folders_mapping".to_owned(),
        }
    }
}

impl TableNames {
    pub fn get(&self, role: TableRole) -> &str {
        match role {
            TableRole::Users => &self.users,
            TableRole::SchemaVersion => &self.schema_version,
            TableRole::Folders => &self.folders,
            TableRole::FoldersMapping => &self.folders_mapping,
        }
    }

    /// Identifiers are spliced into DDL verbatim, so only plain ASCII
    /// identifiers are accepted.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for role in TableRole::iter() {
            let name = self.get(role);
            let valid = !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(SchemaError::ConfigError(format!(
                    "invalid table name '{}' for role '{}'",
                    name, role
                )));
            }
        }

        let mut names: Vec<&str> = TableRole::iter().map(|role| self.get(role)).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != TableRole::iter().count() {
            return Err(SchemaError::ConfigError(
                "table names must be distinct for every role".to_string(),
            ));
        }

        Ok(())
    }
}

/// Replaces every table-role token in `template` with its mapped identifier.
///
/// Plain text substitution with no knowledge of SQL. Any `{{...}}` token
/// still present afterwards is an error, so a statement with an unknown
/// placeholder can never be sent to the database.
pub fn render(template: &str, tables: &TableNames) -> Result<String, SchemaError> {
    let mut sql = template.to_owned();
    for role in TableRole::iter() {
        sql = sql.replace(&role.token(), tables.get(role));
    }

    if let Some(start) = sql.find("{{") {
        let token = match sql[start..].find("}}") {
            Some(end) => &sql[start..start + end + 2],
            None => &sql[start..],
        };
        return Err(SchemaError::UnresolvedPlaceholder(token.to_owned()));
    }

    Ok(sql)
}

/// Renders a whole statement set up front, before any of it is executed.
pub fn render_all(templates: &[&str], tables: &TableNames) -> Result<Vec<String>, SchemaError> {
    templates.iter().map(|t| render(t, tables)).collect()
}
