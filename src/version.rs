use strum::IntoEnumIterator;

use crate::provider::is_available;
use crate::schema::Dialect;

/// Provider adapters compiled into this build, e.g. `+sqlite -mssql ...`.
pub fn features() -> Vec<String> {
    Dialect::iter()
        .map(|dialect| {
            let sign = if is_available(dialect) { '+' } else { '-' };
            format!("{}{}", sign, dialect)
        })
        .collect()
}

pub fn info() -> String {
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        features().join(" ")
    )
}
