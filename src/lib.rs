#![deny(clippy::unwrap_used)]

use std::str::FromStr;
use uuid::Uuid;

pub mod canonical;
pub mod config;
pub mod engine;
pub mod generator;
pub mod locks;
pub mod seo_url;
pub mod seo_url_template;
pub mod service;
pub mod template;

pub use engine::{SeoEngine, SeoError, SeoUrlPreview, UpdateSummary};

#[derive(Debug)]
pub struct SqlWrapper<T>(pub T);

impl<T> SqlWrapper<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

pub(crate) fn read_uuid(row: &rusqlite::Row, idx: usize) -> Result<Uuid, rusqlite::Error> {
    use rusqlite::types::{FromSqlError, Type, ValueRef};
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) => Uuid::from_slice(bytes).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Blob, Box::new(err))
        }),
        ValueRef::Text(text) => {
            let text = std::str::from_utf8(text).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
            })?;
            Uuid::from_str(text).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
            })
        }
        ValueRef::Null => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Null,
            Box::new(FromSqlError::Other("NULL uuid".into())),
        )),
        ValueRef::Integer(_) | ValueRef::Real(_) => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(FromSqlError::Other("Invalid uuid type".into())),
        )),
    }
}

pub(crate) fn read_optional_uuid(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<Uuid>, rusqlite::Error> {
    match row.get_ref(idx)? {
        rusqlite::types::ValueRef::Null => Ok(None),
        _ => read_uuid(row, idx).map(Some),
    }
}

/// Same blob layout rusqlite uses for `Uuid` parameters.
pub(crate) fn uuid_value(id: Uuid) -> rusqlite::types::Value {
    rusqlite::types::Value::Blob(id.as_bytes().to_vec())
}

/// Placeholder list for `IN (...)` clauses.
pub(crate) fn placeholders(count: usize) -> String {
    itertools::intersperse(std::iter::repeat("?").take(count), ", ").collect()
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn builds_placeholders() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
