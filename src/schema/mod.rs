//! Column metadata and key discovery.
//!
//! [`build_schema`] turns driver column attributes into
//! [`ColumnDescriptor`]s. Under key-info behavior it also resolves base
//! names and runs the catalog cascade in [`keys`] to flag key, unique and
//! row-version columns.

mod keys;
mod table_name;

pub use table_name::{table_from_command_text, QualifiedTableName};

use crate::driver::constants::*;
use crate::driver::{AttrValue, CatalogStatement, DescField, Statement};
use crate::error::{Error, Result};
use crate::options::ProviderInfo;
use crate::protocol::buffer::ScratchBuffer;
use crate::protocol::types::{ColumnDescriptor, Nullability, TypeMapping, TypeRegistry};

use keys::KeyDiscovery;

fn column_number(column: usize) -> Result<u16> {
    u16::try_from(column + 1).map_err(|_| Error::out_of_range("column", column as i64))
}

/// Read a column attribute, failing on driver errors.
pub(crate) fn column_attribute<S: Statement + ?Sized>(
    stmt: &mut S,
    column: usize,
    field: DescField,
) -> Result<AttrValue> {
    let (rc, value) = stmt.col_attribute(column_number(column)?, field);
    if !rc.is_success() {
        return Err(Error::driver(rc, stmt.diagnostics()));
    }
    Ok(value)
}

/// Read a column attribute, treating failures as "not reported".
///
/// A driver rejecting a SQL Server extension attribute with `HY091` has the
/// matching capability flag cleared so the attribute is not asked again.
pub(crate) fn optional_attribute<S: Statement + ?Sized>(
    stmt: &mut S,
    column: usize,
    field: DescField,
    provider: &mut ProviderInfo,
) -> Option<AttrValue> {
    match column_attribute(stmt, column, field) {
        Ok(value) => Some(value),
        Err(e) => {
            let unsupported = e
                .diagnostics()
                .iter()
                .any(|d| d.state == SQLSTATE_INVALID_DESCRIPTOR_FIELD);
            if unsupported && field.is_provider_specific() {
                match field {
                    DescField::SsColumnKey => provider.no_column_key = true,
                    DescField::SsColumnHidden => provider.no_hidden_columns = true,
                    _ => {}
                }
                tracing::debug!(?field, "column attribute not supported by driver");
            }
            None
        }
    }
}

fn optional_numeric<S: Statement + ?Sized>(
    stmt: &mut S,
    column: usize,
    field: DescField,
    provider: &mut ProviderInfo,
) -> Option<i64> {
    optional_attribute(stmt, column, field, provider).and_then(|v| v.as_i64())
}

fn optional_text<S: Statement + ?Sized>(
    stmt: &mut S,
    column: usize,
    field: DescField,
    provider: &mut ProviderInfo,
) -> Option<String> {
    optional_attribute(stmt, column, field, provider).and_then(|v| v.as_text().map(str::to_string))
}

/// Resolve the mapping of a result column, applying sign promotion.
pub(crate) fn column_mapping<S: Statement + ?Sized>(
    stmt: &mut S,
    column: usize,
    registry: &TypeRegistry,
) -> Result<TypeMapping> {
    let concise = column_attribute(stmt, column, DescField::ConciseType)?
        .as_i64()
        .and_then(|n| i16::try_from(n).ok())
        .ok_or_else(|| Error::cast(format!("column {column}: type not reported")))?;
    let mapping = registry.resolve_raw(concise)?;
    if !mapping.sign_ambiguous {
        return Ok(*mapping);
    }
    let unsigned = column_attribute(stmt, column, DescField::Unsigned)?
        .as_i64()
        .is_some_and(|n| n != 0);
    Ok(*registry.promote(mapping, unsigned))
}

/// Split `count` result columns into visible and trailing hidden columns.
///
/// Only asked under key-info behavior; the first column reported hidden
/// starts the hidden tail.
pub(crate) fn count_hidden_columns<S: Statement + ?Sized>(
    stmt: &mut S,
    count: usize,
    provider: &mut ProviderInfo,
) -> usize {
    if provider.no_hidden_columns {
        return 0;
    }
    for column in 0..count {
        if optional_numeric(stmt, column, DescField::SsColumnHidden, provider) == Some(SQL_TRUE) {
            tracing::debug!(hidden = count - column, "hidden columns");
            return count - column;
        }
        if provider.no_hidden_columns {
            break;
        }
    }
    0
}

/// What [`build_schema`] needs to know about the reader.
pub(crate) struct SchemaRequest<'a> {
    pub registry: &'a TypeRegistry,
    pub key_info: bool,
    pub quote_char: char,
    pub command_text: Option<&'a str>,
    pub visible: usize,
    pub hidden: usize,
}

/// Build the descriptors of the visible columns of the current result.
///
/// Type attributes are required; every other attribute is optional and key
/// discovery failures are swallowed.
pub(crate) fn build_schema<S: Statement + ?Sized>(
    stmt: &mut S,
    catalog: &mut Option<Box<dyn CatalogStatement>>,
    buffer: &mut ScratchBuffer,
    provider: &mut ProviderInfo,
    request: &SchemaRequest<'_>,
) -> Result<Vec<ColumnDescriptor>> {
    let mut columns = Vec::with_capacity(request.visible);
    let mut tables: Vec<String> = Vec::new();
    let mut need_keys = request.key_info;

    for i in 0..request.visible {
        let mapping = column_mapping(stmt, i, request.registry)?;
        let name = optional_text(stmt, i, DescField::Name, provider).unwrap_or_default();
        let mut col = ColumnDescriptor::new(name, i, mapping.odbc_type, mapping.sql_type);

        let mut size = optional_numeric(stmt, i, DescField::OctetLength, provider).unwrap_or(-1);
        if mapping.sql_type.is_wide() && size > 0 {
            size /= 2;
        }
        col.column_size = i32::try_from(size).unwrap_or(i32::MAX);
        let byte = |v: Option<i64>| v.unwrap_or(0).clamp(0, i64::from(u8::MAX)) as u8;
        col.precision = byte(optional_numeric(stmt, i, DescField::Precision, provider));
        col.scale = byte(optional_numeric(stmt, i, DescField::Scale, provider));
        col.is_auto_increment =
            optional_numeric(stmt, i, DescField::AutoUniqueValue, provider) == Some(SQL_TRUE);
        col.is_read_only =
            optional_numeric(stmt, i, DescField::Updatable, provider) == Some(SQL_ATTR_READONLY);
        col.nullability = optional_numeric(stmt, i, DescField::Nullable, provider)
            .map_or(Nullability::Unknown, Nullability::from_raw);

        if request.key_info {
            if !provider.no_column_key
                && optional_numeric(stmt, i, DescField::SsColumnKey, provider) == Some(SQL_TRUE)
            {
                col.is_key = true;
                col.is_unique = true;
                need_keys = false;
            }
            col.base_schema_name = optional_text(stmt, i, DescField::SchemaName, provider);
            col.base_catalog_name = optional_text(stmt, i, DescField::CatalogName, provider);
            col.base_table_name = optional_text(stmt, i, DescField::BaseTableName, provider);
            col.base_column_name = optional_text(stmt, i, DescField::BaseColumnName, provider);
            if let Some(table) = &col.base_table_name {
                if !tables.contains(table) {
                    tables.push(table.clone());
                }
            }
        }

        if (col.is_key || col.is_auto_increment) && col.nullability == Nullability::Unknown {
            col.nullability = Nullability::NoNulls;
        }
        columns.push(col);
    }

    if request.key_info && !provider.no_column_key {
        for i in request.visible..request.visible + request.hidden {
            let key = optional_numeric(stmt, i, DescField::SsColumnKey, provider) == Some(SQL_TRUE);
            if key && optional_numeric(stmt, i, DescField::SsColumnHidden, provider) == Some(SQL_TRUE) {
                tracing::debug!(column = i, "hidden key column, key flags discarded");
                for col in columns.iter_mut() {
                    col.is_key = false;
                    col.is_unique = false;
                }
            }
        }
    }

    if !request.key_info {
        return Ok(columns);
    }

    let names: Vec<QualifiedTableName> = if tables.is_empty() {
        let parsed = request
            .command_text
            .and_then(|text| table_from_command_text(text, request.quote_char))
            .and_then(|text| QualifiedTableName::parse(&text, request.quote_char));
        match parsed {
            Some(name) => {
                tracing::debug!(table = %name.table, "base table taken from command text");
                set_base_table_names(&mut columns, &name);
                vec![name]
            }
            None => Vec::new(),
        }
    } else {
        tables
            .iter()
            .map(|t| QualifiedTableName::from_table(t, request.quote_char))
            .collect()
    };
    if names.is_empty() {
        return Ok(columns);
    }

    if catalog.is_none() {
        *catalog = stmt.open_catalog_statement();
    }
    let Some(catalog) = catalog.as_deref_mut() else {
        tracing::debug!("no catalog statement, key discovery skipped");
        return Ok(columns);
    };
    let mut discovery = KeyDiscovery {
        catalog,
        buffer,
        columns: &mut columns,
        provider,
    };
    for name in &names {
        if discovery.retrieve(name, need_keys, false) == 0 && need_keys {
            discovery.retrieve(name, need_keys, true);
        }
    }
    Ok(columns)
}

/// Fill in base names for columns the driver left without a table.
pub(crate) fn set_base_table_names(columns: &mut [ColumnDescriptor], name: &QualifiedTableName) {
    for col in columns.iter_mut().filter(|c| c.base_table_name.is_none()) {
        col.base_table_name = Some(name.table.clone());
        col.base_schema_name = name.schema.clone();
        col.base_catalog_name = name.catalog.clone();
    }
}
