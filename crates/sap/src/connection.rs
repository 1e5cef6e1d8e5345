//! Transport-agnostic SAP connection capability

use crate::dictionary::{ForeignKeyRow, ObjectRow, TableRow, TableStructure, TableSummary};
use abapify_common::{ObjectType, Result};

/// Dictionary and repository access used by the metadata analyzer.
///
/// Implementations parse transport responses into typed rows before
/// returning them. Failures to reach the system are reported as
/// `SapConnection` or `SapAuthentication` errors.
pub trait SapConnection {
    /// Logon language used for texts
    fn language(&self) -> String;

    /// Header and fields of a table; `TableNotFound` when it does not exist
    fn get_table_structure(&self, table_name: &str) -> Result<TableStructure>;

    /// Foreign key definitions of a table
    fn get_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeyRow>>;

    /// Raw table records, optionally restricted to `fields` and a WHERE clause
    fn get_table_data(
        &self,
        table_name: &str,
        fields: &[String],
        where_clause: &str,
        max_rows: usize,
    ) -> Result<Vec<TableRow>>;

    /// Active, client-dependent transparent tables matching a wildcard pattern
    fn search_tables(&self, pattern: &str, limit: usize) -> Result<Vec<TableSummary>>;

    /// Repository objects of one type matching a wildcard pattern
    fn search_objects(&self, pattern: &str, object_type: &ObjectType) -> Result<Vec<ObjectRow>>;
}
