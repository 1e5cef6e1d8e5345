//! Deterministic in-memory SAP connection
//!
//! Serves dictionary data registered up front. Used by tests and offline
//! demos; call counters make caching behaviour observable.

use crate::connection::SapConnection;
use crate::dictionary::{
    FieldRow, ForeignKeyRow, ObjectRow, TableHeader, TableRow, TableStructure, TableSummary,
};
use crate::wildcard_regex;
use abapify_common::{AbapifyError, ObjectType, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory dictionary
#[derive(Debug, Default)]
pub struct InMemoryConnection {
    tables: BTreeMap<String, TableStructure>,
    foreign_keys: HashMap<String, Vec<ForeignKeyRow>>,
    failing_foreign_keys: HashSet<String>,
    rows: HashMap<String, Vec<String>>,
    objects: Vec<ObjectRow>,
    offline: bool,
    structure_calls: RefCell<HashMap<String, usize>>,
    foreign_key_calls: RefCell<HashMap<String, usize>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full table structure
    pub fn with_table(mut self, structure: TableStructure) -> Self {
        self.tables.insert(structure.header.name.clone(), structure);
        self
    }

    /// Register a transparent table from `(name, type, length, key)` tuples
    pub fn with_simple_table(
        self,
        name: &str,
        description: &str,
        fields: &[(&str, &str, u32, bool)],
    ) -> Self {
        let fields = fields
            .iter()
            .map(|(field, data_type, length, key)| FieldRow {
                name: field.to_string(),
                data_type: data_type.to_string(),
                length: *length,
                decimals: 0,
                description: String::new(),
                key_flag: *key,
                not_null: *key,
                domain: None,
                data_element: None,
            })
            .collect();

        self.with_table(TableStructure {
            header: TableHeader {
                name: name.to_string(),
                description: description.to_string(),
                table_class: "TRANSP".to_string(),
                delivery_class: "A".to_string(),
                client_dependent: true,
                created_on: None,
                changed_on: None,
            },
            fields,
        })
    }

    /// Register a foreign key `table.field -> check_table.check_field`
    pub fn with_foreign_key(
        mut self,
        table: &str,
        field: &str,
        check_table: &str,
        check_field: &str,
    ) -> Self {
        self.foreign_keys
            .entry(table.to_string())
            .or_default()
            .push(ForeignKeyRow {
                field_name: field.to_string(),
                check_table: check_table.to_string(),
                check_field: check_field.to_string(),
            });
        self
    }

    /// Make the foreign key fetch for `table` fail
    pub fn with_failing_foreign_keys(mut self, table: &str) -> Self {
        self.failing_foreign_keys.insert(table.to_string());
        self
    }

    /// Register raw `WA` records for `get_table_data`
    pub fn with_rows(mut self, table: &str, rows: Vec<String>) -> Self {
        self.rows.insert(table.to_string(), rows);
        self
    }

    pub fn with_object(mut self, object: ObjectRow) -> Self {
        self.objects.push(object);
        self
    }

    /// Every call fails with a connection error
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Number of structure fetches made for a table
    pub fn structure_calls(&self, table: &str) -> usize {
        self.structure_calls.borrow().get(table).copied().unwrap_or(0)
    }

    /// Number of foreign key fetches made for a table
    pub fn foreign_key_calls(&self, table: &str) -> usize {
        self.foreign_key_calls.borrow().get(table).copied().unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline {
            Err(AbapifyError::SapConnection("SAP system unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn count(calls: &RefCell<HashMap<String, usize>>, table: &str) {
    *calls.borrow_mut().entry(table.to_string()).or_insert(0) += 1;
}

impl SapConnection for InMemoryConnection {
    fn language(&self) -> String {
        "EN".to_string()
    }

    fn get_table_structure(&self, table_name: &str) -> Result<TableStructure> {
        count(&self.structure_calls, table_name);
        self.ensure_online()?;
        self.tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| AbapifyError::TableNotFound {
                table: table_name.to_string(),
            })
    }

    fn get_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeyRow>> {
        count(&self.foreign_key_calls, table_name);
        self.ensure_online()?;
        if self.failing_foreign_keys.contains(table_name) {
            return Err(AbapifyError::rfc(
                "DDIF_FORKEY_GET",
                format!("Foreign keys of {} are unavailable", table_name),
            ));
        }
        Ok(self.foreign_keys.get(table_name).cloned().unwrap_or_default())
    }

    fn get_table_data(
        &self,
        table_name: &str,
        _fields: &[String],
        _where_clause: &str,
        max_rows: usize,
    ) -> Result<Vec<TableRow>> {
        self.ensure_online()?;
        Ok(self
            .rows
            .get(table_name)
            .map(|rows| {
                rows.iter()
                    .take(max_rows)
                    .enumerate()
                    .map(|(i, wa)| TableRow {
                        row_id: i + 1,
                        table_name: table_name.to_string(),
                        data: wa.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn search_tables(&self, pattern: &str, limit: usize) -> Result<Vec<TableSummary>> {
        self.ensure_online()?;
        let matcher = wildcard_regex(pattern)?;
        Ok(self
            .tables
            .values()
            .filter(|t| t.header.table_class == "TRANSP" && matcher.is_match(&t.header.name))
            .take(limit)
            .map(|t| TableSummary {
                name: t.header.name.clone(),
                description: t.header.description.clone(),
            })
            .collect())
    }

    fn search_objects(&self, pattern: &str, object_type: &ObjectType) -> Result<Vec<ObjectRow>> {
        self.ensure_online()?;
        let matcher = wildcard_regex(pattern)?;
        Ok(self
            .objects
            .iter()
            .filter(|o| ObjectType::from_code(&o.object_type) == *object_type)
            .filter(|o| matcher.is_match(&o.name))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str, object_type: &str) -> ObjectRow {
        ObjectRow {
            name: name.to_string(),
            object_type: object_type.to_string(),
            description: String::new(),
            package: None,
            author: None,
            created_on: None,
            changed_on: None,
            status: None,
        }
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let connection = InMemoryConnection::new();
        let err = connection.get_table_structure("ZNONE").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(connection.structure_calls("ZNONE"), 1);
    }

    #[test]
    fn test_search_uses_wildcards() {
        let connection = InMemoryConnection::new()
            .with_simple_table("ZORDER", "Orders", &[("MANDT", "CLNT", 3, true)])
            .with_simple_table("ZCUSTOMER", "Customers", &[("MANDT", "CLNT", 3, true)])
            .with_simple_table("MARA", "Materials", &[("MANDT", "CLNT", 3, true)]);

        let names: Vec<String> = connection
            .search_tables("Z*", 10)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["ZCUSTOMER", "ZORDER"]);
        assert_eq!(connection.search_tables("Z*", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_object_search_filters_by_type() {
        let connection = InMemoryConnection::new()
            .with_object(object("ZR_SALES_REPORT", "PROG"))
            .with_object(object("ZCL_SALES_API", "CLAS"));

        let classes = connection
            .search_objects("Z*", &ObjectType::Class)
            .unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "ZCL_SALES_API");
    }

    #[test]
    fn test_offline_connection() {
        let connection = InMemoryConnection::new().offline();
        assert!(connection.get_foreign_keys("ZORDER").unwrap_err().is_connectivity());
    }
}
