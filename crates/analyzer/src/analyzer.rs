//! Core metadata analysis orchestration

use crate::naming_patterns::detect_naming_patterns;
use abapify_common::{
    AbapifyError, AnalysisResult, ObjectType, Relationship, Result, SapObject, Table, TableField,
};
use abapify_sap::dictionary::{FieldRow, ObjectRow};
use abapify_sap::SapConnection;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Pattern used to find custom development objects
pub const CUSTOM_OBJECT_PATTERN: &str = "Z*";

/// Analyzes dictionary metadata through a [`SapConnection`].
///
/// Tables and relationships are cached by table name for the lifetime of the
/// analyzer. The first `analyze_table` call for a name decides whether the
/// cached table carries relationships; later calls return that same table.
pub struct MetadataAnalyzer<'a> {
    connection: &'a dyn SapConnection,
    table_cache: HashMap<String, Rc<Table>>,
    relationship_cache: HashMap<String, Vec<Relationship>>,
}

impl<'a> MetadataAnalyzer<'a> {
    pub fn new(connection: &'a dyn SapConnection) -> Self {
        Self {
            connection,
            table_cache: HashMap::new(),
            relationship_cache: HashMap::new(),
        }
    }

    /// Analyze one table, serving it from the cache when already analyzed
    pub fn analyze_table(
        &mut self,
        table_name: &str,
        include_relationships: bool,
    ) -> Result<Rc<Table>> {
        if let Some(table) = self.table_cache.get(table_name) {
            debug!("Returning table {} from cache", table_name);
            return Ok(Rc::clone(table));
        }

        info!("Analyzing table: {}", table_name);

        let structure = self
            .connection
            .get_table_structure(table_name)
            .map_err(|e| match e {
                e if e.is_not_found() || e.is_connectivity() => e,
                e => {
                    error!("Failed to analyze table {}: {}", table_name, e);
                    AbapifyError::SapMetadata(format!(
                        "Failed to analyze table {}: {}",
                        table_name, e
                    ))
                }
            })?;

        let header = structure.header;
        let mut table = Table {
            name: table_name.to_string(),
            description: header.description,
            table_class: header.table_class,
            delivery_class: header.delivery_class,
            fields: convert_fields(table_name, structure.fields),
            foreign_keys: Vec::new(),
            created_on: header.created_on,
            changed_on: header.changed_on,
        };

        if include_relationships {
            table.foreign_keys = self.relationships(table_name);
        }

        info!("Table {} analyzed: {} fields", table_name, table.fields.len());

        let table = Rc::new(table);
        self.table_cache
            .insert(table_name.to_string(), Rc::clone(&table));
        Ok(table)
    }

    /// Analyze several tables, omitting the ones that cannot be analyzed.
    ///
    /// Only connectivity failures abort the batch.
    pub fn analyze_multiple_tables<S: AsRef<str>>(
        &mut self,
        table_names: &[S],
    ) -> Result<Vec<Table>> {
        let mut tables = Vec::new();

        for name in table_names {
            let name = name.as_ref();
            match self.analyze_table(name, true) {
                Ok(table) => tables.push(table.as_ref().clone()),
                Err(e) if e.is_connectivity() => return Err(e),
                Err(e) if e.is_not_found() => warn!("Table {} not found, skipping", name),
                Err(e) => error!("Failed to analyze table {}: {}", name, e),
            }
        }

        Ok(tables)
    }

    /// Direct foreign-key relationships of a table.
    ///
    /// Fetch failures are logged at debug level and yield no relationships.
    pub fn relationships(&mut self, table_name: &str) -> Vec<Relationship> {
        if let Some(cached) = self.relationship_cache.get(table_name) {
            return cached.clone();
        }

        let relationships = match self.connection.get_foreign_keys(table_name) {
            Ok(rows) => rows
                .into_iter()
                .filter(|row| !row.check_table.is_empty())
                .map(|row| {
                    Relationship::foreign_key(
                        table_name,
                        &row.field_name,
                        &row.check_table,
                        &row.check_field,
                    )
                })
                .collect(),
            Err(e) => {
                debug!("Failed to analyze relationships of {}: {}", table_name, e);
                Vec::new()
            }
        };

        self.relationship_cache
            .insert(table_name.to_string(), relationships.clone());
        relationships
    }

    /// Tables reachable from `root` over foreign keys within `max_depth` levels
    pub fn find_related_tables(&mut self, root: &str, max_depth: usize) -> HashSet<String> {
        let mut related = HashSet::new();
        let mut processed = HashSet::new();
        let mut frontier: HashSet<String> = HashSet::from([root.to_string()]);

        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }

            let current = std::mem::take(&mut frontier);
            for table in current {
                if !processed.insert(table.clone()) {
                    continue;
                }

                for relationship in self.relationships(&table) {
                    let target = relationship.to_table;
                    if processed.contains(&target) {
                        continue;
                    }
                    related.insert(target.clone());
                    if depth + 1 < max_depth {
                        frontier.insert(target);
                    }
                }
            }
        }

        related
    }

    /// Names of active, client-dependent transparent tables matching `pattern`
    pub fn search_custom_tables(&self, pattern: &str, limit: usize) -> Result<Vec<String>> {
        match self.connection.search_tables(pattern, limit) {
            Ok(tables) => {
                info!("Found {} custom tables", tables.len());
                Ok(tables.into_iter().map(|t| t.name).collect())
            }
            Err(e) if e.is_connectivity() => Err(e),
            Err(e) => {
                error!("Failed to search custom tables: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Custom programs, classes and function groups matching `pattern`
    pub fn analyze_custom_objects(&self, pattern: &str) -> Result<Vec<SapObject>> {
        let mut objects = Vec::new();

        for object_type in ObjectType::SEARCHABLE.iter() {
            match self.connection.search_objects(pattern, object_type) {
                Ok(rows) => objects.extend(rows.into_iter().map(convert_object)),
                Err(e) if e.is_connectivity() => return Err(e),
                Err(e) => debug!("Failed to search {} objects: {}", object_type, e),
            }
        }

        info!("Analyzed {} custom objects", objects.len());
        Ok(objects)
    }

    /// Analyze tables, collect their direct relationships and, optionally,
    /// custom objects with their naming patterns
    pub fn generate_full_analysis<S: AsRef<str>>(
        &mut self,
        table_names: &[S],
        include_custom_objects: bool,
    ) -> Result<AnalysisResult> {
        info!("Starting full analysis of {} tables", table_names.len());

        let tables = self.analyze_multiple_tables(table_names)?;

        let relationships: Vec<Relationship> = tables
            .iter()
            .flat_map(|table| self.relationships(&table.name))
            .collect();

        let (custom_objects, patterns) = if include_custom_objects {
            let objects = self.analyze_custom_objects(CUSTOM_OBJECT_PATTERN)?;
            let patterns = detect_naming_patterns(&objects);
            (objects, patterns)
        } else {
            (Vec::new(), Default::default())
        };

        info!(
            "Full analysis complete: {} tables, {} relationships, {} custom objects",
            tables.len(),
            relationships.len(),
            custom_objects.len()
        );

        Ok(AnalysisResult {
            tables,
            relationships,
            custom_objects,
            patterns,
            analysis_timestamp: Utc::now(),
        })
    }

    /// Whether a table is currently cached
    pub fn is_cached(&self, table_name: &str) -> bool {
        self.table_cache.contains_key(table_name)
    }

    pub fn clear_cache(&mut self) {
        self.table_cache.clear();
        self.relationship_cache.clear();
        info!("Analysis cache cleared");
    }
}

/// Convert field rows, dropping include/append markers and duplicate names
fn convert_fields(table_name: &str, rows: Vec<FieldRow>) -> Vec<TableField> {
    let mut seen = HashSet::new();

    rows.into_iter()
        .filter(|row| !row.name.is_empty() && !row.name.starts_with('.'))
        .filter(|row| {
            let fresh = seen.insert(row.name.clone());
            if !fresh {
                debug!("Dropping duplicate field {} in {}", row.name, table_name);
            }
            fresh
        })
        .map(|row| TableField {
            name: row.name,
            data_type: row.data_type,
            length: row.length,
            decimals: row.decimals,
            description: row.description,
            key_field: row.key_flag,
            not_null: row.not_null,
            domain: row.domain,
            data_element: row.data_element,
        })
        .collect()
}

fn convert_object(row: ObjectRow) -> SapObject {
    SapObject {
        object_type: ObjectType::from_code(&row.object_type),
        name: row.name,
        description: row.description,
        package: row.package,
        author: row.author,
        created_on: row.created_on,
        changed_on: row.changed_on,
        status: row.status,
    }
}
