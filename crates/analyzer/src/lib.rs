//! SAP metadata analyzer for ABAPify
//!
//! Fetches table structures and foreign keys through a
//! [`SapConnection`](abapify_sap::SapConnection), caches them per table,
//! walks the relationship graph and summarizes custom development objects.
//!
//! # Examples
//!
//! ```
//! use abapify_analyzer::MetadataAnalyzer;
//! use abapify_sap::InMemoryConnection;
//!
//! let connection = InMemoryConnection::new()
//!     .with_simple_table("ZORDER", "Sales orders", &[("ORDER_ID", "NUMC", 10, true)])
//!     .with_simple_table("ZCUSTOMER", "Customers", &[("KUNNR", "CHAR", 10, true)])
//!     .with_foreign_key("ZORDER", "KUNNR", "ZCUSTOMER", "KUNNR");
//!
//! let mut analyzer = MetadataAnalyzer::new(&connection);
//! let result = analyzer.generate_full_analysis(&["ZORDER"], false).unwrap();
//!
//! assert_eq!(result.relationships[0].to_table, "ZCUSTOMER");
//! ```

mod analyzer;
pub mod context;
mod naming_patterns;
mod output;

pub use analyzer::{MetadataAnalyzer, CUSTOM_OBJECT_PATTERN};
pub use context::{build_analysis_context, build_table_context};
pub use naming_patterns::detect_naming_patterns;
pub use output::{format_analysis_summary, format_table_report};
