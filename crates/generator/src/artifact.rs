//! Output file naming and writing

use abapify_common::{AbapifyError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ABAP_EXTENSION: &str = "abap";

/// `<prefix><subject>.abap` with the subject lowercased, spaces replaced by
/// underscores and cut to `max_len` characters
pub fn default_filename(prefix: &str, subject: &str, max_len: usize) -> String {
    let stem: String = subject
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .take(max_len)
        .collect();
    format!("{}{}.{}", prefix, stem, ABAP_EXTENSION)
}

/// Write generated text verbatim, creating the directory when needed
pub fn write_artifact(output_dir: &Path, filename: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| {
        AbapifyError::OutputDirectory(format!(
            "Failed to create {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let path = output_dir.join(filename);
    fs::write(&path, text)?;
    info!("Wrote {} bytes to {}", text.len(), path.display());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_filename() {
        assert_eq!(
            default_filename("z_alv_", "Sales Orders by Customer Region", 20),
            "z_alv_sales_orders_by_cust.abap"
        );
        assert_eq!(default_filename("zcl_test_", "ZCL_PRICING", 20), "zcl_test_zcl_pricing.abap");
        assert_eq!(default_filename("z_enh_", "SAPMV45A", 15), "z_enh_sapmv45a.abap");
    }

    #[test]
    fn test_truncation_counts_characters() {
        assert_eq!(
            default_filename("z_report_", "Relatório de Vendas", 9),
            "z_report_relatório.abap"
        );
    }

    #[test]
    fn test_write_artifact_creates_directory() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("output");

        let path = write_artifact(&output, "z_demo.abap", "REPORT z_demo.\n").unwrap();

        assert_eq!(path, output.join("z_demo.abap"));
        assert_eq!(fs::read_to_string(path).unwrap(), "REPORT z_demo.\n");
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let err = write_artifact(&blocker.join("sub"), "z.abap", "x").unwrap_err();
        assert!(matches!(err, AbapifyError::OutputDirectory(_)));
    }
}
