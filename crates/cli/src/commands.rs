//! Code generation commands

use crate::prompt;
use abapify_common::Settings;
use abapify_generator::{
    default_filename, write_artifact, AbapGenerator, EnhancementType, LlmClient, ProgramSpec,
};
use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};

const SUBJECT_LEN: usize = 20;
const ENHANCEMENT_SUBJECT_LEN: usize = 15;

/// One artifact to generate
#[derive(Debug, Clone)]
pub enum Request {
    Alv {
        description: String,
        tables: Vec<String>,
    },
    Report {
        description: String,
        tables: Vec<String>,
    },
    Class {
        description: String,
        methods: Vec<String>,
    },
    FunctionModule {
        description: String,
        params: Vec<String>,
    },
    Structure {
        description: String,
        fields: Vec<String>,
    },
    Test {
        target: String,
    },
    CustomProgram(ProgramSpec),
    Enhancement {
        base_object: String,
        enhancement_type: EnhancementType,
        functionality: String,
        enhancement_points: Vec<String>,
    },
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::Alv { .. } => "ALV report",
            Request::Report { .. } => "ABAP report",
            Request::Class { .. } => "ABAP class",
            Request::FunctionModule { .. } => "function module",
            Request::Structure { .. } => "structure",
            Request::Test { .. } => "unit test",
            Request::CustomProgram(_) => "custom program",
            Request::Enhancement { .. } => "enhancement",
        }
    }

    fn subject(&self) -> &str {
        match self {
            Request::Alv { description, .. }
            | Request::Report { description, .. }
            | Request::Class { description, .. }
            | Request::FunctionModule { description, .. }
            | Request::Structure { description, .. } => description,
            Request::Test { target } => target,
            Request::CustomProgram(spec) => &spec.program_type,
            Request::Enhancement { base_object, .. } => base_object,
        }
    }

    pub fn default_filename(&self) -> String {
        let (prefix, max_len) = match self {
            Request::Alv { .. } => ("z_alv_", SUBJECT_LEN),
            Request::Report { .. } => ("z_report_", SUBJECT_LEN),
            Request::Class { .. } => ("zcl_", SUBJECT_LEN),
            Request::FunctionModule { .. } => ("z_fm_", SUBJECT_LEN),
            Request::Structure { .. } => ("zstruct_", SUBJECT_LEN),
            Request::Test { .. } => ("zcl_test_", SUBJECT_LEN),
            Request::CustomProgram(_) => ("z_prog_", SUBJECT_LEN),
            Request::Enhancement { .. } => ("z_enh_", ENHANCEMENT_SUBJECT_LEN),
        };
        default_filename(prefix, self.subject(), max_len)
    }

    pub fn generate(&self, generator: &AbapGenerator) -> abapify_common::Result<String> {
        match self {
            Request::Alv {
                description,
                tables,
            } => generator.generate_alv(description, tables),
            Request::Report {
                description,
                tables,
            } => generator.generate_report(description, tables),
            Request::Class {
                description,
                methods,
            } => generator.generate_class(description, methods),
            Request::FunctionModule {
                description,
                params,
            } => generator.generate_function_module(description, params),
            Request::Structure {
                description,
                fields,
            } => generator.generate_structure(description, fields),
            Request::Test { target } => generator.generate_test(target),
            Request::CustomProgram(spec) => generator.generate_custom_program(spec),
            Request::Enhancement {
                base_object,
                enhancement_type,
                functionality,
                enhancement_points,
            } => generator.generate_enhancement(
                base_object,
                *enhancement_type,
                functionality,
                enhancement_points,
            ),
        }
    }
}

/// Generator wired to the configured LLM providers
pub fn build_generator(settings: &Settings) -> Result<AbapGenerator> {
    let client = LlmClient::new(&settings.llm).context("Failed to set up LLM providers")?;
    AbapGenerator::new(client, &settings.llm).context("Failed to load prompt templates")
}

/// Explicit output directory, or the configured one
pub fn output_dir(settings: &Settings, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| settings.output_dir.clone())
}

/// Generate one artifact and write it to `output_dir`
pub fn run(
    settings: &Settings,
    request: &Request,
    output_dir: &Path,
    filename: Option<&str>,
) -> Result<PathBuf> {
    println!(
        "{} Generating {}: {}",
        "→".cyan(),
        request.label(),
        request.subject().yellow()
    );

    let generator = build_generator(settings)?;
    let code = request
        .generate(&generator)
        .with_context(|| format!("Failed to generate {}", request.label()))?;

    let filename = filename
        .map(str::to_string)
        .unwrap_or_else(|| request.default_filename());
    let path =
        write_artifact(output_dir, &filename, &code).context("Failed to save generated code")?;

    println!("{} Code generated: {}", "✓".green(), path.display());
    Ok(path)
}

/// Collect a custom program specification interactively
pub fn ask_program_spec() -> Result<ProgramSpec> {
    println!("\n{}", "Custom program assistant".bold());

    let defaults = ProgramSpec::default();
    let program_type = prompt::select(
        "Program type",
        vec!["Report", "Class", "Function Group", "Module Pool", "Interface"],
    )?;

    Ok(ProgramSpec {
        specification: prompt::text("Describe the program")?,
        program_type: program_type.to_string(),
        main_features: prompt::list("Main feature")?,
        entities: prompt::list("Table or entity involved")?,
        integrations: prompt::text_or("Required integrations", &defaults.integrations)?,
        business_rules: prompt::list("Business rule")?,
        performance_requirements: prompt::text_or(
            "Performance requirements",
            &defaults.performance_requirements,
        )?,
        security_requirements: prompt::text_or(
            "Security requirements",
            &defaults.security_requirements,
        )?,
        usability_requirements: prompt::text_or(
            "Usability requirements",
            &defaults.usability_requirements,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filenames() {
        let alv = Request::Alv {
            description: "Open Sales Orders per Customer".to_string(),
            tables: vec![],
        };
        assert_eq!(alv.default_filename(), "z_alv_open_sales_orders_pe.abap");

        let test = Request::Test {
            target: "ZCL_PRICING".to_string(),
        };
        assert_eq!(test.default_filename(), "zcl_test_zcl_pricing.abap");

        let enhancement = Request::Enhancement {
            base_object: "SAPMV45A Sales Document".to_string(),
            enhancement_type: EnhancementType::UserExit,
            functionality: "Check credit limit".to_string(),
            enhancement_points: vec![],
        };
        assert_eq!(enhancement.default_filename(), "z_enh_sapmv45a_sales_.abap");
    }

    #[test]
    fn test_labels() {
        let request = Request::CustomProgram(ProgramSpec::default());
        assert_eq!(request.label(), "custom program");
        assert_eq!(request.default_filename(), "z_prog_report.abap");
    }
}
