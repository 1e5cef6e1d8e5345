//! ABAP code generation facade

use crate::llm::LlmClient;
use crate::templates::PromptAssembler;
use abapify_common::{AbapifyError, LlmSettings, Result};
use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tera::Context;
use tracing::{error, info};

const CUSTOM_PROGRAM_TEMPERATURE: f32 = 0.8;
const CUSTOM_PROGRAM_MAX_TOKENS: u32 = 8192;

/// Enhancement technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnhancementType {
    Badi,
    EnhancementPoint,
    CustomerExit,
    UserExit,
}

impl EnhancementType {
    pub const ALL: [EnhancementType; 4] = [
        EnhancementType::Badi,
        EnhancementType::EnhancementPoint,
        EnhancementType::CustomerExit,
        EnhancementType::UserExit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EnhancementType::Badi => "BADI",
            EnhancementType::EnhancementPoint => "Enhancement Point",
            EnhancementType::CustomerExit => "Customer Exit",
            EnhancementType::UserExit => "User Exit",
        }
    }
}

impl fmt::Display for EnhancementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EnhancementType {
    type Err = AbapifyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                AbapifyError::Generation(format!(
                    "Unknown enhancement type '{}' \
                     (expected BADI, Enhancement Point, Customer Exit or User Exit)",
                    s
                ))
            })
    }
}

/// Answers collected for a custom program
#[derive(Debug, Clone, Serialize)]
pub struct ProgramSpec {
    pub specification: String,
    pub program_type: String,
    pub main_features: Vec<String>,
    pub entities: Vec<String>,
    pub integrations: String,
    pub business_rules: Vec<String>,
    pub performance_requirements: String,
    pub security_requirements: String,
    pub usability_requirements: String,
}

impl Default for ProgramSpec {
    fn default() -> Self {
        Self {
            specification: String::new(),
            program_type: "Report".to_string(),
            main_features: Vec::new(),
            entities: Vec::new(),
            integrations: "None".to_string(),
            business_rules: Vec::new(),
            performance_requirements: "Standard".to_string(),
            security_requirements: "Standard authorization checks".to_string(),
            usability_requirements: "Intuitive interface".to_string(),
        }
    }
}

/// Generates ABAP source text through an LLM
pub struct AbapGenerator {
    client: LlmClient,
    prompts: PromptAssembler,
    enhanced: bool,
    provider: Option<String>,
    model: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl AbapGenerator {
    /// Generator with the enhanced system prompt and the configured defaults
    pub fn new(client: LlmClient, settings: &LlmSettings) -> Result<Self> {
        Ok(Self {
            client,
            prompts: PromptAssembler::new()?,
            enhanced: true,
            provider: None,
            model: None,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Use the short system prompt
    pub fn simple(mut self) -> Self {
        self.enhanced = false;
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn generate_alv(&self, description: &str, tables: &[String]) -> Result<String> {
        info!("Generating ALV report: {}", description);
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("tables", tables);
        self.generate("alv", &context)
    }

    pub fn generate_report(&self, description: &str, tables: &[String]) -> Result<String> {
        info!("Generating report: {}", description);
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("tables", tables);
        self.generate("report", &context)
    }

    pub fn generate_class(&self, description: &str, methods: &[String]) -> Result<String> {
        info!("Generating class: {}", description);
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("methods", methods);
        self.generate("class", &context)
    }

    pub fn generate_function_module(&self, description: &str, params: &[String]) -> Result<String> {
        info!("Generating function module: {}", description);
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("params", params);
        self.generate("function_module", &context)
    }

    pub fn generate_structure(&self, description: &str, fields: &[String]) -> Result<String> {
        info!("Generating structure: {}", description);
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("fields", fields);
        self.generate("structure", &context)
    }

    pub fn generate_test(&self, target: &str) -> Result<String> {
        info!("Generating unit test: {}", target);
        let mut context = Context::new();
        context.insert("target", target);
        self.generate("test", &context)
    }

    /// Custom programs get more room and a warmer temperature
    pub fn generate_custom_program(&self, spec: &ProgramSpec) -> Result<String> {
        info!("Generating custom program: {}", spec.program_type);
        let context = Context::from_serialize(spec).map_err(|e| {
            AbapifyError::Generation(format!("Invalid program specification: {}", e))
        })?;
        let prompt = self.prompts.render("custom_program", &context)?;
        self.complete(&prompt, CUSTOM_PROGRAM_TEMPERATURE, CUSTOM_PROGRAM_MAX_TOKENS)
    }

    pub fn generate_enhancement(
        &self,
        base_object: &str,
        enhancement_type: EnhancementType,
        functionality: &str,
        enhancement_points: &[String],
    ) -> Result<String> {
        info!("Generating enhancement: {} for {}", enhancement_type, base_object);
        let mut context = Context::new();
        context.insert("base_object", base_object);
        context.insert("enhancement_type", enhancement_type.label());
        context.insert("functionality", functionality);
        context.insert("enhancement_points", enhancement_points);
        self.generate("enhancement", &context)
    }

    /// ALV driven by analyzed dictionary context
    pub fn generate_sap_alv(
        &self,
        description: &str,
        tables: &[String],
        related_tables: &[String],
        sap_context: &str,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("context", sap_context);
        context.insert("tables", tables);
        context.insert("related_tables", related_tables);
        let enriched = self.prompts.render("sap_alv", &context)?;
        self.generate_alv(&enriched, tables)
    }

    /// Report driven by a full analysis context
    pub fn generate_sap_report(
        &self,
        description: &str,
        tables: &[String],
        sap_context: &str,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("context", sap_context);
        let enriched = self.prompts.render("sap_report", &context)?;
        self.generate_report(&enriched, tables)
    }

    /// Class designed around the analyzed tables
    pub fn generate_sap_class(
        &self,
        description: &str,
        tables: &[String],
        sap_context: &str,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("description", description);
        context.insert("context", sap_context);
        context.insert("tables", tables);
        let enriched = self.prompts.render("sap_class", &context)?;
        self.generate_class(&enriched, &[])
    }

    fn generate(&self, template: &str, context: &Context) -> Result<String> {
        let prompt = self.prompts.render(template, context)?;
        self.complete(&prompt, self.temperature, self.max_tokens)
    }

    fn complete(&self, user_prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let system_prompt = self.prompts.system_prompt(self.enhanced, &date)?;

        self.client
            .generate(
                &system_prompt,
                user_prompt,
                self.provider.as_deref(),
                self.model.as_deref(),
                temperature,
                max_tokens,
            )
            .inspect_err(|e| error!("Failed to generate code: {}", e))
    }
}
