//! Prompt assembly and routing through a mocked provider

use abapify_common::{AbapifyError, LlmSettings};
use abapify_generator::{
    default_filename, write_artifact, AbapGenerator, ChatRequest, EnhancementType, LlmClient,
    LlmProvider, ProgramSpec,
};
use mockall::mock;
use mockall::predicate::function;
use tempfile::TempDir;

mock! {
    pub Provider {}

    impl LlmProvider for Provider {
        fn name(&self) -> &'static str;
        fn default_model(&self) -> &'static str;
        fn generate(&self, request: &ChatRequest) -> abapify_common::Result<String>;
    }
}

const SEPARATOR: &str = "\n=====\n";

/// Provider that answers with the prompts it received
fn echo_provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("groq");
    provider.expect_default_model().return_const("llama");
    provider
        .expect_generate()
        .returning(|r| Ok(format!("{}{}{}", r.system_prompt, SEPARATOR, r.user_prompt)));
    provider
}

fn generator_with(provider: MockProvider) -> AbapGenerator {
    let settings = LlmSettings::default();
    let client = LlmClient::with_providers(vec![Box::new(provider)], &settings);
    AbapGenerator::new(client, &settings).unwrap()
}

fn split(response: &str) -> (&str, &str) {
    response.split_once(SEPARATOR).unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_alv_prompt() {
    let generator = generator_with(echo_provider());

    let response = generator
        .generate_alv("Open sales orders", &strings(&["VBAK", "VBAP"]))
        .unwrap();
    let (system, user) = split(&response);

    assert!(system.contains("SENIOR ABAP EXPERT"));
    assert!(system.contains("Program generated by ABAPify"));
    assert!(user.contains("- Description: Open sales orders"));
    assert!(user.contains("- Tables involved: VBAK, VBAP"));
    assert!(user.contains("CL_SALV_TABLE"));
}

#[test]
fn test_simple_system_prompt() {
    let generator = generator_with(echo_provider()).simple();

    let response = generator.generate_test("ZCL_PRICING").unwrap();
    let (system, user) = split(&response);

    assert!(!system.contains("SENIOR ABAP EXPERT"));
    assert!(system.contains("Answer ONLY with ABAP code"));
    assert!(user.contains("- Class/Function module under test: ZCL_PRICING"));
}

#[test]
fn test_empty_lists_are_named() {
    let generator = generator_with(echo_provider());

    let response = generator.generate_class("Price calculator", &[]).unwrap();
    assert!(split(&response).1.contains("- Methods to implement: none specified"));

    let response = generator
        .generate_structure("Customer address", &strings(&["NAME1", "ORT01"]))
        .unwrap();
    assert!(split(&response).1.contains("- Fields: NAME1, ORT01"));

    let response = generator
        .generate_function_module("Currency conversion", &strings(&["IV_AMOUNT"]))
        .unwrap();
    assert!(split(&response).1.contains("- Parameters: IV_AMOUNT"));
}

#[test]
fn test_custom_program_uses_larger_budget() {
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("groq");
    provider.expect_default_model().return_const("llama");
    provider
        .expect_generate()
        .with(function(|r: &ChatRequest| {
            r.temperature == 0.8
                && r.max_tokens == 8192
                && r.user_prompt.contains("- Program type: Module Pool")
                && r.user_prompt.contains("- Required integrations: None")
        }))
        .times(1)
        .returning(|_| Ok("PROGRAM z_orders.".to_string()));
    let generator = generator_with(provider);

    let spec = ProgramSpec {
        specification: "Maintain order priorities".to_string(),
        program_type: "Module Pool".to_string(),
        entities: strings(&["ZORDER"]),
        ..ProgramSpec::default()
    };

    assert_eq!(generator.generate_custom_program(&spec).unwrap(), "PROGRAM z_orders.");
}

#[test]
fn test_regular_generation_uses_settings_defaults() {
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("groq");
    provider.expect_default_model().return_const("llama");
    provider
        .expect_generate()
        .with(function(|r: &ChatRequest| r.temperature == 0.2 && r.max_tokens == 1000))
        .times(1)
        .returning(|_| Ok("REPORT z_demo.".to_string()));

    let settings = LlmSettings {
        temperature: 0.2,
        max_tokens: 1000,
        ..LlmSettings::default()
    };
    let client = LlmClient::with_providers(vec![Box::new(provider)], &settings);
    let generator = AbapGenerator::new(client, &settings).unwrap();

    assert_eq!(generator.generate_report("Demo", &[]).unwrap(), "REPORT z_demo.");
}

#[test]
fn test_enhancement_prompt() {
    let generator = generator_with(echo_provider());

    let response = generator
        .generate_enhancement(
            "SAPMV45A",
            EnhancementType::EnhancementPoint,
            "Default the shipping condition",
            &[],
        )
        .unwrap();
    let user = split(&response).1;

    assert!(user.contains("- Base object: SAPMV45A"));
    assert!(user.contains("- Enhancement type: Enhancement Point"));
    assert!(user.contains("- Enhancement points: none specified"));
}

#[test]
fn test_sap_aware_alv_embeds_context() {
    let generator = generator_with(echo_provider());
    let context = "TABLE STRUCTURES:\nTable ZORDER:\n  - Key fields: MANDT, ORDER_ID\n";

    let response = generator
        .generate_sap_alv(
            "Orders per customer",
            &strings(&["ZORDER"]),
            &strings(&["ZCUSTOMER"]),
            context,
        )
        .unwrap();
    let user = split(&response).1;

    assert!(user.contains("Orders per customer"));
    assert!(user.contains("  - Key fields: MANDT, ORDER_ID"));
    assert!(user.contains("RELATED TABLES: ZCUSTOMER"));
    assert!(user.contains("- Tables involved: ZORDER"));

    let response = generator
        .generate_sap_alv("Orders", &strings(&["ZORDER"]), &[], context)
        .unwrap();
    assert!(split(&response).1.contains("RELATED TABLES: None"));
}

#[test]
fn test_sap_aware_report_and_class() {
    let generator = generator_with(echo_provider());

    let response = generator
        .generate_sap_report("Order backlog", &strings(&["ZORDER"]), "ANALYSIS SUMMARY:\n")
        .unwrap();
    let user = split(&response).1;
    assert!(user.contains("COMPLETE SAP ANALYSIS:\nANALYSIS SUMMARY:"));
    assert!(user.contains("- Tables involved: ZORDER"));

    let response = generator
        .generate_sap_class("Order repository", &strings(&["ZORDER"]), "TABLE STRUCTURES:\n")
        .unwrap();
    assert!(split(&response).1.contains("TABLES ACCESSED: ZORDER"));
}

#[test]
fn test_provider_failure_propagates() {
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("groq");
    provider.expect_default_model().return_const("llama");
    provider
        .expect_generate()
        .returning(|_| Err(AbapifyError::LlmApi("groq API error: HTTP 429".to_string())));
    let generator = generator_with(provider);

    let err = generator.generate_test("ZCL_X").unwrap_err();
    assert!(matches!(err, AbapifyError::LlmApi(_)));
}

#[test]
fn test_unknown_provider_override() {
    let generator = generator_with(echo_provider()).with_provider(Some("mistral".to_string()));
    let err = generator.generate_test("ZCL_X").unwrap_err();
    assert!(matches!(err, AbapifyError::LlmProviderNotFound(_)));
}

#[test]
fn test_generated_text_is_written_verbatim() {
    let generator = generator_with(echo_provider());
    let code = generator.generate_test("ZCL_PRICING").unwrap();

    let dir = TempDir::new().unwrap();
    let filename = default_filename("zcl_test_", "ZCL_PRICING", 20);
    let path = write_artifact(dir.path(), &filename, &code).unwrap();

    assert_eq!(path.file_name().unwrap(), "zcl_test_zcl_pricing.abap");
    assert_eq!(std::fs::read_to_string(path).unwrap(), code);
}
