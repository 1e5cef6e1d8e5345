//! Prompt template loading and rendering

use abapify_common::{AbapifyError, Result};
use std::collections::HashMap;
use tera::{Context, Tera, Value};

/// Rendered in place of an empty list
const EMPTY_LIST: &str = "none specified";

const TEMPLATES: [(&str, &str); 13] = [
    ("system_enhanced", include_str!("../templates/system_enhanced.tera")),
    ("system_simple", include_str!("../templates/system_simple.tera")),
    ("alv", include_str!("../templates/alv.tera")),
    ("report", include_str!("../templates/report.tera")),
    ("class", include_str!("../templates/class.tera")),
    ("function_module", include_str!("../templates/function_module.tera")),
    ("structure", include_str!("../templates/structure.tera")),
    ("test", include_str!("../templates/test.tera")),
    ("custom_program", include_str!("../templates/custom_program.tera")),
    ("enhancement", include_str!("../templates/enhancement.tera")),
    ("sap_alv", include_str!("../templates/sap_alv.tera")),
    ("sap_report", include_str!("../templates/sap_report.tera")),
    ("sap_class", include_str!("../templates/sap_class.tera")),
];

/// Renders system and user prompts from the embedded templates
pub struct PromptAssembler {
    tera: Tera,
}

impl PromptAssembler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tera: load_templates()?,
        })
    }

    /// System prompt, stamped with today's date
    pub fn system_prompt(&self, enhanced: bool, date: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("date", date);
        context.insert("version", env!("CARGO_PKG_VERSION"));

        let name = if enhanced {
            "system_enhanced"
        } else {
            "system_simple"
        };
        self.render(name, &context)
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            AbapifyError::Generation(format!("Failed to render {} prompt: {:?}", template, e))
        })
    }
}

/// Load all templates
fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("abap_list", abap_list_filter);

    for (name, source) in TEMPLATES {
        tera.add_raw_template(name, source).map_err(|e| {
            AbapifyError::Generation(format!("Failed to load {} template: {}", name, e))
        })?;
    }

    Ok(tera)
}

/// Filter joining a list with `, `, or naming its absence
fn abap_list_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let joined = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        _ => return Err(tera::Error::msg("abap_list filter expects a list or a string")),
    };

    if joined.is_empty() {
        Ok(Value::String(EMPTY_LIST.to_string()))
    } else {
        Ok(Value::String(joined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_templates_load() {
        let prompts = PromptAssembler::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(prompts.tera.get_template_names().any(|n| n == name));
        }
    }

    #[test]
    fn test_abap_list_filter() {
        let args = HashMap::new();
        assert_eq!(
            abap_list_filter(&json!(["MARA", " MARC "]), &args).unwrap(),
            json!("MARA, MARC")
        );
        assert_eq!(abap_list_filter(&json!([]), &args).unwrap(), json!(EMPTY_LIST));
        assert_eq!(abap_list_filter(&json!(""), &args).unwrap(), json!(EMPTY_LIST));
        assert!(abap_list_filter(&json!(3), &args).is_err());
    }

    #[test]
    fn test_system_prompt_is_dated() {
        let prompts = PromptAssembler::new().unwrap();

        let enhanced = prompts.system_prompt(true, "2024-05-01").unwrap();
        assert!(enhanced.contains("Generation date: 2024-05-01"));
        assert!(enhanced.contains("CL_SALV_TABLE"));

        let simple = prompts.system_prompt(false, "2024-05-01").unwrap();
        assert!(simple.contains("Generation date: 2024-05-01"));
        assert!(simple.len() < enhanced.len());
    }

    #[test]
    fn test_missing_variable_is_generation_error() {
        let prompts = PromptAssembler::new().unwrap();
        let err = prompts.render("alv", &Context::new()).unwrap_err();
        assert!(matches!(err, AbapifyError::Generation(_)));
    }
}
