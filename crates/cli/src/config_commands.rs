//! `abapify config` command group

use crate::prompt;
use crate::sap_commands;
use abapify_common::{ConfigStore, SapEnvironment, Settings};
use abapify_sap::PasswordCipher;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use std::collections::BTreeMap;

const PROVIDERS: [&str; 3] = ["arcee", "groq", "openai"];
const DEFAULT_TABLE_PATTERN: &str = "Z*";
const DEFAULT_TABLE_LIMIT: usize = 50;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set configuration values
    Set(SetArgs),

    /// Show the current configuration with secrets masked
    Show,

    /// Interactive first-time setup
    Setup,

    /// Configure the connection to an SAP environment
    Sap {
        /// SAP environment (DEV, QAS, PRD)
        #[arg(short, long, default_value = "DEV")]
        environment: SapEnvironment,
    },

    /// Test the connection to an SAP environment
    TestSap {
        #[arg(short, long, default_value = "DEV")]
        environment: SapEnvironment,
    },

    /// List custom tables of an SAP environment
    ListSapTables {
        #[arg(short, long, default_value = "DEV")]
        environment: SapEnvironment,

        /// Table name pattern, `*` as wildcard
        #[arg(short, long, default_value = DEFAULT_TABLE_PATTERN)]
        pattern: String,

        /// Maximum number of tables
        #[arg(short, long, default_value_t = DEFAULT_TABLE_LIMIT)]
        limit: usize,
    },
}

#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// Default LLM provider
    #[arg(long, value_parser = PROVIDERS)]
    pub provider: Option<String>,

    /// Arcee API token
    #[arg(long)]
    pub arcee_token: Option<String>,

    /// Groq API key
    #[arg(long)]
    pub groq_key: Option<String>,

    /// OpenAI API key
    #[arg(long)]
    pub openai_key: Option<String>,

    /// Default output directory
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Default temperature (0.0-1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Default maximum number of tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn run(command: ConfigCommands, store: &ConfigStore, settings: &Settings) -> Result<()> {
    match command {
        ConfigCommands::Set(args) => set(store, args),
        ConfigCommands::Show => {
            show(store, settings);
            Ok(())
        }
        ConfigCommands::Setup => setup(store),
        ConfigCommands::Sap { environment } => configure_sap(store, settings, environment),
        ConfigCommands::TestSap { environment } => test_sap(settings, environment),
        ConfigCommands::ListSapTables {
            environment,
            pattern,
            limit,
        } => {
            let client = sap_commands::connect(settings, environment)?;
            let result = sap_commands::list_tables(&client, &pattern, limit);
            client.close();
            result.map(|_| ())
        }
    }
}

/// Translate `config set` flags into store updates
fn set_updates(args: SetArgs) -> Result<BTreeMap<String, String>> {
    let mut updates = BTreeMap::new();

    if let Some(temperature) = args.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            bail!("Temperature must be between 0.0 and 1.0, got {}", temperature);
        }
        updates.insert("DEFAULT_TEMPERATURE".to_string(), temperature.to_string());
    }
    if let Some(max_tokens) = args.max_tokens {
        if max_tokens == 0 {
            bail!("Max tokens must be a positive number");
        }
        updates.insert("DEFAULT_MAX_TOKENS".to_string(), max_tokens.to_string());
    }

    let values = [
        ("DEFAULT_PROVIDER", args.provider),
        ("ARCEE_TOKEN", args.arcee_token),
        ("GROQ_API_KEY", args.groq_key),
        ("OPENAI_API_KEY", args.openai_key),
        ("OUTPUT_DIR", args.output_dir),
        ("LOG_LEVEL", args.log_level),
    ];
    for (key, value) in values {
        if let Some(value) = value {
            updates.insert(key.to_string(), value);
        }
    }

    Ok(updates)
}

fn set(store: &ConfigStore, args: SetArgs) -> Result<()> {
    let updates = set_updates(args)?;
    if updates.is_empty() {
        println!("{} No settings changed", "⚠".yellow());
        return Ok(());
    }

    store.update(&updates).context("Failed to save configuration")?;
    for key in updates.keys() {
        println!("{} {} updated", "✓".green(), display_name(key));
    }
    Ok(())
}

/// `DEFAULT_MAX_TOKENS` → `Default Max Tokens`
fn display_name(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn show(store: &ConfigStore, settings: &Settings) {
    println!("{}", "ABAPify configuration".bold());
    println!("Config file: {}\n", store.path().display().to_string().cyan());

    for (key, value) in settings.masked() {
        let value = if value == "not configured" {
            value.dimmed().to_string()
        } else {
            value
        };
        println!("  {:<25} {}", display_name(&key).cyan(), value);
    }
}

fn setup(store: &ConfigStore) -> Result<()> {
    println!("{}\n", "ABAPify setup".bold().blue());

    let mut updates = BTreeMap::new();

    let provider = prompt::select("Default LLM provider", PROVIDERS.to_vec())?;
    updates.insert("DEFAULT_PROVIDER".to_string(), provider.to_string());

    let credential_key = match provider {
        "arcee" => "ARCEE_TOKEN",
        "groq" => "GROQ_API_KEY",
        _ => "OPENAI_API_KEY",
    };
    let credential = prompt::password(&format!("{} credential", provider))?;
    if !credential.trim().is_empty() {
        updates.insert(credential_key.to_string(), credential.trim().to_string());
    }

    if prompt::confirm("Configure advanced options?", false)? {
        let output_dir = prompt::text_or("Output directory", "./output")?;
        updates.insert("OUTPUT_DIR".to_string(), output_dir);

        let temperature = prompt::text_or("Temperature (0.0-1.0)", "0.7")?;
        match temperature.parse::<f32>() {
            Ok(t) if (0.0..=1.0).contains(&t) => {
                updates.insert("DEFAULT_TEMPERATURE".to_string(), temperature);
            }
            _ => println!("{} Invalid temperature, keeping the default (0.7)", "⚠".yellow()),
        }

        let max_tokens = prompt::text_or("Max tokens", "4096")?;
        match max_tokens.parse::<u32>() {
            Ok(n) if n > 0 => {
                updates.insert("DEFAULT_MAX_TOKENS".to_string(), n.to_string());
            }
            _ => println!("{} Invalid token count, keeping the default (4096)", "⚠".yellow()),
        }
    }

    store.update(&updates).context("Failed to save configuration")?;
    println!("\n{} Setup complete", "✓".green());
    println!("Run {} to review the settings", "abapify config show".cyan());
    Ok(())
}

fn configure_sap(
    store: &ConfigStore,
    settings: &Settings,
    environment: SapEnvironment,
) -> Result<()> {
    println!("{}\n", format!("SAP {} connection", environment).bold().blue());

    let current = |field: &str| {
        settings
            .sap_value(environment, field)
            .unwrap_or_default()
            .to_string()
    };
    let mut updates = BTreeMap::new();
    let mut put = |field: &str, value: String| {
        updates.insert(environment.key(field), value);
    };

    let connection_type = prompt::select("Connection type", vec!["RFC", "HTTP"])?;
    put("CONNECTION_TYPE", connection_type.to_string());

    if connection_type == "RFC" {
        put("ASHOST", prompt::text_or("Application server host", &current("ASHOST"))?);
        put("SYSNR", prompt::text_or("System number", &current("SYSNR"))?);
    } else {
        put("BASE_URL", prompt::text_or("Base URL", &current("BASE_URL"))?);
    }
    put("CLIENT", prompt::text_or("Client", &current("CLIENT"))?);
    put("USER", prompt::text_or("User", &current("USER"))?);
    let language = match current("LANGUAGE") {
        language if language.is_empty() => "EN".to_string(),
        language => language,
    };
    put("LANGUAGE", prompt::text_or("Logon language", &language)?);
    if let Some(router) = prompt::optional_text("SAProuter string")? {
        put("SAPROUTER", router);
    }

    let password = prompt::password("Password")?;
    if !password.is_empty() {
        let cipher = PasswordCipher::from_settings(settings)?;
        put("PASSWD_ENCRYPTED", cipher.encrypt(&password));
        if settings.encryption_key.as_deref() != Some(cipher.key()) {
            updates.insert("SAP_ENCRYPTION_KEY".to_string(), cipher.key().to_string());
        }
    }

    store.update(&updates).context("Failed to save SAP configuration")?;
    println!("\n{} SAP {} configured", "✓".green(), environment);
    println!("Run {} to check it", format!("abapify config test-sap -e {}", environment).cyan());
    Ok(())
}

fn test_sap(settings: &Settings, environment: SapEnvironment) -> Result<()> {
    println!("{} Testing SAP {} connection", "→".cyan(), environment);

    let client = sap_commands::connect(settings, environment)?;
    let status = client.test_connection();

    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    println!("  {} RFC", mark(status.rfc));
    println!("  {} HTTP", mark(status.http));

    let result = if status.rfc || status.http {
        client.system_info().map(|info| {
            println!("\n{}", "System information".bold());
            println!("  System ID:  {}", info.system_id);
            println!("  Client:     {}", info.client);
            println!("  User:       {}", info.user);
            println!("  Language:   {}", info.language);
            println!("  Host:       {}", info.hostname);
            println!("  Release:    {}", info.system_release);
            println!("  Database:   {}", info.database_system);
        })
    } else {
        client.close();
        bail!("SAP {} is unreachable", environment);
    };

    client.close();
    result.context("Failed to read system information")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("DEFAULT_MAX_TOKENS"), "Default Max Tokens");
        assert_eq!(display_name("GROQ_API_KEY"), "Groq Api Key");
    }

    #[test]
    fn test_set_updates() {
        let updates = set_updates(SetArgs {
            provider: Some("groq".to_string()),
            temperature: Some(0.3),
            max_tokens: Some(2048),
            ..SetArgs::default()
        })
        .unwrap();

        assert_eq!(updates["DEFAULT_PROVIDER"], "groq");
        assert_eq!(updates["DEFAULT_TEMPERATURE"], "0.3");
        assert_eq!(updates["DEFAULT_MAX_TOKENS"], "2048");
        assert_eq!(updates.len(), 3);
    }

    #[test]
    fn test_set_rejects_temperature_out_of_range() {
        let err = set_updates(SetArgs {
            temperature: Some(1.5),
            ..SetArgs::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("between 0.0 and 1.0"));
    }

    #[test]
    fn test_set_writes_store() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(".env"));

        set(
            &store,
            SetArgs {
                groq_key: Some("gsk_1234567890".to_string()),
                output_dir: Some("./abap".to_string()),
                ..SetArgs::default()
            },
        )
        .unwrap();

        let values = store.load().unwrap();
        assert_eq!(values["GROQ_API_KEY"], "gsk_1234567890");
        assert_eq!(values["OUTPUT_DIR"], "./abap");

        let settings = Settings::from_values(values).unwrap();
        assert_eq!(settings.llm.credential("groq"), Some("gsk_1234567890"));
    }

    #[test]
    fn test_empty_set_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(".env"));

        set(&store, SetArgs::default()).unwrap();
        assert!(!store.path().exists());
    }
}
