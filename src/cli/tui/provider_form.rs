use serde_json::{json, Map, Value};
use toml_edit::{value, DocumentMut, Item, Table};

use crate::app_config::AppType;
use crate::provider::{generate_provider_id, Provider};

use super::form::{FieldKey, FormField, FormState};

const CLAUDE_MODELS: &[&str] = &["claude-sonnet-4-5", "claude-opus-4-1", "claude-haiku-4-5"];
const CODEX_MODELS: &[&str] = &["gpt-5-codex", "gpt-5", "o3"];
const GEMINI_MODELS: &[&str] = &["gemini-2.5-pro", "gemini-2.5-flash"];
const REASONING_EFFORTS: &[&str] = &["low", "medium", "high"];
const DEFAULT_REASONING_EFFORT: &str = "medium";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    Add,
    Edit { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderForm {
    pub app: AppType,
    pub kind: FormKind,
    pub state: FormState,
}

/// Where a new form takes its initial values from.
pub enum FormSeed<'a> {
    Existing(&'a Provider),
    Copy(&'a Provider),
    /// Blank fields, optionally pre-filled from the tool's live config.
    Defaults(Option<&'a Value>),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Extracted {
    api_key: String,
    base_url: String,
    model: String,
    reasoning_effort: String,
}

fn fields_for(app: AppType) -> Vec<FormField> {
    let models = match app {
        AppType::Claude => CLAUDE_MODELS,
        AppType::Codex => CODEX_MODELS,
        AppType::Gemini => GEMINI_MODELS,
    };
    let mut fields = vec![
        FormField::text(FieldKey::Name, "Name", true),
        FormField::text(FieldKey::ApiKey, "API Key", true),
        FormField::text(FieldKey::BaseUrl, "Base URL", true),
        FormField::text(FieldKey::Model, "Model", app == AppType::Codex).with_options(models),
    ];
    if app == AppType::Codex {
        fields.push(
            FormField::text(FieldKey::ReasoningEffort, "Reasoning Effort", true)
                .with_options(REASONING_EFFORTS)
                .read_only(),
        );
    }
    fields
}

pub fn init_form(app: AppType, kind: FormKind, seed: FormSeed<'_>) -> ProviderForm {
    let mut state = FormState::new(fields_for(app));

    let (name, extracted) = match seed {
        FormSeed::Existing(provider) => (
            provider.name.clone(),
            extract(app, &provider.settings_config),
        ),
        FormSeed::Copy(provider) => (
            format!("{} copy", provider.name),
            extract(app, &provider.settings_config),
        ),
        FormSeed::Defaults(live) => (
            String::new(),
            live.map(|v| extract(app, v)).unwrap_or_default(),
        ),
    };

    state.set_value(FieldKey::Name, name);
    state.set_value(FieldKey::ApiKey, extracted.api_key);
    state.set_value(FieldKey::BaseUrl, extracted.base_url);
    state.set_value(FieldKey::Model, extracted.model);
    if app == AppType::Codex {
        let effort = if extracted.reasoning_effort.is_empty() {
            DEFAULT_REASONING_EFFORT.to_string()
        } else {
            extracted.reasoning_effort
        };
        state.set_value(FieldKey::ReasoningEffort, effort);
    }

    ProviderForm { app, kind, state }
}

fn env_str(settings: &Value, key: &str) -> String {
    settings
        .get("env")
        .and_then(|env| env.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn extract(app: AppType, settings: &Value) -> Extracted {
    match app {
        AppType::Claude => Extracted {
            api_key: env_str(settings, "ANTHROPIC_AUTH_TOKEN"),
            base_url: env_str(settings, "ANTHROPIC_BASE_URL"),
            model: env_str(settings, "ANTHROPIC_MODEL"),
            reasoning_effort: String::new(),
        },
        AppType::Gemini => Extracted {
            api_key: env_str(settings, "GEMINI_API_KEY"),
            base_url: env_str(settings, "GOOGLE_GEMINI_BASE_URL"),
            model: env_str(settings, "GEMINI_MODEL"),
            reasoning_effort: String::new(),
        },
        AppType::Codex => {
            let api_key = settings
                .get("auth")
                .and_then(|auth| auth.get("OPENAI_API_KEY"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let doc = settings
                .get("config")
                .and_then(Value::as_str)
                .and_then(|text| text.parse::<DocumentMut>().ok())
                .unwrap_or_default();
            let top = |key: &str| {
                doc.get(key)
                    .and_then(Item::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let provider_key = top("model_provider");
            let base_url = doc
                .get("model_providers")
                .and_then(|providers| providers.get(&provider_key))
                .and_then(|p| p.get("base_url"))
                .and_then(Item::as_str)
                .unwrap_or_default()
                .to_string();
            Extracted {
                api_key,
                base_url,
                model: top("model"),
                reasoning_effort: top("model_reasoning_effort"),
            }
        }
    }
}

/// Missing required field message, checked in field order.
pub fn validate(state: &FormState) -> Result<(), String> {
    match state.first_missing_required() {
        Some(field) => Err(format!("{} is required", field.label)),
        None => Ok(()),
    }
}

/// Builds the provider to save. Edits keep every setting the form does not own.
pub fn build_provider(
    form: &ProviderForm,
    existing_ids: &[String],
    existing: Option<&Provider>,
) -> Provider {
    let state = &form.state;
    let name = state.value(FieldKey::Name).to_string();
    let id = match (&form.kind, existing) {
        (FormKind::Edit { id }, _) => id.clone(),
        (FormKind::Add, _) => generate_provider_id(&name, existing_ids),
    };
    let base = existing.map(|p| &p.settings_config);
    let settings_config = build_settings(form.app, &id, state, base);

    match existing {
        Some(prev) => Provider {
            name,
            settings_config,
            ..prev.clone()
        },
        None => Provider::with_id(id, name, settings_config, None),
    }
}

fn set_or_remove(env: &mut Map<String, Value>, key: &str, value: &str) {
    if value.is_empty() {
        env.remove(key);
    } else {
        env.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn build_settings(app: AppType, id: &str, state: &FormState, base: Option<&Value>) -> Value {
    let mut settings = base
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}));
    let api_key = state.value(FieldKey::ApiKey);
    let base_url = state.value(FieldKey::BaseUrl);
    let model = state.value(FieldKey::Model);

    let env_keys = match app {
        AppType::Claude => Some(["ANTHROPIC_AUTH_TOKEN", "ANTHROPIC_BASE_URL", "ANTHROPIC_MODEL"]),
        AppType::Gemini => Some(["GEMINI_API_KEY", "GOOGLE_GEMINI_BASE_URL", "GEMINI_MODEL"]),
        AppType::Codex => None,
    };

    if let (Some([key_k, url_k, model_k]), Some(obj)) = (env_keys, settings.as_object_mut()) {
        let env = obj.entry("env").or_insert_with(|| json!({}));
        if !env.is_object() {
            *env = json!({});
        }
        if let Some(env) = env.as_object_mut() {
            set_or_remove(env, key_k, api_key);
            set_or_remove(env, url_k, base_url);
            set_or_remove(env, model_k, model);
        }
        return settings;
    }

    let effort = state.value(FieldKey::ReasoningEffort);
    let existing_config = settings
        .get("config")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let config = codex_config(
        &existing_config,
        id,
        state.value(FieldKey::Name),
        base_url,
        model,
        effort,
    );

    if let Some(obj) = settings.as_object_mut() {
        let auth = obj.entry("auth").or_insert_with(|| json!({}));
        if !auth.is_object() {
            *auth = json!({});
        }
        if let Some(auth) = auth.as_object_mut() {
            auth.insert("OPENAI_API_KEY".into(), Value::String(api_key.to_string()));
        }
        obj.insert("config".into(), Value::String(config));
    }
    settings
}

fn codex_config(
    existing: &str,
    provider_key: &str,
    name: &str,
    base_url: &str,
    model: &str,
    effort: &str,
) -> String {
    let mut doc = existing.parse::<DocumentMut>().unwrap_or_default();
    doc["model_provider"] = value(provider_key);
    doc["model"] = value(model);
    doc["model_reasoning_effort"] = value(effort);

    if !doc.contains_table("model_providers") {
        let mut providers = Table::new();
        providers.set_implicit(true);
        doc.insert("model_providers", Item::Table(providers));
    }
    if let Some(providers) = doc["model_providers"].as_table_mut() {
        let mut entry = providers
            .get(provider_key)
            .and_then(Item::as_table)
            .cloned()
            .unwrap_or_default();
        entry["name"] = value(name);
        entry["base_url"] = value(base_url);
        if !entry.contains_key("wire_api") {
            entry["wire_api"] = value("responses");
        }
        providers.insert(provider_key, Item::Table(entry));
    }
    doc.to_string()
}
