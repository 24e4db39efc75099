use std::collections::HashMap;
use std::sync::Mutex;

use super::*;

/// Guards tests that mutate environment variables to prevent race conditions.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Variables read by [`Config::load`].
const LOAD_VARS: &[&str] = &[
    "GEMIBOT_CONFIG",
    "ALLOWED_USERS",
    "ALLOWED_GROUPS",
    "ADMIN_IDS",
    "LOG_CHAT_ID",
];

fn clear_load_vars() {
    for var in LOAD_VARS {
        // SAFETY: callers hold ENV_MUTEX.
        unsafe { std::env::remove_var(var) };
    }
}

fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |var: &str| map.get(var).cloned()
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.provider, "gemini");
    assert_eq!(config.gemini.api_key, None);
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
    assert_eq!(config.gemini.vision_model, "gemini-2.0-flash");
    assert_eq!(
        config.gemini.base_url,
        "https://generativelanguage.googleapis.com"
    );
    assert!(config.gemini.generation.is_empty());
    assert!(config.logging.is_none());
}

#[test]
fn test_parse_empty_toml() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_full_toml() {
    let toml = r#"
[gemini]
api_key = "AIza-test"
model = "gemini-1.5-pro"
vision_model = "gemini-1.5-flash"
system_prompt = "Be brief."

[gemini.generation]
temperature = 0.4
top_p = 0.9
top_k = 32
max_output_tokens = 2048

[[gemini.safety_settings]]
category = "HARM_CATEGORY_HARASSMENT"
threshold = "BLOCK_NONE"

[telegram]
token = "123:abc"
log_chat_id = -1001234
debug_mode = true
prompt_new_threshold = 4

[access]
admins = [42]
allowed_users = ["42", "alice"]
allowed_groups = ["*"]
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.gemini.api_key.as_deref(), Some("AIza-test"));
    assert_eq!(config.gemini.model, "gemini-1.5-pro");
    assert_eq!(config.gemini.vision_model, "gemini-1.5-flash");
    assert_eq!(config.gemini.system_prompt.as_deref(), Some("Be brief."));
    assert_eq!(config.gemini.generation.temperature, Some(0.4));
    assert_eq!(config.gemini.generation.top_k, Some(32));
    assert_eq!(config.gemini.generation.max_output_tokens, Some(2048));
    assert_eq!(config.gemini.safety_settings.len(), 1);
    assert_eq!(config.gemini.safety_settings[0].threshold, "BLOCK_NONE");
    assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
    assert_eq!(config.telegram.log_chat_id, Some(-1001234));
    assert!(config.telegram.debug_mode);
    assert_eq!(config.telegram.prompt_new_threshold, 4);
    assert_eq!(config.access.admins, vec![42]);
    assert_eq!(config.access.allowed_users, vec!["42", "alice"]);
    assert_eq!(config.access.allowed_groups, vec!["*"]);
}

#[test]
fn test_telegram_partial_defaults() {
    let toml = r#"
[telegram]
token = "123:abc"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.telegram.log_chat_id, None);
    assert!(!config.telegram.debug_mode);
    assert_eq!(config.telegram.prompt_new_threshold, 10);
}

#[test]
fn test_access_lists_accept_integer_ids() {
    let toml = r#"
[access]
allowed_users = ["alice", 42]
allowed_groups = [-1001234567]
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.access.allowed_users, vec!["alice", "42"]);
    assert_eq!(config.access.allowed_groups, vec!["-1001234567"]);
}

#[test]
fn test_access_lists_reject_other_types() {
    let result = toml::from_str::<Config>("[access]\nallowed_users = [true]\n");
    assert!(result.is_err());
}

#[test]
fn test_generation_config_serializes_camel_case() {
    let generation = GenerationConfig {
        temperature: Some(0.5),
        top_p: None,
        top_k: Some(40),
        max_output_tokens: Some(1024),
    };
    let json = serde_json::to_value(&generation).unwrap();
    assert_eq!(json["topK"], 40);
    assert_eq!(json["maxOutputTokens"], 1024);
    assert!(json.get("topP").is_none());
}

#[test]
fn test_load_from_path() {
    use std::io::Write;
    let path = std::env::temp_dir().join("gemibot_test_config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[gemini]\nmodel = \"gemini-test\"").unwrap();
    drop(file);

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.gemini.model, "gemini-test");

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_parse_invalid_toml() {
    use std::io::Write;
    let path = std::env::temp_dir().join("gemibot_invalid_config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, r#"invalid = ["#).unwrap();
    drop(file);

    let result = Config::load_from(&path);
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_load_from_nonexistent_file() {
    let result = Config::load_from("/nonexistent/path/config.toml");
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

#[test]
fn test_load_search_order_and_env_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_load_vars();

    let explicit = write_temp(
        "gemibot_load_explicit.toml",
        "[gemini]\nmodel = \"from-explicit\"\n\n[access]\nallowed_users = [\"alice\"]\n",
    );
    let from_env = write_temp(
        "gemibot_load_env.toml",
        "[gemini]\nmodel = \"from-env\"\n\n[telegram]\nlog_chat_id = -1\n",
    );

    // SAFETY: guarded by mutex.
    unsafe { std::env::set_var("GEMIBOT_CONFIG", &from_env) };

    // An explicit path beats GEMIBOT_CONFIG.
    let config = Config::load(Some(explicit.as_path())).unwrap();
    assert_eq!(config.gemini.model, "from-explicit");

    // Without one, GEMIBOT_CONFIG is used.
    let config = Config::load(None).unwrap();
    assert_eq!(config.gemini.model, "from-env");
    assert_eq!(config.telegram.log_chat_id, Some(-1));

    // Overrides are applied on top of the loaded file.
    // SAFETY: guarded by mutex.
    unsafe {
        std::env::set_var("ALLOWED_USERS", "bob, 7");
        std::env::set_var("LOG_CHAT_ID", "-100500");
    }
    let config = Config::load(Some(explicit.as_path())).unwrap();
    assert_eq!(config.gemini.model, "from-explicit");
    assert_eq!(config.access.allowed_users, vec!["bob", "7"]);
    assert_eq!(config.telegram.log_chat_id, Some(-100500));

    // A malformed override fails the load.
    // SAFETY: guarded by mutex.
    unsafe { std::env::set_var("ADMIN_IDS", "not-a-number") };
    let result = Config::load(Some(explicit.as_path()));

    clear_load_vars();
    std::fs::remove_file(&explicit).ok();
    std::fs::remove_file(&from_env).ok();
    assert!(matches!(
        result,
        Err(ConfigError::Env {
            var: "ADMIN_IDS",
            ..
        })
    ));
}

#[test]
fn test_load_explicit_missing_path_is_io_error() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_load_vars();
    let result = Config::load(Some(Path::new("/nonexistent/gemibot/config.toml")));
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

// Environment overrides.

#[test]
fn test_overrides_replace_access_lists() {
    let mut config = Config::default();
    config.access.allowed_users = vec!["old".to_string()];
    let lookup = lookup_from(&[
        ("ALLOWED_USERS", " 1, bob ,, @carol"),
        ("ALLOWED_GROUPS", "-100500"),
        ("ADMIN_IDS", "7,8"),
        ("LOG_CHAT_ID", "-1009"),
    ]);
    config.apply_overrides_from(lookup).unwrap();

    assert_eq!(config.access.allowed_users, vec!["1", "bob", "@carol"]);
    assert_eq!(config.access.allowed_groups, vec!["-100500"]);
    assert_eq!(config.access.admins, vec![7, 8]);
    assert_eq!(config.telegram.log_chat_id, Some(-1009));
}

#[test]
fn test_overrides_ignore_missing_and_empty() {
    let mut config = Config::default();
    config.access.allowed_users = vec!["kept".to_string()];
    config
        .apply_overrides_from(lookup_from(&[("ALLOWED_USERS", "  ")]))
        .unwrap();
    assert_eq!(config.access.allowed_users, vec!["kept"]);
    assert_eq!(config.telegram.log_chat_id, None);
}

#[test]
fn test_overrides_reject_bad_admin_id() {
    let mut config = Config::default();
    let result = config.apply_overrides_from(lookup_from(&[("ADMIN_IDS", "7,abc")]));
    assert!(matches!(result, Err(ConfigError::Env { var: "ADMIN_IDS", .. })));
}

#[test]
fn test_overrides_reject_bad_log_chat() {
    let mut config = Config::default();
    let result = config.apply_overrides_from(lookup_from(&[("LOG_CHAT_ID", "channel")]));
    assert!(matches!(
        result,
        Err(ConfigError::Env {
            var: "LOG_CHAT_ID",
            ..
        })
    ));
}

// System prompt resolution.

#[test]
fn test_resolve_system_prompt_from_file() {
    use std::io::Write;
    let path = std::env::temp_dir().join("gemibot_test_prompt.md");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "\n  You are a terse assistant.  \n\n").unwrap();
    drop(file);

    let mut config = Config::default();
    config.gemini.system_prompt_file = Some(path.to_str().unwrap().to_string());
    config.resolve_system_prompt().unwrap();

    assert_eq!(
        config.gemini.system_prompt.as_deref(),
        Some("You are a terse assistant.")
    );
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_resolve_system_prompt_inline_takes_priority() {
    let mut config = Config::default();
    config.gemini.system_prompt = Some("inline".to_string());
    config.gemini.system_prompt_file = Some("/nonexistent/prompt.md".to_string());
    config.resolve_system_prompt().unwrap();
    assert_eq!(config.gemini.system_prompt.as_deref(), Some("inline"));
}

#[test]
fn test_resolve_system_prompt_file_not_found() {
    let mut config = Config::default();
    config.gemini.system_prompt_file = Some("/nonexistent/prompt.md".to_string());
    let result = config.resolve_system_prompt();
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

// Logging section.

#[test]
fn test_config_without_logging_section() {
    let config: Config = toml::from_str("provider = \"gemini\"").unwrap();
    assert!(config.logging.is_none());
}

#[test]
fn test_config_with_logging_section() {
    let toml = r#"
[logging]
directory = "/var/log/gemibot"
max_files = 30
rotation = "hourly"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    let lc = config.logging.unwrap();
    assert_eq!(lc.directory, "/var/log/gemibot");
    assert_eq!(lc.max_files, 30);
    assert_eq!(lc.rotation, Rotation::Hourly);
}

#[test]
fn test_config_with_empty_logging_section() {
    let config: Config = toml::from_str("[logging]\n").unwrap();
    let lc = config.logging.unwrap();
    assert_eq!(lc, LoggingConfig::default());
    assert_eq!(lc.directory, "logs");
    assert_eq!(lc.max_files, 7);
    assert_eq!(lc.rotation, Rotation::Daily);
}

#[test]
fn test_rotation_deserialize_never() {
    let lc: LoggingConfig = toml::from_str("rotation = \"never\"").unwrap();
    assert_eq!(lc.rotation, Rotation::Never);
}
