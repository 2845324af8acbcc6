use super::*;

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn strips_trailing_slashes() {
    assert_eq!(normalize_base_url("http://api.local:9000///"), "http://api.local:9000");
    assert_eq!(normalize_base_url("  https://x.test/api/ "), "https://x.test/api");
}

#[test]
fn empty_base_url_falls_back_to_default() {
    assert_eq!(normalize_base_url("   "), DEFAULT_API_BASE_URL);
    assert_eq!(normalize_base_url("/"), DEFAULT_API_BASE_URL);
}

#[test]
fn defaults_when_nothing_is_configured() {
    let settings = load_settings_from(Path::new("definitely/not/here.toml"), env_of(&[]));
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.api_base_url, "http://localhost:8000");
    assert_eq!(settings.sample_every, Some(15));
}

#[test]
fn env_overrides_file_and_prefixed_key_wins() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("analyzer_settings_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("analyzer.toml");
    fs::write(
        &path,
        "api_base_url = \"http://file.local/\"\nsample_every = 5\nrequest_timeout_secs = 30\n",
    )
    .expect("write settings");

    let from_file = load_settings_from(&path, env_of(&[]));
    assert_eq!(from_file.api_base_url, "http://file.local");
    assert_eq!(from_file.sample_every, Some(5));
    assert_eq!(from_file.request_timeout_secs, 30);

    let layered = load_settings_from(
        &path,
        env_of(&[
            ("API_BASE_URL", "http://plain.env/"),
            ("APP__API_BASE_URL", "http://prefixed.env/"),
            ("APP__SAMPLE_EVERY", "0"),
        ]),
    );
    assert_eq!(layered.api_base_url, "http://prefixed.env");
    assert_eq!(layered.sample_every, None);
    assert_eq!(layered.request_timeout_secs, 30);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn invalid_env_numbers_are_ignored() {
    let settings = load_settings_from(
        Path::new("missing.toml"),
        env_of(&[("APP__REQUEST_TIMEOUT_SECS", "soon")]),
    );
    assert_eq!(settings.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn malformed_toml_is_an_error() {
    let mut settings = ClientSettings::default();
    let err = settings.apply_toml("api_base_url = [").expect_err("must fail");
    assert!(err.to_string().contains("failed to parse client settings toml"));
}
