use blog_api::{
    AppConfig,
    config::{ConfigError, Env},
};
use serial_test::serial;
use std::{env, panic, time::Duration};

const VARS: [&str; 6] = [
    "APP_ENV",
    "DATABASE_URL",
    "TOKEN_KEY",
    "TOKEN_EXPIRE_SECS",
    "PORT",
    "DB_MAX_CONNECTIONS",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` against a clean slate of the config variables, restoring the
/// originals afterwards even when the test panics.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> =
        VARS.iter().map(|&var| (var, env::var(var).ok())).collect();

    unsafe {
        for var in VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original) in originals {
        unsafe {
            match original {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

const STRONG_KEY: &str = "0123456789abcdef0123456789abcdef-prod";

#[test]
#[serial]
fn test_local_defaults() {
    let config = run_with_env(&[("DATABASE_URL", "postgres://u:p@localhost/blog")], || {
        AppConfig::load().unwrap()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.port, 8080);
    assert_eq!(config.db_max_connections, 5);
    assert_eq!(config.token_expiry, Duration::from_secs(3600));
    assert!(!config.token_key.is_empty());
}

#[test]
#[serial]
fn test_database_url_is_always_required() {
    let result = run_with_env(&[], AppConfig::load);
    assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
}

#[test]
#[serial]
fn test_production_requires_token_key() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/blog"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::Missing("TOKEN_KEY"))));
}

#[test]
#[serial]
fn test_production_rejects_short_token_key() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/blog"),
            ("TOKEN_KEY", "short"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::WeakTokenKey)));
}

#[test]
#[serial]
fn test_production_with_overrides() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/blog"),
            ("TOKEN_KEY", STRONG_KEY),
            ("TOKEN_EXPIRE_SECS", "600"),
            ("PORT", "9000"),
            ("DB_MAX_CONNECTIONS", "20"),
        ],
        || AppConfig::load().unwrap(),
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.token_key, STRONG_KEY);
    assert_eq!(config.token_expiry, Duration::from_secs(600));
    assert_eq!(config.port, 9000);
    assert_eq!(config.db_max_connections, 20);
}

#[test]
#[serial]
fn test_malformed_number_is_reported() {
    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@localhost/blog"),
            ("PORT", "eighty"),
        ],
        AppConfig::load,
    );
    assert!(matches!(
        result,
        Err(ConfigError::InvalidNumber { name: "PORT", .. })
    ));
}
