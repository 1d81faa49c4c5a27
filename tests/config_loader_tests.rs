use sakina::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const STRONG_SECRET: &str = "0123456789abcdef0123456789abcdef";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("SAKINA_PROFILE");
        env::remove_var("SAKINA_API_BIND_ADDR");
        env::remove_var("SAKINA_LOG_LEVEL");
        env::remove_var("SAKINA_JWT_SECRET");
        env::remove_var("SAKINA_DEFAULT_MARGIN_PERCENT");
        env::remove_var("SAKINA_CURRENCY");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path())).files_only();
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.currency, "SAR");
    assert_eq!(cfg.default_margin_percent, 10.0);
    // Local profile falls back to a development secret.
    assert!(!cfg.jwt_secret.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "SAKINA_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "SAKINA_API_BIND_ADDR=192.168.0.10:5000\nSAKINA_CURRENCY=usd\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "SAKINA_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "SAKINA_PROFILE=test\nSAKINA_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path())).files_only();
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.currency, "USD");
}

#[test]
fn production_requires_jwt_secret() {
    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "SAKINA_PROFILE=production\n");

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path())).files_only();
    let err = loader.load().expect_err("missing secret should fail");
    assert!(matches!(err, ConfigError::MissingJwtSecret));

    write_env_file(
        &temp_dir,
        ".env.production",
        &format!("SAKINA_JWT_SECRET={}\n", STRONG_SECRET),
    );
    let cfg = loader.load().expect("strong secret accepted");
    assert_eq!(cfg.jwt_secret, STRONG_SECRET);
}

#[test]
fn out_of_range_margin_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "SAKINA_DEFAULT_MARGIN_PERCENT=-3\n");

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path())).files_only();
    let err = loader.load().expect_err("negative margin should fail");
    assert!(matches!(err, ConfigError::InvalidDefaultMargin { .. }));
}

#[test]
fn non_numeric_margin_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "SAKINA_DEFAULT_MARGIN_PERCENT=ten\n");

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path())).files_only();
    let err = loader.load().expect_err("non-numeric margin should fail");
    assert!(format!("{}", err).contains("DEFAULT_MARGIN_PERCENT"));
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "SAKINA_API_BIND_ADDR=127.0.0.1:3000\n");

    unsafe {
        env::set_var("SAKINA_API_BIND_ADDR", "0.0.0.0:9090");
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("SAKINA_API_BIND_ADDR", "not-an-addr");
    }
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}
