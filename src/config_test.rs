use std::sync::{Mutex, MutexGuard};

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that touch the process environment.
fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// # Safety
/// Callers must hold [`env_lock`].
unsafe fn clear_portal_env() {
    unsafe {
        std::env::remove_var("PORTAL_API_BASE_URL");
        std::env::remove_var("PORTAL_STATE_DIR");
        std::env::remove_var("PORTAL_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("PORTAL_CONNECT_TIMEOUT_SECS");
    }
}

#[test]
fn from_env_uses_defaults() {
    let _env = env_lock();
    unsafe { clear_portal_env() };

    let cfg = PortalConfig::from_env().unwrap();
    assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(cfg.state_dir, PathBuf::from(DEFAULT_STATE_DIR));
    assert_eq!(cfg.timeouts, Timeouts::default());
    assert_eq!(cfg.session_file(), PathBuf::from(".eduportal/session.json"));
}

#[test]
fn from_env_parses_overrides() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("PORTAL_API_BASE_URL", "https://edu.example.test/api/");
        std::env::set_var("PORTAL_STATE_DIR", "/tmp/portal-state");
        std::env::set_var("PORTAL_REQUEST_TIMEOUT_SECS", "45");
        std::env::set_var("PORTAL_CONNECT_TIMEOUT_SECS", " 5 ");
    }

    let cfg = PortalConfig::from_env().unwrap();
    assert_eq!(cfg.api_base_url, "https://edu.example.test/api");
    assert_eq!(cfg.state_dir, PathBuf::from("/tmp/portal-state"));
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 45, connect_secs: 5 });
    assert_eq!(cfg.timeouts.request(), Duration::from_secs(45));

    unsafe { clear_portal_env() };
}

#[test]
fn from_env_rejects_zero_timeout() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("PORTAL_REQUEST_TIMEOUT_SECS", "0");
    }

    let err = PortalConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("PORTAL_REQUEST_TIMEOUT_SECS"));

    unsafe { clear_portal_env() };
}

#[test]
fn from_env_rejects_non_numeric_timeout() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("PORTAL_CONNECT_TIMEOUT_SECS", "soon");
    }

    assert!(PortalConfig::from_env().is_err());

    unsafe { clear_portal_env() };
}

#[test]
fn for_base_url_rejects_non_http_urls() {
    assert!(PortalConfig::for_base_url("ftp://files.example.test", "state").is_err());
    assert!(PortalConfig::for_base_url("localhost:8080", "state").is_err());
}

#[test]
fn for_base_url_trims_trailing_slash() {
    let cfg = PortalConfig::for_base_url("http://127.0.0.1:9000/api//", "state").unwrap();
    assert_eq!(cfg.api_base_url, "http://127.0.0.1:9000/api");
    assert_eq!(cfg.state_dir, PathBuf::from("state"));
}
