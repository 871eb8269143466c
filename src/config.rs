use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::device::{DeviceSettings, FacingMode};
use crate::model::check_in_record::Coordinates;
use crate::remote::HttpRemote;
use crate::service::ServiceSettings;
use crate::verification::HttpVerifier;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub stage_database_url: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Remote collaborators
    pub remote_api_url: String,
    pub remote_api_token: Option<String>,
    pub verifier_url: String,
    pub verifier_token: Option<String>,

    // Device
    pub camera_facing: FacingMode,
    pub device_frame_path: Option<PathBuf>,
    pub device_location: Option<Coordinates>,
    pub location_timeout_ms: u64,
    pub location_fix_delay_ms: u64,

    pub profile_cache_ttl_secs: u64,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_protected_per_min: u32,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow!("{name}={raw:?} is invalid: {e}"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let device_location = match (optional("DEVICE_LATITUDE"), optional("DEVICE_LONGITUDE")) {
            (Some(lat), Some(lng)) => {
                let lat: f64 = lat.parse().context("DEVICE_LATITUDE is not a number")?;
                let lng: f64 = lng.parse().context("DEVICE_LONGITUDE is not a number")?;
                Some(Coordinates::new(lat, lng))
            }
            (None, None) => None,
            _ => return Err(anyhow!("DEVICE_LATITUDE and DEVICE_LONGITUDE must be set together")),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            stage_database_url: env::var("STAGE_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://attendance_stage.db?mode=rwc".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            remote_api_url: required("REMOTE_API_URL")?,
            remote_api_token: optional("REMOTE_API_TOKEN"),
            verifier_url: required("VERIFIER_URL")?,
            verifier_token: optional("VERIFIER_TOKEN"),

            camera_facing: parsed("CAMERA_FACING", "user")?,
            device_frame_path: optional("DEVICE_FRAME_PATH").map(PathBuf::from),
            device_location,
            location_timeout_ms: parsed("LOCATION_TIMEOUT_MS", "10000")?,
            location_fix_delay_ms: parsed("LOCATION_FIX_DELAY_MS", "250")?,

            profile_cache_ttl_secs: parsed("PROFILE_CACHE_TTL_SECS", "3600")?,

            rate_attendance_per_min: parsed("RATE_ATTENDANCE_PER_MIN", "30")?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "600")?,
        })
    }

    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            frame_path: self.device_frame_path.clone(),
            location: self.device_location,
            fix_delay: Duration::from_millis(self.location_fix_delay_ms),
            ..DeviceSettings::default()
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            facing: self.camera_facing,
            location_timeout: Duration::from_millis(self.location_timeout_ms),
            profile_ttl: Duration::from_secs(self.profile_cache_ttl_secs),
            ..ServiceSettings::default()
        }
    }

    /// The verifier is a separate service and gets its own credentials.
    pub fn verifier(&self, http: reqwest::Client) -> HttpVerifier {
        HttpVerifier::new(http, &self.verifier_url, self.verifier_token.clone())
    }

    pub fn remote(&self, http: reqwest::Client) -> HttpRemote {
        HttpRemote::new(http, &self.remote_api_url, self.remote_api_token.clone())
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        stage_database_url: "sqlite::memory:".to_string(),
        api_prefix: "/api".to_string(),
        log_dir: "logs".to_string(),
        remote_api_url: "http://127.0.0.1:9".to_string(),
        remote_api_token: None,
        verifier_url: "http://127.0.0.1:9".to_string(),
        verifier_token: None,
        camera_facing: FacingMode::User,
        device_frame_path: None,
        device_location: None,
        location_timeout_ms: 10_000,
        location_fix_delay_ms: 0,
        profile_cache_ttl_secs: 60,
        rate_attendance_per_min: 1_000,
        rate_protected_per_min: 1_000,
    }
}
