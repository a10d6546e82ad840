// src/utils/otp.rs

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// Generates a 6-character uppercase hex OTP (3 random bytes).
pub fn generate_otp() -> String {
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{:02X}{:02X}{:02X}", bytes[0], bytes[1], bytes[2])
}

/// Expiry timestamp for an OTP issued now (1-hour validity window).
pub fn otp_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::hours(1)
}
