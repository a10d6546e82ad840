// src/utils/mod.rs

pub mod email;
pub mod hash;
pub mod jwt;
pub mod otp;
pub mod upload;
