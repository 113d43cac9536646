//! HTTP request handlers

pub mod health;
pub mod sensitive_data;
pub mod tenants;
pub mod token;
