//! Middleware modules

pub mod cors;
