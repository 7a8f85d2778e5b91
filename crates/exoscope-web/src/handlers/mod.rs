//! HTTP handlers for all web routes.

pub mod pages;
pub mod predict;
pub mod upload;
pub mod health;
