//! # azdash-cli
//!
//! Terminal dashboard for the azdash API.
//!
//! - Dashboard, users, audit log and health views
//! - Sign-in through the identity provider the backend advertises
//! - APIM base-URL override storage
//! - Config file management

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;
pub mod error;
pub mod render;
pub mod storage;

pub use error::{Error, Result};
