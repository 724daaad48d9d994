// src/lib.rs

//! Legal consultation collector library

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod registry;
pub mod sites;
pub mod storage;
pub mod utils;
