//! Site crawlers, one module per source.

pub mod easylaw;
pub mod law_open_api;
pub mod lawtalk;
