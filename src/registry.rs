// src/registry.rs

//! Site id to crawler factory lookup.

use crate::config::Settings;
use crate::crawler::SiteCrawler;
use crate::error::{AppError, Result};
use crate::sites::{easylaw, law_open_api, lawtalk};

/// Builds a crawler for one site.
pub type CrawlerFactory = fn(&Settings) -> Result<Box<dyn SiteCrawler>>;

/// Every built-in site. Adding a site is one row here.
const SITES: &[(&str, CrawlerFactory)] = &[
    (easylaw::SITE, easylaw::create),
    (law_open_api::SITE, law_open_api::create),
    (lawtalk::SITE, lawtalk::create),
];

/// Table of known sites.
#[derive(Clone)]
pub struct Registry {
    entries: Vec<(&'static str, CrawlerFactory)>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self {
            entries: SITES.to_vec(),
        }
    }

    /// Factory for `site`, or `UnknownSite` listing the known ids.
    pub fn resolve(&self, site: &str) -> Result<CrawlerFactory> {
        self.entries
            .iter()
            .find(|(id, _)| *id == site)
            .map(|(_, factory)| *factory)
            .ok_or_else(|| AppError::UnknownSite {
                site: site.to_string(),
                available: self.list_available(),
            })
    }

    /// Known site ids, sorted.
    pub fn list_available(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.entries.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn create(&self, site: &str, settings: &Settings) -> Result<Box<dyn SiteCrawler>> {
        let factory = self.resolve(site)?;
        factory(settings)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
