//! Application state.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::certification::Technician;
use crate::consts::collections;
use crate::entity::RecordId;
use crate::quote::Quote;
use crate::report::ServiceReport;
use crate::site::{ConveyorAsset, Site};

/// The top level data structure: everything the app mirrors from the store.
///
/// Collections are ordered maps keyed by document id so iteration order is
/// stable for list views and for the cache file on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub sites: BTreeMap<RecordId, Site>,
    pub technicians: BTreeMap<RecordId, Technician>,
    pub reports: BTreeMap<RecordId, ServiceReport>,
    pub quotes: BTreeMap<RecordId, Quote>,
}

impl Workspace {
    pub fn site(&self, id: &RecordId) -> Option<&Site> {
        self.sites.get(id)
    }

    pub fn site_mut(&mut self, id: &RecordId) -> Option<&mut Site> {
        self.sites.get_mut(id)
    }

    pub fn asset(&self, site: &RecordId, asset: &RecordId) -> Option<&ConveyorAsset> {
        self.sites.get(site).and_then(|s| s.asset(asset))
    }

    pub fn asset_mut(&mut self, site: &RecordId, asset: &RecordId) -> Option<&mut ConveyorAsset> {
        self.sites.get_mut(site).and_then(|s| s.asset_mut(asset))
    }

    pub fn upsert_site(&mut self, site: Site) {
        self.sites.insert(site.id.clone(), site);
    }

    pub fn upsert_technician(&mut self, technician: Technician) {
        self.technicians.insert(technician.id.clone(), technician);
    }

    pub fn upsert_report(&mut self, report: ServiceReport) {
        self.reports.insert(report.id.clone(), report);
    }

    pub fn upsert_quote(&mut self, quote: Quote) {
        self.quotes.insert(quote.id.clone(), quote);
    }

    /// Overwrite the local copy of one record from a raw store document.
    ///
    /// This is the write path for push notifications: whatever the store
    /// sends replaces what we have, keyed by `id`. Documents for collections
    /// we don't mirror are ignored.
    pub fn apply_document(
        &mut self,
        collection: &str,
        id: &RecordId,
        doc: &Value,
    ) -> Result<(), serde_json::Error> {
        match collection {
            collections::SITES => {
                let site: Site = serde_json::from_value(doc.clone())?;
                self.sites.insert(id.clone(), site);
            }
            collections::TECHNICIANS => {
                let technician: Technician = serde_json::from_value(doc.clone())?;
                self.technicians.insert(id.clone(), technician);
            }
            collections::REPORTS => {
                let report: ServiceReport = serde_json::from_value(doc.clone())?;
                self.reports.insert(id.clone(), report);
            }
            collections::QUOTES => {
                let quote: Quote = serde_json::from_value(doc.clone())?;
                self.quotes.insert(id.clone(), quote);
            }
            other => log::warn!("ignoring document {} for unknown collection {}", id, other),
        }
        Ok(())
    }

    /// Drop the local copy of one record in response to a removal.
    pub fn remove_document(&mut self, collection: &str, id: &RecordId) {
        match collection {
            collections::SITES => {
                self.sites.remove(id);
            }
            collections::TECHNICIANS => {
                self.technicians.remove(id);
            }
            collections::REPORTS => {
                self.reports.remove(id);
            }
            collections::QUOTES => {
                self.quotes.remove(id);
            }
            other => log::warn!("ignoring removal of {} from unknown collection {}", id, other),
        }
    }

    /// Write the whole workspace to the local cache file.
    ///
    /// Writes go to a sibling temp file first and then rename into place, so
    /// a crash mid-write can't leave a half-written cache behind.
    pub fn save_cache(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        log::info!("saving workspace cache to {:?}", path);
        let tmp_file_name = format!(
            "{}.tmp",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("siteline-cache")
        );
        let tmp_path = path.with_file_name(tmp_file_name);
        fs::write(&tmp_path, serde_json::to_vec(self)?)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read a previously cached workspace. A missing file is not an error;
    /// there just isn't a cache yet.
    pub fn load_cache(path: &Path) -> Result<Option<Workspace>, Box<dyn Error>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_document_overwrites_local_copy() {
        let mut ws = Workspace::default();
        let id = RecordId::new("site-a");
        ws.apply_document(
            collections::SITES,
            &id,
            &json!({
                "id": "site-a",
                "name": "North Quarry",
                "customer": "Aggregate Co",
                "assets": [],
            }),
        )
        .unwrap();
        assert_eq!(ws.site(&id).unwrap().name, "North Quarry");

        // a second notification for the same id wins outright
        ws.apply_document(
            collections::SITES,
            &id,
            &json!({
                "id": "site-a",
                "name": "North Quarry Stage 2",
                "customer": "Aggregate Co",
            }),
        )
        .unwrap();
        assert_eq!(ws.site(&id).unwrap().name, "North Quarry Stage 2");

        ws.remove_document(collections::SITES, &id);
        assert!(ws.site(&id).is_none());
    }

    #[test]
    fn malformed_document_is_rejected() {
        let mut ws = Workspace::default();
        let id = RecordId::new("site-a");
        assert!(ws
            .apply_document(collections::SITES, &id, &json!({"name": 7}))
            .is_err());
        assert!(ws.site(&id).is_none());
    }

    #[test]
    fn cache_round_trip() {
        let mut ws = Workspace::default();
        ws.upsert_site(Site::new("North Quarry", "Aggregate Co"));
        ws.upsert_technician(crate::certification::Technician::new("R. Alvarez"));

        let path = std::env::temp_dir().join(format!(
            "siteline-cache-roundtrip-{}.json",
            std::process::id()
        ));
        ws.save_cache(&path).unwrap();
        let loaded = Workspace::load_cache(&path).unwrap().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, ws);
    }

    #[test]
    fn missing_cache_reads_as_none() {
        let path = std::env::temp_dir().join("siteline-cache-definitely-missing.json");
        assert!(Workspace::load_cache(&path).unwrap().is_none());
    }
}
