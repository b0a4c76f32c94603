//! Filtering and sorting for the list views.

use chrono::NaiveDate;

use crate::certification::{CertStatus, Certification, Technician};
use crate::data::Workspace;
use crate::entity::RecordId;
use crate::report::ServiceReport;
use crate::site::{AssetStatus, ConveyorAsset, Site};

/// Criteria for the asset list. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct AssetQuery {
    pub status: Option<AssetStatus>,
    pub site: Option<RecordId>,
    /// Case-insensitive substring match over asset name, area and site name.
    pub text: Option<String>,
}

impl AssetQuery {
    fn matches(&self, site: &Site, asset: &ConveyorAsset) -> bool {
        if let Some(status) = self.status {
            if asset.status != status {
                return false;
            }
        }
        if let Some(site_id) = &self.site {
            if &site.id != site_id {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = asset.name.to_lowercase().contains(&needle)
                || asset.area.to_lowercase().contains(&needle)
                || site.name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Sort order for the asset list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSort {
    Name,
    /// Most urgent first.
    Severity,
    /// Longest-unserviced first; never-serviced assets lead.
    LastServiced,
}

pub fn filter_assets<'a>(
    workspace: &'a Workspace,
    query: &AssetQuery,
) -> Vec<(&'a Site, &'a ConveyorAsset)> {
    workspace
        .sites
        .values()
        .flat_map(|site| site.assets.iter().map(move |asset| (site, asset)))
        .filter(|(site, asset)| query.matches(site, asset))
        .collect()
}

pub fn sort_assets(assets: &mut Vec<(&Site, &ConveyorAsset)>, order: AssetSort) {
    match order {
        AssetSort::Name => assets.sort_by(|(_, a), (_, b)| a.name.cmp(&b.name)),
        AssetSort::Severity => assets.sort_by(|(_, a), (_, b)| {
            b.status
                .severity()
                .cmp(&a.status.severity())
                .then_with(|| a.name.cmp(&b.name))
        }),
        AssetSort::LastServiced => assets.sort_by(|(_, a), (_, b)| {
            // None sorts before any date
            a.last_serviced
                .cmp(&b.last_serviced)
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
}

/// Reports dated within `[from, to]`, newest first.
pub fn reports_between(
    workspace: &Workspace,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<&ServiceReport> {
    let mut reports: Vec<_> = workspace
        .reports
        .values()
        .filter(|r| r.date >= from && r.date <= to)
        .collect();
    reports.sort_by(|a, b| b.date.cmp(&a.date));
    reports
}

pub fn reports_for_site<'a>(
    workspace: &'a Workspace,
    site: &RecordId,
) -> Vec<&'a ServiceReport> {
    workspace
        .reports
        .values()
        .filter(|r| &r.site == site)
        .collect()
}

/// Technicians holding a certification that is expired or inside the
/// warning window on `date`, with the offending certification.
pub fn expiring_certifications(
    workspace: &Workspace,
    date: NaiveDate,
) -> Vec<(&Technician, &Certification)> {
    workspace
        .technicians
        .values()
        .flat_map(|tech| tech.certifications.iter().map(move |cert| (tech, cert)))
        .filter(|(_, cert)| cert.status_on(date) != CertStatus::Current)
        .collect()
}
