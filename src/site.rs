//! Customer sites and the conveyor assets installed at them.

use std::fmt;

use chrono::NaiveDate;

use crate::entity::RecordId;

/// A customer site: one physical location with some number of conveyors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: RecordId,
    pub name: String,
    pub customer: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub assets: Vec<ConveyorAsset>,
    #[serde(default)]
    pub notes: String,
}

impl Site {
    pub fn new(name: impl Into<String>, customer: impl Into<String>) -> Site {
        Site {
            id: RecordId::generate("site"),
            name: name.into(),
            customer: customer.into(),
            address: String::new(),
            contact: String::new(),
            assets: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn asset(&self, id: &RecordId) -> Option<&ConveyorAsset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    pub fn asset_mut(&mut self, id: &RecordId) -> Option<&mut ConveyorAsset> {
        self.assets.iter_mut().find(|a| &a.id == id)
    }

    /// The most severe status across this site's assets.
    ///
    /// An empty site reads as operational.
    pub fn worst_status(&self) -> AssetStatus {
        self.assets
            .iter()
            .map(|a| a.status)
            .max_by_key(|s| s.severity())
            .unwrap_or(AssetStatus::Operational)
    }
}

/// One conveyor installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConveyorAsset {
    pub id: RecordId,
    pub name: String,
    /// Where on the site the conveyor runs, e.g. "crusher discharge".
    #[serde(default)]
    pub area: String,
    pub belt_width_mm: u32,
    pub belt_length_m: f64,
    pub belt_speed_mps: f64,
    pub status: AssetStatus,
    pub last_serviced: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl ConveyorAsset {
    pub fn new(name: impl Into<String>, belt_width_mm: u32, belt_length_m: f64) -> ConveyorAsset {
        ConveyorAsset {
            id: RecordId::generate("asset"),
            name: name.into(),
            area: String::new(),
            belt_width_mm,
            belt_length_m,
            belt_speed_mps: 0.0,
            status: AssetStatus::Operational,
            last_serviced: None,
            notes: String::new(),
        }
    }
}

/// Condition of a conveyor, as recorded by the last inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetStatus {
    Operational,
    NeedsService,
    Critical,
    OutOfService,
}

impl AssetStatus {
    /// Ranking used when sorting assets by how urgently they need attention.
    pub fn severity(self) -> u8 {
        match self {
            AssetStatus::Operational => 0,
            AssetStatus::NeedsService => 1,
            AssetStatus::Critical => 2,
            AssetStatus::OutOfService => 3,
        }
    }

    /// The color token the status renders with.
    pub fn color(self) -> &'static str {
        match self {
            AssetStatus::Operational => "#2e7d32",
            AssetStatus::NeedsService => "#f9a825",
            AssetStatus::Critical => "#e65100",
            AssetStatus::OutOfService => "#c62828",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AssetStatus::Operational => "operational",
            AssetStatus::NeedsService => "needs service",
            AssetStatus::Critical => "critical",
            AssetStatus::OutOfService => "out of service",
        };
        f.write_str(s)
    }
}

impl Default for AssetStatus {
    fn default() -> Self {
        AssetStatus::Operational
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_lookup() {
        let mut site = Site::new("North Quarry", "Aggregate Co");
        let asset = ConveyorAsset::new("CV-101", 900, 42.0);
        let id = asset.id.clone();
        site.assets.push(asset);

        assert!(site.asset(&id).is_some());
        assert!(site.asset(&RecordId::new("missing")).is_none());

        site.asset_mut(&id).unwrap().status = AssetStatus::Critical;
        assert_eq!(site.asset(&id).unwrap().status, AssetStatus::Critical);
    }

    #[test]
    fn worst_status_ranks_by_severity() {
        let mut site = Site::new("North Quarry", "Aggregate Co");
        assert_eq!(site.worst_status(), AssetStatus::Operational);

        let mut a = ConveyorAsset::new("CV-101", 900, 42.0);
        a.status = AssetStatus::NeedsService;
        let mut b = ConveyorAsset::new("CV-102", 1200, 60.0);
        b.status = AssetStatus::OutOfService;
        site.assets.push(a);
        site.assets.push(b);

        assert_eq!(site.worst_status(), AssetStatus::OutOfService);
    }
}
