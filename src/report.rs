//! Service reports filed by technicians after a site visit.

use std::fmt;

use chrono::NaiveDate;

use crate::entity::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceReport {
    pub id: RecordId,
    pub site: RecordId,
    /// The specific conveyor worked on, when the visit wasn't site-wide.
    pub asset: Option<RecordId>,
    pub technician: RecordId,
    pub date: NaiveDate,
    pub summary: String,
    #[serde(default)]
    pub work_items: Vec<WorkItem>,
    pub status: ReportStatus,
}

impl ServiceReport {
    pub fn new(site: RecordId, technician: RecordId, date: NaiveDate) -> ServiceReport {
        ServiceReport {
            id: RecordId::generate("report"),
            site,
            asset: None,
            technician,
            date,
            summary: String::new(),
            work_items: Vec::new(),
            status: ReportStatus::Draft,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.work_items.iter().map(|w| w.hours).sum()
    }

    pub fn total_parts_cost_cents(&self) -> i64 {
        self.work_items.iter().map(|w| w.parts_cost_cents).sum()
    }

    /// Move the report along its workflow. Only the draft → submitted →
    /// approved steps are legal; anything else is refused.
    pub fn advance_to(&mut self, next: ReportStatus) -> bool {
        let legal = matches!(
            (self.status, next),
            (ReportStatus::Draft, ReportStatus::Submitted)
                | (ReportStatus::Submitted, ReportStatus::Approved)
        );
        if legal {
            self.status = next;
        }
        legal
    }
}

/// One line of work performed during the visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub description: String,
    pub hours: f64,
    pub parts_cost_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    Draft,
    Submitted,
    Approved,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Approved => "approved",
        };
        f.write_str(s)
    }
}
