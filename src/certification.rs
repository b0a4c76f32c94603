//! Technicians and the certifications that keep them on site.

use std::fmt;

use chrono::NaiveDate;

use crate::entity::RecordId;

/// How far ahead of an expiry date a certification starts flagging.
pub const EXPIRY_WARNING_DAYS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

impl Technician {
    pub fn new(name: impl Into<String>) -> Technician {
        Technician {
            id: RecordId::generate("tech"),
            name: name.into(),
            email: String::new(),
            certifications: Vec::new(),
        }
    }

    /// The least healthy certification status on `date`, if any certs exist.
    pub fn worst_cert_status(&self, date: NaiveDate) -> Option<CertStatus> {
        self.certifications
            .iter()
            .map(|c| c.status_on(date))
            .max_by_key(|s| s.severity())
    }

    /// The next expiry across all certifications.
    pub fn soonest_expiry(&self) -> Option<NaiveDate> {
        self.certifications.iter().map(|c| c.expires).min()
    }
}

/// A dated competency card (working at heights, confined space, etc).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub issued: NaiveDate,
    pub expires: NaiveDate,
}

impl Certification {
    /// Days until expiry, negative once the card has lapsed.
    pub fn days_remaining(&self, on: NaiveDate) -> i64 {
        (self.expires - on).num_days()
    }

    /// Status as of `on`. The expiry date itself is still a valid day.
    pub fn status_on(&self, on: NaiveDate) -> CertStatus {
        let remaining = self.days_remaining(on);
        if remaining < 0 {
            CertStatus::Expired
        } else if remaining <= EXPIRY_WARNING_DAYS {
            CertStatus::ExpiringSoon
        } else {
            CertStatus::Current
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertStatus {
    Current,
    ExpiringSoon,
    Expired,
}

impl CertStatus {
    pub fn severity(self) -> u8 {
        match self {
            CertStatus::Current => 0,
            CertStatus::ExpiringSoon => 1,
            CertStatus::Expired => 2,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            CertStatus::Current => "#2e7d32",
            CertStatus::ExpiringSoon => "#f9a825",
            CertStatus::Expired => "#c62828",
        }
    }
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            CertStatus::Current => "current",
            CertStatus::ExpiringSoon => "expiring soon",
            CertStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cert(expires: NaiveDate) -> Certification {
        Certification {
            name: "Working at Heights".into(),
            issuer: "SafeWork".into(),
            issued: date(2024, 1, 1),
            expires,
        }
    }

    #[test]
    fn status_windows() {
        let c = cert(date(2026, 3, 1));
        assert_eq!(c.status_on(date(2025, 11, 1)), CertStatus::Current);
        // inside the 60 day window
        assert_eq!(c.status_on(date(2026, 1, 15)), CertStatus::ExpiringSoon);
        // the expiry date itself still counts
        assert_eq!(c.status_on(date(2026, 3, 1)), CertStatus::ExpiringSoon);
        assert_eq!(c.status_on(date(2026, 3, 2)), CertStatus::Expired);
    }

    #[test]
    fn days_remaining_goes_negative() {
        let c = cert(date(2026, 3, 1));
        assert_eq!(c.days_remaining(date(2026, 2, 28)), 1);
        assert_eq!(c.days_remaining(date(2026, 3, 1)), 0);
        assert_eq!(c.days_remaining(date(2026, 3, 4)), -3);
    }

    #[test]
    fn technician_rollups() {
        let mut tech = Technician::new("R. Alvarez");
        assert_eq!(tech.worst_cert_status(date(2026, 1, 1)), None);
        assert_eq!(tech.soonest_expiry(), None);

        tech.certifications.push(cert(date(2026, 6, 1)));
        tech.certifications.push(cert(date(2026, 2, 1)));

        assert_eq!(tech.soonest_expiry(), Some(date(2026, 2, 1)));
        assert_eq!(
            tech.worst_cert_status(date(2026, 3, 1)),
            Some(CertStatus::Expired)
        );
        assert_eq!(
            tech.worst_cert_status(date(2025, 10, 1)),
            Some(CertStatus::Current)
        );
    }
}
