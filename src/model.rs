use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
    Delayed,
    Lost,
    Damaged,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "active"),
            LoanStatus::Returned => write!(f, "returned"),
            LoanStatus::Delayed => write!(f, "delayed"),
            LoanStatus::Lost => write!(f, "lost"),
            LoanStatus::Damaged => write!(f, "damaged"),
        }
    }
}

impl FromStr for LoanStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            "delayed" => Ok(LoanStatus::Delayed),
            "lost" => Ok(LoanStatus::Lost),
            "damaged" => Ok(LoanStatus::Damaged),
            other => Err(anyhow::anyhow!("Unknown loan status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentType {
    Laptop,
    Printer,
    Desktop,
}

impl EquipmentType {
    /// Status a newly registered unit gets when none was chosen explicitly.
    /// Desktops are racked until assigned, everything else goes straight
    /// into the lending pool.
    pub fn default_status(&self) -> EquipmentStatus {
        match self {
            EquipmentType::Desktop => EquipmentStatus::Inactive,
            _ => EquipmentStatus::Available,
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquipmentType::Laptop => write!(f, "laptop"),
            EquipmentType::Printer => write!(f, "printer"),
            EquipmentType::Desktop => write!(f, "desktop"),
        }
    }
}

impl FromStr for EquipmentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "laptop" => Ok(EquipmentType::Laptop),
            "printer" => Ok(EquipmentType::Printer),
            "desktop" => Ok(EquipmentType::Desktop),
            other => Err(anyhow::anyhow!("Unknown equipment type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    Available,
    Loaned,
    Maintenance,
    Lost,
    Damaged,
    Inactive,
    Unavailable,
}

impl EquipmentStatus {
    pub const ALL: [EquipmentStatus; 7] = [
        EquipmentStatus::Available,
        EquipmentStatus::Loaned,
        EquipmentStatus::Maintenance,
        EquipmentStatus::Lost,
        EquipmentStatus::Damaged,
        EquipmentStatus::Inactive,
        EquipmentStatus::Unavailable,
    ];
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquipmentStatus::Available => write!(f, "available"),
            EquipmentStatus::Loaned => write!(f, "loaned"),
            EquipmentStatus::Maintenance => write!(f, "maintenance"),
            EquipmentStatus::Lost => write!(f, "lost"),
            EquipmentStatus::Damaged => write!(f, "damaged"),
            EquipmentStatus::Inactive => write!(f, "inactive"),
            EquipmentStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

impl FromStr for EquipmentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "available" => Ok(EquipmentStatus::Available),
            "loaned" => Ok(EquipmentStatus::Loaned),
            "maintenance" => Ok(EquipmentStatus::Maintenance),
            "lost" => Ok(EquipmentStatus::Lost),
            "damaged" => Ok(EquipmentStatus::Damaged),
            "inactive" => Ok(EquipmentStatus::Inactive),
            "unavailable" => Ok(EquipmentStatus::Unavailable),
            other => Err(anyhow::anyhow!("Unknown equipment status: {other}")),
        }
    }
}

/// One uploaded proof of the signed FI-1557 form.
///
/// `storage_path` is the durable locator inside object storage and never
/// changes after upload. `display_url` is derived: public links rot and
/// signed links expire, so it is recomputed on every read and must not be
/// treated as permanent. Records written before path tracking only carry a
/// URL, hence the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    #[serde(default)]
    pub storage_path: String,
    #[serde(rename = "url")]
    pub display_url: String,
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EquipmentType,
    pub serial_number: String,
    pub model: String,
    pub status: EquipmentStatus,
    #[serde(default, rename = "imagenes")]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEquipment {
    #[serde(rename = "type")]
    pub kind: EquipmentType,
    pub serial_number: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EquipmentStatus>,
    #[serde(rename = "imagenes")]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub equipment_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub borrower_name: String,
    pub borrower_department: String,
    pub start_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    #[serde(default)]
    pub actual_return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    #[serde(default)]
    pub accessories: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Populated by the equipment join on list queries.
    #[serde(default)]
    pub equipment: Option<Equipment>,
    #[serde(default)]
    pub fi_1557_filled: bool,
    #[serde(default)]
    pub fi_1557_evidence: Option<Vec<EvidenceRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLoan {
    pub equipment_id: String,
    pub borrower_name: String,
    pub borrower_department: String,
    pub start_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub accessories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_status_round_trips_through_strings() {
        for status in ["active", "returned", "delayed", "lost", "damaged"] {
            assert_eq!(LoanStatus::from_str(status).unwrap().to_string(), status);
        }
    }

    #[test]
    fn rejects_unknown_loan_status() {
        assert!(LoanStatus::from_str("pending").is_err());
    }

    #[test]
    fn equipment_enums_round_trip_through_strings() {
        for status in EquipmentStatus::ALL {
            assert_eq!(
                EquipmentStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
        for kind in ["laptop", "printer", "desktop"] {
            assert_eq!(EquipmentType::from_str(kind).unwrap().to_string(), kind);
        }
    }

    #[test]
    fn desktop_defaults_to_inactive() {
        assert_eq!(
            EquipmentType::Desktop.default_status(),
            EquipmentStatus::Inactive
        );
        assert_eq!(
            EquipmentType::Laptop.default_status(),
            EquipmentStatus::Available
        );
    }

    #[test]
    fn evidence_record_tolerates_legacy_shape() {
        // Records written before storage paths were tracked only carry a URL.
        let json = r#"{"url": "https://x/storage/v1/object/public/imagenes/a.jpg", "filename": "a.jpg"}"#;
        let record: EvidenceRecord = serde_json::from_str(json).unwrap();
        assert!(record.storage_path.is_empty());
        assert!(record.uploaded_at.is_none());
    }
}
