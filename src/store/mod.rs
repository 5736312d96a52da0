pub mod supabase;

pub use supabase::SupabaseStore;

use crate::model::{
    Equipment, EquipmentStatus, EvidenceRecord, Loan, LoanStatus, NewEquipment, NewLoan,
};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Remote table store owning all persistence. Last write wins; the service
/// never caches rows between calls.
pub trait RecordStore: Send + Sync {
    /// All loans with their equipment joined, newest first.
    fn fetch_loans(&self) -> Result<Vec<Loan>>;

    fn get_loan(&self, loan_id: &str) -> Result<Loan>;

    /// Insert a loan as `active`, stamped with the acting user's id.
    fn insert_loan(&self, loan: &NewLoan, user_id: &str) -> Result<Loan>;

    fn update_loan_status(
        &self,
        loan_id: &str,
        status: LoanStatus,
        actual_return_date: Option<DateTime<Utc>>,
    ) -> Result<Loan>;

    /// Replace the loan's evidence list and mark the FI-1557 form as filled.
    fn set_evidence(&self, loan_id: &str, evidence: &[EvidenceRecord]) -> Result<()>;

    /// All equipment, newest first.
    fn fetch_equipment(&self) -> Result<Vec<Equipment>>;

    fn insert_equipment(&self, equipment: &NewEquipment) -> Result<Equipment>;

    fn update_equipment_status(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> Result<Equipment>;
}
