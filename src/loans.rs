use crate::dates;
use crate::evidence::{validate_file, EvidenceFile, EvidenceResolver};
use crate::model::{Equipment, EquipmentStatus, EvidenceRecord, Loan, LoanStatus, NewEquipment, NewLoan};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Loan operations composed over the record store and the evidence resolver.
pub struct LoanService {
    store: Box<dyn RecordStore>,
    evidence: EvidenceResolver,
}

/// A created loan plus a caller-visible warning when its evidence could be
/// stored but not fully wired up. The loan itself always stands.
#[derive(Debug)]
pub struct CreatedLoan {
    pub loan: Loan,
    pub evidence_warning: Option<String>,
}

impl LoanService {
    pub fn new(store: Box<dyn RecordStore>, evidence: EvidenceResolver) -> Self {
        Self { store, evidence }
    }

    /// All loans, newest first, with every evidence display URL recomputed.
    /// Refreshing is best-effort per record; a record whose URLs are all
    /// unreachable keeps its previous URL.
    pub fn fetch_loans(&self) -> Result<Vec<Loan>> {
        let mut loans = self.store.fetch_loans()?;

        for loan in &mut loans {
            if let Some(records) = &mut loan.fi_1557_evidence {
                for record in records.iter_mut() {
                    *record = self.evidence.refresh(record);
                }
            }
        }

        Ok(loans)
    }

    /// All loans, newest first, exactly as stored. Skips the per-record URL
    /// refresh; for aggregate consumers that never render the URLs.
    pub fn fetch_loans_raw(&self) -> Result<Vec<Loan>> {
        self.store.fetch_loans()
    }

    /// Register a loan for the acting user, optionally with an FI-1557
    /// evidence photo. The file is validated before the loan row is
    /// inserted, so a bad file never leaves a half-registered loan behind.
    pub fn create_loan(
        &self,
        new_loan: NewLoan,
        user_id: &str,
        evidence_file: Option<EvidenceFile>,
    ) -> Result<CreatedLoan> {
        if let Some(file) = &evidence_file {
            validate_file(file)?;
        }

        let mut loan = self.store.insert_loan(&new_loan, user_id)?;

        info!(loan_id = %loan.id, borrower = %loan.borrower_name, "Loan registered");

        let Some(file) = evidence_file else {
            return Ok(CreatedLoan {
                loan,
                evidence_warning: None,
            });
        };

        // Everything past this point is best-effort: the loan row exists,
        // so evidence trouble degrades to a warning instead of an error.
        let evidence_warning = match self.evidence.upload(&loan, &file) {
            Ok(outcome) => {
                match self
                    .store
                    .set_evidence(&loan.id, std::slice::from_ref(&outcome.evidence))
                {
                    Ok(()) => {
                        loan.fi_1557_evidence = Some(vec![outcome.evidence]);
                        loan.fi_1557_filled = true;

                        if outcome.url_unresolved {
                            Some("evidence stored but no display URL is reachable yet".to_string())
                        } else {
                            None
                        }
                    }
                    Err(err) => {
                        warn!(
                            error = %err,
                            loan_id = %loan.id,
                            "Evidence stored but could not be attached to the loan"
                        );
                        Some(format!("evidence stored but not attached: {err}"))
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, loan_id = %loan.id, "Evidence upload failed, loan stands");
                Some(err.to_string())
            }
        };

        Ok(CreatedLoan {
            loan,
            evidence_warning,
        })
    }

    /// Transition a loan's status. `actual_return_date` is date-picker text
    /// (`yyyy-MM-dd`) and goes through the calendar-date normalizer.
    pub fn update_status(
        &self,
        loan_id: &str,
        status: LoanStatus,
        actual_return_date: Option<&str>,
    ) -> Result<Loan> {
        let returned = actual_return_date
            .map(dates::to_stored_timestamp)
            .transpose()
            .context("Invalid actual return date")?;

        self.store.update_loan_status(loan_id, status, returned)
    }

    /// Explicit refresh of a loan's evidence URLs, persisting whatever the
    /// resolver came back with. Unreachable records keep their old URL.
    pub fn refresh_evidence(&self, loan_id: &str) -> Result<Vec<EvidenceRecord>> {
        let loan = self.store.get_loan(loan_id)?;

        let Some(records) = loan.fi_1557_evidence else {
            return Ok(Vec::new());
        };

        let refreshed: Vec<EvidenceRecord> =
            records.iter().map(|r| self.evidence.refresh(r)).collect();

        self.store.set_evidence(loan_id, &refreshed)?;

        Ok(refreshed)
    }

    pub fn fetch_equipment(&self) -> Result<Vec<Equipment>> {
        self.store.fetch_equipment()
    }

    /// Register a unit. When no status was chosen the type decides:
    /// desktops start `inactive`, everything else `available`.
    pub fn register_equipment(&self, mut equipment: NewEquipment) -> Result<Equipment> {
        if equipment.status.is_none() {
            equipment.status = Some(equipment.kind.default_status());
        }

        self.store.insert_equipment(&equipment)
    }

    pub fn update_equipment_status(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> Result<Equipment> {
        self.store.update_equipment_status(equipment_id, status)
    }
}
