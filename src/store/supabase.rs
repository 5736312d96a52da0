use super::RecordStore;
use crate::config::BackendConfig;
use crate::model::{
    Equipment, EquipmentStatus, EvidenceRecord, Loan, LoanStatus, NewEquipment, NewLoan,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

/// Columns fetched for loans: every loan field plus the equipment row
/// embedded through the foreign key.
const LOAN_SELECT: &str = "*,equipment:equipment_id(*)";

/// PostgREST "give me a single object, not a one-element array" media type.
const OBJECT_JSON: &str = "application/vnd.pgrst.object+json";

/// Record store backed by the hosted PostgREST API.
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            base_url: config
                .url
                .clone()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl RecordStore for SupabaseStore {
    fn fetch_loans(&self) -> Result<Vec<Loan>> {
        let url = format!(
            "{}/rest/v1/loans?select={LOAN_SELECT}&order=created_at.desc",
            self.base_url
        );

        let response = ureq::get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .call()
            .context("Loan list request failed")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse loan list response")
    }

    fn get_loan(&self, loan_id: &str) -> Result<Loan> {
        let url = format!(
            "{}/rest/v1/loans?select={LOAN_SELECT}&id=eq.{loan_id}",
            self.base_url
        );

        let response = ureq::get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Accept", OBJECT_JSON)
            .call()
            .with_context(|| format!("Loan {loan_id} request failed"))?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse loan response")
    }

    fn insert_loan(&self, loan: &NewLoan, user_id: &str) -> Result<Loan> {
        let url = format!("{}/rest/v1/loans?select={LOAN_SELECT}", self.base_url);

        let mut body = serde_json::to_value(loan).context("Failed to serialize new loan")?;
        let fields = body
            .as_object_mut()
            .expect("NewLoan serializes to an object");
        fields.insert("status".into(), json!(LoanStatus::Active));
        fields.insert("user_id".into(), json!(user_id));
        fields.insert("fi_1557_filled".into(), json!(false));
        fields.insert("fi_1557_evidence".into(), serde_json::Value::Null);

        debug!(equipment_id = %loan.equipment_id, "Inserting loan");

        let response = ureq::post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Accept", OBJECT_JSON)
            .header("Prefer", "return=representation")
            .send_json(&body)
            .context("Loan insert request failed")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse inserted loan response")
    }

    fn update_loan_status(
        &self,
        loan_id: &str,
        status: LoanStatus,
        actual_return_date: Option<DateTime<Utc>>,
    ) -> Result<Loan> {
        let url = format!(
            "{}/rest/v1/loans?select={LOAN_SELECT}&id=eq.{loan_id}",
            self.base_url
        );

        let mut body = json!({
            "status": status,
            "updated_at": Utc::now(),
        });
        if let Some(returned) = actual_return_date {
            body["actual_return_date"] = json!(returned);
        }

        let response = ureq::patch(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Accept", OBJECT_JSON)
            .header("Prefer", "return=representation")
            .send_json(&body)
            .with_context(|| format!("Status update for loan {loan_id} failed"))?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse updated loan response")
    }

    fn set_evidence(&self, loan_id: &str, evidence: &[EvidenceRecord]) -> Result<()> {
        let url = format!("{}/rest/v1/loans?id=eq.{loan_id}", self.base_url);

        let body = json!({
            "fi_1557_evidence": evidence,
            "fi_1557_filled": true,
            "updated_at": Utc::now(),
        });

        ureq::patch(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Prefer", "return=minimal")
            .send_json(&body)
            .with_context(|| format!("Evidence update for loan {loan_id} failed"))?;

        Ok(())
    }

    fn fetch_equipment(&self) -> Result<Vec<Equipment>> {
        let url = format!(
            "{}/rest/v1/equipment?select=*&order=created_at.desc",
            self.base_url
        );

        let response = ureq::get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .call()
            .context("Equipment list request failed")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse equipment list response")
    }

    fn insert_equipment(&self, equipment: &NewEquipment) -> Result<Equipment> {
        let url = format!("{}/rest/v1/equipment?select=*", self.base_url);

        let body =
            serde_json::to_value(equipment).context("Failed to serialize new equipment")?;

        let response = ureq::post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Accept", OBJECT_JSON)
            .header("Prefer", "return=representation")
            .send_json(&body)
            .context("Equipment insert request failed")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse inserted equipment response")
    }

    fn update_equipment_status(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> Result<Equipment> {
        let url = format!(
            "{}/rest/v1/equipment?select=*&id=eq.{equipment_id}",
            self.base_url
        );

        let body = json!({
            "status": status,
            "updated_at": Utc::now(),
        });

        let response = ureq::patch(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &self.bearer())
            .header("Accept", OBJECT_JSON)
            .header("Prefer", "return=representation")
            .send_json(&body)
            .with_context(|| format!("Status update for equipment {equipment_id} failed"))?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse updated equipment response")
    }
}
