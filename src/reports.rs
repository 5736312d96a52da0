//! Aggregate counts over loans and equipment, computed in memory from the
//! slices the store already returned. Nothing here talks to the backend.

use crate::model::{Equipment, EquipmentStatus, Loan, LoanStatus};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct LoanReport {
    pub total: usize,
    /// Loans still out: `active` plus `delayed`.
    pub out: usize,
    pub delayed: usize,
    pub returned: usize,
    pub lost: usize,
    pub damaged: usize,
    pub return_rate_percent: f64,
    pub by_department: Vec<DepartmentCount>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DepartmentCount {
    pub department: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct EquipmentReport {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: EquipmentStatus,
    pub count: usize,
    pub percent: f64,
}

pub fn loan_report(loans: &[Loan]) -> LoanReport {
    let count = |status: LoanStatus| loans.iter().filter(|l| l.status == status).count();

    let returned = count(LoanStatus::Returned);
    let return_rate_percent = if loans.is_empty() {
        0.0
    } else {
        returned as f64 / loans.len() as f64 * 100.0
    };

    let mut departments: HashMap<&str, usize> = HashMap::new();
    for loan in loans {
        *departments.entry(loan.borrower_department.as_str()).or_default() += 1;
    }

    let mut by_department: Vec<DepartmentCount> = departments
        .into_iter()
        .map(|(department, count)| DepartmentCount {
            department: department.to_string(),
            count,
        })
        .collect();
    // Busiest department first; name breaks ties so output is stable.
    by_department.sort_by(|a, b| b.count.cmp(&a.count).then(a.department.cmp(&b.department)));

    LoanReport {
        total: loans.len(),
        out: count(LoanStatus::Active) + count(LoanStatus::Delayed),
        delayed: count(LoanStatus::Delayed),
        returned,
        lost: count(LoanStatus::Lost),
        damaged: count(LoanStatus::Damaged),
        return_rate_percent,
        by_department,
    }
}

pub fn equipment_report(equipment: &[Equipment]) -> EquipmentReport {
    let by_status = EquipmentStatus::ALL
        .into_iter()
        .map(|status| {
            let count = equipment.iter().filter(|e| e.status == status).count();
            let percent = if equipment.is_empty() {
                0.0
            } else {
                count as f64 / equipment.len() as f64 * 100.0
            };
            StatusCount {
                status,
                count,
                percent,
            }
        })
        .collect();

    EquipmentReport {
        total: equipment.len(),
        by_status,
    }
}
