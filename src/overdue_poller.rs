use crate::config::SweepConfig;
use crate::dates;
use crate::model::LoanStatus;
use crate::store::RecordStore;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Flips active loans past their expected return date to `delayed`.
///
/// Only `active` loans are eligible: a loan someone already marked
/// `returned`, `lost` or `damaged` is never overridden by the sweep.
pub struct OverduePoller {
    config: SweepConfig,
    store: Box<dyn RecordStore>,
    running: Arc<AtomicBool>,
}

impl OverduePoller {
    pub fn new(config: SweepConfig, store: Box<dyn RecordStore>, running: Arc<AtomicBool>) -> Self {
        Self {
            config,
            store,
            running,
        }
    }

    /// Run the sweep loop. Blocks until the shutdown signal fires.
    pub fn run(self) {
        while self.running.load(Ordering::SeqCst) {
            self.sweep_once();
            self.sleep();
        }

        info!("Overdue poller shutting down");
    }

    fn sweep_once(&self) {
        let loans = match self.store.fetch_loans() {
            Ok(loans) => loans,
            Err(err) => {
                error!(error = %err, "Failed to query loans for overdue sweep");
                return;
            }
        };

        let today = Local::now().date_naive();
        let mut flipped = 0;

        for loan in loans.iter().filter(|l| l.status == LoanStatus::Active) {
            let due = dates::to_calendar_date(loan.expected_return_date);

            match dates::is_overdue(&due, today) {
                Ok(true) => {
                    info!(
                        loan_id = %loan.id,
                        borrower = %loan.borrower_name,
                        expected_return = %due,
                        "Loan past its expected return date, marking delayed"
                    );

                    if let Err(err) =
                        self.store
                            .update_loan_status(&loan.id, LoanStatus::Delayed, None)
                    {
                        error!(error = %err, loan_id = %loan.id, "Failed to mark loan delayed");
                    } else {
                        flipped += 1;
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    error!(error = %err, loan_id = %loan.id, "Unparseable expected return date");
                }
            }
        }

        if flipped > 0 {
            info!(count = flipped, "Overdue sweep finished");
        } else {
            debug!("No loans newly overdue");
        }
    }

    fn sleep(&self) {
        let mut slept = 0;
        while slept < self.config.check_interval_seconds && self.running.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_secs(1));
            slept += 1;
        }
    }
}
