//! Machine metrics collection

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters, shared between the machine and its readers
#[derive(Debug, Default)]
pub struct MachineMetrics {
    draws_settled: AtomicU64,
    free_draws: AtomicU64,
    credit_draws: AtomicU64,
    noop_draws: AtomicU64,
    rejected_operations: AtomicU64,
    credits_issued: AtomicU64,
    total_nominal: AtomicU64,
    total_paid: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub draws_settled: u64,
    pub free_draws: u64,
    pub credit_draws: u64,
    pub noop_draws: u64,
    pub rejected_operations: u64,
    pub credits_issued: u64,
    pub total_nominal: u64,
    pub total_paid: u64,
}

impl MetricsSnapshot {
    /// Nominal prize value the reserve could not cover
    pub fn total_shortfall(&self) -> u64 {
        self.total_nominal.saturating_sub(self.total_paid)
    }
}

impl MachineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_draw(&self, nominal: u64, sent: u64, used_credit: bool) {
        self.draws_settled.fetch_add(1, Ordering::SeqCst);
        if used_credit {
            self.credit_draws.fetch_add(1, Ordering::SeqCst);
        } else {
            self.free_draws.fetch_add(1, Ordering::SeqCst);
        }
        self.total_nominal.fetch_add(nominal, Ordering::SeqCst);
        self.total_paid.fetch_add(sent, Ordering::SeqCst);
    }

    pub fn record_noop(&self) {
        self.noop_draws.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_rejection(&self) {
        self.rejected_operations.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_credits(&self, count: u64) {
        self.credits_issued.fetch_add(count, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            draws_settled: self.draws_settled.load(Ordering::SeqCst),
            free_draws: self.free_draws.load(Ordering::SeqCst),
            credit_draws: self.credit_draws.load(Ordering::SeqCst),
            noop_draws: self.noop_draws.load(Ordering::SeqCst),
            rejected_operations: self.rejected_operations.load(Ordering::SeqCst),
            credits_issued: self.credits_issued.load(Ordering::SeqCst),
            total_nominal: self.total_nominal.load(Ordering::SeqCst),
            total_paid: self.total_paid.load(Ordering::SeqCst),
        }
    }
}
