// src/utils/logging.rs - Stage logging for address resolution and write-back runs
use log::{info, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Resolve,
    Consolidate,
    WriteBack,
    Report,
}

#[derive(Clone)]
pub struct ResolutionLogger {
    operation_name: &'static str,
    operation_emoji: &'static str,
    request_id: String,
    start_time: Instant,
}

impl ResolutionLogger {
    pub fn new(operation: Operation, request_id: &str) -> Self {
        let (operation_name, operation_emoji) = match operation {
            Operation::Resolve => ("RESOLVE", "📍"),
            Operation::Consolidate => ("CONSOLIDATE", "🧩"),
            Operation::WriteBack => ("WRITE", "💾"),
            Operation::Report => ("REPORT", "📊"),
        };
        Self {
            operation_name,
            operation_emoji,
            request_id: request_id.to_string(),
            start_time: Instant::now(),
        }
    }

    fn prefix(&self) -> String {
        format!("[{}] {} ({})", self.operation_name, self.operation_emoji, self.request_id)
    }

    pub fn log_start(&self, subject: &str) {
        info!("{} 🚀 Starting: {}", self.prefix(), subject);
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        match details {
            Some(details) => info!("{} 🔄 Phase: {} - {} [+{:.1}s]", self.prefix(), phase, details, elapsed),
            None => info!("{} 🔄 Phase: {} [+{:.1}s]", self.prefix(), phase, elapsed),
        }
    }

    pub fn log_candidates(&self, count: usize, source: &str) {
        info!("{} 📊 Found {} {} candidates", self.prefix(), count, source);
    }

    pub fn log_warning(&self, message: &str) {
        warn!("{} ⚠️  {}", self.prefix(), message);
    }

    pub fn log_completion(&self, summary: &str) {
        info!(
            "{} ✅ Completed in {:.2}s: {}",
            self.prefix(),
            self.start_time.elapsed().as_secs_f32(),
            summary
        );
    }
}
