pub mod triage; // Live triage: parse → flags → escalate
pub mod validation; // Offline summary quality scoring
