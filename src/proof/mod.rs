//! Proof Module
//!
//! Exports finished rounds as a transcript and verifies transcripts
//! independently of the lottery that produced them.
//!
//! ## Module Structure
//!
//! - `transcript`: Round records and bincode encoding
//! - `verify`: Re-derivation of winning picks and rollover checks

pub mod transcript;
pub mod verify;

pub use transcript::{LotteryTranscript, RoundRecord, TranscriptError, TRANSCRIPT_VERSION};
pub use verify::{verify_transcript, VerificationError, VerificationSummary};
