//! A console-printing `SpeechSynthesizer`, standing in for the real text-to-
//! speech device during the demo.
//!
//! Grounded on the teacher's `udp_tx::UdpTransmitter` shape (one small
//! struct, a handful of small methods, log instead of fail), adapted from
//! "transmit bytes" to "print an utterance and wait out its estimated
//! duration" so the demo's pacing looks like a real spoken conversation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use cane_contracts::{SpeechError, SpeechPriority, SpeechSynthesizer};

/// Words per minute used to estimate how long an utterance should hold up
/// the caller — matches the convention in `cane_contracts::Instruction`.
const WORDS_PER_MINUTE: f64 = 150.0;

pub struct ConsoleSpeech {
    interrupted: AtomicBool,
    paused: AtomicBool,
}

impl ConsoleSpeech {
    pub fn new() -> Self {
        Self {
            interrupted: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }
}

impl Default for ConsoleSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSpeech {
    async fn speak(&self, text: &str, priority: SpeechPriority) -> Result<(), SpeechError> {
        info!(priority = ?priority, "cane says: \"{text}\"");

        let word_count = text.split_whitespace().count().max(1);
        let duration_ms = ((word_count as f64 / WORDS_PER_MINUTE) * 60_000.0).round() as u64;
        let mut remaining = Duration::from_millis(duration_ms);
        let step = Duration::from_millis(20);
        while remaining > Duration::ZERO {
            // consumes a pending interrupt — either queued just before this
            // call or raised while this utterance was already in flight.
            if self.interrupted.swap(false, Ordering::SeqCst) {
                break;
            }
            let sleep_for = step.min(remaining);
            tokio::time::sleep(sleep_for).await;
            remaining = remaining.saturating_sub(sleep_for);
        }
        Ok(())
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    async fn pause(&self) -> Result<(), SpeechError> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<(), SpeechError> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        self.interrupted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for_completion(&self) {}
}
