//! The speech synthesizer capability — an external collaborator. The core
//! never depends on a concrete synthesizer, only this trait.

use async_trait::async_trait;
use thiserror::Error;

/// Utterance priority. `Urgent` preempts whatever is currently speaking;
/// `Normal` queues; `Info` is lowest priority (not currently emitted by the
/// guidance executor, but part of the collaborator's interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpeechPriority {
    Info,
    Normal,
    Urgent,
}

#[derive(Debug, Clone, Error)]
#[error("speech synthesizer error: {0}")]
pub struct SpeechError(pub String);

/// Capability interface for the external speech synthesizer. Rate and
/// language are runtime properties of the concrete implementation; the core
/// only ever passes opaque UTF-8 strings.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` at `priority`. The returned future resolves once the
    /// utterance has finished playing.
    async fn speak(&self, text: &str, priority: SpeechPriority) -> Result<(), SpeechError>;

    /// Immediately stop whatever is currently playing (used for `Urgent`
    /// preemption before queuing the new utterance).
    fn interrupt(&self);

    async fn pause(&self) -> Result<(), SpeechError>;
    async fn resume(&self) -> Result<(), SpeechError>;
    async fn stop(&self) -> Result<(), SpeechError>;

    /// Block until any in-flight utterance completes without starting a
    /// new one.
    async fn wait_for_completion(&self);
}
