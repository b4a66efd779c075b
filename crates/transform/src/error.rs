/// Transform has no fatal per-message conditions by design (spec §4.4:
/// a message that can't be handled degrades, it doesn't abort). What
/// can genuinely fail the phase is checkpoint/resume I/O, or a chunk
/// worker task panicking outright.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("chunk worker failed: {0}")]
    ChunkWorker(String),
}
