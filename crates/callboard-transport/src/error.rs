/// Errors raised while accepting, reading from, or writing to a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or completing the upgrade handshake failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Writing a frame failed. The peer is most likely gone.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The frame exceeded the configured size limit and was discarded.
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
}
