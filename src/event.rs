//! Events delivered by the session loop to the application.

use crate::close_codes::CloseCode;
use crate::error::UserInputError;
use crate::view::ViewModel;

/// High-level events emitted on the channel returned by
/// [`SessionClient::start`](crate::client::SessionClient::start).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Synthetic: the session loop started on an open transport.
    Connected,
    /// The session changed; render this snapshot.
    ViewChanged(Box<ViewModel>),
    /// A local command was rejected before reaching the server. The reason is
    /// also in the next view's info message; this event lets a UI raise an
    /// alert.
    InputRejected(UserInputError),
    /// The channel closed. Always the last event.
    Disconnected {
        reason: Option<String>,
        close_code: Option<CloseCode>,
    },
}
