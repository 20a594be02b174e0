//! Push-channel frame types exchanged between board clients and the hub.
//!
//! Frames are postcard-encoded (see [`crate::codec`]) and carried as
//! WebSocket binary messages. A client joins one topic per connection and
//! then only receives events relevant to that topic.

use serde::{Deserialize, Serialize};

use crate::employee::{EmployeeId, OwnerId};
use crate::event::PushEvent;

/// A subscription scope on the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Everything concerning the employees of one admin.
    Owner(OwnerId),
    /// Everything concerning a single employee's tasks.
    Employee(EmployeeId),
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner(id) => write!(f, "owner:{id}"),
            Self::Employee(id) => write!(f, "employee:{id}"),
        }
    }
}

/// Frames exchanged on the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMessage {
    /// Client asks to receive events for a topic.
    ///
    /// Must be the first frame sent after the WebSocket connects.
    Join {
        /// Topic to subscribe to.
        topic: Topic,
    },

    /// Hub confirms the subscription.
    Joined {
        /// Echo of the joined topic.
        topic: Topic,
    },

    /// A change notification for the joined topic.
    Event(PushEvent),

    /// Hub reports a recoverable error.
    Error {
        /// Human-readable error description.
        reason: String,
    },

    /// Hub is closing this connection (for example, a newer login took over).
    ForceDisconnect {
        /// Human-readable explanation.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_display_is_scoped() {
        assert_eq!(Topic::Owner(OwnerId::new(3)).to_string(), "owner:3");
        assert_eq!(Topic::Employee(EmployeeId::new(4)).to_string(), "employee:4");
    }
}
