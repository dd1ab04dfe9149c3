//! Grouping of history into completed exchanges
//!
//! An exchange is one user turn and the assistant reply that answered it,
//! together with the closest system message that preceded the user turn
//! (directives, injected context, or a refresh summary).

use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

/// A completed user/assistant pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// System message seen since the previous exchange, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Message>,
    pub user: Message,
    pub assistant: Message,
}

/// Split a history into completed exchanges.
///
/// Assistant messages without a pending user turn are skipped, and a user
/// turn that never received a reply produces nothing. When several system
/// or user messages appear before a reply, the latest one wins.
pub fn split_into_exchanges(messages: &[Message]) -> Vec<Exchange> {
    let mut exchanges = Vec::new();
    let mut pending_system: Option<&Message> = None;
    let mut pending_user: Option<&Message> = None;

    for message in messages {
        match message.role {
            Role::System => pending_system = Some(message),
            Role::User => pending_user = Some(message),
            Role::Assistant => {
                if let Some(user) = pending_user.take() {
                    exchanges.push(Exchange {
                        system: pending_system.take().cloned(),
                        user: user.clone(),
                        assistant: message.clone(),
                    });
                }
            }
        }
    }

    exchanges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_with_nearest_system() {
        let messages = vec![
            Message::system("directive"),
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant("a2"),
            Message::system("extra context"),
            Message::user("q3"),
            Message::assistant("a3"),
        ];

        let exchanges = split_into_exchanges(&messages);
        assert_eq!(exchanges.len(), 3);
        assert_eq!(exchanges[0].system, Some(Message::system("directive")));
        assert_eq!(exchanges[1].system, None);
        assert_eq!(exchanges[1].user.content, "q2");
        assert_eq!(exchanges[2].system, Some(Message::system("extra context")));
        assert_eq!(exchanges[2].assistant.content, "a3");
    }

    #[test]
    fn test_unanswered_and_orphan_turns_skipped() {
        let messages = vec![
            Message::assistant("stray"),
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("never answered"),
        ];

        let exchanges = split_into_exchanges(&messages);
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].user.content, "q1");
    }

    #[test]
    fn test_empty_history() {
        assert!(split_into_exchanges(&[]).is_empty());
    }
}
