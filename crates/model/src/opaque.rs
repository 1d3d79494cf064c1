use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A backend-owned history entry.
///
/// Some backends need more than the provider-agnostic types can express
/// to replay an assistant turn, e.g. the exact tool call list they sent.
/// A backend wraps its own message type in `OpaqueMessage`, the agent
/// stores it in the conversation untouched, and the backend unwraps it
/// again with [`OpaqueMessage::downcast_ref`] when building the next
/// request.
///
/// Identity is the `id` alone: two opaque messages with equal ids compare
/// equal no matter what they carry.
pub struct OpaqueMessage(Arc<dyn Payload>);

impl OpaqueMessage {
    /// Wraps `value` under the given id.
    ///
    /// The id should be unique within a conversation.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        Self(Arc::new(Entry {
            id: id.into(),
            value,
        }))
    }

    /// Returns the id this message was created with.
    #[inline]
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Returns the wrapped value if it is a `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl Clone for OpaqueMessage {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id()).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

trait Payload: Send + Sync {
    fn id(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

struct Entry<T> {
    id: String,
    value: T,
}

impl<T: Send + Sync + 'static> Payload for Entry<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct BackendTurn {
        text: String,
    }

    #[test]
    fn test_downcast() {
        let msg = OpaqueMessage::new(
            "turn:1",
            BackendTurn {
                text: "sunny".to_owned(),
            },
        );
        assert_eq!(msg.id(), "turn:1");
        assert_eq!(msg.downcast_ref::<BackendTurn>().unwrap().text, "sunny");
        assert!(msg.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_identity_is_id() {
        let a = OpaqueMessage::new("turn:1", 1_u32);
        let b = OpaqueMessage::new("turn:1", "something else");
        let c = OpaqueMessage::new("turn:2", 1_u32);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }
}
