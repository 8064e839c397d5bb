use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a saga instance.
///
/// Saga ids are derived from the business payment reference, so starting the
/// same payment twice collides on the id instead of double-executing. Child
/// sagas append a suffix to the parent reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SagaId(String);

impl SagaId {
    /// Creates a saga ID from a payment reference or other business key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SagaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SagaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SagaId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<SagaId> for String {
    fn from(id: SagaId) -> Self {
        id.0
    }
}

/// One-shot token identifying a suspended saga step.
///
/// A step that parks on external completion is handed a fresh token; the
/// external system echoes it back to resolve exactly that suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionToken(Uuid);

impl CompletionToken {
    /// Creates a new random completion token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a completion token from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CompletionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompletionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CompletionToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CompletionToken> for Uuid {
    fn from(token: CompletionToken) -> Self {
        token.0
    }
}
