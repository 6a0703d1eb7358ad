//! Session identifier generation

use uuid::Uuid;

/// Strategy producing fresh session identifiers
///
/// Identifiers must be unguessable and practically collision free. Any
/// `Fn() -> String` closure can be used as a generator.
pub trait IdGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

/// Random UUID v4 identifiers (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn generate(&self) -> String {
        self()
    }
}
