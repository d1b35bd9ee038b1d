// Domain-level errors for rejected client commands.

use super::state::ObjectId;

#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    // The sending session has no player in the roster.
    UnknownPlayer,
    // No object with this id exists (already removed or never existed).
    UnknownObject(ObjectId),
    // The object exists but the command does not apply to its kind.
    WrongKind {
        id: ObjectId,
        expected: &'static str,
        found: &'static str,
    },
}
