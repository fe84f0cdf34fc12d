//! crates/library_core/src/policy.rs
//!
//! The authorization gate: a pure mapping from (role, operation) to permit/deny.
//! Entity state plays no part here; services consult the gate before they look
//! at whether a transition is legal.

use crate::domain::{Actor, Role};
use crate::error::{LibraryError, LibraryResult};

/// Every operation the gate knows how to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewCatalog,
    ManageCatalog,
    CheckoutSelf,
    CheckoutOnBehalf,
    CheckinOwn,
    CheckinOthers,
    Archive,
    ManageUsers,
    EnrichMetadata,
}

impl Operation {
    #[cfg(test)]
    const ALL: [Operation; 9] = [
        Operation::ViewCatalog,
        Operation::ManageCatalog,
        Operation::CheckoutSelf,
        Operation::CheckoutOnBehalf,
        Operation::CheckinOwn,
        Operation::CheckinOthers,
        Operation::Archive,
        Operation::ManageUsers,
        Operation::EnrichMetadata,
    ];

    fn describe(&self) -> &'static str {
        match self {
            Operation::ViewCatalog => "view the catalog",
            Operation::ManageCatalog => "create, update or delete books",
            Operation::CheckoutSelf => "check out books",
            Operation::CheckoutOnBehalf => "check out books for another user",
            Operation::CheckinOwn => "check in books",
            Operation::CheckinOthers => "check in another user's loan",
            Operation::Archive => "archive or unarchive books",
            Operation::ManageUsers => "manage users",
            Operation::EnrichMetadata => "request metadata suggestions",
        }
    }
}

/// The policy table. Each row lists the roles allowed to perform the operation.
const POLICY: [(Operation, &[Role]); 9] = [
    (Operation::ViewCatalog, &[Role::Admin, Role::Staff, Role::Member]),
    (Operation::ManageCatalog, &[Role::Admin, Role::Staff]),
    (Operation::CheckoutSelf, &[Role::Admin, Role::Staff, Role::Member]),
    (Operation::CheckoutOnBehalf, &[Role::Admin, Role::Staff]),
    (Operation::CheckinOwn, &[Role::Admin, Role::Staff, Role::Member]),
    (Operation::CheckinOthers, &[Role::Admin, Role::Staff]),
    (Operation::Archive, &[Role::Admin]),
    (Operation::ManageUsers, &[Role::Admin]),
    (Operation::EnrichMetadata, &[Role::Admin, Role::Staff]),
];

/// Whether `role` may perform `op`.
pub fn permits(role: Role, op: Operation) -> bool {
    POLICY
        .iter()
        .find(|(row, _)| *row == op)
        .is_some_and(|(_, roles)| roles.contains(&role))
}

/// Checks an optional actor against the table.
///
/// A missing actor is `Unauthenticated`; a known actor failing the table is `Forbidden`.
pub fn authorize(actor: Option<&Actor>, op: Operation) -> LibraryResult<&Actor> {
    let actor = actor.ok_or(LibraryError::Unauthenticated)?;
    if permits(actor.role, op) {
        Ok(actor)
    } else {
        Err(LibraryError::Forbidden(format!(
            "role {} may not {}",
            actor.role,
            op.describe()
        )))
    }
}
