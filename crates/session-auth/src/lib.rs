//! Session credential library
//!
//! Holds the access/refresh credential pair of a logged-in session and the
//! wire types of the auth endpoints. This crate does no networking; the
//! request pipeline in `session-client` drives it.
//!
//! Credential flow:
//! 1. Login or registration returns a `LoginResponse`; its tokens are stored
//!    via `CredentialStore::set()`
//! 2. Every outgoing request reads `CredentialStore::get()` for the bearer
//! 3. On expiry the refresh exchange posts a `RefreshRequest` and the
//!    `RefreshResponse` becomes the next pair via `RefreshResponse::into_pair()`
//! 4. Logout or a failed refresh calls `CredentialStore::clear()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod models;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialPair, CredentialStore, FileStore, MemoryStore};
pub use error::{Error, Result};
pub use models::{
    MessageResponse, PasswordResetConfirm, PasswordResetRequest, SetRoleRequest, User,
    UserCreate, UserLogin, UserResponse, UserRole,
};
pub use token::{LoginResponse, LoginTokens, RefreshRequest, RefreshResponse};
