//! Credential refresh coordination for s3deck.
//!
//! Object-store calls run with short-lived credentials. When one reports
//! that they have expired, [`ReauthCoordinator::with_reauth`] asks the
//! identity provider for new ones through a single-flight
//! [`RefreshGate`], so any number of concurrently failing calls share one
//! refresh round trip, then retries the call exactly once.
//!
//! # Pieces
//!
//! - [`CredentialStore`]: the committed session, swapped whole
//! - [`RefreshGate`]: at most one refresh in flight, outcome broadcast
//! - [`ReauthCoordinator`]: login, logout, restore and the retry wrapper
//! - [`IdentityProvider`]: collaborator trait implemented by the app

pub mod coordinator;
pub mod error;
pub mod gate;
pub mod provider;
pub mod state;

pub use coordinator::{ReauthConfig, ReauthCoordinator, RepeatedExpiryPolicy};
pub use error::{LoginError, ReauthError};
pub use gate::{Admission, RefreshGate, RefreshLease, RefreshOutcome, RefreshWaiter};
pub use provider::{IdentityProvider, ProviderFuture};
pub use state::{CredentialStore, Session};
