//! Object browser for s3deck.
//!
//! Lists a user's private folder, creates folders and hands uploads to the
//! transfer engine. Every call goes through
//! [`ReauthCoordinator::with_reauth`](s3deck_auth::ReauthCoordinator::with_reauth),
//! so expired credentials are refreshed once and the call retried.

mod browser;
mod content;
mod store;

pub use browser::{BrowseError, ObjectBrowser, normalize_folder, user_prefix};
pub use content::{Content, contents_from_listing};
pub use store::{
    ObjectEntry, ObjectListing, ObjectStore, StoreFuture, TransferEngine, TransferRequest,
};
