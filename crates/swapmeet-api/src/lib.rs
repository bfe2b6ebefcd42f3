pub mod assemble;
pub mod chats;
pub mod error;
pub mod firebase;
pub mod identity;
pub mod items;
pub mod messages;
pub mod middleware;
pub mod products;
pub mod profile;

use std::sync::Arc;

use swapmeet_db::Database;

use crate::firebase::FirebaseVerifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub verifier: FirebaseVerifier,
}
