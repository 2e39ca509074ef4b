//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database reads and writes plus their notification
//! and activity side effects.

mod connection;
mod discovery;
mod feed;
mod messaging;

pub use connection::ConnectionService;
pub use discovery::{
    CatalogEntry, DiscoveryService, GroupedEntries, HobbyMatch, HobbySearchHit, InterestMatch,
    InterestSearchHit, group_by_member, rank_shared_matches,
};
pub use feed::FeedService;
pub use messaging::MessagingService;
