//! Cover enrichment for a book catalog.
//!
//! Book creation calls [`trigger::CoverTrigger`], which publishes a request on
//! the [`channel`]. A [`worker::CoverWorker`] consumes requests and hands them
//! to [`cover::CoverResolver`], which queries the [`lookup`] catalogs and
//! writes the resolved cover URL back through [`cover::CoverStore`].

pub mod channel;
pub mod config;
pub mod cover;
pub mod error;
pub mod lookup;
pub mod pipeline;
pub mod trigger;
pub mod worker;

pub mod prelude {
    pub use crate::channel::{CoverLookupRequest, CoverPublisher, CoverSubscriber, COVER_CHANNEL};
    pub use crate::cover::{CoverOutcome, CoverResolver, CoverStore};
    pub use crate::error::*;
    pub use crate::lookup::{CatalogClient, CoverCandidate, IsbnCoverLookup};
}
