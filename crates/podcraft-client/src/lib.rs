//! Client library for the podcraft studio backend: typed REST calls, the
//! generation-status poller and the studio view-model it drives.

pub mod api;
pub mod config;
pub mod platform;
pub mod poller;
pub mod protocol;
pub mod single_flight;
pub mod status;
pub mod view;

pub use api::{ApiError, PodcraftApi};
pub use config::Config;
pub use poller::{PollerError, PollerEvent, PollerHandle, StatusPoller, SubscriptionState};
pub use protocol::GenerationStatus;
pub use status::{ConflictPolicy, Effect, FollowUpKind, Region};
pub use view::StudioView;
