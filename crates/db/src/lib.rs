pub mod connection;
pub mod migrations;
pub mod realtime;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use realtime::{InProcessScoreFeed, ScoreFeed, ScoreSubscription};
pub use repositories::{
    CustomerStore, EngagementStore, InMemoryCustomerStore, InMemoryEngagementStore,
    RepositoryError, SqlCustomerStore, SqlEngagementStore,
};
