pub mod alerts;
pub mod catalog;
pub mod reviews;
pub mod users;

pub use catalog::CatalogService;
pub use reviews::ReviewPipeline;
pub use users::{FavoriteOutcome, UserService};
