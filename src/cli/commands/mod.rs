//! CLI command implementations

pub mod cache;
pub mod config;
pub mod datasets;
pub mod encode;
pub mod props;
pub mod serve;

pub use cache::execute as cache;
pub use config::execute as config;
pub use datasets::execute as datasets;
pub use encode::execute as encode;
pub use props::execute as props;
pub use serve::execute as serve;
