pub mod mapper;
pub mod normalize;
pub mod schema;
pub mod tokens;
pub mod types;

pub use mapper::*;
pub use normalize::*;
pub use schema::*;
pub use tokens::*;
pub use types::*;
