pub mod auth_service;
pub mod category_service;
pub mod layer_service;
pub mod permission_service;
pub mod user_service;

pub use auth_service::*;
pub use category_service::*;
pub use layer_service::*;
pub use permission_service::*;
pub use user_service::*;
