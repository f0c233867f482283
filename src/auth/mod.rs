pub mod jwt_service;
pub mod middleware;

pub use jwt_service::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::{AuthMiddleware, ClaimsExt};
