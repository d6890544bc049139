/// Middleware module
///
/// Bearer token authentication for the `/users` scope.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
