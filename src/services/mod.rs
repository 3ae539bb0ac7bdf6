// Services layer - Business logic and orchestration

pub mod auth_service;
pub mod crypto;
pub mod social_auth_service;
pub mod token_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use social_auth_service::SocialAuthService;
pub use token_service::TokenService;
pub use user_service::UserService;
