// 인증 라우트와 헬스 체크
mod auth;
mod health_check;

pub use auth::{logout, refresh, signin, signup};
pub use health_check::health_check;
