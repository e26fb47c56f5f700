//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";
pub const GET_MOBILE_DUTY_ACTIVE: &str = "/api/mobile/duty/active";
pub const POST_MOBILE_DUTY_CLOCK_IN: &str = "/api/mobile/duty/clock-in";
pub const POST_MOBILE_DUTY_CLOCK_OUT: &str = "/api/mobile/duty/clock-out";
pub const GET_MOBILE_ME: &str = "/api/mobile/me";
pub const POST_MOBILE_PROFILE_SYNC: &str = "/api/mobile/profile/sync";
