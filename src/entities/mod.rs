pub mod prelude;

pub mod activity_logs;
pub mod admin_keys;
pub mod invites;
pub mod users;
