pub use super::activity_logs::Entity as ActivityLogs;
pub use super::admin_keys::Entity as AdminKeys;
pub use super::invites::Entity as Invites;
pub use super::users::Entity as Users;
