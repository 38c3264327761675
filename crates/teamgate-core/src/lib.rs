pub mod membership;
pub mod model;
pub mod permissions;
pub mod role;
