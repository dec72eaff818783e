pub mod department;
pub mod role;
pub mod user;

pub use department::Department;
pub use role::{Role, UserStatus};
pub use user::User;
