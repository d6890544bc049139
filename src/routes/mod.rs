mod api_access;
mod health_check;
mod users;

pub use api_access::{api_1, api_2};
pub use health_check::health_check;
pub use users::{edit_user, get_user, list_users, signin, signup};
