mod ids;
mod structs;

pub use ids::{IdParseError, UserId};
pub use structs::{PayloadError, User, UserFields};
