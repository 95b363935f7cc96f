mod codec;
mod users;

pub use codec::{document_to_user, user_to_document};
pub use users::UserRepo;
