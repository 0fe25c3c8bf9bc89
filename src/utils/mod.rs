pub mod id;
pub mod ip;
pub mod url_validator;

pub use id::{LINK_ID_BYTES, generate_link_id, is_valid_link_id};
pub use ip::client_ip;
pub use url_validator::{UrlValidationError, validate_url};
