mod health;
mod spa;
mod text;
mod uploads;

pub use health::health;
pub use spa::{api_not_found, serve_app};
pub use text::process_text;
pub use uploads::{get_upload, list_uploads, upload_audio};
