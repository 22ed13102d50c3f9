pub mod json;
pub mod plain;

pub use json::output_json;
pub use plain::{output_rate_plain, output_recv_plain, output_send_plain};
