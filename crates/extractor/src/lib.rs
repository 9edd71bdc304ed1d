pub mod html;
pub mod http;
pub mod report;

pub use http::HttpExtractor;
pub use report::parse_report;
