pub mod browser;
pub mod http;
pub mod traits;
pub mod types;

pub use browser::BrowserPageFetcher;
pub use http::HttpPageFetcher;
pub use traits::PageTextSource;
pub use types::{FetchOptions, DEFAULT_SOURCE_URL};
