#[cfg(feature = "http")]
mod http;
