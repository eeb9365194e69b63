mod http;
mod memory;
mod query;
