mod api;
mod backend;
