pub mod feed;
pub mod store;
pub mod view;
