pub mod reddit_http;

pub use reddit_http::{RedditClient, RedditClientConfig};
