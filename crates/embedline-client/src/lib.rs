pub mod client;
pub mod http;
pub mod response;
pub mod retry;
pub mod tokens;

pub mod prelude {
    pub use crate::client::EmbeddingClient;
    pub use crate::http::{HttpClientConfig, HttpEmbeddingClient};
    pub use crate::response::{EmbedResponse, VectorShape};
    pub use crate::retry::{RetryPolicy, RetryingClient, with_retry};
    pub use crate::tokens::{TokenEstimator, WordEstimator};
}
