use lazy_static::lazy_static;
use reqwest::ClientBuilder;
use reqwest_middleware::{ClientBuilder as ClientWithMiddlewareBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

const IDENTITY_RETRY_COUNT: u32 = 3;
const USER_AGENT: &str = concat!("pmon/", env!("CARGO_PKG_VERSION"));

lazy_static! {
    // Status polls are never retried, the next poll cycle is the retry
    pub static ref REQUEST_CLIENT: ClientWithMiddleware = ClientWithMiddlewareBuilder::new(
        ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()
            .unwrap()
    )
    .build();

    // Client with retry middleware for the one-time master identity request
    pub static ref IDENTITY_CLIENT: ClientWithMiddleware = ClientWithMiddlewareBuilder::new(
        ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()
            .unwrap()
    )
    .with(RetryTransientMiddleware::new_with_policy(
        ExponentialBackoff::builder().build_with_max_retries(IDENTITY_RETRY_COUNT)
    ))
    .build();
}
