//! Integration tests for the Graph adapter, backed by wiremock.

mod common;
mod test_delta;
mod test_download;
mod test_token_refresh;
