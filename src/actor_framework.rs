//! Request/response plumbing shared by every actor client.
//!
//! Each service owns an `mpsc::Receiver` of typed request enums; each variant
//! carries a [`Response`] channel. Clients build the request, send it, and wait
//! for the answer under a deadline so a stuck actor never blocks a caller.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

pub type Response<T, E> = oneshot::Sender<Result<T, E>>;

/// Send a request built around a fresh response channel and await the reply.
///
/// `unavailable` turns a closed mailbox, a dropped responder or an expired
/// `timeout` into the caller's error type.
pub async fn request<Req, T, E>(
    sender: &mpsc::Sender<Req>,
    timeout: Duration,
    build: impl FnOnce(Response<T, E>) -> Req,
    unavailable: impl Fn(String) -> E,
) -> Result<T, E> {
    let (respond_to, response) = oneshot::channel();
    let exchange = async {
        if sender.send(build(respond_to)).await.is_err() {
            return Err(unavailable("actor closed".to_string()));
        }
        match response.await {
            Ok(result) => result,
            Err(_) => Err(unavailable("actor dropped the request".to_string())),
        }
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(unavailable(format!("call timed out after {:?}", timeout))),
    }
}
