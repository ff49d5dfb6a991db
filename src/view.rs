//! The result set on display, updated only by the newest request.
//!
//! Every dispatch takes a [`Ticket`]. Taking a new ticket makes all older
//! ones stale: their responses are dropped on arrival instead of replacing
//! what the newer request shows. In-flight requests are not cancelled.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::ClientError;
use crate::results::BindingTable;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    Idle,
    Pending,
    Ready(BindingTable),
    /// Display-only message for a failed request.
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    state: ViewState,
}

#[derive(Debug, Default)]
pub struct ResultView {
    inner: Mutex<Inner>,
}

impl ResultView {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self) -> Ticket {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = ViewState::Pending;
        Ticket(inner.generation)
    }

    /// Applies `outcome` if `ticket` is still the newest. Returns whether it was.
    pub fn complete(&self, ticket: Ticket, outcome: Result<BindingTable, ClientError>) -> bool {
        let mut inner = self.lock();
        if ticket.0 != inner.generation {
            warn!(
                ticket = ticket.0,
                current = inner.generation,
                "discarding stale response"
            );
            return false;
        }

        inner.state = match outcome {
            Ok(table) => ViewState::Ready(table),
            Err(err) => {
                warn!("query failed: {}", err);
                ViewState::Failed(err.display_message())
            }
        };
        true
    }

    pub async fn run<F>(&self, request: F) -> bool
    where
        F: Future<Output = Result<BindingTable, ClientError>>,
    {
        let ticket = self.begin();
        let outcome = request.await;
        self.complete(ticket, outcome)
    }

    pub fn state(&self) -> ViewState {
        self.lock().state.clone()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.lock().state, ViewState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;
    use crate::results::{extract_bindings, SparqlResults};

    fn table(value: &str) -> BindingTable {
        let body = format!(
            r#"{{ "head": {{ "vars": ["x"] }}, "results": {{ "bindings": [ {{ "x": {{ "type": "literal", "value": "{}" }} }} ] }} }}"#,
            value
        );
        extract_bindings(&SparqlResults::from_json(&body).unwrap())
    }

    #[test]
    fn test_newest_ticket_wins() {
        let view = ResultView::new();
        assert_eq!(view.state(), ViewState::Idle);

        let a = view.begin();
        let b = view.begin();
        assert!(view.is_busy());

        assert!(view.complete(b, Ok(table("B"))));
        assert!(!view.complete(a, Ok(table("A"))));
        assert_eq!(view.state(), ViewState::Ready(table("B")));
    }

    #[test]
    fn test_stale_response_leaves_view_pending() {
        let view = ResultView::new();
        let a = view.begin();
        let _b = view.begin();

        assert!(!view.complete(a, Ok(table("A"))));
        assert_eq!(view.state(), ViewState::Pending);
    }

    #[test]
    fn test_failure_is_shown() {
        let view = ResultView::new();
        let ticket = view.begin();
        let err = ClientError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "Parse error: unexpected '}'".to_owned(),
        };

        assert!(view.complete(ticket, Err(err)));
        assert_eq!(
            view.state(),
            ViewState::Failed("Parse error: unexpected '}'".to_owned())
        );
    }

    #[tokio::test]
    async fn test_superseded_request_is_discarded() {
        let view = ResultView::new();
        let (send_a, recv_a) = oneshot::channel::<BindingTable>();
        let (send_b, recv_b) = oneshot::channel::<BindingTable>();

        let request_a = view.run(async { Ok(recv_a.await.unwrap()) });
        let request_b = async {
            // Let A take its ticket first.
            tokio::task::yield_now().await;
            view.run(async { Ok(recv_b.await.unwrap()) }).await
        };
        let responses = async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            send_b.send(table("B")).unwrap();
            tokio::task::yield_now().await;
            send_a.send(table("A")).unwrap();
        };

        let (applied_a, applied_b, ()) = tokio::join!(request_a, request_b, responses);

        assert!(!applied_a);
        assert!(applied_b);
        assert_eq!(view.state(), ViewState::Ready(table("B")));
    }
}
