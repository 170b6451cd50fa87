use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use dca_db::IdempotencyToken;
use dca_execution::{ExchangeClient, ExchangeError, MarketBuyRequest, OrderLookup, SubmitOutcome};

/// How the fake venue answers the next submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Take the order and return its venue id.
    Accept,
    /// 2xx without an order id; the raw body becomes the rejection reason.
    RejectRaw(String),
    InsufficientFunds,
    /// Non-2xx the engine does not recognize.
    HttpError { status: u16, body: String },
    /// Take the order but lose the response.
    LoseResponse,
    /// Never answer.
    Hang,
}

#[derive(Default)]
struct VenueState {
    script: VecDeque<ScriptedReply>,
    next_id: u64,
    /// Orders the venue holds, keyed by client token.
    orders: HashMap<IdempotencyToken, String>,
    submissions: Vec<MarketBuyRequest>,
    lookup_failure: Option<u16>,
    token_lookup_failures: HashMap<IdempotencyToken, u16>,
}

/// Scripted venue. Idempotent by token: resubmitting a token it already
/// holds returns the original venue id and creates nothing new.
///
/// Venue ids are deterministic: `VENUE-000001`, `VENUE-000002`, ...
pub struct FakeExchange {
    state: Mutex<VenueState>,
    default_reply: ScriptedReply,
}

impl Default for FakeExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeExchange {
    /// Accepts everything unless scripted otherwise.
    pub fn new() -> Self {
        Self::with_default(ScriptedReply::Accept)
    }

    pub fn with_default(default_reply: ScriptedReply) -> Self {
        Self {
            state: Mutex::new(VenueState {
                next_id: 1,
                ..VenueState::default()
            }),
            default_reply,
        }
    }

    /// Queue replies for the next submissions, in order.
    pub fn script(&self, replies: impl IntoIterator<Item = ScriptedReply>) {
        self.lock().script.extend(replies);
    }

    /// Make lookups fail with this HTTP status (`None` restores them).
    pub fn fail_lookups(&self, status: Option<u16>) {
        self.lock().lookup_failure = status;
    }

    /// Make lookups for one token fail with this HTTP status.
    pub fn fail_lookup_for(&self, token: IdempotencyToken, status: u16) {
        self.lock().token_lookup_failures.insert(token, status);
    }

    /// Every request received, in arrival order.
    pub fn submissions(&self) -> Vec<MarketBuyRequest> {
        self.lock().submissions.clone()
    }

    /// Number of distinct orders the venue holds.
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn venue_id_for(&self, token: &IdempotencyToken) -> Option<String> {
        self.lock().orders.get(token).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VenueState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl VenueState {
    fn take_order(&mut self, token: IdempotencyToken) -> String {
        if let Some(existing) = self.orders.get(&token) {
            return existing.clone();
        }
        let id = format!("VENUE-{:06}", self.next_id);
        self.next_id += 1;
        self.orders.insert(token, id.clone());
        id
    }
}

#[async_trait]
impl ExchangeClient for FakeExchange {
    async fn place_market_buy(
        &self,
        request: &MarketBuyRequest,
    ) -> Result<SubmitOutcome, ExchangeError> {
        // Decide under the lock, answer after releasing it.
        let answer = {
            let mut st = self.lock();
            st.submissions.push(request.clone());
            let reply = st
                .script
                .pop_front()
                .unwrap_or_else(|| self.default_reply.clone());
            match reply {
                ScriptedReply::Accept => Some(Ok(SubmitOutcome::Accepted {
                    venue_order_id: st.take_order(request.idempotency_token),
                })),
                ScriptedReply::RejectRaw(body) => Some(Ok(SubmitOutcome::Rejected { reason: body })),
                ScriptedReply::InsufficientFunds => Some(Err(ExchangeError::InsufficientFunds {
                    message: "Insufficient funds".to_string(),
                })),
                ScriptedReply::HttpError { status, body } => {
                    Some(Err(ExchangeError::Http { status, body }))
                }
                ScriptedReply::LoseResponse => {
                    st.take_order(request.idempotency_token);
                    Some(Err(ExchangeError::Transport(
                        "connection reset by peer".to_string(),
                    )))
                }
                ScriptedReply::Hang => None,
            }
        };

        match answer {
            Some(res) => res,
            None => std::future::pending().await,
        }
    }

    async fn lookup_by_token(&self, token: &IdempotencyToken) -> Result<OrderLookup, ExchangeError> {
        let st = self.lock();
        let failure = st
            .lookup_failure
            .or_else(|| st.token_lookup_failures.get(token).copied());
        if let Some(status) = failure {
            return Err(ExchangeError::Http {
                status,
                body: "lookup unavailable".to_string(),
            });
        }
        Ok(match st.orders.get(token) {
            Some(venue_order_id) => OrderLookup::Found {
                venue_order_id: venue_order_id.clone(),
            },
            None => OrderLookup::NotFound,
        })
    }
}
