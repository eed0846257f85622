use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::TableClient;
use crate::cart::Cart;
use crate::models::{Order, OrderBatch};
use crate::navigation::{Navigator, Screen, TrackingTransition};
use crate::orders::{self, DeliveryDetails, OrderError};
use crate::tracking::{self, TrackingPoller};

/// A message pushed to the front end outside any request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event: &'static str,
    pub payload: Value,
}

pub type EventSender = mpsc::UnboundedSender<Event>;

/// Everything one storefront session owns.
pub struct AppState<C: TableClient> {
    pub client: Arc<C>,
    pub session_id: String,
    poll_interval: Duration,
    cart: Mutex<Cart>,
    nav: Mutex<Navigator>,
    poller: Mutex<Option<TrackingPoller>>,
    placing_order: AtomicBool,
    events: Option<EventSender>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, String> {
    mutex.lock().map_err(|e| format!("{what} lock failed: {e}"))
}

impl<C: TableClient> AppState<C> {
    pub fn new(client: Arc<C>, poll_interval: Duration, events: Option<EventSender>) -> Self {
        AppState {
            client,
            session_id: uuid::Uuid::new_v4().to_string(),
            poll_interval,
            cart: Mutex::new(Cart::new()),
            nav: Mutex::new(Navigator::default()),
            poller: Mutex::new(None),
            placing_order: AtomicBool::new(false),
            events,
        }
    }

    pub fn emit(&self, event: &'static str, payload: Value) {
        if let Some(tx) = &self.events {
            if tx.send(Event { event, payload }).is_err() {
                debug!(event, "event dropped: front end channel closed");
            }
        }
    }

    pub fn cart(&self) -> Result<MutexGuard<'_, Cart>, String> {
        lock(&self.cart, "cart")
    }

    pub fn navigator(&self) -> Result<MutexGuard<'_, Navigator>, String> {
        lock(&self.nav, "navigation")
    }

    /// Run `f` on the cart and broadcast the new totals.
    pub fn with_cart<T>(&self, f: impl FnOnce(&mut Cart) -> T) -> Result<T, String> {
        let (out, summary) = {
            let mut cart = self.cart()?;
            let out = f(&mut cart);
            (out, cart.summary())
        };
        self.emit(
            "cart_changed",
            serde_json::to_value(&summary).unwrap_or(Value::Null),
        );
        Ok(out)
    }

    /// Switch screens, starting or stopping batch polling as tracking is
    /// entered or left.
    ///
    /// The navigator stays locked until the poller matches the new screen, so
    /// concurrent switches cannot leave a poller behind. Lock order is
    /// navigator, then poller.
    pub fn navigate(&self, next: Screen) -> Result<Screen, String> {
        let mut nav = self.navigator()?;
        match nav.go(next.clone()) {
            TrackingTransition::Start => self.start_tracking()?,
            TrackingTransition::Stop => self.stop_tracking()?,
            TrackingTransition::Unchanged => {}
        }
        drop(nav);
        debug!(screen = next.name(), "navigated");
        self.emit(
            "screen_changed",
            serde_json::to_value(&next).unwrap_or(Value::Null),
        );
        Ok(next)
    }

    pub fn is_tracking(&self) -> bool {
        self.poller
            .lock()
            .map(|p| p.as_ref().is_some_and(TrackingPoller::is_running))
            .unwrap_or(false)
    }

    /// Last batch the poller saw, if tracking is on.
    pub fn latest_batch(&self) -> Option<OrderBatch> {
        self.poller
            .lock()
            .ok()
            .and_then(|p| p.as_ref().and_then(TrackingPoller::latest))
    }

    fn start_tracking(&self) -> Result<(), String> {
        let poller = TrackingPoller::start(self.client.clone(), self.poll_interval);
        let mut rx = poller.subscribe();
        if let Some(tx) = self.events.clone() {
            tokio::spawn(async move {
                // Ends when the poller task drops its sender.
                while rx.changed().await.is_ok() {
                    let batch = rx.borrow_and_update().clone();
                    let view = tracking::tracking_view(batch.as_ref());
                    let payload = serde_json::to_value(&view).unwrap_or(Value::Null);
                    if tx
                        .send(Event {
                            event: "batch_status",
                            payload,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        if let Some(previous) = lock(&self.poller, "poller")?.replace(poller) {
            previous.stop();
        }
        Ok(())
    }

    fn stop_tracking(&self) -> Result<(), String> {
        if let Some(poller) = lock(&self.poller, "poller")?.take() {
            poller.stop();
        }
        Ok(())
    }

    /// Place an order from the current cart. On success the cart is cleared
    /// and the confirmation screen is shown.
    ///
    /// Only one placement runs at a time; a second one is refused with
    /// [`OrderError::InProgress`].
    pub async fn place_order(&self, details: &DeliveryDetails) -> Result<Order, OrderError> {
        if self.placing_order.swap(true, Ordering::AcqRel) {
            warn!(session_id = %self.session_id, "order placement already in progress");
            return Err(OrderError::InProgress);
        }
        let _placing = PlacingOrder(&self.placing_order);
        self.place_order_inner(details).await
    }

    async fn place_order_inner(&self, details: &DeliveryDetails) -> Result<Order, OrderError> {
        let items = match self.cart() {
            Ok(cart) => cart.items().to_vec(),
            Err(e) => {
                warn!(error = %e, "order placement: cart unavailable");
                Vec::new()
            }
        };

        let order = orders::place_order(self.client.as_ref(), &items, details).await?;

        if let Err(e) = self.with_cart(Cart::clear) {
            warn!(error = %e, "cart clear after order failed");
        }
        if let Err(e) = self.navigate(Screen::Confirmation {
            order_id: order.id.clone(),
        }) {
            warn!(error = %e, "navigation after order failed");
        }
        info!(session_id = %self.session_id, order_id = %order.id, "checkout complete");
        Ok(order)
    }
}

/// Clears the in-flight checkout flag, even if the placement is cancelled.
struct PlacingOrder<'a>(&'a AtomicBool);

impl Drop for PlacingOrder<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: TableClient> Drop for AppState<C> {
    fn drop(&mut self) {
        if let Ok(mut poller) = self.poller.lock() {
            if let Some(p) = poller.take() {
                p.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Table;
    use crate::models::{Category, MenuItem};
    use crate::testing::MemoryTables;
    use serde_json::json;

    fn item(id: &str, price: f64) -> MenuItem {
        MenuItem {
            id: id.into(),
            name: id.into(),
            price,
            category: Category::Biryani,
            image_url: String::new(),
            description: String::new(),
            is_available: true,
            is_recommended: false,
            created_at: None,
        }
    }

    fn details() -> DeliveryDetails {
        DeliveryDetails {
            user_name: "Meera".into(),
            hostel: "H1".into(),
            room: "12".into(),
            phone: "999".into(),
        }
    }

    #[tokio::test]
    async fn successful_order_clears_cart_and_shows_confirmation() {
        let tables = Arc::new(MemoryTables::new());
        tables.seed(
            Table::OrderBatches,
            json!({ "id": "b1", "slot_label": "Dinner", "current_step": 1, "status_message": "" }),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = AppState::new(tables.clone(), Duration::from_secs(10), Some(tx));
        state
            .with_cart(|cart| {
                cart.add(&item("a", 100.0));
                cart.add(&item("a", 100.0));
            })
            .expect("cart");

        let order = state.place_order(&details()).await.expect("order");
        assert_eq!(order.total_amount, 200.0);
        assert!(state.cart().expect("cart").is_empty());
        assert_eq!(
            state.navigator().expect("nav").screen(),
            &Screen::Confirmation {
                order_id: order.id.clone()
            }
        );

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.event);
        }
        assert_eq!(names, vec!["cart_changed", "cart_changed", "screen_changed"]);
    }

    #[tokio::test]
    async fn refused_order_keeps_cart() {
        let tables = Arc::new(MemoryTables::new());
        let state = AppState::new(tables.clone(), Duration::from_secs(10), None);
        state
            .with_cart(|cart| cart.add(&item("a", 100.0)))
            .expect("cart");

        let err = state.place_order(&details()).await.expect_err("no batch");
        assert!(matches!(err, OrderError::NoActiveBatch));
        assert_eq!(state.cart().expect("cart").total_items(), 1);
        assert_eq!(state.navigator().expect("nav").screen(), &Screen::Home);
    }

    #[tokio::test]
    async fn tracking_screen_controls_poller() {
        let tables = Arc::new(MemoryTables::new());
        let state = AppState::new(tables, Duration::from_secs(10), None);

        state.navigate(Screen::Tracking).expect("navigate");
        assert!(state.is_tracking());

        state.navigate(Screen::Home).expect("navigate");
        tokio::task::yield_now().await;
        assert!(state.poller.lock().expect("poller").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_screen_switches_leave_poller_matching_screen() {
        let tables = Arc::new(MemoryTables::new());
        let state = Arc::new(AppState::new(tables, Duration::from_secs(10), None));

        for round in 0..200 {
            let enter = {
                let state = state.clone();
                tokio::spawn(async move { state.navigate(Screen::Tracking) })
            };
            let leave = {
                let state = state.clone();
                tokio::spawn(async move { state.navigate(Screen::Home) })
            };
            enter.await.expect("join").expect("navigate");
            leave.await.expect("join").expect("navigate");

            let on_tracking = state.navigator().expect("nav").screen() == &Screen::Tracking;
            let has_poller = state.poller.lock().expect("poller").is_some();
            assert_eq!(on_tracking, has_poller, "round {round}");
        }
    }

    #[tokio::test]
    async fn second_checkout_is_refused_while_first_runs() {
        let tables = Arc::new(MemoryTables::new());
        tables.seed(
            Table::OrderBatches,
            json!({ "id": "b1", "slot_label": "Lunch", "current_step": 1, "status_message": "" }),
        );
        let state = AppState::new(tables.clone(), Duration::from_secs(10), None);
        state
            .with_cart(|cart| cart.add(&item("a", 50.0)))
            .expect("cart");

        state.placing_order.store(true, Ordering::Release);
        let err = state.place_order(&details()).await.expect_err("busy");
        assert!(matches!(err, OrderError::InProgress));
        assert_eq!(state.cart().expect("cart").total_items(), 1);

        state.placing_order.store(false, Ordering::Release);
        state.place_order(&details()).await.expect("order");
        assert!(state.cart().expect("cart").is_empty());
        assert!(!state.placing_order.load(Ordering::Acquire));
    }
}
