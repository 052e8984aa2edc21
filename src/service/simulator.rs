//! Status progression simulator
//!
//! Mock fulfillment: there is no real payment or carrier integration,
//! so a background task probabilistically walks orders through
//! PROCESSING -> IN_TRANSIT -> DELIVERED. The task is owned and
//! cancellable; it is spawned at startup and cancelled on shutdown so
//! no interval leaks across redeployments or test runs.

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SimulatorConfig;
use crate::error::Result;
use crate::store::OrderStore;

pub struct StatusSimulator {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatusSimulator {
    pub fn spawn(orders: OrderStore, config: SimulatorConfig) -> Self {
        let token = CancellationToken::new();
        let child = token.child_token();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        // Tick failures are logged and the next tick
                        // proceeds regardless.
                        if let Err(e) = tick(&orders, &config).await {
                            tracing::warn!(error = ?e, "status simulator tick failed");
                        }
                    }
                }
            }
            tracing::debug!("status simulator stopped");
        });
        Self { token, handle }
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

async fn tick(orders: &OrderStore, config: &SimulatorConfig) -> Result<()> {
    let awaiting = orders.ids_awaiting_payment().await?;
    let paid = select_advancing(awaiting, config.payment_probability, &mut rand::thread_rng());
    for id in paid {
        orders.mark_paid_and_shipped(id).await?;
        tracing::debug!(order_id = %id, "payment completed, order in transit");
    }

    let in_transit = orders.ids_in_transit().await?;
    let delivered =
        select_advancing(in_transit, config.delivery_probability, &mut rand::thread_rng());
    for id in delivered {
        orders.mark_delivered(id).await?;
        tracing::debug!(order_id = %id, "order delivered");
    }
    Ok(())
}

fn select_advancing(ids: Vec<Uuid>, probability: f64, rng: &mut impl Rng) -> Vec<Uuid> {
    ids.into_iter().filter(|_| rng.gen_bool(probability)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn certain_probability_advances_everything() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select_advancing(ids.clone(), 1.0, &mut rng), ids);
    }

    #[test]
    fn zero_probability_advances_nothing() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select_advancing(ids, 0.0, &mut rng).is_empty());
    }
}
