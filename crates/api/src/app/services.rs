//! Infrastructure wiring: event store, bus, ledger service and the realtime feed.

use std::{convert::Infallible, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use stockroom_core::TenantId;
use stockroom_events::{EventBus, EventEnvelope, InMemoryEventBus};
use stockroom_infra::event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use stockroom_infra::stock_ledger::StockLedger;
use stockroom_ledger::LedgerResult;

use crate::app::errors;
use crate::config::ApiConfig;

pub type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type Ledger = StockLedger<Arc<dyn EventStore>, Bus>;

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: JsonValue,
}

pub struct AppServices {
    ledger: Arc<Ledger>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn EventStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await.context("failed to connect to Postgres")?;
            let store = PostgresEventStore::new(pool);
            store.migrate().await.context("failed to apply event store schema")?;
            tracing::info!("using Postgres event store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory event store");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let ledger = Arc::new(StockLedger::new(store, bus.clone(), config.ledger.clone()));

    // The Postgres adapter blocks on the runtime handle, so stay off the async workers.
    let replayed = {
        let ledger = ledger.clone();
        tokio::task::spawn_blocking(move || ledger.rebuild_read_models())
            .await
            .context("read model rebuild panicked")??
    };
    tracing::info!(events = replayed, "read models ready");

    // Realtime channel (SSE): lossy broadcast, tenant-filtered in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    // Background subscriber: bus -> realtime feed
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || {
            while let Ok(env) = sub.recv() {
                let at = env.aggregate_type().to_string();
                // No receivers is fine.
                let _ = realtime_tx.send(RealtimeMessage {
                    tenant_id: env.tenant_id(),
                    topic: format!("{at}.committed"),
                    payload: serde_json::json!({
                        "aggregate_type": at,
                        "aggregate_id": env.aggregate_id().to_string(),
                        "sequence_number": env.sequence_number(),
                        "event": env.payload(),
                    }),
                });
            }
        });
    }

    // Other replicas commit to the same database; pull their events in.
    if let (Some(_), Some(every)) = (&config.database_url, config.ledger.read_model_sync_interval) {
        spawn_read_model_sync(ledger.clone(), every);
    }

    Ok(AppServices { ledger, realtime_tx })
}

fn spawn_read_model_sync(ledger: Arc<Ledger>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let ledger = ledger.clone();
            match tokio::task::spawn_blocking(move || ledger.sync_read_models()).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, "read model sync failed"),
                Err(join) => tracing::error!(error = %join, "read model sync task failed"),
            }
        }
    });
}

impl AppServices {
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    /// Run a ledger call on the blocking pool and map its error to a response.
    pub async fn run<T, F>(&self, f: F) -> Result<T, axum::response::Response>
    where
        T: Send + 'static,
        F: FnOnce(&Ledger) -> LedgerResult<T> + Send + 'static,
    {
        let ledger = self.ledger.clone();
        match tokio::task::spawn_blocking(move || f(&ledger)).await {
            Ok(result) => result.map_err(errors::ledger_error_to_response),
            Err(join) => {
                tracing::error!(error = %join, "ledger task failed");
                Err(errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "ledger task failed",
                ))
            }
        }
    }
}

pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
