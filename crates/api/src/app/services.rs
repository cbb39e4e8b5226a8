use std::io;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use tradeflow_accounts::UserAccount;
use tradeflow_core::{Clock, OrderId, SystemClock};
use tradeflow_infra::jobs::{DailySchedule, LatestSettlement, SettlementScheduler, SettlementSchedulerHandle};
use tradeflow_infra::projections::{OrderActivity, OrderActivityProjection};
use tradeflow_infra::workers::{EventWorker, WorkerHandle};
use tradeflow_infra::{
    AppConfig, InMemoryStore, PostgresStore, ServiceError, ServiceResult, SettlementReport, Store,
    TradingServices,
};
use tradeflow_orders::{Order, OrderEvent};
use tradeflow_products::Product;

const PG_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
enum Backend {
    InMemory(Arc<TradingServices<InMemoryStore>>),
    Persistent(Arc<TradingServices<PostgresStore>>),
}

/// Services the HTTP handlers call, over whichever store was configured.
///
/// Every service call is synchronous; handlers reach them through
/// `spawn_blocking` so the async executor is never blocked.
#[derive(Clone)]
pub struct AppServices {
    backend: Backend,
    latest_settlement: LatestSettlement,
    activity: Arc<OrderActivityProjection>,
}

/// Run a service call on the blocking pool, against whichever backend is active.
macro_rules! on_backend {
    ($self:expr, |$svc:ident| $body:expr) => {
        match &$self.backend {
            Backend::InMemory(s) => {
                let $svc = Arc::clone(s);
                blocking(move || $body).await
            }
            Backend::Persistent(s) => {
                let $svc = Arc::clone(s);
                blocking(move || $body).await
            }
        }
    };
}

async fn blocking<T, F>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Internal(format!("blocking task failed: {e}")))?
}

impl AppServices {
    pub async fn deposit(&self, username: String, amount: Decimal) -> ServiceResult<UserAccount> {
        on_backend!(self, |svc| svc.accounts.deposit(&username, amount))
    }

    pub async fn find_user(&self, username: String) -> ServiceResult<UserAccount> {
        on_backend!(self, |svc| svc.accounts.find_user(&username))
    }

    pub async fn add_or_update_product_stock(
        &self,
        merchant: String,
        sku: String,
        name: String,
        price: Decimal,
        quantity: i64,
    ) -> ServiceResult<Product> {
        on_backend!(self, |svc| svc
            .inventory
            .add_or_update_product_stock(&merchant, &sku, &name, price, quantity))
    }

    pub async fn place_order(&self, username: String, sku: String, quantity: i64) -> ServiceResult<Order> {
        on_backend!(self, |svc| svc.placement.place_order(&username, &sku, quantity))
    }

    pub async fn find_order(&self, id: OrderId) -> ServiceResult<Order> {
        on_backend!(self, |svc| svc.orders.find_order(id))
    }

    /// Run settlement now; the report also becomes the latest one.
    pub async fn run_settlement(&self) -> ServiceResult<SettlementReport> {
        let report = on_backend!(self, |svc| svc.settlement.run(svc.clock.as_ref()))?;
        self.latest_settlement.record(report.clone());
        Ok(report)
    }

    pub fn latest_settlement(&self) -> Option<SettlementReport> {
        self.latest_settlement.get()
    }

    pub fn order_activity(&self, id: OrderId) -> Option<OrderActivity> {
        self.activity.get(id)
    }
}

/// Threads started next to the server.
#[derive(Debug)]
pub struct Background {
    activity_worker: WorkerHandle,
    scheduler: SettlementSchedulerHandle,
}

impl Background {
    fn start<S: Store + 'static>(
        trading: &TradingServices<S>,
        scheduler: &SettlementScheduler,
        latest: &LatestSettlement,
        activity: &Arc<OrderActivityProjection>,
    ) -> io::Result<Self> {
        let sink = Arc::clone(activity);
        let activity_worker = EventWorker::spawn("order-activity", &trading.bus, move |event: OrderEvent| {
            sink.apply(&event)
        })?;

        let scheduler = scheduler.spawn(
            "settlement-scheduler",
            trading.settlement.clone(),
            Arc::clone(&trading.clock),
            latest.clone(),
        )?;

        Ok(Self {
            activity_worker,
            scheduler,
        })
    }

    /// Stop and join every background thread.
    pub fn shutdown(self) {
        self.activity_worker.shutdown();
        self.scheduler.shutdown();
    }
}

/// Select the store from `config`, build the services and start background work.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<(AppServices, Background)> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let latest_settlement = LatestSettlement::new();
    let activity = Arc::new(OrderActivityProjection::new());
    let scheduler = SettlementScheduler {
        schedule: DailySchedule::at(config.settlement_at),
        ..SettlementScheduler::default()
    };

    let (backend, background) = match &config.database_url {
        None => {
            info!("DATABASE_URL not set; using the in-memory store");
            let store = Arc::new(InMemoryStore::new());
            let trading = Arc::new(TradingServices::new(store, clock, config.sku_lock_timeout));
            let background = Background::start(&trading, &scheduler, &latest_settlement, &activity)?;
            (Backend::InMemory(trading), background)
        }
        Some(url) => {
            let store = PostgresStore::connect(url, PG_MAX_CONNECTIONS).await?;
            store.migrate().await?;
            info!("connected to postgres");
            let trading = Arc::new(TradingServices::new(Arc::new(store), clock, config.sku_lock_timeout));
            let background = Background::start(&trading, &scheduler, &latest_settlement, &activity)?;
            (Backend::Persistent(trading), background)
        }
    };

    info!(
        settlement_at = %config.settlement_at,
        sku_lock = config.sku_lock_timeout.is_some(),
        "services ready"
    );

    Ok((
        AppServices {
            backend,
            latest_settlement,
            activity,
        },
        background,
    ))
}
