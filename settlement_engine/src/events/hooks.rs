use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EarningsRebuiltEvent, EventHandler, EventProducer, Handler, OrderSettledEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_settled_producer: Vec<EventProducer<OrderSettledEvent>>,
    pub earnings_rebuilt_producer: Vec<EventProducer<EarningsRebuiltEvent>>,
}

impl EventProducers {
    pub async fn publish_order_settled(&self, event: OrderSettledEvent) {
        for emitter in &self.order_settled_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_earnings_rebuilt(&self, event: EarningsRebuiltEvent) {
        for emitter in &self.earnings_rebuilt_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_settled: Option<EventHandler<OrderSettledEvent>>,
    pub on_earnings_rebuilt: Option<EventHandler<EarningsRebuiltEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_settled = hooks.on_order_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_earnings_rebuilt = hooks.on_earnings_rebuilt.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_settled, on_earnings_rebuilt }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_settled {
            result.order_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_earnings_rebuilt {
            result.earnings_rebuilt_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_settled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_earnings_rebuilt {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_settled: Option<Handler<OrderSettledEvent>>,
    pub on_earnings_rebuilt: Option<Handler<EarningsRebuiltEvent>>,
}

impl EventHooks {
    pub fn on_order_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_settled = Some(Arc::new(f));
        self
    }

    pub fn on_earnings_rebuilt<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(EarningsRebuiltEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_earnings_rebuilt = Some(Arc::new(f));
        self
    }
}
