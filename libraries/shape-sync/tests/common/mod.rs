#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use geo_utils::{Record, codec::feature_to_string};
use geojson::Feature;
use shape_sync::{
    AppContext, GeoStore, MemorySurface, Notification, Session, StoreError, SyncController,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListAll,
    Create,
    Update(String),
    Delete(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListAll,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Status(u16),
    Network,
    /// Never resolves, so the call can be cancelled.
    Hang,
}

/// An in-memory store that records every call and can be told to fail.
#[derive(Default)]
pub struct FakeStore {
    pub records: RefCell<BTreeMap<String, String>>,
    pub calls: RefCell<Vec<Call>>,
    failures: RefCell<HashMap<Op, Failure>>,
    next_id: Cell<u32>,
}

impl FakeStore {
    pub fn with_records(records: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (id, data) in records {
            store
                .records
                .borrow_mut()
                .insert(id.to_string(), data.to_string());
        }
        store
    }

    pub fn fail(&self, op: Op, failure: Failure) {
        self.failures.borrow_mut().insert(op, failure);
    }

    pub fn recover(&self, op: Op) {
        self.failures.borrow_mut().remove(&op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    async fn check(&self, op: Op) -> Result<(), StoreError> {
        let failure = self.failures.borrow().get(&op).copied();
        match failure {
            None => Ok(()),
            Some(Failure::Status(status)) => Err(StoreError::Server {
                status,
                body: String::new(),
            }),
            Some(Failure::Network) => Err(StoreError::Network("connection refused".into())),
            Some(Failure::Hang) => futures::future::pending().await,
        }
    }
}

impl GeoStore for FakeStore {
    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        self.calls.borrow_mut().push(Call::ListAll);
        self.check(Op::ListAll).await?;
        Ok(self
            .records
            .borrow()
            .iter()
            .map(|(id, data)| Record {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn create(&self, feature: &Feature) -> Result<Record, StoreError> {
        self.calls.borrow_mut().push(Call::Create);
        self.check(Op::Create).await?;
        let id = format!("r{}", self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.records
            .borrow_mut()
            .insert(id.clone(), feature_to_string(feature));
        Ok(Record::new(id, feature))
    }

    async fn update(&self, id: &str, feature: &Feature) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(Call::Update(id.to_string()));
        self.check(Op::Update).await?;
        self.records
            .borrow_mut()
            .insert(id.to_string(), feature_to_string(feature));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(Call::Delete(id.to_string()));
        self.check(Op::Delete).await?;
        self.records.borrow_mut().remove(id);
        Ok(())
    }
}

pub type Notifications = Rc<RefCell<Vec<Notification>>>;

pub type TestController = SyncController<FakeStore, MemorySurface, Box<dyn Fn(Notification)>>;

pub fn controller(store: FakeStore) -> (TestController, Notifications) {
    let notifications = Notifications::default();
    let sink = notifications.clone();
    let controller = SyncController::with_notifier(
        AppContext::new(Session::default(), "http://localhost:8080"),
        store,
        MemorySurface::new(),
        Box::new(move |n: Notification| sink.borrow_mut().push(n)) as Box<dyn Fn(Notification)>,
    );
    (controller, notifications)
}

pub const POINT_A: &str =
    r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[10,20]},"properties":{}}"#;
