mod store;
pub(crate) use store::LifoStore;

mod worker;
pub(crate) use worker::Worker;
