pub mod core;
pub mod mail;
pub mod standard;

use std::sync::Arc;

use crate::jmap::MethodRegistry;
use crate::model::mail::{Email, Mailbox, Thread};
use crate::store::MailStore;

use self::core::Echo;
use self::mail::{Changes, EmailQuery, Get, MailboxQuery, MailboxSet};

pub fn build_registry(store: Arc<dyn MailStore>) -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    registry
        .register(Echo)
        .register(Get::<Mailbox>::new(Arc::clone(&store)))
        .register(Changes::<Mailbox>::new(Arc::clone(&store)))
        .register(MailboxQuery::new(Arc::clone(&store)))
        .register(MailboxSet::new(Arc::clone(&store)))
        .register(Get::<Thread>::new(Arc::clone(&store)))
        .register(Changes::<Thread>::new(Arc::clone(&store)))
        .register(Get::<Email>::new(Arc::clone(&store)))
        .register(Changes::<Email>::new(Arc::clone(&store)))
        .register(EmailQuery::new(store));
    registry
}
