//! Mail capability methods backed by a [`MailStore`].

use std::cmp::Ordering;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::standard::{filter_and_sort, get_objects, window, Sortable};
use crate::jmap::{Method, MethodError};
use crate::model::mail::{
    Email, EmailFilterCondition, EmailQueryArgs, Mailbox, MailboxFilterCondition, MailboxQueryArgs,
    Thread, MAIL_CAPABILITY,
};
use crate::model::standard::{
    ChangesArgs, ChangesResponse, GetArgs, GetResponse, QueryResponse, SetArgs, SetResponse,
};
use crate::model::{DataObject, Id};
use crate::store::{DataKind, MailStore, Snapshot, StoreError};

#[async_trait]
pub trait StoredObject: DataObject + Clone + Send + Sync + 'static {
    const KIND: DataKind;
    const GET_METHOD: &'static str;
    const CHANGES_METHOD: &'static str;

    async fn load(store: &dyn MailStore, account_id: &Id) -> Result<Snapshot<Self>, StoreError>;
}

#[async_trait]
impl StoredObject for Mailbox {
    const KIND: DataKind = DataKind::Mailbox;
    const GET_METHOD: &'static str = "Mailbox/get";
    const CHANGES_METHOD: &'static str = "Mailbox/changes";

    async fn load(store: &dyn MailStore, account_id: &Id) -> Result<Snapshot<Self>, StoreError> {
        store.mailboxes(account_id).await
    }
}

#[async_trait]
impl StoredObject for Thread {
    const KIND: DataKind = DataKind::Thread;
    const GET_METHOD: &'static str = "Thread/get";
    const CHANGES_METHOD: &'static str = "Thread/changes";

    async fn load(store: &dyn MailStore, account_id: &Id) -> Result<Snapshot<Self>, StoreError> {
        store.threads(account_id).await
    }
}

#[async_trait]
impl StoredObject for Email {
    const KIND: DataKind = DataKind::Email;
    const GET_METHOD: &'static str = "Email/get";
    const CHANGES_METHOD: &'static str = "Email/changes";

    async fn load(store: &dyn MailStore, account_id: &Id) -> Result<Snapshot<Self>, StoreError> {
        store.emails(account_id).await
    }
}

impl Sortable for Mailbox {
    const SORT_PROPERTIES: &'static [&'static str] = &["name", "sortOrder"];

    fn compare_by(&self, other: &Self, property: &str) -> Ordering {
        match property {
            "name" => self.name.to_lowercase().cmp(&other.name.to_lowercase()),
            "sortOrder" => self.sort_order.cmp(&other.sort_order),
            _ => Ordering::Equal,
        }
    }
}

impl Sortable for Email {
    const SORT_PROPERTIES: &'static [&'static str] = &["receivedAt", "sentAt", "size", "subject"];

    fn compare_by(&self, other: &Self, property: &str) -> Ordering {
        match property {
            "receivedAt" => self.received_at.cmp(&other.received_at),
            "sentAt" => self.sent_at.cmp(&other.sent_at),
            "size" => self.size.cmp(&other.size),
            "subject" => {
                let subject = |email: &Email| email.subject.as_deref().unwrap_or_default().to_lowercase();
                subject(self).cmp(&subject(other))
            }
            _ => Ordering::Equal,
        }
    }
}

pub struct Get<T> {
    store: Arc<dyn MailStore>,
    object: PhantomData<fn() -> T>,
}

impl<T> Get<T> {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self {
            store,
            object: PhantomData,
        }
    }
}

#[async_trait]
impl<T: StoredObject> Method for Get<T> {
    type Arguments = GetArgs<T>;
    type Response = GetResponse<T>;

    const NAME: &'static str = T::GET_METHOD;
    const CAPABILITY: &'static str = MAIL_CAPABILITY;

    async fn call(&self, arguments: GetArgs<T>) -> Result<GetResponse<T>, MethodError> {
        let snapshot = T::load(self.store.as_ref(), &arguments.account_id).await?;
        get_objects(snapshot, arguments)
    }
}

pub struct Changes<T> {
    store: Arc<dyn MailStore>,
    object: PhantomData<fn() -> T>,
}

impl<T> Changes<T> {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self {
            store,
            object: PhantomData,
        }
    }
}

#[async_trait]
impl<T: StoredObject> Method for Changes<T> {
    type Arguments = ChangesArgs;
    type Response = ChangesResponse;

    const NAME: &'static str = T::CHANGES_METHOD;
    const CAPABILITY: &'static str = MAIL_CAPABILITY;

    async fn call(&self, arguments: ChangesArgs) -> Result<ChangesResponse, MethodError> {
        let ChangesArgs {
            account_id,
            since_state,
            max_changes,
        } = arguments;
        let changes = self
            .store
            .changes(&account_id, T::KIND, &since_state, max_changes)
            .await?;

        Ok(ChangesResponse {
            account_id,
            old_state: changes.old_state,
            new_state: changes.new_state,
            has_more_changes: changes.has_more_changes,
            created: changes.created,
            updated: changes.updated,
            destroyed: changes.destroyed,
        })
    }
}

pub struct MailboxQuery {
    store: Arc<dyn MailStore>,
}

impl MailboxQuery {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Method for MailboxQuery {
    type Arguments = MailboxQueryArgs;
    type Response = QueryResponse;

    const NAME: &'static str = "Mailbox/query";
    const CAPABILITY: &'static str = MAIL_CAPABILITY;

    async fn call(&self, arguments: MailboxQueryArgs) -> Result<QueryResponse, MethodError> {
        let snapshot = self.store.mailboxes(&arguments.account_id).await?;
        let sorted = filter_and_sort(
            snapshot.objects,
            arguments.filter.as_ref(),
            arguments.sort.as_deref(),
            |condition: &MailboxFilterCondition, mailbox: &Mailbox| condition.matches(mailbox),
        )?;

        let ids = sorted.into_iter().map(|mailbox| mailbox.id).collect();
        window(ids, &arguments, snapshot.state)
    }
}

pub struct MailboxSet {
    store: Arc<dyn MailStore>,
}

impl MailboxSet {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Method for MailboxSet {
    type Arguments = SetArgs;
    type Response = SetResponse;

    const NAME: &'static str = "Mailbox/set";
    const CAPABILITY: &'static str = MAIL_CAPABILITY;

    async fn call(&self, arguments: SetArgs) -> Result<SetResponse, MethodError> {
        Ok(self.store.set_mailboxes(arguments).await?)
    }
}

pub struct EmailQuery {
    store: Arc<dyn MailStore>,
}

impl EmailQuery {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Method for EmailQuery {
    type Arguments = EmailQueryArgs;
    type Response = QueryResponse;

    const NAME: &'static str = "Email/query";
    const CAPABILITY: &'static str = MAIL_CAPABILITY;

    async fn call(&self, arguments: EmailQueryArgs) -> Result<QueryResponse, MethodError> {
        let EmailQueryArgs {
            query,
            collapse_threads,
        } = arguments;
        let snapshot = self.store.emails(&query.account_id).await?;
        let sorted = filter_and_sort(
            snapshot.objects,
            query.filter.as_ref(),
            query.sort.as_deref(),
            |condition: &EmailFilterCondition, email: &Email| condition.matches(email),
        )?;

        // Collapsing keeps the first email of each thread in sort order.
        let collapse = collapse_threads.unwrap_or(false);
        let mut threads = HashSet::new();
        let ids = sorted
            .into_iter()
            .filter(|email| !collapse || threads.insert(email.thread_id.clone()))
            .map(|email| email.id)
            .collect();

        window(ids, &query, snapshot.state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{Changes, EmailQuery, Get, MailboxQuery, MailboxSet};
    use crate::jmap::{Method, MethodError};
    use crate::model::mail::{Email, EmailQueryArgs, Mailbox, MailboxQueryArgs, Thread};
    use crate::model::standard::{ChangesArgs, GetArgs, SetArgs};
    use crate::model::{Id, Record};
    use crate::store::{InMemoryMailStore, MailStore};

    fn id(value: &str) -> Id {
        Id::new(value).expect("id")
    }

    fn store() -> Arc<dyn MailStore> {
        Arc::new(InMemoryMailStore::with_sample_data(id("primary")))
    }

    #[test]
    fn generic_methods_take_their_names_from_the_type() {
        assert_eq!(<Get<Mailbox> as Method>::NAME, "Mailbox/get");
        assert_eq!(<Get<Thread> as Method>::NAME, "Thread/get");
        assert_eq!(<Changes<Email> as Method>::NAME, "Email/changes");
    }

    #[tokio::test]
    async fn email_get_selects_properties() {
        let arguments = GetArgs::<Email>::new(id("primary"))
            .with_ids(vec![id("e3")])
            .with_properties(vec!["subject".to_string(), "header:X-Priority:asText".to_string()]);
        let response = Get::<Email>::new(store()).call(arguments).await.expect("get");

        assert_eq!(
            response.to_value()["list"],
            json!([{"id": "e3", "subject": "Lunch on Friday?", "header:X-Priority:asText": null}])
        );
    }

    #[tokio::test]
    async fn unknown_account_surfaces_as_method_error() {
        let error = Get::<Thread>::new(store())
            .call(GetArgs::new(id("nobody")))
            .await
            .expect_err("no such account");
        assert_eq!(error, MethodError::AccountNotFound);
    }

    #[tokio::test]
    async fn mailbox_query_filters_by_role() {
        let arguments = MailboxQueryArgs::from_value(&json!({
            "accountId": "primary",
            "filter": {"hasAnyRole": false}
        }))
        .expect("args");
        let response = MailboxQuery::new(store()).call(arguments).await.expect("query");
        assert_eq!(response.ids, vec![id("m4")]);
    }

    #[tokio::test]
    async fn email_query_sorts_and_collapses_threads() {
        let arguments = EmailQueryArgs::from_value(&json!({
            "accountId": "primary",
            "sort": [{"property": "receivedAt", "isAscending": false}],
            "collapseThreads": true,
            "calculateTotal": true
        }))
        .expect("args");
        let response = EmailQuery::new(store()).call(arguments).await.expect("query");

        assert_eq!(response.ids, vec![id("e4"), id("e3"), id("e2")]);
        assert_eq!(response.total, Some(3));
    }

    #[tokio::test]
    async fn email_query_filters_by_keyword_and_mailbox() {
        let arguments = EmailQueryArgs::from_value(&json!({
            "accountId": "primary",
            "filter": {"operator": "AND", "conditions": [
                {"inMailbox": "m1"},
                {"notKeyword": "$seen"}
            ]}
        }))
        .expect("args");
        let response = EmailQuery::new(store()).call(arguments).await.expect("query");
        assert_eq!(response.ids, vec![id("e1")]);
    }

    #[tokio::test]
    async fn set_then_changes_report_the_new_mailbox() {
        let store = store();
        let created = MailboxSet::new(Arc::clone(&store))
            .call(
                SetArgs::from_value(&json!({
                    "accountId": "primary",
                    "create": {"new": {"name": "Travel"}}
                }))
                .expect("args"),
            )
            .await
            .expect("set");
        assert_eq!(created.new_state, "1");

        let changes = Changes::<Mailbox>::new(store)
            .call(ChangesArgs {
                account_id: id("primary"),
                since_state: "0".to_string(),
                max_changes: None,
            })
            .await
            .expect("changes");
        assert_eq!(changes.created, vec![id("m5")]);
        assert_eq!(changes.new_state, "1");
    }
}
