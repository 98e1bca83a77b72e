use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::jmap::MethodError;
use crate::model::mail::{Email, EmailAddress, Mailbox, Thread};
use crate::model::standard::{SetArgs, SetError, SetResponse};
use crate::model::{FieldValue, Id, ObjectReader, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Mailbox,
    Thread,
    Email,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub state: String,
    pub objects: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub old_state: String,
    pub new_state: String,
    pub has_more_changes: bool,
    pub created: Vec<Id>,
    pub updated: Vec<Id>,
    pub destroyed: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("account {0} does not exist")]
    AccountNotFound(Id),
    #[error("expected state {expected}, current state is {actual}")]
    StateMismatch { expected: String, actual: String },
    #[error("cannot calculate changes since state {0}")]
    CannotCalculateChanges(String),
    #[error("mail store failure: {0}")]
    Backend(String),
}

impl From<StoreError> for MethodError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AccountNotFound(_) => Self::AccountNotFound,
            StoreError::StateMismatch { .. } => Self::StateMismatch {
                description: error.to_string(),
            },
            StoreError::CannotCalculateChanges(_) => Self::CannotCalculateChanges {
                description: error.to_string(),
            },
            StoreError::Backend(_) => Self::server_fail(error.to_string()),
        }
    }
}

#[async_trait]
pub trait MailStore: Send + Sync {
    async fn mailboxes(&self, account_id: &Id) -> Result<Snapshot<Mailbox>, StoreError>;
    async fn threads(&self, account_id: &Id) -> Result<Snapshot<Thread>, StoreError>;
    async fn emails(&self, account_id: &Id) -> Result<Snapshot<Email>, StoreError>;
    async fn changes(
        &self,
        account_id: &Id,
        kind: DataKind,
        since_state: &str,
        max_changes: Option<u64>,
    ) -> Result<ChangeSet, StoreError>;
    async fn set_mailboxes(&self, args: SetArgs) -> Result<SetResponse, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Created,
    Updated,
    Destroyed,
}

#[derive(Debug, Clone)]
struct ChangeEntry {
    state: u64,
    id: Id,
    change: Change,
}

/// Per-type modification history; every recorded change bumps the state.
#[derive(Debug, Default)]
struct ChangeLog {
    state: u64,
    entries: Vec<ChangeEntry>,
}

impl ChangeLog {
    fn current(&self) -> String {
        self.state.to_string()
    }

    fn record(&mut self, id: Id, change: Change) {
        self.state += 1;
        self.entries.push(ChangeEntry {
            state: self.state,
            id,
            change,
        });
    }

    fn since(&self, since_state: &str, max_changes: Option<u64>) -> Result<ChangeSet, StoreError> {
        let since = since_state
            .parse::<u64>()
            .ok()
            .filter(|since| *since <= self.state)
            .ok_or_else(|| StoreError::CannotCalculateChanges(since_state.to_string()))?;

        let pending = self
            .entries
            .iter()
            .filter(|entry| entry.state > since)
            .collect::<Vec<_>>();
        let taken = max_changes
            .map(|max| usize::try_from(max).unwrap_or(usize::MAX))
            .map_or(pending.len(), |max| max.min(pending.len()));
        let window = &pending[..taken];
        let has_more_changes = taken < pending.len();
        let new_state = match window.last() {
            Some(entry) if has_more_changes => entry.state,
            _ => self.state,
        };

        // Net effect per id: create+destroy cancels out, create+update stays a create.
        let mut net: Vec<(Id, Change)> = Vec::new();
        for entry in window {
            match net.iter().position(|(id, _)| *id == entry.id) {
                None => net.push((entry.id.clone(), entry.change)),
                Some(index) => match (net[index].1, entry.change) {
                    (Change::Created, Change::Destroyed) => {
                        net.remove(index);
                    }
                    (Change::Created, _) => {}
                    (_, change) => net[index].1 = change,
                },
            }
        }

        let select = |wanted: Change| {
            net.iter()
                .filter(|(_, change)| *change == wanted)
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>()
        };

        Ok(ChangeSet {
            old_state: since_state.to_string(),
            new_state: new_state.to_string(),
            has_more_changes,
            created: select(Change::Created),
            updated: select(Change::Updated),
            destroyed: select(Change::Destroyed),
        })
    }
}

#[derive(Debug, Default)]
struct MailboxPatch {
    name: Option<String>,
    parent_id: Option<Option<Id>>,
    role: Option<Option<String>>,
    sort_order: Option<u64>,
    is_subscribed: Option<bool>,
}

impl MailboxPatch {
    fn read(object: &Map<String, Value>, creating: bool) -> Result<Self, SetError> {
        let value = Value::Object(object.clone());
        Self::read_fields(&value, creating).map_err(|errors| {
            let mut properties = Vec::new();
            for error in errors.iter() {
                let property = property_name(&error.path);
                if !properties.contains(&property) {
                    properties.push(property);
                }
            }
            SetError::invalid_properties(properties, errors.to_string())
        })
    }

    fn read_fields(value: &Value, creating: bool) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, "")?;
        let name = if creating {
            fields.required::<String>("name")
        } else {
            fields.optional::<String>("name")
        };
        if name.as_deref().is_some_and(str::is_empty) {
            fields.invalid("name", "must not be empty");
        }
        let parent_id = fields.nullable::<Id>("parentId");
        let role = fields.nullable::<String>("role");
        let sort_order = fields.optional::<u64>("sortOrder");
        let is_subscribed = fields.optional::<bool>("isSubscribed");
        fields.finish()?;

        Ok(Self {
            name,
            parent_id,
            role,
            sort_order,
            is_subscribed,
        })
    }
}

fn property_name(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

const SERVER_SET_MAILBOX_PROPERTIES: &[&str] = &[
    "id",
    "totalEmails",
    "unreadEmails",
    "totalThreads",
    "unreadThreads",
    "myRights",
];

#[derive(Debug, Default)]
struct MailData {
    mailboxes: Vec<Mailbox>,
    threads: Vec<Thread>,
    emails: Vec<Email>,
    mailbox_log: ChangeLog,
    thread_log: ChangeLog,
    email_log: ChangeLog,
    next_mailbox: u64,
}

impl MailData {
    fn log(&self, kind: DataKind) -> &ChangeLog {
        match kind {
            DataKind::Mailbox => &self.mailbox_log,
            DataKind::Thread => &self.thread_log,
            DataKind::Email => &self.email_log,
        }
    }

    fn counted_mailboxes(&self) -> Vec<Mailbox> {
        self.mailboxes
            .iter()
            .cloned()
            .map(|mut mailbox| {
                let mut threads = BTreeSet::new();
                let mut unread_threads = BTreeSet::new();
                let mut total = 0;
                let mut unread = 0;
                for email in self
                    .emails
                    .iter()
                    .filter(|email| email.mailbox_ids.contains_key(&mailbox.id))
                {
                    total += 1;
                    threads.insert(&email.thread_id);
                    if !email.has_keyword("$seen") {
                        unread += 1;
                        unread_threads.insert(&email.thread_id);
                    }
                }
                mailbox.total_emails = total;
                mailbox.unread_emails = unread;
                mailbox.total_threads = threads.len() as u64;
                mailbox.unread_threads = unread_threads.len() as u64;
                mailbox
            })
            .collect()
    }

    fn mailbox_index(&self, id: &Id) -> Option<usize> {
        self.mailboxes.iter().position(|mailbox| &mailbox.id == id)
    }

    fn is_ancestor_or_self(&self, ancestor: &Id, candidate: &Id) -> bool {
        let mut current = Some(candidate.clone());
        let mut steps = 0;
        while let Some(id) = current {
            if &id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.mailboxes.len() {
                return false;
            }
            current = self
                .mailbox_index(&id)
                .and_then(|index| self.mailboxes[index].parent_id.clone());
        }
        false
    }

    fn apply_patch(
        &self,
        target: Option<&Id>,
        mailbox: &mut Mailbox,
        patch: MailboxPatch,
    ) -> Result<(), SetError> {
        if let Some(parent_id) = patch.parent_id {
            if let Some(parent) = &parent_id {
                if self.mailbox_index(parent).is_none() {
                    return Err(SetError::invalid_properties(
                        vec!["parentId".to_string()],
                        format!("mailbox {parent} does not exist"),
                    ));
                }
                if let Some(target) = target {
                    if self.is_ancestor_or_self(target, parent) {
                        return Err(SetError::invalid_properties(
                            vec!["parentId".to_string()],
                            "a mailbox cannot be moved below itself",
                        ));
                    }
                }
            }
            mailbox.parent_id = parent_id;
        }

        if let Some(role) = patch.role {
            if let Some(role) = &role {
                let taken = self.mailboxes.iter().any(|other| {
                    other.role.as_ref() == Some(role) && Some(&other.id) != target
                });
                if taken {
                    return Err(SetError::invalid_properties(
                        vec!["role".to_string()],
                        format!("another mailbox already has role {role}"),
                    ));
                }
            }
            mailbox.role = role;
        }

        if let Some(name) = patch.name {
            mailbox.name = name;
        }
        if let Some(sort_order) = patch.sort_order {
            mailbox.sort_order = sort_order;
        }
        if let Some(is_subscribed) = patch.is_subscribed {
            mailbox.is_subscribed = is_subscribed;
        }
        Ok(())
    }

    fn create_mailbox(&mut self, object: &Map<String, Value>) -> Result<Mailbox, SetError> {
        let patch = MailboxPatch::read(object, true)?;
        let id = Id::new_unchecked(format!("m{}", self.next_mailbox));
        let mut mailbox = Mailbox::new(id.clone(), String::new());
        self.apply_patch(None, &mut mailbox, patch)?;

        self.next_mailbox += 1;
        self.mailboxes.push(mailbox.clone());
        self.mailbox_log.record(id, Change::Created);
        Ok(mailbox)
    }

    fn update_mailbox(&mut self, id: &Id, object: &Map<String, Value>) -> Result<(), SetError> {
        let index = self.mailbox_index(id).ok_or_else(SetError::not_found)?;
        let patch = MailboxPatch::read(object, false)?;
        let mut mailbox = self.mailboxes[index].clone();
        self.apply_patch(Some(id), &mut mailbox, patch)?;

        self.mailboxes[index] = mailbox;
        self.mailbox_log.record(id.clone(), Change::Updated);
        Ok(())
    }

    fn destroy_mailbox(&mut self, id: &Id) -> Result<(), SetError> {
        let index = self.mailbox_index(id).ok_or_else(SetError::not_found)?;
        if self
            .mailboxes
            .iter()
            .any(|mailbox| mailbox.parent_id.as_ref() == Some(id))
        {
            return Err(SetError::new("mailboxHasChild")
                .with_description(format!("mailbox {id} still has child mailboxes")));
        }
        if self
            .emails
            .iter()
            .any(|email| email.mailbox_ids.contains_key(id))
        {
            return Err(SetError::new("mailboxHasEmail")
                .with_description(format!("mailbox {id} still contains emails")));
        }

        self.mailboxes.remove(index);
        self.mailbox_log.record(id.clone(), Change::Destroyed);
        Ok(())
    }
}

fn server_set_properties(mailbox: &Mailbox) -> Map<String, Value> {
    let Value::Object(written) = mailbox.write() else {
        return Map::new();
    };
    written
        .into_iter()
        .filter(|(key, _)| SERVER_SET_MAILBOX_PROPERTIES.contains(&key.as_str()))
        .collect()
}

fn non_empty<K, V>(map: BTreeMap<K, V>) -> Option<BTreeMap<K, V>> {
    (!map.is_empty()).then_some(map)
}

#[derive(Debug)]
pub struct InMemoryMailStore {
    account_id: Id,
    data: RwLock<MailData>,
}

impl InMemoryMailStore {
    pub fn new(account_id: Id) -> Self {
        Self {
            account_id,
            data: RwLock::new(MailData {
                next_mailbox: 1,
                ..MailData::default()
            }),
        }
    }

    pub fn with_sample_data(account_id: Id) -> Self {
        let mailboxes = sample_mailboxes();
        let emails = sample_emails();

        let mut threads: Vec<Thread> = Vec::new();
        for email in &emails {
            match threads.iter_mut().find(|thread| thread.id == email.thread_id) {
                Some(thread) => thread.email_ids.push(email.id.clone()),
                None => threads.push(Thread {
                    id: email.thread_id.clone(),
                    email_ids: vec![email.id.clone()],
                }),
            }
        }

        Self {
            account_id,
            data: RwLock::new(MailData {
                next_mailbox: mailboxes.len() as u64 + 1,
                mailboxes,
                threads,
                emails,
                ..MailData::default()
            }),
        }
    }

    pub fn account_id(&self) -> &Id {
        &self.account_id
    }

    fn check_account(&self, account_id: &Id) -> Result<(), StoreError> {
        if account_id != &self.account_id {
            return Err(StoreError::AccountNotFound(account_id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl MailStore for InMemoryMailStore {
    async fn mailboxes(&self, account_id: &Id) -> Result<Snapshot<Mailbox>, StoreError> {
        self.check_account(account_id)?;
        let data = self.data.read().await;
        Ok(Snapshot {
            state: data.mailbox_log.current(),
            objects: data.counted_mailboxes(),
        })
    }

    async fn threads(&self, account_id: &Id) -> Result<Snapshot<Thread>, StoreError> {
        self.check_account(account_id)?;
        let data = self.data.read().await;
        Ok(Snapshot {
            state: data.thread_log.current(),
            objects: data.threads.clone(),
        })
    }

    async fn emails(&self, account_id: &Id) -> Result<Snapshot<Email>, StoreError> {
        self.check_account(account_id)?;
        let data = self.data.read().await;
        Ok(Snapshot {
            state: data.email_log.current(),
            objects: data.emails.clone(),
        })
    }

    async fn changes(
        &self,
        account_id: &Id,
        kind: DataKind,
        since_state: &str,
        max_changes: Option<u64>,
    ) -> Result<ChangeSet, StoreError> {
        self.check_account(account_id)?;
        let data = self.data.read().await;
        data.log(kind).since(since_state, max_changes)
    }

    async fn set_mailboxes(&self, args: SetArgs) -> Result<SetResponse, StoreError> {
        self.check_account(&args.account_id)?;
        let mut data = self.data.write().await;

        let old_state = data.mailbox_log.current();
        if let Some(expected) = &args.if_in_state {
            if *expected != old_state {
                return Err(StoreError::StateMismatch {
                    expected: expected.clone(),
                    actual: old_state,
                });
            }
        }

        let mut response = SetResponse::new(args.account_id.clone(), old_state.clone(), old_state);

        let mut created = BTreeMap::new();
        let mut not_created = BTreeMap::new();
        for (creation_id, object) in args.create.unwrap_or_default() {
            match data.create_mailbox(&object) {
                Ok(mailbox) => {
                    debug!(creation_id = %creation_id, id = %mailbox.id, "mailbox created");
                    created.insert(creation_id, server_set_properties(&mailbox));
                }
                Err(error) => {
                    not_created.insert(creation_id, error);
                }
            }
        }

        let mut updated = BTreeMap::new();
        let mut not_updated = BTreeMap::new();
        for (id, patch) in args.update.unwrap_or_default() {
            match data.update_mailbox(&id, &patch) {
                Ok(()) => {
                    updated.insert(id, None);
                }
                Err(error) => {
                    not_updated.insert(id, error);
                }
            }
        }

        let mut destroyed = Vec::new();
        let mut not_destroyed = BTreeMap::new();
        for id in args.destroy.unwrap_or_default() {
            match data.destroy_mailbox(&id) {
                Ok(()) => destroyed.push(id),
                Err(error) => {
                    not_destroyed.insert(id, error);
                }
            }
        }

        response.new_state = data.mailbox_log.current();
        response.created = non_empty(created);
        response.updated = non_empty(updated);
        response.destroyed = (!destroyed.is_empty()).then_some(destroyed);
        response.not_created = non_empty(not_created);
        response.not_updated = non_empty(not_updated);
        response.not_destroyed = non_empty(not_destroyed);
        Ok(response)
    }
}

fn sample_id(value: &str) -> Id {
    Id::new_unchecked(value.to_string())
}

fn sample_mailboxes() -> Vec<Mailbox> {
    let folder = |id: &str, name: &str, role: Option<&str>, parent: Option<&str>, sort_order| {
        let mut mailbox = Mailbox::new(sample_id(id), name);
        mailbox.role = role.map(str::to_string);
        mailbox.parent_id = parent.map(sample_id);
        mailbox.sort_order = sort_order;
        mailbox
    };

    vec![
        folder("m1", "Inbox", Some("inbox"), None, 1),
        folder("m2", "Sent", Some("sent"), None, 2),
        folder("m3", "Archive", Some("archive"), None, 3),
        folder("m4", "Projects", None, Some("m3"), 0),
    ]
}

struct SampleEmail {
    id: &'static str,
    thread: &'static str,
    mailbox: &'static str,
    keywords: &'static [&'static str],
    size: u64,
    hours: i64,
    from: (&'static str, &'static str),
    subject: &'static str,
    preview: &'static str,
    has_attachment: bool,
}

fn sample_emails() -> Vec<Email> {
    let received_base = DateTime::<Utc>::default() + Duration::days(20_500);
    let samples = [
        SampleEmail {
            id: "e1",
            thread: "t1",
            mailbox: "m1",
            keywords: &[],
            size: 2048,
            hours: 0,
            from: ("Alice Example", "alice@example.com"),
            subject: "Quarterly report",
            preview: "Numbers for the quarter are attached below",
            has_attachment: false,
        },
        SampleEmail {
            id: "e2",
            thread: "t1",
            mailbox: "m1",
            keywords: &["$seen"],
            size: 4096,
            hours: 1,
            from: ("Bob Example", "bob@example.com"),
            subject: "Re: Quarterly report",
            preview: "Thanks, looks good to me",
            has_attachment: false,
        },
        SampleEmail {
            id: "e3",
            thread: "t2",
            mailbox: "m2",
            keywords: &["$seen"],
            size: 1024,
            hours: 24,
            from: ("", "user@localhost"),
            subject: "Lunch on Friday?",
            preview: "Are you free around noon",
            has_attachment: false,
        },
        SampleEmail {
            id: "e4",
            thread: "t3",
            mailbox: "m4",
            keywords: &["$seen", "$flagged"],
            size: 8192,
            hours: 48,
            from: ("Carol Example", "carol@example.com"),
            subject: "Project kickoff notes",
            preview: "Slides and notes from the kickoff meeting",
            has_attachment: true,
        },
    ];

    samples
        .into_iter()
        .map(|sample| {
            let received_at = received_base + Duration::hours(sample.hours);
            let (name, email) = sample.from;
            Email {
                id: sample_id(sample.id),
                blob_id: Id::new_unchecked(format!("b{}", sample.id)),
                thread_id: sample_id(sample.thread),
                mailbox_ids: BTreeMap::from([(sample_id(sample.mailbox), true)]),
                keywords: sample
                    .keywords
                    .iter()
                    .map(|keyword| (keyword.to_string(), true))
                    .collect(),
                size: sample.size,
                received_at,
                message_id: Some(vec![format!("{}@example.com", sample.id)]),
                from: Some(vec![EmailAddress {
                    name: (!name.is_empty()).then(|| name.to_string()),
                    email: email.to_string(),
                }]),
                to: Some(vec![EmailAddress {
                    name: None,
                    email: "user@localhost".to_string(),
                }]),
                subject: Some(sample.subject.to_string()),
                sent_at: Some(received_at - Duration::minutes(2)),
                has_attachment: sample.has_attachment,
                preview: sample.preview.to_string(),
            }
        })
        .collect()
}
