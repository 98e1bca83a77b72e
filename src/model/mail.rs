//! Mail data types: mailboxes, threads and email metadata
//!
//! Property names follow the JMAP Mail object definitions; query filter
//! conditions are strict so typos surface as `invalidArguments`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::model::fields::present;
use crate::model::standard::{GetArgs, GetResponse, QueryArgs};
use crate::model::{
    DataObject, FieldValue, Id, ObjectReader, ObjectWriter, Record, ValidationErrors,
};

pub const MAIL_CAPABILITY: &str = "urn:ietf:params:jmap:mail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxRights {
    pub may_read_items: bool,
    pub may_add_items: bool,
    pub may_remove_items: bool,
    pub may_set_seen: bool,
    pub may_set_keywords: bool,
    pub may_create_child: bool,
    pub may_rename: bool,
    pub may_delete: bool,
    pub may_submit: bool,
}

impl MailboxRights {
    pub fn full() -> Self {
        Self {
            may_read_items: true,
            may_add_items: true,
            may_remove_items: true,
            may_set_seen: true,
            may_set_keywords: true,
            may_create_child: true,
            may_rename: true,
            may_delete: true,
            may_submit: true,
        }
    }
}

impl FieldValue for MailboxRights {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let may_read_items = fields.required("mayReadItems");
        let may_add_items = fields.required("mayAddItems");
        let may_remove_items = fields.required("mayRemoveItems");
        let may_set_seen = fields.required("maySetSeen");
        let may_set_keywords = fields.required("maySetKeywords");
        let may_create_child = fields.required("mayCreateChild");
        let may_rename = fields.required("mayRename");
        let may_delete = fields.required("mayDelete");
        let may_submit = fields.required("maySubmit");
        fields.finish()?;

        Ok(Self {
            may_read_items: present(may_read_items, path)?,
            may_add_items: present(may_add_items, path)?,
            may_remove_items: present(may_remove_items, path)?,
            may_set_seen: present(may_set_seen, path)?,
            may_set_keywords: present(may_set_keywords, path)?,
            may_create_child: present(may_create_child, path)?,
            may_rename: present(may_rename, path)?,
            may_delete: present(may_delete, path)?,
            may_submit: present(may_submit, path)?,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("mayReadItems", &self.may_read_items)
            .field("mayAddItems", &self.may_add_items)
            .field("mayRemoveItems", &self.may_remove_items)
            .field("maySetSeen", &self.may_set_seen)
            .field("maySetKeywords", &self.may_set_keywords)
            .field("mayCreateChild", &self.may_create_child)
            .field("mayRename", &self.may_rename)
            .field("mayDelete", &self.may_delete)
            .field("maySubmit", &self.may_submit)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub id: Id,
    pub name: String,
    pub parent_id: Option<Id>,
    pub role: Option<String>,
    pub sort_order: u64,
    pub total_emails: u64,
    pub unread_emails: u64,
    pub total_threads: u64,
    pub unread_threads: u64,
    pub my_rights: MailboxRights,
    pub is_subscribed: bool,
}

impl Mailbox {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            role: None,
            sort_order: 0,
            total_emails: 0,
            unread_emails: 0,
            total_threads: 0,
            unread_threads: 0,
            my_rights: MailboxRights::full(),
            is_subscribed: true,
        }
    }
}

impl FieldValue for Mailbox {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let id = fields.required("id");
        let name = fields.required::<String>("name");
        let parent_id = fields.optional("parentId");
        let role = fields.optional("role");
        let sort_order = fields.required("sortOrder");
        let total_emails = fields.required("totalEmails");
        let unread_emails = fields.required("unreadEmails");
        let total_threads = fields.required("totalThreads");
        let unread_threads = fields.required("unreadThreads");
        let my_rights = fields.required("myRights");
        let is_subscribed = fields.required("isSubscribed");
        if name.as_deref().is_some_and(str::is_empty) {
            fields.invalid("name", "must not be empty");
        }
        fields.finish()?;

        Ok(Self {
            id: present(id, path)?,
            name: present(name, path)?,
            parent_id,
            role,
            sort_order: present(sort_order, path)?,
            total_emails: present(total_emails, path)?,
            unread_emails: present(unread_emails, path)?,
            total_threads: present(total_threads, path)?,
            unread_threads: present(unread_threads, path)?,
            my_rights: present(my_rights, path)?,
            is_subscribed: present(is_subscribed, path)?,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("id", &self.id)
            .field("name", &self.name)
            .or_null("parentId", &self.parent_id)
            .or_null("role", &self.role)
            .field("sortOrder", &self.sort_order)
            .field("totalEmails", &self.total_emails)
            .field("unreadEmails", &self.unread_emails)
            .field("totalThreads", &self.total_threads)
            .field("unreadThreads", &self.unread_threads)
            .field("myRights", &self.my_rights)
            .field("isSubscribed", &self.is_subscribed)
            .build()
    }
}

impl DataObject for Mailbox {
    const TYPE_NAME: &'static str = "Mailbox";
    const PROPERTIES: &'static [&'static str] = &[
        "id",
        "name",
        "parentId",
        "role",
        "sortOrder",
        "totalEmails",
        "unreadEmails",
        "totalThreads",
        "unreadThreads",
        "myRights",
        "isSubscribed",
    ];

    fn id(&self) -> &Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: Id,
    pub email_ids: Vec<Id>,
}

impl FieldValue for Thread {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let id = fields.required("id");
        let email_ids = fields.required::<Vec<Id>>("emailIds");
        if email_ids.as_ref().is_some_and(Vec::is_empty) {
            fields.invalid("emailIds", "a thread contains at least one email");
        }
        fields.finish()?;

        Ok(Self {
            id: present(id, path)?,
            email_ids: present(email_ids, path)?,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("id", &self.id)
            .field("emailIds", &self.email_ids)
            .build()
    }
}

impl DataObject for Thread {
    const TYPE_NAME: &'static str = "Thread";
    const PROPERTIES: &'static [&'static str] = &["id", "emailIds"];

    fn id(&self) -> &Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub email: String,
}

impl FieldValue for EmailAddress {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let name = fields.optional("name");
        let email = fields.required("email");
        fields.finish()?;

        Ok(Self {
            name,
            email: present(email, path)?,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .or_null("name", &self.name)
            .field("email", &self.email)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub id: Id,
    pub blob_id: Id,
    pub thread_id: Id,
    pub mailbox_ids: BTreeMap<Id, bool>,
    pub keywords: BTreeMap<String, bool>,
    pub size: u64,
    pub received_at: DateTime<Utc>,
    pub message_id: Option<Vec<String>>,
    pub from: Option<Vec<EmailAddress>>,
    pub to: Option<Vec<EmailAddress>>,
    pub subject: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub has_attachment: bool,
    pub preview: String,
}

impl Email {
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords
            .keys()
            .any(|candidate| candidate.eq_ignore_ascii_case(keyword))
    }
}

impl FieldValue for Email {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let id = fields.required("id");
        let blob_id = fields.required("blobId");
        let thread_id = fields.required("threadId");
        let mailbox_ids = fields.required::<BTreeMap<Id, bool>>("mailboxIds");
        let keywords = fields.required::<BTreeMap<String, bool>>("keywords");
        let size = fields.required("size");
        let received_at = fields.required("receivedAt");
        let message_id = fields.optional("messageId");
        let from = fields.optional("from");
        let to = fields.optional("to");
        let subject = fields.optional("subject");
        let sent_at = fields.optional("sentAt");
        let has_attachment = fields.required("hasAttachment");
        let preview = fields.required("preview");

        if let Some(mailbox_ids) = &mailbox_ids {
            if mailbox_ids.is_empty() {
                fields.invalid("mailboxIds", "an email belongs to at least one mailbox");
            }
            if mailbox_ids.values().any(|member| !member) {
                fields.invalid("mailboxIds", "values must be true");
            }
        }
        if keywords.as_ref().is_some_and(|keywords| keywords.values().any(|set| !set)) {
            fields.invalid("keywords", "values must be true");
        }
        fields.finish()?;

        Ok(Self {
            id: present(id, path)?,
            blob_id: present(blob_id, path)?,
            thread_id: present(thread_id, path)?,
            mailbox_ids: present(mailbox_ids, path)?,
            keywords: present(keywords, path)?,
            size: present(size, path)?,
            received_at: present(received_at, path)?,
            message_id,
            from,
            to,
            subject,
            sent_at,
            has_attachment: present(has_attachment, path)?,
            preview: present(preview, path)?,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("id", &self.id)
            .field("blobId", &self.blob_id)
            .field("threadId", &self.thread_id)
            .field("mailboxIds", &self.mailbox_ids)
            .field("keywords", &self.keywords)
            .field("size", &self.size)
            .field("receivedAt", &self.received_at)
            .or_null("messageId", &self.message_id)
            .or_null("from", &self.from)
            .or_null("to", &self.to)
            .or_null("subject", &self.subject)
            .or_null("sentAt", &self.sent_at)
            .field("hasAttachment", &self.has_attachment)
            .field("preview", &self.preview)
            .build()
    }
}

impl DataObject for Email {
    const TYPE_NAME: &'static str = "Email";
    const PROPERTIES: &'static [&'static str] = &[
        "id",
        "blobId",
        "threadId",
        "mailboxIds",
        "keywords",
        "size",
        "receivedAt",
        "messageId",
        "from",
        "to",
        "subject",
        "sentAt",
        "hasAttachment",
        "preview",
    ];

    fn id(&self) -> &Id {
        &self.id
    }

    fn accepts_property(property: &str) -> bool {
        Self::PROPERTIES.contains(&property) || HeaderQuery::parse(property).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderForm {
    Raw,
    Text,
    Addresses,
    GroupedAddresses,
    MessageIds,
    Date,
    Urls,
}

impl HeaderForm {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Raw" => Some(Self::Raw),
            "Text" => Some(Self::Text),
            "Addresses" => Some(Self::Addresses),
            "GroupedAddresses" => Some(Self::GroupedAddresses),
            "MessageIds" => Some(Self::MessageIds),
            "Date" => Some(Self::Date),
            "URLs" => Some(Self::Urls),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "Raw",
            Self::Text => "Text",
            Self::Addresses => "Addresses",
            Self::GroupedAddresses => "GroupedAddresses",
            Self::MessageIds => "MessageIds",
            Self::Date => "Date",
            Self::Urls => "URLs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderQuery {
    pub name: String,
    pub form: HeaderForm,
    pub all: bool,
}

fn header_query_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^header:([\x21-\x39\x3b-\x7e]+)(?::as([A-Za-z]+))?(:all)?$")
            .expect("header query pattern compiles")
    })
}

impl HeaderQuery {
    pub fn parse(property: &str) -> Result<Self, String> {
        let captures = header_query_pattern()
            .captures(property)
            .ok_or_else(|| format!("not a valid header property: {property}"))?;

        let name = captures
            .get(1)
            .map(|name| name.as_str().to_string())
            .ok_or_else(|| format!("header property has no name: {property}"))?;
        let form = match captures.get(2) {
            None => HeaderForm::Raw,
            Some(form) => HeaderForm::parse(form.as_str())
                .ok_or_else(|| format!("unknown header form '{}'", form.as_str()))?,
        };

        Ok(Self {
            name,
            form,
            all: captures.get(3).is_some(),
        })
    }
}

impl fmt::Display for HeaderQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "header:{}:as{}", self.name, self.form.as_str())?;
        if self.all {
            f.write_str(":all")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxFilterCondition {
    /// `Some(None)` selects top-level mailboxes.
    pub parent_id: Option<Option<Id>>,
    pub name: Option<String>,
    pub role: Option<Option<String>>,
    pub has_any_role: Option<bool>,
    pub is_subscribed: Option<bool>,
}

impl MailboxFilterCondition {
    pub fn matches(&self, mailbox: &Mailbox) -> bool {
        if let Some(parent_id) = &self.parent_id {
            if mailbox.parent_id != *parent_id {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !mailbox.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(role) = &self.role {
            if mailbox.role != *role {
                return false;
            }
        }
        if let Some(has_any_role) = self.has_any_role {
            if mailbox.role.is_some() != has_any_role {
                return false;
            }
        }
        if let Some(is_subscribed) = self.is_subscribed {
            if mailbox.is_subscribed != is_subscribed {
                return false;
            }
        }
        true
    }
}

impl FieldValue for MailboxFilterCondition {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let parent_id = fields.nullable("parentId");
        let name = fields.optional("name");
        let role = fields.nullable("role");
        let has_any_role = fields.optional("hasAnyRole");
        let is_subscribed = fields.optional("isSubscribed");
        fields.finish()?;

        Ok(Self {
            parent_id,
            name,
            role,
            has_any_role,
            is_subscribed,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .nullable("parentId", &self.parent_id)
            .optional("name", &self.name)
            .nullable("role", &self.role)
            .optional("hasAnyRole", &self.has_any_role)
            .optional("isSubscribed", &self.is_subscribed)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailFilterCondition {
    pub in_mailbox: Option<Id>,
    pub in_mailbox_other_than: Option<Vec<Id>>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub has_keyword: Option<String>,
    pub not_keyword: Option<String>,
}

impl EmailFilterCondition {
    pub fn matches(&self, email: &Email) -> bool {
        if let Some(mailbox_id) = &self.in_mailbox {
            if !email.mailbox_ids.contains_key(mailbox_id) {
                return false;
            }
        }
        if let Some(excluded) = &self.in_mailbox_other_than {
            if email.mailbox_ids.keys().all(|id| excluded.contains(id)) {
                return false;
            }
        }
        if self.before.is_some_and(|before| email.received_at >= before) {
            return false;
        }
        if self.after.is_some_and(|after| email.received_at < after) {
            return false;
        }
        if self.min_size.is_some_and(|min| email.size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| email.size >= max) {
            return false;
        }
        if let Some(keyword) = &self.has_keyword {
            if !email.has_keyword(keyword) {
                return false;
            }
        }
        if let Some(keyword) = &self.not_keyword {
            if email.has_keyword(keyword) {
                return false;
            }
        }
        true
    }
}

impl FieldValue for EmailFilterCondition {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let in_mailbox = fields.optional("inMailbox");
        let in_mailbox_other_than = fields.optional("inMailboxOtherThan");
        let before = fields.optional("before");
        let after = fields.optional("after");
        let min_size = fields.optional("minSize");
        let max_size = fields.optional("maxSize");
        let has_keyword = fields.optional("hasKeyword");
        let not_keyword = fields.optional("notKeyword");
        fields.finish()?;

        Ok(Self {
            in_mailbox,
            in_mailbox_other_than,
            before,
            after,
            min_size,
            max_size,
            has_keyword,
            not_keyword,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .optional("inMailbox", &self.in_mailbox)
            .optional("inMailboxOtherThan", &self.in_mailbox_other_than)
            .optional("before", &self.before)
            .optional("after", &self.after)
            .optional("minSize", &self.min_size)
            .optional("maxSize", &self.max_size)
            .optional("hasKeyword", &self.has_keyword)
            .optional("notKeyword", &self.not_keyword)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailQueryArgs {
    pub query: QueryArgs<EmailFilterCondition>,
    pub collapse_threads: Option<bool>,
}

impl FieldValue for EmailQueryArgs {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let query = QueryArgs::read_fields(&mut fields);
        let collapse_threads = fields.optional("collapseThreads");
        fields.finish()?;

        Ok(Self {
            query: present(query, path)?,
            collapse_threads,
        })
    }

    fn write(&self) -> Value {
        self.query
            .write_fields(ObjectWriter::new())
            .optional("collapseThreads", &self.collapse_threads)
            .build()
    }
}

impl Record for EmailQueryArgs {}

pub type MailboxGetArgs = GetArgs<Mailbox>;
pub type MailboxGetResponse = GetResponse<Mailbox>;
pub type MailboxQueryArgs = QueryArgs<MailboxFilterCondition>;
pub type ThreadGetArgs = GetArgs<Thread>;
pub type ThreadGetResponse = GetResponse<Thread>;
pub type EmailGetArgs = GetArgs<Email>;
pub type EmailGetResponse = GetResponse<Email>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        Email, EmailGetArgs, EmailQueryArgs, HeaderForm, HeaderQuery, Mailbox,
        MailboxFilterCondition, Thread,
    };
    use crate::model::{FieldValue, Id, Record};

    fn mailbox_value() -> serde_json::Value {
        json!({
            "id": "m1",
            "name": "Inbox",
            "parentId": null,
            "role": "inbox",
            "sortOrder": 1,
            "totalEmails": 2,
            "unreadEmails": 1,
            "totalThreads": 2,
            "unreadThreads": 1,
            "myRights": {
                "mayReadItems": true, "mayAddItems": true, "mayRemoveItems": true,
                "maySetSeen": true, "maySetKeywords": true, "mayCreateChild": true,
                "mayRename": false, "mayDelete": false, "maySubmit": true
            },
            "isSubscribed": true
        })
    }

    fn email_value() -> serde_json::Value {
        json!({
            "id": "e1",
            "blobId": "b1",
            "threadId": "t1",
            "mailboxIds": {"m1": true},
            "keywords": {"$seen": true},
            "size": 1024,
            "receivedAt": "2014-12-22T03:12:58Z",
            "messageId": ["abc@example.com"],
            "from": [{"name": "Joe", "email": "joe@example.com"}],
            "to": [{"name": null, "email": "jane@example.com"}],
            "subject": "Hello",
            "sentAt": null,
            "hasAttachment": false,
            "preview": "Hi Jane"
        })
    }

    #[test]
    fn data_objects_round_trip() {
        let value = mailbox_value();
        let mailbox = Mailbox::read(&value, "").expect("valid mailbox");
        assert_eq!(mailbox.write(), value);

        let value = email_value();
        let email = Email::read(&value, "").expect("valid email");
        assert_eq!(email.write(), value);

        let value = json!({"id": "t1", "emailIds": ["e1", "e2"]});
        let thread = Thread::read(&value, "").expect("valid thread");
        assert_eq!(thread.write(), value);
    }

    #[test]
    fn absent_nullable_properties_serialize_as_null() {
        let mut value = mailbox_value();
        value
            .as_object_mut()
            .expect("object")
            .remove("parentId");
        let mailbox = Mailbox::read(&value, "").expect("parentId may be absent");
        assert_eq!(mailbox.write()["parentId"], serde_json::Value::Null);
    }

    #[test]
    fn email_mailbox_ids_must_be_true() {
        let mut value = email_value();
        value["mailboxIds"] = json!({"m1": false});
        let errors = Email::read(&value, "/list/0").expect_err("false membership");
        assert_eq!(
            errors.iter().next().map(|e| e.path.as_str()),
            Some("/list/0/mailboxIds")
        );
    }

    #[test]
    fn parses_header_property_queries() {
        let query = HeaderQuery::parse("header:Foo:asMessageIds").expect("valid query");
        assert_eq!(query.name, "Foo");
        assert_eq!(query.form, HeaderForm::MessageIds);
        assert!(!query.all);

        let query = HeaderQuery::parse("header:From:asAddresses:all").expect("valid query");
        assert!(query.all);
        assert_eq!(query.to_string(), "header:From:asAddresses:all");

        assert_eq!(
            HeaderQuery::parse("header:Subject").expect("raw form").form,
            HeaderForm::Raw
        );
        assert!(HeaderQuery::parse("header:Foo:asMessageIDS").is_err());
        assert!(HeaderQuery::parse("header:Foo:asdf").is_err());
        assert!(HeaderQuery::parse("header").is_err());
        assert!(HeaderQuery::parse("not right").is_err());
    }

    #[test]
    fn email_get_accepts_header_properties() {
        let args = EmailGetArgs::from_value(&json!({
            "accountId": "a1",
            "properties": ["header:Foo:asMessageIds", "messageId", "from"]
        }))
        .expect("valid properties");
        assert_eq!(args.properties.map(|p| p.len()), Some(3));

        let errors = EmailGetArgs::from_value(&json!({
            "accountId": "a1",
            "properties": ["not right", "header:Foo:asdf"]
        }))
        .expect_err("invalid properties");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn email_query_extends_standard_query() {
        let value = json!({
            "accountId": "a1",
            "filter": {"inMailbox": "m1", "minSize": 10},
            "sort": [{"property": "receivedAt", "isAscending": false}],
            "collapseThreads": true
        });
        let args = EmailQueryArgs::from_value(&value).expect("valid query");
        assert_eq!(args.collapse_threads, Some(true));
        assert_eq!(args.to_value(), value);

        let errors = EmailQueryArgs::from_value(&json!({
            "accountId": "a1",
            "filter": {"inMailbox": 7, "colour": "red"}
        }))
        .expect_err("bad filter");
        let paths = errors.iter().map(|e| e.path.clone()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["/filter/inMailbox", "/filter/colour"]);
    }

    #[test]
    fn mailbox_filter_matches_top_level_mailboxes() {
        let mut child = Mailbox::new(Id::new("m2").expect("id"), "Child");
        child.parent_id = Some(Id::new("m1").expect("id"));
        let top = Mailbox::new(Id::new("m1").expect("id"), "Top");

        let condition = MailboxFilterCondition {
            parent_id: Some(None),
            ..Default::default()
        };
        assert!(condition.matches(&top));
        assert!(!condition.matches(&child));
    }
}
