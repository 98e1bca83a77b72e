//! Argument and result shapes shared by every data type
//!
//! `/get`, `/changes`, `/query` and `/set` have the same structure regardless of
//! the type they operate on; the data type only narrows property names and
//! filter conditions.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde_json::{Map, Value};

use crate::model::fields::{child_path, present};
use crate::model::{
    DataObject, FieldValue, Id, ObjectReader, ObjectWriter, Record, ValidationErrors,
};

#[derive(Debug, Clone, PartialEq)]
pub struct GetArgs<T> {
    pub account_id: Id,
    pub ids: Option<Vec<Id>>,
    pub properties: Option<Vec<String>>,
    marker: PhantomData<fn() -> T>,
}

impl<T: DataObject> GetArgs<T> {
    pub fn new(account_id: Id) -> Self {
        Self {
            account_id,
            ids: None,
            properties: None,
            marker: PhantomData,
        }
    }

    pub fn with_ids(mut self, ids: Vec<Id>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_properties(mut self, properties: Vec<String>) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl<T: DataObject> FieldValue for GetArgs<T> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let ids = fields.optional::<Vec<Id>>("ids");
        let properties = fields.optional::<Vec<String>>("properties");

        if let Some(properties) = &properties {
            let base = fields.field_path("properties");
            for (index, property) in properties.iter().enumerate() {
                if !T::accepts_property(property) {
                    fields.invalid_at(
                        child_path(&base, &index.to_string()),
                        format!("'{property}' is not a {} property", T::TYPE_NAME),
                    );
                }
            }
        }

        fields.finish()?;
        Ok(Self {
            account_id: present(account_id, path)?,
            ids,
            properties,
            marker: PhantomData,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .optional("ids", &self.ids)
            .optional("properties", &self.properties)
            .build()
    }
}

impl<T: DataObject> Record for GetArgs<T> {}

#[derive(Debug, Clone, PartialEq)]
pub struct GetResponse<T> {
    pub account_id: Id,
    pub state: String,
    pub list: Vec<T>,
    pub not_found: Vec<Id>,
    pub properties: Option<Vec<String>>,
}

impl<T: DataObject> FieldValue for GetResponse<T> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let state = fields.required::<String>("state");
        let list = fields.required::<Vec<T>>("list");
        let not_found = fields.required::<Vec<Id>>("notFound");
        fields.finish()?;

        Ok(Self {
            account_id: present(account_id, path)?,
            state: present(state, path)?,
            list: present(list, path)?,
            not_found: present(not_found, path)?,
            properties: None,
        })
    }

    fn write(&self) -> Value {
        let list = self
            .list
            .iter()
            .map(|object| select_properties(object.write(), self.properties.as_deref()))
            .collect::<Vec<_>>();

        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .field("state", &self.state)
            .field("list", &Value::Array(list))
            .field("notFound", &self.not_found)
            .build()
    }
}

impl<T: DataObject> Record for GetResponse<T> {}

/// `id` first, then every requested property in request order. Properties
/// the object does not carry (such as header queries) come back as `null`.
fn select_properties(object: Value, properties: Option<&[String]>) -> Value {
    let (mut map, properties) = match (object, properties) {
        (Value::Object(map), Some(properties)) => (map, properties),
        (object, _) => return object,
    };

    let mut selected = Map::new();
    if let Some(id) = map.remove("id") {
        selected.insert("id".to_string(), id);
    }
    for property in properties {
        if property == "id" || selected.contains_key(property) {
            continue;
        }
        let value = map.remove(property).unwrap_or(Value::Null);
        selected.insert(property.clone(), value);
    }
    Value::Object(selected)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesArgs {
    pub account_id: Id,
    pub since_state: String,
    pub max_changes: Option<u64>,
}

impl FieldValue for ChangesArgs {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let since_state = fields.required::<String>("sinceState");
        let max_changes = fields.optional::<u64>("maxChanges");
        if max_changes == Some(0) {
            fields.invalid("maxChanges", "must be greater than 0");
        }
        fields.finish()?;

        Ok(Self {
            account_id: present(account_id, path)?,
            since_state: present(since_state, path)?,
            max_changes,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .field("sinceState", &self.since_state)
            .optional("maxChanges", &self.max_changes)
            .build()
    }
}

impl Record for ChangesArgs {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesResponse {
    pub account_id: Id,
    pub old_state: String,
    pub new_state: String,
    pub has_more_changes: bool,
    pub created: Vec<Id>,
    pub updated: Vec<Id>,
    pub destroyed: Vec<Id>,
}

impl FieldValue for ChangesResponse {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let old_state = fields.required::<String>("oldState");
        let new_state = fields.required::<String>("newState");
        let has_more_changes = fields.required::<bool>("hasMoreChanges");
        let created = fields.required::<Vec<Id>>("created");
        let updated = fields.required::<Vec<Id>>("updated");
        let destroyed = fields.required::<Vec<Id>>("destroyed");
        fields.finish()?;

        Ok(Self {
            account_id: present(account_id, path)?,
            old_state: present(old_state, path)?,
            new_state: present(new_state, path)?,
            has_more_changes: present(has_more_changes, path)?,
            created: present(created, path)?,
            updated: present(updated, path)?,
            destroyed: present(destroyed, path)?,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .field("oldState", &self.old_state)
            .field("newState", &self.new_state)
            .field("hasMoreChanges", &self.has_more_changes)
            .field("created", &self.created)
            .field("updated", &self.updated)
            .field("destroyed", &self.destroyed)
            .build()
    }
}

impl Record for ChangesResponse {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    And,
    Or,
    Not,
}

impl FieldValue for FilterOperator {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        match String::read(value, path)?.as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            "NOT" => Ok(Self::Not),
            _ => Err(ValidationErrors::single(path, "operator must be one of: AND, OR, NOT")),
        }
    }

    fn write(&self) -> Value {
        let operator = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        };
        Value::String(operator.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter<F> {
    Operator {
        operator: FilterOperator,
        conditions: Vec<Filter<F>>,
    },
    Condition(F),
}

impl<F> Filter<F> {
    pub fn matches(&self, test: &impl Fn(&F) -> bool) -> bool {
        match self {
            Self::Condition(condition) => test(condition),
            Self::Operator {
                operator: FilterOperator::And,
                conditions,
            } => conditions.iter().all(|filter| filter.matches(test)),
            Self::Operator {
                operator: FilterOperator::Or,
                conditions,
            } => conditions.iter().any(|filter| filter.matches(test)),
            Self::Operator {
                operator: FilterOperator::Not,
                conditions,
            } => !conditions.iter().any(|filter| filter.matches(test)),
        }
    }
}

impl<F: FieldValue> FieldValue for Filter<F> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        if value.get("operator").is_none() {
            return F::read(value, path).map(Self::Condition);
        }

        let mut fields = ObjectReader::new(value, path)?;
        let operator = fields.required::<FilterOperator>("operator");
        let conditions = fields.required::<Vec<Filter<F>>>("conditions");
        fields.finish()?;

        Ok(Self::Operator {
            operator: present(operator, path)?,
            conditions: present(conditions, path)?,
        })
    }

    fn write(&self) -> Value {
        match self {
            Self::Condition(condition) => condition.write(),
            Self::Operator {
                operator,
                conditions,
            } => ObjectWriter::new()
                .field("operator", operator)
                .field("conditions", conditions)
                .build(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub property: String,
    pub is_ascending: Option<bool>,
    pub collation: Option<String>,
}

impl Comparator {
    pub fn ascending(&self) -> bool {
        self.is_ascending.unwrap_or(true)
    }
}

impl FieldValue for Comparator {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let property = fields.required::<String>("property");
        let is_ascending = fields.optional::<bool>("isAscending");
        let collation = fields.optional::<String>("collation");
        fields.finish()?;

        Ok(Self {
            property: present(property, path)?,
            is_ascending,
            collation,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("property", &self.property)
            .optional("isAscending", &self.is_ascending)
            .optional("collation", &self.collation)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryArgs<F> {
    pub account_id: Id,
    pub filter: Option<Filter<F>>,
    pub sort: Option<Vec<Comparator>>,
    pub position: Option<i64>,
    pub anchor: Option<Id>,
    pub anchor_offset: Option<i64>,
    pub limit: Option<u64>,
    pub calculate_total: Option<bool>,
}

impl<F: FieldValue> QueryArgs<F> {
    pub fn new(account_id: Id) -> Self {
        Self {
            account_id,
            filter: None,
            sort: None,
            position: None,
            anchor: None,
            anchor_offset: None,
            limit: None,
            calculate_total: None,
        }
    }

    pub fn read_fields(fields: &mut ObjectReader<'_>) -> Option<Self> {
        let account_id = fields.required::<Id>("accountId");
        let filter = fields.optional::<Filter<F>>("filter");
        let sort = fields.optional::<Vec<Comparator>>("sort");
        let position = fields.optional::<i64>("position");
        let anchor = fields.optional::<Id>("anchor");
        let anchor_offset = fields.optional::<i64>("anchorOffset");
        let limit = fields.optional::<u64>("limit");
        let calculate_total = fields.optional::<bool>("calculateTotal");

        Some(Self {
            account_id: account_id?,
            filter,
            sort,
            position,
            anchor,
            anchor_offset,
            limit,
            calculate_total,
        })
    }

    pub fn write_fields(&self, writer: ObjectWriter) -> ObjectWriter {
        writer
            .field("accountId", &self.account_id)
            .optional("filter", &self.filter)
            .optional("sort", &self.sort)
            .optional("position", &self.position)
            .optional("anchor", &self.anchor)
            .optional("anchorOffset", &self.anchor_offset)
            .optional("limit", &self.limit)
            .optional("calculateTotal", &self.calculate_total)
    }
}

impl<F: FieldValue> FieldValue for QueryArgs<F> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let args = Self::read_fields(&mut fields);
        fields.finish()?;
        present(args, path)
    }

    fn write(&self) -> Value {
        self.write_fields(ObjectWriter::new()).build()
    }
}

impl<F: FieldValue> Record for QueryArgs<F> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub account_id: Id,
    pub query_state: String,
    pub can_calculate_changes: bool,
    pub position: u64,
    pub ids: Vec<Id>,
    pub total: Option<u64>,
    pub limit: Option<u64>,
}

impl FieldValue for QueryResponse {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let query_state = fields.required::<String>("queryState");
        let can_calculate_changes = fields.required::<bool>("canCalculateChanges");
        let position = fields.required::<u64>("position");
        let ids = fields.required::<Vec<Id>>("ids");
        let total = fields.optional::<u64>("total");
        let limit = fields.optional::<u64>("limit");
        fields.finish()?;

        Ok(Self {
            account_id: present(account_id, path)?,
            query_state: present(query_state, path)?,
            can_calculate_changes: present(can_calculate_changes, path)?,
            position: present(position, path)?,
            ids: present(ids, path)?,
            total,
            limit,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .field("queryState", &self.query_state)
            .field("canCalculateChanges", &self.can_calculate_changes)
            .field("position", &self.position)
            .field("ids", &self.ids)
            .optional("total", &self.total)
            .optional("limit", &self.limit)
            .build()
    }
}

impl Record for QueryResponse {}

pub type PatchObject = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct SetArgs {
    pub account_id: Id,
    pub if_in_state: Option<String>,
    pub create: Option<BTreeMap<Id, Map<String, Value>>>,
    pub update: Option<BTreeMap<Id, PatchObject>>,
    pub destroy: Option<Vec<Id>>,
}

impl FieldValue for SetArgs {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let if_in_state = fields.optional::<String>("ifInState");
        let create = fields.optional::<BTreeMap<Id, Map<String, Value>>>("create");
        let update = fields.optional::<BTreeMap<Id, PatchObject>>("update");
        let destroy = fields.optional::<Vec<Id>>("destroy");

        if let (Some(update), Some(destroy)) = (&update, &destroy) {
            for id in destroy.iter().filter(|id| update.contains_key(*id)) {
                fields.invalid("destroy", format!("'{id}' is both updated and destroyed"));
            }
        }
        fields.finish()?;

        Ok(Self {
            account_id: present(account_id, path)?,
            if_in_state,
            create,
            update,
            destroy,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .optional("ifInState", &self.if_in_state)
            .optional("create", &self.create)
            .optional("update", &self.update)
            .optional("destroy", &self.destroy)
            .build()
    }
}

impl Record for SetArgs {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetError {
    pub error_type: String,
    pub description: Option<String>,
    pub properties: Option<Vec<String>>,
}

impl SetError {
    pub fn new(error_type: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            description: None,
            properties: None,
        }
    }

    pub fn not_found() -> Self {
        Self::new("notFound")
    }

    pub fn invalid_properties(properties: Vec<String>, description: impl Into<String>) -> Self {
        Self::new("invalidProperties")
            .with_description(description)
            .with_properties(properties)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_properties(mut self, properties: Vec<String>) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl FieldValue for SetError {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let error_type = fields.required::<String>("type");
        let description = fields.optional::<String>("description");
        let properties = fields.optional::<Vec<String>>("properties");
        fields.finish()?;

        Ok(Self {
            error_type: present(error_type, path)?,
            description,
            properties,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("type", &self.error_type)
            .optional("description", &self.description)
            .optional("properties", &self.properties)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetResponse {
    pub account_id: Id,
    pub old_state: Option<String>,
    pub new_state: String,
    pub created: Option<BTreeMap<Id, Map<String, Value>>>,
    pub updated: Option<BTreeMap<Id, Option<Map<String, Value>>>>,
    pub destroyed: Option<Vec<Id>>,
    pub not_created: Option<BTreeMap<Id, SetError>>,
    pub not_updated: Option<BTreeMap<Id, SetError>>,
    pub not_destroyed: Option<BTreeMap<Id, SetError>>,
}

impl SetResponse {
    pub fn new(account_id: Id, old_state: String, new_state: String) -> Self {
        Self {
            account_id,
            old_state: Some(old_state),
            new_state,
            created: None,
            updated: None,
            destroyed: None,
            not_created: None,
            not_updated: None,
            not_destroyed: None,
        }
    }
}

impl FieldValue for SetResponse {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let mut fields = ObjectReader::new(value, path)?;
        let account_id = fields.required::<Id>("accountId");
        let old_state = fields.optional::<String>("oldState");
        let new_state = fields.required::<String>("newState");
        let created = fields.optional("created");
        let updated = fields.optional("updated");
        let destroyed = fields.optional("destroyed");
        let not_created = fields.optional("notCreated");
        let not_updated = fields.optional("notUpdated");
        let not_destroyed = fields.optional("notDestroyed");
        fields.finish()?;

        Ok(Self {
            account_id: present(account_id, path)?,
            old_state,
            new_state: present(new_state, path)?,
            created,
            updated,
            destroyed,
            not_created,
            not_updated,
            not_destroyed,
        })
    }

    fn write(&self) -> Value {
        ObjectWriter::new()
            .field("accountId", &self.account_id)
            .optional("oldState", &self.old_state)
            .field("newState", &self.new_state)
            .optional("created", &self.created)
            .optional("updated", &self.updated)
            .optional("destroyed", &self.destroyed)
            .optional("notCreated", &self.not_created)
            .optional("notUpdated", &self.not_updated)
            .optional("notDestroyed", &self.not_destroyed)
            .build()
    }
}

impl Record for SetResponse {}
