//! Method registry
//!
//! Each method is a typed [`Method`] implementation. Registration erases it
//! behind [`RegisteredMethod`], which validates a raw argument tree into the
//! method's argument record and hands back a ready-to-run [`Invocation`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::errors::MethodError;
use crate::model::{Record, ValidationErrors};

pub const CORE_CAPABILITY: &str = "urn:ietf:params:jmap:core";

#[async_trait]
pub trait Method: Send + Sync + 'static {
    type Arguments: Record + Send + 'static;
    type Response: Record + Send + 'static;

    const NAME: &'static str;
    const CAPABILITY: &'static str;

    async fn call(&self, arguments: Self::Arguments) -> Result<Self::Response, MethodError>;
}

#[async_trait]
pub trait Invocation: Send {
    async fn invoke(self: Box<Self>) -> Result<Value, MethodError>;
}

pub trait RegisteredMethod: Send + Sync {
    fn name(&self) -> &'static str;
    fn capability(&self) -> &'static str;
    fn validate(&self, arguments: &Value) -> Result<Box<dyn Invocation>, ValidationErrors>;
}

struct TypedMethod<M> {
    method: Arc<M>,
}

struct TypedInvocation<M: Method> {
    method: Arc<M>,
    arguments: M::Arguments,
}

impl<M: Method> RegisteredMethod for TypedMethod<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn capability(&self) -> &'static str {
        M::CAPABILITY
    }

    fn validate(&self, arguments: &Value) -> Result<Box<dyn Invocation>, ValidationErrors> {
        let arguments = M::Arguments::from_value(arguments)?;
        Ok(Box::new(TypedInvocation {
            method: Arc::clone(&self.method),
            arguments,
        }))
    }
}

#[async_trait]
impl<M: Method> Invocation for TypedInvocation<M> {
    async fn invoke(self: Box<Self>) -> Result<Value, MethodError> {
        let TypedInvocation { method, arguments } = *self;
        let response = method.call(arguments).await?;
        Ok(response.to_value())
    }
}

#[derive(Clone)]
pub struct MethodRegistry {
    methods: HashMap<&'static str, Arc<dyn RegisteredMethod>>,
    capabilities: BTreeSet<&'static str>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            capabilities: BTreeSet::from([CORE_CAPABILITY]),
        }
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register<M: Method>(&mut self, method: M) -> &mut Self {
        self.capabilities.insert(M::CAPABILITY);
        self.methods.insert(
            M::NAME,
            Arc::new(TypedMethod {
                method: Arc::new(method),
            }),
        );
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn RegisteredMethod> {
        self.methods.get(name).map(|method| method.as_ref())
    }

    pub fn supports_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names = self.methods.keys().copied().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
