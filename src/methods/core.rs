use async_trait::async_trait;

use crate::jmap::{Method, MethodError, CORE_CAPABILITY};
use crate::model::EchoArguments;

pub struct Echo;

#[async_trait]
impl Method for Echo {
    type Arguments = EchoArguments;
    type Response = EchoArguments;

    const NAME: &'static str = "Core/echo";
    const CAPABILITY: &'static str = CORE_CAPABILITY;

    async fn call(&self, arguments: EchoArguments) -> Result<EchoArguments, MethodError> {
        Ok(arguments)
    }
}
