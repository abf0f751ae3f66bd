use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct LlenArguments {
    key: String,
}

impl LlenArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("llen"))?;

        Ok(Self { key })
    }
}

pub async fn llen(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let llen_arguments = LlenArguments::parse(arguments)?;
    let length = store.len(&llen_arguments.key).await?;

    Ok(RespValue::Integer(length as i64).encode())
}
