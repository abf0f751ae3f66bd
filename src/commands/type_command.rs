use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct TypeArguments {
    key: String,
}

impl TypeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("type"))?;

        Ok(Self { key })
    }
}

pub async fn type_command(
    store: &KeyValueStore,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    let type_arguments = TypeArguments::parse(arguments)?;

    let name = store
        .key_type(&type_arguments.key)
        .await
        .map_or("none", |kind| kind.as_str());

    Ok(RespValue::SimpleString(name.to_string()).encode())
}
