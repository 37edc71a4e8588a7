//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (validator derive): 节点名非空, 至少一个输入流, queue_capacity > 0
//! - 输入流声明合法 (可构建 TagMap)
//! - 每个 sync set 非空, 每个 tag/index 可解析且存在
//! - 同一输入流不能出现在多个 sync set 中

use std::collections::HashMap;

use contracts::{ContractError, NodeConfig, TagMap};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 NodeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &NodeConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    let tag_map = validate_input_streams(config)?;
    validate_sync_sets(config, &tag_map)?;
    Ok(())
}

/// 字段级校验 (validator derive)
fn validate_fields(config: &NodeConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, String::new())
            .unwrap_or_else(|| (String::from("node"), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 按路径排序后取第一个字段错误
fn first_error(errors: &ValidationErrors, prefix: String) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by_key(|(key, _)| key.to_string());

    for (key, kind) in entries {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        let found = match kind {
            ValidationErrorsKind::Field(field_errors) => field_errors.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_error(inner, path.clone()),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_error(inner, format!("{path}[{idx}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// 校验输入流声明并构建 TagMap
fn validate_input_streams(config: &NodeConfig) -> Result<TagMap, ContractError> {
    TagMap::from_streams(&config.input_streams)
        .map_err(|e| ContractError::config_validation("input_streams", e.to_string()))
}

/// 校验 sync set: 非空, 引用存在, 不重复
fn validate_sync_sets(config: &NodeConfig, tag_map: &TagMap) -> Result<(), ContractError> {
    let mut owner = HashMap::new();

    for (set_idx, sync_set) in config.options.sync_sets.iter().enumerate() {
        if sync_set.tag_index.is_empty() {
            return Err(ContractError::config_validation(
                format!("options.sync_sets[{set_idx}]"),
                "sync set must name at least one stream",
            ));
        }

        for (member_idx, reference) in sync_set.tag_index.iter().enumerate() {
            let field = format!("options.sync_sets[{set_idx}].tag_index[{member_idx}]");
            let id = tag_map
                .resolve(reference)
                .map_err(|e| ContractError::config_validation(&field, e.to_string()))?;

            if let Some(previous) = owner.insert(id, set_idx) {
                return Err(ContractError::config_validation(
                    field,
                    format!(
                        "stream \"{reference}\" is in more than one sync set (already in sync_sets[{previous}])"
                    ),
                ));
            }
        }
    }

    Ok(())
}
